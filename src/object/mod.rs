//! Object tree access
//!
//! The object table layout changed between versions 3 and 4: entry size,
//! attribute count, relative pointer width, and the property size byte format
//! all differ. The [ObjectTree] trait captures the layout, chosen once at
//! load time, and the functions here implement the operations on top of it.
use core::fmt;
use std::cmp::Ordering;

use crate::{
    error::{ErrorCode, RuntimeError},
    fatal_error, recoverable_error,
    zmachine::{memory::Memory, ZMachine},
};

mod compact;
mod extended;

pub use compact::CompactTree;
pub use extended::ExtendedTree;

/// Version-specific object table layout
pub trait ObjectTree {
    /// Layout type name
    fn type_name(&self) -> &str;

    /// Byte address of an object's table entry
    fn object_address(&self, object: usize) -> usize;

    /// Number of attributes per object
    fn attribute_count(&self) -> u8;

    /// Parent object number
    fn parent(&self, memory: &Memory, object: usize) -> Result<usize, RuntimeError>;

    /// Sibling object number
    fn sibling(&self, memory: &Memory, object: usize) -> Result<usize, RuntimeError>;

    /// Child object number
    fn child(&self, memory: &Memory, object: usize) -> Result<usize, RuntimeError>;

    /// Set the parent object number.
    ///
    /// Updates the table entry only, without restructuring the tree.
    fn set_parent(
        &self,
        memory: &mut Memory,
        object: usize,
        parent: usize,
    ) -> Result<(), RuntimeError>;

    /// Set the sibling object number.
    ///
    /// Updates the table entry only, without restructuring the tree.
    fn set_sibling(
        &self,
        memory: &mut Memory,
        object: usize,
        sibling: usize,
    ) -> Result<(), RuntimeError>;

    /// Set the child object number.
    ///
    /// Updates the table entry only, without restructuring the tree.
    fn set_child(
        &self,
        memory: &mut Memory,
        object: usize,
        child: usize,
    ) -> Result<(), RuntimeError>;

    /// Byte address of an object's property table
    fn property_table_address(&self, memory: &Memory, object: usize)
        -> Result<usize, RuntimeError>;

    /// Property number encoded in a size byte
    fn property_number(&self, size_byte: u8) -> u8;

    /// Data size in bytes of the property starting at `property_address`
    fn property_size(&self, memory: &Memory, property_address: usize)
        -> Result<usize, RuntimeError>;

    /// Size of the property header (1 or 2 bytes) at `property_address`
    fn property_data_offset(
        &self,
        memory: &Memory,
        property_address: usize,
    ) -> Result<usize, RuntimeError>;

    /// Data size in bytes of the property whose data starts at
    /// `property_data_address`
    fn property_length(
        &self,
        memory: &Memory,
        property_data_address: usize,
    ) -> Result<usize, RuntimeError>;

    /// Default value for a property, from the table preceding the object
    /// entries
    fn default_property(&self, memory: &Memory, property: u8) -> Result<u16, RuntimeError>;
}

impl fmt::Debug for dyn ObjectTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.type_name())
    }
}

/// Choose the object table layout for a version
///
/// # Arguments
/// * `version` - Story file version
/// * `table` - Byte address of the object table
pub fn new_tree(version: u8, table: usize) -> Box<dyn ObjectTree> {
    if version < 4 {
        Box::new(CompactTree::new(table))
    } else {
        Box::new(ExtendedTree::new(table))
    }
}

/// Finds the byte address of a property for an object, 0 if the object does
/// not have the property.
fn address(
    tree: &dyn ObjectTree,
    memory: &Memory,
    object: usize,
    property: u8,
) -> Result<usize, RuntimeError> {
    let property_table_address = tree.property_table_address(memory, object)?;
    let header_size = memory.read_byte(property_table_address)? as usize;
    let mut property_address = property_table_address + 1 + (header_size * 2);
    let mut size_byte = memory.read_byte(property_address)?;
    while size_byte != 0 {
        let number = tree.property_number(size_byte);
        match number.cmp(&property) {
            Ordering::Equal => return Ok(property_address),
            // Properties are stored in descending order
            Ordering::Less => return Ok(0),
            Ordering::Greater => {
                let data_offset = tree.property_data_offset(memory, property_address)?;
                let size = tree.property_size(memory, property_address)?;
                property_address = property_address + data_offset + size;
                size_byte = memory.read_byte(property_address)?;
            }
        }
    }

    Ok(0)
}

/// Gets the parent of an object
///
/// If `object` is 0, 0 is returned.
pub fn parent(zmachine: &ZMachine, object: usize) -> Result<usize, RuntimeError> {
    if object == 0 {
        warn!(target: "app::object", "Parent of object 0");
        return Ok(0);
    }

    let (tree, memory) = zmachine.objects();
    tree.parent(memory, object)
}

/// Gets the first sibling of an object
///
/// If `object` is 0, 0 is returned.
pub fn sibling(zmachine: &ZMachine, object: usize) -> Result<usize, RuntimeError> {
    if object == 0 {
        warn!(target: "app::object", "Sibling of object 0");
        return Ok(0);
    }

    let (tree, memory) = zmachine.objects();
    tree.sibling(memory, object)
}

/// Gets the first child of an object
///
/// If `object` is 0, 0 is returned.
pub fn child(zmachine: &ZMachine, object: usize) -> Result<usize, RuntimeError> {
    if object == 0 {
        warn!(target: "app::object", "Child of object 0");
        return Ok(0);
    }

    let (tree, memory) = zmachine.objects();
    tree.child(memory, object)
}

/// Tests an attribute on an object
///
/// If `object` is 0, `false` is returned.
pub fn attribute(zmachine: &ZMachine, object: usize, attribute: u8) -> Result<bool, RuntimeError> {
    if object == 0 {
        warn!(target: "app::object", "Test of attribute {} on object 0", attribute);
        return Ok(false);
    }

    let (tree, memory) = zmachine.objects();
    if attribute >= tree.attribute_count() {
        return recoverable_error!(
            ErrorCode::InvalidObjectAttribute,
            "Test of invalid attribute {} on object {}",
            attribute,
            object
        );
    }

    let address = tree.object_address(object) + (attribute as usize / 8);
    let mask = 1 << (7 - (attribute % 8));
    let value = memory.read_byte(address)?;
    Ok(value & mask == mask)
}

/// Sets an attribute on an object
///
/// If `object` is 0, nothing happens.
pub fn set_attribute(
    zmachine: &mut ZMachine,
    object: usize,
    attribute: u8,
) -> Result<(), RuntimeError> {
    if object == 0 {
        warn!(target: "app::object", "Set of attribute {} on object 0", attribute);
        return Ok(());
    }

    let (tree, memory) = zmachine.objects_mut();
    if attribute >= tree.attribute_count() {
        return recoverable_error!(
            ErrorCode::InvalidObjectAttribute,
            "Set of invalid attribute {} on object {}",
            attribute,
            object
        );
    }

    let address = tree.object_address(object) + (attribute as usize / 8);
    let mask = 1 << (7 - (attribute % 8));
    let attribute_byte = memory.read_byte(address)?;
    memory.write_byte(address, attribute_byte | mask)
}

/// Clears an attribute on an object
///
/// If `object` is 0, nothing happens.
pub fn clear_attribute(
    zmachine: &mut ZMachine,
    object: usize,
    attribute: u8,
) -> Result<(), RuntimeError> {
    if object == 0 {
        warn!(target: "app::object", "Clear of attribute {} on object 0", attribute);
        return Ok(());
    }

    let (tree, memory) = zmachine.objects_mut();
    if attribute >= tree.attribute_count() {
        return recoverable_error!(
            ErrorCode::InvalidObjectAttribute,
            "Clear of invalid attribute {} on object {}",
            attribute,
            object
        );
    }

    let address = tree.object_address(object) + (attribute as usize / 8);
    let mask: u8 = 1 << (7 - (attribute % 8));
    let attribute_byte = memory.read_byte(address)?;
    memory.write_byte(address, attribute_byte & !mask)
}

/// Gets the value of a property for an object.
///
/// The property value must be either a byte or a word value. If the property
/// does not exist for the object, the default property value is returned.
pub fn property(zmachine: &ZMachine, object: usize, property: u8) -> Result<u16, RuntimeError> {
    let (tree, memory) = zmachine.objects();
    if object == 0 {
        warn!(target: "app::object", "Read of property {} on object 0", property);
        return tree.default_property(memory, property);
    }

    let property_address = address(tree, memory, object, property)?;
    if property_address == 0 {
        tree.default_property(memory, property)
    } else {
        let property_size = tree.property_size(memory, property_address)?;
        let property_data = property_address + tree.property_data_offset(memory, property_address)?;
        match property_size {
            1 => Ok(memory.read_byte(property_data)? as u16),
            2 => memory.read_word(property_data),
            _ => fatal_error!(
                ErrorCode::InvalidObjectPropertySize,
                "Read of property {} on object {} should have size 1 or 2, was {}",
                property,
                object,
                property_size
            ),
        }
    }
}

/// Sets the value of a property for an object.
///
/// The property must exist on the object and must be either a byte or word
/// value.
pub fn set_property(
    zmachine: &mut ZMachine,
    object: usize,
    property: u8,
    value: u16,
) -> Result<(), RuntimeError> {
    if object == 0 {
        warn!(target: "app::object", "Write of property {} on object 0", property);
        return Ok(());
    }

    let (tree, memory) = zmachine.objects_mut();
    let property_address = address(tree, memory, object, property)?;
    if property_address == 0 {
        fatal_error!(
            ErrorCode::InvalidObjectProperty,
            "Object {} does not have property {}",
            object,
            property
        )
    } else {
        let property_size = tree.property_size(memory, property_address)?;
        let property_data = property_address + tree.property_data_offset(memory, property_address)?;
        match property_size {
            1 => memory.write_byte(property_data, value as u8),
            2 => memory.write_word(property_data, value),
            _ => fatal_error!(
                ErrorCode::InvalidObjectProperty,
                "Object {} property {} size ({}) is not a byte or a word",
                object,
                property,
                property_size
            ),
        }
    }
}

/// Gets the byte address of a property's data for an object.
///
/// If the property does not exist for the object, 0 is returned.
pub fn property_data_address(
    zmachine: &ZMachine,
    object: usize,
    property: u8,
) -> Result<usize, RuntimeError> {
    if object == 0 {
        warn!(target: "app::object", "Property {} address on object 0", property);
        return Ok(0);
    }

    let (tree, memory) = zmachine.objects();
    let property_address = address(tree, memory, object, property)?;
    if property_address == 0 {
        Ok(0)
    } else {
        Ok(property_address + tree.property_data_offset(memory, property_address)?)
    }
}

/// Gets the length of the property data starting at `property_data_address`.
///
/// If `property_data_address` is 0, 0 is returned.
pub fn property_length(
    zmachine: &ZMachine,
    property_data_address: usize,
) -> Result<usize, RuntimeError> {
    if property_data_address == 0 {
        return Ok(0);
    }

    let (tree, memory) = zmachine.objects();
    tree.property_length(memory, property_data_address)
}

/// Gets the next property set on an object.
///
/// Properties are ordered in descending order by number. If `property` is 0,
/// the first property number on the object is returned. If there is no next
/// property, 0 is returned.
pub fn next_property(zmachine: &ZMachine, object: usize, property: u8) -> Result<u8, RuntimeError> {
    if object == 0 {
        warn!(target: "app::object", "Next property {} on object 0", property);
        return Ok(0);
    }

    let (tree, memory) = zmachine.objects();
    if property == 0 {
        let property_table_address = tree.property_table_address(memory, object)?;
        let header_size = memory.read_byte(property_table_address)? as usize;
        let size_byte = memory.read_byte(property_table_address + 1 + (header_size * 2))?;
        Ok(tree.property_number(size_byte))
    } else {
        let property_address = address(tree, memory, object, property)?;
        if property_address == 0 {
            Ok(0)
        } else {
            let size = tree.property_size(memory, property_address)?;
            let data_offset = tree.property_data_offset(memory, property_address)?;
            let size_byte = memory.read_byte(property_address + data_offset + size)?;
            Ok(tree.property_number(size_byte))
        }
    }
}

/// Gets the ztext of the short name of an object
///
/// # Returns
/// [Result] with a vector of ztext words or a [RuntimeError]
pub fn short_name(zmachine: &ZMachine, object: usize) -> Result<Vec<u16>, RuntimeError> {
    if object == 0 {
        warn!(target: "app::object", "Short name of object 0");
        return Ok(Vec::new());
    }

    let (tree, memory) = zmachine.objects();
    let property_table_address = tree.property_table_address(memory, object)?;
    let header_count = memory.read_byte(property_table_address)? as usize;
    let mut ztext = Vec::new();
    for i in 0..header_count {
        ztext.push(memory.read_word(property_table_address + 1 + (i * 2))?);
    }

    Ok(ztext)
}

/// Removes an object from its parent, leaving its own children in place.
///
/// If `object` is 0 or has no parent, nothing happens.
pub fn remove_object(zmachine: &mut ZMachine, object: usize) -> Result<(), RuntimeError> {
    if object == 0 {
        warn!(target: "app::object", "Remove of object 0");
        return Ok(());
    }

    let (tree, memory) = zmachine.objects_mut();
    let old_parent = tree.parent(memory, object)?;
    if old_parent == 0 {
        return Ok(());
    }

    // Unlink the object from its parent's child chain
    let next_sibling = tree.sibling(memory, object)?;
    if tree.child(memory, old_parent)? == object {
        tree.set_child(memory, old_parent, next_sibling)?;
    } else {
        let mut prev = tree.child(memory, old_parent)?;
        while prev != 0 {
            let s = tree.sibling(memory, prev)?;
            if s == object {
                tree.set_sibling(memory, prev, next_sibling)?;
                break;
            }
            prev = s;
        }

        if prev == 0 {
            return recoverable_error!(
                ErrorCode::InvalidObjectTree,
                "Object {} is not in the child chain of its parent {}",
                object,
                old_parent
            );
        }
    }

    tree.set_parent(memory, object, 0)?;
    tree.set_sibling(memory, object, 0)
}

/// Moves an object to become the first child of a destination object.
///
/// If `object` is 0, nothing happens.
pub fn insert_object(
    zmachine: &mut ZMachine,
    object: usize,
    destination: usize,
) -> Result<(), RuntimeError> {
    if object == 0 {
        warn!(target: "app::object", "Insert of object 0");
        return Ok(());
    }

    remove_object(zmachine, object)?;

    let (tree, memory) = zmachine.objects_mut();
    if destination != 0 {
        let old_child = tree.child(memory, destination)?;
        tree.set_sibling(memory, object, old_child)?;
        tree.set_child(memory, destination, object)?;
    }
    tree.set_parent(memory, object, destination)
}
