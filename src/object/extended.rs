//! Version 4+ object table layout
use crate::{
    error::RuntimeError,
    zmachine::memory::Memory,
};

use super::ObjectTree;

/// Extended layout: 63 default properties, 14-byte entries with 48 attribute
/// bits and word-sized relatives, and one- or two-byte property headers.
pub struct ExtendedTree {
    table: usize,
}

impl ExtendedTree {
    pub fn new(table: usize) -> ExtendedTree {
        ExtendedTree { table }
    }
}

impl ObjectTree for ExtendedTree {
    fn type_name(&self) -> &str {
        "ExtendedTree"
    }

    fn object_address(&self, object: usize) -> usize {
        self.table + 126 + (14 * (object - 1))
    }

    fn attribute_count(&self) -> u8 {
        48
    }

    fn parent(&self, memory: &Memory, object: usize) -> Result<usize, RuntimeError> {
        Ok(memory.read_word(self.object_address(object) + 6)? as usize)
    }

    fn sibling(&self, memory: &Memory, object: usize) -> Result<usize, RuntimeError> {
        Ok(memory.read_word(self.object_address(object) + 8)? as usize)
    }

    fn child(&self, memory: &Memory, object: usize) -> Result<usize, RuntimeError> {
        Ok(memory.read_word(self.object_address(object) + 10)? as usize)
    }

    fn set_parent(
        &self,
        memory: &mut Memory,
        object: usize,
        parent: usize,
    ) -> Result<(), RuntimeError> {
        memory.write_word(self.object_address(object) + 6, parent as u16)
    }

    fn set_sibling(
        &self,
        memory: &mut Memory,
        object: usize,
        sibling: usize,
    ) -> Result<(), RuntimeError> {
        memory.write_word(self.object_address(object) + 8, sibling as u16)
    }

    fn set_child(
        &self,
        memory: &mut Memory,
        object: usize,
        child: usize,
    ) -> Result<(), RuntimeError> {
        memory.write_word(self.object_address(object) + 10, child as u16)
    }

    fn property_table_address(
        &self,
        memory: &Memory,
        object: usize,
    ) -> Result<usize, RuntimeError> {
        Ok(memory.read_word(self.object_address(object) + 12)? as usize)
    }

    fn property_number(&self, size_byte: u8) -> u8 {
        size_byte & 0x3F
    }

    fn property_size(
        &self,
        memory: &Memory,
        property_address: usize,
    ) -> Result<usize, RuntimeError> {
        let size_byte = memory.read_byte(property_address)?;
        match size_byte & 0xC0 {
            0x40 => Ok(2),
            0x00 => Ok(1),
            _ => {
                // Second size byte, 0 means 64 bytes of data
                let size = memory.read_byte(property_address + 1)? as usize & 0x3F;
                if size == 0 {
                    Ok(64)
                } else {
                    Ok(size)
                }
            }
        }
    }

    fn property_data_offset(
        &self,
        memory: &Memory,
        property_address: usize,
    ) -> Result<usize, RuntimeError> {
        let size_byte = memory.read_byte(property_address)?;
        if size_byte & 0x80 == 0x80 {
            Ok(2)
        } else {
            Ok(1)
        }
    }

    fn property_length(
        &self,
        memory: &Memory,
        property_data_address: usize,
    ) -> Result<usize, RuntimeError> {
        let size_byte = memory.read_byte(property_data_address - 1)?;
        if size_byte & 0x80 == 0x80 {
            self.property_size(memory, property_data_address - 2)
        } else {
            self.property_size(memory, property_data_address - 1)
        }
    }

    fn default_property(&self, memory: &Memory, property: u8) -> Result<u16, RuntimeError> {
        memory.read_word(self.table + ((property as usize - 1) * 2))
    }
}
