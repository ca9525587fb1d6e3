//! Version 1-3 object table layout
use crate::{
    error::RuntimeError,
    zmachine::memory::Memory,
};

use super::ObjectTree;

/// Compact layout: 31 default properties, 9-byte entries with 32 attribute
/// bits and byte-sized relatives, at most 255 objects.
pub struct CompactTree {
    table: usize,
}

impl CompactTree {
    pub fn new(table: usize) -> CompactTree {
        CompactTree { table }
    }
}

impl ObjectTree for CompactTree {
    fn type_name(&self) -> &str {
        "CompactTree"
    }

    fn object_address(&self, object: usize) -> usize {
        self.table + 62 + (9 * (object - 1))
    }

    fn attribute_count(&self) -> u8 {
        32
    }

    fn parent(&self, memory: &Memory, object: usize) -> Result<usize, RuntimeError> {
        Ok(memory.read_byte(self.object_address(object) + 4)? as usize)
    }

    fn sibling(&self, memory: &Memory, object: usize) -> Result<usize, RuntimeError> {
        Ok(memory.read_byte(self.object_address(object) + 5)? as usize)
    }

    fn child(&self, memory: &Memory, object: usize) -> Result<usize, RuntimeError> {
        Ok(memory.read_byte(self.object_address(object) + 6)? as usize)
    }

    fn set_parent(
        &self,
        memory: &mut Memory,
        object: usize,
        parent: usize,
    ) -> Result<(), RuntimeError> {
        memory.write_byte(self.object_address(object) + 4, parent as u8)
    }

    fn set_sibling(
        &self,
        memory: &mut Memory,
        object: usize,
        sibling: usize,
    ) -> Result<(), RuntimeError> {
        memory.write_byte(self.object_address(object) + 5, sibling as u8)
    }

    fn set_child(
        &self,
        memory: &mut Memory,
        object: usize,
        child: usize,
    ) -> Result<(), RuntimeError> {
        memory.write_byte(self.object_address(object) + 6, child as u8)
    }

    fn property_table_address(
        &self,
        memory: &Memory,
        object: usize,
    ) -> Result<usize, RuntimeError> {
        Ok(memory.read_word(self.object_address(object) + 7)? as usize)
    }

    fn property_number(&self, size_byte: u8) -> u8 {
        size_byte & 0x1F
    }

    fn property_size(
        &self,
        memory: &Memory,
        property_address: usize,
    ) -> Result<usize, RuntimeError> {
        let size_byte = memory.read_byte(property_address)?;
        Ok((size_byte as usize / 32) + 1)
    }

    fn property_data_offset(
        &self,
        _memory: &Memory,
        _property_address: usize,
    ) -> Result<usize, RuntimeError> {
        Ok(1)
    }

    fn property_length(
        &self,
        memory: &Memory,
        property_data_address: usize,
    ) -> Result<usize, RuntimeError> {
        self.property_size(memory, property_data_address - 1)
    }

    fn default_property(&self, memory: &Memory, property: u8) -> Result<u16, RuntimeError> {
        memory.read_word(self.table + ((property as usize - 1) * 2))
    }
}
