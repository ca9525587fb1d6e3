//! Story file memory map
use crate::{
    error::{ErrorCode, RuntimeError},
    recoverable_error,
};

use super::header::HeaderField;

/// Combines two bytes into a big-endian word value
pub fn word_value(high: u8, low: u8) -> u16 {
    ((high as u16) << 8) | low as u16
}

/// Splits a word value into big-endian bytes
pub fn byte_values(word: u16) -> (u8, u8) {
    ((word >> 8) as u8, word as u8)
}

/// The flat, byte-addressable memory map.
///
/// Addresses below the static mark are writable; everything else is
/// read-only. A pristine copy of dynamic memory is kept from load time for
/// restart, save-state compression, and restore.
pub struct Memory {
    map: Vec<u8>,
    static_mark: usize,
    file_length: usize,
    dynamic: Vec<u8>,
}

impl Memory {
    pub fn new(map: Vec<u8>) -> Memory {
        let static_mark = word_value(
            map[HeaderField::StaticMark as usize],
            map[HeaderField::StaticMark as usize + 1],
        ) as usize;
        let scale = match map[0] {
            1..=3 => 2,
            4 | 5 => 4,
            _ => 8,
        };
        let l = word_value(
            map[HeaderField::FileLength as usize],
            map[HeaderField::FileLength as usize + 1],
        ) as usize
            * scale;
        // Early story files don't record their length
        let file_length = if l == 0 { map.len() } else { l };
        let dynamic = map[0..static_mark].to_vec();
        debug!(target: "app::memory", "Memory map: {:04x} bytes, dynamic memory ends at {:04x}", map.len(), static_mark);

        Memory {
            map,
            static_mark,
            file_length,
            dynamic,
        }
    }

    /// Get the byte address of the start of static memory
    pub fn static_mark(&self) -> usize {
        self.static_mark
    }

    pub fn file_length(&self) -> usize {
        self.file_length
    }

    pub fn size(&self) -> usize {
        self.map.len()
    }

    /// Read a byte from memory
    ///
    /// # Arguments
    /// * `address` - Byte address
    ///
    /// # Returns
    /// [Result] with the byte value or a [RuntimeError]
    pub fn read_byte(&self, address: usize) -> Result<u8, RuntimeError> {
        if address < self.map.len() {
            Ok(self.map[address])
        } else {
            recoverable_error!(
                ErrorCode::IllegalMemoryAccess,
                "Byte read of {:#06x} beyond end of memory ({:#06x})",
                address,
                self.map.len() - 1
            )
        }
    }

    /// Read a word from memory
    ///
    /// # Arguments
    /// * `address` - Byte address of the high byte
    ///
    /// # Returns
    /// [Result] with the word value or a [RuntimeError]
    pub fn read_word(&self, address: usize) -> Result<u16, RuntimeError> {
        if address < self.map.len() - 1 {
            Ok(word_value(self.map[address], self.map[address + 1]))
        } else {
            recoverable_error!(
                ErrorCode::IllegalMemoryAccess,
                "Word read of {:#06x} beyond end of memory ({:#06x})",
                address,
                self.map.len() - 1
            )
        }
    }

    /// Write a byte to dynamic memory
    ///
    /// # Arguments
    /// * `address` - Byte address
    /// * `value` - Byte value
    ///
    /// # Returns
    /// Empty [Result] or a [RuntimeError]
    pub fn write_byte(&mut self, address: usize, value: u8) -> Result<(), RuntimeError> {
        if address < self.static_mark {
            debug!(target: "app::memory", "Write {:#04x} to {:#06x}", value, address);
            self.map[address] = value;
            Ok(())
        } else {
            recoverable_error!(
                ErrorCode::IllegalMemoryAccess,
                "Byte write of {:#04x} to {:#06x} above the static mark ({:#06x})",
                value,
                address,
                self.static_mark
            )
        }
    }

    /// Write a word to dynamic memory
    ///
    /// # Arguments
    /// * `address` - Byte address of the high byte
    /// * `value` - Word value
    ///
    /// # Returns
    /// Empty [Result] or a [RuntimeError]
    pub fn write_word(&mut self, address: usize, value: u16) -> Result<(), RuntimeError> {
        if address < self.static_mark - 1 {
            let (high, low) = byte_values(value);
            debug!(target: "app::memory", "Write {:#06x} to {:#06x}", value, address);
            self.map[address] = high;
            self.map[address + 1] = low;
            Ok(())
        } else {
            recoverable_error!(
                ErrorCode::IllegalMemoryAccess,
                "Word write of {:#06x} to {:#06x} above the static mark ({:#06x})",
                value,
                address,
                self.static_mark
            )
        }
    }

    /// Copy a slice of memory
    ///
    /// # Arguments
    /// * `address` - Byte address of the start of the slice
    /// * `length` - Number of bytes
    ///
    /// # Returns
    /// [Result] with a vector of byte values or a [RuntimeError]
    pub fn slice(&self, address: usize, length: usize) -> Result<Vec<u8>, RuntimeError> {
        if address + length <= self.map.len() {
            Ok(self.map[address..address + length].to_vec())
        } else {
            recoverable_error!(
                ErrorCode::IllegalMemoryAccess,
                "Read of {} bytes at {:#06x} beyond end of memory ({:#06x})",
                length,
                address,
                self.map.len() - 1
            )
        }
    }

    /// Get the current dynamic memory region
    pub fn dynamic(&self) -> &[u8] {
        &self.map[0..self.static_mark]
    }

    /// Verification checksum: the sum of every byte from 0x40 to the end of
    /// the file, mod 0x10000.
    pub fn checksum(&self) -> Result<u16, RuntimeError> {
        let end = usize::min(self.file_length, self.map.len());
        let mut checksum = 0u16;
        for b in &self.map[0x40..end] {
            checksum = checksum.wrapping_add(*b as u16);
        }

        Ok(checksum)
    }

    /// Compress dynamic memory against the pristine image.
    ///
    /// Each byte is XORed with the load-time value. Runs of zero (unchanged)
    /// bytes are encoded as a 0 byte followed by a count byte meaning "that
    /// many additional zeros", so runs up to 256 fit in two bytes. Trailing
    /// zero runs are omitted.
    pub fn compress(&self) -> Vec<u8> {
        let mut result = Vec::new();
        let mut run = 0usize;
        for (i, b) in self.dynamic.iter().enumerate() {
            let x = self.map[i] ^ b;
            if x == 0 {
                run += 1;
            } else {
                while run > 256 {
                    result.push(0);
                    result.push(255);
                    run -= 256;
                }
                if run > 0 {
                    result.push(0);
                    result.push((run - 1) as u8);
                    run = 0;
                }
                result.push(x);
            }
        }

        result
    }

    /// Restore dynamic memory from an uncompressed image
    ///
    /// # Arguments
    /// * `data` - Dynamic memory image
    ///
    /// # Returns
    /// Empty [Result] or a [RuntimeError]
    pub fn restore(&mut self, data: &[u8]) -> Result<(), RuntimeError> {
        if data.len() != self.static_mark {
            recoverable_error!(
                ErrorCode::Restore,
                "Dynamic memory image is {:#06x} bytes, expected {:#06x}",
                data.len(),
                self.static_mark
            )
        } else {
            self.map[0..self.static_mark].copy_from_slice(data);
            Ok(())
        }
    }

    /// Restore dynamic memory from a compressed delta.
    ///
    /// # Arguments
    /// * `data` - XOR/RLE compressed dynamic memory
    ///
    /// # Returns
    /// Empty [Result] or a [RuntimeError]
    pub fn restore_compressed(&mut self, data: &[u8]) -> Result<(), RuntimeError> {
        let mut address = 0;
        let mut i = 0;
        while i < data.len() {
            let b = data[i];
            if b == 0 {
                if i + 1 >= data.len() {
                    return recoverable_error!(
                        ErrorCode::Restore,
                        "Compressed memory ends mid zero-run"
                    );
                }
                let run = data[i + 1] as usize + 1;
                if address + run > self.static_mark {
                    return recoverable_error!(
                        ErrorCode::Restore,
                        "Compressed memory run extends past the static mark"
                    );
                }
                // Unchanged from load, which is not the same as unchanged
                // since the snapshot
                for _ in 0..run {
                    self.map[address] = self.dynamic[address];
                    address += 1;
                }
                i += 2;
            } else {
                if address >= self.static_mark {
                    return recoverable_error!(
                        ErrorCode::Restore,
                        "Compressed memory delta extends past the static mark"
                    );
                }
                self.map[address] = self.dynamic[address] ^ b;
                address += 1;
                i += 1;
            }
        }
        // Anything not covered by the delta is unchanged from load
        while address < self.static_mark {
            self.map[address] = self.dynamic[address];
            address += 1;
        }

        Ok(())
    }

    /// Reset dynamic memory to the pristine load-time image
    pub fn reset(&mut self) {
        let d = self.dynamic.clone();
        self.map[0..self.static_mark].copy_from_slice(&d);
    }
}
