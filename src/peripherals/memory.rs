//! CPU memory.

use std::fmt;

use tracing::debug;

use crate::core::opcodes::extract_opcode_from_array;
use crate::core::types::{C8Addr, C8Byte};
use crate::errors::RomError;

// CPU memory vars.

/// Memory size.
pub const MEMORY_SIZE: usize = 4096;
/// Chunk size.
pub const CHUNK_SIZE: usize = 64;

/// ROM start address.
pub const ROM_START_ADDR: C8Addr = 0x200;
/// Maximum ROM size.
pub const MAX_ROM_SIZE: usize = MEMORY_SIZE - ROM_START_ADDR as usize;

/// CPU memory struct.
///
/// Flat 4 KiB address space. Every access masks its address to 12 bits,
/// so out-of-range addresses wrap instead of faulting.
#[derive(Clone)]
pub struct Memory {
    data: [C8Byte; MEMORY_SIZE],
}

impl Memory {
    /// Create new memory.
    pub fn new() -> Self {
        Memory {
            data: [0; MEMORY_SIZE],
        }
    }

    /// Write data at offset.
    ///
    /// # Arguments
    ///
    /// * `offset` - Offset.
    /// * `data` - Data (bytes).
    ///
    pub fn write_data_at_offset(&mut self, offset: C8Addr, data: &[C8Byte]) {
        for (idx, v) in data.iter().enumerate() {
            self.write_byte_at_offset(offset.wrapping_add(idx as C8Addr), *v);
        }
    }

    /// Write byte at offset.
    ///
    /// # Arguments
    ///
    /// * `offset` - Offset.
    /// * `byte` - Byte.
    ///
    pub fn write_byte_at_offset(&mut self, offset: C8Addr, byte: C8Byte) {
        self.data[(offset & 0x0FFF) as usize] = byte;
    }

    /// Get byte at offset.
    ///
    /// # Arguments
    ///
    /// * `offset` - Offset.
    ///
    /// # Returns
    ///
    /// * Byte.
    ///
    pub fn read_byte_at_offset(&self, offset: C8Addr) -> C8Byte {
        self.data[(offset & 0x0FFF) as usize]
    }

    /// Load ROM data.
    ///
    /// Copies the bytes at `ROM_START_ADDR`. Fails if the ROM does not
    /// fit in the remaining address space.
    ///
    /// # Arguments
    ///
    /// * `data` - ROM bytes.
    ///
    pub fn load_rom(&mut self, data: &[C8Byte]) -> Result<(), RomError> {
        if data.len() > MAX_ROM_SIZE {
            return Err(RomError::RomTooLarge {
                size: data.len(),
                max: MAX_ROM_SIZE,
            });
        }

        let start = ROM_START_ADDR as usize;
        self.data[start..start + data.len()].copy_from_slice(data);

        debug!(size = data.len(), "ROM loaded");
        Ok(())
    }

    /// Read opcode at address.
    ///
    /// # Arguments
    ///
    /// * `addr` - Address.
    ///
    /// # Returns
    ///
    /// * Opcode value.
    ///
    pub fn read_opcode_at_address(&self, addr: C8Addr) -> C8Addr {
        extract_opcode_from_array(&self.data, (addr & 0x0FFF) as usize)
    }

    /// Get data.
    pub fn get_data(&self) -> &[C8Byte] {
        &self.data
    }

    /// Reset memory.
    pub fn reset(&mut self) {
        self.data = [0; MEMORY_SIZE];
    }
}

impl Default for Memory {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Memory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, chunk) in self.data.chunks(CHUNK_SIZE).enumerate() {
            write!(
                f,
                "    {:04X}-{:04X} | ",
                idx * CHUNK_SIZE,
                (idx + 1) * CHUNK_SIZE
            )?;

            for chunk_value in chunk.iter() {
                write!(f, "{:02X} ", chunk_value)?;
            }

            writeln!(f)?;
        }

        Ok(())
    }
}
