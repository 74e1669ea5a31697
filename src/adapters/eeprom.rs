//! In-memory EEPROM.
//!
//! Implements [`NvStorePort`] over a byte vector that starts erased
//! (`0xFF`).  Writes only touch a cell whose value changes, mirroring the
//! wear-saving update semantics of real EEPROM drivers; the number of
//! physical writes is counted.

use log::warn;

use crate::app::ports::{NvStorePort, StorageError};

const ERASED: u8 = 0xFF;

#[derive(Debug, Clone)]
pub struct MemoryEeprom {
    cells: Vec<u8>,
    physical_writes: usize,
}

impl MemoryEeprom {
    /// An erased store of `size` bytes.
    pub fn new(size: usize) -> Self {
        Self::from_bytes(vec![ERASED; size])
    }

    /// A store holding a previous image, e.g. to simulate a power cycle.
    pub fn from_bytes(cells: Vec<u8>) -> Self {
        Self {
            cells,
            physical_writes: 0,
        }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.cells
    }

    /// Cell writes that actually changed a byte.
    pub fn physical_writes(&self) -> usize {
        self.physical_writes
    }

    /// Drop the wrapper, keeping the image.
    pub fn into_bytes(self) -> Vec<u8> {
        self.cells
    }
}

impl NvStorePort for MemoryEeprom {
    fn read(&self, offset: u16) -> Result<u8, StorageError> {
        self.cells
            .get(usize::from(offset))
            .copied()
            .ok_or(StorageError::OutOfBounds(offset))
    }

    fn write(&mut self, offset: u16, byte: u8) -> Result<(), StorageError> {
        let Some(cell) = self.cells.get_mut(usize::from(offset)) else {
            warn!("MemoryEeprom: write past end @{}", offset);
            return Err(StorageError::OutOfBounds(offset));
        };
        if *cell != byte {
            *cell = byte;
            self.physical_writes += 1;
        }
        Ok(())
    }
}
