use serde::Serialize;

use zensmu_raw::current_arch::pm_table::{ENTRY_BYTES, MAX_BYTES, VERSION_MATISSE_240903};

use crate::error::{Result, SmuError};
use crate::pmtable::matisse::MatisseTable;

/// One PM table read, decoded as little-endian binary32 values
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PmTableSnapshot {
    pub version: u32,
    pub values: Vec<f32>,
}

/// Named layouts the codec recognizes
#[derive(Debug, Clone, PartialEq)]
pub enum NamedTable {
    Matisse(Box<MatisseTable>),
}

impl PmTableSnapshot {
    /// Decode `declared_size` bytes of `bytes`
    ///
    /// The result always holds exactly `declared_size / 4` values. Sizes
    /// above the driver's cap are rejected, as are short buffers.
    pub fn decode(bytes: &[u8], declared_size: u64, version: u32) -> Result<Self> {
        if declared_size > MAX_BYTES as u64 {
            return Err(SmuError::PmTableTooLarge(declared_size));
        }
        let entries = declared_size as usize / ENTRY_BYTES;
        let needed = entries * ENTRY_BYTES;
        if bytes.len() < needed {
            return Err(SmuError::DriverError(format!(
                "PM table read returned {} of {} bytes",
                bytes.len(),
                needed
            )));
        }

        let values = bytes[..needed]
            .chunks_exact(ENTRY_BYTES)
            .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
            .collect();

        Ok(Self { version, values })
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<f32> {
        self.values.get(index).copied()
    }

    /// Byte offset of an entry, as shown next to raw dumps
    pub fn offset_of(index: usize) -> usize {
        index * ENTRY_BYTES
    }

    /// Named view of the table, `None` when the version has no known layout
    pub fn named(&self) -> Option<NamedTable> {
        match self.version {
            VERSION_MATISSE_240903 => {
                MatisseTable::decode(&self.values).map(|t| NamedTable::Matisse(Box::new(t)))
            }
            _ => None,
        }
    }

    pub fn has_named_layout(version: u32) -> bool {
        version == VERSION_MATISSE_240903
    }
}
