//! Page table record and header types

use pagepack_core::{PackError, Result};
use serde::{Deserialize, Serialize};

/// Length of the binary header: `table_byte_length` then `entry_count`
pub const HEADER_LEN: usize = 8;

/// Header plus the `'\n'` that separates it from the records
pub const PREAMBLE_LEN: usize = HEADER_LEN + 1;

/// Separator between the fields of a record
pub const FIELD_SEPARATOR: u8 = b' ';

/// Terminator after every record
pub const RECORD_TERMINATOR: u8 = b'\n';

/// One page in the table: where its bytes live in the content partition
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PageEntry {
    pub name: String,
    pub offset: u64,
    pub length: u64,
}

impl PageEntry {
    pub fn new(name: impl Into<String>, offset: u64, length: u64) -> Self {
        Self {
            name: name.into(),
            offset,
            length,
        }
    }

    /// One past the last content byte of this page, `None` on overflow
    pub fn end(&self) -> Option<u64> {
        self.offset.checked_add(self.length)
    }
}

/// Fixed-width header at the start of the table partition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TableHeader {
    /// Exact byte length of all records, excluding the preamble
    pub table_byte_length: u32,
    pub entry_count: u32,
}

impl TableHeader {
    pub fn to_bytes(&self) -> [u8; HEADER_LEN] {
        let mut bytes = [0u8; HEADER_LEN];
        bytes[..4].copy_from_slice(&self.table_byte_length.to_le_bytes());
        bytes[4..].copy_from_slice(&self.entry_count.to_le_bytes());
        bytes
    }

    pub fn from_bytes(bytes: &[u8; HEADER_LEN]) -> Self {
        Self {
            table_byte_length: u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]),
            entry_count: u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]),
        }
    }
}

/// On-disk table layouts.
///
/// Only `V1` is produced or accepted: an 8-byte little-endian header, a
/// newline, then newline-terminated `"<name> <offset> <length>"` records.
/// The older header-less layout with space-terminated records is recognized
/// by the decoder and rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TableFormat {
    V1,
}

impl TableFormat {
    pub const CURRENT: TableFormat = TableFormat::V1;

    pub fn version(self) -> u32 {
        match self {
            TableFormat::V1 => 1,
        }
    }
}

/// Limits imposed by the firmware that reads the table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    /// Longest name in bytes (`None` for no limit)
    pub max_name_len: Option<usize>,
    /// Largest page in bytes (`None` for no limit)
    pub max_page_len: Option<u64>,
}

/// The firmware scans names with `%31s` into a 32-byte key
pub const DEVICE_MAX_NAME_LEN: usize = 31;

/// The firmware's template buffer is 1024 bytes including the terminator
pub const DEVICE_MAX_PAGE_LEN: u64 = 1023;

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_name_len: Some(DEVICE_MAX_NAME_LEN),
            max_page_len: Some(DEVICE_MAX_PAGE_LEN),
        }
    }
}

impl Limits {
    /// No limits beyond the record layout itself
    pub fn unbounded() -> Self {
        Self {
            max_name_len: None,
            max_page_len: None,
        }
    }

    /// Check that a name can be stored as a single record field
    pub fn check_name(&self, name: &str) -> Result<()> {
        let reject = |reason: String| {
            Err(PackError::InvalidName {
                name: name.to_string(),
                reason,
            })
        };

        if name.is_empty() {
            return reject("name is empty".to_string());
        }
        if let Some(c) = name.chars().find(|c| c.is_whitespace()) {
            return reject(format!("contains whitespace {:?}", c));
        }
        if let Some(max) = self.max_name_len {
            if name.len() > max {
                return reject(format!("{} bytes long, at most {} allowed", name.len(), max));
            }
        }
        Ok(())
    }

    /// Check a full entry: its name and its page length
    pub fn check_entry(&self, entry: &PageEntry) -> Result<()> {
        self.check_name(&entry.name)?;
        if let Some(max) = self.max_page_len {
            if entry.length > max {
                return Err(PackError::PageTooLarge {
                    name: entry.name.clone(),
                    length: entry.length,
                    max,
                });
            }
        }
        Ok(())
    }
}
