//! Page table encoder

use crate::entry::{Limits, PageEntry, TableHeader, PREAMBLE_LEN, RECORD_TERMINATOR};
use pagepack_core::{PackError, Result};
use std::io::Write;

/// Encode entries into a table payload.
///
/// Every entry is validated before any byte is produced. The header's
/// `table_byte_length` is the measured size of the serialized records.
pub fn encode_table(entries: &[PageEntry], limits: &Limits) -> Result<Vec<u8>> {
    for entry in entries {
        limits.check_entry(entry)?;
    }

    let mut records = Vec::new();
    for entry in entries {
        writeln!(records, "{} {} {}", entry.name, entry.offset, entry.length)?;
    }

    let table_byte_length = u32::try_from(records.len()).map_err(|_| {
        PackError::TableTooLarge(format!("{} bytes of records", records.len()))
    })?;
    let entry_count = u32::try_from(entries.len())
        .map_err(|_| PackError::TableTooLarge(format!("{} entries", entries.len())))?;

    let header = TableHeader {
        table_byte_length,
        entry_count,
    };

    let mut table = Vec::with_capacity(PREAMBLE_LEN + records.len());
    table.extend_from_slice(&header.to_bytes());
    table.push(RECORD_TERMINATOR);
    table.extend_from_slice(&records);

    check_consistency(&table, &header)?;
    Ok(table)
}

/// Re-measure an encoded table against the header it was encoded with
fn check_consistency(table: &[u8], header: &TableHeader) -> Result<()> {
    let measured = (table.len() - PREAMBLE_LEN) as u64;
    if measured != u64::from(header.table_byte_length) {
        return Err(PackError::EncodingInconsistency {
            declared: u64::from(header.table_byte_length),
            measured,
        });
    }

    let terminators = table[PREAMBLE_LEN..]
        .iter()
        .filter(|&&b| b == RECORD_TERMINATOR)
        .count() as u64;
    if terminators != u64::from(header.entry_count) {
        return Err(PackError::EncodingInconsistency {
            declared: u64::from(header.entry_count),
            measured: terminators,
        });
    }

    Ok(())
}
