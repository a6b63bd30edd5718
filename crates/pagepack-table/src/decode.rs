//! Page table decoding and lookup

use crate::entry::{Limits, PageEntry, TableHeader, FIELD_SEPARATOR, HEADER_LEN, PREAMBLE_LEN, RECORD_TERMINATOR};
use pagepack_core::{PackError, Result};
use std::collections::HashSet;

/// A decoded page table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageTable {
    header: TableHeader,
    entries: Vec<PageEntry>,
}

impl PageTable {
    /// Parse a table payload.
    ///
    /// Bytes past the declared record length are ignored, since a table
    /// read back from flash is padded out to the partition size.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < PREAMBLE_LEN || bytes[HEADER_LEN] != RECORD_TERMINATOR {
            if looks_legacy(bytes) {
                return Err(PackError::LegacyFormat);
            }
            return Err(malformed(format!(
                "expected a {}-byte preamble ending in a newline",
                PREAMBLE_LEN
            )));
        }

        let mut raw_header = [0u8; HEADER_LEN];
        raw_header.copy_from_slice(&bytes[..HEADER_LEN]);
        let header = TableHeader::from_bytes(&raw_header);

        let body = &bytes[PREAMBLE_LEN..];
        let declared = header.table_byte_length as usize;
        if body.len() < declared {
            return Err(malformed(format!(
                "header declares {} bytes of records, only {} present",
                declared,
                body.len()
            )));
        }
        if body.len() > declared {
            log::debug!("Ignoring {} trailing bytes after the table", body.len() - declared);
        }

        let records = &body[..declared];
        if !records.is_empty() && records.last() != Some(&RECORD_TERMINATOR) {
            return Err(malformed("last record is not newline-terminated".to_string()));
        }

        let entries = records
            .split(|&b| b == RECORD_TERMINATOR)
            .take_while(|line| !line.is_empty())
            .map(parse_record)
            .collect::<Result<Vec<_>>>()?;

        // take_while stops early on an empty line, so re-count every terminator
        let terminators = records.iter().filter(|&&b| b == RECORD_TERMINATOR).count();
        if terminators != entries.len() {
            return Err(malformed("empty record line".to_string()));
        }
        if entries.len() != header.entry_count as usize {
            return Err(malformed(format!(
                "header declares {} entries, found {}",
                header.entry_count,
                entries.len()
            )));
        }

        Ok(Self { header, entries })
    }

    pub fn header(&self) -> &TableHeader {
        &self.header
    }

    pub fn entries(&self) -> &[PageEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Find a page by name. With duplicate names the first record wins,
    /// which is what the firmware does.
    pub fn lookup(&self, name: &str) -> Option<&PageEntry> {
        self.entries.iter().find(|e| e.name == name)
    }

    /// Slice a page's bytes out of a content image
    pub fn page<'a>(&self, content: &'a [u8], name: &str) -> Option<&'a [u8]> {
        let entry = self.lookup(name)?;
        let start = usize::try_from(entry.offset).ok()?;
        let end = usize::try_from(entry.end()?).ok()?;
        content.get(start..end)
    }

    /// Names that appear more than once, in first-seen order
    pub fn duplicates(&self) -> Vec<&str> {
        let mut seen = HashSet::new();
        let mut reported = HashSet::new();
        let mut dups = Vec::new();
        for entry in &self.entries {
            let name = entry.name.as_str();
            if !seen.insert(name) && reported.insert(name) {
                dups.push(name);
            }
        }
        dups
    }

    /// Check every entry against the size of its content image: in bounds
    /// and not overlapping the entry before it.
    pub fn verify_against(&self, content_len: u64) -> Result<()> {
        let mut previous_end = 0u64;
        for entry in &self.entries {
            let end = entry
                .end()
                .ok_or_else(|| malformed(format!("entry `{}` overflows", entry.name)))?;
            if end > content_len {
                return Err(malformed(format!(
                    "entry `{}` ends at {}, content is {} bytes",
                    entry.name, end, content_len
                )));
            }
            if entry.offset < previous_end {
                return Err(malformed(format!(
                    "entry `{}` at {} overlaps the previous entry ending at {}",
                    entry.name, entry.offset, previous_end
                )));
            }
            previous_end = end;
        }
        Ok(())
    }
}

fn malformed(msg: String) -> PackError {
    PackError::MalformedTable(msg)
}

fn parse_record(line: &[u8]) -> Result<PageEntry> {
    let text = std::str::from_utf8(line)
        .map_err(|_| malformed(format!("record is not UTF-8: {:?}", String::from_utf8_lossy(line))))?;

    let fields: Vec<&str> = text.split(FIELD_SEPARATOR as char).collect();
    if fields.len() != 3 || fields[0].is_empty() {
        return Err(malformed(format!("expected `<name> <offset> <length>`, got {:?}", text)));
    }

    Limits::unbounded()
        .check_name(fields[0])
        .map_err(|e| malformed(format!("{} in record {:?}", e, text)))?;

    let number = |field: &str, what: &str| {
        let digits = !field.is_empty() && field.bytes().all(|b| b.is_ascii_digit());
        digits
            .then(|| field.parse::<u64>().ok())
            .flatten()
            .ok_or_else(|| malformed(format!("invalid {} {:?} in record {:?}", what, field, text)))
    };

    Ok(PageEntry {
        name: fields[0].to_string(),
        offset: number(fields[1], "offset")?,
        length: number(fields[2], "length")?,
    })
}

/// The header-less layout: `"<name> <offset> <length> "` repeated, no newlines
fn looks_legacy(bytes: &[u8]) -> bool {
    let Ok(text) = std::str::from_utf8(bytes) else {
        return false;
    };
    if text.is_empty() || text.contains('\n') || !text.ends_with(' ') {
        return false;
    }
    let fields: Vec<&str> = text.split_whitespace().collect();
    !fields.is_empty()
        && fields.len() % 3 == 0
        && fields
            .chunks(3)
            .all(|f| f[1].parse::<u64>().is_ok() && f[2].parse::<u64>().is_ok())
}
