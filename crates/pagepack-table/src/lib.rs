//! pagepack table - the page table partition format
//!
//! The table partition starts with an 8-byte little-endian header
//! (`table_byte_length`, `entry_count`) and a newline, followed by one
//! `"<name> <offset> <length>\n"` record per page in the content partition.

mod decode;
mod encode;
mod entry;

pub use decode::PageTable;
pub use encode::encode_table;
pub use entry::{
    Limits, PageEntry, TableFormat, TableHeader, DEVICE_MAX_NAME_LEN, DEVICE_MAX_PAGE_LEN,
    HEADER_LEN, PREAMBLE_LEN,
};
