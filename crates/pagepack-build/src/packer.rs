//! Content packing

use crate::asset::Asset;
use crate::tools::Transformer;
use pagepack_core::{PackError, Result};
use pagepack_table::PageEntry;

/// The content partition and the table entries that index into it
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PackedContent {
    pub entries: Vec<PageEntry>,
    pub content: Vec<u8>,
}

/// Transform every asset in order and append it to one content buffer.
///
/// Each entry's offset is the buffer length before its bytes were appended.
/// The first transform failure aborts packing; no asset is skipped.
pub fn pack_assets(assets: &[Asset], transformer: &dyn Transformer) -> Result<PackedContent> {
    let mut packed = PackedContent::default();

    for asset in assets {
        let bytes = transformer.transform(asset).map_err(|e| match e {
            PackError::TransformFailed { .. } => e,
            other => PackError::TransformFailed {
                asset: asset.name.clone(),
                reason: other.to_string(),
            },
        })?;

        let entry = PageEntry::new(
            asset.name.clone(),
            packed.content.len() as u64,
            bytes.len() as u64,
        );
        log::info!("{} {} {}", entry.name, entry.offset, entry.length);

        packed.content.extend_from_slice(&bytes);
        packed.entries.push(entry);
    }

    Ok(packed)
}
