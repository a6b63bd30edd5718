//! Build manifest
//!
//! Records the format version, sizes and digests of the images from the
//! last completed build, next to the images themselves.

use crate::output::{write_atomic, MANIFEST_FILE};
use pagepack_core::{ContentHash, PackError, Result};
use pagepack_table::{PageEntry, TableFormat};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildManifest {
    pub format_version: u32,
    pub entry_count: u64,
    pub table_byte_length: u64,
    pub content_length: u64,
    pub table_hash: String,
    pub content_hash: String,
    #[serde(default)]
    pub entries: Vec<PageEntry>,
}

/// TOML wrapper
#[derive(Debug, Serialize, Deserialize)]
struct ManifestFile {
    manifest: BuildManifest,
}

impl BuildManifest {
    /// Describe an encoded table and its content image
    pub fn describe(table: &[u8], content: &[u8], entries: &[PageEntry]) -> Self {
        Self {
            format_version: TableFormat::CURRENT.version(),
            entry_count: entries.len() as u64,
            table_byte_length: table.len().saturating_sub(pagepack_table::PREAMBLE_LEN) as u64,
            content_length: content.len() as u64,
            table_hash: ContentHash::from_bytes(table).to_prefixed_hex(),
            content_hash: ContentHash::from_bytes(content).to_prefixed_hex(),
            entries: entries.to_vec(),
        }
    }

    /// Load manifest from file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let file: ManifestFile = toml::from_str(&content)?;
        if file.manifest.format_version != TableFormat::CURRENT.version() {
            return Err(PackError::ManifestVersion {
                found: file.manifest.format_version,
                expected: TableFormat::CURRENT.version(),
            });
        }
        Ok(file.manifest)
    }

    /// Save the manifest into `output_dir`, returning its path
    pub fn save(&self, output_dir: &Path) -> Result<PathBuf> {
        let file = ManifestFile {
            manifest: self.clone(),
        };
        let content = toml::to_string_pretty(&file)?;
        write_atomic(output_dir, MANIFEST_FILE, content.as_bytes())
    }

    /// Recorded digests of the table and content images. `None` if either
    /// field is not a `sha256:` digest.
    pub fn digests(&self) -> Option<(ContentHash, ContentHash)> {
        Some((
            ContentHash::from_prefixed_hex(&self.table_hash)?,
            ContentHash::from_prefixed_hex(&self.content_hash)?,
        ))
    }

    /// Check that an image pair matches this manifest
    pub fn matches(&self, table: &[u8], content: &[u8]) -> bool {
        self.digests().is_some_and(|(table_hash, content_hash)| {
            table_hash == ContentHash::from_bytes(table) && content_hash == ContentHash::from_bytes(content)
        })
    }
}
