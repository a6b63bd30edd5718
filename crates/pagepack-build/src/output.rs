//! Partition image files
//!
//! Images are written to a temporary file in the output directory and
//! renamed into place once complete. A temporary file that is never
//! persisted is deleted when it is dropped, so a failed build does not leave
//! a half-written image under the final name.

use pagepack_core::{Result, CONTENT_PARTITION, TABLE_PARTITION};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// File the page table image is written to
pub const TABLE_FILE: &str = "page_table.part";

/// File the page content image is written to
pub const CONTENT_FILE: &str = "page_content.part";

/// Manifest describing the last completed build
pub const MANIFEST_FILE: &str = "pagepack.manifest.toml";

/// A finished partition payload and where it lives on disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionImage {
    pub partition: String,
    pub path: PathBuf,
    pub bytes: Vec<u8>,
}

/// Every file a build writes into `output_dir`
pub fn artifact_paths(output_dir: &Path) -> Vec<PathBuf> {
    vec![
        output_dir.join(TABLE_FILE),
        output_dir.join(CONTENT_FILE),
        output_dir.join(MANIFEST_FILE),
    ]
}

/// Write `bytes` to `dir/file_name` atomically
pub fn write_atomic(dir: &Path, file_name: &str, bytes: &[u8]) -> Result<PathBuf> {
    let staged = stage(dir, bytes)?;
    let dest = dir.join(file_name);
    staged.persist(&dest).map_err(|e| e.error)?;
    Ok(dest)
}

fn stage(dir: &Path, bytes: &[u8]) -> Result<NamedTempFile> {
    fs::create_dir_all(dir)?;
    let mut file = tempfile::Builder::new()
        .prefix(".pagepack")
        .tempfile_in(dir)?;
    file.write_all(bytes)?;
    file.as_file().sync_all()?;
    Ok(file)
}

/// Write the table and content images into `output_dir`.
///
/// Any manifest from an earlier build is removed first, and both images are
/// fully staged before either is renamed into place. If the content image
/// cannot be renamed, the table renamed just before it is removed again so
/// it never sits next to a content image from another build.
pub fn write_images(output_dir: &Path, table: Vec<u8>, content: Vec<u8>) -> Result<(PartitionImage, PartitionImage)> {
    let manifest = output_dir.join(MANIFEST_FILE);
    if manifest.exists() {
        fs::remove_file(&manifest)?;
    }

    let staged_table = stage(output_dir, &table)?;
    let staged_content = stage(output_dir, &content)?;

    let table_path = output_dir.join(TABLE_FILE);
    let content_path = output_dir.join(CONTENT_FILE);
    staged_table.persist(&table_path).map_err(|e| e.error)?;
    if let Err(e) = staged_content.persist(&content_path) {
        log::warn!("Removing {} after failing to write {}", table_path.display(), content_path.display());
        fs::remove_file(&table_path)?;
        return Err(e.error.into());
    }

    Ok((
        PartitionImage {
            partition: TABLE_PARTITION.to_string(),
            path: table_path,
            bytes: table,
        },
        PartitionImage {
            partition: CONTENT_PARTITION.to_string(),
            path: content_path,
            bytes: content,
        },
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_dir() -> PathBuf {
        std::env::temp_dir().join(format!("pagepack_output_{}", uuid::Uuid::new_v4()))
    }

    fn listing(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    #[test]
    fn test_write_atomic_leaves_no_temp_files() {
        let dir = temp_dir();
        let path = write_atomic(&dir, "out.bin", b"abc").unwrap();
        assert_eq!(fs::read(&path).unwrap(), b"abc");
        assert_eq!(listing(&dir), vec!["out.bin"]);

        write_atomic(&dir, "out.bin", b"defg").unwrap();
        assert_eq!(fs::read(&path).unwrap(), b"defg");

        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_write_images() {
        let dir = temp_dir();
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join(MANIFEST_FILE), "stale").unwrap();

        let (table, content) = write_images(&dir, vec![0; 9], b"<p>hi</p>".to_vec()).unwrap();
        assert_eq!(table.partition, "page_table");
        assert_eq!(content.partition, "page_content");
        assert_eq!(fs::read(&table.path).unwrap(), vec![0; 9]);
        assert_eq!(fs::read(&content.path).unwrap(), b"<p>hi</p>");
        assert_eq!(listing(&dir), vec![CONTENT_FILE, TABLE_FILE]);

        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_failed_content_write_removes_table() {
        let dir = temp_dir();
        fs::create_dir_all(dir.join(CONTENT_FILE).join("blocker")).unwrap();

        assert!(write_images(&dir, vec![0; 9], b"<p>hi</p>".to_vec()).is_err());
        assert!(!dir.join(TABLE_FILE).exists());
        assert_eq!(listing(&dir), vec![CONTENT_FILE]);

        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_dropped_stage_is_removed() {
        let dir = temp_dir();
        let staged = stage(&dir, b"partial").unwrap();
        let temp_path = staged.path().to_path_buf();
        assert!(temp_path.exists());
        drop(staged);
        assert!(!temp_path.exists());

        fs::remove_dir_all(&dir).ok();
    }
}
