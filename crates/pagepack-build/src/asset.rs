//! Asset enumeration

use pagepack_core::{PackError, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// A page source file waiting to be packed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Asset {
    /// File name without the recognized extension; becomes the table key
    pub name: String,
    pub path: PathBuf,
}

/// List the assets in `source_dir` whose file name ends with `extension`.
///
/// Only regular files are considered, dot-prefixed ones included. Any path
/// listed in `exclude` (the build's own output files) is skipped. The result is
/// sorted by file name so the table layout does not depend on the order the
/// filesystem returns entries in.
pub fn enumerate_assets(source_dir: &Path, extension: &str, exclude: &[PathBuf]) -> Result<Vec<Asset>> {
    if !source_dir.is_dir() {
        return Err(PackError::NotFound(source_dir.to_path_buf()));
    }

    let excluded: Vec<PathBuf> = exclude.iter().filter_map(|p| fs::canonicalize(p).ok()).collect();

    let mut assets = Vec::new();
    for entry in fs::read_dir(source_dir)? {
        let entry = entry?;
        let path = entry.path();
        let file_name = entry.file_name();

        let Some(file_name) = file_name.to_str() else {
            if file_name.to_string_lossy().ends_with(extension) {
                return Err(PackError::InvalidName {
                    name: file_name.to_string_lossy().into_owned(),
                    reason: "file name is not valid UTF-8".to_string(),
                });
            }
            continue;
        };

        if !path.is_file() {
            continue;
        }
        let Some(name) = file_name.strip_suffix(extension) else {
            continue;
        };
        if is_excluded(&path, &excluded) {
            log::debug!("Skipping generated file {}", path.display());
            continue;
        }

        assets.push(Asset {
            name: name.to_string(),
            path,
        });
    }

    assets.sort_by(|a, b| a.path.file_name().cmp(&b.path.file_name()));
    log::info!("Found {} assets in {}", assets.len(), source_dir.display());
    Ok(assets)
}

fn is_excluded(path: &Path, excluded: &[PathBuf]) -> bool {
    match fs::canonicalize(path) {
        Ok(canonical) => excluded.contains(&canonical),
        Err(_) => false,
    }
}
