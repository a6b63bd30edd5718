//! Error types for pagepack

use crate::stage::Stage;
use std::path::PathBuf;
use thiserror::Error;

/// The main error type for packing operations
#[derive(Debug, Error)]
pub enum PackError {
    #[error("Source directory not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("Transform failed for asset `{asset}`: {reason}")]
    TransformFailed { asset: String, reason: String },

    #[error("Invalid asset name {name:?}: {reason}")]
    InvalidName { name: String, reason: String },

    #[error("Encoding inconsistency: header declares {declared} bytes, measured {measured}")]
    EncodingInconsistency { declared: u64, measured: u64 },

    #[error("Table too large: {0}")]
    TableTooLarge(String),

    #[error("Page `{name}` is {length} bytes, the device accepts at most {max}")]
    PageTooLarge { name: String, length: u64, max: u64 },

    #[error("Malformed page table: {0}")]
    MalformedTable(String),

    #[error("Legacy page table layout (no header, space-terminated records) is not supported")]
    LegacyFormat,

    #[error("Build manifest is for table format {found}, expected {expected}")]
    ManifestVersion { found: u32, expected: u32 },

    #[error("Partition table tool failed: {0}")]
    PartitionTableFailed(String),

    #[error("Writing partition `{partition}` failed: {reason}")]
    WriteFailed { partition: String, reason: String },

    #[error("Build already failed: {0}")]
    Aborted(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    TomlParseError(String),

    #[error("TOML serialization error: {0}")]
    TomlSerError(String),
}

/// Result type alias for packing operations
pub type Result<T> = std::result::Result<T, PackError>;

impl From<toml::de::Error> for PackError {
    fn from(err: toml::de::Error) -> Self {
        PackError::TomlParseError(err.to_string())
    }
}

impl From<toml::ser::Error> for PackError {
    fn from(err: toml::ser::Error) -> Self {
        PackError::TomlSerError(err.to_string())
    }
}

/// A failed build: the stage the build had reached and the error that stopped it
#[derive(Debug, Error)]
#[error("build failed during `{}` (last completed stage: {stage}): {cause}", .stage.next_step())]
pub struct BuildError {
    pub stage: Stage,
    pub cause: PackError,
}

impl BuildError {
    pub fn new(stage: Stage, cause: PackError) -> Self {
        Self { stage, cause }
    }
}
