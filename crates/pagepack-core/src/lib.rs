//! pagepack core - shared types for the page packing pipeline
//!
//! This crate provides the types that the other pagepack crates depend on:
//! - `PackError`, `BuildError` and the `Result` alias
//! - `Stage` - the states of a build
//! - `ContentHash` - SHA-256 digests of partition images
//! - the fixed partition names the firmware looks up

mod error;
mod hash;
mod stage;

pub use error::{BuildError, PackError, Result};
pub use hash::ContentHash;
pub use stage::Stage;

/// Partition holding the page table
pub const TABLE_PARTITION: &str = "page_table";

/// Partition holding the concatenated page content
pub const CONTENT_PARTITION: &str = "page_content";
