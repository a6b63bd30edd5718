//! pagepack build - turns a directory of pages into flashable partitions
//!
//! A build enumerates the page assets in a source directory, runs each one
//! through a transformer (normally an external minifier), packs the results
//! into one content image, encodes the page table that indexes it, writes
//! both images into the output directory and hands them to a flasher.

pub mod asset;
pub mod config;
pub mod manifest;
pub mod output;
pub mod packer;
pub mod pipeline;
pub mod tools;
pub mod writer;

pub use asset::{enumerate_assets, Asset};
pub use config::{BuildConfig, EnvOverrides};
pub use manifest::BuildManifest;
pub use output::PartitionImage;
pub use packer::{pack_assets, PackedContent};
pub use pipeline::{BuildOutput, BuildState, Pipeline};
pub use tools::{Flasher, PartitionTool, Toolset, Transformer};
pub use writer::write_partitions;
