//! In-process stand-ins for disabled tools

use super::{Flasher, PartitionTool, Transformer};
use crate::asset::Asset;
use crate::output::PartitionImage;
use pagepack_core::{PackError, Result};

/// Packs the source file unchanged
#[derive(Debug, Default, Clone, Copy)]
pub struct RawTransformer;

impl Transformer for RawTransformer {
    fn name(&self) -> &str {
        "raw"
    }

    fn transform(&self, asset: &Asset) -> Result<Vec<u8>> {
        std::fs::read(&asset.path).map_err(|e| PackError::TransformFailed {
            asset: asset.name.clone(),
            reason: format!("failed to read {}: {}", asset.path.display(), e),
        })
    }
}

/// Logs what would be flashed and leaves the device alone
#[derive(Debug, Default, Clone, Copy)]
pub struct DryRunFlasher;

impl Flasher for DryRunFlasher {
    fn name(&self) -> &str {
        "dry-run"
    }

    fn write_partition(&self, image: &PartitionImage) -> Result<()> {
        log::info!(
            "Dry run: not writing {} bytes from {} to partition `{}`",
            image.bytes.len(),
            image.path.display(),
            image.partition
        );
        Ok(())
    }
}

/// Skips the partition table step
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopPartitionTool;

impl PartitionTool for NoopPartitionTool {
    fn name(&self) -> &str {
        "none"
    }

    fn prepare(&self) -> Result<()> {
        log::info!("Skipping partition table generation");
        Ok(())
    }
}
