//! Partition writing

use crate::output::PartitionImage;
use crate::tools::Flasher;
use pagepack_core::{PackError, Result};

/// Hand each image to the flasher, in order. The first failure stops the run.
pub fn write_partitions(images: &[&PartitionImage], flasher: &dyn Flasher) -> Result<()> {
    for image in images {
        log::info!(
            "Writing {} bytes to partition `{}` with {}",
            image.bytes.len(),
            image.partition,
            flasher.name()
        );
        flasher.write_partition(image).map_err(|e| match e {
            PackError::WriteFailed { .. } => e,
            other => PackError::WriteFailed {
                partition: image.partition.clone(),
                reason: other.to_string(),
            },
        })?;
    }
    Ok(())
}
