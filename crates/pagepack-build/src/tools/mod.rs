//! External collaborators of a build
//!
//! Every external program a build depends on sits behind one of these
//! traits, so the packing logic can run against in-process stand-ins.

mod command;
mod local;
pub mod mock;

use crate::asset::Asset;
use crate::config::BuildConfig;
use crate::output::PartitionImage;
use pagepack_core::Result;

pub use command::{CommandMinifier, IdfPartitionTool, ParttoolFlasher};
pub use local::{DryRunFlasher, NoopPartitionTool, RawTransformer};

/// Turns an asset's source file into the bytes stored on the device
pub trait Transformer {
    /// Tool name, for logs
    fn name(&self) -> &str;

    /// Produce the packed bytes for one asset
    fn transform(&self, asset: &Asset) -> Result<Vec<u8>>;
}

/// Writes a finished partition image to the device
pub trait Flasher {
    /// Tool name, for logs
    fn name(&self) -> &str;

    /// Write `image` to the partition named by `image.partition`
    fn write_partition(&self, image: &PartitionImage) -> Result<()>;
}

/// Generates and flashes the device's partition table ahead of a build
pub trait PartitionTool {
    /// Tool name, for logs
    fn name(&self) -> &str;

    fn prepare(&self) -> Result<()>;
}

/// The set of collaborators a build runs with
pub struct Toolset {
    pub partition_tool: Box<dyn PartitionTool>,
    pub transformer: Box<dyn Transformer>,
    pub flasher: Box<dyn Flasher>,
}

impl Toolset {
    /// Build the real tools described by a config.
    ///
    /// Disabled tools are replaced by their local stand-ins: no partition
    /// table step, raw file bytes instead of minified ones, and a dry-run
    /// flasher that only logs.
    pub fn from_config(config: &BuildConfig) -> Result<Self> {
        let partition_tool: Box<dyn PartitionTool> = if config.partition_table.enabled {
            Box::new(IdfPartitionTool::new(
                &config.partition_table,
                config.toolchain_root.clone(),
                &config.device_path,
            ))
        } else {
            Box::new(NoopPartitionTool)
        };

        let transformer: Box<dyn Transformer> = if config.minifier.enabled {
            Box::new(CommandMinifier::new(&config.minifier))
        } else {
            Box::new(RawTransformer)
        };

        let flasher: Box<dyn Flasher> = if config.flasher.enabled {
            Box::new(ParttoolFlasher::new(
                &config.flasher,
                config.parttool_path()?,
                &config.device_path,
            ))
        } else {
            Box::new(DryRunFlasher)
        };

        Ok(Self {
            partition_tool,
            transformer,
            flasher,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pagepack_core::PackError;
    use std::path::PathBuf;

    #[test]
    fn test_from_config_defaults() {
        let mut config = BuildConfig::default();
        config.toolchain_root = Some(PathBuf::from("/opt/esp-idf"));

        let tools = Toolset::from_config(&config).unwrap();
        assert_eq!(tools.partition_tool.name(), "idf.py");
        assert_eq!(tools.transformer.name(), "minify");
        assert_eq!(tools.flasher.name(), "parttool");
    }

    #[test]
    fn test_disabled_tools_use_stand_ins() {
        let mut config = BuildConfig::default();
        config.partition_table.enabled = false;
        config.minifier.enabled = false;
        config.flasher.enabled = false;

        let tools = Toolset::from_config(&config).unwrap();
        assert_eq!(tools.partition_tool.name(), "none");
        assert_eq!(tools.transformer.name(), "raw");
        assert_eq!(tools.flasher.name(), "dry-run");
    }

    #[test]
    fn test_flashing_requires_toolchain() {
        let config = BuildConfig::default();
        assert!(matches!(
            Toolset::from_config(&config),
            Err(PackError::ConfigError(_))
        ));
    }
}
