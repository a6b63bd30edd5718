//! Layered build configuration
//!
//! Config is resolved once at startup with these layers (highest wins):
//! 1. Command-line flags (applied by the caller on the resolved config)
//! 2. Environment variables: `IDF_PATH`, `PAGEPACK_PORT`
//! 3. Project-local: `pagepack.toml` (or an explicit `--config` file)
//! 4. Global: `~/.pagepack/config.toml`

use pagepack_core::{PackError, Result};
use pagepack_table::Limits;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Project-local config file name
pub const PROJECT_CONFIG_FILE: &str = "pagepack.toml";

/// `[build]` section of a config file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BuildSection {
    #[serde(default)]
    pub toolchain_root: Option<PathBuf>,
    #[serde(default)]
    pub device_path: Option<String>,
    #[serde(default)]
    pub source_dir: Option<PathBuf>,
    #[serde(default)]
    pub output_dir: Option<PathBuf>,
    #[serde(default)]
    pub extension: Option<String>,
}

/// `[minifier]`, `[partition_table]` and `[flasher]` sections
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ToolSection {
    #[serde(default)]
    pub program: Option<String>,
    #[serde(default)]
    pub args: Option<Vec<String>>,
    #[serde(default)]
    pub enabled: Option<bool>,
}

/// `[limits]` section. A value of `0` disables the limit.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LimitsSection {
    #[serde(default)]
    pub max_name_len: Option<usize>,
    #[serde(default)]
    pub max_page_len: Option<u64>,
}

/// Top-level config file structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConfigFile {
    #[serde(default)]
    pub build: BuildSection,
    #[serde(default)]
    pub minifier: ToolSection,
    #[serde(default)]
    pub partition_table: ToolSection,
    #[serde(default)]
    pub flasher: ToolSection,
    #[serde(default)]
    pub limits: LimitsSection,
}

/// A resolved external tool invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolConfig {
    pub program: String,
    pub args: Vec<String>,
    pub enabled: bool,
}

impl ToolConfig {
    fn new(program: &str, args: &[&str]) -> Self {
        Self {
            program: program.to_string(),
            args: args.iter().map(|a| a.to_string()).collect(),
            enabled: true,
        }
    }

    fn apply(&mut self, section: ToolSection) {
        if let Some(program) = section.program {
            self.program = program;
        }
        if let Some(args) = section.args {
            self.args = args;
        }
        if let Some(enabled) = section.enabled {
            self.enabled = enabled;
        }
    }
}

/// Environment values that feed into the config
#[derive(Debug, Clone, Default)]
pub struct EnvOverrides {
    pub idf_path: Option<PathBuf>,
    pub port: Option<String>,
}

impl EnvOverrides {
    /// Read `IDF_PATH` and `PAGEPACK_PORT` from the process environment
    pub fn from_env() -> Self {
        Self {
            idf_path: std::env::var_os("IDF_PATH").map(PathBuf::from),
            port: std::env::var("PAGEPACK_PORT").ok(),
        }
    }
}

/// Resolved configuration passed explicitly into a build
#[derive(Debug, Clone)]
pub struct BuildConfig {
    /// Install root of the ESP-IDF toolchain
    pub toolchain_root: Option<PathBuf>,
    /// Serial port of the device to flash
    pub device_path: String,
    /// Directory scanned for page assets
    pub source_dir: PathBuf,
    /// Directory receiving the partition images and manifest
    pub output_dir: PathBuf,
    /// Suffix an asset file must carry
    pub extension: String,
    pub minifier: ToolConfig,
    pub partition_table: ToolConfig,
    pub flasher: ToolConfig,
    pub limits: Limits,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            toolchain_root: None,
            device_path: "/dev/ttyUSB0".to_string(),
            source_dir: PathBuf::from("page_content"),
            output_dir: PathBuf::from("build/partition_table"),
            extension: ".html".to_string(),
            minifier: ToolConfig::new("minify", &[]),
            partition_table: ToolConfig::new("idf.py", &["partition-table", "partition-table-flash"]),
            flasher: ToolConfig::new("python", &[]),
            limits: Limits::default(),
        }
    }
}

impl BuildConfig {
    /// Load config with layered precedence: global < project < env vars.
    ///
    /// `explicit` replaces the project-local `pagepack.toml` and must exist.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let mut layers = Vec::new();

        if let Some(global_path) = Self::global_config_path() {
            if global_path.exists() {
                layers.push(Self::load_file(&global_path)?);
            }
        }

        match explicit {
            Some(path) => layers.push(Self::load_file(path)?),
            None => {
                let local_path = PathBuf::from(PROJECT_CONFIG_FILE);
                if local_path.exists() {
                    layers.push(Self::load_file(&local_path)?);
                }
            }
        }

        Self::resolve(layers, EnvOverrides::from_env())
    }

    /// Load config from a specific file path only, plus the given environment
    pub fn load_from_file(path: &Path, env: EnvOverrides) -> Result<Self> {
        Self::resolve(vec![Self::load_file(path)?], env)
    }

    /// Apply config file layers (lowest precedence first) and environment overrides
    pub fn resolve(layers: Vec<ConfigFile>, env: EnvOverrides) -> Result<Self> {
        let mut config = Self::default();
        for layer in layers {
            config.apply(layer);
        }

        if let Some(idf_path) = env.idf_path {
            config.toolchain_root = Some(idf_path);
        }
        if let Some(port) = env.port {
            config.device_path = port;
        }

        config.validate()?;
        Ok(config)
    }

    /// Check values that would otherwise fail deep inside a build
    pub fn validate(&self) -> Result<()> {
        if self.extension.is_empty() {
            return Err(PackError::ConfigError("extension must not be empty".to_string()));
        }
        if self.device_path.is_empty() {
            return Err(PackError::ConfigError("device_path must not be empty".to_string()));
        }
        if self.source_dir == self.output_dir {
            log::warn!(
                "Source and output directory are both {}; generated files will be skipped",
                self.source_dir.display()
            );
        }
        Ok(())
    }

    /// Path of `parttool.py` inside the toolchain
    pub fn parttool_path(&self) -> Result<PathBuf> {
        let root = self.toolchain_root.as_ref().ok_or_else(|| {
            PackError::ConfigError(
                "toolchain root is not set (set IDF_PATH or build.toolchain_root)".to_string(),
            )
        })?;
        Ok(root
            .join("components")
            .join("partition_table")
            .join("parttool.py"))
    }

    fn apply(&mut self, file: ConfigFile) {
        let build = file.build;
        if build.toolchain_root.is_some() {
            self.toolchain_root = build.toolchain_root;
        }
        if let Some(device_path) = build.device_path {
            self.device_path = device_path;
        }
        if let Some(source_dir) = build.source_dir {
            self.source_dir = source_dir;
        }
        if let Some(output_dir) = build.output_dir {
            self.output_dir = output_dir;
        }
        if let Some(extension) = build.extension {
            self.extension = extension;
        }

        self.minifier.apply(file.minifier);
        self.partition_table.apply(file.partition_table);
        self.flasher.apply(file.flasher);

        if let Some(max) = file.limits.max_name_len {
            self.limits.max_name_len = (max > 0).then_some(max);
        }
        if let Some(max) = file.limits.max_page_len {
            self.limits.max_page_len = (max > 0).then_some(max);
        }
    }

    fn global_config_path() -> Option<PathBuf> {
        dirs::home_dir().map(|h| h.join(".pagepack").join("config.toml"))
    }

    fn load_file(path: &Path) -> Result<ConfigFile> {
        let content = std::fs::read_to_string(path)?;
        let config: ConfigFile = toml::from_str(&content).map_err(|e| {
            PackError::ConfigError(format!("Failed to parse config {}: {}", path.display(), e))
        })?;
        Ok(config)
    }
}
