//! Build command

use anyhow::Result;
use pagepack_build::{BuildConfig, BuildOutput, Pipeline, Toolset};
use std::path::{Path, PathBuf};

pub struct BuildArgs {
    pub config: Option<String>,
    pub source: Option<String>,
    pub output: Option<String>,
    pub port: Option<String>,
    pub idf_path: Option<String>,
    pub no_flash: bool,
    pub skip_partition_table: bool,
    pub no_minify: bool,
}

pub fn run(args: BuildArgs) -> Result<()> {
    let mut config = BuildConfig::load(args.config.as_deref().map(Path::new))?;
    apply_args(&mut config, &args);
    config.validate()?;

    let tools = Toolset::from_config(&config)?;
    let pipeline = Pipeline::new(config, tools);
    let flashed = pipeline.config().flasher.enabled;
    let output = pipeline.run()?;

    print_summary(&output, flashed);
    Ok(())
}

/// Command-line flags take precedence over every config layer
fn apply_args(config: &mut BuildConfig, args: &BuildArgs) {
    if let Some(source) = &args.source {
        config.source_dir = PathBuf::from(source);
    }
    if let Some(output) = &args.output {
        config.output_dir = PathBuf::from(output);
    }
    if let Some(port) = &args.port {
        config.device_path = port.clone();
    }
    if let Some(idf_path) = &args.idf_path {
        config.toolchain_root = Some(PathBuf::from(idf_path));
    }
    if args.no_flash {
        config.flasher.enabled = false;
    }
    if args.skip_partition_table {
        config.partition_table.enabled = false;
    }
    if args.no_minify {
        config.minifier.enabled = false;
    }
}

fn print_summary(output: &BuildOutput, flashed: bool) {
    println!("Packed {} page(s):", output.entries.len());
    for entry in &output.entries {
        println!("  {:<32} offset {:>8}  length {:>6}", entry.name, entry.offset, entry.length);
    }
    println!(
        "  {} ({} bytes)",
        output.table.path.display(),
        output.table.bytes.len()
    );
    println!(
        "  {} ({} bytes)",
        output.content.path.display(),
        output.content.bytes.len()
    );
    if let Some(note) = flash_note(flashed) {
        println!("{}", note);
    }
}

fn flash_note(flashed: bool) -> Option<&'static str> {
    (!flashed).then_some("Flashing disabled; the images were not written to the device.")
}
