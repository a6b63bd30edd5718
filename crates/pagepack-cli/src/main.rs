//! pagepack CLI - pack web pages into flash partitions

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{build, inspect};

#[derive(Parser)]
#[command(name = "pagepack")]
#[command(about = "Pack HTML pages into page table and content partitions", long_about = None)]
#[command(version)]
struct Cli {
    /// Show debug output, including external command lines
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Pack the page directory and flash both partitions
    Build {
        /// Config file to use instead of ./pagepack.toml
        #[arg(long)]
        config: Option<String>,

        /// Directory containing the pages
        #[arg(long)]
        source: Option<String>,

        /// Directory receiving the partition images
        #[arg(long)]
        output: Option<String>,

        /// Serial port of the device
        #[arg(long)]
        port: Option<String>,

        /// ESP-IDF install root (overrides IDF_PATH)
        #[arg(long)]
        idf_path: Option<String>,

        /// Write the images but do not flash them
        #[arg(long)]
        no_flash: bool,

        /// Do not generate and flash the partition table first
        #[arg(long)]
        skip_partition_table: bool,

        /// Pack the page files as they are
        #[arg(long)]
        no_minify: bool,
    },

    /// Decode a page table image
    Inspect {
        /// Path to the page table image
        table: String,

        /// Path to the matching content image
        #[arg(long)]
        content: Option<String>,

        /// Write one page from the content image to stdout
        #[arg(long)]
        extract: Option<String>,

        /// Build manifest to check both images against
        #[arg(long)]
        manifest: Option<String>,

        /// Output format (text or json)
        #[arg(long, default_value = "text", value_parser = parse_format)]
        format: String,
    },
}

fn parse_format(s: &str) -> Result<String, String> {
    match s {
        "text" | "json" => Ok(s.to_string()),
        _ => Err(format!("unknown format '{}'; valid values: text, json", s)),
    }
}

fn init_logging(verbose: bool) {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if verbose {
        builder.filter_level(log::LevelFilter::Debug);
    }
    builder.init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Build {
            config,
            source,
            output,
            port,
            idf_path,
            no_flash,
            skip_partition_table,
            no_minify,
        } => build::run(build::BuildArgs {
            config,
            source,
            output,
            port,
            idf_path,
            no_flash,
            skip_partition_table,
            no_minify,
        }),
        Commands::Inspect {
            table,
            content,
            extract,
            manifest,
            format,
        } => inspect::run(inspect::InspectArgs {
            table,
            content,
            extract,
            manifest,
            format,
        }),
    }
}
