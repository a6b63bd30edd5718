//! Page table inspection command

use anyhow::{anyhow, bail, Context, Result};
use pagepack_build::BuildManifest;
use pagepack_table::{PageEntry, PageTable, TableFormat};
use serde::Serialize;
use std::fmt::Write as _;
use std::io::Write;
use std::path::Path;

pub struct InspectArgs {
    pub table: String,
    pub content: Option<String>,
    pub extract: Option<String>,
    pub manifest: Option<String>,
    pub format: String,
}

#[derive(Debug, Serialize)]
struct InspectReport<'a> {
    format_version: u32,
    table_byte_length: u32,
    entry_count: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    content_length: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    manifest_digests: Option<(String, String)>,
    duplicates: Vec<&'a str>,
    entries: &'a [PageEntry],
}

pub fn run(args: InspectArgs) -> Result<()> {
    let bytes = std::fs::read(&args.table)
        .with_context(|| format!("Failed to read page table {}", args.table))?;
    let table = PageTable::decode(&bytes)?;

    let content = match &args.content {
        Some(path) => Some(
            std::fs::read(path).with_context(|| format!("Failed to read content image {}", path))?,
        ),
        None => None,
    };
    if let Some(content) = &content {
        table.verify_against(content.len() as u64)?;
    }

    let manifest_digests = match &args.manifest {
        Some(path) => {
            let content = content
                .as_deref()
                .ok_or_else(|| anyhow!("--manifest needs the content image (--content)"))?;
            Some(check_manifest(path, &bytes, content)?)
        }
        None => None,
    };

    if let Some(name) = &args.extract {
        let content = content
            .as_deref()
            .ok_or_else(|| anyhow!("--extract needs the content image (--content)"))?;
        let page = table
            .page(content, name)
            .ok_or_else(|| anyhow!("No page named '{}' in {}", name, args.table))?;
        std::io::stdout().write_all(page)?;
        return Ok(());
    }

    let report = InspectReport {
        format_version: TableFormat::CURRENT.version(),
        table_byte_length: table.header().table_byte_length,
        entry_count: table.header().entry_count,
        content_length: content.as_ref().map(|c| c.len() as u64),
        manifest_digests,
        duplicates: table.duplicates(),
        entries: table.entries(),
    };
    for name in &report.duplicates {
        log::warn!("Page name '{}' appears more than once; the device uses the first", name);
    }

    match args.format.as_str() {
        "json" => println!("{}", serde_json::to_string_pretty(&report)?),
        _ => print!("{}", render_text(&report)),
    }
    Ok(())
}

/// Check the images against a build manifest, returning the short digests
fn check_manifest(path: &str, table: &[u8], content: &[u8]) -> Result<(String, String)> {
    let manifest = BuildManifest::load(Path::new(path))
        .with_context(|| format!("Failed to load build manifest {}", path))?;
    let Some((table_hash, content_hash)) = manifest.digests() else {
        bail!("Build manifest {} has no valid sha256 digests", path);
    };
    if !manifest.matches(table, content) {
        bail!("Images do not match build manifest {}", path);
    }
    Ok((table_hash.to_string(), content_hash.to_string()))
}

fn render_text(report: &InspectReport) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "Page table v{}: {} entries, {} bytes of records",
        report.format_version, report.entry_count, report.table_byte_length
    );
    if let Some(len) = report.content_length {
        let _ = writeln!(out, "Content image: {} bytes, all entries in bounds", len);
    }
    if let Some((table, content)) = &report.manifest_digests {
        let _ = writeln!(out, "Manifest matches: table {}, content {}", table, content);
    }
    for entry in report.entries {
        let _ = writeln!(
            out,
            "  {:<32} offset {:>8}  length {:>6}",
            entry.name, entry.offset, entry.length
        );
    }
    out
}
