//! Collaborators backed by external processes

use super::{Flasher, PartitionTool, Transformer};
use crate::asset::Asset;
use crate::config::ToolConfig;
use crate::output::PartitionImage;
use pagepack_core::{PackError, Result};
use std::path::PathBuf;
use std::process::{Command, Output};

/// Run a command to completion, capturing its output.
///
/// A spawn failure or non-zero exit becomes an error message that includes
/// the tail of stderr.
fn run(command: &mut Command) -> std::result::Result<Output, String> {
    log::debug!("Running {:?}", command);

    let output = command
        .output()
        .map_err(|e| format!("failed to run {:?}: {}", command.get_program(), e))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        let stderr = stderr.trim();
        return Err(if stderr.is_empty() {
            format!("{:?} exited with {}", command.get_program(), output.status)
        } else {
            format!("{:?} exited with {}: {}", command.get_program(), output.status, stderr)
        });
    }

    Ok(output)
}

/// Minifies an asset with an external program that prints the result to stdout
#[derive(Debug, Clone)]
pub struct CommandMinifier {
    program: String,
    args: Vec<String>,
}

impl CommandMinifier {
    pub fn new(tool: &ToolConfig) -> Self {
        Self {
            program: tool.program.clone(),
            args: tool.args.clone(),
        }
    }
}

impl Transformer for CommandMinifier {
    fn name(&self) -> &str {
        &self.program
    }

    fn transform(&self, asset: &Asset) -> Result<Vec<u8>> {
        let output = run(Command::new(&self.program).args(&self.args).arg(&asset.path)).map_err(
            |reason| PackError::TransformFailed {
                asset: asset.name.clone(),
                reason,
            },
        )?;
        Ok(output.stdout)
    }
}

/// Generates and flashes the partition table with `idf.py`
#[derive(Debug, Clone)]
pub struct IdfPartitionTool {
    program: String,
    args: Vec<String>,
    toolchain_root: Option<PathBuf>,
    port: String,
}

impl IdfPartitionTool {
    pub fn new(tool: &ToolConfig, toolchain_root: Option<PathBuf>, port: &str) -> Self {
        Self {
            program: tool.program.clone(),
            args: tool.args.clone(),
            toolchain_root,
            port: port.to_string(),
        }
    }

    fn command(&self) -> Command {
        let mut command = Command::new(&self.program);
        command.arg("-p").arg(&self.port).args(&self.args);
        if let Some(root) = &self.toolchain_root {
            command.env("IDF_PATH", root);
        }
        command
    }
}

impl PartitionTool for IdfPartitionTool {
    fn name(&self) -> &str {
        &self.program
    }

    fn prepare(&self) -> Result<()> {
        let output = run(&mut self.command()).map_err(PackError::PartitionTableFailed)?;
        log::debug!("{}", String::from_utf8_lossy(&output.stdout).trim_end());
        Ok(())
    }
}

/// Writes partitions with the toolchain's `parttool.py`
#[derive(Debug, Clone)]
pub struct ParttoolFlasher {
    python: String,
    args: Vec<String>,
    parttool: PathBuf,
    port: String,
}

impl ParttoolFlasher {
    pub fn new(tool: &ToolConfig, parttool: PathBuf, port: &str) -> Self {
        Self {
            python: tool.program.clone(),
            args: tool.args.clone(),
            parttool,
            port: port.to_string(),
        }
    }

    fn command(&self, image: &PartitionImage) -> Command {
        let mut command = Command::new(&self.python);
        command
            .args(&self.args)
            .arg(&self.parttool)
            .arg("--port")
            .arg(&self.port)
            .arg("write_partition")
            .arg("--partition-name")
            .arg(&image.partition)
            .arg("--input")
            .arg(&image.path);
        command
    }
}

impl Flasher for ParttoolFlasher {
    fn name(&self) -> &str {
        "parttool"
    }

    fn write_partition(&self, image: &PartitionImage) -> Result<()> {
        run(&mut self.command(image)).map_err(|reason| PackError::WriteFailed {
            partition: image.partition.clone(),
            reason,
        })?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::OsStr;

    fn tool(program: &str, args: &[&str]) -> ToolConfig {
        ToolConfig {
            program: program.to_string(),
            args: args.iter().map(|a| a.to_string()).collect(),
            enabled: true,
        }
    }

    #[test]
    fn test_parttool_command_line() {
        let flasher = ParttoolFlasher::new(
            &tool("python3", &[]),
            PathBuf::from("/idf/components/partition_table/parttool.py"),
            "/dev/ttyUSB0",
        );
        let image = PartitionImage {
            partition: "page_table".to_string(),
            path: PathBuf::from("out/page_table.part"),
            bytes: Vec::new(),
        };
        let command = flasher.command(&image);
        let args: Vec<&OsStr> = command.get_args().collect();

        assert_eq!(command.get_program(), "python3");
        assert_eq!(
            args,
            vec![
                "/idf/components/partition_table/parttool.py",
                "--port",
                "/dev/ttyUSB0",
                "write_partition",
                "--partition-name",
                "page_table",
                "--input",
                "out/page_table.part",
            ]
        );
    }

    #[test]
    fn test_idf_command_sets_env_on_child_only() {
        let partition_tool = IdfPartitionTool::new(
            &tool("idf.py", &["partition-table", "partition-table-flash"]),
            Some(PathBuf::from("/opt/esp-idf")),
            "/dev/ttyUSB1",
        );
        let command = partition_tool.command();
        let args: Vec<&OsStr> = command.get_args().collect();
        assert_eq!(
            args,
            vec!["-p", "/dev/ttyUSB1", "partition-table", "partition-table-flash"]
        );

        let envs: Vec<_> = command.get_envs().collect();
        assert_eq!(
            envs,
            vec![(OsStr::new("IDF_PATH"), Some(OsStr::new("/opt/esp-idf")))]
        );
    }

    #[test]
    fn test_missing_minifier_is_transform_failure() {
        let minifier = CommandMinifier::new(&tool("pagepack-no-such-minifier", &[]));
        let asset = Asset {
            name: "index".to_string(),
            path: PathBuf::from("index.html"),
        };
        let err = minifier.transform(&asset).unwrap_err();
        assert!(matches!(err, PackError::TransformFailed { asset, .. } if asset == "index"));
    }
}
