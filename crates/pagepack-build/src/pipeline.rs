//! The build state machine
//!
//! `Init -> Enumerated -> Packed -> Encoded -> Written -> Done`
//!
//! Each call to [`Pipeline::step`] performs one transition. An error moves
//! the pipeline to `Failed` and is returned together with the stage it
//! failed from. Nothing is retried; a failed build is re-run from scratch.

use crate::asset::{enumerate_assets, Asset};
use crate::config::BuildConfig;
use crate::manifest::BuildManifest;
use crate::output::{artifact_paths, write_images, PartitionImage};
use crate::packer::{pack_assets, PackedContent};
use crate::tools::Toolset;
use crate::writer::write_partitions;
use pagepack_core::{BuildError, PackError, Stage};
use pagepack_table::{encode_table, PageEntry};
use std::path::PathBuf;

/// Encoded payloads that have not been written anywhere yet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedImages {
    pub table: Vec<u8>,
    pub content: Vec<u8>,
    pub entries: Vec<PageEntry>,
}

/// What a finished build produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildOutput {
    pub table: PartitionImage,
    pub content: PartitionImage,
    pub entries: Vec<PageEntry>,
    pub manifest_path: Option<PathBuf>,
}

#[derive(Debug)]
pub enum BuildState {
    Init,
    Enumerated(Vec<Asset>),
    Packed(PackedContent),
    Encoded(EncodedImages),
    Written(BuildOutput),
    Done(BuildOutput),
    Failed { stage: Stage, cause: String },
}

impl BuildState {
    /// The stage this state corresponds to, or `None` once failed
    pub fn stage(&self) -> Option<Stage> {
        match self {
            BuildState::Init => Some(Stage::Init),
            BuildState::Enumerated(_) => Some(Stage::Enumerated),
            BuildState::Packed(_) => Some(Stage::Packed),
            BuildState::Encoded(_) => Some(Stage::Encoded),
            BuildState::Written(_) => Some(Stage::Written),
            BuildState::Done(_) => Some(Stage::Done),
            BuildState::Failed { .. } => None,
        }
    }
}

pub struct Pipeline {
    config: BuildConfig,
    tools: Toolset,
    state: BuildState,
}

impl Pipeline {
    pub fn new(config: BuildConfig, tools: Toolset) -> Self {
        Self {
            config,
            tools,
            state: BuildState::Init,
        }
    }

    pub fn state(&self) -> &BuildState {
        &self.state
    }

    pub fn config(&self) -> &BuildConfig {
        &self.config
    }

    /// Perform the next transition and return the stage reached
    pub fn step(&mut self) -> Result<Stage, BuildError> {
        let from = match &self.state {
            BuildState::Failed { stage, cause } => {
                return Err(BuildError::new(*stage, PackError::Aborted(cause.clone())));
            }
            BuildState::Done(_) => return Ok(Stage::Done),
            state => state.stage().unwrap_or(Stage::Init),
        };

        let state = std::mem::replace(&mut self.state, BuildState::Init);
        match self.advance(state) {
            Ok(next) => {
                self.state = next;
                let reached = self.state.stage().unwrap_or(Stage::Done);
                log::info!("Build stage: {}", reached);
                Ok(reached)
            }
            Err(cause) => {
                self.state = BuildState::Failed {
                    stage: from,
                    cause: cause.to_string(),
                };
                Err(BuildError::new(from, cause))
            }
        }
    }

    /// Step until done
    pub fn run(mut self) -> Result<BuildOutput, BuildError> {
        while self.step()? != Stage::Done {}
        match self.state {
            BuildState::Done(output) => Ok(output),
            other => Err(BuildError::new(
                other.stage().unwrap_or(Stage::Init),
                PackError::Aborted("build stopped before completion".to_string()),
            )),
        }
    }

    fn advance(&self, state: BuildState) -> Result<BuildState, PackError> {
        match state {
            BuildState::Init => {
                log::info!("Preparing partition table with {}", self.tools.partition_tool.name());
                self.tools.partition_tool.prepare()?;

                let assets = enumerate_assets(
                    &self.config.source_dir,
                    &self.config.extension,
                    &artifact_paths(&self.config.output_dir),
                )?;
                Ok(BuildState::Enumerated(assets))
            }
            BuildState::Enumerated(assets) => {
                log::info!("Packing {} assets with {}", assets.len(), self.tools.transformer.name());
                let packed = pack_assets(&assets, self.tools.transformer.as_ref())?;
                Ok(BuildState::Packed(packed))
            }
            BuildState::Packed(packed) => {
                if packed.entries.is_empty() {
                    log::warn!("Page table is empty");
                }
                let table = encode_table(&packed.entries, &self.config.limits)?;
                Ok(BuildState::Encoded(EncodedImages {
                    table,
                    content: packed.content,
                    entries: packed.entries,
                }))
            }
            BuildState::Encoded(encoded) => {
                let (table, content) =
                    write_images(&self.config.output_dir, encoded.table, encoded.content)?;
                write_partitions(&[&table, &content], self.tools.flasher.as_ref())?;
                Ok(BuildState::Written(BuildOutput {
                    table,
                    content,
                    entries: encoded.entries,
                    manifest_path: None,
                }))
            }
            BuildState::Written(mut output) => {
                let manifest =
                    BuildManifest::describe(&output.table.bytes, &output.content.bytes, &output.entries);
                output.manifest_path = Some(manifest.save(&self.config.output_dir)?);
                log::info!(
                    "Packed {} pages: {} table bytes, {} content bytes",
                    output.entries.len(),
                    output.table.bytes.len(),
                    output.content.bytes.len()
                );
                Ok(BuildState::Done(output))
            }
            BuildState::Done(output) => Ok(BuildState::Done(output)),
            BuildState::Failed { cause, .. } => Err(PackError::Aborted(cause)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::{CONTENT_FILE, MANIFEST_FILE, TABLE_FILE};
    use crate::tools::mock::{MockPartitionTool, MockTransformer, RecordingFlasher};
    use pagepack_table::PageTable;
    use std::fs;
    use std::path::Path;

    struct Fixture {
        root: PathBuf,
        config: BuildConfig,
    }

    impl Fixture {
        fn new(pages: &[(&str, &str)]) -> Self {
            let root = std::env::temp_dir().join(format!("pagepack_pipeline_{}", uuid::Uuid::new_v4()));
            let source = root.join("page_content");
            fs::create_dir_all(&source).unwrap();
            for (file_name, bytes) in pages {
                fs::write(source.join(file_name), bytes).unwrap();
            }

            let config = BuildConfig {
                source_dir: source,
                output_dir: root.join("build"),
                ..BuildConfig::default()
            };
            Self { root, config }
        }

        fn output(&self, name: &str) -> PathBuf {
            self.config.output_dir.join(name)
        }
    }

    impl Drop for Fixture {
        fn drop(&mut self) {
            fs::remove_dir_all(&self.root).ok();
        }
    }

    fn tools(transformer: MockTransformer, flasher: &RecordingFlasher) -> Toolset {
        Toolset {
            partition_tool: Box::new(MockPartitionTool::new()),
            transformer: Box::new(transformer),
            flasher: Box::new(flasher.clone()),
        }
    }

    fn failed_stage(pipeline: &Pipeline) -> Option<Stage> {
        match pipeline.state() {
            BuildState::Failed { stage, .. } => Some(*stage),
            _ => None,
        }
    }

    #[test]
    fn test_single_page_build() {
        let fixture = Fixture::new(&[("a.html", "<p>hi</p>")]);
        let flasher = RecordingFlasher::new();

        let output = Pipeline::new(fixture.config.clone(), tools(MockTransformer::new(), &flasher))
            .run()
            .unwrap();

        assert_eq!(output.entries, vec![PageEntry::new("a", 0, 9)]);
        assert_eq!(output.content.bytes, b"<p>hi</p>");

        let table = PageTable::decode(&fs::read(fixture.output(TABLE_FILE)).unwrap()).unwrap();
        assert_eq!(table.entries(), output.entries.as_slice());
        assert_eq!(fs::read(fixture.output(CONTENT_FILE)).unwrap(), b"<p>hi</p>");

        let writes = flasher.writes();
        assert_eq!(writes.len(), 2);
        assert_eq!(writes[0], ("page_table".to_string(), output.table.bytes.clone()));
        assert_eq!(writes[1], ("page_content".to_string(), output.content.bytes.clone()));

        let manifest = BuildManifest::load(&fixture.output(MANIFEST_FILE)).unwrap();
        assert!(manifest.matches(&output.table.bytes, &output.content.bytes));
    }

    #[test]
    fn test_two_pages_minified() {
        let fixture = Fixture::new(&[("b.html", "<i> x </i>"), ("a.html", "<b> hello </b>")]);
        let transformer = MockTransformer::new()
            .with_output("a", b"<b>hi")
            .with_output("b", b"<i>");
        let flasher = RecordingFlasher::new();

        let output = Pipeline::new(fixture.config.clone(), tools(transformer, &flasher))
            .run()
            .unwrap();

        assert_eq!(
            output.entries,
            vec![PageEntry::new("a", 0, 5), PageEntry::new("b", 5, 3)]
        );
        assert_eq!(output.content.bytes.len(), 8);

        let table = PageTable::decode(&output.table.bytes).unwrap();
        assert_eq!(table.header().entry_count, 2);
        assert!(table.verify_against(output.content.bytes.len() as u64).is_ok());
        assert_eq!(table.page(&output.content.bytes, "b"), Some(&b"<i>"[..]));
    }

    #[test]
    fn test_empty_source_dir() {
        let fixture = Fixture::new(&[]);
        let flasher = RecordingFlasher::new();

        let output = Pipeline::new(fixture.config.clone(), tools(MockTransformer::new(), &flasher))
            .run()
            .unwrap();

        assert!(output.entries.is_empty());
        assert!(output.content.bytes.is_empty());
        assert_eq!(output.table.bytes, vec![0, 0, 0, 0, 0, 0, 0, 0, b'\n']);
    }

    #[test]
    fn test_rebuild_is_byte_identical() {
        let fixture = Fixture::new(&[
            ("form_template.html", "<form>%s</form>"),
            ("netlist_item.html", "<tr><td>%s</td></tr>"),
            ("loading.html", "<p>...</p>"),
        ]);
        let flasher = RecordingFlasher::new();

        let first = Pipeline::new(fixture.config.clone(), tools(MockTransformer::new(), &flasher))
            .run()
            .unwrap();
        let manifest_first = fs::read(fixture.output(MANIFEST_FILE)).unwrap();
        let second = Pipeline::new(fixture.config.clone(), tools(MockTransformer::new(), &flasher))
            .run()
            .unwrap();
        let manifest_second = fs::read(fixture.output(MANIFEST_FILE)).unwrap();

        assert_eq!(first.table.bytes, second.table.bytes);
        assert_eq!(first.content.bytes, second.content.bytes);
        assert_eq!(manifest_first, manifest_second);
    }

    #[test]
    fn test_invalid_name_fails_before_any_write() {
        let fixture = Fixture::new(&[("my page.html", "<p>")]);
        let flasher = RecordingFlasher::new();
        let mut pipeline =
            Pipeline::new(fixture.config.clone(), tools(MockTransformer::new(), &flasher));

        assert_eq!(pipeline.step().unwrap(), Stage::Enumerated);
        assert_eq!(pipeline.step().unwrap(), Stage::Packed);
        let err = pipeline.step().unwrap_err();

        assert_eq!(err.stage, Stage::Packed);
        assert!(matches!(err.cause, PackError::InvalidName { ref name, .. } if name == "my page"));
        assert_eq!(failed_stage(&pipeline), Some(Stage::Packed));
        assert!(!fixture.config.output_dir.exists());
        assert!(flasher.writes().is_empty());
    }

    #[test]
    fn test_transform_failure_reports_asset() {
        let fixture = Fixture::new(&[("a.html", "<p>"), ("b.html", "<p>")]);
        let flasher = RecordingFlasher::new();
        let err = Pipeline::new(
            fixture.config.clone(),
            tools(MockTransformer::new().failing("b"), &flasher),
        )
        .run()
        .unwrap_err();

        assert_eq!(err.stage, Stage::Enumerated);
        assert!(matches!(err.cause, PackError::TransformFailed { ref asset, .. } if asset == "b"));
        assert!(!fixture.config.output_dir.exists());
    }

    #[test]
    fn test_missing_source_dir() {
        let fixture = Fixture::new(&[]);
        let mut config = fixture.config.clone();
        config.source_dir = fixture.root.join("nope");
        let flasher = RecordingFlasher::new();

        let err = Pipeline::new(config, tools(MockTransformer::new(), &flasher))
            .run()
            .unwrap_err();
        assert_eq!(err.stage, Stage::Init);
        assert!(matches!(err.cause, PackError::NotFound(_)));
    }

    #[test]
    fn test_partition_tool_runs_first() {
        let fixture = Fixture::new(&[("a.html", "<p>")]);
        let partition_tool = MockPartitionTool::failing();
        let flasher = RecordingFlasher::new();
        let toolset = Toolset {
            partition_tool: Box::new(partition_tool.clone()),
            transformer: Box::new(MockTransformer::new()),
            flasher: Box::new(flasher.clone()),
        };

        let err = Pipeline::new(fixture.config.clone(), toolset).run().unwrap_err();
        assert_eq!(partition_tool.calls(), 1);
        assert_eq!(err.stage, Stage::Init);
        assert!(matches!(err.cause, PackError::PartitionTableFailed(_)));
    }

    #[test]
    fn test_flash_failure_keeps_complete_images_without_manifest() {
        let fixture = Fixture::new(&[("a.html", "<p>hi</p>")]);
        let flasher = RecordingFlasher::new().failing_on("page_content");

        let err = Pipeline::new(fixture.config.clone(), tools(MockTransformer::new(), &flasher))
            .run()
            .unwrap_err();

        assert_eq!(err.stage, Stage::Encoded);
        assert!(matches!(err.cause, PackError::WriteFailed { ref partition, .. } if partition == "page_content"));
        assert_eq!(flasher.writes().len(), 1);
        assert!(!fixture.output(MANIFEST_FILE).exists());
        assert_eq!(fs::read(fixture.output(CONTENT_FILE)).unwrap(), b"<p>hi</p>");
    }

    #[test]
    fn test_failed_pipeline_stays_failed() {
        let fixture = Fixture::new(&[]);
        let mut config = fixture.config.clone();
        config.source_dir = fixture.root.join("nope");
        let flasher = RecordingFlasher::new();
        let mut pipeline = Pipeline::new(config, tools(MockTransformer::new(), &flasher));

        assert!(pipeline.step().is_err());
        let err = pipeline.step().unwrap_err();
        assert_eq!(err.stage, Stage::Init);
        assert!(matches!(err.cause, PackError::Aborted(_)));
    }

    #[test]
    fn test_output_inside_source_is_skipped() {
        let fixture = Fixture::new(&[("a.part", "<p>")]);
        let mut config = fixture.config.clone();
        config.extension = ".part".to_string();
        config.output_dir = config.source_dir.clone();
        let flasher = RecordingFlasher::new();

        let first = Pipeline::new(config.clone(), tools(MockTransformer::new(), &flasher))
            .run()
            .unwrap();
        let second = Pipeline::new(config, tools(MockTransformer::new(), &flasher))
            .run()
            .unwrap();
        assert_eq!(first.entries, vec![PageEntry::new("a", 0, 3)]);
        assert_eq!(first.entries, second.entries);
        assert_eq!(first.content.bytes, second.content.bytes);
        assert!(Path::new(&second.table.path).exists());
    }
}
