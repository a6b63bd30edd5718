//! Mock collaborators for testing
//!
//! These never spawn a process. `MockTransformer` returns canned bytes per
//! asset name and `RecordingFlasher` keeps every image it is handed.

use super::{Flasher, PartitionTool, Transformer};
use crate::asset::Asset;
use crate::output::PartitionImage;
use pagepack_core::{PackError, Result};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Returns configured bytes per asset, or the file's raw bytes otherwise
#[derive(Debug, Default, Clone)]
pub struct MockTransformer {
    outputs: HashMap<String, Vec<u8>>,
    failing: HashSet<String>,
}

impl MockTransformer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return `bytes` for the asset called `name`
    pub fn with_output(mut self, name: &str, bytes: &[u8]) -> Self {
        self.outputs.insert(name.to_string(), bytes.to_vec());
        self
    }

    /// Fail when asked to transform the asset called `name`
    pub fn failing(mut self, name: &str) -> Self {
        self.failing.insert(name.to_string());
        self
    }
}

impl Transformer for MockTransformer {
    fn name(&self) -> &str {
        "mock"
    }

    fn transform(&self, asset: &Asset) -> Result<Vec<u8>> {
        if self.failing.contains(&asset.name) {
            return Err(PackError::TransformFailed {
                asset: asset.name.clone(),
                reason: "mock failure".to_string(),
            });
        }
        match self.outputs.get(&asset.name) {
            Some(bytes) => Ok(bytes.clone()),
            None => Ok(std::fs::read(&asset.path)?),
        }
    }
}

/// Records `(partition, bytes)` for every write. Clones share the record.
#[derive(Debug, Default, Clone)]
pub struct RecordingFlasher {
    writes: Arc<Mutex<Vec<(String, Vec<u8>)>>>,
    fail_on: Option<String>,
}

impl RecordingFlasher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail when asked to write the partition called `partition`
    pub fn failing_on(mut self, partition: &str) -> Self {
        self.fail_on = Some(partition.to_string());
        self
    }

    /// Everything written so far, in order
    pub fn writes(&self) -> Vec<(String, Vec<u8>)> {
        self.writes.lock().map(|w| w.clone()).unwrap_or_default()
    }
}

impl Flasher for RecordingFlasher {
    fn name(&self) -> &str {
        "recording"
    }

    fn write_partition(&self, image: &PartitionImage) -> Result<()> {
        if self.fail_on.as_deref() == Some(image.partition.as_str()) {
            return Err(PackError::WriteFailed {
                partition: image.partition.clone(),
                reason: "mock device not found".to_string(),
            });
        }
        if let Ok(mut writes) = self.writes.lock() {
            writes.push((image.partition.clone(), image.bytes.clone()));
        }
        Ok(())
    }
}

/// Counts `prepare` calls and optionally fails them. Clones share the count.
#[derive(Debug, Default, Clone)]
pub struct MockPartitionTool {
    calls: Arc<AtomicUsize>,
    fail: bool,
}

impl MockPartitionTool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            calls: Arc::default(),
            fail: true,
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl PartitionTool for MockPartitionTool {
    fn name(&self) -> &str {
        "mock"
    }

    fn prepare(&self) -> Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(PackError::PartitionTableFailed("mock failure".to_string()));
        }
        Ok(())
    }
}
