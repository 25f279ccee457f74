//! Where dataset payloads come from.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tse_model::TransportError;

/// Download of dataset payloads by remote dataset id.
///
/// Every remote transport implements this; the importer needs nothing else
/// from it.
pub trait PayloadSource {
    fn fetch_dataset_payload(&self, dataset_id: &str) -> Result<String, TransportError>;
}

impl<T: PayloadSource + ?Sized> PayloadSource for &T {
    fn fetch_dataset_payload(&self, dataset_id: &str) -> Result<String, TransportError> {
        (**self).fetch_dataset_payload(dataset_id)
    }
}

impl<T: PayloadSource + ?Sized> PayloadSource for Arc<T> {
    fn fetch_dataset_payload(&self, dataset_id: &str) -> Result<String, TransportError> {
        (**self).fetch_dataset_payload(dataset_id)
    }
}

/// Payloads exported to a directory as `<dataset_id>.xml`.
///
/// Used to import reports saved from the collection service without a
/// connection.
#[derive(Debug, Clone)]
pub struct DirectoryPayloadSource {
    dir: PathBuf,
}

impl DirectoryPayloadSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, dataset_id: &str) -> PathBuf {
        self.dir.join(format!("{dataset_id}.xml"))
    }
}

impl PayloadSource for DirectoryPayloadSource {
    fn fetch_dataset_payload(&self, dataset_id: &str) -> Result<String, TransportError> {
        let path = self.path_for(dataset_id);
        tracing::debug!(path = %path.display(), "reading dataset payload");
        Ok(fs::read_to_string(path)?)
    }
}

/// Payloads held in memory, keyed by dataset id.
#[derive(Debug, Clone, Default)]
pub struct MemoryPayloadSource {
    payloads: HashMap<String, String>,
}

impl MemoryPayloadSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_payload(mut self, dataset_id: impl Into<String>, xml: impl Into<String>) -> Self {
        self.payloads.insert(dataset_id.into(), xml.into());
        self
    }
}

impl PayloadSource for MemoryPayloadSource {
    fn fetch_dataset_payload(&self, dataset_id: &str) -> Result<String, TransportError> {
        self.payloads
            .get(dataset_id)
            .cloned()
            .ok_or_else(|| TransportError::Other(format!("unknown dataset {dataset_id}")))
    }
}
