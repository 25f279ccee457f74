//! Unordered collection of remote dataset versions of one report.

use std::collections::BTreeMap;

use tse_model::{DatasetVersion, SenderId};

use crate::error::{ImportError, Result};

/// Versions of a single report as listed by the remote service.
///
/// The service lists versions in no particular order; merge order is
/// defined only by the ordinal in the sender id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DatasetVersionSet {
    versions: Vec<DatasetVersion>,
}

impl DatasetVersionSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, version: DatasetVersion) {
        self.versions.push(version);
    }

    pub fn len(&self) -> usize {
        self.versions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.versions.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &DatasetVersion> {
        self.versions.iter()
    }

    /// Versions ascending by ordinal.
    ///
    /// Fails on any malformed sender id, on two versions with the same
    /// ordinal and on versions of different report codes.
    pub fn sorted_by_version(&self) -> Result<Vec<DatasetVersion>> {
        let mut by_ordinal: BTreeMap<u32, &DatasetVersion> = BTreeMap::new();
        let mut report_code: Option<String> = None;

        for version in &self.versions {
            let sender = parse_sender(version)?;

            match &report_code {
                None => report_code = Some(sender.report_code().to_string()),
                Some(expected) if expected != sender.report_code() => {
                    return Err(ImportError::MixedReports {
                        expected: expected.clone(),
                        sender_id: version.sender_id.clone(),
                    });
                }
                Some(_) => {}
            }

            if let Some(first) = by_ordinal.insert(sender.ordinal(), version) {
                return Err(ImportError::DuplicateOrdinal {
                    ordinal: sender.ordinal(),
                    first: first.sender_id.clone(),
                    second: version.sender_id.clone(),
                });
            }
        }

        Ok(by_ordinal.into_values().cloned().collect())
    }

    /// Report code shared by every version, `None` for an empty set.
    pub fn report_code(&self) -> Result<Option<String>> {
        Ok(self
            .sorted_by_version()?
            .first()
            .map(parse_sender)
            .transpose()?
            .map(|sender| sender.report_code().to_string()))
    }

    /// Version with the highest ordinal.
    pub fn latest(&self) -> Result<Option<DatasetVersion>> {
        Ok(self.sorted_by_version()?.pop())
    }
}

fn parse_sender(version: &DatasetVersion) -> Result<SenderId> {
    version
        .parsed_sender_id()
        .map_err(|source| ImportError::MalformedSenderId {
            sender_id: version.sender_id.clone(),
            source,
        })
}

impl From<Vec<DatasetVersion>> for DatasetVersionSet {
    fn from(versions: Vec<DatasetVersion>) -> Self {
        Self { versions }
    }
}

impl FromIterator<DatasetVersion> for DatasetVersionSet {
    fn from_iter<I: IntoIterator<Item = DatasetVersion>>(iter: I) -> Self {
        Self {
            versions: iter.into_iter().collect(),
        }
    }
}
