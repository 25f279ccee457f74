//! Interface to the remote collection service.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tse_import::PayloadSource;
use tse_model::{DatasetStatus, DatasetVersion, OperationType, Report, TransportError};

/// Acknowledgement of a message sent to the remote service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendOutcome {
    /// Id the service assigned to the message.
    pub message_id: String,
    /// Remote dataset id, when the service already knows it.
    pub dataset_id: Option<String>,
    /// Status declared by the service, when it answered with one.
    pub status: Option<DatasetStatus>,
}

impl SendOutcome {
    pub fn new(message_id: impl Into<String>) -> Self {
        Self {
            message_id: message_id.into(),
            dataset_id: None,
            status: None,
        }
    }
}

/// Remote dataset operations.
///
/// Implementations tag every failure with a [`TransportError`] kind. Payload
/// download comes from [`PayloadSource`] so any transport can feed the
/// importer directly.
pub trait RemoteDatasetTransport: PayloadSource + Send + Sync {
    /// Upload a report with the given operation.
    fn send_report(
        &self,
        report: &Report,
        operation: OperationType,
    ) -> Result<SendOutcome, TransportError>;

    /// Every remote version of a report.
    fn dataset_versions(&self, report_code: &str) -> Result<Vec<DatasetVersion>, TransportError>;

    /// Latest remote version of a report, by sender id ordinal.
    ///
    /// Versions with an unreadable sender id are ignored.
    fn latest_dataset(&self, report_code: &str) -> Result<Option<DatasetVersion>, TransportError> {
        let latest = self
            .dataset_versions(report_code)?
            .into_iter()
            .filter_map(|version| version.ordinal().ok().map(|ordinal| (ordinal, version)))
            .max_by_key(|(ordinal, _)| *ordinal)
            .map(|(_, version)| version);
        Ok(latest)
    }
}

impl<T: RemoteDatasetTransport + ?Sized> RemoteDatasetTransport for &T {
    fn send_report(
        &self,
        report: &Report,
        operation: OperationType,
    ) -> Result<SendOutcome, TransportError> {
        (**self).send_report(report, operation)
    }

    fn dataset_versions(&self, report_code: &str) -> Result<Vec<DatasetVersion>, TransportError> {
        (**self).dataset_versions(report_code)
    }

    fn latest_dataset(&self, report_code: &str) -> Result<Option<DatasetVersion>, TransportError> {
        (**self).latest_dataset(report_code)
    }
}

impl<T: RemoteDatasetTransport + ?Sized> RemoteDatasetTransport for Arc<T> {
    fn send_report(
        &self,
        report: &Report,
        operation: OperationType,
    ) -> Result<SendOutcome, TransportError> {
        (**self).send_report(report, operation)
    }

    fn dataset_versions(&self, report_code: &str) -> Result<Vec<DatasetVersion>, TransportError> {
        (**self).dataset_versions(report_code)
    }

    fn latest_dataset(&self, report_code: &str) -> Result<Option<DatasetVersion>, TransportError> {
        (**self).latest_dataset(report_code)
    }
}
