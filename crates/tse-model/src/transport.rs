//! Error kinds produced by the remote transport layer.
//!
//! The transport tags every failure with one of these kinds so that callers
//! can branch on the variant instead of on the concrete failure source.

use thiserror::Error;

use crate::status::DatasetStatus;

/// Failure of a remote dataset operation.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum TransportError {
    /// Network or local I/O failure.
    #[error("I/O error: {0}")]
    Io(String),

    /// The service answered with a fault (bad credentials, unavailable, ...).
    #[error("service fault {code}: {message}")]
    Fault { code: u16, message: String },

    /// The response could not be parsed.
    #[error("malformed response: {0}")]
    MalformedResponse(String),

    /// The outgoing message could not be validated against its schema.
    #[error("message schema unavailable: {0}")]
    SchemaUnavailable(String),

    /// The service refused the message with a structured reason.
    #[error("rejected by remote service ({code}): {reason}")]
    Rejected { code: String, reason: String },

    /// The remote dataset is in a status that does not allow the operation.
    #[error("operation not allowed on dataset {dataset_id} in status {status}")]
    UnsupportedOperation {
        dataset_id: String,
        status: DatasetStatus,
    },

    /// The report has no sender dataset id.
    #[error("report has no sender dataset id")]
    MissingSenderId,

    /// Anything the transport could not classify.
    #[error("{0}")]
    Other(String),
}

impl TransportError {
    /// Whether retrying the same call may succeed.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Io(_) | Self::Fault { .. })
    }
}

impl From<std::io::Error> for TransportError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}
