//! Error types for report import.

use thiserror::Error;
use tse_model::{ModelError, TransportError};
use tse_store::StoreError;

/// Errors that abort an import. None of them leave partial writes behind.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ImportError {
    // === Version Set Errors ===
    /// A sender id has no usable version suffix.
    #[error("malformed sender dataset id '{sender_id}': {source}")]
    MalformedSenderId {
        sender_id: String,
        #[source]
        source: ModelError,
    },

    /// Two versions share the same ordinal.
    #[error("versions '{first}' and '{second}' share ordinal {ordinal}")]
    DuplicateOrdinal {
        ordinal: u32,
        first: String,
        second: String,
    },

    /// The set mixes versions of different reports.
    #[error("version '{sender_id}' does not belong to report {expected}")]
    MixedReports { expected: String, sender_id: String },

    // === Payload Errors ===
    /// Downloading a payload failed.
    #[error("failed to download dataset {dataset_id}: {source}")]
    Transport {
        dataset_id: String,
        #[source]
        source: TransportError,
    },

    /// The payload is not a well-formed dataset message.
    #[error("invalid payload for dataset {dataset_id}: {reason}")]
    Payload { dataset_id: String, reason: String },

    /// A record lacks its business key.
    #[error("record in dataset {dataset_id} has no {column}")]
    MissingKey {
        dataset_id: String,
        column: &'static str,
    },

    // === Merge Errors ===
    /// A result points to a program that no version declares.
    #[error("result {res_id} references unknown program {prog_id}")]
    OrphanRecord { res_id: String, prog_id: String },

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Model(#[from] ModelError),
}

impl ImportError {
    /// Get a user-friendly message for this error.
    pub fn user_message(&self) -> String {
        match self {
            Self::MalformedSenderId { sender_id, .. } => {
                format!("The dataset '{sender_id}' has an invalid version number.")
            }
            Self::DuplicateOrdinal { first, second, .. } => {
                format!("The datasets '{first}' and '{second}' claim the same version.")
            }
            Self::MixedReports { expected, .. } => {
                format!("The downloaded datasets do not all belong to report {expected}.")
            }
            Self::Transport { source, .. } if source.is_retryable() => {
                "The report could not be downloaded. Check your connection.".to_string()
            }
            Self::Transport { dataset_id, .. } => {
                format!("The dataset {dataset_id} could not be downloaded.")
            }
            Self::Payload { dataset_id, .. } | Self::MissingKey { dataset_id, .. } => {
                format!("The content of dataset {dataset_id} could not be read.")
            }
            Self::OrphanRecord { res_id, .. } => {
                format!("The result {res_id} does not belong to any summarized information.")
            }
            Self::Store(err) => err.user_message(),
            Self::Model(err) => err.to_string(),
        }
    }

    /// Whether importing again later may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transport { source, .. } if source.is_retryable())
    }
}

/// Result type for import operations.
pub type Result<T> = std::result::Result<T, ImportError>;
