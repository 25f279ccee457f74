//! Store error types.
//!
//! Row operations fail with structured errors; snapshot file errors also
//! carry user-friendly messages and remediation hints.

use std::path::PathBuf;
use thiserror::Error;
use tse_model::{ModelError, RowId, SchemaId};

/// Row store or snapshot file error.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StoreError {
    /// No row with this id in the table.
    #[error("{schema} row {id} not found")]
    RowNotFound { schema: SchemaId, id: RowId },

    /// Insert called with a row that already has an id.
    #[error("{schema} row {id} is already stored")]
    AlreadyStored { schema: SchemaId, id: RowId },

    /// Parent reference missing or pointing nowhere.
    #[error("{schema} row has no valid parent (parent id: {parent:?})")]
    OrphanRow {
        schema: SchemaId,
        parent: Option<RowId>,
    },

    /// Delete would leave child rows without a parent.
    #[error("{schema} row {id} still has {children} child rows")]
    HasChildren {
        schema: SchemaId,
        id: RowId,
        children: usize,
    },

    /// A shared store was left unusable by a panic in another operation.
    #[error("row store is unavailable after a failed operation")]
    Unavailable,

    /// `begin` called inside an open transaction.
    #[error("a transaction is already open")]
    TransactionActive,

    /// `commit` or `rollback` called without an open transaction.
    #[error("no transaction is open")]
    NoTransaction,

    /// Row content could not be interpreted.
    #[error(transparent)]
    Model(#[from] ModelError),

    /// File I/O error.
    #[error("Failed to {operation} file: {path}")]
    Io {
        operation: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Not a snapshot file.
    #[error("Invalid snapshot file format")]
    InvalidFormat { path: PathBuf, reason: String },

    /// Snapshot written by a newer schema version.
    #[error("Snapshot version {found} is not supported (maximum: {max_supported})")]
    UnsupportedVersion {
        found: u32,
        max_supported: u32,
        path: PathBuf,
    },

    /// Snapshot content breaks the hierarchy invariants.
    #[error("Snapshot is corrupt: {reason}")]
    CorruptSnapshot { reason: String },

    /// Snapshot file changed on disk since it was last written by us.
    #[error("Snapshot file has been modified: {path}")]
    SnapshotChanged {
        path: PathBuf,
        expected_hash: String,
        actual_hash: String,
    },

    /// Serialization error.
    #[error("Failed to serialize store data")]
    Serialization {
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Deserialization error.
    #[error("Failed to deserialize store data")]
    Deserialization {
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Temp file could not be renamed over the target.
    #[error("Failed to complete save operation")]
    AtomicWriteFailed {
        temp_path: PathBuf,
        target_path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl StoreError {
    /// Get a user-friendly message for this error.
    pub fn user_message(&self) -> String {
        match self {
            Self::RowNotFound { schema, .. } => {
                format!("The {schema} record no longer exists.")
            }
            Self::AlreadyStored { .. }
            | Self::TransactionActive
            | Self::NoTransaction
            | Self::Unavailable => {
                "An internal storage error occurred.".to_string()
            }
            Self::OrphanRow { schema, .. } => {
                format!("The {schema} record is not attached to an existing parent record.")
            }
            Self::HasChildren { schema, children, .. } => {
                format!("The {schema} record cannot be removed while it has {children} child records.")
            }
            Self::Model(err) => format!("A stored record is invalid: {err}"),
            Self::Io {
                operation, path, ..
            } => {
                format!("Could not {} the file at {}", operation, path.display())
            }
            Self::InvalidFormat { path, reason } => {
                format!(
                    "The file at {} is not a valid report store: {}",
                    path.display(),
                    reason
                )
            }
            Self::UnsupportedVersion {
                found,
                max_supported,
                ..
            } => {
                format!(
                    "This report store was created with a newer version of the application \
                    (file version {}, your version supports up to {}). \
                    Please update the application.",
                    found, max_supported
                )
            }
            Self::CorruptSnapshot { reason } => {
                format!("The report store is damaged: {reason}")
            }
            Self::SnapshotChanged { path, .. } => {
                format!(
                    "The report store '{}' was modified by another program since it was last saved.",
                    path.display()
                )
            }
            Self::Serialization { .. } => {
                "An error occurred while saving the reports.".to_string()
            }
            Self::Deserialization { .. } => {
                "An error occurred while reading the reports. The file may be corrupted."
                    .to_string()
            }
            Self::AtomicWriteFailed { target_path, .. } => {
                format!(
                    "Could not save the file to {}. Please check disk space and permissions.",
                    target_path.display()
                )
            }
        }
    }

    /// Get a suggestion for how to resolve this error.
    pub fn suggestion(&self) -> Option<String> {
        match self {
            Self::Io { operation, .. } => {
                if *operation == "read" {
                    Some("Check that the file exists and you have permission to read it.".into())
                } else {
                    Some("Check that you have permission to write to this location.".into())
                }
            }
            Self::InvalidFormat { .. } => Some("Make sure you selected a .tse store file.".into()),
            Self::UnsupportedVersion { .. } => Some("Install the latest application version.".into()),
            Self::SnapshotChanged { .. } => {
                Some("Close other instances of the application and reopen the store.".into())
            }
            Self::CorruptSnapshot { .. } | Self::Deserialization { .. } => {
                Some("Try opening a backup if you have one.".into())
            }
            Self::AtomicWriteFailed { .. } => {
                Some("Free up disk space or try saving to a different location.".into())
            }
            _ => None,
        }
    }
}

/// Result type alias for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
