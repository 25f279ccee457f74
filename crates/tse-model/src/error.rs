use thiserror::Error;

use crate::schema::SchemaId;

/// Errors raised while interpreting model values.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ModelError {
    /// Sender id has no `.` separated version suffix.
    #[error("sender id '{0}' has no version suffix")]
    MissingVersionSuffix(String),

    /// Version suffix is not a number.
    #[error("sender id '{sender_id}' has a non-numeric version suffix '{suffix}'")]
    InvalidVersionSuffix { sender_id: String, suffix: String },

    /// Report code part of the sender id is empty or malformed.
    #[error("sender id '{0}' has no report code")]
    InvalidReportCode(String),

    /// Status label not known to the remote service vocabulary.
    #[error("unknown dataset status '{0}'")]
    UnknownStatus(String),

    /// Operation needs a row that was already stored.
    #[error("{schema} row has not been stored yet")]
    UnsavedRow { schema: SchemaId },

    /// Row was passed where a different schema was expected.
    #[error("expected a {expected} row, got {found}")]
    SchemaMismatch { expected: SchemaId, found: SchemaId },

    /// Stored version ordinal is not a number.
    #[error("invalid version ordinal '{0}'")]
    InvalidVersion(String),
}

pub type Result<T> = std::result::Result<T, ModelError>;
