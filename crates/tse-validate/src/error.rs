//! Error types for validation.

use thiserror::Error;
use tse_model::{ModelError, RowId, SchemaId};
use tse_store::StoreError;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ValidateError {
    /// The row to validate is not in the store.
    #[error("{schema} row {id} not found")]
    RowNotFound { schema: SchemaId, id: RowId },

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Model(#[from] ModelError),
}

/// Result type for validation operations.
pub type Result<T> = std::result::Result<T, ValidateError>;
