//! Error types for report actions.

use thiserror::Error;
use tse_model::{DatasetStatus, ModelError, ReportAction, TransportError};
use tse_store::StoreError;

use crate::status::StatusEvent;

/// A status change the report lifecycle does not allow.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum StatusError {
    #[error("cannot apply {event} to a report in status {from}")]
    InvalidTransition {
        from: DatasetStatus,
        event: StatusEvent,
    },
}

impl StatusError {
    /// Get a user-friendly message for this error.
    pub fn user_message(&self) -> String {
        match self {
            Self::InvalidTransition { from, event } => format!(
                "A report that is {} cannot be {}.",
                from.display_name().to_lowercase(),
                event.past_tense()
            ),
        }
    }

    /// Get a suggestion for how to resolve this error.
    pub fn suggestion(&self) -> Option<&'static str> {
        match self {
            Self::InvalidTransition { .. } => {
                Some("Refresh the report status and try again.")
            }
        }
    }
}

/// Anything that can fail while executing a report action.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ActionError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Status(#[from] StatusError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Model(#[from] ModelError),

    /// The remote service took the action but the report row was not
    /// updated, so the local status is behind.
    #[error("{action} of {sender_id} was not saved locally: {source}")]
    NotRecorded {
        action: ReportAction,
        sender_id: String,
        #[source]
        source: Box<ActionError>,
    },
}

impl ActionError {
    /// Whether running the action again later may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transport(err) if err.is_retryable())
    }
}

/// Result type for report actions.
pub type Result<T> = std::result::Result<T, ActionError>;
