//! Application-level error types.

use std::path::PathBuf;

use thiserror::Error;
use tse_import::ImportError;
use tse_model::{ModelError, RowId, TransportError};
use tse_store::StoreError;
use tse_validate::ValidateError;

/// Settings file errors.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SettingsError {
    #[error("no configuration directory on this platform")]
    NoConfigDir,

    #[error("failed to access settings at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid settings file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("failed to serialize settings: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("unknown log level '{0}'")]
    InvalidLogLevel(String),
}

impl SettingsError {
    /// Get a user-friendly message for this error.
    pub fn user_message(&self) -> String {
        match self {
            Self::NoConfigDir | Self::Io { .. } | Self::Serialize(_) => {
                "The settings could not be saved or loaded.".to_string()
            }
            Self::Parse { path, .. } => {
                format!("The settings file {} is not valid.", path.display())
            }
            Self::InvalidLogLevel(level) => format!("'{level}' is not a log level."),
        }
    }

    /// Get a suggestion for how to resolve this error.
    pub fn suggestion(&self) -> Option<&'static str> {
        match self {
            Self::Parse { .. } => Some("Fix or delete the settings file to restore defaults."),
            Self::InvalidLogLevel(_) => Some("Use one of error, warn, info, debug or trace."),
            Self::Io { .. } => Some("Check that the configuration folder is writable."),
            Self::NoConfigDir | Self::Serialize(_) => None,
        }
    }
}

/// Errors of the background report services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AppError {
    #[error("report {0} does not exist")]
    ReportNotFound(RowId),

    #[error("report {0} is being changed by another operation")]
    ReportBusy(String),

    #[error("report {0} cannot be edited in its current status")]
    NotEditable(String),

    #[error("workspace store is unavailable after a failed operation")]
    WorkspacePoisoned,

    #[error("background task failed: {0}")]
    TaskFailed(String),

    #[error(transparent)]
    Import(#[from] ImportError),

    #[error(transparent)]
    Validate(#[from] ValidateError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Model(#[from] ModelError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Settings(#[from] SettingsError),
}

impl AppError {
    /// Get a user-friendly message for this error.
    pub fn user_message(&self) -> String {
        match self {
            Self::ReportNotFound(_) => "The report no longer exists.".to_string(),
            Self::ReportBusy(code) => {
                format!("Report {code} is busy. Wait for the running operation to finish.")
            }
            Self::NotEditable(sender_id) => format!(
                "Report {sender_id} can no longer be edited. Amend it to create a new version."
            ),
            Self::WorkspacePoisoned | Self::TaskFailed(_) => {
                "An internal error occurred. Restart the application.".to_string()
            }
            Self::Import(err) => err.user_message(),
            Self::Store(err) => err.user_message(),
            Self::Settings(err) => err.user_message(),
            Self::Transport(err) if err.is_retryable() => {
                "The collection service could not be reached. Check your connection.".to_string()
            }
            Self::Validate(_) | Self::Model(_) | Self::Transport(_) => self.to_string(),
        }
    }

    /// Whether trying again later may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::ReportBusy(_) => true,
            Self::Import(err) => err.is_retryable(),
            Self::Transport(err) => err.is_retryable(),
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
