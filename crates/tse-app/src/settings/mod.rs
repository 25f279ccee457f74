//! User settings of the reporting tool.
//!
//! Sections:
//! - Connection (user, organisation, support address, test report)
//! - Import merge policy
//! - Data collection code per reporting year
//! - Logging
//! - Workspace snapshot location

mod persistence;

pub use persistence::{
    load_settings, load_settings_from, save_settings, save_settings_to, settings_path,
};

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::Level;
use tse_import::MergePolicy;
use tse_model::Session;

use crate::error::SettingsError;
use crate::logging::{LogConfig, LogFormat};

// ============================================================================
// Main Settings Struct
// ============================================================================

/// Application settings (persisted to disk as TOML).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub connection: ConnectionSettings,
    pub import: MergePolicy,
    /// Data collection code per reporting year, e.g. `"2017" = "TSE.2017"`.
    pub data_collections: BTreeMap<String, String>,
    pub logging: LoggingSettings,
    pub workspace: WorkspaceSettings,
}

impl Settings {
    /// Session for the configured user.
    pub fn session(&self) -> Session {
        let connection = &self.connection;
        Session {
            username: connection.username.clone(),
            org_code: connection.org_code.clone(),
            support_email: connection.support_email.clone(),
            data_collections: self.data_collections.clone(),
            test_report_code: connection.test_report_code.clone(),
        }
    }

    pub fn merge_policy(&self) -> MergePolicy {
        self.import.clone()
    }

    /// Whether everything needed to reach the remote service is filled in.
    pub fn has_mandatory_fields(&self) -> bool {
        !self.connection.username.trim().is_empty() && !self.connection.org_code.trim().is_empty()
    }
}

// ============================================================================
// Connection Settings
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionSettings {
    pub username: String,
    /// Organisation code, prefix of every sender dataset id.
    pub org_code: String,
    /// Shown in fatal error notices.
    pub support_email: String,
    /// Report code used by the connection test.
    pub test_report_code: String,
}

// ============================================================================
// Logging Settings
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// One of error, warn, info, debug, trace.
    pub level: String,
    pub format: LogFormat,
    pub timestamps: bool,
    pub log_file: Option<PathBuf>,
    /// Log animal and national case ids in clear.
    pub log_data: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::default(),
            timestamps: true,
            log_file: None,
            log_data: false,
        }
    }
}

impl LoggingSettings {
    pub fn to_log_config(&self) -> Result<LogConfig, SettingsError> {
        let level = self
            .level
            .trim()
            .parse::<Level>()
            .map_err(|_| SettingsError::InvalidLogLevel(self.level.clone()))?;

        let mut config = LogConfig::default()
            .with_level(level)
            .with_format(self.format)
            .with_log_file(self.log_file.clone())
            .with_log_data(self.log_data);
        config.with_timestamps = self.timestamps;
        Ok(config)
    }
}

// ============================================================================
// Workspace Settings
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkspaceSettings {
    /// Snapshot file opened at startup and saved on exit.
    pub snapshot_path: Option<PathBuf>,
}
