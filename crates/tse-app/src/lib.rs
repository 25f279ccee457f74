//! Composition root of the TSE reporting tool.
//!
//! Wires the core crates together for a front end:
//!
//! - **Settings** (`settings`): TOML settings in the platform config folder,
//!   turned into a [`Session`](tse_model::Session) and a
//!   [`MergePolicy`](tse_import::MergePolicy)
//! - **Logging** (`logging`): `tracing-subscriber` setup and redaction of
//!   identifying values
//! - **Workspace** (`workspace`): the shared row store and report locks
//! - **Services** (`service`): import, flag refresh and report actions on the
//!   blocking thread pool

pub mod error;
pub mod logging;
pub mod service;
pub mod settings;
pub mod workspace;

pub use error::{AppError, Result, SettingsError};
pub use logging::{LogConfig, LogFormat, init_logging, redact_value};
pub use settings::{Settings, load_settings, save_settings};
pub use workspace::Workspace;
