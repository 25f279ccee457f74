//! User-facing outcome messages.

use std::fmt;

use serde::{Deserialize, Serialize};

/// How serious a notice is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum NoticeLevel {
    Info,
    Warning,
    Error,
    /// The action failed in a way the user cannot fix alone.
    Fatal,
}

impl NoticeLevel {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Info => "Info",
            Self::Warning => "Warning",
            Self::Error => "Error",
            Self::Fatal => "Fatal",
        }
    }
}

/// Message shown to the user at the end of an action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
    pub title: String,
    pub message: String,
    pub level: NoticeLevel,
    /// Support address to print alongside the message.
    pub support_contact: Option<String>,
}

impl Notice {
    pub fn new(level: NoticeLevel, title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            message: message.into(),
            level,
            support_contact: None,
        }
    }

    pub fn info(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Info, title, message)
    }

    pub fn warning(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Warning, title, message)
    }

    pub fn error(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Error, title, message)
    }

    pub fn fatal(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Fatal, title, message)
    }

    /// Attach a support address. Blank addresses are ignored.
    #[must_use]
    pub fn with_support(mut self, contact: &str) -> Self {
        let contact = contact.trim();
        if !contact.is_empty() {
            self.support_contact = Some(contact.to_string());
        }
        self
    }

    pub fn is_fatal(&self) -> bool {
        self.level == NoticeLevel::Fatal
    }
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.level.label(), self.title, self.message)?;
        if let Some(contact) = &self.support_contact {
            write!(f, " Contact {contact} for support.")?;
        }
        Ok(())
    }
}

/// Failure classes an action error is reduced to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorClass {
    /// Network or local I/O failed.
    Io,
    /// The service answered with a fault.
    ServiceFault,
    /// The answer could not be understood.
    MalformedResponse,
    /// The outgoing message schema is missing.
    SchemaUnavailable,
    /// The service refused the message.
    RejectedByRemote,
    /// The remote dataset status does not allow the action.
    UnsupportedForStatus,
    /// The report has no sender dataset id.
    MissingSenderId,
    /// The remote action succeeded but the local report was not updated.
    NotRecorded,
    /// Anything else.
    Unknown,
}
