use serde::{Deserialize, Serialize};
use std::fmt;

/// Action a user can request on a report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReportAction {
    /// Upload the report to the remote service.
    Send,
    /// Reject the remote dataset.
    Reject,
    /// Submit the remote dataset for warehouse acceptance.
    Submit,
    /// Open a new local version of an accepted report.
    Amend,
}

impl ReportAction {
    pub const ALL: [ReportAction; 4] = [Self::Send, Self::Reject, Self::Submit, Self::Amend];

    pub const fn label(&self) -> &'static str {
        match self {
            Self::Send => "send",
            Self::Reject => "reject",
            Self::Submit => "submit",
            Self::Amend => "amend",
        }
    }

    /// Whether the action talks to the remote service.
    pub const fn is_remote(&self) -> bool {
        !matches!(self, Self::Amend)
    }
}

impl fmt::Display for ReportAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
