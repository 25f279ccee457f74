//! Report lifecycle.
//!
//! Every change of a report's status goes through
//! [`ReportStatusMachine::transition`]. The remaining functions answer the
//! questions the action coordinator asks before touching the remote service.

use std::fmt;

use tse_model::DatasetStatus;

use crate::error::StatusError;

/// Something that happened to a report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatusEvent {
    /// The report was uploaded.
    Sent,
    /// The remote dataset was submitted for warehouse acceptance.
    Submitted,
    /// The remote dataset was rejected by the user.
    Rejected,
    /// A new local version was opened.
    Amended,
    /// The remote service reported a new status.
    Refreshed(DatasetStatus),
}

impl StatusEvent {
    pub(crate) fn past_tense(&self) -> &'static str {
        match self {
            Self::Sent => "sent",
            Self::Submitted => "submitted",
            Self::Rejected => "rejected",
            Self::Amended => "amended",
            Self::Refreshed(_) => "refreshed",
        }
    }
}

impl fmt::Display for StatusEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sent => f.write_str("SENT"),
            Self::Submitted => f.write_str("SUBMITTED"),
            Self::Rejected => f.write_str("REJECTED"),
            Self::Amended => f.write_str("AMENDED"),
            Self::Refreshed(status) => write!(f, "REFRESHED({status})"),
        }
    }
}

/// What a send must do about the remote dataset that already exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendGate {
    /// No dataset, or one that can be overwritten silently.
    Free,
    /// The remote dataset is replaced; the user must agree.
    NeedsReplace,
    /// The remote dataset is in the warehouse pipeline.
    Blocked,
    /// The remote status leaves nothing sensible to do.
    Unsupported,
}

/// Status rules of a report.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReportStatusMachine;

impl ReportStatusMachine {
    /// Whether the report content may still be changed and sent.
    pub const fn is_editable(status: DatasetStatus) -> bool {
        !matches!(
            status,
            DatasetStatus::AcceptedDwh
                | DatasetStatus::Submitted
                | DatasetStatus::Processing
                | DatasetStatus::AcceptedDcf
        )
    }

    /// Whether sending over a remote dataset in this status replaces it.
    pub const fn requires_replace_confirmation(status: DatasetStatus) -> bool {
        matches!(
            status,
            DatasetStatus::RejectedEditable
                | DatasetStatus::Valid
                | DatasetStatus::ValidWithWarnings
        )
    }

    /// Gate a send on the status of the latest remote dataset.
    pub const fn send_gate(remote: Option<DatasetStatus>) -> SendGate {
        match remote {
            None | Some(DatasetStatus::Rejected | DatasetStatus::Deleted) => SendGate::Free,
            Some(
                DatasetStatus::AcceptedDwh | DatasetStatus::Submitted | DatasetStatus::Processing,
            ) => SendGate::Blocked,
            Some(status) if Self::requires_replace_confirmation(status) => SendGate::NeedsReplace,
            Some(_) => SendGate::Unsupported,
        }
    }

    /// Status after `event`, or an error when the event is not allowed.
    pub fn transition(
        current: DatasetStatus,
        event: StatusEvent,
    ) -> Result<DatasetStatus, StatusError> {
        let next = match event {
            StatusEvent::Sent if Self::is_editable(current) => Some(DatasetStatus::Processing),
            StatusEvent::Submitted
                if matches!(
                    current,
                    DatasetStatus::Valid | DatasetStatus::ValidWithWarnings
                ) =>
            {
                Some(DatasetStatus::Submitted)
            }
            StatusEvent::Rejected
                if matches!(
                    current,
                    DatasetStatus::Valid
                        | DatasetStatus::ValidWithWarnings
                        | DatasetStatus::RejectedEditable
                ) =>
            {
                Some(DatasetStatus::Rejected)
            }
            StatusEvent::Amended if current == DatasetStatus::AcceptedDwh => {
                Some(DatasetStatus::Draft)
            }
            StatusEvent::Refreshed(remote) => Some(remote),
            _ => None,
        };

        next.ok_or(StatusError::InvalidTransition {
            from: current,
            event,
        })
    }
}
