//! Reduction of action errors to notices.
//!
//! Every error an action can raise lands in exactly one [`ErrorClass`], and
//! every class has exactly one notice shape.

use tse_model::{DatasetStatus, ModelError, ReportAction, TransportError};

use crate::error::ActionError;
use crate::notice::{ErrorClass, Notice};
use crate::status::{ReportStatusMachine, SendGate};

/// Class of an action error.
pub fn classify(err: &ActionError) -> ErrorClass {
    match err {
        ActionError::Transport(err) => match err {
            TransportError::Io(_) => ErrorClass::Io,
            TransportError::Fault { .. } => ErrorClass::ServiceFault,
            TransportError::MalformedResponse(_) => ErrorClass::MalformedResponse,
            TransportError::SchemaUnavailable(_) => ErrorClass::SchemaUnavailable,
            TransportError::Rejected { .. } => ErrorClass::RejectedByRemote,
            TransportError::UnsupportedOperation { .. } => ErrorClass::UnsupportedForStatus,
            TransportError::MissingSenderId => ErrorClass::MissingSenderId,
            _ => ErrorClass::Unknown,
        },
        ActionError::Status(_) => ErrorClass::UnsupportedForStatus,
        ActionError::Model(
            ModelError::MissingVersionSuffix(_)
            | ModelError::InvalidVersionSuffix { .. }
            | ModelError::InvalidReportCode(_),
        ) => ErrorClass::MissingSenderId,
        ActionError::NotRecorded { .. } => ErrorClass::NotRecorded,
        ActionError::Store(_) | ActionError::Model(_) => ErrorClass::Unknown,
    }
}

/// Notice for a remote dataset whose status stops an action.
pub(crate) fn remote_status_notice(
    title: &str,
    dataset_id: &str,
    status: DatasetStatus,
    support: &str,
) -> Notice {
    if ReportStatusMachine::send_gate(Some(status)) == SendGate::Blocked {
        Notice::warning(
            title,
            format!(
                "Dataset {dataset_id} is {} in the collection service and cannot be changed.",
                status.display_name().to_lowercase()
            ),
        )
    } else {
        Notice::fatal(
            title,
            format!("Dataset {dataset_id} is in the unexpected status {status}."),
        )
        .with_support(support)
    }
}

fn action_past_tense(action: ReportAction) -> &'static str {
    match action {
        ReportAction::Send => "sent",
        ReportAction::Reject => "rejected",
        ReportAction::Submit => "submitted",
        ReportAction::Amend => "amended",
    }
}

/// Notice for a failed action. `title` names what failed.
pub(crate) fn failure_notice(err: &ActionError, title: &str, support: &str) -> Notice {
    let class = classify(err);
    let notice = match (class, err) {
        (
            ErrorClass::RejectedByRemote,
            ActionError::Transport(TransportError::Rejected { code, reason }),
        ) => Notice::warning(
            title,
            format!("The collection service refused the message ({code}): {reason}"),
        ),
        (
            ErrorClass::UnsupportedForStatus,
            ActionError::Transport(TransportError::UnsupportedOperation { dataset_id, status }),
        ) => remote_status_notice(title, dataset_id, *status, support),
        (ErrorClass::UnsupportedForStatus, ActionError::Status(err)) => {
            let mut message = err.user_message();
            if let Some(suggestion) = err.suggestion() {
                message = format!("{message} {suggestion}");
            }
            Notice::error(title, message)
        }
        (
            ErrorClass::ServiceFault,
            ActionError::Transport(TransportError::Fault { code, message }),
        ) => Notice::warning(
            title,
            format!(
                "The collection service answered with fault {code}: {message}. \
                 Check your credentials and try again later."
            ),
        ),
        (ErrorClass::NotRecorded, ActionError::NotRecorded { action, sender_id, .. }) => {
            Notice::fatal(
                title,
                format!(
                    "Report {sender_id} was {} in the collection service, but its local \
                     status could not be saved. Refresh its status before editing it.",
                    action_past_tense(*action)
                ),
            )
            .with_support(support)
        }
        (ErrorClass::Io, _) => Notice::fatal(
            title,
            "The collection service could not be reached. Check your connection.",
        )
        .with_support(support),
        (ErrorClass::MalformedResponse, _) => Notice::fatal(
            title,
            "The answer of the collection service could not be read.",
        )
        .with_support(support),
        (ErrorClass::SchemaUnavailable, _) => Notice::fatal(
            title,
            "The message schema of the collection service is missing.",
        )
        .with_support(support),
        (ErrorClass::MissingSenderId, _) => {
            Notice::fatal(title, "The report has no valid sender dataset id.")
                .with_support(support)
        }
        _ => Notice::fatal(title, format!("An unexpected error occurred: {err}"))
            .with_support(support),
    };

    if notice.is_fatal() {
        tracing::error!(class = ?class, error = %err, "{title}");
    } else {
        tracing::warn!(class = ?class, error = %err, "{title}");
    }
    notice
}
