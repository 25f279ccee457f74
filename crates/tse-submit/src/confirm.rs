//! Questions asked before an action goes ahead.

use tse_model::{DatasetStatus, ReportAction};

/// A yes/no question for the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfirmationRequest {
    /// "Do you really want to <action> the report?"
    Action(ReportAction),
    /// Sending replaces the remote dataset.
    Replace {
        dataset_id: String,
        status: DatasetStatus,
    },
    /// The report goes to this data collection.
    DataCollection { code: String },
}

impl ConfirmationRequest {
    /// Question text.
    pub fn message(&self) -> String {
        match self {
            Self::Action(ReportAction::Amend) => {
                "A new version of the report will be created. Continue?".to_string()
            }
            Self::Action(action) => format!("Do you really want to {action} the report?"),
            Self::Replace { dataset_id, status } => format!(
                "Dataset {dataset_id} is {} in the collection service and will be replaced. Continue?",
                status.display_name().to_lowercase()
            ),
            Self::DataCollection { code } => {
                format!("The report will be sent to the data collection {code}. Continue?")
            }
        }
    }
}

/// Answers confirmation requests, usually by asking the user.
pub trait Confirmer: Send + Sync {
    fn confirm(&self, request: &ConfirmationRequest) -> bool;
}

impl<F> Confirmer for F
where
    F: Fn(&ConfirmationRequest) -> bool + Send + Sync,
{
    fn confirm(&self, request: &ConfirmationRequest) -> bool {
        self(request)
    }
}
