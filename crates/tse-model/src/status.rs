//! Dataset status vocabulary of the remote collection service.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ModelError;

/// Status of a dataset, either as declared by the remote service or as
/// tracked locally for a report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DatasetStatus {
    /// Created locally, never sent.
    #[default]
    Draft,
    /// Submitted for acceptance into the data warehouse.
    Submitted,
    /// Remote validation is still running.
    Processing,
    /// Accepted into the data warehouse.
    AcceptedDwh,
    /// Accepted by the collection framework, pending warehouse load.
    AcceptedDcf,
    /// Passed remote validation.
    Valid,
    /// Passed remote validation with warnings.
    ValidWithWarnings,
    /// Rejected; a new version must be sent.
    Rejected,
    /// Rejected by remote validation; the dataset can be corrected and resent.
    RejectedEditable,
    /// Deleted remotely.
    Deleted,
    /// Remote processing failed.
    Failed,
}

impl DatasetStatus {
    pub const ALL: [DatasetStatus; 11] = [
        Self::Draft,
        Self::Submitted,
        Self::Processing,
        Self::AcceptedDwh,
        Self::AcceptedDcf,
        Self::Valid,
        Self::ValidWithWarnings,
        Self::Rejected,
        Self::RejectedEditable,
        Self::Deleted,
        Self::Failed,
    ];

    /// Wire label as used by the remote service.
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Draft => "DRAFT",
            Self::Submitted => "SUBMITTED",
            Self::Processing => "PROCESSING",
            Self::AcceptedDwh => "ACCEPTED_DWH",
            Self::AcceptedDcf => "ACCEPTED_DCF",
            Self::Valid => "VALID",
            Self::ValidWithWarnings => "VALID_WITH_WARNINGS",
            Self::Rejected => "REJECTED",
            Self::RejectedEditable => "REJECTED_EDITABLE",
            Self::Deleted => "DELETED",
            Self::Failed => "FAILED",
        }
    }

    /// Human readable label for notices.
    pub const fn display_name(&self) -> &'static str {
        match self {
            Self::Draft => "Draft",
            Self::Submitted => "Submitted",
            Self::Processing => "Processing",
            Self::AcceptedDwh => "Accepted in data warehouse",
            Self::AcceptedDcf => "Accepted",
            Self::Valid => "Valid",
            Self::ValidWithWarnings => "Valid with warnings",
            Self::Rejected => "Rejected",
            Self::RejectedEditable => "Rejected (editable)",
            Self::Deleted => "Deleted",
            Self::Failed => "Failed",
        }
    }
}

impl fmt::Display for DatasetStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for DatasetStatus {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_uppercase();
        Self::ALL
            .into_iter()
            .find(|status| status.label() == normalized)
            .ok_or_else(|| ModelError::UnknownStatus(s.to_string()))
    }
}
