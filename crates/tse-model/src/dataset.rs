//! Remote dataset descriptors.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::Result;
use crate::sender::SenderId;
use crate::status::DatasetStatus;

/// One remote version of a report, as listed by the collection service.
///
/// Descriptors are input to import only and never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetVersion {
    /// Remote dataset id used to download the payload.
    pub dataset_id: String,
    /// Sender dataset id, e.g. `AT1706.00`.
    pub sender_id: String,
    /// Status declared by the remote service for this version.
    pub status: DatasetStatus,
}

impl DatasetVersion {
    pub fn new(
        dataset_id: impl Into<String>,
        sender_id: impl Into<String>,
        status: DatasetStatus,
    ) -> Self {
        Self {
            dataset_id: dataset_id.into(),
            sender_id: sender_id.into(),
            status,
        }
    }

    /// Parsed sender id.
    pub fn parsed_sender_id(&self) -> Result<SenderId> {
        SenderId::parse(&self.sender_id)
    }

    /// Version ordinal from the sender id suffix.
    pub fn ordinal(&self) -> Result<u32> {
        self.parsed_sender_id().map(|id| id.ordinal())
    }
}

/// Operation requested from the remote service when sending a report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OperationType {
    /// First upload of a dataset.
    Insert,
    /// Upload replacing an existing remote dataset.
    Replace,
    /// Reject a dataset that passed validation.
    Reject,
    /// Submit a valid dataset for acceptance.
    Submit,
    /// Connection test, the dataset is discarded remotely.
    Test,
}

impl OperationType {
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Insert => "Insert",
            Self::Replace => "Replace",
            Self::Reject => "Reject",
            Self::Submit => "Submit",
            Self::Test => "Test",
        }
    }
}

impl fmt::Display for OperationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
