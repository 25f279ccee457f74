//! Schema identifiers for the four row tables.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifies which table a row belongs to.
///
/// The hierarchy is fixed: each schema has at most one parent schema and at
/// most one child schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum SchemaId {
    Report,
    SummarizedInfo,
    CaseReport,
    AnalyticalResult,
}

impl SchemaId {
    /// All schemas, root first.
    pub const ALL: [SchemaId; 4] = [
        SchemaId::Report,
        SchemaId::SummarizedInfo,
        SchemaId::CaseReport,
        SchemaId::AnalyticalResult,
    ];

    /// Table name used by the row store.
    pub const fn table_name(&self) -> &'static str {
        match self {
            Self::Report => "Report",
            Self::SummarizedInfo => "SummarizedInformation",
            Self::CaseReport => "CasesInformation",
            Self::AnalyticalResult => "AnalyticalResults",
        }
    }

    /// Schema of the parent row, `None` for the root.
    pub const fn parent(&self) -> Option<SchemaId> {
        match self {
            Self::Report => None,
            Self::SummarizedInfo => Some(Self::Report),
            Self::CaseReport => Some(Self::SummarizedInfo),
            Self::AnalyticalResult => Some(Self::CaseReport),
        }
    }

    /// Schema of the child rows, `None` for the leaves.
    pub const fn child(&self) -> Option<SchemaId> {
        match self {
            Self::Report => Some(Self::SummarizedInfo),
            Self::SummarizedInfo => Some(Self::CaseReport),
            Self::CaseReport => Some(Self::AnalyticalResult),
            Self::AnalyticalResult => None,
        }
    }

    /// Depth in the hierarchy (report = 0).
    pub const fn depth(&self) -> usize {
        match self {
            Self::Report => 0,
            Self::SummarizedInfo => 1,
            Self::CaseReport => 2,
            Self::AnalyticalResult => 3,
        }
    }

    /// Whether rows of this schema carry a children error flag.
    pub const fn has_children_error_flag(&self) -> bool {
        matches!(self, Self::SummarizedInfo | Self::CaseReport)
    }
}

impl fmt::Display for SchemaId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.table_name())
    }
}
