//! Whole-report checks run before sending.

use serde::{Deserialize, Serialize};
use tse_model::{RowId, SchemaId, TableRow, columns};
use tse_store::{RowStore, children_of};

use crate::error::{Result, ValidateError};
use crate::validator::ValidatorRegistry;

/// Issue severity level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Severity {
    /// Must fix before sending.
    Error,
    /// Should review.
    Warning,
}

impl Severity {
    /// Human-readable label.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Error => "Error",
            Self::Warning => "Warning",
        }
    }
}

/// What is wrong with a report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum IssueKind {
    /// More inconclusive samples declared than cases reported.
    InconclusiveExceedsCases { declared: u64, cases: usize },
    /// More positive samples declared than cases reported.
    PositiveExceedsCases { declared: u64, cases: usize },
    /// A row has a validator warning.
    RowWarning { level: u32 },
}

impl IssueKind {
    pub fn message(&self) -> String {
        match self {
            Self::InconclusiveExceedsCases { declared, cases } => format!(
                "{declared} inconclusive samples declared but only {cases} cases reported"
            ),
            Self::PositiveExceedsCases { declared, cases } => {
                format!("{declared} positive samples declared but only {cases} cases reported")
            }
            Self::RowWarning { level } => format!("row has warnings (level {level})"),
        }
    }
}

/// One problem found by [`check_report`], with the row it concerns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportIssue {
    pub schema: SchemaId,
    pub row_id: RowId,
    pub severity: Severity,
    pub kind: IssueKind,
}

impl ReportIssue {
    pub fn message(&self) -> String {
        self.kind.message()
    }
}

fn declared_total(row: &TableRow, column: &str) -> Option<u64> {
    row.get(column).and_then(|v| v.trim().parse().ok())
}

/// Check a report and every row below it.
///
/// Errors block sending; warnings only inform.
pub fn check_report<S: RowStore + ?Sized>(
    store: &S,
    registry: &ValidatorRegistry,
    report_id: RowId,
) -> Result<Vec<ReportIssue>> {
    let report = store
        .get(SchemaId::Report, report_id)?
        .ok_or(ValidateError::RowNotFound {
            schema: SchemaId::Report,
            id: report_id,
        })?;

    let mut issues = Vec::new();
    let mut row_warning = |row: &TableRow| -> Result<()> {
        let level = registry.warning_level(row);
        if level > 0 {
            issues.push(ReportIssue {
                schema: row.schema(),
                row_id: row.database_id()?,
                severity: if level > 1 {
                    Severity::Error
                } else {
                    Severity::Warning
                },
                kind: IssueKind::RowWarning { level },
            });
        }
        Ok(())
    };

    let mut totals = Vec::new();
    for si in children_of(store, &report)? {
        row_warning(&si)?;
        let cases = children_of(store, &si)?;
        for case in &cases {
            row_warning(case)?;
            for result in children_of(store, case)? {
                row_warning(&result)?;
            }
        }
        totals.push((si, cases.len()));
    }

    for (si, cases) in totals {
        let row_id = si.database_id()?;
        if let Some(declared) = declared_total(&si, columns::SUMMARIZED_INFO_INC_SAMPLES)
            && declared > cases as u64
        {
            issues.push(ReportIssue {
                schema: SchemaId::SummarizedInfo,
                row_id,
                severity: Severity::Error,
                kind: IssueKind::InconclusiveExceedsCases { declared, cases },
            });
        }
        if let Some(declared) = declared_total(&si, columns::SUMMARIZED_INFO_POS_SAMPLES)
            && declared > cases as u64
        {
            issues.push(ReportIssue {
                schema: SchemaId::SummarizedInfo,
                row_id,
                severity: Severity::Error,
                kind: IssueKind::PositiveExceedsCases { declared, cases },
            });
        }
    }

    tracing::debug!(report = %report_id, issues = issues.len(), "report checked");
    Ok(issues)
}

/// True when none of the issues blocks sending.
pub fn is_sendable(issues: &[ReportIssue]) -> bool {
    issues.iter().all(|issue| issue.severity != Severity::Error)
}
