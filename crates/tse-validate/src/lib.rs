//! Validation of TSE report hierarchies.
//!
//! - [`RowValidator`] and [`ValidatorRegistry`]: warning level per row,
//!   looked up by schema
//! - [`ValidationAggregator`]: keeps the children-error flags of summarized
//!   information and case rows in sync with the rows below them
//! - [`check_report`]: whole-report checks run before sending
//! - `edit_rules`: columns derived from edits of an analytical result

mod aggregator;
mod check;
pub mod edit_rules;
mod error;
mod validator;

// === Error Types ===
pub use error::{Result, ValidateError};

// === Validators ===
pub use validator::{
    AnalyticalResultValidator, CaseReportValidator, RowValidator, SummarizedInfoValidator,
    ValidatorRegistry,
};

// === Flags ===
pub use aggregator::{FlagChange, ValidationAggregator};

// === Report Checks ===
pub use check::{IssueKind, ReportIssue, Severity, check_report, is_sendable};

// === Edit Rules ===
pub use edit_rules::{
    FieldUpdate, PredefinedResultTable, PredefinedResults, apply_updates, default_results,
    result_field_changed,
};
