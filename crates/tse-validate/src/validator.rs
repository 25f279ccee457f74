//! Per-row warning levels.
//!
//! A warning level of 0 means the row is fine. Higher levels are more
//! severe; any level above 0 marks the parent chain with a children error.

use std::collections::HashMap;
use std::sync::Arc;

use tse_model::{SchemaId, TableRow, columns};

/// Computes the warning level of a single row.
pub trait RowValidator: Send + Sync {
    fn warning_level(&self, row: &TableRow) -> u32;
}

impl<F> RowValidator for F
where
    F: Fn(&TableRow) -> u32 + Send + Sync,
{
    fn warning_level(&self, row: &TableRow) -> u32 {
        self(row)
    }
}

fn missing(row: &TableRow, column: &str) -> bool {
    !row.is_filled(column)
}

fn not_a_count(row: &TableRow, column: &str) -> bool {
    row.get(column)
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .is_some_and(|v| v.parse::<u64>().is_err())
}

/// Summarized information: type required, totals must be counts.
#[derive(Debug, Clone, Copy, Default)]
pub struct SummarizedInfoValidator;

impl RowValidator for SummarizedInfoValidator {
    fn warning_level(&self, row: &TableRow) -> u32 {
        let bad_total = [
            columns::SUMMARIZED_INFO_TOT_TESTED,
            columns::SUMMARIZED_INFO_POS_SAMPLES,
            columns::SUMMARIZED_INFO_INC_SAMPLES,
        ]
        .iter()
        .any(|column| not_a_count(row, column));

        if missing(row, columns::SUMMARIZED_INFO_TYPE) || bad_total {
            2
        } else {
            0
        }
    }
}

/// Case: sample id required, animal and national case ids expected.
#[derive(Debug, Clone, Copy, Default)]
pub struct CaseReportValidator;

impl RowValidator for CaseReportValidator {
    fn warning_level(&self, row: &TableRow) -> u32 {
        if missing(row, columns::SAMPLE_ID) {
            2
        } else if missing(row, columns::ANIMAL_ID) || missing(row, columns::NATIONAL_CASE_ID) {
            1
        } else {
            0
        }
    }
}

/// Analytical result: result value required, test description expected.
#[derive(Debug, Clone, Copy, Default)]
pub struct AnalyticalResultValidator;

impl RowValidator for AnalyticalResultValidator {
    fn warning_level(&self, row: &TableRow) -> u32 {
        if missing(row, columns::RESULT_VALUE) {
            return 2;
        }
        let incomplete = [
            columns::TEST_AIM,
            columns::AN_METH_CODE,
            columns::PARAM_CODE_BASE_TERM,
        ]
        .iter()
        .any(|column| missing(row, column));
        u32::from(incomplete)
    }
}

/// Validators indexed by schema.
///
/// Schemas without a validator always report level 0.
#[derive(Clone, Default)]
pub struct ValidatorRegistry {
    validators: HashMap<SchemaId, Arc<dyn RowValidator>>,
}

impl std::fmt::Debug for ValidatorRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ValidatorRegistry")
            .field("schemas", &self.validators.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl ValidatorRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the built-in validators of the three child tables.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.insert(SchemaId::SummarizedInfo, SummarizedInfoValidator);
        registry.insert(SchemaId::CaseReport, CaseReportValidator);
        registry.insert(SchemaId::AnalyticalResult, AnalyticalResultValidator);
        registry
    }

    /// Register or replace the validator of a schema.
    pub fn insert(&mut self, schema: SchemaId, validator: impl RowValidator + 'static) {
        self.validators.insert(schema, Arc::new(validator));
    }

    pub fn get(&self, schema: SchemaId) -> Option<&dyn RowValidator> {
        self.validators.get(&schema).map(Arc::as_ref)
    }

    /// Warning level of a row according to its schema's validator.
    pub fn warning_level(&self, row: &TableRow) -> u32 {
        self.get(row.schema())
            .map_or(0, |validator| validator.warning_level(row))
    }

    pub fn len(&self) -> usize {
        self.validators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.validators.is_empty()
    }
}
