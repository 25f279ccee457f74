//! Derived fields of an analytical result.
//!
//! When the user edits the test aim, method code or method type of a
//! result, other columns follow. The rules are pure: they return the
//! updates and leave applying them to the caller.
//!
//! A case without results can also start from a set of predefined results
//! ([`default_results`]).

use std::collections::HashMap;

use tse_model::{SchemaId, TableRow, columns};

/// One column update produced by an edit rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldUpdate {
    Set { column: String, value: String },
    Clear { column: String },
}

impl FieldUpdate {
    fn set(column: &str, value: impl Into<String>) -> Self {
        Self::Set {
            column: column.to_string(),
            value: value.into(),
        }
    }

    fn clear(column: &str) -> Self {
        Self::Clear {
            column: column.to_string(),
        }
    }

    pub fn column(&self) -> &str {
        match self {
            Self::Set { column, .. } | Self::Clear { column } => column,
        }
    }
}

/// Lookup of predefined result values.
pub trait PredefinedResults {
    /// Base term for genotyping results of this summarized information.
    fn genotyping_base_term(&self, summarized_info: &TableRow) -> Option<String>;

    /// Parameter base term and result value predefined for a test aim or
    /// method code.
    fn param_and_result(&self, code: &str) -> Option<(String, String)>;

    /// Column values of the results a new case of this summarized
    /// information starts with, one list per result.
    fn default_result_values(&self, summarized_info: &TableRow) -> Vec<Vec<(String, String)>> {
        let _ = summarized_info;
        Vec::new()
    }
}

/// In-memory predefined results.
#[derive(Debug, Clone, Default)]
pub struct PredefinedResultTable {
    genotyping_base_terms: HashMap<String, String>,
    params: HashMap<String, (String, String)>,
    defaults: HashMap<String, Vec<Vec<(String, String)>>>,
}

impl PredefinedResultTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Genotyping base term for a summarized information type.
    pub fn with_genotyping(mut self, si_type: &str, base_term: &str) -> Self {
        self.genotyping_base_terms
            .insert(si_type.to_string(), base_term.to_string());
        self
    }

    pub fn with_param(mut self, code: &str, base_term: &str, result: &str) -> Self {
        self.params
            .insert(code.to_string(), (base_term.to_string(), result.to_string()));
        self
    }

    /// Add a default result for cases of a summarized information type.
    pub fn with_default_result(mut self, si_type: &str, values: &[(&str, &str)]) -> Self {
        self.defaults.entry(si_type.to_string()).or_default().push(
            values
                .iter()
                .map(|(column, value)| (column.to_string(), value.to_string()))
                .collect(),
        );
        self
    }
}

impl PredefinedResults for PredefinedResultTable {
    fn genotyping_base_term(&self, summarized_info: &TableRow) -> Option<String> {
        self.genotyping_base_terms
            .get(summarized_info.get_or_empty(columns::SUMMARIZED_INFO_TYPE))
            .cloned()
    }

    fn param_and_result(&self, code: &str) -> Option<(String, String)> {
        self.params.get(code).cloned()
    }

    fn default_result_values(&self, summarized_info: &TableRow) -> Vec<Vec<(String, String)>> {
        self.defaults
            .get(summarized_info.get_or_empty(columns::SUMMARIZED_INFO_TYPE))
            .cloned()
            .unwrap_or_default()
    }
}

/// Updates to apply after `field` of `result` was changed.
///
/// `result` already holds the new value.
pub fn result_field_changed(
    result: &TableRow,
    summarized_info: &TableRow,
    field: &str,
    lookup: &dyn PredefinedResults,
) -> Vec<FieldUpdate> {
    let mut updates = Vec::new();

    if field == columns::TEST_AIM || field == columns::AN_METH_CODE {
        let genotyping = result.get_or_empty(columns::AN_METH_CODE)
            == columns::AN_METH_CODE_GENOTYPING
            && summarized_info.get_or_empty(columns::SUMMARIZED_INFO_TYPE)
                != columns::summarized_info_type::BSEOS;

        if genotyping {
            match lookup.genotyping_base_term(summarized_info) {
                Some(base_term) => {
                    updates.push(FieldUpdate::set(columns::PARAM_CODE_BASE_TERM, base_term));
                }
                None => tracing::warn!(
                    si_type = summarized_info.get_or_empty(columns::SUMMARIZED_INFO_TYPE),
                    "no predefined genotyping base term"
                ),
            }
        } else if result.is_filled(columns::TEST_AIM)
            && let Some((base_term, value)) = lookup.param_and_result(result.get_or_empty(field))
        {
            updates.push(FieldUpdate::set(columns::PARAM_CODE_BASE_TERM, base_term));
            updates.push(FieldUpdate::set(columns::RESULT_VALUE, value));
        }
    }

    if field == columns::AN_METH_TYPE {
        updates.push(FieldUpdate::clear(columns::TEST_AIM));
        updates.push(FieldUpdate::clear(columns::AN_METH_CODE));
    }

    updates
}

/// Predefined results for a case that has none yet.
///
/// Nothing is predefined for BSEOS summarized information. The rows are
/// children of `case`, carry its sample id and get parameter and result
/// value from their test aim, as if the user had typed it.
pub fn default_results(
    summarized_info: &TableRow,
    case: &TableRow,
    lookup: &dyn PredefinedResults,
) -> Vec<TableRow> {
    if summarized_info.get_or_empty(columns::SUMMARIZED_INFO_TYPE)
        == columns::summarized_info_type::BSEOS
    {
        return Vec::new();
    }

    lookup
        .default_result_values(summarized_info)
        .into_iter()
        .map(|values| {
            let mut row = match case.id() {
                Some(case_id) => TableRow::child_of(SchemaId::AnalyticalResult, case_id),
                None => TableRow::new(SchemaId::AnalyticalResult),
            };
            if case.is_filled(columns::SAMPLE_ID) {
                row.put(columns::SAMPLE_ID, case.get_or_empty(columns::SAMPLE_ID));
            }
            for (column, value) in &values {
                row.put(column.as_str(), value.as_str());
            }
            if !row.is_filled(columns::PARAM_CODE_BASE_TERM) {
                let updates =
                    result_field_changed(&row, summarized_info, columns::TEST_AIM, lookup);
                apply_updates(&mut row, &updates);
            }
            row
        })
        .collect()
}

/// Apply updates to a row.
pub fn apply_updates(row: &mut TableRow, updates: &[FieldUpdate]) {
    for update in updates {
        match update {
            FieldUpdate::Set { column, value } => row.put(column.as_str(), value.as_str()),
            FieldUpdate::Clear { column } => {
                row.remove(column);
            }
        }
    }
}
