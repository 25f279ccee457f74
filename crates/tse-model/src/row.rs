//! Generic keyed rows.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::columns;
use crate::error::{ModelError, Result};
use crate::schema::SchemaId;

/// Local auto-generated row id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RowId(u64);

impl RowId {
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    pub const fn get(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for RowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A single row of one of the report tables.
///
/// Values are kept as strings keyed by column id. The id is `None` until the
/// row store assigns one on insert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableRow {
    id: Option<RowId>,
    schema: SchemaId,
    parent_id: Option<RowId>,
    values: BTreeMap<String, String>,
}

impl TableRow {
    /// Create an empty, unsaved row.
    pub fn new(schema: SchemaId) -> Self {
        Self {
            id: None,
            schema,
            parent_id: None,
            values: BTreeMap::new(),
        }
    }

    /// Create an unsaved row linked under `parent`.
    pub fn child_of(schema: SchemaId, parent: RowId) -> Self {
        let mut row = Self::new(schema);
        row.parent_id = Some(parent);
        row
    }

    pub fn id(&self) -> Option<RowId> {
        self.id
    }

    /// Id of a stored row.
    pub fn database_id(&self) -> Result<RowId> {
        self.id.ok_or(ModelError::UnsavedRow {
            schema: self.schema,
        })
    }

    pub fn set_id(&mut self, id: RowId) {
        self.id = Some(id);
    }

    pub fn schema(&self) -> SchemaId {
        self.schema
    }

    pub fn parent_id(&self) -> Option<RowId> {
        self.parent_id
    }

    pub fn set_parent_id(&mut self, parent: RowId) {
        self.parent_id = Some(parent);
    }

    /// Value of a column, `None` when the column was never set.
    pub fn get(&self, column: &str) -> Option<&str> {
        self.values.get(column).map(String::as_str)
    }

    /// Value of a column, empty when unset.
    pub fn get_or_empty(&self, column: &str) -> &str {
        self.get(column).unwrap_or("")
    }

    /// True when the column holds a non-blank value.
    pub fn is_filled(&self, column: &str) -> bool {
        self.get(column).is_some_and(|v| !v.trim().is_empty())
    }

    pub fn put(&mut self, column: impl Into<String>, value: impl Into<String>) {
        self.values.insert(column.into(), value.into());
    }

    pub fn remove(&mut self, column: &str) -> Option<String> {
        self.values.remove(column)
    }

    pub fn values(&self) -> &BTreeMap<String, String> {
        &self.values
    }

    /// Whether a descendant of this row has a validation warning.
    pub fn children_error(&self) -> bool {
        self.get(columns::CHILDREN_ERROR) == Some("true")
    }

    pub fn set_children_error(&mut self, error: bool) {
        self.put(columns::CHILDREN_ERROR, if error { "true" } else { "false" });
    }

    /// Fail unless the row belongs to `expected`.
    pub fn expect_schema(&self, expected: SchemaId) -> Result<()> {
        if self.schema == expected {
            Ok(())
        } else {
            Err(ModelError::SchemaMismatch {
                expected,
                found: self.schema,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unsaved_row_has_no_database_id() {
        let row = TableRow::new(SchemaId::CaseReport);
        assert_eq!(
            row.database_id(),
            Err(ModelError::UnsavedRow {
                schema: SchemaId::CaseReport
            })
        );
    }

    #[test]
    fn children_error_defaults_to_false() {
        let mut row = TableRow::new(SchemaId::SummarizedInfo);
        assert!(!row.children_error());
        row.set_children_error(true);
        assert!(row.children_error());
        row.set_children_error(false);
        assert_eq!(row.get(columns::CHILDREN_ERROR), Some("false"));
    }

    #[test]
    fn blank_values_are_not_filled() {
        let mut row = TableRow::new(SchemaId::AnalyticalResult);
        row.put(columns::TEST_AIM, "  ");
        assert!(!row.is_filled(columns::TEST_AIM));
        assert!(!row.is_filled(columns::RESULT_VALUE));
        row.put(columns::RESULT_VALUE, "POS");
        assert!(row.is_filled(columns::RESULT_VALUE));
    }
}
