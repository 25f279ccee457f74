//! How a later version's record is laid over the current row.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tse_model::{DatasetStatus, TableRow, columns};

/// What happens to a column the later version does not mention.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AbsentFieldPolicy {
    /// Keep the value from the earlier version.
    #[default]
    KeepExisting,
    /// Remove the column.
    Clear,
}

/// Merge behaviour of the importer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MergePolicy {
    pub absent_fields: AbsentFieldPolicy,
    /// Versions in one of these statuses are complete restatements: rows
    /// they no longer list are removed.
    pub prune_statuses: Vec<DatasetStatus>,
}

impl Default for MergePolicy {
    fn default() -> Self {
        Self {
            absent_fields: AbsentFieldPolicy::KeepExisting,
            prune_statuses: vec![DatasetStatus::Deleted],
        }
    }
}

/// Columns maintained locally that a payload never clears.
const LOCAL_COLUMNS: [&str; 2] = [columns::CHILDREN_ERROR, columns::PROG_ID];

impl MergePolicy {
    pub fn with_absent_fields(mut self, absent_fields: AbsentFieldPolicy) -> Self {
        self.absent_fields = absent_fields;
        self
    }

    /// Whether a version in `status` removes rows it does not list.
    pub fn prunes(&self, status: DatasetStatus) -> bool {
        self.prune_statuses.contains(&status)
    }

    /// Lay `incoming` over `row`.
    ///
    /// Present values always win, including empty ones.
    pub fn apply(&self, row: &mut TableRow, incoming: &BTreeMap<String, String>) {
        if self.absent_fields == AbsentFieldPolicy::Clear {
            let stale: Vec<String> = row
                .values()
                .keys()
                .filter(|column| {
                    !incoming.contains_key(*column) && !LOCAL_COLUMNS.contains(&column.as_str())
                })
                .cloned()
                .collect();
            for column in stale {
                row.remove(&column);
            }
        }
        for (column, value) in incoming {
            row.put(column.as_str(), value.as_str());
        }
    }
}
