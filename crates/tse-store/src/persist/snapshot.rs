//! Snapshot types written to `.tse` files.

use chrono::{DateTime, Utc};
use rkyv::{Archive, Deserialize, Serialize};
use tse_model::{RowId, SchemaId, TableRow};

use super::CURRENT_SCHEMA_VERSION;

/// Root structure serialized to `.tse` files.
#[derive(Debug, Clone, Archive, Serialize, Deserialize)]
pub struct StoreFile {
    /// Schema version (for future migrations).
    pub schema_version: u32,

    /// When the store file was created.
    pub created_at: String,

    /// When the store file was last saved.
    pub last_saved_at: String,

    /// Next id the store will hand out.
    pub next_id: u64,

    /// Rows of all four tables, parents before children.
    pub rows: Vec<RowSnapshot>,
}

impl StoreFile {
    pub fn new(next_id: u64, rows: Vec<RowSnapshot>) -> Self {
        let now = Utc::now().to_rfc3339();
        Self {
            schema_version: CURRENT_SCHEMA_VERSION,
            created_at: now.clone(),
            last_saved_at: now,
            next_id,
            rows,
        }
    }

    /// Update the last saved timestamp.
    pub fn touch(&mut self) {
        self.last_saved_at = Utc::now().to_rfc3339();
    }

    /// Parse the last_saved_at timestamp.
    pub fn last_saved_at(&self) -> Option<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(&self.last_saved_at)
            .ok()
            .map(|dt| dt.with_timezone(&Utc))
    }
}

/// Table a snapshot row belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Archive, Serialize, Deserialize)]
pub enum SchemaSnapshot {
    Report,
    SummarizedInfo,
    CaseReport,
    AnalyticalResult,
}

impl From<SchemaId> for SchemaSnapshot {
    fn from(schema: SchemaId) -> Self {
        match schema {
            SchemaId::Report => Self::Report,
            SchemaId::SummarizedInfo => Self::SummarizedInfo,
            SchemaId::CaseReport => Self::CaseReport,
            SchemaId::AnalyticalResult => Self::AnalyticalResult,
        }
    }
}

impl From<SchemaSnapshot> for SchemaId {
    fn from(schema: SchemaSnapshot) -> Self {
        match schema {
            SchemaSnapshot::Report => Self::Report,
            SchemaSnapshot::SummarizedInfo => Self::SummarizedInfo,
            SchemaSnapshot::CaseReport => Self::CaseReport,
            SchemaSnapshot::AnalyticalResult => Self::AnalyticalResult,
        }
    }
}

/// One stored row.
#[derive(Debug, Clone, Archive, Serialize, Deserialize)]
pub struct RowSnapshot {
    pub id: u64,
    pub schema: SchemaSnapshot,
    pub parent_id: Option<u64>,
    pub cells: Vec<CellSnapshot>,
}

/// A single column value.
#[derive(Debug, Clone, Archive, Serialize, Deserialize)]
pub struct CellSnapshot {
    pub column: String,
    pub value: String,
}

impl RowSnapshot {
    /// Snapshot a stored row. Returns `None` for rows without an id.
    pub fn from_row(row: &TableRow) -> Option<Self> {
        let id = row.id()?;
        Some(Self {
            id: id.get(),
            schema: row.schema().into(),
            parent_id: row.parent_id().map(|p| p.get()),
            cells: row
                .values()
                .iter()
                .map(|(column, value)| CellSnapshot {
                    column: column.clone(),
                    value: value.clone(),
                })
                .collect(),
        })
    }

    pub fn to_row(&self) -> TableRow {
        let schema = SchemaId::from(self.schema);
        let mut row = match self.parent_id {
            Some(parent) => TableRow::child_of(schema, RowId::new(parent)),
            None => TableRow::new(schema),
        };
        row.set_id(RowId::new(self.id));
        for cell in &self.cells {
            row.put(cell.column.clone(), cell.value.clone());
        }
        row
    }
}
