//! In-memory row store.

use std::collections::BTreeMap;

use tse_model::{RowId, SchemaId, TableRow};

use crate::error::{Result, StoreError};
use crate::persist::{RowSnapshot, StoreFile};
use crate::store::{RowStore, SortOrder};

type Table = BTreeMap<RowId, TableRow>;

#[derive(Debug, Clone, Default)]
struct Tables {
    rows: BTreeMap<SchemaId, Table>,
    next_id: u64,
}

impl Tables {
    fn table(&self, schema: SchemaId) -> Option<&Table> {
        self.rows.get(&schema)
    }

    fn contains(&self, schema: SchemaId, id: RowId) -> bool {
        self.table(schema).is_some_and(|t| t.contains_key(&id))
    }

    fn children(&self, schema: SchemaId, parent: RowId) -> impl Iterator<Item = &TableRow> {
        self.table(schema)
            .into_iter()
            .flat_map(|t| t.values())
            .filter(move |row| row.parent_id() == Some(parent))
    }
}

/// Row store kept entirely in memory.
///
/// Ids are shared across tables and start at 1. Transactions snapshot the
/// whole store on `begin` and restore it on `rollback`.
#[derive(Debug, Clone)]
pub struct MemoryRowStore {
    tables: Tables,
    checkpoint: Option<Tables>,
}

impl Default for MemoryRowStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryRowStore {
    pub fn new() -> Self {
        Self {
            tables: Tables {
                rows: BTreeMap::new(),
                next_id: 1,
            },
            checkpoint: None,
        }
    }

    /// Whether a transaction is open.
    pub fn in_transaction(&self) -> bool {
        self.checkpoint.is_some()
    }

    /// Number of rows in a table.
    pub fn len(&self, schema: SchemaId) -> usize {
        self.tables.table(schema).map_or(0, BTreeMap::len)
    }

    pub fn is_empty(&self) -> bool {
        self.tables.rows.values().all(BTreeMap::is_empty)
    }

    /// Snapshot the committed content of the store.
    ///
    /// Rows are ordered by table depth so that loading never sees a child
    /// before its parent.
    pub fn to_snapshot(&self) -> StoreFile {
        let committed = self.checkpoint.as_ref().unwrap_or(&self.tables);
        let rows = SchemaId::ALL
            .iter()
            .filter_map(|schema| committed.table(*schema))
            .flat_map(|table| table.values())
            .filter_map(RowSnapshot::from_row)
            .collect();
        StoreFile::new(committed.next_id, rows)
    }

    /// Rebuild a store from a snapshot, rejecting dangling parent references.
    pub fn from_snapshot(file: &StoreFile) -> Result<Self> {
        let mut tables = Tables {
            rows: BTreeMap::new(),
            next_id: file.next_id.max(1),
        };

        for snapshot in &file.rows {
            let row = snapshot.to_row();
            let schema = row.schema();
            let id = row.database_id()?;

            if id.get() >= tables.next_id {
                return Err(StoreError::CorruptSnapshot {
                    reason: format!("{schema} row {id} is beyond the id counter"),
                });
            }
            check_parent(&tables, &row).map_err(|_| StoreError::CorruptSnapshot {
                reason: format!("{schema} row {id} references a missing parent"),
            })?;

            let table = tables.rows.entry(schema).or_default();
            if table.insert(id, row).is_some() {
                return Err(StoreError::CorruptSnapshot {
                    reason: format!("{schema} row {id} appears twice"),
                });
            }
        }

        tracing::debug!(rows = file.rows.len(), "restored row store from snapshot");
        Ok(Self {
            tables,
            checkpoint: None,
        })
    }
}

fn check_parent(tables: &Tables, row: &TableRow) -> Result<()> {
    let orphan = || StoreError::OrphanRow {
        schema: row.schema(),
        parent: row.parent_id(),
    };
    match (row.schema().parent(), row.parent_id()) {
        (None, None) => Ok(()),
        (None, Some(_)) => Err(orphan()),
        (Some(_), None) => Err(orphan()),
        (Some(parent_schema), Some(parent)) => {
            if tables.contains(parent_schema, parent) {
                Ok(())
            } else {
                Err(orphan())
            }
        }
    }
}

impl RowStore for MemoryRowStore {
    fn get(&self, schema: SchemaId, id: RowId) -> Result<Option<TableRow>> {
        Ok(self
            .tables
            .table(schema)
            .and_then(|t| t.get(&id))
            .cloned())
    }

    fn get_all(&self, schema: SchemaId) -> Result<Vec<TableRow>> {
        Ok(self
            .tables
            .table(schema)
            .map(|t| t.values().cloned().collect())
            .unwrap_or_default())
    }

    fn get_by_parent_id(
        &self,
        schema: SchemaId,
        parent_id: RowId,
        order: SortOrder,
    ) -> Result<Vec<TableRow>> {
        let mut rows: Vec<TableRow> = self.tables.children(schema, parent_id).cloned().collect();
        if order == SortOrder::Desc {
            rows.reverse();
        }
        Ok(rows)
    }

    fn insert(&mut self, row: &mut TableRow) -> Result<RowId> {
        if let Some(id) = row.id() {
            return Err(StoreError::AlreadyStored {
                schema: row.schema(),
                id,
            });
        }
        check_parent(&self.tables, row)?;

        let id = RowId::new(self.tables.next_id);
        self.tables.next_id += 1;
        row.set_id(id);
        self.tables
            .rows
            .entry(row.schema())
            .or_default()
            .insert(id, row.clone());
        tracing::trace!(schema = %row.schema(), %id, "inserted row");
        Ok(id)
    }

    fn update(&mut self, row: &TableRow) -> Result<()> {
        let id = row.database_id()?;
        if !self.tables.contains(row.schema(), id) {
            return Err(StoreError::RowNotFound {
                schema: row.schema(),
                id,
            });
        }
        check_parent(&self.tables, row)?;

        if let Some(table) = self.tables.rows.get_mut(&row.schema()) {
            table.insert(id, row.clone());
        }
        tracing::trace!(schema = %row.schema(), %id, "updated row");
        Ok(())
    }

    fn delete(&mut self, row: &TableRow) -> Result<()> {
        let schema = row.schema();
        let id = row.database_id()?;
        if !self.tables.contains(schema, id) {
            return Err(StoreError::RowNotFound { schema, id });
        }
        if let Some(child_schema) = schema.child() {
            let children = self.tables.children(child_schema, id).count();
            if children > 0 {
                return Err(StoreError::HasChildren {
                    schema,
                    id,
                    children,
                });
            }
        }

        if let Some(table) = self.tables.rows.get_mut(&schema) {
            table.remove(&id);
        }
        tracing::trace!(%schema, %id, "deleted row");
        Ok(())
    }

    fn begin(&mut self) -> Result<()> {
        if self.checkpoint.is_some() {
            return Err(StoreError::TransactionActive);
        }
        self.checkpoint = Some(self.tables.clone());
        Ok(())
    }

    fn commit(&mut self) -> Result<()> {
        self.checkpoint
            .take()
            .map(|_| ())
            .ok_or(StoreError::NoTransaction)
    }

    fn rollback(&mut self) -> Result<()> {
        let checkpoint = self.checkpoint.take().ok_or(StoreError::NoTransaction)?;
        self.tables = checkpoint;
        tracing::debug!("rolled back row store transaction");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(store: &mut MemoryRowStore) -> RowId {
        let mut row = TableRow::new(SchemaId::Report);
        store.insert(&mut row).unwrap()
    }

    #[test]
    fn ids_are_assigned_from_one() {
        let mut store = MemoryRowStore::new();
        assert_eq!(report(&mut store), RowId::new(1));
        assert_eq!(report(&mut store), RowId::new(2));
    }

    #[test]
    fn insert_rejects_orphans() {
        let mut store = MemoryRowStore::new();
        let mut si = TableRow::child_of(SchemaId::SummarizedInfo, RowId::new(42));
        assert!(matches!(
            store.insert(&mut si),
            Err(StoreError::OrphanRow { .. })
        ));

        let mut detached = TableRow::new(SchemaId::CaseReport);
        assert!(matches!(
            store.insert(&mut detached),
            Err(StoreError::OrphanRow { .. })
        ));
    }

    #[test]
    fn insert_rejects_parent_in_wrong_table() {
        let mut store = MemoryRowStore::new();
        let report_id = report(&mut store);
        let mut case = TableRow::child_of(SchemaId::CaseReport, report_id);
        assert!(store.insert(&mut case).is_err());
    }

    #[test]
    fn delete_refuses_rows_with_children() {
        let mut store = MemoryRowStore::new();
        let report_id = report(&mut store);
        let mut si = TableRow::child_of(SchemaId::SummarizedInfo, report_id);
        store.insert(&mut si).unwrap();

        let report_row = store.get(SchemaId::Report, report_id).unwrap().unwrap();
        assert!(matches!(
            store.delete(&report_row),
            Err(StoreError::HasChildren { children: 1, .. })
        ));

        store.delete(&si).unwrap();
        store.delete(&report_row).unwrap();
        assert!(store.is_empty());
    }

    #[test]
    fn rollback_restores_previous_state() {
        let mut store = MemoryRowStore::new();
        let report_id = report(&mut store);

        store.begin().unwrap();
        assert!(matches!(store.begin(), Err(StoreError::TransactionActive)));
        let mut si = TableRow::child_of(SchemaId::SummarizedInfo, report_id);
        store.insert(&mut si).unwrap();
        assert_eq!(store.len(SchemaId::SummarizedInfo), 1);
        store.rollback().unwrap();

        assert_eq!(store.len(SchemaId::SummarizedInfo), 0);
        assert!(matches!(store.commit(), Err(StoreError::NoTransaction)));
    }

    #[test]
    fn children_sorted_by_id() {
        let mut store = MemoryRowStore::new();
        let report_id = report(&mut store);
        for _ in 0..3 {
            let mut si = TableRow::child_of(SchemaId::SummarizedInfo, report_id);
            store.insert(&mut si).unwrap();
        }

        let desc = store
            .get_by_parent_id(SchemaId::SummarizedInfo, report_id, SortOrder::Desc)
            .unwrap();
        let ids: Vec<u64> = desc.iter().map(|r| r.id().unwrap().get()).collect();
        assert_eq!(ids, vec![4, 3, 2]);
    }
}
