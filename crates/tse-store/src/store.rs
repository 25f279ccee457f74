//! The row store interface.

use tse_model::{RowId, SchemaId, TableRow};

use crate::error::Result;

/// Ordering of rows returned by [`RowStore::get_by_parent_id`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    /// Ascending by local id (insertion order).
    #[default]
    Asc,
    /// Descending by local id.
    Desc,
}

/// Generic keyed hierarchical row persistence.
///
/// Implementations must keep the hierarchy closed: an insert or update whose
/// parent does not resolve, or a delete of a row that still has children,
/// fails with [`StoreError::OrphanRow`](crate::StoreError::OrphanRow) or
/// [`StoreError::HasChildren`](crate::StoreError::HasChildren).
///
/// The store is single-writer: callers serialize writes to one report.
pub trait RowStore {
    /// Row by local id.
    fn get(&self, schema: SchemaId, id: RowId) -> Result<Option<TableRow>>;

    /// Every row of a table, ascending by id.
    fn get_all(&self, schema: SchemaId) -> Result<Vec<TableRow>>;

    /// Rows of `schema` whose parent is `parent_id`.
    fn get_by_parent_id(
        &self,
        schema: SchemaId,
        parent_id: RowId,
        order: SortOrder,
    ) -> Result<Vec<TableRow>>;

    /// Store a new row, assigning and returning its id.
    fn insert(&mut self, row: &mut TableRow) -> Result<RowId>;

    /// Overwrite a stored row.
    fn update(&mut self, row: &TableRow) -> Result<()>;

    /// Remove a stored row that has no children.
    fn delete(&mut self, row: &TableRow) -> Result<()>;

    /// Open a transaction. Writes until `commit` are undone by `rollback`.
    fn begin(&mut self) -> Result<()>;

    fn commit(&mut self) -> Result<()>;

    fn rollback(&mut self) -> Result<()>;
}
