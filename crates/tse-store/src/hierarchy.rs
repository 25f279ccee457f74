//! Walking the report tree through any [`RowStore`].

use tse_model::{Report, RowId, SchemaId, SenderId, TableRow, columns};

use crate::error::{Result, StoreError};
use crate::store::{RowStore, SortOrder};

/// Row counts below one report.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HierarchyCounts {
    pub summarized_info: usize,
    pub cases: usize,
    pub results: usize,
}

/// Direct children of a stored row, ascending by id.
pub fn children_of<S: RowStore + ?Sized>(store: &S, row: &TableRow) -> Result<Vec<TableRow>> {
    match row.schema().child() {
        Some(child) => store.get_by_parent_id(child, row.database_id()?, SortOrder::Asc),
        None => Ok(Vec::new()),
    }
}

/// Parent of a row, `None` for reports.
pub fn parent_of<S: RowStore + ?Sized>(store: &S, row: &TableRow) -> Result<Option<TableRow>> {
    let (Some(schema), Some(parent_id)) = (row.schema().parent(), row.parent_id()) else {
        return Ok(None);
    };
    store
        .get(schema, parent_id)?
        .map(Some)
        .ok_or(StoreError::RowNotFound {
            schema,
            id: parent_id,
        })
}

/// Report row at the root of the tree containing `row`.
pub fn report_of<S: RowStore + ?Sized>(store: &S, row: &TableRow) -> Result<TableRow> {
    let mut current = row.clone();
    while let Some(parent) = parent_of(store, &current)? {
        current = parent;
    }
    Ok(current)
}

/// Stored report whose sender id carries `report_code`.
///
/// Reports with an unparsable sender id are skipped.
pub fn find_report_by_code<S: RowStore + ?Sized>(
    store: &S,
    report_code: &str,
) -> Result<Option<Report>> {
    for row in store.get_all(SchemaId::Report)? {
        let sender = row.get_or_empty(columns::REPORT_SENDER_ID);
        let Ok(parsed) = SenderId::parse(sender) else {
            continue;
        };
        if parsed.report_code() == report_code {
            return Ok(Some(Report::from_row(&row)?));
        }
    }
    Ok(None)
}

/// Every row below `root` grouped by depth (children first, then
/// grandchildren).
fn descendants<S: RowStore + ?Sized>(store: &S, root: &TableRow) -> Result<Vec<Vec<TableRow>>> {
    let mut levels = Vec::new();
    let mut frontier = vec![root.clone()];
    while !frontier.is_empty() {
        let mut next = Vec::new();
        for row in &frontier {
            next.extend(children_of(store, row)?);
        }
        if !next.is_empty() {
            levels.push(next.clone());
        }
        frontier = next;
    }
    Ok(levels)
}

/// Count SI, case and result rows under a report.
pub fn count_hierarchy<S: RowStore + ?Sized>(store: &S, report_id: RowId) -> Result<HierarchyCounts> {
    let root = store
        .get(SchemaId::Report, report_id)?
        .ok_or(StoreError::RowNotFound {
            schema: SchemaId::Report,
            id: report_id,
        })?;

    let mut counts = HierarchyCounts::default();
    for row in descendants(store, &root)?.iter().flatten() {
        match row.schema() {
            SchemaId::SummarizedInfo => counts.summarized_info += 1,
            SchemaId::CaseReport => counts.cases += 1,
            SchemaId::AnalyticalResult => counts.results += 1,
            SchemaId::Report => {}
        }
    }
    Ok(counts)
}

/// Delete a row and everything below it, deepest rows first.
///
/// Returns the number of rows removed.
pub fn delete_cascade<S: RowStore + ?Sized>(store: &mut S, row: &TableRow) -> Result<usize> {
    let levels = descendants(store, row)?;
    let mut removed = 0;
    for level in levels.iter().rev() {
        for child in level {
            store.delete(child)?;
            removed += 1;
        }
    }
    store.delete(row)?;
    tracing::debug!(schema = %row.schema(), removed = removed + 1, "cascade delete");
    Ok(removed + 1)
}
