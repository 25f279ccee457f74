//! Shared state of a running application.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use tse_model::{Report, RowId, SchemaId, TableRow};
use tse_store::{
    MemoryRowStore, ReportLock, ReportLocks, RowStore, SortOrder, StoreError, StoreFile,
    compute_file_hash, load_store, save_store, verify_file_hash,
};
use tse_validate::ValidationAggregator;

use crate::error::{AppError, Result};

/// Row store, report locks and validation shared by all services.
///
/// Cloning is cheap; clones share the same store. The store sits behind one
/// mutex, so writes are serialized.
#[derive(Clone)]
pub struct Workspace {
    store: Arc<Mutex<MemoryRowStore>>,
    locks: ReportLocks,
    aggregator: Arc<ValidationAggregator>,
    /// Snapshot file last read or written, with its content hash.
    snapshot_file: Arc<Mutex<Option<(PathBuf, String)>>>,
}

impl Default for Workspace {
    fn default() -> Self {
        Self::from_store(MemoryRowStore::new())
    }
}

impl Workspace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_store(store: MemoryRowStore) -> Self {
        Self {
            store: Arc::new(Mutex::new(store)),
            locks: ReportLocks::new(),
            aggregator: Arc::new(ValidationAggregator::default()),
            snapshot_file: Arc::default(),
        }
    }

    #[must_use]
    pub fn with_aggregator(mut self, aggregator: ValidationAggregator) -> Self {
        self.aggregator = Arc::new(aggregator);
        self
    }

    /// Workspace restored from a snapshot file.
    pub fn open(path: &Path) -> Result<Self> {
        let file = load_store(path)?;
        let workspace = Self::from_snapshot(&file)?;
        workspace.remember_snapshot(path, compute_file_hash(path)?);
        Ok(workspace)
    }

    /// Restore from `path` when it exists, otherwise start empty.
    pub fn open_or_new(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) if path.exists() => Self::open(path),
            _ => Ok(Self::new()),
        }
    }

    pub(crate) fn from_snapshot(file: &StoreFile) -> tse_store::Result<Self> {
        Ok(Self::from_store(MemoryRowStore::from_snapshot(file)?))
    }

    pub fn aggregator(&self) -> &ValidationAggregator {
        &self.aggregator
    }

    pub fn locks(&self) -> &ReportLocks {
        &self.locks
    }

    /// Lock of the report a row belongs to, keyed by report code.
    ///
    /// Reports without a readable sender id are keyed by their row id.
    pub fn lock_for(&self, report: &Report) -> ReportLock {
        match report.report_code() {
            Ok(code) => self.locks.lock_for(&code),
            Err(_) => {
                let key = report
                    .id
                    .map_or_else(|| report.sender_id.clone(), |id| format!("#{id}"));
                self.locks.lock_for(&key)
            }
        }
    }

    /// Run `f` with exclusive access to the store.
    pub fn with_store<T>(&self, f: impl FnOnce(&mut MemoryRowStore) -> Result<T>) -> Result<T> {
        let mut store = self.store.lock().map_err(|_| AppError::WorkspacePoisoned)?;
        f(&mut store)
    }

    /// Store access that locks per call.
    ///
    /// Other services can use the store between two calls, so anything that
    /// waits on the network goes through a handle instead of `with_store`.
    pub fn handle(&self) -> StoreHandle<'_> {
        StoreHandle { store: &self.store }
    }

    pub fn report(&self, id: RowId) -> Result<Report> {
        self.with_store(|store| {
            let row = store
                .get(SchemaId::Report, id)?
                .ok_or(AppError::ReportNotFound(id))?;
            Ok(Report::from_row(&row)?)
        })
    }

    /// Every stored report, by row id.
    pub fn reports(&self) -> Result<Vec<Report>> {
        self.with_store(|store| {
            store
                .get_all(SchemaId::Report)?
                .iter()
                .map(|row| Report::from_row(row).map_err(AppError::from))
                .collect()
        })
    }

    /// Snapshot of committed rows.
    pub fn snapshot(&self) -> Result<StoreFile> {
        self.with_store(|store| Ok(store.to_snapshot()))
    }

    /// Save a snapshot to `path`, returning its content hash.
    ///
    /// Overwriting the file this workspace was opened from or last saved to
    /// fails with [`StoreError::SnapshotChanged`] when something else wrote
    /// it in between.
    pub fn save(&self, path: &Path) -> Result<String> {
        if let Some(expected) = self.known_hash(path)
            && path.exists()
        {
            verify_file_hash(path, &expected)?;
        }
        let mut file = self.snapshot()?;
        let hash = save_store(&mut file, path)?;
        self.remember_snapshot(path, hash.clone());
        Ok(hash)
    }

    fn snapshot_file(&self) -> MutexGuard<'_, Option<(PathBuf, String)>> {
        self.snapshot_file
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn known_hash(&self, path: &Path) -> Option<String> {
        self.snapshot_file()
            .as_ref()
            .filter(|(known, _)| known == path)
            .map(|(_, hash)| hash.clone())
    }

    fn remember_snapshot(&self, path: &Path, hash: String) {
        *self.snapshot_file() = Some((path.to_path_buf(), hash));
    }
}

/// [`RowStore`] over a workspace that takes the store mutex for each call.
///
/// Writers of other reports may interleave between calls. Transactions
/// need `Workspace::with_store`.
pub struct StoreHandle<'a> {
    store: &'a Mutex<MemoryRowStore>,
}

impl StoreHandle<'_> {
    fn lock(&self) -> tse_store::Result<MutexGuard<'_, MemoryRowStore>> {
        self.store.lock().map_err(|_| StoreError::Unavailable)
    }
}

impl RowStore for StoreHandle<'_> {
    fn get(&self, schema: SchemaId, id: RowId) -> tse_store::Result<Option<TableRow>> {
        self.lock()?.get(schema, id)
    }

    fn get_all(&self, schema: SchemaId) -> tse_store::Result<Vec<TableRow>> {
        self.lock()?.get_all(schema)
    }

    fn get_by_parent_id(
        &self,
        schema: SchemaId,
        parent_id: RowId,
        order: SortOrder,
    ) -> tse_store::Result<Vec<TableRow>> {
        self.lock()?.get_by_parent_id(schema, parent_id, order)
    }

    fn insert(&mut self, row: &mut TableRow) -> tse_store::Result<RowId> {
        self.lock()?.insert(row)
    }

    fn update(&mut self, row: &TableRow) -> tse_store::Result<()> {
        self.lock()?.update(row)
    }

    fn delete(&mut self, row: &TableRow) -> tse_store::Result<()> {
        self.lock()?.delete(row)
    }

    fn begin(&mut self) -> tse_store::Result<()> {
        self.lock()?.begin()
    }

    fn commit(&mut self) -> tse_store::Result<()> {
        self.lock()?.commit()
    }

    fn rollback(&mut self) -> tse_store::Result<()> {
        self.lock()?.rollback()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn save_and_open_keep_reports() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reports.tse");

        let workspace = Workspace::new();
        let id = workspace
            .with_store(|store| {
                let mut row = Report::new_draft("AT", 2017, 6).to_row();
                Ok(store.insert(&mut row)?)
            })
            .unwrap();
        workspace.save(&path).unwrap();

        let reopened = Workspace::open_or_new(Some(&path)).unwrap();
        assert_eq!(reopened.report(id).unwrap().sender_id, "AT1706.00");
        assert_eq!(reopened.reports().unwrap().len(), 1);
    }

    #[test]
    fn save_refuses_to_overwrite_a_changed_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reports.tse");
        Workspace::new().save(&path).unwrap();

        let opened = Workspace::open(&path).unwrap();
        opened.save(&path).unwrap();

        Workspace::new().save(&path).unwrap();
        let err = opened.save(&path).unwrap_err();
        assert!(matches!(
            err,
            AppError::Store(StoreError::SnapshotChanged { .. })
        ));

        // another path is not checked
        opened.save(&dir.path().join("copy.tse")).unwrap();
    }

    #[test]
    fn handle_does_not_hold_the_store() {
        let workspace = Workspace::new();
        let mut handle = workspace.handle();
        let mut row = Report::new_draft("AT", 2017, 6).to_row();
        let id = handle.insert(&mut row).unwrap();

        assert_eq!(workspace.report(id).unwrap().sender_id, "AT1706.00");
        assert!(handle.get(SchemaId::Report, id).unwrap().is_some());
    }

    #[test]
    fn missing_snapshot_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let workspace = Workspace::open_or_new(Some(&dir.path().join("none.tse"))).unwrap();
        assert!(workspace.reports().unwrap().is_empty());
        assert!(matches!(
            workspace.report(RowId::new(1)),
            Err(AppError::ReportNotFound(_))
        ));
    }

    #[test]
    fn locks_are_shared_between_clones() {
        let workspace = Workspace::new();
        let clone = workspace.clone();
        let report = Report::new_draft("BE", 2010, 11);

        let lock = workspace.lock_for(&report);
        let _held = lock.acquire();
        assert!(clone.lock_for(&report).try_acquire().is_none());
    }
}
