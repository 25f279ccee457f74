//! Background report services.
//!
//! Every service moves its work onto a blocking thread with
//! `tokio::task::spawn_blocking`, so callers on an async UI loop never wait
//! on the network or the store:
//!
//! ```ignore
//! let outcome = service::run_action(workspace.clone(), coordinator, ReportAction::Send, id).await?;
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use tse_import::{DatasetVersionSet, ImportOutcome, MergePolicy, PayloadSource, ReportImporter};
use tse_model::{Report, ReportAction, RowId, SchemaId, TableRow, columns};
use tse_store::{ReportLock, RowStore, StoreError, children_of, parent_of, report_of};
use tse_submit::{
    ActionOutcome, BusyIndicator, Confirmer, Notice, RemoteDatasetTransport,
    ReportActionCoordinator, ReportStatusMachine,
};
use tse_validate::{
    FlagChange, PredefinedResults, Severity, apply_updates, check_report, default_results,
    is_sendable, result_field_changed,
};

use crate::error::{AppError, Result};
use crate::logging::redact_value;
use crate::workspace::Workspace;

/// Run `work` on the blocking pool.
async fn run_blocking<T, F>(task: &'static str, work: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .unwrap_or_else(|err| {
            tracing::error!(task, error = %err, "background task panicked");
            Err(AppError::TaskFailed(err.to_string()))
        })
}

/// Merge downloaded versions of one report into the workspace, then refresh
/// its children-error flags.
pub async fn import_report<P>(
    workspace: Workspace,
    source: P,
    versions: DatasetVersionSet,
    policy: MergePolicy,
) -> Result<ImportOutcome>
where
    P: PayloadSource + Send + 'static,
{
    run_blocking("import", move || {
        import_report_sync(&workspace, source, &versions, policy)
    })
    .await
}

/// List every remote version of `report_code` and import them.
pub async fn download_report<T>(
    workspace: Workspace,
    transport: Arc<T>,
    report_code: String,
    policy: MergePolicy,
) -> Result<ImportOutcome>
where
    T: RemoteDatasetTransport + 'static,
{
    run_blocking("download", move || {
        let versions: DatasetVersionSet = transport.dataset_versions(&report_code)?.into();
        tracing::info!(report = %report_code, versions = versions.len(), "downloaded version list");
        import_report_sync(&workspace, transport, &versions, policy)
    })
    .await
}

fn import_report_sync<P: PayloadSource>(
    workspace: &Workspace,
    source: P,
    versions: &DatasetVersionSet,
    policy: MergePolicy,
) -> Result<ImportOutcome> {
    let Some(report_code) = versions.report_code()? else {
        return Ok(ImportOutcome::NothingImported);
    };
    let lock = workspace.locks().lock_for(&report_code);
    let _guard = lock.acquire();

    let importer = ReportImporter::new(source).with_policy(policy);
    let Some(fetched) = importer.fetch(versions)? else {
        return Ok(ImportOutcome::NothingImported);
    };

    workspace.with_store(|store| {
        let outcome = importer.merge(fetched, store)?;
        if let Some(summary) = outcome.summary() {
            let changes = workspace
                .aggregator()
                .refresh_report(store, summary.report_id)?;
            log_flagged_cases(&*store, &changes);
        }
        Ok(outcome)
    })
}

/// Recompute every children-error flag of one report.
pub async fn refresh_flags(workspace: Workspace, report_id: RowId) -> Result<Vec<FlagChange>> {
    run_blocking("refresh", move || {
        let report = workspace.report(report_id)?;
        let lock = workspace.lock_for(&report);
        let _guard = lock.acquire();

        workspace.with_store(|store| {
            let changes = workspace.aggregator().refresh_report(store, report_id)?;
            log_flagged_cases(&*store, &changes);
            Ok(changes)
        })
    })
    .await
}

fn log_flagged_cases<S: RowStore + ?Sized>(store: &S, changes: &[FlagChange]) {
    for change in changes {
        if change.schema != SchemaId::CaseReport || !change.children_error {
            continue;
        }
        if let Ok(Some(case)) = store.get(SchemaId::CaseReport, change.id) {
            tracing::trace!(
                case = %change.id,
                animal_id = redact_value(case.get_or_empty(columns::ANIMAL_ID)),
                national_case_id = redact_value(case.get_or_empty(columns::NATIONAL_CASE_ID)),
                "case has results with warnings"
            );
        }
    }
}

/// Stored row by id.
fn stored_row(workspace: &Workspace, schema: SchemaId, id: RowId) -> Result<TableRow> {
    workspace.with_store(|store| {
        Ok(store
            .get(schema, id)?
            .ok_or(StoreError::RowNotFound { schema, id })?)
    })
}

/// Lock of the report `row` belongs to.
fn lock_of(workspace: &Workspace, row: &TableRow) -> Result<ReportLock> {
    let report = workspace.with_store(|store| Ok(Report::from_row(&report_of(&*store, row)?)?))?;
    Ok(workspace.lock_for(&report))
}

fn busy(lock: &ReportLock) -> AppError {
    AppError::ReportBusy(lock.report_code().to_string())
}

/// Report of `row`, refused unless it can still be edited.
fn editable_report<S: RowStore + ?Sized>(store: &S, row: &TableRow) -> Result<Report> {
    let report = Report::from_row(&report_of(store, row)?)?;
    if ReportStatusMachine::is_editable(report.status) {
        Ok(report)
    } else {
        Err(AppError::NotEditable(report.sender_id))
    }
}

fn stored_parent<S: RowStore + ?Sized>(store: &S, row: &TableRow) -> Result<TableRow> {
    Ok(parent_of(store, row)?.ok_or(StoreError::OrphanRow {
        schema: row.schema(),
        parent: row.parent_id(),
    })?)
}

/// Change one field of an analytical result.
///
/// Columns that follow the field are updated with it, then the warning
/// flags of the case and summarized information are recomputed.
pub async fn edit_result(
    workspace: Workspace,
    result_id: RowId,
    field: String,
    value: String,
    lookup: Arc<dyn PredefinedResults + Send + Sync>,
) -> Result<TableRow> {
    run_blocking("edit", move || {
        let lock = lock_of(
            &workspace,
            &stored_row(&workspace, SchemaId::AnalyticalResult, result_id)?,
        )?;
        let Some(_guard) = lock.try_acquire() else {
            return Err(busy(&lock));
        };

        workspace.with_store(|store| {
            let mut result = store.get(SchemaId::AnalyticalResult, result_id)?.ok_or(
                StoreError::RowNotFound {
                    schema: SchemaId::AnalyticalResult,
                    id: result_id,
                },
            )?;
            editable_report(&*store, &result)?;
            let case = stored_parent(&*store, &result)?;
            let summarized_info = stored_parent(&*store, &case)?;

            result.put(field.as_str(), value);
            let updates = result_field_changed(&result, &summarized_info, &field, &*lookup);
            apply_updates(&mut result, &updates);
            store.update(&result)?;
            tracing::debug!(
                result = %result_id,
                field = %field,
                follow_ups = updates.len(),
                "result edited"
            );

            let changes = workspace.aggregator().recompute_ancestors(store, &result)?;
            log_flagged_cases(&*store, &changes);
            Ok(result)
        })
    })
    .await
}

/// Give a case without results its predefined default results.
///
/// Returns the inserted rows; a case that already has results gets none.
pub async fn add_default_results(
    workspace: Workspace,
    case_id: RowId,
    lookup: Arc<dyn PredefinedResults + Send + Sync>,
) -> Result<Vec<TableRow>> {
    run_blocking("default results", move || {
        let lock = lock_of(
            &workspace,
            &stored_row(&workspace, SchemaId::CaseReport, case_id)?,
        )?;
        let Some(_guard) = lock.try_acquire() else {
            return Err(busy(&lock));
        };

        workspace.with_store(|store| {
            let case = store
                .get(SchemaId::CaseReport, case_id)?
                .ok_or(StoreError::RowNotFound {
                    schema: SchemaId::CaseReport,
                    id: case_id,
                })?;
            editable_report(&*store, &case)?;
            if !children_of(&*store, &case)?.is_empty() {
                return Ok(Vec::new());
            }
            let summarized_info = stored_parent(&*store, &case)?;

            let mut rows = default_results(&summarized_info, &case, &*lookup);
            for row in &mut rows {
                store.insert(row)?;
            }
            if let Some(first) = rows.first() {
                let changes = workspace.aggregator().recompute_ancestors(store, first)?;
                log_flagged_cases(&*store, &changes);
            }
            tracing::info!(case = %case_id, results = rows.len(), "default results added");
            Ok(rows)
        })
    })
    .await
}

/// Run a report action through the coordinator.
///
/// A send is refused before any network call when the report still has
/// errors. The store is only held for reads and writes, never while the
/// remote service is called.
pub async fn run_action<T, C, B>(
    workspace: Workspace,
    coordinator: Arc<ReportActionCoordinator<T, C, B>>,
    action: ReportAction,
    report_id: RowId,
) -> Result<ActionOutcome>
where
    T: RemoteDatasetTransport + 'static,
    C: Confirmer + 'static,
    B: BusyIndicator + 'static,
{
    run_blocking("action", move || {
        let lock = workspace.lock_for(&workspace.report(report_id)?);
        let Some(_guard) = lock.try_acquire() else {
            return Err(busy(&lock));
        };
        // read again: the report may have changed before the lock was taken
        let mut report = workspace.report(report_id)?;

        if action == ReportAction::Send {
            let issues = workspace.with_store(|store| {
                Ok(check_report(&*store, workspace.aggregator().registry(), report_id)?)
            })?;
            if !is_sendable(&issues) {
                let errors = issues
                    .iter()
                    .filter(|issue| issue.severity == Severity::Error)
                    .count();
                return Ok(ActionOutcome::Blocked(Notice::error(
                    "Send report",
                    format!("The report has {errors} error(s). Fix them before sending."),
                )));
            }
        }
        Ok(coordinator.run(&mut workspace.handle(), action, &mut report))
    })
    .await
}

/// Send and delete a test report.
pub async fn test_connection<T, C, B>(
    workspace: Workspace,
    coordinator: Arc<ReportActionCoordinator<T, C, B>>,
) -> Result<Notice>
where
    T: RemoteDatasetTransport + 'static,
    C: Confirmer + 'static,
    B: BusyIndicator + 'static,
{
    run_blocking("connection test", move || {
        Ok(coordinator
            .connection_tester()
            .test_connection(&mut workspace.handle()))
    })
    .await
}

/// Save a workspace snapshot off the calling thread.
pub async fn save_workspace(workspace: &Workspace, path: PathBuf) -> Result<String> {
    let workspace = workspace.clone();
    run_blocking("save", move || workspace.save(&path)).await
}

/// Open a workspace snapshot off the calling thread.
pub async fn open_workspace(path: PathBuf) -> Result<Workspace> {
    run_blocking("open", move || Workspace::open(&path)).await
}
