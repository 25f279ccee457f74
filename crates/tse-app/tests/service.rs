//! Background services against an in-memory remote service.

use std::sync::mpsc::{self, Receiver, SyncSender};
use std::sync::{Arc, Mutex};

use tse_app::service::{
    add_default_results, download_report, edit_result, import_report, open_workspace,
    refresh_flags, run_action, save_workspace, test_connection,
};
use tse_app::{AppError, Settings, Workspace};
use tse_import::{
    DatasetVersionSet, ImportOutcome, MemoryPayloadSource, MergePolicy, PayloadSource,
};
use tse_model::{
    DatasetStatus, DatasetVersion, OperationType, Report, ReportAction, RowId, SchemaId, TableRow,
    TransportError, columns,
};
use tse_store::{RowStore, count_hierarchy};
use tse_submit::{
    ActionOutcome, BusyState, ConfirmationRequest, RemoteDatasetTransport,
    ReportActionCoordinator, SendOutcome,
};
use tse_validate::{PredefinedResultTable, PredefinedResults};

const AT1706_00: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<message>
  <header><messageId>70001</messageId></header>
  <payload>
    <dataset>
      <result>
        <resId>0404_000069.0</resId>
        <type>BSE</type>
        <totSamplesTested>4</totSamplesTested>
        <totSamplesPositive>0</totSamplesPositive>
        <totSamplesInconclusive>0</totSamplesInconclusive>
      </result>
      <result>
        <resId>0404_000069.1</resId>
        <sampId>AT-S-1</sampId>
        <animalId>AT-A-1</animalId>
        <nationalCaseId>AT-N-1</nationalCaseId>
        <testAim>G_RES</testAim>
        <anMethType>AT06A</anMethType>
        <anMethCode>AM010A</anMethCode>
        <resVal>NEG</resVal>
      </result>
      <result>
        <resId>0404_000069.2</resId>
        <sampId>AT-S-2</sampId>
        <animalId>AT-A-2</animalId>
        <nationalCaseId>AT-N-2</nationalCaseId>
        <testAim>G_RES</testAim>
        <anMethType>AT06A</anMethType>
        <anMethCode>AM010A</anMethCode>
        <paramCodeBaseTerm>RF-00003328-PAR</paramCodeBaseTerm>
        <resVal>NEG</resVal>
      </result>
    </dataset>
  </payload>
</message>"#;

#[derive(Default)]
struct FakeService {
    payloads: MemoryPayloadSource,
    versions: Vec<DatasetVersion>,
    sent: Mutex<Vec<OperationType>>,
    /// Workspace read while a report is being sent.
    observed: Option<Workspace>,
    reports_seen: Mutex<Vec<usize>>,
}

impl FakeService {
    fn with_version(status: DatasetStatus) -> Self {
        Self {
            payloads: MemoryPayloadSource::new().with_payload("7001", AT1706_00),
            versions: vec![DatasetVersion::new("7001", "AT1706.00", status)],
            ..Default::default()
        }
    }

    fn sent(&self) -> Vec<OperationType> {
        self.sent.lock().unwrap().clone()
    }
}

impl PayloadSource for FakeService {
    fn fetch_dataset_payload(&self, dataset_id: &str) -> Result<String, TransportError> {
        self.payloads.fetch_dataset_payload(dataset_id)
    }
}

impl RemoteDatasetTransport for FakeService {
    fn send_report(
        &self,
        _report: &Report,
        operation: OperationType,
    ) -> Result<SendOutcome, TransportError> {
        self.sent.lock().unwrap().push(operation);
        if let Some(workspace) = &self.observed {
            let reports = workspace.reports().unwrap().len();
            self.reports_seen.lock().unwrap().push(reports);
        }
        Ok(SendOutcome::new("70002"))
    }

    fn dataset_versions(&self, _report_code: &str) -> Result<Vec<DatasetVersion>, TransportError> {
        Ok(self.versions.clone())
    }
}

fn yes(_: &ConfirmationRequest) -> bool {
    true
}

type Coordinator = ReportActionCoordinator<Arc<FakeService>, fn(&ConfirmationRequest) -> bool>;

fn coordinator(service: &Arc<FakeService>) -> Arc<Coordinator> {
    let mut settings = Settings::default();
    settings.connection.username = "avet".into();
    settings.connection.org_code = "AT".into();
    settings.connection.test_report_code = "AT0000".into();
    Arc::new(ReportActionCoordinator::new(
        Arc::clone(service),
        yes as fn(&ConfirmationRequest) -> bool,
        BusyState::new(),
        settings.session(),
    ))
}

async fn downloaded(workspace: &Workspace, service: &Arc<FakeService>) -> RowId {
    let outcome = download_report(
        workspace.clone(),
        Arc::clone(service),
        "AT1706".to_string(),
        MergePolicy::default(),
    )
    .await
    .unwrap();
    outcome.summary().unwrap().report_id
}

/// Payload source that holds the first download until released.
struct GatedSource {
    inner: MemoryPayloadSource,
    started: SyncSender<()>,
    release: Mutex<Receiver<()>>,
}

impl GatedSource {
    fn new(inner: MemoryPayloadSource) -> (Self, Receiver<()>, SyncSender<()>) {
        let (started, started_rx) = mpsc::sync_channel(1);
        let (release_tx, release) = mpsc::sync_channel(1);
        let source = Self {
            inner,
            started,
            release: Mutex::new(release),
        };
        (source, started_rx, release_tx)
    }
}

impl PayloadSource for GatedSource {
    fn fetch_dataset_payload(&self, dataset_id: &str) -> Result<String, TransportError> {
        let _ = self.started.try_send(());
        let _ = self.release.lock().unwrap().recv();
        self.inner.fetch_dataset_payload(dataset_id)
    }
}

fn lookup() -> Arc<dyn PredefinedResults + Send + Sync> {
    Arc::new(
        PredefinedResultTable::new()
            .with_genotyping("BSE", "RF-00003328-PAR")
            .with_param("BSE_SCR", "RF-00003328-PAR", "NEG")
            .with_default_result(
                "BSE",
                &[
                    (columns::TEST_AIM, "BSE_SCR"),
                    (columns::AN_METH_TYPE, "AT06A"),
                    (columns::AN_METH_CODE, "AM001A"),
                ],
            ),
    )
}

fn incomplete_result(workspace: &Workspace) -> TableRow {
    workspace
        .with_store(|store| {
            Ok(store
                .get_all(SchemaId::AnalyticalResult)?
                .into_iter()
                .find(|result| !result.is_filled(columns::PARAM_CODE_BASE_TERM))
                .unwrap())
        })
        .unwrap()
}

#[tokio::test]
async fn import_refreshes_children_error_flags() {
    let workspace = Workspace::new();
    let versions = DatasetVersionSet::from(vec![DatasetVersion::new(
        "7001",
        "AT1706.00",
        DatasetStatus::Valid,
    )]);
    let source = MemoryPayloadSource::new().with_payload("7001", AT1706_00);

    let outcome = import_report(workspace.clone(), source, versions, MergePolicy::default())
        .await
        .unwrap();
    let report_id = outcome.summary().unwrap().report_id;

    workspace
        .with_store(|store| {
            let counts = count_hierarchy(&*store, report_id)?;
            assert_eq!((counts.summarized_info, counts.cases, counts.results), (1, 2, 2));

            let flagged: Vec<String> = store
                .get_all(SchemaId::CaseReport)?
                .into_iter()
                .filter(|case| case.children_error())
                .map(|case| case.get_or_empty(columns::SAMPLE_ID).to_string())
                .collect();
            assert_eq!(flagged, vec!["AT-S-1".to_string()]);
            assert!(store.get_all(SchemaId::SummarizedInfo)?[0].children_error());
            Ok(())
        })
        .unwrap();

    // flags are already current
    assert!(refresh_flags(workspace, report_id).await.unwrap().is_empty());
}

#[tokio::test]
async fn empty_version_set_imports_nothing() {
    let workspace = Workspace::new();
    let outcome = import_report(
        workspace.clone(),
        MemoryPayloadSource::new(),
        DatasetVersionSet::new(),
        MergePolicy::default(),
    )
    .await
    .unwrap();

    assert_eq!(outcome, ImportOutcome::NothingImported);
    assert!(workspace.reports().unwrap().is_empty());
}

#[tokio::test]
async fn downloaded_report_can_be_resent() {
    let service = Arc::new(FakeService::with_version(DatasetStatus::Valid));
    let workspace = Workspace::new();
    let report_id = downloaded(&workspace, &service).await;
    assert_eq!(workspace.report(report_id).unwrap().status, DatasetStatus::Valid);

    let outcome = run_action(
        workspace.clone(),
        coordinator(&service),
        ReportAction::Send,
        report_id,
    )
    .await
    .unwrap();

    assert!(outcome.is_completed(), "{outcome:?}");
    assert_eq!(service.sent(), vec![OperationType::Replace]);
    let report = workspace.report(report_id).unwrap();
    assert_eq!(report.status, DatasetStatus::Processing);
    assert_eq!(report.message_id, "70002");
}

#[tokio::test]
async fn report_with_errors_is_not_sent() {
    let service = Arc::new(FakeService::with_version(DatasetStatus::Valid));
    let workspace = Workspace::new();
    let report_id = downloaded(&workspace, &service).await;

    workspace
        .with_store(|store| {
            let mut si = store.get_all(SchemaId::SummarizedInfo)?.remove(0);
            si.put(columns::SUMMARIZED_INFO_INC_SAMPLES, "5");
            store.update(&si)?;
            Ok(())
        })
        .unwrap();

    let outcome = run_action(
        workspace.clone(),
        coordinator(&service),
        ReportAction::Send,
        report_id,
    )
    .await
    .unwrap();

    assert!(matches!(outcome, ActionOutcome::Blocked(_)));
    assert!(service.sent().is_empty());
    assert_eq!(workspace.report(report_id).unwrap().status, DatasetStatus::Valid);
}

#[tokio::test]
async fn busy_report_is_refused() {
    let service = Arc::new(FakeService::with_version(DatasetStatus::Valid));
    let workspace = Workspace::new();
    let report_id = downloaded(&workspace, &service).await;

    let report = workspace.report(report_id).unwrap();
    let lock = workspace.lock_for(&report);
    let _held = lock.acquire();

    let err = run_action(
        workspace.clone(),
        coordinator(&service),
        ReportAction::Submit,
        report_id,
    )
    .await
    .unwrap_err();

    assert!(matches!(err, AppError::ReportBusy(ref code) if code == "AT1706"));
    assert!(err.is_retryable());
}

#[tokio::test]
async fn connection_test_leaves_no_report_behind() {
    let service = Arc::new(FakeService::default());
    let workspace = Workspace::new();

    let notice = test_connection(workspace.clone(), coordinator(&service))
        .await
        .unwrap();

    assert!(!notice.is_fatal(), "{notice}");
    assert_eq!(service.sent(), vec![OperationType::Test]);
    assert!(workspace.reports().unwrap().is_empty());
}

#[tokio::test]
async fn workspace_snapshot_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("workspace.tse");
    let service = Arc::new(FakeService::with_version(DatasetStatus::ValidWithWarnings));
    let workspace = Workspace::new();
    let report_id = downloaded(&workspace, &service).await;

    let hash = save_workspace(&workspace, path.clone()).await.unwrap();
    assert_eq!(hash.len(), 64);

    let reopened = open_workspace(path).await.unwrap();
    let report = reopened.report(report_id).unwrap();
    assert_eq!(report.sender_id, "AT1706.00");
    assert_eq!(report.status, DatasetStatus::ValidWithWarnings);
    assert_eq!(reopened.reports().unwrap().len(), 1);
}

#[tokio::test]
async fn action_on_a_report_being_imported_is_refused_then_sees_the_import() {
    let service = Arc::new(FakeService::with_version(DatasetStatus::Valid));
    let workspace = Workspace::new();
    let report_id = downloaded(&workspace, &service).await;

    let (source, started, release) =
        GatedSource::new(MemoryPayloadSource::new().with_payload("7001", AT1706_00));
    let versions = DatasetVersionSet::from(vec![DatasetVersion::new(
        "7001",
        "AT1706.00",
        DatasetStatus::AcceptedDwh,
    )]);
    let import = tokio::spawn(import_report(
        workspace.clone(),
        source,
        versions,
        MergePolicy::default(),
    ));
    tokio::task::spawn_blocking(move || started.recv())
        .await
        .unwrap()
        .unwrap();

    // the download runs outside the store
    assert_eq!(workspace.reports().unwrap().len(), 1);
    let err = run_action(
        workspace.clone(),
        coordinator(&service),
        ReportAction::Submit,
        report_id,
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::ReportBusy(_)));

    release.send(()).unwrap();
    import.await.unwrap().unwrap();

    let outcome = run_action(
        workspace.clone(),
        coordinator(&service),
        ReportAction::Submit,
        report_id,
    )
    .await
    .unwrap();
    assert!(matches!(outcome, ActionOutcome::Blocked(_)), "{outcome:?}");
    assert!(service.sent().is_empty());
    assert_eq!(
        workspace.report(report_id).unwrap().status,
        DatasetStatus::AcceptedDwh
    );
}

#[tokio::test]
async fn store_stays_usable_while_a_report_is_sent() {
    let workspace = Workspace::new();
    let service = Arc::new(FakeService {
        observed: Some(workspace.clone()),
        ..FakeService::with_version(DatasetStatus::Valid)
    });
    let report_id = downloaded(&workspace, &service).await;

    let outcome = run_action(
        workspace.clone(),
        coordinator(&service),
        ReportAction::Send,
        report_id,
    )
    .await
    .unwrap();

    assert!(outcome.is_completed(), "{outcome:?}");
    assert_eq!(*service.reports_seen.lock().unwrap(), vec![1]);
}

#[tokio::test]
async fn edited_result_follows_rules_and_clears_flags() {
    let service = Arc::new(FakeService::with_version(DatasetStatus::Valid));
    let workspace = Workspace::new();
    downloaded(&workspace, &service).await;
    let result = incomplete_result(&workspace);

    let edited = edit_result(
        workspace.clone(),
        result.id().unwrap(),
        columns::AN_METH_CODE.to_string(),
        "AM010A".to_string(),
        lookup(),
    )
    .await
    .unwrap();

    assert_eq!(edited.get(columns::PARAM_CODE_BASE_TERM), Some("RF-00003328-PAR"));
    workspace
        .with_store(|store| {
            assert_eq!(store.get(SchemaId::AnalyticalResult, result.id().unwrap())?, Some(edited));
            assert!(store
                .get_all(SchemaId::CaseReport)?
                .iter()
                .all(|case| !case.children_error()));
            assert!(!store.get_all(SchemaId::SummarizedInfo)?[0].children_error());
            Ok(())
        })
        .unwrap();
}

#[tokio::test]
async fn accepted_report_cannot_be_edited() {
    let service = Arc::new(FakeService::with_version(DatasetStatus::AcceptedDwh));
    let workspace = Workspace::new();
    downloaded(&workspace, &service).await;
    let result = incomplete_result(&workspace);

    let err = edit_result(
        workspace.clone(),
        result.id().unwrap(),
        columns::AN_METH_CODE.to_string(),
        "AM010A".to_string(),
        lookup(),
    )
    .await
    .unwrap_err();

    assert!(matches!(err, AppError::NotEditable(ref id) if id == "AT1706.00"));
    assert_eq!(incomplete_result(&workspace), result);
}

#[tokio::test]
async fn new_case_gets_default_results_once() {
    let service = Arc::new(FakeService::with_version(DatasetStatus::Valid));
    let workspace = Workspace::new();
    downloaded(&workspace, &service).await;
    let case_id = workspace
        .with_store(|store| {
            let si = store.get_all(SchemaId::SummarizedInfo)?.remove(0);
            let mut case = TableRow::child_of(SchemaId::CaseReport, si.id().unwrap());
            case.put(columns::SAMPLE_ID, "AT-S-3");
            Ok(store.insert(&mut case)?)
        })
        .unwrap();

    let added = add_default_results(workspace.clone(), case_id, lookup())
        .await
        .unwrap();

    assert_eq!(added.len(), 1);
    assert_eq!(added[0].parent_id(), Some(case_id));
    assert_eq!(added[0].get(columns::SAMPLE_ID), Some("AT-S-3"));
    assert_eq!(added[0].get(columns::RESULT_VALUE), Some("NEG"));
    workspace
        .with_store(|store| {
            let stored = store.get(SchemaId::AnalyticalResult, added[0].id().unwrap())?;
            assert_eq!(stored.as_ref(), Some(&added[0]));
            Ok(())
        })
        .unwrap();

    let again = add_default_results(workspace.clone(), case_id, lookup())
        .await
        .unwrap();
    assert!(again.is_empty());
}
