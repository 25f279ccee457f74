//! Integration tests for merge import against recorded payloads.

use std::path::PathBuf;

use proptest::prelude::*;
use tse_import::{
    DatasetVersionSet, DirectoryPayloadSource, ImportError, ImportOutcome, MemoryPayloadSource,
    ReportImporter,
};
use tse_model::{DatasetStatus, DatasetVersion, Report, RowId, SchemaId, TableRow, columns};
use tse_store::{
    MemoryRowStore, RowStore, SortOrder, StoreError, count_hierarchy, find_report_by_code,
};

fn fixtures() -> DirectoryPayloadSource {
    DirectoryPayloadSource::new(PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures"))
}

fn version(sender_id: &str, status: DatasetStatus) -> DatasetVersion {
    DatasetVersion::new(sender_id.replace('.', "_"), sender_id, status)
}

fn import(store: &mut MemoryRowStore, versions: Vec<DatasetVersion>) -> tse_import::Result<ImportOutcome> {
    ReportImporter::new(fixtures()).import(&DatasetVersionSet::from(versions), store)
}

fn imported_report(store: &MemoryRowStore, code: &str) -> Report {
    find_report_by_code(store, code)
        .expect("lookup")
        .expect("report exists")
}

#[test]
fn single_version_builds_full_hierarchy() {
    let mut store = MemoryRowStore::new();
    import(&mut store, vec![version("AT1706.00", DatasetStatus::AcceptedDwh)]).unwrap();

    assert_eq!(store.len(SchemaId::Report), 1);
    assert_eq!(store.len(SchemaId::SummarizedInfo), 3);
    assert_eq!(store.len(SchemaId::CaseReport), 3);
    assert_eq!(store.len(SchemaId::AnalyticalResult), 5);

    let report = imported_report(&store, "AT1706");
    let counts = count_hierarchy(&store, report.id.unwrap()).unwrap();
    assert_eq!(counts.summarized_info, 3);
    assert_eq!(counts.cases, 3);
    assert_eq!(counts.results, 5);

    assert_eq!(report.year, "2017");
    assert_eq!(report.month, "06");
    assert_eq!(report.country, "AT");
    assert_eq!(report.message_id, "70001");
    assert_eq!(report.status, DatasetStatus::AcceptedDwh);
}

#[test]
fn summarized_info_program_comes_from_res_id() {
    let mut store = MemoryRowStore::new();
    import(&mut store, vec![version("AT1706.00", DatasetStatus::AcceptedDwh)]).unwrap();

    let si = store
        .get_all(SchemaId::SummarizedInfo)
        .unwrap()
        .into_iter()
        .find(|row| row.get(columns::RES_ID) == Some("0404_000069.0"))
        .expect("summarized information imported");
    assert_eq!(si.get(columns::PROG_ID), Some("0404_000069"));

    let cases = store
        .get_by_parent_id(SchemaId::CaseReport, si.id().unwrap(), SortOrder::Asc)
        .unwrap();
    assert_eq!(cases.len(), 1);
    assert_eq!(cases[0].get(columns::ANIMAL_ID), Some("AT-A-001"));
}

#[test]
fn two_versions_merge_into_one_report() {
    let mut store = MemoryRowStore::new();
    let outcome = import(
        &mut store,
        vec![
            version("BE1011.01", DatasetStatus::ValidWithWarnings),
            version("BE1011.00", DatasetStatus::AcceptedDwh),
        ],
    )
    .unwrap();

    assert_eq!(store.len(SchemaId::Report), 1);
    assert_eq!(store.len(SchemaId::SummarizedInfo), 6);
    assert_eq!(store.len(SchemaId::AnalyticalResult), 17);

    let summary = outcome.summary().unwrap();
    assert_eq!(summary.status, DatasetStatus::ValidWithWarnings);
    assert_eq!(summary.versions, 2);
    assert_eq!(summary.removed, 0);

    let report = imported_report(&store, "BE1011");
    assert_eq!(report.sender_id, "BE1011.01");
    assert_eq!(report.version, 1);

    let repeated = store
        .get_all(SchemaId::AnalyticalResult)
        .unwrap()
        .into_iter()
        .find(|row| row.get(columns::RES_ID) == Some("1010_000001.1"))
        .unwrap();
    assert_eq!(repeated.get(columns::RESULT_VALUE), Some("POS"));
}

#[test]
fn deleted_version_prunes_missing_rows() {
    let mut store = MemoryRowStore::new();
    import(&mut store, vec![version("IT1712.00", DatasetStatus::AcceptedDwh)]).unwrap();
    let before = store.len(SchemaId::AnalyticalResult);

    let outcome = import(
        &mut store,
        vec![
            version("IT1712.00", DatasetStatus::AcceptedDwh),
            version("IT1712.01", DatasetStatus::Deleted),
        ],
    )
    .unwrap();

    assert_eq!(store.len(SchemaId::AnalyticalResult), before + 1);
    let samples: Vec<String> = store
        .get_all(SchemaId::CaseReport)
        .unwrap()
        .iter()
        .map(|row| row.get_or_empty(columns::SAMPLE_ID).to_string())
        .collect();
    assert!(!samples.contains(&"IT-S-3".to_string()));
    assert_eq!(samples.len(), 3);
    // one result and its case
    assert_eq!(outcome.summary().unwrap().removed, 2);
}

#[test]
fn empty_set_leaves_store_untouched() {
    let mut store = MemoryRowStore::new();
    import(&mut store, vec![version("AT1706.00", DatasetStatus::AcceptedDwh)]).unwrap();
    let before = store.get_all(SchemaId::AnalyticalResult).unwrap();

    let outcome = import(&mut store, Vec::new()).unwrap();

    assert_eq!(outcome, ImportOutcome::NothingImported);
    assert_eq!(store.get_all(SchemaId::AnalyticalResult).unwrap(), before);
    assert!(!store.in_transaction());
}

#[test]
fn duplicate_ordinal_aborts_before_writing() {
    let mut store = MemoryRowStore::new();
    let err = import(
        &mut store,
        vec![
            version("BE1011.00", DatasetStatus::AcceptedDwh),
            DatasetVersion::new("BE1011_01", "BE1011.0", DatasetStatus::Valid),
        ],
    )
    .unwrap_err();

    assert!(matches!(err, ImportError::DuplicateOrdinal { ordinal: 0, .. }));
    assert!(store.is_empty());
}

#[test]
fn orphan_result_is_fatal() {
    let mut store = MemoryRowStore::new();
    let err = import(&mut store, vec![version("FR1803.00", DatasetStatus::Valid)]).unwrap_err();

    assert!(matches!(
        err,
        ImportError::OrphanRecord { ref prog_id, .. } if prog_id == "3030_000009"
    ));
    assert!(store.is_empty());
}

#[test]
fn missing_payload_keeps_previous_import() {
    let mut store = MemoryRowStore::new();
    import(&mut store, vec![version("BE1011.00", DatasetStatus::AcceptedDwh)]).unwrap();

    let err = import(
        &mut store,
        vec![
            version("BE1011.00", DatasetStatus::AcceptedDwh),
            DatasetVersion::new("no-such-dataset", "BE1011.01", DatasetStatus::Valid),
        ],
    )
    .unwrap_err();

    assert!(matches!(err, ImportError::Transport { .. }));
    assert!(err.is_retryable());
    assert_eq!(store.len(SchemaId::AnalyticalResult), 9);
    assert_eq!(
        imported_report(&store, "BE1011").status,
        DatasetStatus::AcceptedDwh
    );
}

/// Store that fails once a number of inserts have succeeded.
struct FailingStore {
    inner: MemoryRowStore,
    inserts_left: usize,
}

impl RowStore for FailingStore {
    fn get(&self, schema: SchemaId, id: RowId) -> tse_store::Result<Option<TableRow>> {
        self.inner.get(schema, id)
    }

    fn get_all(&self, schema: SchemaId) -> tse_store::Result<Vec<TableRow>> {
        self.inner.get_all(schema)
    }

    fn get_by_parent_id(
        &self,
        schema: SchemaId,
        parent_id: RowId,
        order: SortOrder,
    ) -> tse_store::Result<Vec<TableRow>> {
        self.inner.get_by_parent_id(schema, parent_id, order)
    }

    fn insert(&mut self, row: &mut TableRow) -> tse_store::Result<RowId> {
        if self.inserts_left == 0 {
            return Err(StoreError::Io {
                operation: "write",
                path: PathBuf::from("reports.tse"),
                source: std::io::Error::other("disk full"),
            });
        }
        self.inserts_left -= 1;
        self.inner.insert(row)
    }

    fn update(&mut self, row: &TableRow) -> tse_store::Result<()> {
        self.inner.update(row)
    }

    fn delete(&mut self, row: &TableRow) -> tse_store::Result<()> {
        self.inner.delete(row)
    }

    fn begin(&mut self) -> tse_store::Result<()> {
        self.inner.begin()
    }

    fn commit(&mut self) -> tse_store::Result<()> {
        self.inner.commit()
    }

    fn rollback(&mut self) -> tse_store::Result<()> {
        self.inner.rollback()
    }
}

#[test]
fn store_failure_rolls_back_every_write() {
    let mut inner = MemoryRowStore::new();
    import(&mut inner, vec![version("BE1011.00", DatasetStatus::AcceptedDwh)]).unwrap();
    let results_before = inner.get_all(SchemaId::AnalyticalResult).unwrap();
    let si_before = inner.get_all(SchemaId::SummarizedInfo).unwrap();

    let mut store = FailingStore {
        inner,
        inserts_left: 4,
    };
    let set = DatasetVersionSet::from(vec![
        version("BE1011.00", DatasetStatus::AcceptedDwh),
        version("BE1011.01", DatasetStatus::Valid),
    ]);
    let err = ReportImporter::new(fixtures())
        .import(&set, &mut store)
        .unwrap_err();

    assert!(matches!(err, ImportError::Store(StoreError::Io { .. })));
    assert!(!store.inner.in_transaction());
    assert_eq!(store.inner.get_all(SchemaId::AnalyticalResult).unwrap(), results_before);
    assert_eq!(store.inner.get_all(SchemaId::SummarizedInfo).unwrap(), si_before);
    assert_eq!(
        imported_report(&store.inner, "BE1011").status,
        DatasetStatus::AcceptedDwh
    );
}

const BE1011_02: &str = "<message><header><messageId>80003</messageId></header><payload><dataset>\
    <result><resId>1010_000004.1</resId><sampId>BE-S-06</sampId><resVal>INC</resVal></result>\
    <result><resId>1010_000007.0</resId><type>CWD</type></result>\
    </dataset></payload></message>";

/// Business view of every row, independent of local ids.
fn canonical(store: &MemoryRowStore) -> Vec<String> {
    let mut rows: Vec<String> = Vec::new();
    for schema in SchemaId::ALL {
        for row in store.get_all(schema).unwrap() {
            let parent_key = row
                .parent_id()
                .and_then(|id| store.get(schema.parent().unwrap(), id).unwrap())
                .map(|parent| format!("{:?}", parent.values()))
                .unwrap_or_default();
            rows.push(format!("{schema}|{parent_key}|{:?}", row.values()));
        }
    }
    rows.sort();
    rows
}

proptest! {
    #[test]
    fn input_order_does_not_change_result(order in Just(vec![0usize, 1, 2]).prop_shuffle()) {
        let source = MemoryPayloadSource::new()
            .with_payload("BE1011_00", include_str!("fixtures/BE1011_00.xml"))
            .with_payload("BE1011_01", include_str!("fixtures/BE1011_01.xml"))
            .with_payload("BE1011_02", BE1011_02);
        let versions = [
            version("BE1011.00", DatasetStatus::AcceptedDwh),
            version("BE1011.01", DatasetStatus::ValidWithWarnings),
            version("BE1011.02", DatasetStatus::Valid),
        ];
        let importer = ReportImporter::new(source);

        let mut sorted_store = MemoryRowStore::new();
        importer
            .import(&DatasetVersionSet::from(versions.to_vec()), &mut sorted_store)
            .unwrap();

        let shuffled: DatasetVersionSet = order.iter().map(|i| versions[*i].clone()).collect();
        let mut shuffled_store = MemoryRowStore::new();
        importer.import(&shuffled, &mut shuffled_store).unwrap();

        prop_assert_eq!(canonical(&sorted_store), canonical(&shuffled_store));
        prop_assert_eq!(shuffled_store.len(SchemaId::SummarizedInfo), 7);
        prop_assert_eq!(shuffled_store.len(SchemaId::AnalyticalResult), 17);
    }
}
