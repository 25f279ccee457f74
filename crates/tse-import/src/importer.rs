//! Merge import of remote dataset versions into the local store.

use std::collections::{BTreeMap, BTreeSet};

use tse_model::{
    DatasetStatus, DatasetVersion, Report, RowId, SchemaId, SenderId, TableRow, columns,
};
use tse_store::{RowStore, SortOrder, StoreError, delete_cascade, find_report_by_code};

use crate::error::{ImportError, Result};
use crate::merge::MergePolicy;
use crate::payload::{ParsedPayload, parse_payload};
use crate::source::PayloadSource;
use crate::version_set::DatasetVersionSet;

/// What an import did to the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportSummary {
    pub report_id: RowId,
    pub report_code: String,
    pub status: DatasetStatus,
    /// Number of versions merged.
    pub versions: usize,
    pub inserted: usize,
    pub updated: usize,
    pub removed: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportOutcome {
    /// The version set was empty; the store was not touched.
    NothingImported,
    Imported(ImportSummary),
}

impl ImportOutcome {
    pub fn summary(&self) -> Option<&ImportSummary> {
        match self {
            Self::NothingImported => None,
            Self::Imported(summary) => Some(summary),
        }
    }
}

/// Parsed payloads of a version set, ready to merge.
#[derive(Debug, Clone)]
pub struct FetchedVersions {
    /// Ascending by ordinal, never empty.
    versions: Vec<DatasetVersion>,
    latest_sender: SenderId,
    payloads: Vec<ParsedPayload>,
}

impl FetchedVersions {
    pub fn report_code(&self) -> &str {
        self.latest_sender.report_code()
    }

    pub fn len(&self) -> usize {
        self.versions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.versions.is_empty()
    }
}

type CaseKey = (String, String);

/// A row of the working tree together with its stored state.
#[derive(Debug, Clone)]
struct Node {
    row: TableRow,
    stored: Option<TableRow>,
}

impl Node {
    fn new(schema: SchemaId) -> Self {
        Self {
            row: TableRow::new(schema),
            stored: None,
        }
    }

    fn existing(row: TableRow) -> Self {
        Self {
            stored: Some(row.clone()),
            row,
        }
    }
}

/// The report hierarchy being merged, keyed by business keys.
#[derive(Debug, Default)]
struct WorkingTree {
    summarized_info: BTreeMap<String, Node>,
    cases: BTreeMap<CaseKey, Node>,
    results: BTreeMap<String, (CaseKey, Node)>,
    /// Stored rows that no longer belong to the report.
    removed: Vec<TableRow>,
}

/// Key for a stored row that carries no business key of its own.
fn local_key(row: &TableRow) -> String {
    row.id().map_or_else(String::new, |id| format!("#{id}"))
}

fn filled(row: &TableRow, column: &str) -> Option<String> {
    row.is_filled(column)
        .then(|| row.get_or_empty(column).trim().to_string())
}

impl WorkingTree {
    /// Load the stored hierarchy below `report_id`.
    fn load<S: RowStore + ?Sized>(store: &S, report_id: RowId) -> Result<Self> {
        let mut tree = Self::default();

        for si in store.get_by_parent_id(SchemaId::SummarizedInfo, report_id, SortOrder::Asc)? {
            let si_key = filled(&si, columns::PROG_ID)
                .or_else(|| {
                    filled(&si, columns::RES_ID).map(|res_id| {
                        res_id
                            .rsplit_once('.')
                            .map_or(res_id.clone(), |(prefix, _)| prefix.to_string())
                    })
                })
                .unwrap_or_else(|| local_key(&si));
            let si_id = si.database_id()?;

            for case in store.get_by_parent_id(SchemaId::CaseReport, si_id, SortOrder::Asc)? {
                let sample = filled(&case, columns::SAMPLE_ID).unwrap_or_else(|| local_key(&case));
                let case_key = (si_key.clone(), sample);
                let case_id = case.database_id()?;

                for result in
                    store.get_by_parent_id(SchemaId::AnalyticalResult, case_id, SortOrder::Asc)?
                {
                    let res_key =
                        filled(&result, columns::RES_ID).unwrap_or_else(|| local_key(&result));
                    tree.results
                        .insert(res_key, (case_key.clone(), Node::existing(result)));
                }
                tree.cases.insert(case_key, Node::existing(case));
            }
            tree.summarized_info.insert(si_key, Node::existing(si));
        }

        Ok(tree)
    }

    fn row_count(&self) -> usize {
        self.summarized_info.len() + self.cases.len() + self.results.len()
    }

    /// Apply one version's records on top of the tree.
    fn apply(&mut self, version: &DatasetVersion, payload: &ParsedPayload, policy: &MergePolicy) -> Result<()> {
        let mut seen_si = BTreeSet::new();
        let mut seen_cases = BTreeSet::new();
        let mut seen_results = BTreeSet::new();

        for record in payload.summarized_info() {
            let Some(prog_id) = record.prog_id() else {
                continue;
            };
            let node = self
                .summarized_info
                .entry(prog_id.clone())
                .or_insert_with(|| Node::new(SchemaId::SummarizedInfo));
            policy.apply(&mut node.row, record.values());
            node.row.put(columns::PROG_ID, prog_id.as_str());
            seen_si.insert(prog_id);
        }

        for record in payload.results() {
            let (Some(res_id), Some(prog_id), Some(sample)) =
                (record.res_id(), record.prog_id(), record.sample_id())
            else {
                continue;
            };
            if !self.summarized_info.contains_key(&prog_id) {
                return Err(ImportError::OrphanRecord {
                    res_id: res_id.to_string(),
                    prog_id,
                });
            }

            let case_key = (prog_id.clone(), sample.to_string());
            let case = self
                .cases
                .entry(case_key.clone())
                .or_insert_with(|| Node::new(SchemaId::CaseReport));
            policy.apply(&mut case.row, &record.case_values());

            let (parent, result) = self
                .results
                .entry(res_id.to_string())
                .or_insert_with(|| (case_key.clone(), Node::new(SchemaId::AnalyticalResult)));
            *parent = case_key.clone();
            policy.apply(&mut result.row, record.values());

            seen_si.insert(prog_id);
            seen_cases.insert(case_key);
            seen_results.insert(res_id.to_string());
        }

        if policy.prunes(version.status) {
            self.prune(&seen_si, &seen_cases, &seen_results);
        }
        Ok(())
    }

    /// Drop every row the version did not list, with its descendants.
    fn prune(
        &mut self,
        seen_si: &BTreeSet<String>,
        seen_cases: &BTreeSet<CaseKey>,
        seen_results: &BTreeSet<String>,
    ) {
        let before = self.row_count();
        let removed = &mut self.removed;
        let mut drop_node = |node: Node| {
            if let Some(stored) = node.stored {
                removed.push(stored);
            }
        };

        let stale_si: Vec<String> = self
            .summarized_info
            .keys()
            .filter(|key| !seen_si.contains(*key))
            .cloned()
            .collect();
        for key in stale_si {
            if let Some(node) = self.summarized_info.remove(&key) {
                drop_node(node);
            }
        }

        let stale_cases: Vec<CaseKey> = self
            .cases
            .keys()
            .filter(|key| !seen_cases.contains(*key) || !self.summarized_info.contains_key(&key.0))
            .cloned()
            .collect();
        for key in stale_cases {
            if let Some(node) = self.cases.remove(&key) {
                drop_node(node);
            }
        }

        let stale_results: Vec<String> = self
            .results
            .iter()
            .filter(|(key, (case, _))| !seen_results.contains(*key) || !self.cases.contains_key(case))
            .map(|(key, _)| key.clone())
            .collect();
        for key in stale_results {
            if let Some((_, node)) = self.results.remove(&key) {
                drop_node(node);
            }
        }

        tracing::debug!(pruned = before - self.row_count(), "pruned rows missing from version");
    }
}

#[derive(Debug, Default)]
struct WriteCounts {
    inserted: usize,
    updated: usize,
    removed: usize,
}

impl WriteCounts {
    fn save<S: RowStore + ?Sized>(&mut self, store: &mut S, node: &mut Node, parent: RowId) -> Result<RowId> {
        node.row.set_parent_id(parent);
        match &node.stored {
            None => {
                let id = store.insert(&mut node.row)?;
                self.inserted += 1;
                Ok(id)
            }
            Some(stored) => {
                if *stored != node.row {
                    store.update(&node.row)?;
                    self.updated += 1;
                }
                Ok(node.row.database_id()?)
            }
        }
    }
}

/// Merges every version of one report into exactly one local hierarchy.
#[derive(Debug, Clone)]
pub struct ReportImporter<P> {
    source: P,
    policy: MergePolicy,
}

impl<P: PayloadSource> ReportImporter<P> {
    pub fn new(source: P) -> Self {
        Self {
            source,
            policy: MergePolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: MergePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn policy(&self) -> &MergePolicy {
        &self.policy
    }

    /// Import a version set into `store`.
    ///
    /// Versions are applied in ordinal order on top of the stored hierarchy
    /// of the same report code. Every payload is downloaded and parsed before
    /// the store is touched, and all writes happen in one transaction.
    pub fn import<S: RowStore + ?Sized>(
        &self,
        versions: &DatasetVersionSet,
        store: &mut S,
    ) -> Result<ImportOutcome> {
        match self.fetch(versions)? {
            Some(fetched) => self.merge(fetched, store),
            None => Ok(ImportOutcome::NothingImported),
        }
    }

    /// Download and parse every version of the set without touching a store.
    ///
    /// `None` for an empty set.
    pub fn fetch(&self, versions: &DatasetVersionSet) -> Result<Option<FetchedVersions>> {
        let sorted = versions.sorted_by_version()?;
        let Some(latest) = sorted.last() else {
            tracing::info!("empty version set, nothing to import");
            return Ok(None);
        };
        let latest_sender = latest
            .parsed_sender_id()
            .map_err(|source| ImportError::MalformedSenderId {
                sender_id: latest.sender_id.clone(),
                source,
            })?;

        tracing::info!(
            report = %latest_sender.report_code(),
            versions = sorted.len(),
            "downloading report versions"
        );

        let mut payloads = Vec::with_capacity(sorted.len());
        for version in &sorted {
            let xml = self
                .source
                .fetch_dataset_payload(&version.dataset_id)
                .map_err(|source| ImportError::Transport {
                    dataset_id: version.dataset_id.clone(),
                    source,
                })?;
            payloads.push(parse_payload(&version.dataset_id, &xml)?);
        }

        Ok(Some(FetchedVersions {
            versions: sorted,
            latest_sender,
            payloads,
        }))
    }

    /// Merge downloaded versions into `store` in one transaction.
    pub fn merge<S: RowStore + ?Sized>(
        &self,
        fetched: FetchedVersions,
        store: &mut S,
    ) -> Result<ImportOutcome> {
        let FetchedVersions {
            versions: sorted,
            latest_sender,
            payloads,
        } = fetched;
        let Some(latest) = sorted.last() else {
            return Ok(ImportOutcome::NothingImported);
        };
        let report_code = latest_sender.report_code().to_string();

        let existing = find_report_by_code(store, &report_code)?;
        let mut tree = match existing.as_ref().and_then(|r| r.id) {
            Some(report_id) => WorkingTree::load(store, report_id)?,
            None => WorkingTree::default(),
        };

        for (version, payload) in sorted.iter().zip(&payloads) {
            tree.apply(version, payload, &self.policy)?;
            tracing::debug!(
                sender_id = %version.sender_id,
                status = %version.status,
                rows = tree.row_count(),
                "merged version"
            );
        }

        let message_id = payloads.iter().rev().find_map(|p| p.message_id.clone());
        let report = build_report(existing, latest, &latest_sender, message_id);

        store.begin()?;
        match write_tree(store, report, tree) {
            Ok((report_id, counts)) => {
                store.commit()?;
                let summary = ImportSummary {
                    report_id,
                    report_code,
                    status: latest.status,
                    versions: sorted.len(),
                    inserted: counts.inserted,
                    updated: counts.updated,
                    removed: counts.removed,
                };
                tracing::info!(
                    report = %summary.report_code,
                    status = %summary.status,
                    inserted = summary.inserted,
                    updated = summary.updated,
                    removed = summary.removed,
                    "report imported"
                );
                Ok(ImportOutcome::Imported(summary))
            }
            Err(err) => {
                if let Err(rollback) = store.rollback() {
                    tracing::error!(error = %rollback, "rollback after failed import failed");
                }
                tracing::warn!(report = %report_code, error = %err, "import aborted");
                Err(err)
            }
        }
    }
}

/// Report row carrying the latest version's identity.
fn build_report(
    existing: Option<Report>,
    latest: &DatasetVersion,
    sender: &SenderId,
    message_id: Option<String>,
) -> Report {
    let mut report = existing.unwrap_or_else(|| Report {
        id: None,
        year: String::new(),
        month: String::new(),
        country: String::new(),
        sender_id: String::new(),
        message_id: String::new(),
        dataset_id: String::new(),
        status: DatasetStatus::Draft,
        version: 0,
    });
    report.country = sender.org_code().to_string();
    if let Some(year) = sender.year() {
        report.year = year.to_string();
    }
    if let Some(month) = sender.month() {
        report.month = format!("{month:02}");
    }
    report.sender_id = latest.sender_id.clone();
    report.dataset_id = latest.dataset_id.clone();
    report.status = latest.status;
    report.version = sender.ordinal();
    if let Some(message_id) = message_id {
        report.message_id = message_id;
    }
    report
}

fn write_tree<S: RowStore + ?Sized>(
    store: &mut S,
    report: Report,
    mut tree: WorkingTree,
) -> Result<(RowId, WriteCounts)> {
    let mut counts = WriteCounts::default();

    let report_id = match report.id {
        Some(id) => {
            let mut row = store
                .get(SchemaId::Report, id)?
                .ok_or(StoreError::RowNotFound {
                    schema: SchemaId::Report,
                    id,
                })?;
            let before = row.clone();
            report.write_to(&mut row);
            if row != before {
                store.update(&row)?;
                counts.updated += 1;
            }
            id
        }
        None => {
            let mut row = report.to_row();
            counts.inserted += 1;
            store.insert(&mut row)?
        }
    };

    tree.removed
        .sort_by_key(|row| std::cmp::Reverse(row.schema().depth()));
    for row in &tree.removed {
        let id = row.database_id()?;
        if store.get(row.schema(), id)?.is_some() {
            counts.removed += delete_cascade(store, row)?;
        }
    }

    let mut si_ids = BTreeMap::new();
    for (key, node) in &mut tree.summarized_info {
        si_ids.insert(key.clone(), counts.save(store, node, report_id)?);
    }

    let mut case_ids = BTreeMap::new();
    for (key, node) in &mut tree.cases {
        let parent = *si_ids.get(&key.0).ok_or_else(|| ImportError::OrphanRecord {
            res_id: key.1.clone(),
            prog_id: key.0.clone(),
        })?;
        case_ids.insert(key.clone(), counts.save(store, node, parent)?);
    }

    for (res_id, (case_key, node)) in &mut tree.results {
        let parent = *case_ids.get(case_key).ok_or_else(|| ImportError::OrphanRecord {
            res_id: res_id.clone(),
            prog_id: case_key.0.clone(),
        })?;
        counts.save(store, node, parent)?;
    }

    Ok((report_id, counts))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::MemoryPayloadSource;
    use tse_store::{MemoryRowStore, count_hierarchy};

    const V0: &str = "<message><header><messageId>1</messageId></header><payload><dataset>\
        <result><resId>P1.0</resId><type>BSE</type></result>\
        <result><resId>P1.1</resId><sampId>S1</sampId><resVal>NEG</resVal></result>\
        </dataset></payload></message>";

    const V1: &str = "<message><header><messageId>2</messageId></header><payload><dataset>\
        <result><resId>P1.1</resId><sampId>S1</sampId><resVal>POS</resVal></result>\
        </dataset></payload></message>";

    fn importer() -> ReportImporter<MemoryPayloadSource> {
        ReportImporter::new(
            MemoryPayloadSource::new()
                .with_payload("d0", V0)
                .with_payload("d1", V1),
        )
    }

    #[test]
    fn later_version_updates_in_place() {
        let mut store = MemoryRowStore::new();
        let set: DatasetVersionSet = vec![
            DatasetVersion::new("d1", "DE1801.01", DatasetStatus::ValidWithWarnings),
            DatasetVersion::new("d0", "DE1801.00", DatasetStatus::AcceptedDwh),
        ]
        .into();

        let outcome = importer().import(&set, &mut store).unwrap();
        let summary = outcome.summary().unwrap();
        assert_eq!(summary.status, DatasetStatus::ValidWithWarnings);
        assert_eq!(summary.versions, 2);

        let results = store.get_all(SchemaId::AnalyticalResult).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].get(columns::RESULT_VALUE), Some("POS"));

        let report = Report::from_row(&store.get_all(SchemaId::Report).unwrap()[0]).unwrap();
        assert_eq!(report.sender_id, "DE1801.01");
        assert_eq!(report.message_id, "2");
        assert_eq!(report.year, "2018");
        assert_eq!(report.month, "01");
        assert_eq!(report.country, "DE");
        assert_eq!(report.version, 1);
    }

    #[test]
    fn reimport_keeps_local_ids() {
        let mut store = MemoryRowStore::new();
        let first: DatasetVersionSet =
            vec![DatasetVersion::new("d0", "DE1801.00", DatasetStatus::AcceptedDwh)].into();
        importer().import(&first, &mut store).unwrap();
        let result_id = store.get_all(SchemaId::AnalyticalResult).unwrap()[0].id();

        let second: DatasetVersionSet =
            vec![DatasetVersion::new("d1", "DE1801.01", DatasetStatus::Valid)].into();
        let summary = importer().import(&second, &mut store).unwrap();
        let summary = summary.summary().unwrap();

        assert_eq!(summary.inserted, 0);
        let counts = count_hierarchy(&store, summary.report_id).unwrap();
        assert_eq!((counts.summarized_info, counts.cases, counts.results), (1, 1, 1));
        assert_eq!(store.get_all(SchemaId::AnalyticalResult).unwrap()[0].id(), result_id);
        assert_eq!(store.get_all(SchemaId::Report).unwrap().len(), 1);
    }

    #[test]
    fn fetch_then_merge_matches_import() {
        let set: DatasetVersionSet = vec![
            DatasetVersion::new("d0", "DE1801.00", DatasetStatus::AcceptedDwh),
            DatasetVersion::new("d1", "DE1801.01", DatasetStatus::Valid),
        ]
        .into();

        let fetched = importer().fetch(&set).unwrap().unwrap();
        assert_eq!(fetched.report_code(), "DE1801");
        assert_eq!(fetched.len(), 2);

        let mut merged = MemoryRowStore::new();
        importer().merge(fetched, &mut merged).unwrap();
        let mut imported = MemoryRowStore::new();
        importer().import(&set, &mut imported).unwrap();
        for schema in [
            SchemaId::Report,
            SchemaId::SummarizedInfo,
            SchemaId::CaseReport,
            SchemaId::AnalyticalResult,
        ] {
            assert_eq!(merged.get_all(schema).unwrap(), imported.get_all(schema).unwrap());
        }
    }

    #[test]
    fn fetch_fails_on_missing_payload() {
        let set: DatasetVersionSet =
            vec![DatasetVersion::new("d9", "DE1801.00", DatasetStatus::Valid)].into();
        assert!(matches!(
            importer().fetch(&set),
            Err(ImportError::Transport { .. })
        ));
        assert!(importer().fetch(&DatasetVersionSet::new()).unwrap().is_none());
    }
}
