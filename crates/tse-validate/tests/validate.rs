//! Integration tests for flag aggregation and report checks.

use proptest::prelude::*;
use tse_model::{RowId, SchemaId, TableRow, columns};
use tse_store::{MemoryRowStore, RowStore};
use tse_validate::{
    IssueKind, Severity, ValidationAggregator, ValidatorRegistry, check_report, is_sendable,
};

struct Report {
    store: MemoryRowStore,
    report_id: RowId,
    si_id: RowId,
    results: Vec<TableRow>,
}

/// One summarized information with `cases` cases of one result each.
fn report(cases: usize, inconclusive: &str) -> Report {
    let mut store = MemoryRowStore::new();
    let mut report = TableRow::new(SchemaId::Report);
    let report_id = store.insert(&mut report).unwrap();

    let mut si = TableRow::child_of(SchemaId::SummarizedInfo, report_id);
    si.put(columns::SUMMARIZED_INFO_TYPE, "BSE");
    si.put(columns::SUMMARIZED_INFO_INC_SAMPLES, inconclusive);
    let si_id = store.insert(&mut si).unwrap();

    let mut results = Vec::new();
    for n in 0..cases {
        let mut case = TableRow::child_of(SchemaId::CaseReport, si_id);
        case.put(columns::SAMPLE_ID, format!("S{n}"));
        case.put(columns::ANIMAL_ID, format!("A{n}"));
        case.put(columns::NATIONAL_CASE_ID, format!("N{n}"));
        let case_id = store.insert(&mut case).unwrap();

        let mut result = TableRow::child_of(SchemaId::AnalyticalResult, case_id);
        result.put(columns::TEST_AIM, "G_RES");
        result.put(columns::AN_METH_CODE, "AM005A");
        result.put(columns::PARAM_CODE_BASE_TERM, "RF-00003328-PAR");
        result.put(columns::RESULT_VALUE, "INC");
        store.insert(&mut result).unwrap();
        results.push(result);
    }

    Report {
        store,
        report_id,
        si_id,
        results,
    }
}

#[test]
fn clean_report_has_no_issues() {
    let Report {
        store, report_id, ..
    } = report(2, "2");
    let issues = check_report(&store, &ValidatorRegistry::with_defaults(), report_id).unwrap();
    assert!(issues.is_empty());
    assert!(is_sendable(&issues));
}

#[test]
fn inconclusive_total_above_case_count_is_an_error() {
    let Report {
        store,
        report_id,
        si_id,
        ..
    } = report(1, "3");
    let issues = check_report(&store, &ValidatorRegistry::with_defaults(), report_id).unwrap();

    assert_eq!(issues.len(), 1);
    assert_eq!(issues[0].row_id, si_id);
    assert_eq!(issues[0].severity, Severity::Error);
    assert_eq!(
        issues[0].kind,
        IssueKind::InconclusiveExceedsCases {
            declared: 3,
            cases: 1
        }
    );
    assert!(!is_sendable(&issues));
}

#[test]
fn row_warnings_are_reported_with_their_row() {
    let Report {
        mut store,
        report_id,
        mut results,
        ..
    } = report(2, "0");
    let broken = &mut results[1];
    broken.remove(columns::TEST_AIM);
    store.update(broken).unwrap();

    let issues = check_report(&store, &ValidatorRegistry::with_defaults(), report_id).unwrap();
    assert_eq!(issues.len(), 1);
    assert_eq!(issues[0].row_id, broken.id().unwrap());
    assert_eq!(issues[0].severity, Severity::Warning);
    assert!(is_sendable(&issues));
}

#[test]
fn refresh_after_import_marks_only_bad_branches() {
    let Report {
        mut store,
        report_id,
        mut results,
        ..
    } = report(3, "0");
    results[0].put(columns::RESULT_VALUE, "");
    store.update(&results[0]).unwrap();

    let aggregator = ValidationAggregator::default();
    aggregator.refresh_report(&mut store, report_id).unwrap();

    let flagged: Vec<bool> = store
        .get_all(SchemaId::CaseReport)
        .unwrap()
        .iter()
        .map(TableRow::children_error)
        .collect();
    assert_eq!(flagged, vec![true, false, false]);
    let si = &store.get_all(SchemaId::SummarizedInfo).unwrap()[0];
    assert!(si.children_error());
}

proptest! {
    #[test]
    fn flags_match_any_bad_descendant(bad in proptest::collection::vec(any::<bool>(), 1..6)) {
        let Report { mut store, report_id, mut results, .. } = report(bad.len(), "0");
        let aggregator = ValidationAggregator::default();

        for (result, is_bad) in results.iter_mut().zip(&bad) {
            if *is_bad {
                result.remove(columns::PARAM_CODE_BASE_TERM);
                store.update(result).unwrap();
            }
            aggregator.recompute_ancestors(&mut store, result).unwrap();
        }

        let si = &store.get_all(SchemaId::SummarizedInfo).unwrap()[0];
        prop_assert_eq!(si.children_error(), bad.iter().any(|b| *b));

        let before = store.get_all(SchemaId::CaseReport).unwrap();
        prop_assert!(aggregator.refresh_report(&mut store, report_id).unwrap().is_empty());
        prop_assert_eq!(store.get_all(SchemaId::CaseReport).unwrap(), before);
    }
}
