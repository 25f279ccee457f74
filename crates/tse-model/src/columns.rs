//! Column ids of the four row tables.
//!
//! Column ids double as element names in dataset payloads, so a value read
//! from a `<result>` record lands in the column of the same name.

// Report
pub const REPORT_YEAR: &str = "reportYear";
pub const REPORT_MONTH: &str = "reportMonth";
pub const REPORT_COUNTRY: &str = "country";
pub const REPORT_SENDER_ID: &str = "reportSenderId";
pub const REPORT_MESSAGE_ID: &str = "reportMessageId";
pub const REPORT_STATUS: &str = "reportStatus";
pub const REPORT_VERSION: &str = "reportVersion";
pub const REPORT_DATASET_ID: &str = "reportDatasetId";

// Shared by summarized information and results
pub const RES_ID: &str = "resId";
pub const PROG_ID: &str = "progId";

// Summarized information
pub const SUMMARIZED_INFO_TYPE: &str = "type";
pub const SUMMARIZED_INFO_TOT_TESTED: &str = "totSamplesTested";
pub const SUMMARIZED_INFO_POS_SAMPLES: &str = "totSamplesPositive";
pub const SUMMARIZED_INFO_INC_SAMPLES: &str = "totSamplesInconclusive";

// Case report
pub const SAMPLE_ID: &str = "sampId";
pub const ANIMAL_ID: &str = "animalId";
pub const NATIONAL_CASE_ID: &str = "nationalCaseId";

// Analytical result
pub const TEST_AIM: &str = "testAim";
pub const AN_METH_TYPE: &str = "anMethType";
pub const AN_METH_CODE: &str = "anMethCode";
pub const PARAM_CODE_BASE_TERM: &str = "paramCodeBaseTerm";
pub const RESULT_VALUE: &str = "resVal";

/// Flag column of summarized information and case rows.
pub const CHILDREN_ERROR: &str = "childrenErrors";

/// Columns lifted from a result record onto its case row during import.
pub const CASE_COLUMNS: [&str; 3] = [SAMPLE_ID, ANIMAL_ID, NATIONAL_CASE_ID];

/// Values of [`SUMMARIZED_INFO_TYPE`].
pub mod summarized_info_type {
    pub const BSE: &str = "BSE";
    pub const SCRAPIE: &str = "SCRAPIE";
    pub const CWD: &str = "CWD";
    pub const BSEOS: &str = "BSEOS";

    pub const ALL: [&str; 4] = [BSE, SCRAPIE, CWD, BSEOS];
}

/// Analytical method code for genotyping tests.
pub const AN_METH_CODE_GENOTYPING: &str = "AM010A";
