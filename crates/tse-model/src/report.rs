//! Typed view of a report row.

use crate::columns;
use crate::error::{ModelError, Result};
use crate::row::{RowId, TableRow};
use crate::schema::SchemaId;
use crate::sender::SenderId;
use crate::status::DatasetStatus;

/// Root record of a report hierarchy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    pub id: Option<RowId>,
    pub year: String,
    pub month: String,
    pub country: String,
    /// Sender dataset id of the current version (empty until assigned).
    pub sender_id: String,
    /// Id of the last message sent or imported for this report.
    pub message_id: String,
    /// Remote dataset id of the current version, if known.
    pub dataset_id: String,
    pub status: DatasetStatus,
    pub version: u32,
}

impl Report {
    /// New draft report for a reporting period, version `.00`.
    pub fn new_draft(country: &str, year: u16, month: u8) -> Self {
        let code = format!("{country}{:02}{month:02}", year % 100);
        Self {
            id: None,
            year: year.to_string(),
            month: format!("{month:02}"),
            country: country.to_string(),
            sender_id: SenderId::new(code, 0).to_string(),
            message_id: String::new(),
            dataset_id: String::new(),
            status: DatasetStatus::Draft,
            version: 0,
        }
    }

    /// Read a report from its row.
    pub fn from_row(row: &TableRow) -> Result<Self> {
        row.expect_schema(SchemaId::Report)?;

        let status = match row.get(columns::REPORT_STATUS) {
            Some(label) if !label.trim().is_empty() => label.parse()?,
            _ => DatasetStatus::Draft,
        };

        let version = match row.get(columns::REPORT_VERSION) {
            Some(v) if !v.trim().is_empty() => v
                .trim()
                .parse::<u32>()
                .map_err(|_| ModelError::InvalidVersion(v.to_string()))?,
            _ => 0,
        };

        Ok(Self {
            id: row.id(),
            year: row.get_or_empty(columns::REPORT_YEAR).to_string(),
            month: row.get_or_empty(columns::REPORT_MONTH).to_string(),
            country: row.get_or_empty(columns::REPORT_COUNTRY).to_string(),
            sender_id: row.get_or_empty(columns::REPORT_SENDER_ID).to_string(),
            message_id: row.get_or_empty(columns::REPORT_MESSAGE_ID).to_string(),
            dataset_id: row.get_or_empty(columns::REPORT_DATASET_ID).to_string(),
            status,
            version,
        })
    }

    /// Write every report field into `row`, leaving other columns untouched.
    pub fn write_to(&self, row: &mut TableRow) {
        row.put(columns::REPORT_YEAR, self.year.as_str());
        row.put(columns::REPORT_MONTH, self.month.as_str());
        row.put(columns::REPORT_COUNTRY, self.country.as_str());
        row.put(columns::REPORT_SENDER_ID, self.sender_id.as_str());
        row.put(columns::REPORT_MESSAGE_ID, self.message_id.as_str());
        row.put(columns::REPORT_DATASET_ID, self.dataset_id.as_str());
        row.put(columns::REPORT_STATUS, self.status.label());
        row.put(columns::REPORT_VERSION, self.version.to_string());
    }

    /// Build a row holding this report.
    pub fn to_row(&self) -> TableRow {
        let mut row = TableRow::new(SchemaId::Report);
        if let Some(id) = self.id {
            row.set_id(id);
        }
        self.write_to(&mut row);
        row
    }

    pub fn database_id(&self) -> Result<RowId> {
        self.id.ok_or(ModelError::UnsavedRow {
            schema: SchemaId::Report,
        })
    }

    pub fn sender(&self) -> Result<SenderId> {
        SenderId::parse(&self.sender_id)
    }

    /// Report code shared by every version of this report.
    pub fn report_code(&self) -> Result<String> {
        self.sender().map(|id| id.report_code().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_draft_builds_sender_id_from_period() {
        let report = Report::new_draft("AT", 2017, 6);
        assert_eq!(report.sender_id, "AT1706.00");
        assert_eq!(report.report_code().unwrap(), "AT1706");
        assert_eq!(report.status, DatasetStatus::Draft);
    }

    #[test]
    fn row_round_trip_keeps_status_and_version() {
        let mut report = Report::new_draft("BE", 2010, 11);
        report.status = DatasetStatus::ValidWithWarnings;
        report.version = 3;
        report.id = Some(RowId::new(7));

        let row = report.to_row();
        assert_eq!(row.get(columns::REPORT_STATUS), Some("VALID_WITH_WARNINGS"));
        assert_eq!(Report::from_row(&row).unwrap(), report);
    }

    #[test]
    fn empty_row_reads_as_draft() {
        let row = TableRow::new(SchemaId::Report);
        let report = Report::from_row(&row).unwrap();
        assert_eq!(report.status, DatasetStatus::Draft);
        assert_eq!(report.version, 0);
        assert!(report.report_code().is_err());
    }

    #[test]
    fn rejects_non_report_rows() {
        let row = TableRow::new(SchemaId::CaseReport);
        assert!(matches!(
            Report::from_row(&row),
            Err(ModelError::SchemaMismatch { .. })
        ));
    }
}
