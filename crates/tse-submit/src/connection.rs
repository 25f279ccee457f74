//! Connection test against the remote collection service.

use chrono::Datelike;
use tse_model::{OperationType, Report, SenderId, Session};
use tse_store::{RowStore, delete_cascade};

use crate::busy::{BusyGuard, BusyIndicator};
use crate::error::{ActionError, Result};
use crate::failure::failure_notice;
use crate::notice::Notice;
use crate::transport::RemoteDatasetTransport;

const TITLE: &str = "Connection test";

/// Sends a throwaway report with operation `TEST`.
pub struct ConnectionTester<'a, T> {
    transport: &'a T,
    busy: &'a dyn BusyIndicator,
    session: &'a Session,
}

impl<'a, T: RemoteDatasetTransport> ConnectionTester<'a, T> {
    pub fn new(transport: &'a T, busy: &'a dyn BusyIndicator, session: &'a Session) -> Self {
        Self {
            transport,
            busy,
            session,
        }
    }

    /// Report used for the test: the configured test report code, or the
    /// organisation code with the current period.
    fn test_report(&self) -> Report {
        let today = chrono::Local::now().date_naive();
        let year = u16::try_from(today.year()).unwrap_or_default();
        let month = u8::try_from(today.month()).unwrap_or(1);
        let mut report = Report::new_draft(&self.session.org_code, year, month);
        let code = self.session.test_report_code.trim();
        if !code.is_empty() {
            report.sender_id = SenderId::new(code, 0).to_string();
        }
        report
    }

    /// Send a test report and delete it again, whatever happened.
    pub fn test_connection<S: RowStore + ?Sized>(&self, store: &mut S) -> Notice {
        if !self.session.is_logged_in() {
            return Notice::error(TITLE, "Log in before testing the connection.");
        }

        let report = self.test_report();
        let mut row = report.to_row();
        if let Err(err) = store.insert(&mut row) {
            return failure_notice(&err.into(), TITLE, &self.session.support_email);
        }

        let result = self.send(&report);

        match delete_cascade(store, &row) {
            Ok(_) => tracing::debug!(sender_id = %report.sender_id, "test report deleted"),
            Err(err) => tracing::warn!(error = %err, "failed to delete test report"),
        }

        match result {
            Ok(()) => {
                tracing::info!(user = %self.session.username, "connection test succeeded");
                Notice::info(TITLE, "The connection to the collection service works.")
            }
            Err(err) => failure_notice(&err, TITLE, &self.session.support_email),
        }
    }

    fn send(&self, report: &Report) -> Result<()> {
        let _busy = BusyGuard::raise(self.busy);
        self.transport
            .send_report(report, OperationType::Test)
            .map(|_| ())
            .map_err(ActionError::from)
    }
}
