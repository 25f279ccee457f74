//! Send, reject, submit and amend a report.
//!
//! An action runs in four steps: [`evaluate`](ReportActionCoordinator::evaluate)
//! the local and remote status, [`confirm`](ReportActionCoordinator::confirm)
//! with the user, [`execute`](ReportActionCoordinator::execute) against the
//! remote service, then report the outcome as a [`Notice`]. Errors never
//! escape [`run`](ReportActionCoordinator::run); each one becomes a notice.

use tse_model::{
    DatasetStatus, DatasetVersion, OperationType, Report, ReportAction, SchemaId, Session,
    TransportError,
};
use tse_store::{RowStore, StoreError};

use crate::busy::{BusyGuard, BusyIndicator, BusyState};
use crate::confirm::{ConfirmationRequest, Confirmer};
use crate::connection::ConnectionTester;
use crate::error::{ActionError, Result};
use crate::failure::{failure_notice, remote_status_notice};
use crate::notice::Notice;
use crate::status::{ReportStatusMachine, SendGate, StatusEvent};
use crate::transport::{RemoteDatasetTransport, SendOutcome};

/// Result of checking whether an action may go ahead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// Nothing to ask.
    Proceed,
    /// The user must agree first. `replace` is the remote dataset a send
    /// would overwrite.
    NeedsConfirmation { replace: Option<DatasetVersion> },
    /// The action cannot run.
    Blocked(Notice),
}

/// How a full action run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionOutcome {
    Completed(Notice),
    /// The user answered no; nothing was changed.
    Declined,
    Blocked(Notice),
    Failed(Notice),
}

impl ActionOutcome {
    pub fn notice(&self) -> Option<&Notice> {
        match self {
            Self::Completed(notice) | Self::Blocked(notice) | Self::Failed(notice) => Some(notice),
            Self::Declined => None,
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed(_))
    }
}

const fn event_for(action: ReportAction) -> StatusEvent {
    match action {
        ReportAction::Send => StatusEvent::Sent,
        ReportAction::Reject => StatusEvent::Rejected,
        ReportAction::Submit => StatusEvent::Submitted,
        ReportAction::Amend => StatusEvent::Amended,
    }
}

fn title(action: ReportAction) -> &'static str {
    match action {
        ReportAction::Send => "Send report",
        ReportAction::Reject => "Reject report",
        ReportAction::Submit => "Submit report",
        ReportAction::Amend => "Amend report",
    }
}

/// Drives report actions against one transport for one session.
pub struct ReportActionCoordinator<T, C, B = BusyState> {
    transport: T,
    confirmer: C,
    busy: B,
    session: Session,
}

impl<T, C, B> ReportActionCoordinator<T, C, B>
where
    T: RemoteDatasetTransport,
    C: Confirmer,
    B: BusyIndicator,
{
    pub fn new(transport: T, confirmer: C, busy: B, session: Session) -> Self {
        Self {
            transport,
            confirmer,
            busy,
            session,
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Connection test through the same transport and session.
    pub fn connection_tester(&self) -> ConnectionTester<'_, T> {
        ConnectionTester::new(&self.transport, &self.busy, &self.session)
    }

    /// Decide whether `action` may run on `report`.
    ///
    /// `remote` is the latest remote dataset of the report; it only matters
    /// for sends. Without one, a report whose own status says it already
    /// has a dataset is treated as that dataset.
    pub fn evaluate(
        &self,
        action: ReportAction,
        report: &Report,
        remote: Option<&DatasetVersion>,
    ) -> Decision {
        if let Err(err) = ReportStatusMachine::transition(report.status, event_for(action)) {
            return Decision::Blocked(failure_notice(
                &err.into(),
                title(action),
                &self.session.support_email,
            ));
        }

        if action != ReportAction::Send {
            return Decision::NeedsConfirmation { replace: None };
        }

        let remote = remote.cloned().or_else(|| local_dataset(report));
        match ReportStatusMachine::send_gate(remote.as_ref().map(|r| r.status)) {
            SendGate::Free => Decision::Proceed,
            SendGate::NeedsReplace => Decision::NeedsConfirmation { replace: remote },
            SendGate::Blocked | SendGate::Unsupported => {
                let (dataset_id, status) = remote
                    .as_ref()
                    .map(|r| (r.dataset_id.as_str(), r.status))
                    .unwrap_or(("", DatasetStatus::Draft));
                Decision::Blocked(remote_status_notice(
                    title(action),
                    dataset_id,
                    status,
                    &self.session.support_email,
                ))
            }
        }
    }

    /// Ask the user whatever `decision` requires. `false` stops the action.
    pub fn confirm(&self, action: ReportAction, report: &Report, decision: &Decision) -> bool {
        let first = match decision {
            Decision::Blocked(_) => return false,
            Decision::Proceed => None,
            Decision::NeedsConfirmation {
                replace: Some(remote),
            } => Some(ConfirmationRequest::Replace {
                dataset_id: remote.dataset_id.clone(),
                status: remote.status,
            }),
            Decision::NeedsConfirmation { replace: None } => {
                Some(ConfirmationRequest::Action(action))
            }
        };

        if let Some(request) = first
            && !self.ask(&request)
        {
            return false;
        }

        if action == ReportAction::Send
            && let Some(code) = self.session.data_collection_for(&report.year)
        {
            return self.ask(&ConfirmationRequest::DataCollection {
                code: code.to_string(),
            });
        }

        true
    }

    fn ask(&self, request: &ConfirmationRequest) -> bool {
        let answer = self.confirmer.confirm(request);
        if !answer {
            tracing::info!(question = ?request, "action declined");
        }
        answer
    }

    /// Perform `action` and persist the updated report.
    ///
    /// `report` is only updated once the store accepted the change.
    pub fn execute<S: RowStore + ?Sized>(
        &self,
        store: &mut S,
        action: ReportAction,
        report: &mut Report,
        remote: Option<&DatasetVersion>,
    ) -> Result<Notice> {
        let next = ReportStatusMachine::transition(report.status, event_for(action))?;
        let mut updated = report.clone();

        match action {
            ReportAction::Send => {
                if updated.sender_id.trim().is_empty() {
                    return Err(TransportError::MissingSenderId.into());
                }
                let replace = remote.cloned().or_else(|| local_dataset(report)).filter(|r| {
                    !r.dataset_id.is_empty()
                        && ReportStatusMachine::send_gate(Some(r.status)) == SendGate::NeedsReplace
                });
                let operation = if replace.is_some() {
                    OperationType::Replace
                } else {
                    OperationType::Insert
                };
                let outcome = self.send(&updated, operation)?;
                if let Some(remote) = replace {
                    updated.dataset_id = remote.dataset_id;
                }
                apply_outcome(&mut updated, outcome, next);
            }
            ReportAction::Reject => {
                let outcome = self.send(&updated, OperationType::Reject)?;
                apply_outcome(&mut updated, outcome, next);
            }
            ReportAction::Submit => {
                let outcome = self.send(&updated, OperationType::Submit)?;
                apply_outcome(&mut updated, outcome, next);
            }
            ReportAction::Amend => {
                let sender = updated.sender()?.next_version();
                updated.sender_id = sender.to_string();
                updated.version = sender.ordinal();
                updated.message_id.clear();
                updated.dataset_id.clear();
                updated.status = next;
            }
        }

        if let Err(err) = persist_report(store, &updated) {
            if action == ReportAction::Amend {
                return Err(err);
            }
            return Err(ActionError::NotRecorded {
                action,
                sender_id: updated.sender_id,
                source: Box::new(err),
            });
        }
        tracing::info!(
            action = %action,
            sender_id = %updated.sender_id,
            from = %report.status,
            to = %updated.status,
            "report action completed"
        );
        *report = updated;
        Ok(self.end(action, report))
    }

    fn send(&self, report: &Report, operation: OperationType) -> Result<SendOutcome> {
        tracing::debug!(sender_id = %report.sender_id, %operation, "sending report");
        let _busy = BusyGuard::raise(&self.busy);
        Ok(self.transport.send_report(report, operation)?)
    }

    /// Success notice of an action.
    pub fn end(&self, action: ReportAction, report: &Report) -> Notice {
        let message = match action {
            ReportAction::Send => format!(
                "Report {} was sent. Refresh its status to follow the remote validation.",
                report.sender_id
            ),
            ReportAction::Reject => format!("Dataset of report {} was rejected.", report.sender_id),
            ReportAction::Submit => format!(
                "Report {} was submitted for acceptance into the data warehouse.",
                report.sender_id
            ),
            ReportAction::Amend => format!(
                "Version {} was created. Edit it and send it when ready.",
                report.sender_id
            ),
        };
        Notice::info(title(action), message)
    }

    /// Notice for a failed action.
    pub fn manage_exception(&self, err: &ActionError, action: ReportAction) -> Notice {
        failure_notice(err, title(action), &self.session.support_email)
    }

    fn latest_remote(&self, report: &Report) -> Result<Option<DatasetVersion>> {
        let code = report
            .report_code()
            .map_err(|_| TransportError::MissingSenderId)?;
        let _busy = BusyGuard::raise(&self.busy);
        Ok(self.transport.latest_dataset(&code)?)
    }

    /// Evaluate, confirm and execute `action`.
    pub fn run<S: RowStore + ?Sized>(
        &self,
        store: &mut S,
        action: ReportAction,
        report: &mut Report,
    ) -> ActionOutcome {
        tracing::info!(
            action = %action,
            sender_id = %report.sender_id,
            status = %report.status,
            "report action requested"
        );

        // Local status first so blocked reports never reach the network.
        if let Decision::Blocked(notice) = self.evaluate(action, report, None) {
            return ActionOutcome::Blocked(notice);
        }

        let remote = if action == ReportAction::Send {
            match self.latest_remote(report) {
                Ok(remote) => remote,
                Err(err) => return ActionOutcome::Failed(self.manage_exception(&err, action)),
            }
        } else {
            None
        };

        let decision = self.evaluate(action, report, remote.as_ref());
        if let Decision::Blocked(notice) = decision {
            return ActionOutcome::Blocked(notice);
        }
        if !self.confirm(action, report, &decision) {
            return ActionOutcome::Declined;
        }

        match self.execute(store, action, report, remote.as_ref()) {
            Ok(notice) => ActionOutcome::Completed(notice),
            Err(err) => ActionOutcome::Failed(self.manage_exception(&err, action)),
        }
    }

    /// Pull the status of the latest remote version into the report.
    ///
    /// Returns the new status, or `None` when the remote service has no
    /// dataset for the current version.
    pub fn refresh_status<S: RowStore + ?Sized>(
        &self,
        store: &mut S,
        report: &mut Report,
    ) -> Result<Option<DatasetStatus>> {
        let Some(remote) = self.latest_remote(report)? else {
            return Ok(None);
        };
        if remote.sender_id != report.sender_id {
            tracing::debug!(
                local = %report.sender_id,
                remote = %remote.sender_id,
                "latest remote version belongs to another sender id"
            );
            return Ok(None);
        }

        let mut updated = report.clone();
        updated.status =
            ReportStatusMachine::transition(report.status, StatusEvent::Refreshed(remote.status))?;
        updated.dataset_id = remote.dataset_id;
        if updated != *report {
            persist_report(store, &updated)?;
            *report = updated;
        }
        Ok(Some(report.status))
    }
}

/// The dataset a report already has according to its own status.
fn local_dataset(report: &Report) -> Option<DatasetVersion> {
    ReportStatusMachine::requires_replace_confirmation(report.status).then(|| {
        DatasetVersion::new(
            report.dataset_id.as_str(),
            report.sender_id.as_str(),
            report.status,
        )
    })
}

fn apply_outcome(report: &mut Report, outcome: SendOutcome, next: DatasetStatus) {
    report.message_id = outcome.message_id;
    if let Some(dataset_id) = outcome.dataset_id {
        report.dataset_id = dataset_id;
    }
    report.status = outcome.status.unwrap_or(next);
}

/// Write the report fields into its stored row.
fn persist_report<S: RowStore + ?Sized>(store: &mut S, report: &Report) -> Result<()> {
    let id = report.database_id()?;
    let mut row = store
        .get(SchemaId::Report, id)?
        .ok_or(StoreError::RowNotFound {
            schema: SchemaId::Report,
            id,
        })?;
    report.write_to(&mut row);
    store.update(&row)?;
    Ok(())
}
