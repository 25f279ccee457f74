//! Report actions against the remote collection service.
//!
//! - **Status** (`status`): the report lifecycle and the send gate
//! - **Coordinator** (`coordinator`): evaluate, confirm, execute and report
//!   send / reject / submit / amend
//! - **Transport** (`transport`): the interface a remote service client implements
//! - **Connection** (`connection`): throwaway `TEST` send
//!
//! # Error Handling
//!
//! Operations return [`ActionError`], which wraps the tagged
//! [`TransportError`](tse_model::TransportError) kinds. The coordinator turns
//! every error into exactly one [`Notice`]; nothing escapes
//! [`ReportActionCoordinator::run`].
//!
//! # Example
//!
//! ```ignore
//! use tse_submit::{BusyState, ReportActionCoordinator};
//!
//! let coordinator = ReportActionCoordinator::new(transport, ask_user, BusyState::new(), session);
//! match coordinator.run(&mut store, ReportAction::Send, &mut report) {
//!     ActionOutcome::Declined => {}
//!     outcome => show(outcome.notice()),
//! }
//! ```

pub mod busy;
pub mod confirm;
pub mod connection;
pub mod coordinator;
pub mod error;
pub mod failure;
pub mod notice;
pub mod status;
pub mod transport;

pub use busy::{BusyGuard, BusyIndicator, BusyState};
pub use confirm::{ConfirmationRequest, Confirmer};
pub use connection::ConnectionTester;
pub use coordinator::{ActionOutcome, Decision, ReportActionCoordinator};
pub use error::{ActionError, Result, StatusError};
pub use failure::classify;
pub use notice::{ErrorClass, Notice, NoticeLevel};
pub use status::{ReportStatusMachine, SendGate, StatusEvent};
pub use transport::{RemoteDatasetTransport, SendOutcome};
