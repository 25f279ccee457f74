//! Data model for TSE surveillance reports.
//!
//! A report is stored as four row tables linked by parent ids:
//!
//! ```text
//! Report
//!  └── SummarizedInformation   (one per species / case group)
//!       └── CasesInformation   (one per sampled case)
//!            └── AnalyticalResults (one per test performed)
//! ```
//!
//! Every entity is a plain [`TableRow`] tagged with a [`SchemaId`]. Behavior
//! that differs per entity is keyed off the schema id by the crates that need
//! it (validators, merge keys) instead of being attached to row subtypes.
//!
//! The crate also carries the remote-side vocabulary shared by import and
//! submission: [`DatasetStatus`], [`SenderId`], [`DatasetVersion`],
//! [`ReportAction`] and the tagged [`TransportError`].

pub mod action;
pub mod columns;
pub mod dataset;
pub mod error;
pub mod report;
pub mod row;
pub mod schema;
pub mod sender;
pub mod session;
pub mod status;
pub mod transport;

pub use action::ReportAction;
pub use dataset::{DatasetVersion, OperationType};
pub use error::{ModelError, Result};
pub use report::Report;
pub use row::{RowId, TableRow};
pub use schema::SchemaId;
pub use sender::SenderId;
pub use session::Session;
pub use status::DatasetStatus;
pub use transport::TransportError;
