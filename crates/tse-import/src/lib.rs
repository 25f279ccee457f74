//! Import of remote TSE report versions.
//!
//! The collection service keeps every version of a report as a separate
//! dataset. This crate reconciles them into one local hierarchy:
//!
//! - **Version ordering**: [`DatasetVersionSet`] sorts versions by the ordinal
//!   in their sender id and rejects malformed or duplicate ordinals
//! - **Payload parsing**: [`parse_payload`] turns a dataset message into flat
//!   records keyed by business keys
//! - **Merging**: [`ReportImporter`] lays the versions over the stored
//!   hierarchy in one transaction, following a [`MergePolicy`]
//!
//! # Example
//!
//! ```ignore
//! use tse_import::{DatasetVersionSet, ReportImporter};
//!
//! let importer = ReportImporter::new(&transport);
//! let outcome = importer.import(&versions, &mut store)?;
//! ```

mod error;
mod importer;
mod merge;
mod payload;
mod source;
mod version_set;

// === Error Types ===
pub use error::{ImportError, Result};

// === Versions ===
pub use version_set::DatasetVersionSet;

// === Payloads ===
pub use payload::{ParsedPayload, PayloadRecord, RecordKind, parse_payload};
pub use source::{DirectoryPayloadSource, MemoryPayloadSource, PayloadSource};

// === Merge ===
pub use importer::{FetchedVersions, ImportOutcome, ImportSummary, ReportImporter};
pub use merge::{AbsentFieldPolicy, MergePolicy};
