//! Row storage for TSE report hierarchies.
//!
//! The core never talks to a database directly. It reads and writes rows
//! through the [`RowStore`] interface, which mirrors what the production
//! storage engine offers: keyed rows, a parent-id foreign key and a
//! transaction boundary.
//!
//! # Contents
//!
//! - [`RowStore`] - the storage interface consumed by import, validation and
//!   submission
//! - [`MemoryRowStore`] - reference implementation used by tests and by the
//!   application workspace
//! - `hierarchy` - helpers that walk the report tree through any store
//! - [`ReportLocks`] - one mutual-exclusion lock per report code
//! - `persist` - `.tse` snapshot files with atomic writes
//!
//! # Snapshot File Format
//!
//! ```text
//! +------------------+
//! | Magic: "TSE\x01" | 4 bytes - file identification
//! +------------------+
//! | Version: 1       | 4 bytes - u32 little-endian schema version
//! +------------------+
//! | rkyv Payload     | Variable - rows of all four tables
//! +------------------+
//! ```

mod error;
pub mod hierarchy;
mod lock;
mod memory;
mod persist;
mod store;

pub use error::{Result, StoreError};
pub use hierarchy::{
    HierarchyCounts, children_of, count_hierarchy, delete_cascade, find_report_by_code,
    parent_of, report_of,
};
pub use lock::{ReportLock, ReportLocks};
pub use memory::MemoryRowStore;
pub use persist::{
    CURRENT_SCHEMA_VERSION, CellSnapshot, MAGIC_BYTES, RowSnapshot, SchemaSnapshot, StoreFile,
    compute_file_hash, load_store, save_store, verify_file_hash,
};
pub use store::{RowStore, SortOrder};
