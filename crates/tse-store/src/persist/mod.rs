//! `.tse` snapshot files.
//!
//! This module handles:
//! - Saving the store with atomic writes
//! - Loading the store with format validation
//! - File hashing to detect changes made by other processes

mod hash;
mod load;
mod save;
mod snapshot;

pub use hash::{compute_file_hash, verify_file_hash};
pub use load::load_store;
pub use save::save_store;
pub use snapshot::{CellSnapshot, RowSnapshot, SchemaSnapshot, StoreFile};

/// Current schema version.
///
/// The loader rejects files with version > CURRENT_SCHEMA_VERSION.
pub const CURRENT_SCHEMA_VERSION: u32 = 1;

/// Magic bytes at the start of .tse files.
pub const MAGIC_BYTES: [u8; 4] = [b'T', b'S', b'E', 0x01];
