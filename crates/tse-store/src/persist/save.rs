//! Writing `.tse` snapshot files.

use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

use super::snapshot::StoreFile;
use super::{CURRENT_SCHEMA_VERSION, MAGIC_BYTES};
use crate::error::{Result, StoreError};

/// Save a snapshot, returning the SHA-256 of the written file.
///
/// Writes to a temp file next to the target and renames it over the target,
/// so a crash never leaves a half-written store behind.
pub fn save_store(file: &mut StoreFile, path: &Path) -> Result<String> {
    file.touch();
    let bytes = encode(file)?;
    let temp_path = path.with_extension("tse.tmp");

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| StoreError::Io {
            operation: "create directory",
            path: parent.to_path_buf(),
            source: e,
        })?;
    }

    let io_err = |operation: &'static str| {
        let temp_path = temp_path.clone();
        move |source| StoreError::Io {
            operation,
            path: temp_path,
            source,
        }
    };

    let mut out = File::create(&temp_path).map_err(io_err("create"))?;
    out.write_all(&bytes).map_err(io_err("write"))?;
    out.sync_all().map_err(io_err("sync"))?;
    drop(out);

    fs::rename(&temp_path, path).map_err(|e| StoreError::AtomicWriteFailed {
        temp_path: temp_path.clone(),
        target_path: path.to_path_buf(),
        source: e,
    })?;

    tracing::info!(
        path = %path.display(),
        rows = file.rows.len(),
        "saved report store"
    );

    super::compute_file_hash(path)
}

/// Magic, little-endian schema version, then the rkyv payload.
fn encode(file: &StoreFile) -> Result<Vec<u8>> {
    let payload = rkyv::to_bytes::<rkyv::rancor::Error>(file).map_err(|e| {
        StoreError::Serialization {
            source: Box::new(std::io::Error::other(format!(
                "rkyv serialization failed: {e}"
            ))),
        }
    })?;

    let mut output = Vec::with_capacity(8 + payload.len());
    output.extend_from_slice(&MAGIC_BYTES);
    output.extend_from_slice(&CURRENT_SCHEMA_VERSION.to_le_bytes());
    output.extend_from_slice(&payload);
    Ok(output)
}
