//! Reading `.tse` snapshot files.

use std::fs;
use std::path::Path;

use super::snapshot::StoreFile;
use super::{CURRENT_SCHEMA_VERSION, MAGIC_BYTES};
use crate::error::{Result, StoreError};

/// Load a snapshot from a `.tse` file.
pub fn load_store(path: &Path) -> Result<StoreFile> {
    let bytes = fs::read(path).map_err(|e| StoreError::Io {
        operation: "read",
        path: path.to_path_buf(),
        source: e,
    })?;
    decode(&bytes, path)
}

fn decode(bytes: &[u8], path: &Path) -> Result<StoreFile> {
    let invalid = |reason: &str| StoreError::InvalidFormat {
        path: path.to_path_buf(),
        reason: reason.to_string(),
    };

    if bytes.len() < 8 {
        return Err(invalid("File too small"));
    }
    if bytes[0..4] != MAGIC_BYTES {
        return Err(invalid("Not a TSE report store (invalid magic bytes)"));
    }

    let version = u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]);
    if version > CURRENT_SCHEMA_VERSION {
        return Err(StoreError::UnsupportedVersion {
            found: version,
            max_supported: CURRENT_SCHEMA_VERSION,
            path: path.to_path_buf(),
        });
    }

    // rkyv needs an aligned buffer; the payload starts at offset 8 of a Vec.
    let mut payload = rkyv::util::AlignedVec::<16>::with_capacity(bytes.len() - 8);
    payload.extend_from_slice(&bytes[8..]);

    let file = rkyv::from_bytes::<StoreFile, rkyv::rancor::Error>(&payload).map_err(|e| {
        StoreError::Deserialization {
            source: Box::new(std::io::Error::other(format!(
                "rkyv deserialization failed: {e}"
            ))),
        }
    })?;

    tracing::info!(
        path = %path.display(),
        rows = file.rows.len(),
        "loaded report store"
    );
    Ok(file)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn rejects_foreign_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("foreign.bin");
        fs::write(&path, b"XYZ\x01\x01\x00\x00\x00payload").unwrap();

        assert!(matches!(
            load_store(&path),
            Err(StoreError::InvalidFormat { .. })
        ));
    }

    #[test]
    fn rejects_newer_schema_version() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("future.tse");
        let mut bytes = MAGIC_BYTES.to_vec();
        bytes.extend_from_slice(&(CURRENT_SCHEMA_VERSION + 1).to_le_bytes());
        bytes.extend_from_slice(&[0u8; 32]);
        fs::write(&path, bytes).unwrap();

        assert!(matches!(
            load_store(&path),
            Err(StoreError::UnsupportedVersion { found: 2, .. })
        ));
    }
}
