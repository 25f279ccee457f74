//! Content hashing used to detect snapshot files changed behind our back.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use sha2::{Digest, Sha256};

use crate::error::{Result, StoreError};

fn read_error(path: &Path, source: std::io::Error) -> StoreError {
    StoreError::Io {
        operation: "read",
        path: path.to_path_buf(),
        source,
    }
}

/// SHA-256 of a file, hex encoded.
pub fn compute_file_hash(path: &Path) -> Result<String> {
    let file = File::open(path).map_err(|e| read_error(path, e))?;
    let mut reader = BufReader::new(file);
    let mut hasher = Sha256::new();
    let mut buffer = [0u8; 8192];

    loop {
        let n = reader.read(&mut buffer).map_err(|e| read_error(path, e))?;
        if n == 0 {
            break;
        }
        hasher.update(&buffer[..n]);
    }

    Ok(hex::encode(hasher.finalize()))
}

/// Fail with [`StoreError::SnapshotChanged`] when the file no longer hashes
/// to `expected_hash`.
pub fn verify_file_hash(path: &Path, expected_hash: &str) -> Result<()> {
    let actual_hash = compute_file_hash(path)?;
    if actual_hash == expected_hash {
        Ok(())
    } else {
        tracing::warn!(path = %path.display(), "snapshot hash mismatch");
        Err(StoreError::SnapshotChanged {
            path: path.to_path_buf(),
            expected_hash: expected_hash.to_string(),
            actual_hash,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn empty_file_hash() {
        let file = NamedTempFile::new().unwrap();
        assert_eq!(
            compute_file_hash(file.path()).unwrap(),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn modified_file_is_reported() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"first").unwrap();
        file.flush().unwrap();
        let hash = compute_file_hash(file.path()).unwrap();
        verify_file_hash(file.path(), &hash).unwrap();

        file.write_all(b" and second").unwrap();
        file.flush().unwrap();
        assert!(matches!(
            verify_file_hash(file.path(), &hash),
            Err(StoreError::SnapshotChanged { .. })
        ));
    }
}
