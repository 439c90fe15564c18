//! SHA256 of downloaded artifacts, for optional integrity checks.

use crate::error::{CivitError, Result};
use sha2::{Digest, Sha256};
use std::io::Read;
use std::path::{Path, PathBuf};

/// Chunk size for reading files (8MB).
const CHUNK_SIZE: usize = 8 * 1024 * 1024;

/// Compute the SHA256 of a file as lowercase hex.
pub fn compute_sha256(path: impl AsRef<Path>) -> Result<String> {
    let path = path.as_ref();
    let mut file = std::fs::File::open(path).map_err(|e| CivitError::io_with_path(e, path))?;

    let mut hasher = Sha256::new();
    let mut buffer = vec![0u8; CHUNK_SIZE];
    loop {
        let bytes_read = file
            .read(&mut buffer)
            .map_err(|e| CivitError::io_with_path(e, path))?;
        if bytes_read == 0 {
            break;
        }
        hasher.update(&buffer[..bytes_read]);
    }

    Ok(hex::encode(hasher.finalize()))
}

/// [`compute_sha256`] on the blocking pool.
pub async fn compute_sha256_async(path: PathBuf) -> Result<String> {
    tokio::task::spawn_blocking(move || compute_sha256(&path))
        .await
        .map_err(|e| CivitError::Other(format!("Hash task failed: {}", e)))?
}

/// Check a file against a published SHA256 (case-insensitive).
pub async fn verify_sha256(path: &Path, expected: &str) -> Result<()> {
    let actual = compute_sha256_async(path.to_path_buf()).await?;
    if actual.eq_ignore_ascii_case(expected) {
        Ok(())
    } else {
        Err(CivitError::HashMismatch {
            path: path.to_path_buf(),
            expected: expected.to_lowercase(),
            actual,
        })
    }
}
