//! Streaming content hashing for weight files.
//!
//! SHA-256 over the full file content, read in fixed-size blocks so
//! memory use stays bounded for multi-gigabyte files. The lowercase hex
//! digest is the content-addressed identity key the catalog's by-hash
//! lookup expects.

use crate::error::{MirrorError, Result};
use sha2::{Digest, Sha256};
use std::io::Read;
use std::path::Path;

/// Block size for reading files (8MB).
const CHUNK_SIZE: usize = 8 * 1024 * 1024;

/// Compute the SHA-256 of a file as a lowercase hex string.
pub fn compute_sha256(path: impl AsRef<Path>) -> Result<String> {
    let path = path.as_ref();
    let mut file = std::fs::File::open(path).map_err(|e| MirrorError::io_with_path(e, path))?;

    let mut hasher = Sha256::new();
    let mut buffer = vec![0u8; CHUNK_SIZE];
    loop {
        let bytes_read = file
            .read(&mut buffer)
            .map_err(|e| MirrorError::io_with_path(e, path))?;
        if bytes_read == 0 {
            break;
        }
        hasher.update(&buffer[..bytes_read]);
    }

    Ok(hex::encode(hasher.finalize()))
}

/// Async wrapper around [`compute_sha256`].
///
/// Hashing is CPU- and disk-bound, so it runs on the blocking pool.
pub async fn compute_sha256_async(path: impl AsRef<Path>) -> Result<String> {
    let path = path.as_ref().to_path_buf();
    tokio::task::spawn_blocking(move || compute_sha256(&path))
        .await
        .map_err(|e| MirrorError::Other(format!("Hash computation task failed: {}", e)))?
}
