//! Archive digest verification
//!
//! Streams files through a SHA-1 accumulator and compares the hex digest
//! against the pinned value published by the registry.

use sha1::{Digest, Sha1};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use thiserror::Error;

/// Errors that can occur while verifying a downloaded archive
#[derive(Debug, Error)]
pub enum ChecksumError {
    /// IO error reading the file
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Checksum mismatch
    #[error("Checksum mismatch: expected {expected}, got {actual}")]
    Mismatch { expected: String, actual: String },
}

/// Read buffer size for streaming digests. Not part of the contract.
const CHUNK_SIZE: usize = 8192;

/// Compute the SHA-1 digest of a file, hex-encoded.
///
/// The file is read in fixed-size chunks so large archives are never
/// buffered in memory.
pub fn file_sha1_hex(path: &Path) -> Result<String, ChecksumError> {
    let mut file = File::open(path)?;
    let mut hasher = Sha1::new();
    let mut buf = [0u8; CHUNK_SIZE];

    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }

    Ok(hex::encode(hasher.finalize()))
}

/// Verify a file against an expected lowercase hex SHA-1 digest.
pub fn verify_file(path: &Path, expected: &str) -> Result<(), ChecksumError> {
    let actual = file_sha1_hex(path)?;

    if actual != expected {
        return Err(ChecksumError::Mismatch {
            expected: expected.to_string(),
            actual,
        });
    }

    Ok(())
}

/// Compute the SHA-1 digest of a byte slice, hex-encoded.
pub fn sha1_hex(data: &[u8]) -> String {
    hex::encode(Sha1::digest(data))
}
