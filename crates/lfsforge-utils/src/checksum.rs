//! Checksum algorithm inference and verification:
//! "64+ hex chars -> SHA-256; 32 hex chars -> MD5; any other ->
//! unverifiable".

use sha2::{Digest, Sha256};
use std::fmt;
use std::io::Read;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChecksumAlgo {
    Sha256,
    Md5,
}

impl fmt::Display for ChecksumAlgo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChecksumAlgo::Sha256 => f.write_str("sha256"),
            ChecksumAlgo::Md5 => f.write_str("md5"),
        }
    }
}

/// Infer a checksum's algorithm from its hex length, or `None` if it's
/// unverifiable (neither 64 nor 32 hex characters).
pub fn infer_algo(checksum: &str) -> Option<ChecksumAlgo> {
    let is_hex = !checksum.is_empty() && checksum.chars().all(|c| c.is_ascii_hexdigit());
    if !is_hex {
        return None;
    }
    match checksum.len() {
        n if n >= 64 => Some(ChecksumAlgo::Sha256),
        32 => Some(ChecksumAlgo::Md5),
        _ => None,
    }
}

/// Compute a file's digest under the given algorithm, as lowercase hex.
pub fn digest_file(path: &Path, algo: ChecksumAlgo) -> std::io::Result<String> {
    let mut file = std::fs::File::open(path)?;
    let mut buf = [0u8; 64 * 1024];
    match algo {
        ChecksumAlgo::Sha256 => {
            let mut hasher = Sha256::new();
            loop {
                let n = file.read(&mut buf)?;
                if n == 0 {
                    break;
                }
                hasher.update(&buf[..n]);
            }
            Ok(hex::encode(hasher.finalize()))
        }
        ChecksumAlgo::Md5 => {
            let mut hasher = md5::Md5::new();
            loop {
                let n = file.read(&mut buf)?;
                if n == 0 {
                    break;
                }
                hasher.update(&buf[..n]);
            }
            Ok(hex::encode(hasher.finalize()))
        }
    }
}

/// Verify `path`'s digest against `expected`, inferring the algorithm
/// from `expected`'s shape. Returns `Ok(true)` on match, `Ok(false)` on
/// mismatch, `Err` if the checksum is unverifiable or I/O fails.
pub fn verify_file(path: &Path, expected: &str) -> Result<bool, VerifyError> {
    let algo = infer_algo(expected).ok_or_else(|| VerifyError::Unsupported(expected.to_string()))?;
    let actual = digest_file(path, algo)?;
    Ok(actual.eq_ignore_ascii_case(expected))
}

#[derive(Debug, thiserror::Error)]
pub enum VerifyError {
    #[error("unsupported checksum format: '{0}'")]
    Unsupported(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn infers_sha256_from_64_hex_chars() {
        let sum = "a".repeat(64);
        assert_eq!(infer_algo(&sum), Some(ChecksumAlgo::Sha256));
    }

    #[test]
    fn infers_md5_from_32_hex_chars() {
        let sum = "b".repeat(32);
        assert_eq!(infer_algo(&sum), Some(ChecksumAlgo::Md5));
    }

    #[test]
    fn rejects_non_hex_or_odd_lengths() {
        assert_eq!(infer_algo("not-hex-at-all"), None);
        assert_eq!(infer_algo(&"c".repeat(40)), None);
    }

    #[test]
    fn verifies_matching_digest() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("f");
        std::fs::write(&path, b"hello world").unwrap();
        let expected = digest_file(&path, ChecksumAlgo::Sha256).unwrap();
        assert!(verify_file(&path, &expected).unwrap());
    }

    #[test]
    fn detects_mismatch() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("f");
        std::fs::write(&path, b"hello world").unwrap();
        let wrong = "f".repeat(64);
        assert!(!verify_file(&path, &wrong).unwrap());
    }
}
