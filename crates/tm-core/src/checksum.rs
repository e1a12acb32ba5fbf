//! SHA-256 checksum utility for tamper detection.

use sha2::{Digest, Sha256};

/// Length of a hex-encoded checksum.
pub const CHECKSUM_HEX_LEN: usize = 64;

/// Compute the lower-case hex SHA-256 of a string.
pub fn compute_checksum(s: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(s.as_bytes());
    let result = hasher.finalize();
    format!("{:x}", result)
}
