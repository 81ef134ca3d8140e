//! Content digests for uploaded bundles.

use sha2::{Digest, Sha256};

/// SHA-256 hex digest of raw archive bytes.
///
/// Recorded on the job at submission so a given upload can be correlated
/// across resubmissions and log lines.
pub fn bundle_digest(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}
