//! Content addressing for fetched artifacts
//!
//! A reference URL maps to a stable storage key so that repeated sweeps
//! land on the same file instead of inventing ad hoc names. The key is a
//! pure function of the URL bytes; the algorithm itself is not a
//! compatibility contract, only determinism is.

use sha2::{Digest, Sha256};

/// Derive the storage key for a reference URL.
///
/// Same URL in, same key out, across processes and runs.
pub fn artifact_key(url: &str) -> String {
    hex::encode(Sha256::digest(url.as_bytes()))
}
