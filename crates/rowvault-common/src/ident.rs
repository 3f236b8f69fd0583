//! Deterministic upload identifiers
//!
//! An upload id is derived from the file's name, byte size, and
//! last-modified timestamp, so re-selecting an unchanged file resolves
//! to the same FileEntry instead of creating a duplicate.

use sha2::{Digest, Sha256};

/// Compute the id for an upload from its observable metadata.
///
/// The three inputs are length-delimited before hashing so that
/// adjacent fields cannot collide by concatenation.
pub fn upload_id(name: &str, size: u64, last_modified_ms: i64) -> String {
    let mut hasher = Sha256::new();
    hasher.update((name.len() as u64).to_le_bytes());
    hasher.update(name.as_bytes());
    hasher.update(size.to_le_bytes());
    hasher.update(last_modified_ms.to_le_bytes());
    let digest = hasher.finalize();
    // 128 bits is plenty for a single-user store
    hex::encode(&digest[..16])
}
