//! # Beats Utilities
//!
//! Hashing and identifier helpers shared by the pipeline crates.
//!
//! # Best Practices
//!
//! - Uses SHA-2 for content hashing
//! - Uses UUID v4 for user-authored record ids

use sha2::{Digest, Sha256};
use uuid::Uuid;

/// Number of hex characters kept from the SHA-256 of the beats log.
pub const SOURCE_HASH_LEN: usize = 16;

/// Compute SHA-256 hash of content string
///
/// # Examples
///
/// ```
/// use utils::compute_content_hash;
///
/// let hash = compute_content_hash("hello world");
/// assert_eq!(hash.len(), 64);
/// ```
#[must_use]
pub fn compute_content_hash(content: &str) -> String {
    compute_bytes_hash(content.as_bytes())
}

/// Lowercase hex SHA-256 of raw bytes.
#[must_use]
pub fn compute_bytes_hash(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

/// Truncated SHA-256 used to bind a cache to the exact bytes of a log.
///
/// ```
/// use utils::compute_source_hash_bytes;
///
/// assert_eq!(compute_source_hash_bytes(b"").len(), 16);
/// ```
#[must_use]
pub fn compute_source_hash_bytes(bytes: &[u8]) -> String {
    let mut full = compute_bytes_hash(bytes);
    full.truncate(SOURCE_HASH_LEN);
    full
}

/// Generate UUID v4 string
#[must_use]
pub fn generate_uuid() -> String {
    Uuid::new_v4().to_string()
}

/// `{prefix}-{uuid}`, e.g. `chain-6f1c...`.
#[must_use]
pub fn generate_prefixed_id(prefix: &str) -> String {
    format!("{prefix}-{}", generate_uuid())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compute_content_hash_consistency() {
        let content = "test content";
        let hash1 = compute_content_hash(content);
        let hash2 = compute_content_hash(content);
        assert_eq!(hash1, hash2);
    }

    #[test]
    fn test_known_sha256_prefix() {
        assert_eq!(
            compute_source_hash_bytes(b"hello world"),
            "b94d27b9934d3e08"
        );
        assert_eq!(
            compute_bytes_hash(b""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn test_source_hash_changes_with_content() {
        assert_ne!(
            compute_source_hash_bytes(b"{\"id\":\"a\"}\n"),
            compute_source_hash_bytes(b"{\"id\":\"a\"}\n{\"id\":\"b\"}\n")
        );
    }

    #[test]
    fn test_generate_uuid_uniqueness() {
        let uuid1 = generate_uuid();
        let uuid2 = generate_uuid();
        assert_ne!(uuid1, uuid2);
    }

    #[test]
    fn test_prefixed_id() {
        let id = generate_prefixed_id("chain");
        assert!(id.starts_with("chain-"));
        assert_eq!(id.len(), "chain-".len() + 36);
    }
}
