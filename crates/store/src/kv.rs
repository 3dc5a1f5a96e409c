//! The abstract key-value store.

use crate::{StoreError, StoreResult, MAX_KEY_LEN};
use std::future::Future;

/// A persistent string-keyed store of JSON documents.
///
/// Implementations are expected to be single-process. Concurrency control across
/// read-modify-write sequences is the caller's job; a single `set` must however either fully
/// replace the previous value or leave it untouched.
pub trait KeyValueStore: Send + Sync {
    /// Returns the raw document stored under `key`, or `None` when the key was never written.
    fn get(&self, key: &str) -> impl Future<Output = StoreResult<Option<String>>> + Send;

    /// Replaces the document stored under `key`.
    fn set(&self, key: &str, value: String) -> impl Future<Output = StoreResult<()>> + Send;

    /// Removes `key`. Removing a missing key is not an error.
    fn remove(&self, key: &str) -> impl Future<Output = StoreResult<()>> + Send;

    /// Removes every key.
    fn clear(&self) -> impl Future<Output = StoreResult<()>> + Send;
}

/// Validates that a key is safe to use as a storage name.
///
/// Keys map directly onto file names in [`crate::FileStore`], so they are restricted to a
/// conservative ASCII set that cannot express a path:
/// - non-empty and at most [`MAX_KEY_LEN`] characters
/// - only `a-z`, `A-Z`, `0-9`, `_` and `-`
///
/// # Errors
///
/// Returns [`StoreError::InvalidKey`] if the key is invalid.
pub fn validate_key(key: &str) -> StoreResult<()> {
    if key.is_empty() {
        return Err(StoreError::InvalidKey("key cannot be empty".into()));
    }

    if key.len() > MAX_KEY_LEN {
        return Err(StoreError::InvalidKey(format!(
            "key exceeds maximum length of {} characters",
            MAX_KEY_LEN
        )));
    }

    let ok = key
        .bytes()
        .all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'z' | b'A'..=b'Z' | b'_' | b'-'));

    if !ok {
        return Err(StoreError::InvalidKey(format!(
            "'{}' contains invalid characters (only alphanumeric, '_', '-' allowed)",
            key
        )));
    }

    Ok(())
}
