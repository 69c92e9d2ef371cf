//! Namespaced storage-key derivation.
//!
//! Every logical key is hashed together with the store's prefix, so several
//! stores can share one backend without colliding, and every backend sees a
//! fixed-shape key (64 lowercase hex characters) that is safe as a map key,
//! a protocol token and a filename.

use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Inserted between the prefix and the logical key before hashing.
pub const SEPARATOR: &str = "::";

/// Derive the storage key for `key` inside the namespace `prefix`.
///
/// # Example
/// ```
/// use namespaced_cache::key::derive;
///
/// let a = derive("testapp", "fruit");
/// assert_eq!(a, derive("testapp", "fruit"));
/// assert_ne!(a, derive("otherapp", "fruit"));
/// assert_eq!(a.as_str().len(), 64);
/// ```
pub fn derive(prefix: &str, key: &str) -> StorageKey {
    let mut hasher = Sha256::new();
    hasher.update(prefix.as_bytes());
    hasher.update(SEPARATOR.as_bytes());
    hasher.update(key.as_bytes());
    StorageKey(hex::encode(hasher.finalize()))
}

/// The prefix that scopes all keys of one store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Namespace {
    prefix: String,
}

impl Namespace {
    /// Create a namespace for `prefix`.
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    /// Get the prefix.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Derive the storage key for a logical key in this namespace.
    pub fn derive(&self, key: &str) -> StorageKey {
        derive(&self.prefix, key)
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.prefix)
    }
}

/// The hashed, namespaced key that is actually sent to a backend.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StorageKey(String);

impl StorageKey {
    /// The hex digest.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Pick one of `members` pool slots for this key.
    ///
    /// Uses the first eight digest bytes, so the choice is stable across
    /// processes and machines. Returns 0 for an empty pool.
    pub fn shard(&self, members: usize) -> usize {
        if members == 0 {
            return 0;
        }
        let head = u64::from_str_radix(&self.0[..16], 16).unwrap_or_default();
        (head % members as u64) as usize
    }
}

impl AsRef<str> for StorageKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StorageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
