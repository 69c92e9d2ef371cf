//! The driver capability contract and its three backends.
//!
//! A driver implements four primitives over an already-derived
//! [`StorageKey`]. The caller-facing operations (`set`, `get`, `exist`,
//! `delete`) are provided methods: they reject empty input, derive the
//! namespaced key and only then call the primitive, so every backend gets
//! identical input handling.
//!
//! | driver | medium | `exist` | TTL |
//! |---|---|---|---|
//! | [`MemoryDriver`] | shared in-process [`Segment`](crate::segment::Segment) | [`Existence::Accurate`] | enforced |
//! | [`NetworkDriver`] | pool of cache servers | [`Existence::Assumed`] | enforced by the server |
//! | [`FileDriver`] | `<temp>/<prefix>/` | [`Existence::Assumed`] | **not enforced** |

mod file;
mod memory;
mod network;

pub use file::FileDriver;
pub use memory::{CacheInfo, MemoryDriver};
pub use network::{Endpoint, NetworkDriver};

use std::fmt;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::error::StoreResult;
use crate::key::{Namespace, StorageKey};
use crate::normalize::{self, Op};
use crate::ttl::Ttl;

/// Which backend a driver talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DriverKind {
    Memory,
    Network,
    File,
}

impl DriverKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DriverKind::Memory => "memory",
            DriverKind::Network => "network",
            DriverKind::File => "file",
        }
    }
}

impl fmt::Display for DriverKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How much an `exist` answer from a driver can be trusted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Existence {
    /// Reflects true presence, including TTL expiry.
    Accurate,
    /// The backend has no existence primitive; `exist` answers `true` for
    /// every non-empty key. Use `get` and treat `None` as absence instead.
    Assumed,
}

/// A key-value backend.
///
/// Implementors provide the primitives; callers use the provided
/// operations. Primitives never see an empty key or an empty value.
pub trait Driver: Send + Sync {
    fn kind(&self) -> DriverKind;

    fn namespace(&self) -> &Namespace;

    fn existence(&self) -> Existence;

    /// Write `value` under `key` for `ttl`.
    fn store(&self, key: &StorageKey, value: Bytes, ttl: Ttl) -> StoreResult<()>;

    /// `Ok(None)` for an absent key.
    fn fetch(&self, key: &StorageKey) -> StoreResult<Option<Bytes>>;

    fn contains(&self, key: &StorageKey) -> StoreResult<bool>;

    /// Must succeed for an absent key.
    fn remove(&self, key: &StorageKey) -> StoreResult<()>;

    /// Store a value. Returns `Ok(false)` without touching the backend if
    /// the key or the value is empty.
    fn set(&self, key: &str, value: Bytes, ttl: Ttl) -> StoreResult<bool> {
        let Some(storage_key) =
            normalize::admit(self.namespace(), self.kind(), Op::Set, key, Some(&value[..]))
        else {
            return Ok(false);
        };
        tracing::trace!(driver = %self.kind(), key = %storage_key, ttl = ttl.secs(), "set");
        self.store(&storage_key, value, ttl)?;
        Ok(true)
    }

    /// Fetch a value. Returns `Ok(None)` for an absent or empty key.
    fn get(&self, key: &str) -> StoreResult<Option<Bytes>> {
        let Some(storage_key) = normalize::admit(self.namespace(), self.kind(), Op::Get, key, None)
        else {
            return Ok(None);
        };
        tracing::trace!(driver = %self.kind(), key = %storage_key, "get");
        self.fetch(&storage_key)
    }

    /// Check for a key. See [`Driver::existence`] for how far the answer
    /// can be trusted. Returns `Ok(false)` for an empty key.
    fn exist(&self, key: &str) -> StoreResult<bool> {
        let Some(storage_key) =
            normalize::admit(self.namespace(), self.kind(), Op::Exist, key, None)
        else {
            return Ok(false);
        };
        tracing::trace!(driver = %self.kind(), key = %storage_key, "exist");
        self.contains(&storage_key)
    }

    /// Remove a key; absent keys are not an error. Returns `Ok(false)`
    /// without touching the backend for an empty key.
    fn delete(&self, key: &str) -> StoreResult<bool> {
        let Some(storage_key) =
            normalize::admit(self.namespace(), self.kind(), Op::Delete, key, None)
        else {
            return Ok(false);
        };
        tracing::trace!(driver = %self.kind(), key = %storage_key, "delete");
        self.remove(&storage_key)?;
        Ok(true)
    }
}

impl<D: Driver + ?Sized> Driver for Box<D> {
    fn kind(&self) -> DriverKind {
        (**self).kind()
    }

    fn namespace(&self) -> &Namespace {
        (**self).namespace()
    }

    fn existence(&self) -> Existence {
        (**self).existence()
    }

    fn store(&self, key: &StorageKey, value: Bytes, ttl: Ttl) -> StoreResult<()> {
        (**self).store(key, value, ttl)
    }

    fn fetch(&self, key: &StorageKey) -> StoreResult<Option<Bytes>> {
        (**self).fetch(key)
    }

    fn contains(&self, key: &StorageKey) -> StoreResult<bool> {
        (**self).contains(key)
    }

    fn remove(&self, key: &StorageKey) -> StoreResult<()> {
        (**self).remove(key)
    }
}
