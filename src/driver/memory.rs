//! Driver over the in-process shared memory segment.

use std::collections::BTreeMap;

use bytes::Bytes;

use super::{Driver, DriverKind, Existence};
use crate::error::StoreResult;
use crate::key::{Namespace, StorageKey};
use crate::normalize::{self, Op};
use crate::segment::{self, Segment};
use crate::ttl::Ttl;

/// Segment statistics by name.
pub type CacheInfo = BTreeMap<String, serde_json::Value>;

/// Stores values in a [`Segment`] shared by every memory driver of the
/// process.
///
/// `exist` is [`Existence::Accurate`] and honours TTL expiry. `Ttl::NEVER`
/// means the segment's default TTL, which may itself be finite.
#[derive(Debug, Clone)]
pub struct MemoryDriver {
    namespace: Namespace,
    segment: Segment,
}

impl MemoryDriver {
    /// Bind to an explicit segment.
    pub fn new(prefix: impl Into<String>, segment: Segment) -> Self {
        Self {
            namespace: Namespace::new(prefix),
            segment,
        }
    }

    /// Bind to the process-wide segment.
    ///
    /// Fails with `BackendUnavailable` if [`segment::init`] has not run.
    pub fn attach(prefix: impl Into<String>) -> StoreResult<Self> {
        let segment = segment::shared().ok_or_else(|| {
            normalize::unavailable(DriverKind::Memory, "shared memory segment is not initialised")
        })?;
        let driver = Self::new(prefix, segment);
        tracing::info!(prefix = %driver.namespace, "memory driver attached");
        Ok(driver)
    }

    /// Get the segment this driver writes to.
    pub fn segment(&self) -> &Segment {
        &self.segment
    }

    /// Usage statistics for the whole segment.
    ///
    /// The numbers cover every store sharing the segment, not just this
    /// driver's prefix. Built from [`Segment::summary`], so the cost does
    /// not grow with the number of entries.
    pub fn cache_info(&self) -> StoreResult<CacheInfo> {
        let value = serde_json::to_value(self.segment.summary())
            .map_err(|e| normalize::fault(DriverKind::Memory, Op::Info, e))?;

        let serde_json::Value::Object(fields) = value else {
            return Ok(CacheInfo::new());
        };
        Ok(fields.into_iter().collect())
    }
}

impl Driver for MemoryDriver {
    fn kind(&self) -> DriverKind {
        DriverKind::Memory
    }

    fn namespace(&self) -> &Namespace {
        &self.namespace
    }

    fn existence(&self) -> Existence {
        Existence::Accurate
    }

    fn store(&self, key: &StorageKey, value: Bytes, ttl: Ttl) -> StoreResult<()> {
        let result = match ttl.as_duration() {
            Some(ttl) => self.segment.set_with_ttl(key.as_str(), value, ttl),
            None => self.segment.set(key.as_str(), value),
        };
        result.map_err(|e| normalize::fault(DriverKind::Memory, Op::Set, e))
    }

    fn fetch(&self, key: &StorageKey) -> StoreResult<Option<Bytes>> {
        self.segment
            .get(key.as_str())
            .map_err(|e| normalize::fault(DriverKind::Memory, Op::Get, e))
    }

    fn contains(&self, key: &StorageKey) -> StoreResult<bool> {
        self.segment
            .contains(key.as_str())
            .map_err(|e| normalize::fault(DriverKind::Memory, Op::Exist, e))
    }

    fn remove(&self, key: &StorageKey) -> StoreResult<()> {
        self.segment
            .delete(key.as_str())
            .map(|_| ())
            .map_err(|e| normalize::fault(DriverKind::Memory, Op::Delete, e))
    }
}
