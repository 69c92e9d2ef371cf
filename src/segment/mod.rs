//! The in-process shared memory segment.
//!
//! A [`Segment`] is the medium behind the memory driver and behind the
//! network server. It is a clonable handle: every clone sees the same
//! entries and the same counters. One segment per process can be
//! registered with [`init`] so that independently constructed memory
//! drivers share it, the way several stores share one cache segment.
//!
//! ```
//! use namespaced_cache::segment::Segment;
//! use namespaced_cache::SegmentConfig;
//! use std::time::Duration;
//!
//! let segment = Segment::new(SegmentConfig::new().max_capacity(1000));
//! segment.set("user:123", "Alice").unwrap();
//! segment.set_with_ttl("session:abc", "data", Duration::from_secs(60)).unwrap();
//!
//! assert_eq!(segment.get("user:123").unwrap().as_deref(), Some(&b"Alice"[..]));
//! assert_eq!(segment.stats().hits, 1);
//! ```

mod entry;
mod stats;
mod table;

pub use stats::{SegmentStats, StatsSnapshot};

use bytes::Bytes;
use serde::Serialize;
use std::sync::{Arc, OnceLock};
use std::time::Duration;
use thiserror::Error;

use crate::config::SegmentConfig;
use table::Table;

/// Why the segment refused an operation.
#[derive(Debug, Error)]
pub enum SegmentError {
    /// A thread panicked while holding the table lock.
    #[error("segment lock poisoned")]
    LockPoisoned,

    #[error("value of {size} bytes exceeds the {max} byte limit")]
    ValueTooLarge { size: usize, max: usize },
}

/// Counters, memory use and limits, without any per-entry detail.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SegmentSummary {
    #[serde(flatten)]
    pub stats: StatsSnapshot,
    /// Key plus value bytes across all entries.
    pub memory_bytes: u64,
    pub max_capacity: Option<usize>,
    pub max_value_size: Option<usize>,
    pub default_ttl_secs: Option<u64>,
}

/// Everything the segment knows about itself, including a per-entry listing.
#[derive(Debug, Clone, Serialize)]
pub struct SegmentInfo {
    #[serde(flatten)]
    pub summary: SegmentSummary,
    pub entry_list: Vec<EntryInfo>,
}

/// One stored entry as reported by [`Segment::info`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntryInfo {
    pub key: String,
    pub size: usize,
    pub ttl_remaining_secs: Option<u64>,
    pub idle_secs: u64,
}

/// A thread-safe handle to a memory segment.
#[derive(Debug, Clone)]
pub struct Segment {
    table: Arc<Table>,
}

impl Segment {
    /// Create an empty segment with the given limits.
    pub fn new(config: SegmentConfig) -> Self {
        Self {
            table: Arc::new(Table::new(config)),
        }
    }

    /// The limits this segment was created with.
    pub fn config(&self) -> &SegmentConfig {
        self.table.config()
    }

    /// Returns `None` if the key is absent or expired.
    pub fn get(&self, key: &str) -> Result<Option<Bytes>, SegmentError> {
        self.table.get(key)
    }

    /// Store with the segment's default TTL.
    pub fn set(&self, key: impl Into<String>, value: impl Into<Bytes>) -> Result<(), SegmentError> {
        self.table.set(key.into(), value.into(), None)
    }

    /// Store with an explicit TTL.
    pub fn set_with_ttl(
        &self,
        key: impl Into<String>,
        value: impl Into<Bytes>,
        ttl: Duration,
    ) -> Result<(), SegmentError> {
        self.table.set(key.into(), value.into(), Some(ttl))
    }

    /// Returns `true` if the key existed.
    pub fn delete(&self, key: &str) -> Result<bool, SegmentError> {
        self.table.delete(key)
    }

    /// Does not update LRU order.
    pub fn contains(&self, key: &str) -> Result<bool, SegmentError> {
        self.table.contains(key)
    }

    /// May include expired entries not yet purged.
    pub fn len(&self) -> Result<usize, SegmentError> {
        self.table.len()
    }

    /// Returns `true` if the segment holds no entries.
    pub fn is_empty(&self) -> Result<bool, SegmentError> {
        Ok(self.len()? == 0)
    }

    /// Remove every entry.
    pub fn clear(&self) -> Result<(), SegmentError> {
        self.table.clear()
    }

    /// Get a point-in-time copy of the counters.
    pub fn stats(&self) -> StatsSnapshot {
        self.table.stats().snapshot()
    }

    /// The live counters, for wiring into external metrics.
    pub fn stats_ref(&self) -> Arc<SegmentStats> {
        self.table.stats()
    }

    /// Remove every expired entry now; returns how many were removed.
    pub fn purge_expired(&self) -> Result<usize, SegmentError> {
        self.table.purge_expired()
    }

    /// Counters, memory use and limits. Constant time.
    pub fn summary(&self) -> SegmentSummary {
        self.table.summary()
    }

    /// Full segment report. Cost is linear in the number of entries.
    pub fn info(&self) -> Result<SegmentInfo, SegmentError> {
        self.table.info()
    }
}

impl Default for Segment {
    fn default() -> Self {
        Self::new(SegmentConfig::default())
    }
}

static SHARED: OnceLock<Segment> = OnceLock::new();

/// Register the process-wide segment, or return the one already registered.
///
/// `config` is ignored once a segment exists.
pub fn init(config: SegmentConfig) -> Segment {
    SHARED
        .get_or_init(|| {
            tracing::info!(?config, "initialised shared memory segment");
            Segment::new(config)
        })
        .clone()
}

/// The process-wide segment, if [`init`] has run.
pub fn shared() -> Option<Segment> {
    SHARED.get().cloned()
}
