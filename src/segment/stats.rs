//! Atomic counters for segment operations.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Counters shared by every handle to one segment.
///
/// All counters use relaxed atomics; a [`StatsSnapshot`] is consistent per
/// field, not across fields.
#[derive(Debug, Default)]
pub struct SegmentStats {
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
    expirations: AtomicU64,
    size: AtomicU64,
    sets: AtomicU64,
    deletes: AtomicU64,
    /// Writes refused by the segment (oversized value).
    rejections: AtomicU64,
}

impl SegmentStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_eviction(&self) {
        self.evictions.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_expiration(&self) {
        self.expirations.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_set(&self) {
        self.sets.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_delete(&self) {
        self.deletes.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_rejection(&self) {
        self.rejections.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_size(&self) {
        self.size.fetch_add(1, Ordering::Relaxed);
    }

    pub fn decrement_size(&self) {
        self.size.fetch_sub(1, Ordering::Relaxed);
    }

    pub fn set_size(&self, size: u64) {
        self.size.store(size, Ordering::Relaxed);
    }

    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }

    pub fn size(&self) -> u64 {
        self.size.load(Ordering::Relaxed)
    }

    /// Hit rate as a percentage (0.0 to 100.0); 0.0 before any lookup.
    pub fn hit_rate(&self) -> f64 {
        let hits = self.hits();
        let total = hits + self.misses();
        if total == 0 {
            0.0
        } else {
            (hits as f64 / total as f64) * 100.0
        }
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            hits: self.hits(),
            misses: self.misses(),
            evictions: self.evictions.load(Ordering::Relaxed),
            expirations: self.expirations.load(Ordering::Relaxed),
            size: self.size(),
            sets: self.sets.load(Ordering::Relaxed),
            deletes: self.deletes.load(Ordering::Relaxed),
            rejections: self.rejections.load(Ordering::Relaxed),
            hit_rate: self.hit_rate(),
        }
    }
}

/// Plain-value copy of [`SegmentStats`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatsSnapshot {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub expirations: u64,
    pub size: u64,
    pub sets: u64,
    pub deletes: u64,
    pub rejections: u64,
    pub hit_rate: f64,
}

impl StatsSnapshot {
    /// `(name, value)` pairs in a stable order, as sent by the server's
    /// `stats` reply.
    pub fn pairs(&self) -> Vec<(&'static str, String)> {
        vec![
            ("hits", self.hits.to_string()),
            ("misses", self.misses.to_string()),
            ("evictions", self.evictions.to_string()),
            ("expirations", self.expirations.to_string()),
            ("size", self.size.to_string()),
            ("sets", self.sets.to_string()),
            ("deletes", self.deletes.to_string()),
            ("rejections", self.rejections.to_string()),
            ("hit_rate", format!("{:.1}", self.hit_rate)),
        ]
    }
}
