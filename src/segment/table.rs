//! Lock-protected entry table behind a [`Segment`](super::Segment).
//!
//! An `IndexMap` keeps entries in access order: hits move an entry to the
//! back, so the front is always the least recently used.

use bytes::Bytes;
use indexmap::IndexMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::{Duration, Instant};

use super::entry::Entry;
use super::stats::SegmentStats;
use super::{EntryInfo, SegmentError, SegmentInfo, SegmentSummary};
use crate::config::SegmentConfig;

type Entries = IndexMap<String, Entry>;

#[derive(Debug)]
pub(crate) struct Table {
    entries: RwLock<Entries>,
    config: SegmentConfig,
    stats: Arc<SegmentStats>,
    /// Key plus value bytes of every stored entry. Changed only under the
    /// write lock.
    memory_bytes: AtomicU64,
}

fn footprint(key: &str, entry: &Entry) -> u64 {
    (key.len() + entry.value().len()) as u64
}

impl Table {
    pub fn new(config: SegmentConfig) -> Self {
        Self {
            entries: RwLock::new(IndexMap::new()),
            config,
            stats: Arc::new(SegmentStats::new()),
            memory_bytes: AtomicU64::new(0),
        }
    }

    pub fn config(&self) -> &SegmentConfig {
        &self.config
    }

    /// Look up a live entry and mark it most recently used.
    pub fn get(&self, key: &str) -> Result<Option<Bytes>, SegmentError> {
        {
            let entries = self.read_lock()?;
            match entries.get(key) {
                Some(entry) if entry.is_expired() => {
                    drop(entries);
                    self.remove_expired(key)?;
                    self.stats.record_miss();
                    return Ok(None);
                }
                Some(_) => {}
                None => {
                    self.stats.record_miss();
                    return Ok(None);
                }
            }
        }

        // Re-check under the write lock; the entry may have gone or expired
        // meanwhile.
        let mut entries = self.write_lock()?;
        Ok(self.promote(&mut entries, key))
    }

    /// Return a live entry's value and move it to the back of the LRU
    /// order. An expired entry is removed and counts as a miss.
    fn promote(&self, entries: &mut Entries, key: &str) -> Option<Bytes> {
        let Some(idx) = entries.get_index_of(key) else {
            self.stats.record_miss();
            return None;
        };
        if entries[idx].is_expired() {
            self.remove_index(entries, idx);
            self.stats.record_expiration();
            self.stats.record_miss();
            return None;
        }

        let entry = &mut entries[idx];
        entry.touch();
        let value = entry.value().clone();
        let last = entries.len() - 1;
        entries.move_index(idx, last);
        self.stats.record_hit();
        Some(value)
    }

    /// Store `value`; `None` falls back to the configured default TTL.
    pub fn set(&self, key: String, value: Bytes, ttl: Option<Duration>) -> Result<(), SegmentError> {
        if let Some(max) = self.config.max_value_size {
            if value.len() > max {
                self.stats.record_rejection();
                return Err(SegmentError::ValueTooLarge {
                    size: value.len(),
                    max,
                });
            }
        }

        let entry = Entry::new(value, ttl.or(self.config.default_ttl));
        let mut entries = self.write_lock()?;

        let is_new = !entries.contains_key(&key);
        if is_new {
            if let Some(max_capacity) = self.config.max_capacity {
                while entries.len() >= max_capacity && self.evict_one(&mut entries) {}
            }
        }

        let key_len = key.len() as u64;
        self.memory_bytes
            .fetch_add(footprint(&key, &entry), Ordering::Relaxed);
        // Re-inserting keeps the old position; move it to the back as well.
        let (idx, previous) = entries.insert_full(key, entry);
        if let Some(previous) = previous {
            self.memory_bytes.fetch_sub(
                key_len + previous.value().len() as u64,
                Ordering::Relaxed,
            );
        }
        let last = entries.len() - 1;
        entries.move_index(idx, last);

        if is_new {
            self.stats.increment_size();
        }
        self.stats.record_set();
        Ok(())
    }

    /// Returns whether the key was present.
    pub fn delete(&self, key: &str) -> Result<bool, SegmentError> {
        let mut entries = self.write_lock()?;
        let Some(idx) = entries.get_index_of(key) else {
            return Ok(false);
        };
        self.remove_index(&mut entries, idx);
        self.stats.record_delete();
        Ok(true)
    }

    /// Presence check that honours expiry but does not touch LRU order.
    pub fn contains(&self, key: &str) -> Result<bool, SegmentError> {
        let entries = self.read_lock()?;
        match entries.get(key) {
            Some(entry) if entry.is_expired() => {
                drop(entries);
                self.remove_expired(key)?;
                Ok(false)
            }
            Some(_) => Ok(true),
            None => Ok(false),
        }
    }

    pub fn len(&self) -> Result<usize, SegmentError> {
        Ok(self.read_lock()?.len())
    }

    pub fn clear(&self) -> Result<(), SegmentError> {
        let mut entries = self.write_lock()?;
        entries.clear();
        self.memory_bytes.store(0, Ordering::Relaxed);
        self.stats.set_size(0);
        Ok(())
    }

    pub fn stats(&self) -> Arc<SegmentStats> {
        Arc::clone(&self.stats)
    }

    /// Drop every expired entry; returns how many were removed.
    pub fn purge_expired(&self) -> Result<usize, SegmentError> {
        let mut entries = self.write_lock()?;
        let initial_len = entries.len();
        let now = Instant::now();

        entries.retain(|key, entry| {
            let expired = entry.is_expired_at(now);
            if expired {
                self.memory_bytes
                    .fetch_sub(footprint(key, entry), Ordering::Relaxed);
                self.stats.record_expiration();
                self.stats.decrement_size();
            }
            !expired
        });

        Ok(initial_len - entries.len())
    }

    /// Counters, memory use and limits. Constant time; no lock is taken.
    pub fn summary(&self) -> SegmentSummary {
        SegmentSummary {
            stats: self.stats.snapshot(),
            memory_bytes: self.memory_bytes.load(Ordering::Relaxed),
            max_capacity: self.config.max_capacity,
            max_value_size: self.config.max_value_size,
            default_ttl_secs: self.config.default_ttl.map(|d| d.as_secs()),
        }
    }

    /// The summary plus one [`EntryInfo`] per stored entry.
    pub fn info(&self) -> Result<SegmentInfo, SegmentError> {
        let entries = self.read_lock()?;
        let now = Instant::now();

        let entry_list = entries
            .iter()
            .map(|(key, entry)| EntryInfo {
                key: key.clone(),
                size: entry.value().len(),
                ttl_remaining_secs: entry.remaining_at(now).map(|d| d.as_secs()),
                idle_secs: entry.idle_at(now).as_secs(),
            })
            .collect();

        Ok(SegmentInfo {
            summary: self.summary(),
            entry_list,
        })
    }

    fn read_lock(&self) -> Result<RwLockReadGuard<'_, Entries>, SegmentError> {
        self.entries.read().map_err(|_| SegmentError::LockPoisoned)
    }

    fn write_lock(&self) -> Result<RwLockWriteGuard<'_, Entries>, SegmentError> {
        self.entries.write().map_err(|_| SegmentError::LockPoisoned)
    }

    fn remove_expired(&self, key: &str) -> Result<(), SegmentError> {
        let mut entries = self.write_lock()?;
        if let Some(idx) = entries.get_index_of(key) {
            if entries[idx].is_expired() {
                self.remove_index(&mut entries, idx);
                self.stats.record_expiration();
            }
        }
        Ok(())
    }

    /// Remove the least recently used entry; `false` if there was none.
    fn evict_one(&self, entries: &mut Entries) -> bool {
        if entries.is_empty() {
            return false;
        }
        self.remove_index(entries, 0);
        self.stats.record_eviction();
        true
    }

    fn remove_index(&self, entries: &mut Entries, idx: usize) {
        if let Some((key, entry)) = entries.shift_remove_index(idx) {
            self.memory_bytes
                .fetch_sub(footprint(&key, &entry), Ordering::Relaxed);
            self.stats.decrement_size();
        }
    }
}
