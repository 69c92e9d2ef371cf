//! Segment entry with metadata for TTL and LRU tracking.

use bytes::Bytes;
use std::time::{Duration, Instant};

/// A stored value plus its expiry and last-access time.
#[derive(Debug, Clone)]
pub struct Entry {
    pub(crate) value: Bytes,

    /// `None` means no expiration.
    pub(crate) expires_at: Option<Instant>,

    /// Updated on every hit; drives LRU ordering.
    pub(crate) last_accessed: Instant,
}

impl Entry {
    /// Create an entry that expires `ttl` from now, or never for `None`.
    pub fn new(value: Bytes, ttl: Option<Duration>) -> Self {
        let now = Instant::now();
        Self {
            value,
            expires_at: ttl.map(|ttl| now + ttl),
            last_accessed: now,
        }
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Instant::now())
    }

    pub fn is_expired_at(&self, now: Instant) -> bool {
        match self.expires_at {
            Some(expires) => now >= expires,
            None => false,
        }
    }

    pub fn touch(&mut self) {
        self.last_accessed = Instant::now();
    }

    pub fn value(&self) -> &Bytes {
        &self.value
    }

    /// Time left before expiry at `now`; `None` if the entry never expires.
    pub fn remaining_at(&self, now: Instant) -> Option<Duration> {
        self.expires_at
            .map(|expires| expires.saturating_duration_since(now))
    }

    /// Time since the last hit at `now`.
    pub fn idle_at(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.last_accessed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_without_ttl_never_expires() {
        let entry = Entry::new(Bytes::from("test"), None);
        assert!(!entry.is_expired());
        assert!(entry.remaining_at(Instant::now()).is_none());
    }

    #[test]
    fn test_entry_with_future_expiration() {
        let entry = Entry::new(Bytes::from("test"), Some(Duration::from_secs(60)));
        assert!(!entry.is_expired());
        let remaining = entry.remaining_at(Instant::now()).unwrap();
        assert!(remaining <= Duration::from_secs(60));
        assert!(remaining > Duration::from_secs(58));
    }

    #[test]
    fn test_entry_expires_at_deadline() {
        let entry = Entry::new(Bytes::from("test"), Some(Duration::from_secs(1)));
        let later = Instant::now() + Duration::from_secs(2);
        assert!(entry.is_expired_at(later));
        assert_eq!(entry.remaining_at(later), Some(Duration::ZERO));
    }

    #[test]
    fn test_touch_updates_access_time() {
        let mut entry = Entry::new(Bytes::from("test"), None);
        let initial = entry.last_accessed;

        std::thread::sleep(Duration::from_millis(1));
        entry.touch();

        assert!(entry.last_accessed > initial);
    }
}
