//! Time-to-live in whole seconds.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// How long a value should live, in seconds. Zero means "never expires",
/// which backends interpret as their default retention.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Ttl(u64);

impl Ttl {
    /// No explicit expiry.
    pub const NEVER: Ttl = Ttl(0);

    /// Negative values are clamped to [`Ttl::NEVER`].
    pub fn from_secs(secs: i64) -> Self {
        Ttl(secs.max(0) as u64)
    }

    /// Get the TTL in seconds; 0 for [`Ttl::NEVER`].
    pub fn secs(&self) -> u64 {
        self.0
    }

    /// Whether this TTL means no expiry.
    pub fn is_never(&self) -> bool {
        self.0 == 0
    }

    /// The TTL as a duration, or `None` for [`Ttl::NEVER`].
    pub fn as_duration(&self) -> Option<Duration> {
        if self.is_never() {
            None
        } else {
            Some(Duration::from_secs(self.0))
        }
    }
}

impl From<i64> for Ttl {
    fn from(secs: i64) -> Self {
        Ttl::from_secs(secs)
    }
}

impl From<Duration> for Ttl {
    /// Sub-second remainders round up so a short duration never becomes
    /// [`Ttl::NEVER`].
    fn from(duration: Duration) -> Self {
        let secs = duration.as_secs();
        if duration.subsec_nanos() > 0 {
            Ttl(secs.saturating_add(1))
        } else {
            Ttl(secs)
        }
    }
}
