//! Configuration for the memory segment and for each driver.
//!
//! The segment and network settings use the builder pattern; every config
//! is serde-(de)serializable so a [`DriverConfig`] can be read from JSON
//! and turned into a driver at startup.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::driver::{Driver, Endpoint, FileDriver, MemoryDriver, NetworkDriver};
use crate::error::{StoreError, StoreResult};
use crate::segment;

/// Configuration for the in-process memory segment.
///
/// ```
/// use namespaced_cache::SegmentConfig;
/// use std::time::Duration;
///
/// let config = SegmentConfig::new()
///     .max_capacity(10_000)
///     .default_ttl(Duration::from_secs(300))
///     .max_value_size(1024 * 1024)
///     .build();
/// assert_eq!(config.get_max_capacity(), Some(10_000));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SegmentConfig {
    /// Maximum number of entries; the least recently used entry is evicted
    /// when full. `None` means unlimited.
    #[serde(deserialize_with = "opt_limit::deserialize")]
    pub(crate) max_capacity: Option<usize>,

    /// Retention applied to entries stored with `Ttl::NEVER`.
    /// `None` keeps them until deleted or evicted.
    #[serde(with = "opt_secs")]
    pub(crate) default_ttl: Option<Duration>,

    /// Writes with a larger value are rejected. `None` means no limit.
    #[serde(deserialize_with = "opt_limit::deserialize")]
    pub(crate) max_value_size: Option<usize>,
}

impl SegmentConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the maximum number of entries. 0 means unlimited.
    pub fn max_capacity(mut self, capacity: usize) -> Self {
        self.max_capacity = if capacity == 0 { None } else { Some(capacity) };
        self
    }

    /// Set the retention for entries stored without a TTL.
    /// `Duration::ZERO` disables it.
    pub fn default_ttl(mut self, ttl: Duration) -> Self {
        self.default_ttl = if ttl.is_zero() { None } else { Some(ttl) };
        self
    }

    /// Reject values larger than `bytes`. 0 means no limit.
    pub fn max_value_size(mut self, bytes: usize) -> Self {
        self.max_value_size = if bytes == 0 { None } else { Some(bytes) };
        self
    }

    pub fn build(self) -> Self {
        self
    }

    pub fn get_max_capacity(&self) -> Option<usize> {
        self.max_capacity
    }

    pub fn get_default_ttl(&self) -> Option<Duration> {
        self.default_ttl
    }

    pub fn get_max_value_size(&self) -> Option<usize> {
        self.max_value_size
    }
}

/// Settings for the network driver's client side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Ordered server pool. Empty means the single default endpoint.
    pub(crate) endpoints: Vec<Endpoint>,

    #[serde(with = "secs")]
    pub(crate) connect_timeout: Duration,

    /// Covers writing the request and reading the whole reply.
    #[serde(with = "secs")]
    pub(crate) request_timeout: Duration,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            endpoints: Vec::new(),
            connect_timeout: Duration::from_secs(1),
            request_timeout: Duration::from_secs(3),
        }
    }
}

impl NetworkConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a server to the pool.
    pub fn endpoint(mut self, endpoint: Endpoint) -> Self {
        self.endpoints.push(endpoint);
        self
    }

    /// Replace the whole pool.
    pub fn endpoints(mut self, endpoints: impl IntoIterator<Item = Endpoint>) -> Self {
        self.endpoints = endpoints.into_iter().collect();
        self
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn build(self) -> Self {
        self
    }

    /// The pool with the default endpoint filled in when none was given.
    pub fn get_endpoints(&self) -> Vec<Endpoint> {
        if self.endpoints.is_empty() {
            vec![Endpoint::default()]
        } else {
            self.endpoints.clone()
        }
    }

    pub fn get_connect_timeout(&self) -> Duration {
        self.connect_timeout
    }

    pub fn get_request_timeout(&self) -> Duration {
        self.request_timeout
    }
}

/// Settings for the file driver.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    /// Directory that holds one subdirectory per prefix.
    /// `None` uses the system temporary directory.
    pub(crate) root: Option<PathBuf>,
}

impl FileConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn root(mut self, root: impl Into<PathBuf>) -> Self {
        self.root = Some(root.into());
        self
    }

    pub fn get_root(&self) -> PathBuf {
        self.root.clone().unwrap_or_else(std::env::temp_dir)
    }
}

/// Which driver to build, with its settings.
///
/// ```
/// use namespaced_cache::{DriverConfig, DriverKind};
///
/// let config = DriverConfig::from_json(
///     r#"{"driver": "network", "endpoints": ["10.0.0.1:3000", "10.0.0.2:3000"]}"#,
/// )
/// .unwrap();
/// assert_eq!(config.kind(), DriverKind::Network);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "driver", rename_all = "lowercase")]
pub enum DriverConfig {
    Memory(SegmentConfig),
    Network(NetworkConfig),
    File(FileConfig),
}

impl DriverConfig {
    /// Parse a config document.
    ///
    /// Malformed documents are reported as `InvalidInput`.
    pub fn from_json(document: &str) -> StoreResult<Self> {
        serde_json::from_str(document).map_err(|err| {
            tracing::debug!(error = %err, "rejected driver config");
            StoreError::InvalidInput("malformed driver config")
        })
    }

    pub fn kind(&self) -> crate::DriverKind {
        match self {
            DriverConfig::Memory(_) => crate::DriverKind::Memory,
            DriverConfig::Network(_) => crate::DriverKind::Network,
            DriverConfig::File(_) => crate::DriverKind::File,
        }
    }

    /// Build the configured driver for `prefix`.
    ///
    /// The memory variant initialises the process-wide segment with its
    /// settings if nothing has initialised it yet.
    pub fn connect(self, prefix: &str) -> StoreResult<Box<dyn Driver>> {
        let driver: Box<dyn Driver> = match self {
            DriverConfig::Memory(config) => {
                let active = segment::init(config.clone());
                if active.config() != &config {
                    tracing::warn!(
                        requested = ?config,
                        active = ?active.config(),
                        "shared memory segment already initialised, ignoring requested config"
                    );
                }
                Box::new(MemoryDriver::attach(prefix)?)
            }
            DriverConfig::Network(config) => Box::new(NetworkDriver::with_config(prefix, config)?),
            DriverConfig::File(config) => {
                Box::new(FileDriver::with_root(prefix, config.get_root())?)
            }
        };
        Ok(driver)
    }
}

mod secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_secs)
    }
}

/// An optional limit where 0, like a missing value, means unlimited.
mod opt_limit {
    use serde::{Deserialize, Deserializer};

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<usize>, D::Error> {
        Ok(Option::<usize>::deserialize(deserializer)?.filter(|limit| *limit > 0))
    }
}

mod opt_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(
        value: &Option<Duration>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(duration) => serializer.serialize_some(&duration.as_secs()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Duration>, D::Error> {
        Ok(Option::<u64>::deserialize(deserializer)?
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs))
    }
}
