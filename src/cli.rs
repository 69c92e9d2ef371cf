//! Command-line interface definitions.
//!
//! This module defines the arguments of the cache server binary using clap.

use std::time::Duration;

use clap::Parser;

use crate::config::SegmentConfig;

/// Cache server for the network driver.
///
/// Serves one in-memory segment over TCP.
#[derive(Parser, Debug)]
#[command(name = "cache-server")]
#[command(author, version, about, long_about = None)]
pub struct ServerArgs {
    /// Address to bind.
    #[arg(long, default_value = "127.0.0.1")]
    pub host: String,

    /// Port to listen on.
    #[arg(long, short, default_value_t = 3000)]
    pub port: u16,

    /// Maximum number of entries before LRU eviction. 0 means unbounded.
    #[arg(long, default_value_t = 10_000)]
    pub max_capacity: usize,

    /// TTL in seconds applied to entries stored without one. 0 means none.
    #[arg(long, default_value_t = 0)]
    pub default_ttl: u64,

    /// Largest accepted value in bytes. 0 means unlimited.
    #[arg(long, default_value_t = 0)]
    pub max_value_size: usize,

    /// Seconds between sweeps that purge expired entries. 0 disables them.
    #[arg(long, default_value_t = 60)]
    pub sweep_interval: u64,
}

impl ServerArgs {
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn segment_config(&self) -> SegmentConfig {
        SegmentConfig::new()
            .max_capacity(self.max_capacity)
            .default_ttl(Duration::from_secs(self.default_ttl))
            .max_value_size(self.max_value_size)
            .build()
    }

    pub fn sweep_interval(&self) -> Option<Duration> {
        (self.sweep_interval > 0).then(|| Duration::from_secs(self.sweep_interval))
    }
}
