//! # Namespaced Cache
//!
//! A key-value cache facade with one API over three interchangeable
//! backends. Every key is scoped by a store-wide prefix and hashed before it
//! reaches the backend, so stores with different prefixes never collide even
//! when they share a medium.
//!
//! ## Features
//!
//! - **One contract**: `set`, `get`, `exist` and `delete` behave the same on
//!   every driver, including rejection of empty keys and values
//! - **Memory driver**: a shared in-process segment with TTL expiry and LRU eviction
//! - **Network driver**: a pool of cache servers speaking a small text protocol
//! - **File driver**: one file per key under a per-prefix directory
//! - **Typed errors**: backend faults are classified as storage or retrieval failures
//!
//! ## Quick Start
//!
//! ```rust
//! use namespaced_cache::{segment, MemoryDriver, SegmentConfig, Store, Ttl};
//! use std::time::Duration;
//!
//! // The memory driver needs the process-wide segment.
//! segment::init(
//!     SegmentConfig::new()
//!         .max_capacity(10_000)
//!         .default_ttl(Duration::from_secs(300))
//!         .build(),
//! );
//!
//! let store = Store::new(MemoryDriver::attach("testapp").unwrap());
//!
//! store.set("fruit", "apple", Ttl::NEVER).unwrap();
//! assert_eq!(store.get("fruit").unwrap().as_deref(), Some(&b"apple"[..]));
//!
//! store.delete("fruit").unwrap();
//! assert_eq!(store.get("fruit").unwrap(), None);
//! ```
//!
//! ## Choosing a driver at runtime
//!
//! ```rust
//! use namespaced_cache::{DriverConfig, Store, Ttl};
//!
//! let root = std::env::temp_dir().join("namespaced-cache-doc");
//! let config = DriverConfig::from_json(&format!(
//!     r#"{{"driver": "file", "root": {:?}}}"#,
//!     root.display().to_string()
//! ))
//! .unwrap();
//!
//! let store = Store::new(config.connect("testapp").unwrap());
//! store.set("fruit", "apple", Ttl::NEVER).unwrap();
//! # store.delete("fruit").unwrap();
//! ```
//!
//! ## Existence checks
//!
//! Only the memory driver can answer `exist` truthfully. The network and
//! file drivers report [`Existence::Assumed`] and return `true` for every
//! non-empty key; use `get` there.

pub mod cli;
pub mod config;
pub mod driver;
pub mod error;
pub mod key;
pub mod normalize;
pub mod protocol;
pub mod segment;
pub mod server;
pub mod store;
pub mod ttl;

pub use config::{DriverConfig, FileConfig, NetworkConfig, SegmentConfig};
pub use driver::{
    CacheInfo, Driver, DriverKind, Endpoint, Existence, FileDriver, MemoryDriver, NetworkDriver,
};
pub use error::{BackendFault, ErrorKind, StoreError, StoreResult};
pub use key::{Namespace, StorageKey};
pub use store::Store;
pub use ttl::Ttl;
