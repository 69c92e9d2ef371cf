//! Facade scenarios run against every driver.

use bytes::Bytes;
use namespaced_cache::{
    segment, Driver, DriverConfig, DriverKind, ErrorKind, Existence, FileConfig, FileDriver,
    MemoryDriver, SegmentConfig, Store, Ttl,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::thread;
use tempfile::TempDir;

fn memory_store(prefix: &str) -> Store {
    segment::init(SegmentConfig::new().max_capacity(100_000).build());
    Store::boxed(MemoryDriver::attach(prefix).unwrap())
}

fn file_store(prefix: &str) -> (Store, TempDir) {
    let root = tempfile::tempdir().unwrap();
    let driver = FileDriver::with_root(prefix, root.path()).unwrap();
    (Store::boxed(driver), root)
}

/// One store per driver that needs no external server.
fn local_stores(prefix: &str) -> Vec<(Store, Option<TempDir>)> {
    let (file, root) = file_store(prefix);
    vec![(memory_store(prefix), None), (file, Some(root))]
}

#[test]
fn test_fruit_scenario() {
    let store = memory_store("testapp");

    assert!(store.set("fruit", "apple", Ttl::NEVER).unwrap());
    assert_eq!(store.get("fruit").unwrap(), Some(Bytes::from("apple")));
    assert!(store.exist("fruit").unwrap());

    assert!(store.delete("fruit").unwrap());
    assert_eq!(store.get("fruit").unwrap(), None);
    assert!(!store.exist("fruit").unwrap());
}

#[test]
fn test_round_trip_on_every_driver() {
    for (store, _root) in local_stores("roundtrip") {
        assert!(store.set("greeting", "hello", Ttl::NEVER).unwrap());
        assert_eq!(
            store.get("greeting").unwrap(),
            Some(Bytes::from("hello")),
            "{} driver",
            store.kind()
        );

        // Overwrite replaces.
        assert!(store.set("greeting", "goodbye", Ttl::NEVER).unwrap());
        assert_eq!(store.get("greeting").unwrap(), Some(Bytes::from("goodbye")));

        // Binary values survive untouched.
        let binary = Bytes::from_static(&[0, 1, 2, 255, b'\r', b'\n']);
        assert!(store.set("binary", binary.clone(), Ttl::NEVER).unwrap());
        assert_eq!(store.get("binary").unwrap(), Some(binary));
    }
}

#[test]
fn test_empty_input_rejected_on_every_driver() {
    for (store, _root) in local_stores("empty") {
        assert!(!store.set("", "value", Ttl::NEVER).unwrap());
        assert!(!store.set("key", "", Ttl::NEVER).unwrap());
        assert_eq!(store.get("").unwrap(), None);
        assert!(!store.exist("").unwrap());
        assert!(!store.delete("").unwrap());

        // The rejected write left nothing behind.
        assert_eq!(store.get("key").unwrap(), None, "{} driver", store.kind());
    }
}

#[test]
fn test_delete_is_idempotent_on_every_driver() {
    for (store, _root) in local_stores("idempotent") {
        assert!(store.delete("never-set").unwrap());
        store.set("fruit", "apple", Ttl::NEVER).unwrap();
        assert!(store.delete("fruit").unwrap());
        assert!(store.delete("fruit").unwrap());
        assert_eq!(store.get("fruit").unwrap(), None);
    }
}

#[test]
fn test_existence_contract() {
    let store = memory_store("existence");
    assert_eq!(store.existence(), Existence::Accurate);
    assert!(!store.exist("never-set").unwrap());

    let (store, _root) = file_store("existence");
    assert_eq!(store.existence(), Existence::Assumed);
    assert!(store.exist("never-set").unwrap());
    assert_eq!(store.get("never-set").unwrap(), None);
}

#[test]
fn test_prefixes_isolate_on_shared_media() {
    let app1 = memory_store("isolation-app1");
    let app2 = memory_store("isolation-app2");
    app1.set("user", "alice", Ttl::NEVER).unwrap();
    app2.set("user", "bob", Ttl::NEVER).unwrap();
    assert_eq!(app1.get("user").unwrap(), Some(Bytes::from("alice")));
    assert_eq!(app2.get("user").unwrap(), Some(Bytes::from("bob")));

    app1.delete("user").unwrap();
    assert_eq!(app2.get("user").unwrap(), Some(Bytes::from("bob")));

    let root = tempfile::tempdir().unwrap();
    let file1 = Store::new(FileDriver::with_root("app1", root.path()).unwrap());
    let file2 = Store::new(FileDriver::with_root("app2", root.path()).unwrap());
    file1.set("user", "alice", Ttl::NEVER).unwrap();
    assert_eq!(file2.get("user").unwrap(), None);
}

#[test]
fn test_file_driver_ignores_ttl() {
    let (store, _root) = file_store("ttl");
    store.set("short", "lived", Ttl::from_secs(1)).unwrap();
    thread::sleep(std::time::Duration::from_millis(1100));
    assert_eq!(store.get("short").unwrap(), Some(Bytes::from("lived")));
}

#[test]
fn test_memory_driver_honours_ttl() {
    let store = memory_store("ttl");
    store.set("short", "lived", Ttl::from_secs(1)).unwrap();
    thread::sleep(std::time::Duration::from_millis(1100));
    assert_eq!(store.get("short").unwrap(), None);
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Session {
    user: String,
    roles: Vec<String>,
}

#[test]
fn test_typed_values_on_every_driver() {
    let session = Session {
        user: "alice".to_string(),
        roles: vec!["admin".to_string()],
    };
    for (store, _root) in local_stores("typed") {
        assert!(store.set_as("session", &session, Ttl::NEVER).unwrap());
        assert_eq!(store.get_as::<Session>("session").unwrap(), Some(session.clone()));

        store.set("session", "garbage", Ttl::NEVER).unwrap();
        let err = store.get_as::<Session>("session").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::RetrievalFailure);
        assert_eq!(err.driver(), Some(store.kind()));
    }
}

#[test]
fn test_driver_config_connects_file_driver() {
    let root = tempfile::tempdir().unwrap();
    let config = DriverConfig::File(FileConfig::new().root(root.path()));
    let store = Store::new(config.connect("configured").unwrap());

    assert_eq!(store.kind(), DriverKind::File);
    store.set("fruit", "apple", Ttl::NEVER).unwrap();
    assert!(root.path().join("configured").is_dir());
    assert_eq!(store.get("fruit").unwrap(), Some(Bytes::from("apple")));
}

#[test]
fn test_driver_config_connects_memory_driver() {
    let config = DriverConfig::from_json(r#"{"driver": "memory", "max_capacity": 100000}"#).unwrap();
    let store = Store::new(config.connect("configured").unwrap());
    assert_eq!(store.kind(), DriverKind::Memory);
    store.set("fruit", "apple", Ttl::NEVER).unwrap();
    assert_eq!(store.get("fruit").unwrap(), Some(Bytes::from("apple")));
}

#[test]
fn test_concurrent_stores_share_segment() {
    let store = Arc::new(memory_store("concurrent"));

    let handles: Vec<_> = (0..4)
        .map(|t| {
            let store = Arc::clone(&store);
            thread::spawn(move || {
                for i in 0..250 {
                    let key = format!("key_{}_{}", t, i);
                    store.set(&key, format!("value_{}", i), Ttl::NEVER).unwrap();
                    assert!(store.get(&key).unwrap().is_some());
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(store.get("key_3_249").unwrap(), Some(Bytes::from("value_249")));
}

#[test]
fn test_cache_info_reports_shared_segment() {
    segment::init(SegmentConfig::new().max_capacity(100_000).build());
    let driver = MemoryDriver::attach("info").unwrap();
    driver.set("k", Bytes::from("v"), Ttl::NEVER).unwrap();

    let info = driver.cache_info().unwrap();
    assert!(info["size"].as_u64().unwrap() >= 1);
    assert!(info.contains_key("hit_rate"));
    assert!(!info.contains_key("entry_list"));
}

/// Collects formatted log output for assertions.
#[derive(Clone, Default)]
struct CapturedLogs(Arc<std::sync::Mutex<Vec<u8>>>);

impl std::io::Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

#[test]
fn test_memory_config_ignored_once_segment_exists() {
    let active = segment::init(SegmentConfig::new().max_capacity(100_000).build());

    let logs = CapturedLogs::default();
    let writer = logs.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::WARN)
        .with_ansi(false)
        .with_writer(move || writer.clone())
        .finish();

    let config = DriverConfig::from_json(r#"{"driver": "memory", "max_capacity": 5}"#).unwrap();
    let store = tracing::subscriber::with_default(subscriber, || {
        Store::new(config.connect("reconfigured").unwrap())
    });

    // The registered segment keeps its limits.
    assert_eq!(active.config().get_max_capacity(), Some(100_000));
    store.set("fruit", "apple", Ttl::NEVER).unwrap();
    assert_eq!(store.get("fruit").unwrap(), Some(Bytes::from("apple")));

    let output = String::from_utf8(logs.0.lock().unwrap().clone()).unwrap();
    assert!(output.contains("WARN"), "{}", output);
    assert!(output.contains("ignoring requested config"), "{}", output);
}
