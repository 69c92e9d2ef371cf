//! Driver over plain files, one per key.

use std::fs;
use std::io::Write;
use std::path::{Component, Path, PathBuf};

use bytes::Bytes;
use tempfile::NamedTempFile;

use super::{Driver, DriverKind, Existence};
use crate::error::StoreResult;
use crate::key::{Namespace, StorageKey};
use crate::normalize::{self, Op};
use crate::ttl::Ttl;

/// Stores each value in `<root>/<prefix>/<storage key>`.
///
/// Files hold the raw value with no header. The TTL passed to `set` is
/// accepted and ignored, so entries live until deleted. `exist` is
/// [`Existence::Assumed`].
#[derive(Debug, Clone)]
pub struct FileDriver {
    namespace: Namespace,
    dir: PathBuf,
}

impl FileDriver {
    /// Store under the system temporary directory.
    pub fn new(prefix: impl Into<String>) -> StoreResult<Self> {
        Self::with_root(prefix, std::env::temp_dir())
    }

    /// Store under `root`. The prefix directory is created if missing.
    ///
    /// The prefix must be usable as a single directory name.
    pub fn with_root(prefix: impl Into<String>, root: impl AsRef<Path>) -> StoreResult<Self> {
        let namespace = Namespace::new(prefix);
        if !is_single_component(namespace.prefix()) {
            return Err(normalize::unavailable(
                DriverKind::File,
                format!("prefix {:?} is not a valid directory name", namespace.prefix()),
            ));
        }

        let dir = root.as_ref().join(namespace.prefix());
        fs::create_dir_all(&dir).map_err(|e| {
            normalize::unavailable(DriverKind::File, format!("{}: {}", dir.display(), e))
        })?;

        tracing::info!(prefix = %namespace, dir = %dir.display(), "file driver ready");
        Ok(Self { namespace, dir })
    }

    /// The directory holding this prefix's files.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path(&self, key: &StorageKey) -> PathBuf {
        self.dir.join(key.as_str())
    }
}

fn is_single_component(prefix: &str) -> bool {
    let mut components = Path::new(prefix).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    )
}

impl Driver for FileDriver {
    fn kind(&self) -> DriverKind {
        DriverKind::File
    }

    fn namespace(&self) -> &Namespace {
        &self.namespace
    }

    fn existence(&self) -> Existence {
        Existence::Assumed
    }

    /// Replaces the file atomically; readers see the old or the new value.
    fn store(&self, key: &StorageKey, value: Bytes, ttl: Ttl) -> StoreResult<()> {
        if !ttl.is_never() {
            tracing::trace!(key = %key, ttl = ttl.secs(), "file driver ignores ttl");
        }
        let fail = |e: std::io::Error| normalize::fault(DriverKind::File, Op::Set, e);

        let mut file = NamedTempFile::new_in(&self.dir).map_err(fail)?;
        file.write_all(&value).map_err(fail)?;
        file.persist(self.path(key)).map_err(|e| fail(e.error))?;
        Ok(())
    }

    fn fetch(&self, key: &StorageKey) -> StoreResult<Option<Bytes>> {
        normalize::file_read(fs::read(self.path(key)))
    }

    /// Always `true`; the filesystem is not consulted.
    fn contains(&self, _key: &StorageKey) -> StoreResult<bool> {
        Ok(true)
    }

    fn remove(&self, key: &StorageKey) -> StoreResult<()> {
        normalize::file_remove(fs::remove_file(self.path(key)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use std::time::Duration;

    #[test]
    fn test_round_trip_and_layout() {
        let root = tempfile::tempdir().unwrap();
        let driver = FileDriver::with_root("testapp", root.path()).unwrap();
        assert_eq!(driver.dir(), root.path().join("testapp"));

        assert!(driver.set("fruit", Bytes::from("apple"), Ttl::NEVER).unwrap());
        assert_eq!(driver.get("fruit").unwrap(), Some(Bytes::from("apple")));

        // Raw value, named by the storage key.
        let path = driver.dir().join(crate::key::derive("testapp", "fruit").as_str());
        assert_eq!(fs::read(path).unwrap(), b"apple");
    }

    #[test]
    fn test_overwrite_leaves_no_temp_files() {
        let root = tempfile::tempdir().unwrap();
        let driver = FileDriver::with_root("testapp", root.path()).unwrap();
        driver.set("fruit", Bytes::from("apple"), Ttl::NEVER).unwrap();
        driver.set("fruit", Bytes::from("pear"), Ttl::NEVER).unwrap();

        assert_eq!(driver.get("fruit").unwrap(), Some(Bytes::from("pear")));
        assert_eq!(fs::read_dir(driver.dir()).unwrap().count(), 1);
    }

    #[test]
    fn test_missing_key_is_none() {
        let root = tempfile::tempdir().unwrap();
        let driver = FileDriver::with_root("testapp", root.path()).unwrap();
        assert_eq!(driver.get("never-set").unwrap(), None);
    }

    #[test]
    fn test_delete_is_idempotent() {
        let root = tempfile::tempdir().unwrap();
        let driver = FileDriver::with_root("testapp", root.path()).unwrap();
        driver.set("fruit", Bytes::from("apple"), Ttl::NEVER).unwrap();

        assert!(driver.delete("fruit").unwrap());
        assert!(driver.delete("fruit").unwrap());
        assert_eq!(driver.get("fruit").unwrap(), None);
    }

    #[test]
    fn test_ttl_is_not_enforced() {
        let root = tempfile::tempdir().unwrap();
        let driver = FileDriver::with_root("testapp", root.path()).unwrap();
        driver.set("short", Bytes::from("v"), Ttl::from_secs(1)).unwrap();
        std::thread::sleep(Duration::from_millis(1100));
        assert_eq!(driver.get("short").unwrap(), Some(Bytes::from("v")));
    }

    #[test]
    fn test_exist_is_assumed() {
        let root = tempfile::tempdir().unwrap();
        let driver = FileDriver::with_root("testapp", root.path()).unwrap();
        assert_eq!(driver.existence(), Existence::Assumed);
        assert!(driver.exist("never-set").unwrap());
        assert!(!driver.exist("").unwrap());
    }

    #[test]
    fn test_unreadable_entry_is_retrieval_failure() {
        let root = tempfile::tempdir().unwrap();
        let driver = FileDriver::with_root("testapp", root.path()).unwrap();
        let key = driver.namespace().derive("fruit");
        fs::create_dir(driver.dir().join(key.as_str())).unwrap();

        let err = driver.get("fruit").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::RetrievalFailure);
        assert_eq!(err.driver(), Some(DriverKind::File));

        let err = driver.set("fruit", Bytes::from("apple"), Ttl::NEVER).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::StorageFailure);
    }

    #[test]
    fn test_prefixes_get_separate_directories() {
        let root = tempfile::tempdir().unwrap();
        let app1 = FileDriver::with_root("app1", root.path()).unwrap();
        let app2 = FileDriver::with_root("app2", root.path()).unwrap();

        app1.set("user", Bytes::from("alice"), Ttl::NEVER).unwrap();
        app2.set("user", Bytes::from("bob"), Ttl::NEVER).unwrap();

        assert_eq!(app1.get("user").unwrap(), Some(Bytes::from("alice")));
        assert_eq!(app2.get("user").unwrap(), Some(Bytes::from("bob")));
    }

    #[test]
    fn test_bad_prefix_is_unavailable() {
        let root = tempfile::tempdir().unwrap();
        for prefix in ["", "..", "a/b", "/abs"] {
            let err = FileDriver::with_root(prefix, root.path()).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::BackendUnavailable, "prefix {:?}", prefix);
        }
    }

    #[test]
    fn test_uncreatable_root_is_unavailable() {
        let root = tempfile::tempdir().unwrap();
        let blocker = root.path().join("blocker");
        fs::write(&blocker, b"not a directory").unwrap();

        let err = FileDriver::with_root("testapp", &blocker).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::BackendUnavailable);
    }
}
