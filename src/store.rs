//! The caller-facing facade.

use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::driver::{Driver, DriverKind, Existence};
use crate::error::StoreResult;
use crate::key::Namespace;
use crate::normalize::{self, Op};
use crate::ttl::Ttl;

/// A namespaced key-value store bound to one driver.
///
/// Every operation forwards to the driver; input checks, key derivation and
/// fault classification happen there, so a `Store` behaves the same over
/// any backend apart from what [`Store::existence`] reports.
///
/// ```
/// use namespaced_cache::{MemoryDriver, Store, Ttl};
/// use namespaced_cache::segment::Segment;
///
/// let store = Store::new(MemoryDriver::new("testapp", Segment::default()));
/// store.set("fruit", "apple", Ttl::NEVER).unwrap();
/// assert_eq!(store.get("fruit").unwrap().as_deref(), Some(&b"apple"[..]));
/// ```
#[derive(Debug, Clone)]
pub struct Store<D: Driver = Box<dyn Driver>> {
    driver: D,
}

impl<D: Driver> Store<D> {
    /// Wrap a connected driver.
    pub fn new(driver: D) -> Self {
        Self { driver }
    }

    /// Get the underlying driver.
    pub fn driver(&self) -> &D {
        &self.driver
    }

    /// Unwrap the store, returning the driver.
    pub fn into_driver(self) -> D {
        self.driver
    }

    /// Which backend this store uses.
    pub fn kind(&self) -> DriverKind {
        self.driver.kind()
    }

    /// Whether `exist` answers truthfully for this backend.
    pub fn existence(&self) -> Existence {
        self.driver.existence()
    }

    /// Get the key namespace.
    pub fn namespace(&self) -> &Namespace {
        self.driver.namespace()
    }

    /// Store `value` under `key`; a zero TTL means no expiry.
    ///
    /// `Ok(false)` if the key or the value is empty.
    pub fn set(&self, key: &str, value: impl Into<Bytes>, ttl: impl Into<Ttl>) -> StoreResult<bool> {
        self.driver.set(key, value.into(), ttl.into())
    }

    /// Fetch the value under `key`, `None` on a miss or for an empty key.
    pub fn get(&self, key: &str) -> StoreResult<Option<Bytes>> {
        self.driver.get(key)
    }

    /// Whether `key` is present; see [`Store::existence`].
    pub fn exist(&self, key: &str) -> StoreResult<bool> {
        self.driver.exist(key)
    }

    /// Remove `key`. Deleting a missing key still succeeds.
    pub fn delete(&self, key: &str) -> StoreResult<bool> {
        self.driver.delete(key)
    }

    /// Store `value` encoded as JSON.
    pub fn set_as<T: Serialize + ?Sized>(
        &self,
        key: &str,
        value: &T,
        ttl: impl Into<Ttl>,
    ) -> StoreResult<bool> {
        let encoded =
            serde_json::to_vec(value).map_err(|e| normalize::fault(self.kind(), Op::Set, e))?;
        self.set(key, encoded, ttl)
    }

    /// Fetch and decode a value stored with [`Store::set_as`].
    pub fn get_as<T: DeserializeOwned>(&self, key: &str) -> StoreResult<Option<T>> {
        match self.get(key)? {
            Some(raw) => serde_json::from_slice(&raw)
                .map(Some)
                .map_err(|e| normalize::fault(self.kind(), Op::Get, e)),
            None => Ok(None),
        }
    }
}

impl Store {
    /// Box `driver` so the store's type does not depend on the backend.
    pub fn boxed(driver: impl Driver + 'static) -> Self {
        Self::new(Box::new(driver))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::MemoryDriver;
    use crate::error::ErrorKind;
    use crate::segment::Segment;
    use serde::Deserialize;

    fn store() -> Store<MemoryDriver> {
        Store::new(MemoryDriver::new("testapp", Segment::default()))
    }

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Basket {
        fruit: Vec<String>,
        weight_grams: u32,
    }

    #[test]
    fn test_forwards_to_driver() {
        let store = store();
        assert!(store.set("fruit", "apple", Ttl::from_secs(0)).unwrap());
        assert!(store.exist("fruit").unwrap());
        assert_eq!(store.get("fruit").unwrap(), Some(Bytes::from("apple")));
        assert!(store.delete("fruit").unwrap());
        assert_eq!(store.get("fruit").unwrap(), None);
        assert_eq!(store.kind(), DriverKind::Memory);
        assert_eq!(store.existence(), Existence::Accurate);
        assert_eq!(store.namespace().prefix(), "testapp");
    }

    #[test]
    fn test_typed_round_trip() {
        let store = store();
        let basket = Basket {
            fruit: vec!["apple".to_string(), "pear".to_string()],
            weight_grams: 450,
        };
        assert!(store.set_as("basket", &basket, Ttl::NEVER).unwrap());
        assert_eq!(store.get_as::<Basket>("basket").unwrap(), Some(basket));
        assert_eq!(store.get_as::<Basket>("missing").unwrap(), None);
    }

    #[test]
    fn test_undecodable_value_is_retrieval_failure() {
        let store = store();
        store.set("basket", "not json", Ttl::NEVER).unwrap();
        let err = store.get_as::<Basket>("basket").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::RetrievalFailure);
    }

    #[test]
    fn test_boxed_store() {
        let store = Store::boxed(MemoryDriver::new("testapp", Segment::default()));
        assert!(store.set("fruit", "apple", Ttl::NEVER).unwrap());
        assert_eq!(store.get("fruit").unwrap(), Some(Bytes::from("apple")));
    }
}
