//! Driver over a pool of cache servers.

use std::fmt;
use std::io;
use std::str::FromStr;
use std::time::Duration;

use bytes::{Bytes, BytesMut};
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::runtime::{Builder, Runtime};
use tokio::time;

use super::{Driver, DriverKind, Existence};
use crate::config::NetworkConfig;
use crate::error::{BackendFault, StoreError, StoreResult};
use crate::key::{Namespace, StorageKey};
use crate::normalize::{self, Op};
use crate::protocol::{Request, Response};
use crate::ttl::Ttl;

/// Host of the cache server used when no endpoint is configured.
pub const DEFAULT_HOST: &str = "127.0.0.1";
/// Port the cache server listens on by default.
pub const DEFAULT_PORT: u16 = 3000;

/// One cache server.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Endpoint {
    pub host: String,
    pub port: u16,
}

impl Endpoint {
    /// Create an endpoint for `host:port`.
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }
}

impl Default for Endpoint {
    fn default() -> Self {
        Self::new(DEFAULT_HOST, DEFAULT_PORT)
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

impl FromStr for Endpoint {
    type Err = StoreError;

    /// Parses `host:port`; the port is required.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (host, port) = s
            .rsplit_once(':')
            .ok_or(StoreError::InvalidInput("endpoint must be host:port"))?;
        let host = host.trim_start_matches('[').trim_end_matches(']');
        if host.is_empty() {
            return Err(StoreError::InvalidInput("endpoint host is empty"));
        }
        let port = port
            .parse()
            .map_err(|_| StoreError::InvalidInput("endpoint port is not a number"))?;
        Ok(Endpoint::new(host, port))
    }
}

impl TryFrom<String> for Endpoint {
    type Error = StoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Endpoint> for String {
    fn from(endpoint: Endpoint) -> Self {
        endpoint.to_string()
    }
}

/// Talks to cache servers over the text protocol in [`crate::protocol`].
///
/// Each key goes to the pool member picked by [`StorageKey::shard`], so a
/// key always lands on the same server for a given pool. Nothing is dialled
/// at construction; an unreachable server shows up as a failure of the
/// first operation routed to it.
///
/// `exist` is [`Existence::Assumed`]: the protocol has no existence
/// command, so every non-empty key is reported as present. Use `get`.
///
/// Calls block on an internal single-threaded runtime and must not be made
/// from inside another tokio runtime.
#[derive(Debug)]
pub struct NetworkDriver {
    namespace: Namespace,
    endpoints: Vec<Endpoint>,
    config: NetworkConfig,
    runtime: Runtime,
}

impl NetworkDriver {
    /// Use `endpoints` as the pool, or the default local server if empty.
    pub fn new(prefix: impl Into<String>, endpoints: Vec<Endpoint>) -> StoreResult<Self> {
        Self::with_config(prefix, NetworkConfig::new().endpoints(endpoints))
    }

    /// Build a driver from a full network configuration.
    pub fn with_config(prefix: impl Into<String>, config: NetworkConfig) -> StoreResult<Self> {
        let runtime = Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| normalize::unavailable(DriverKind::Network, e))?;

        let driver = Self {
            namespace: Namespace::new(prefix),
            endpoints: config.get_endpoints(),
            config,
            runtime,
        };
        tracing::info!(
            prefix = %driver.namespace,
            endpoints = driver.endpoints.len(),
            "network driver created"
        );
        Ok(driver)
    }

    /// Get the server pool.
    pub fn endpoints(&self) -> &[Endpoint] {
        &self.endpoints
    }

    /// The pool member responsible for `key`.
    pub fn endpoint_for(&self, key: &StorageKey) -> &Endpoint {
        &self.endpoints[key.shard(self.endpoints.len())]
    }

    /// Check that every server in the pool answers.
    pub fn ping(&self) -> StoreResult<()> {
        for endpoint in &self.endpoints {
            match self.call(endpoint, Request::Ping) {
                Ok(Response::Pong) => {}
                Ok(other) => return Err(unexpected(Op::Info, other)),
                Err(fault) => return Err(normalize::fault(DriverKind::Network, Op::Info, fault)),
            }
        }
        Ok(())
    }

    fn call(&self, endpoint: &Endpoint, request: Request) -> Result<Response, BackendFault> {
        self.runtime.block_on(exchange(
            endpoint,
            request,
            self.config.get_connect_timeout(),
            self.config.get_request_timeout(),
        ))
    }

    fn send(&self, op: Op, key: &StorageKey, request: Request) -> StoreResult<Response> {
        let endpoint = self.endpoint_for(key);
        match self.call(endpoint, request) {
            Ok(Response::Error(msg)) => Err(normalize::fault(
                DriverKind::Network,
                op,
                BackendFault::Remote(msg),
            )),
            Ok(response) => Ok(response),
            Err(fault) => {
                tracing::debug!(%endpoint, %op, "request failed");
                Err(normalize::fault(DriverKind::Network, op, fault))
            }
        }
    }
}

impl Driver for NetworkDriver {
    fn kind(&self) -> DriverKind {
        DriverKind::Network
    }

    fn namespace(&self) -> &Namespace {
        &self.namespace
    }

    fn existence(&self) -> Existence {
        Existence::Assumed
    }

    fn store(&self, key: &StorageKey, value: Bytes, ttl: Ttl) -> StoreResult<()> {
        let request = Request::Set {
            key: key.to_string(),
            ttl,
            value,
        };
        match self.send(Op::Set, key, request)? {
            Response::Stored => Ok(()),
            other => Err(unexpected(Op::Set, other)),
        }
    }

    fn fetch(&self, key: &StorageKey) -> StoreResult<Option<Bytes>> {
        let request = Request::Get {
            key: key.to_string(),
        };
        match self.send(Op::Get, key, request)? {
            Response::Value(value) => Ok(Some(value)),
            Response::NotFound => Ok(None),
            other => Err(unexpected(Op::Get, other)),
        }
    }

    /// Always `true`; no round trip is made.
    fn contains(&self, _key: &StorageKey) -> StoreResult<bool> {
        Ok(true)
    }

    fn remove(&self, key: &StorageKey) -> StoreResult<()> {
        let request = Request::Delete {
            key: key.to_string(),
        };
        match self.send(Op::Delete, key, request)? {
            Response::Deleted | Response::NotFound => Ok(()),
            other => Err(unexpected(Op::Delete, other)),
        }
    }
}

fn unexpected(op: Op, response: Response) -> StoreError {
    normalize::fault(
        DriverKind::Network,
        op,
        BackendFault::Unexpected(format!("{:?}", response)),
    )
}

fn timed_out(what: &str) -> io::Error {
    io::Error::new(io::ErrorKind::TimedOut, format!("{} timed out", what))
}

/// One request/reply round trip on a fresh connection.
async fn exchange(
    endpoint: &Endpoint,
    request: Request,
    connect_timeout: Duration,
    request_timeout: Duration,
) -> Result<Response, BackendFault> {
    let connect = TcpStream::connect((endpoint.host.as_str(), endpoint.port));
    let mut stream = time::timeout(connect_timeout, connect)
        .await
        .map_err(|_| timed_out("connect"))??;

    time::timeout(request_timeout, round_trip(&mut stream, &request))
        .await
        .map_err(|_| timed_out("request"))?
}

async fn round_trip(stream: &mut TcpStream, request: &Request) -> Result<Response, BackendFault> {
    let mut out = BytesMut::new();
    request.encode(&mut out);
    stream.write_all(&out).await?;

    let mut buf = BytesMut::with_capacity(1024);
    loop {
        if let Some(response) = Response::parse(&mut buf)? {
            return Ok(response);
        }
        if stream.read_buf(&mut buf).await? == 0 {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "connection closed before a complete reply",
            )
            .into());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use std::net::TcpListener;

    /// An address nothing listens on.
    fn dead_endpoint() -> Endpoint {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);
        Endpoint::new("127.0.0.1", port)
    }

    #[test]
    fn test_endpoint_parse() {
        assert_eq!("cache-1:11211".parse::<Endpoint>().unwrap(), Endpoint::new("cache-1", 11211));
        assert_eq!("[::1]:3000".parse::<Endpoint>().unwrap(), Endpoint::new("::1", 3000));
        assert!("cache-1".parse::<Endpoint>().is_err());
        assert!(":3000".parse::<Endpoint>().is_err());
        assert!("cache-1:http".parse::<Endpoint>().is_err());
    }

    #[test]
    fn test_endpoint_serde_as_string() {
        let json = serde_json::to_string(&Endpoint::new("10.0.0.1", 3000)).unwrap();
        assert_eq!(json, "\"10.0.0.1:3000\"");
        let parsed: Endpoint = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, Endpoint::new("10.0.0.1", 3000));
    }

    #[test]
    fn test_default_pool_is_local_server() {
        let driver = NetworkDriver::new("testapp", Vec::new()).unwrap();
        assert_eq!(driver.endpoints(), &[Endpoint::new("127.0.0.1", 3000)]);
    }

    #[test]
    fn test_construction_does_not_dial() {
        // Succeeds although nothing listens on the endpoint.
        let driver = NetworkDriver::new("testapp", vec![dead_endpoint()]);
        assert!(driver.is_ok());
    }

    #[test]
    fn test_exist_is_assumed_without_round_trip() {
        let driver = NetworkDriver::new("testapp", vec![dead_endpoint()]).unwrap();
        assert_eq!(driver.existence(), Existence::Assumed);
        assert!(driver.exist("never-set").unwrap());
        assert!(!driver.exist("").unwrap());
    }

    #[test]
    fn test_connection_errors_surface_lazily() {
        let driver = NetworkDriver::new("testapp", vec![dead_endpoint()]).unwrap();

        let err = driver.set("fruit", Bytes::from("apple"), Ttl::NEVER).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::StorageFailure);

        let err = driver.get("fruit").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::RetrievalFailure);

        let err = driver.delete("fruit").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::StorageFailure);

        assert_eq!(driver.ping().unwrap_err().kind(), ErrorKind::RetrievalFailure);
    }

    #[test]
    fn test_empty_input_skips_network() {
        // A dead endpoint would fail any call that reached it.
        let driver = NetworkDriver::new("testapp", vec![dead_endpoint()]).unwrap();
        assert!(!driver.set("", Bytes::from("v"), Ttl::NEVER).unwrap());
        assert!(!driver.set("k", Bytes::new(), Ttl::NEVER).unwrap());
        assert_eq!(driver.get("").unwrap(), None);
        assert!(!driver.delete("").unwrap());
    }

    #[test]
    fn test_keys_spread_over_pool() {
        let pool: Vec<_> = (0..4).map(|i| Endpoint::new("10.0.0.1", 3000 + i)).collect();
        let driver = NetworkDriver::new("testapp", pool.clone()).unwrap();

        let mut used = std::collections::HashSet::new();
        for i in 0..64 {
            let key = driver.namespace().derive(&format!("key_{}", i));
            let endpoint = driver.endpoint_for(&key);
            assert!(pool.contains(endpoint));
            assert_eq!(endpoint, driver.endpoint_for(&key));
            used.insert(endpoint.clone());
        }
        assert!(used.len() > 1);
    }
}
