//! Error types shared by every driver.
//!
//! Backends disagree about how they fail: the memory segment reports lock
//! and size problems, the network client reports I/O and protocol problems,
//! the filesystem reports `io::Error`s. All of them are folded into
//! [`StoreError`] by the [`normalize`](crate::normalize) module so callers
//! match on one taxonomy whichever driver served the call.

use std::io;

use thiserror::Error;

use crate::driver::DriverKind;
use crate::protocol::ProtocolError;
use crate::segment::SegmentError;

/// The error kinds a store operation can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The storage medium is missing at construction time.
    BackendUnavailable,
    /// An empty key or value was supplied.
    InvalidInput,
    /// The backend accepted a write but did not complete it.
    StorageFailure,
    /// The backend failed a read for a reason other than absence.
    RetrievalFailure,
}

/// The main error type for store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The driver's medium is not present; the driver was not constructed.
    #[error("{driver} backend unavailable: {reason}")]
    BackendUnavailable { driver: DriverKind, reason: String },

    /// Rejected locally, before reaching any backend.
    #[error("invalid input: {0}")]
    InvalidInput(&'static str),

    /// A write (`set` or `delete`) did not succeed.
    #[error("{driver} backend failed to store: {source}")]
    StorageFailure {
        driver: DriverKind,
        #[source]
        source: BackendFault,
    },

    /// A read failed for a reason other than the key being absent.
    #[error("{driver} backend failed to retrieve: {source}")]
    RetrievalFailure {
        driver: DriverKind,
        #[source]
        source: BackendFault,
    },
}

impl StoreError {
    /// The taxonomy kind of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            StoreError::BackendUnavailable { .. } => ErrorKind::BackendUnavailable,
            StoreError::InvalidInput(_) => ErrorKind::InvalidInput,
            StoreError::StorageFailure { .. } => ErrorKind::StorageFailure,
            StoreError::RetrievalFailure { .. } => ErrorKind::RetrievalFailure,
        }
    }

    /// The driver that produced the error, if it came from one.
    pub fn driver(&self) -> Option<DriverKind> {
        match self {
            StoreError::BackendUnavailable { driver, .. }
            | StoreError::StorageFailure { driver, .. }
            | StoreError::RetrievalFailure { driver, .. } => Some(*driver),
            StoreError::InvalidInput(_) => None,
        }
    }
}

/// The backend-specific cause behind a storage or retrieval failure.
#[derive(Debug, Error)]
pub enum BackendFault {
    /// Network or filesystem I/O failed.
    #[error(transparent)]
    Io(#[from] io::Error),

    /// The in-process memory segment refused the operation.
    #[error(transparent)]
    Segment(#[from] SegmentError),

    /// The server sent bytes that are not a valid reply.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// The server replied with an `ERR` line.
    #[error("server error: {0}")]
    Remote(String),

    /// The server replied with a well-formed but out-of-place response.
    #[error("unexpected reply: {0}")]
    Unexpected(String),

    /// A typed value could not be encoded or decoded.
    #[error(transparent)]
    Codec(#[from] serde_json::Error),
}

/// A specialized Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
