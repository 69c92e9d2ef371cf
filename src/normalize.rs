//! Maps backend-specific outcomes onto the shared contract.
//!
//! Three things happen here and nowhere else:
//!
//! - empty keys and values are rejected before any backend sees them, and
//!   the rejection becomes the operation's benign negative result;
//! - a backend fault becomes `StorageFailure` on the write path (`set`,
//!   `delete`) and `RetrievalFailure` on the read path (`get`, `exist`,
//!   statistics);
//! - filesystem results where "not found" is an error are reconciled with
//!   the other backends, where absence is a normal result.

use std::fmt;
use std::io;

use bytes::Bytes;

use crate::driver::DriverKind;
use crate::error::{BackendFault, StoreError, StoreResult};
use crate::key::{Namespace, StorageKey};

/// The operation a fault occurred in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Set,
    Get,
    Exist,
    Delete,
    Info,
}

impl Op {
    pub fn as_str(&self) -> &'static str {
        match self {
            Op::Set => "set",
            Op::Get => "get",
            Op::Exist => "exist",
            Op::Delete => "delete",
            Op::Info => "cache_info",
        }
    }

    fn is_write(&self) -> bool {
        matches!(self, Op::Set | Op::Delete)
    }
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Check the inputs of one operation.
pub fn validate(key: &str, value: Option<&[u8]>) -> StoreResult<()> {
    if key.is_empty() {
        return Err(StoreError::InvalidInput("empty key"));
    }
    if value.is_some_and(<[u8]>::is_empty) {
        return Err(StoreError::InvalidInput("empty value"));
    }
    Ok(())
}

/// Derive the storage key if the inputs are acceptable.
///
/// `None` means the call must not reach the backend; the rejection is
/// logged and not propagated.
pub fn admit(
    namespace: &Namespace,
    driver: DriverKind,
    op: Op,
    key: &str,
    value: Option<&[u8]>,
) -> Option<StorageKey> {
    match validate(key, value) {
        Ok(()) => Some(namespace.derive(key)),
        Err(err) => {
            tracing::debug!(%driver, %op, error = %err, "rejected before reaching backend");
            None
        }
    }
}

/// Classify a backend fault by the operation it happened in.
pub fn fault(driver: DriverKind, op: Op, source: impl Into<BackendFault>) -> StoreError {
    let source = source.into();
    tracing::debug!(%driver, %op, error = %source, "backend fault");
    if op.is_write() {
        StoreError::StorageFailure { driver, source }
    } else {
        StoreError::RetrievalFailure { driver, source }
    }
}

/// The driver's medium is missing.
pub fn unavailable(driver: DriverKind, reason: impl fmt::Display) -> StoreError {
    StoreError::BackendUnavailable {
        driver,
        reason: reason.to_string(),
    }
}

/// A file read where a missing file means "not found", not failure.
pub fn file_read(result: io::Result<Vec<u8>>) -> StoreResult<Option<Bytes>> {
    match result {
        Ok(contents) => Ok(Some(Bytes::from(contents))),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(fault(DriverKind::File, Op::Get, e)),
    }
}

/// A file removal where a missing file is already the desired state.
pub fn file_remove(result: io::Result<()>) -> StoreResult<()> {
    match result {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(fault(DriverKind::File, Op::Delete, e)),
    }
}
