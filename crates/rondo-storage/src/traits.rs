//! Storage backend traits.
//!
//! Defines the capability every persistence backend provides to round
//! bookkeeping, enabling pluggable storage strategies.

use crate::Result;
use bytes::Bytes;
use std::sync::Arc;

/// Trait for entity storage backends.
///
/// Keys are opaque strings; for round entities they are the decimal form
/// of the round number. Implementations include in-memory and RocksDB.
pub trait EntityStore: Send + Sync {
    /// Reads the value stored under `key`.
    ///
    /// Returns `StorageError::NotFound` if nothing is stored.
    fn read(&self, key: &str) -> Result<Bytes>;

    /// Writes `value` under `key`, replacing any previous value.
    fn write(&self, key: &str, value: Bytes) -> Result<()>;

    /// Deletes the value stored under `key`. Deleting a missing key is not
    /// an error.
    fn delete(&self, key: &str) -> Result<()>;

    /// Checks if a value is stored under `key`.
    fn contains(&self, key: &str) -> Result<bool> {
        match self.read(key) {
            Ok(_) => Ok(true),
            Err(crate::StorageError::NotFound(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Flush any pending writes to durable storage.
    fn flush(&self) -> Result<()> {
        Ok(())
    }

    /// Returns storage statistics.
    fn stats(&self) -> StorageStats {
        StorageStats::default()
    }
}

// Implement EntityStore for Arc<T> where T: EntityStore
impl<T: EntityStore + ?Sized> EntityStore for Arc<T> {
    fn read(&self, key: &str) -> Result<Bytes> {
        (**self).read(key)
    }

    fn write(&self, key: &str, value: Bytes) -> Result<()> {
        (**self).write(key, value)
    }

    fn delete(&self, key: &str) -> Result<()> {
        (**self).delete(key)
    }

    fn contains(&self, key: &str) -> Result<bool> {
        (**self).contains(key)
    }

    fn flush(&self) -> Result<()> {
        (**self).flush()
    }

    fn stats(&self) -> StorageStats {
        (**self).stats()
    }
}

/// Storage statistics.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StorageStats {
    /// Number of stored entries.
    pub entry_count: u64,
    /// Number of read operations.
    pub reads: u64,
    /// Number of write operations.
    pub writes: u64,
    /// Number of delete operations.
    pub deletes: u64,
}
