//! Entity persistence for Rondo.
//!
//! Round bookkeeping archives `Round` and `VrfShare` entities through a
//! minimal read/write/delete capability keyed by string. This crate
//! provides that capability ([`EntityStore`]), its in-memory and RocksDB
//! backends, and a typed [`Repository`] that encodes entities at the
//! serialization boundary.
//!
//! Repositories are constructed once at startup and handed to whatever
//! needs persistence; there is no global registry.

#![warn(missing_docs)]

mod entity;
mod error;
mod memory;
#[cfg(feature = "rocksdb-backend")]
mod rocks;
mod traits;

pub use entity::{Entity, Repository};
pub use error::{Result, StorageError};
pub use memory::MemoryStore;
#[cfg(feature = "rocksdb-backend")]
pub use rocks::{RocksDbConfig, RocksDbStore};
pub use traits::{EntityStore, StorageStats};
