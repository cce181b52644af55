//! RocksDB persistent entity store.
//!
//! Each entity kind gets its own database directory, so round summaries
//! and VRF shares keyed by the same round number never collide.

use crate::{EntityStore, Result, StorageError, StorageStats};
use bytes::Bytes;
use rocksdb::{BlockBasedOptions, Options, WriteOptions, DB};
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};

/// RocksDB storage configuration.
#[derive(Debug, Clone)]
pub struct RocksDbConfig {
    /// Path to the database directory.
    pub path: std::path::PathBuf,

    /// Write buffer size in bytes.
    pub write_buffer_size: usize,

    /// Maximum number of write buffers.
    pub max_write_buffers: i32,

    /// Number of background compaction threads.
    pub background_jobs: i32,

    /// Sync the write-ahead log on every write.
    pub sync_writes: bool,

    /// Enable LZ4 compression.
    pub compression_enabled: bool,

    /// Bloom filter bits per key (0 to disable).
    pub bloom_filter_bits: i32,
}

impl Default for RocksDbConfig {
    fn default() -> Self {
        Self {
            path: std::path::PathBuf::from("./data/rocksdb/roundsummary"),
            write_buffer_size: 16 * 1024 * 1024, // 16 MB
            max_write_buffers: 3,
            background_jobs: 2,
            sync_writes: false,
            compression_enabled: true,
            bloom_filter_bits: 10,
        }
    }
}

/// RocksDB-backed entity store.
pub struct RocksDbStore {
    db: DB,
    config: RocksDbConfig,
    reads: AtomicU64,
    writes: AtomicU64,
    deletes: AtomicU64,
}

fn backend_err(e: rocksdb::Error) -> StorageError {
    StorageError::Backend(e.to_string())
}

impl RocksDbStore {
    /// Opens or creates a RocksDB database.
    pub fn open(config: RocksDbConfig) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);

        // Performance tuning
        opts.set_write_buffer_size(config.write_buffer_size);
        opts.set_max_write_buffer_number(config.max_write_buffers);
        opts.increase_parallelism(config.background_jobs);
        opts.set_max_background_jobs(config.background_jobs);

        if config.compression_enabled {
            opts.set_compression_type(rocksdb::DBCompressionType::Lz4);
        }

        let mut block_opts = BlockBasedOptions::default();
        if config.bloom_filter_bits > 0 {
            block_opts.set_bloom_filter(config.bloom_filter_bits as f64, false);
        }
        opts.set_block_based_table_factory(&block_opts);

        let db = DB::open(&opts, &config.path).map_err(backend_err)?;
        tracing::debug!(path = %config.path.display(), "opened rocksdb entity store");

        Ok(Self {
            db,
            config,
            reads: AtomicU64::new(0),
            writes: AtomicU64::new(0),
            deletes: AtomicU64::new(0),
        })
    }

    /// Opens with default configuration.
    pub fn open_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::open(RocksDbConfig {
            path: path.as_ref().to_path_buf(),
            ..Default::default()
        })
    }

    fn write_options(&self) -> WriteOptions {
        let mut opts = WriteOptions::default();
        opts.set_sync(self.config.sync_writes);
        opts
    }
}

impl EntityStore for RocksDbStore {
    fn read(&self, key: &str) -> Result<Bytes> {
        self.reads.fetch_add(1, Ordering::Relaxed);
        match self.db.get(key.as_bytes()).map_err(backend_err)? {
            Some(data) => Ok(Bytes::from(data)),
            None => Err(StorageError::NotFound(key.to_string())),
        }
    }

    fn write(&self, key: &str, value: Bytes) -> Result<()> {
        self.db
            .put_opt(key.as_bytes(), &value, &self.write_options())
            .map_err(backend_err)?;
        self.writes.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<()> {
        self.db
            .delete_opt(key.as_bytes(), &self.write_options())
            .map_err(backend_err)?;
        self.deletes.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    fn contains(&self, key: &str) -> Result<bool> {
        self.reads.fetch_add(1, Ordering::Relaxed);
        self.db
            .get_pinned(key.as_bytes())
            .map(|opt| opt.is_some())
            .map_err(backend_err)
    }

    fn flush(&self) -> Result<()> {
        self.db.flush().map_err(backend_err)
    }

    fn stats(&self) -> StorageStats {
        let writes = self.writes.load(Ordering::Relaxed);
        let deletes = self.deletes.load(Ordering::Relaxed);
        StorageStats {
            entry_count: writes.saturating_sub(deletes),
            reads: self.reads.load(Ordering::Relaxed),
            writes,
            deletes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn create_test_db() -> (RocksDbStore, TempDir) {
        let dir = TempDir::new().unwrap();
        let store = RocksDbStore::open_default(dir.path()).unwrap();
        (store, dir)
    }

    #[test]
    fn test_write_read() {
        let (store, _dir) = create_test_db();
        store.write("100", Bytes::from_static(b"summary")).unwrap();

        assert_eq!(store.read("100").unwrap().as_ref(), b"summary");
        assert!(store.contains("100").unwrap());
    }

    #[test]
    fn test_read_missing() {
        let (store, _dir) = create_test_db();
        assert!(matches!(store.read("1"), Err(StorageError::NotFound(_))));
    }

    #[test]
    fn test_delete() {
        let (store, _dir) = create_test_db();
        store.write("1", Bytes::from_static(b"x")).unwrap();
        store.delete("1").unwrap();

        assert!(!store.contains("1").unwrap());
    }

    #[test]
    fn test_reopen_keeps_data() {
        let dir = TempDir::new().unwrap();
        {
            let store = RocksDbStore::open_default(dir.path()).unwrap();
            store.write("9", Bytes::from_static(b"kept")).unwrap();
            store.flush().unwrap();
        }

        let store = RocksDbStore::open_default(dir.path()).unwrap();
        assert_eq!(store.read("9").unwrap().as_ref(), b"kept");
    }

    #[test]
    fn test_stats() {
        let (store, _dir) = create_test_db();
        store.write("1", Bytes::from_static(b"x")).unwrap();
        store.read("1").unwrap();
        store.read("1").unwrap();

        let stats = store.stats();
        assert_eq!(stats.writes, 1);
        assert_eq!(stats.reads, 2);
    }
}
