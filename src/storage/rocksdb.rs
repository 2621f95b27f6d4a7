use std::sync::Arc;

use anyhow::{Context, Result};
use rocksdb::{DB, Direction, IteratorMode, Options, WriteBatch};
use serde::{Serialize, de::DeserializeOwned};

use crate::storage::traits::KVStorage;

#[derive(Clone)]
pub struct RocksDBStorage {
    db: Arc<DB>,
}

impl RocksDBStorage {
    pub fn new(path: &str) -> Result<Self> {
        let mut opts = Options::default();

        // Small, write-light working set: checkpoints and deposit rows
        opts.create_if_missing(true);
        opts.set_compression_type(rocksdb::DBCompressionType::Lz4);
        opts.set_paranoid_checks(true);

        let db = DB::open(&opts, path)
            .with_context(|| format!("Failed to open RocksDB at path: {}", path))?;
        Ok(Self { db: Arc::new(db) })
    }

    /// Flush database to ensure all data is written to disk
    pub fn flush(&self) -> Result<()> {
        self.db
            .flush()
            .with_context(|| "Failed to flush database to disk")
    }
}

fn utf8(bytes: impl Into<Vec<u8>>, what: &str) -> Result<String> {
    String::from_utf8(bytes.into()).with_context(|| format!("Non UTF-8 {what} in store"))
}

impl KVStorage for RocksDBStorage {
    fn init(&self) -> Result<()> {
        // Opening the DB already validated it; nothing else to prepare
        Ok(())
    }

    fn write(&self, key: &str, value: &str) -> Result<()> {
        self.db
            .put(key, value)
            .with_context(|| format!("Failed to write key: {key}"))
    }

    fn read(&self, key: &str) -> Result<Option<String>> {
        self.db
            .get(key)
            .with_context(|| format!("Failed to read key: {key}"))?
            .map(|value| utf8(value, "value"))
            .transpose()
    }

    fn write_json<T: Serialize>(&self, key: &str, value: &T) -> Result<()> {
        let json = serde_json::to_string(value)
            .with_context(|| format!("Failed to serialize value for key: {key}"))?;
        self.write(key, &json)
    }

    fn read_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        self.read(key)?
            .map(|json| {
                serde_json::from_str(&json)
                    .with_context(|| format!("Failed to deserialize value for key: {key}"))
            })
            .transpose()
    }

    /// All pairs land atomically or none do
    fn batch_write(&self, pairs: Vec<(String, String)>) -> Result<()> {
        let mut batch = WriteBatch::default();
        for (key, value) in &pairs {
            batch.put(key, value);
        }
        self.db
            .write(batch)
            .with_context(|| format!("Failed to write batch of {} keys", pairs.len()))
    }

    fn scan_prefix(&self, prefix: &str, limit: Option<usize>) -> Result<Vec<(String, String)>> {
        let iter = self
            .db
            .iterator(IteratorMode::From(prefix.as_bytes(), Direction::Forward));

        let mut results = Vec::new();
        for item in iter {
            let (key, value) = item.context("Failed to read from iterator")?;
            // Keys are sorted, so the first miss ends the prefix range
            if !key.starts_with(prefix.as_bytes()) {
                break;
            }
            results.push((utf8(key, "key")?, utf8(value, "value")?));

            if limit.is_some_and(|limit| results.len() >= limit) {
                break;
            }
        }
        Ok(results)
    }
}
