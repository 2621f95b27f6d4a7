use anyhow::Result;
use serde::{Serialize, de::DeserializeOwned};

/// String keyed store underneath the height and deposit stores
pub trait KVStorage: Send + Sync {
    fn init(&self) -> Result<()>;

    fn write(&self, key: &str, value: &str) -> Result<()>;
    fn read(&self, key: &str) -> Result<Option<String>>;

    // Records are stored as JSON documents
    fn write_json<T: Serialize>(&self, key: &str, value: &T) -> Result<()>;
    fn read_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>>;

    /// Atomic multi-key put, used to keep a record and its index in step
    fn batch_write(&self, pairs: Vec<(String, String)>) -> Result<()>;

    /// Pairs whose key starts with `prefix`, in key order
    fn scan_prefix(&self, prefix: &str, limit: Option<usize>) -> Result<Vec<(String, String)>>;
}
