pub mod manager;
pub mod rocksdb;
pub mod schema;
pub mod traits;
