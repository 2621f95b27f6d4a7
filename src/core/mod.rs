pub mod chain;
pub mod storage;
pub mod task;
pub mod types;
