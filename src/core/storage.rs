use anyhow::Result;

use crate::core::types::{DepositRecord, HeightRecord, UpchainStatus};

/// Height checkpoint storage
pub trait HeightStore: Send + Sync {
    fn get_height(&self, currency: &str) -> Result<Option<HeightRecord>>;
    fn save_height(&self, record: &HeightRecord) -> Result<()>;
}

/// Deposit-intent storage
pub trait DepositStore: Send + Sync {
    /// Record a new expectation. Fails if an unfinished expectation already
    /// waits on the same (currency, address, amount).
    fn insert_expectation(&self, record: &DepositRecord) -> Result<()>;

    /// Find the expectation waiting on (currency, address, amount) that has not
    /// yet reached `SUCCESS`.
    fn find_expectation(
        &self,
        currency: &str,
        to_address: &str,
        amount: u64,
    ) -> Result<Option<DepositRecord>>;

    /// The record a given transfer was already bound to, whatever its status
    fn find_by_transfer(
        &self,
        currency: &str,
        tx_hash: &str,
        instruction_index: usize,
    ) -> Result<Option<DepositRecord>>;

    /// Full-record upsert keyed by the record's own id. A bound record also
    /// claims its transfer in the same write.
    fn persist(&self, record: &DepositRecord) -> Result<()>;

    fn get(&self, currency: &str, id: &str) -> Result<Option<DepositRecord>>;
    fn list(&self, currency: &str) -> Result<Vec<DepositRecord>>;
    fn list_by_status(&self, currency: &str, status: UpchainStatus) -> Result<Vec<DepositRecord>>;
}
