use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::core::types::TransferEvent;
use crate::error::WatchResult;

/// Minimal view of a fetched block the scanner needs regardless of chain
pub trait ChainBlock: Send + Sync {
    fn height(&self) -> u64;
    fn timestamp(&self) -> Option<DateTime<Utc>>;
    fn transaction_count(&self) -> usize;
}

/// What the node reports about a previously matched transaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionInfo {
    pub height: u64,
    /// The transaction landed but its execution failed
    pub failed: bool,
}

/// Node access. Every call either returns the requested object or fails with
/// `NotFound` or `Transient`; implementations never retry.
#[async_trait]
pub trait ChainClient: Send + Sync {
    type Block: ChainBlock;

    async fn tip_height(&self) -> WatchResult<u64>;
    async fn get_block(&self, height: u64) -> WatchResult<Self::Block>;
    async fn get_transaction(&self, hash: &str) -> WatchResult<TransactionInfo>;
}

/// Per-chain decoding of native transfers out of a block.
///
/// The returned iterator is derived purely from the block, so calling
/// `extract` again restarts the sequence.
pub trait TransferExtractor: Send + Sync {
    type Block: ChainBlock;

    fn extract<'a>(
        &'a self,
        block: &'a Self::Block,
    ) -> Box<dyn Iterator<Item = TransferEvent> + Send + 'a>;
}
