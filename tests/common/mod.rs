#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use sol_deposit_watcher::{
    chains::solana::{
        SolanaBlock, SolanaTransferExtractor,
        extractor::{SYSTEM_PROGRAM_ID, encode_system_transfer},
        types::{
            UiBlock, UiCompiledInstruction, UiMessage, UiTransaction, UiTransactionMeta,
            UiTransactionWithMeta,
        },
    },
    core::{
        chain::{ChainClient, TransactionInfo},
        storage::{DepositStore, HeightStore},
        types::{ChainType, Currency, DepositRecord, UpchainStatus},
    },
    error::{WatchError, WatchResult},
    storage::{manager::WatcherStorageManager, rocksdb::RocksDBStorage, traits::KVStorage},
    utils::metrics::{NoopWatcherMetrics, WatcherMetrics},
    watcher::{
        context::{CurrencyRegistry, WatcherContext},
        promoter::ConfirmationPromoter,
        scanner::BlockScanner,
    },
};
use tempfile::TempDir;

pub const BLOCK_TIME: i64 = 1_700_000_000;

/// Scripted node: blocks and transactions are staged by the test, heights
/// without a staged block come back as empty blocks.
#[derive(Default)]
pub struct MockChain {
    tip: Mutex<u64>,
    blocks: Mutex<HashMap<u64, SolanaBlock>>,
    transactions: Mutex<HashMap<String, TransactionInfo>>,
    failing_heights: Mutex<HashSet<u64>>,
    missing_heights: Mutex<HashSet<u64>>,
    fetched: Mutex<Vec<u64>>,
}

impl MockChain {
    pub fn new(tip: u64) -> Self {
        let chain = Self::default();
        chain.set_tip(tip);
        chain
    }

    pub fn set_tip(&self, tip: u64) {
        *self.tip.lock().unwrap() = tip;
    }

    /// Stage a successful SOL transfer in the block at `height`
    pub fn add_transfer(&self, height: u64, sig: &str, to: &str, lamports: u64) {
        self.blocks
            .lock()
            .unwrap()
            .entry(height)
            .or_insert_with(|| solana_block(height, Vec::new()))
            .block
            .transactions
            .push(transfer_tx(sig, "Sender1111", to, lamports));
        self.transactions.lock().unwrap().insert(
            sig.to_string(),
            TransactionInfo {
                height,
                failed: false,
            },
        );
    }

    /// The node no longer knows the transaction
    pub fn forget_transaction(&self, sig: &str) {
        self.transactions.lock().unwrap().remove(sig);
    }

    pub fn fail_at(&self, height: u64) {
        self.failing_heights.lock().unwrap().insert(height);
    }

    /// The node reports the block as not available yet
    pub fn withhold(&self, height: u64) {
        self.missing_heights.lock().unwrap().insert(height);
    }

    /// The leader produced nothing at this slot
    pub fn skip_slot(&self, height: u64) {
        self.blocks
            .lock()
            .unwrap()
            .insert(height, SolanaBlock::skipped(height));
    }

    pub fn heal(&self, height: u64) {
        self.failing_heights.lock().unwrap().remove(&height);
        self.missing_heights.lock().unwrap().remove(&height);
    }

    pub fn fetched(&self) -> Vec<u64> {
        self.fetched.lock().unwrap().clone()
    }

    pub fn clear_fetched(&self) {
        self.fetched.lock().unwrap().clear();
    }
}

#[async_trait]
impl ChainClient for MockChain {
    type Block = SolanaBlock;

    async fn tip_height(&self) -> WatchResult<u64> {
        Ok(*self.tip.lock().unwrap())
    }

    async fn get_block(&self, height: u64) -> WatchResult<SolanaBlock> {
        self.fetched.lock().unwrap().push(height);
        if self.failing_heights.lock().unwrap().contains(&height) {
            return Err(WatchError::Transient(format!(
                "connection reset fetching {height}"
            )));
        }
        if self.missing_heights.lock().unwrap().contains(&height) {
            return Err(WatchError::NotFound(format!("block at slot {height}")));
        }
        Ok(self
            .blocks
            .lock()
            .unwrap()
            .get(&height)
            .cloned()
            .unwrap_or_else(|| solana_block(height, Vec::new())))
    }

    async fn get_transaction(&self, hash: &str) -> WatchResult<TransactionInfo> {
        self.transactions
            .lock()
            .unwrap()
            .get(hash)
            .cloned()
            .ok_or_else(|| WatchError::NotFound(format!("transaction {hash}")))
    }
}

pub fn transfer_tx(sig: &str, from: &str, to: &str, lamports: u64) -> UiTransactionWithMeta {
    UiTransactionWithMeta {
        transaction: UiTransaction {
            signatures: vec![sig.to_string()],
            message: UiMessage {
                account_keys: vec![from.to_string(), to.to_string(), SYSTEM_PROGRAM_ID.to_string()],
                instructions: vec![UiCompiledInstruction {
                    program_id_index: 2,
                    accounts: vec![0, 1],
                    data: bs58::encode(encode_system_transfer(lamports)).into_string(),
                }],
            },
        },
        meta: Some(UiTransactionMeta::default()),
    }
}

pub fn solana_block(slot: u64, transactions: Vec<UiTransactionWithMeta>) -> SolanaBlock {
    SolanaBlock::new(
        slot,
        UiBlock {
            block_time: Some(BLOCK_TIME),
            transactions,
            ..Default::default()
        },
    )
}

pub fn sol(confirms: u64) -> Currency {
    Currency {
        id: 1,
        name: "SOL".to_string(),
        chain_type: ChainType::Solana,
        confirms,
    }
}

/// Deposit store whose writes can be made to fail, for exercising aborts
pub struct FlakyDeposits {
    inner: Arc<dyn DepositStore>,
    fail_persist: AtomicBool,
}

impl FlakyDeposits {
    pub fn new(inner: Arc<dyn DepositStore>) -> Self {
        Self {
            inner,
            fail_persist: AtomicBool::new(false),
        }
    }

    pub fn set_failing(&self, failing: bool) {
        self.fail_persist.store(failing, Ordering::SeqCst);
    }
}

impl DepositStore for FlakyDeposits {
    fn insert_expectation(&self, record: &DepositRecord) -> anyhow::Result<()> {
        self.inner.insert_expectation(record)
    }

    fn find_expectation(
        &self,
        currency: &str,
        to_address: &str,
        amount: u64,
    ) -> anyhow::Result<Option<DepositRecord>> {
        self.inner.find_expectation(currency, to_address, amount)
    }

    fn find_by_transfer(
        &self,
        currency: &str,
        tx_hash: &str,
        instruction_index: usize,
    ) -> anyhow::Result<Option<DepositRecord>> {
        self.inner.find_by_transfer(currency, tx_hash, instruction_index)
    }

    fn persist(&self, record: &DepositRecord) -> anyhow::Result<()> {
        if self.fail_persist.load(Ordering::SeqCst) {
            anyhow::bail!("disk full writing deposit {}", record.id);
        }
        self.inner.persist(record)
    }

    fn get(&self, currency: &str, id: &str) -> anyhow::Result<Option<DepositRecord>> {
        self.inner.get(currency, id)
    }

    fn list(&self, currency: &str) -> anyhow::Result<Vec<DepositRecord>> {
        self.inner.list(currency)
    }

    fn list_by_status(
        &self,
        currency: &str,
        status: UpchainStatus,
    ) -> anyhow::Result<Vec<DepositRecord>> {
        self.inner.list_by_status(currency, status)
    }
}

/// RocksDB in a temp dir plus a scripted chain, wired the way the binary does
pub struct Harness {
    _temp: TempDir,
    pub storage: Arc<RocksDBStorage>,
    pub heights: Arc<dyn HeightStore>,
    pub deposits: Arc<dyn DepositStore>,
    /// The store the watcher writes through; `deposits` reads behind it
    pub flaky: Arc<FlakyDeposits>,
    pub chain: Arc<MockChain>,
    pub context: WatcherContext,
}

impl Harness {
    pub fn new(confirms: u64, tip: u64) -> Self {
        Self::with_metrics(confirms, tip, Arc::new(NoopWatcherMetrics::new()))
    }

    pub fn with_metrics(confirms: u64, tip: u64, metrics: Arc<dyn WatcherMetrics>) -> Self {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("rocksdb");
        let storage = Arc::new(RocksDBStorage::new(path.to_str().unwrap()).unwrap());
        storage.init().unwrap();

        let manager = WatcherStorageManager::new(storage.clone());
        let heights: Arc<dyn HeightStore> = manager.heights.clone();
        let deposits: Arc<dyn DepositStore> = manager.deposits.clone();
        let registry = Arc::new(CurrencyRegistry::new([sol(confirms)]));
        let flaky = Arc::new(FlakyDeposits::new(deposits.clone()));
        let context = WatcherContext::new(registry, heights.clone(), flaky.clone(), metrics);

        Self {
            _temp: temp,
            storage,
            heights,
            deposits,
            flaky,
            chain: Arc::new(MockChain::new(tip)),
            context,
        }
    }

    pub fn scanner(&self) -> BlockScanner<MockChain, SolanaTransferExtractor> {
        BlockScanner::new(
            self.context.clone(),
            self.chain.clone(),
            SolanaTransferExtractor::new(),
        )
    }

    pub fn promoter(&self) -> ConfirmationPromoter<MockChain> {
        ConfirmationPromoter::new(self.context.clone(), self.chain.clone())
    }

    pub fn checkpoint(&self) -> Option<u64> {
        self.heights
            .get_height("SOL")
            .unwrap()
            .map(|r| r.current_height)
    }
}
