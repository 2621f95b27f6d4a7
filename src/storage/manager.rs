use crate::core::storage::{DepositStore, HeightStore};
use crate::core::types::{DepositRecord, HeightRecord, UpchainStatus};
use crate::storage::schema::keys;
use crate::storage::traits::KVStorage;
use anyhow::{Context, Result};
use std::sync::Arc;

use super::rocksdb::RocksDBStorage;

pub struct RocksHeightStore {
    pub storage: Arc<RocksDBStorage>,
}

impl HeightStore for RocksHeightStore {
    fn get_height(&self, currency: &str) -> Result<Option<HeightRecord>> {
        self.storage.read_json(&keys::height_key(currency))
    }

    fn save_height(&self, record: &HeightRecord) -> Result<()> {
        self.storage
            .write_json(&keys::height_key(&record.currency_name), record)
    }
}

pub struct RocksDepositStore {
    pub storage: Arc<RocksDBStorage>,
}

impl RocksDepositStore {
    fn read_indexed(&self, currency: &str, to_address: &str, amount: u64) -> Result<Option<DepositRecord>> {
        let index_key = keys::deposit_index_key(currency, to_address, amount);
        let Some(id) = self.storage.read(&index_key)? else {
            return Ok(None);
        };

        let record = self.get(currency, &id)?.ok_or_else(|| {
            anyhow::anyhow!(
                "Deposit index {} points at missing record {}",
                index_key,
                id
            )
        })?;
        Ok(Some(record))
    }
}

impl DepositStore for RocksDepositStore {
    fn insert_expectation(&self, record: &DepositRecord) -> Result<()> {
        if self.get(&record.currency, &record.id)?.is_some() {
            anyhow::bail!(
                "Deposit {} already exists for currency {}",
                record.id,
                record.currency
            );
        }

        if let Some(open) = self.read_indexed(&record.currency, &record.to_address, record.amount)?
            && !open.is_success()
        {
            anyhow::bail!(
                "Deposit {} is still waiting on {} for amount {}",
                open.id,
                record.to_address,
                record.amount
            );
        }

        let record_json = serde_json::to_string(record)
            .with_context(|| format!("Failed to serialize deposit {}", record.id))?;

        // Record and lookup index land together
        self.storage.batch_write(vec![
            (keys::deposit_key(&record.currency, &record.id), record_json),
            (
                keys::deposit_index_key(&record.currency, &record.to_address, record.amount),
                record.id.clone(),
            ),
        ])
    }

    fn find_expectation(
        &self,
        currency: &str,
        to_address: &str,
        amount: u64,
    ) -> Result<Option<DepositRecord>> {
        Ok(self
            .read_indexed(currency, to_address, amount)?
            .filter(|record| !record.is_success()))
    }

    fn find_by_transfer(
        &self,
        currency: &str,
        tx_hash: &str,
        instruction_index: usize,
    ) -> Result<Option<DepositRecord>> {
        let tx_key = keys::deposit_tx_key(currency, tx_hash, instruction_index);
        let Some(id) = self.storage.read(&tx_key)? else {
            return Ok(None);
        };
        let record = self.get(currency, &id)?.ok_or_else(|| {
            anyhow::anyhow!("Transfer index {} points at missing record {}", tx_key, id)
        })?;
        Ok(Some(record))
    }

    fn persist(&self, record: &DepositRecord) -> Result<()> {
        let record_json = serde_json::to_string(record)
            .with_context(|| format!("Failed to serialize deposit {}", record.id))?;
        let mut pairs = vec![(keys::deposit_key(&record.currency, &record.id), record_json)];

        // The claim on the transfer must never exist without the record, or the reverse
        if let (Some(tx_hash), Some(ix)) = (&record.tx_hash, record.instruction_index) {
            pairs.push((
                keys::deposit_tx_key(&record.currency, tx_hash, ix),
                record.id.clone(),
            ));
        }
        self.storage.batch_write(pairs)
    }

    fn get(&self, currency: &str, id: &str) -> Result<Option<DepositRecord>> {
        self.storage.read_json(&keys::deposit_key(currency, id))
    }

    fn list(&self, currency: &str) -> Result<Vec<DepositRecord>> {
        self.storage
            .scan_prefix(&keys::deposit_prefix(currency), None)?
            .into_iter()
            .map(|(key, value)| {
                serde_json::from_str::<DepositRecord>(&value)
                    .with_context(|| format!("Failed to deserialize deposit at key: {}", key))
            })
            .collect()
    }

    fn list_by_status(&self, currency: &str, status: UpchainStatus) -> Result<Vec<DepositRecord>> {
        Ok(self
            .list(currency)?
            .into_iter()
            .filter(|record| record.upchain_status == Some(status))
            .collect())
    }
}

pub struct WatcherStorageManager {
    pub storage: Arc<RocksDBStorage>,
    pub heights: Arc<RocksHeightStore>,
    pub deposits: Arc<RocksDepositStore>,
}

impl WatcherStorageManager {
    pub fn new(storage: Arc<RocksDBStorage>) -> Self {
        Self {
            heights: Arc::new(RocksHeightStore {
                storage: storage.clone(),
            }),
            deposits: Arc::new(RocksDepositStore {
                storage: storage.clone(),
            }),
            storage,
        }
    }
}
