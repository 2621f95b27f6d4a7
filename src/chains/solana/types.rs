use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::chain::ChainBlock;

/// JSON-RPC envelope
#[derive(Deserialize, Debug)]
pub struct RpcResponse<T> {
    pub result: Option<T>,
    pub error: Option<RpcErrorObject>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct RpcErrorObject {
    pub code: i64,
    pub message: String,
}

/// `getBlock` result with `encoding: "json"` and full transaction details
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct UiBlock {
    #[serde(default)]
    pub block_time: Option<i64>,
    #[serde(default)]
    pub transactions: Vec<UiTransactionWithMeta>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct UiTransactionWithMeta {
    pub transaction: UiTransaction,
    #[serde(default)]
    pub meta: Option<UiTransactionMeta>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct UiTransaction {
    pub signatures: Vec<String>,
    pub message: UiMessage,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct UiMessage {
    pub account_keys: Vec<String>,
    pub instructions: Vec<UiCompiledInstruction>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct UiCompiledInstruction {
    pub program_id_index: u8,
    pub accounts: Vec<u8>,
    /// base58 encoded payload
    pub data: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct UiTransactionMeta {
    #[serde(default)]
    pub err: Option<serde_json::Value>,
    #[serde(default)]
    pub loaded_addresses: Option<UiLoadedAddresses>,
}

/// Accounts pulled in through address lookup tables (v0 transactions)
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct UiLoadedAddresses {
    #[serde(default)]
    pub writable: Vec<String>,
    #[serde(default)]
    pub readonly: Vec<String>,
}

impl UiTransactionWithMeta {
    pub fn failed(&self) -> bool {
        self.meta.as_ref().is_some_and(|m| m.err.is_some())
    }

    /// Static keys, then lookup-table writable, then lookup-table readonly:
    /// the order instruction account indexes refer to.
    pub fn account_keys(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = self
            .transaction
            .message
            .account_keys
            .iter()
            .map(String::as_str)
            .collect();
        if let Some(loaded) = self.meta.as_ref().and_then(|m| m.loaded_addresses.as_ref()) {
            keys.extend(loaded.writable.iter().map(String::as_str));
            keys.extend(loaded.readonly.iter().map(String::as_str));
        }
        keys
    }

    pub fn first_signature(&self) -> Option<&str> {
        self.transaction.signatures.first().map(String::as_str)
    }
}

/// `getTransaction` result, only the parts the promoter cross-checks
#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct UiConfirmedTransaction {
    pub slot: u64,
    #[serde(default)]
    pub meta: Option<UiTransactionMeta>,
}

/// A fetched block together with the slot it was requested at
#[derive(Debug, Clone)]
pub struct SolanaBlock {
    pub slot: u64,
    pub block: UiBlock,
}

impl SolanaBlock {
    pub fn new(slot: u64, block: UiBlock) -> Self {
        Self { slot, block }
    }

    /// Stand-in for a slot the leader skipped: nothing was produced there
    pub fn skipped(slot: u64) -> Self {
        Self {
            slot,
            block: UiBlock::default(),
        }
    }
}

impl ChainBlock for SolanaBlock {
    fn height(&self) -> u64 {
        self.slot
    }

    fn timestamp(&self) -> Option<DateTime<Utc>> {
        self.block
            .block_time
            .and_then(|secs| DateTime::from_timestamp(secs, 0))
    }

    fn transaction_count(&self) -> usize {
        self.block.transactions.len()
    }
}
