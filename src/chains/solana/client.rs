use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tracing::debug;

use crate::chains::solana::types::{
    RpcErrorObject, RpcResponse, SolanaBlock, UiBlock, UiConfirmedTransaction,
};
use crate::config::CurrencyConfig;
use crate::core::chain::{ChainClient, TransactionInfo};
use crate::error::{WatchError, WatchResult};

/// Block not available for slot (not produced yet, or not confirmed at this commitment)
const BLOCK_NOT_AVAILABLE: i64 = -32004;
/// Slot was skipped, or missing due to ledger jump to recent snapshot
const SLOT_SKIPPED: i64 = -32007;
/// Slot was skipped, or missing in long-term storage
const LONG_TERM_STORAGE_SLOT_SKIPPED: i64 = -32009;
/// Block status not yet available
const BLOCK_STATUS_NOT_AVAILABLE_YET: i64 = -32014;

enum RpcFailure {
    Transport(String),
    Rpc(RpcErrorObject),
}

impl RpcFailure {
    fn into_watch_error(self, what: &str) -> WatchError {
        match self {
            RpcFailure::Transport(msg) => WatchError::Transient(format!("{what}: {msg}")),
            RpcFailure::Rpc(err) => match err.code {
                BLOCK_NOT_AVAILABLE | BLOCK_STATUS_NOT_AVAILABLE_YET => {
                    WatchError::NotFound(format!("{what}: {}", err.message))
                }
                _ => WatchError::Transient(format!("{what}: rpc error {}: {}", err.code, err.message)),
            },
        }
    }
}

/// Solana JSON-RPC client. Timeouts are applied by the HTTP client and
/// surface as `Transient`.
pub struct SolanaClient {
    http: reqwest::Client,
    rpc_url: String,
    commitment: String,
    next_id: AtomicU64,
}

impl SolanaClient {
    pub fn new(rpc_url: &str, commitment: &str, timeout: Duration) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            rpc_url: rpc_url.to_string(),
            commitment: commitment.to_string(),
            next_id: AtomicU64::new(1),
        })
    }

    pub fn from_config(cfg: &CurrencyConfig) -> anyhow::Result<Self> {
        Self::new(
            &cfg.rpc_url,
            &cfg.commitment,
            Duration::from_secs(cfg.rpc_timeout_secs),
        )
    }

    async fn call<T: DeserializeOwned>(&self, method: &str, params: Value) -> Result<Option<T>, RpcFailure> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        debug!(method, id, "📡 Solana RPC request");

        let response = self
            .http
            .post(&self.rpc_url)
            .json(&json!({
                "jsonrpc": "2.0",
                "id": id,
                "method": method,
                "params": params,
            }))
            .send()
            .await
            .map_err(|e| RpcFailure::Transport(e.to_string()))?
            .error_for_status()
            .map_err(|e| RpcFailure::Transport(e.to_string()))?;

        let body: RpcResponse<T> = response
            .json()
            .await
            .map_err(|e| RpcFailure::Transport(format!("invalid response body: {e}")))?;

        if let Some(err) = body.error {
            return Err(RpcFailure::Rpc(err));
        }
        Ok(body.result)
    }
}

/// Skipped slots become empty blocks so the scan can move past them
fn block_from_response(
    height: u64,
    response: Result<Option<UiBlock>, RpcFailure>,
) -> WatchResult<SolanaBlock> {
    match response {
        Ok(Some(block)) => Ok(SolanaBlock::new(height, block)),
        Ok(None) => Err(WatchError::NotFound(format!("block at slot {height}"))),
        Err(RpcFailure::Rpc(err))
            if err.code == SLOT_SKIPPED || err.code == LONG_TERM_STORAGE_SLOT_SKIPPED =>
        {
            debug!(slot = height, "Slot skipped by leader, treating as empty block");
            Ok(SolanaBlock::skipped(height))
        }
        Err(e) => Err(e.into_watch_error(&format!("getBlock({height})"))),
    }
}

#[async_trait]
impl ChainClient for SolanaClient {
    type Block = SolanaBlock;

    async fn tip_height(&self) -> WatchResult<u64> {
        self.call::<u64>("getSlot", json!([{ "commitment": self.commitment }]))
            .await
            .map_err(|e| e.into_watch_error("getSlot"))?
            .ok_or_else(|| WatchError::Transient("getSlot returned no result".to_string()))
    }

    async fn get_block(&self, height: u64) -> WatchResult<SolanaBlock> {
        let params = json!([
            height,
            {
                "encoding": "json",
                "transactionDetails": "full",
                "rewards": false,
                "maxSupportedTransactionVersion": 0,
                "commitment": self.commitment,
            }
        ]);

        block_from_response(height, self.call::<UiBlock>("getBlock", params).await)
    }

    async fn get_transaction(&self, hash: &str) -> WatchResult<TransactionInfo> {
        let params = json!([
            hash,
            {
                "encoding": "json",
                "maxSupportedTransactionVersion": 0,
                "commitment": self.commitment,
            }
        ]);

        let tx = self
            .call::<UiConfirmedTransaction>("getTransaction", params)
            .await
            .map_err(|e| e.into_watch_error("getTransaction"))?
            .ok_or_else(|| WatchError::NotFound(format!("transaction {hash}")))?;

        Ok(TransactionInfo {
            height: tx.slot,
            failed: tx.meta.as_ref().is_some_and(|m| m.err.is_some()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rpc_error(code: i64) -> RpcFailure {
        RpcFailure::Rpc(RpcErrorObject {
            code,
            message: "boom".to_string(),
        })
    }

    #[test]
    fn block_not_available_maps_to_not_found() {
        assert!(rpc_error(BLOCK_NOT_AVAILABLE).into_watch_error("getBlock").is_not_found());
        assert!(
            rpc_error(BLOCK_STATUS_NOT_AVAILABLE_YET)
                .into_watch_error("getBlock")
                .is_not_found()
        );
    }

    #[test]
    fn other_failures_are_transient() {
        assert!(matches!(
            rpc_error(-32603).into_watch_error("getSlot"),
            WatchError::Transient(_)
        ));
        assert!(matches!(
            RpcFailure::Transport("connection refused".into()).into_watch_error("getSlot"),
            WatchError::Transient(_)
        ));
    }

    #[test]
    fn skipped_slot_becomes_empty_block() {
        for code in [SLOT_SKIPPED, LONG_TERM_STORAGE_SLOT_SKIPPED] {
            let block = block_from_response(1002, Err(rpc_error(code))).unwrap();
            assert_eq!(block.slot, 1002);
            assert!(block.block.transactions.is_empty());
        }
    }

    #[test]
    fn null_block_is_not_found() {
        let err = block_from_response(1002, Ok(None)).unwrap_err();
        assert!(err.is_not_found());

        let err = block_from_response(1002, Err(rpc_error(BLOCK_NOT_AVAILABLE))).unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn unreachable_node_is_transient() {
        let client = SolanaClient::new("http://127.0.0.1:1", "confirmed", Duration::from_millis(200))
            .expect("client");
        let err = client.tip_height().await.expect_err("no node listening");
        assert!(matches!(err, WatchError::Transient(_)));
    }
}
