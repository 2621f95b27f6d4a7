use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Chain families a currency can be watched on
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ChainType {
    Solana,
}

impl ChainType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChainType::Solana => "solana",
        }
    }
}

/// A configured chain/asset. Read-only once loaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Currency {
    pub id: u64,
    pub name: String,
    pub chain_type: ChainType,
    /// Blocks that must be built on top of a transfer before it is final
    pub confirms: u64,
}

/// Per-currency scanning checkpoint
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct HeightRecord {
    pub currency_id: u64,
    pub currency_name: String,

    /// Last block height fully scanned (inclusive)
    pub current_height: u64,

    pub updated_at: DateTime<Utc>,
}

/// Confirmation state of a matched deposit
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UpchainStatus {
    /// Matched, but fewer confirmations than the currency requires
    WaitingConfirm,
    /// Terminal
    Success,
}

impl UpchainStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            UpchainStatus::WaitingConfirm => "WAITING_CONFIRM",
            UpchainStatus::Success => "SUCCESS",
        }
    }

    pub fn from_confirmations(confirmations: u64, required: u64) -> Self {
        if confirmations >= required {
            UpchainStatus::Success
        } else {
            UpchainStatus::WaitingConfirm
        }
    }
}

impl fmt::Display for UpchainStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A deposit expected by the upstream ledger, and what the chain has shown about it.
///
/// `upchain_status` is `None` until a transfer has been matched.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct DepositRecord {
    pub id: String,
    pub currency: String,
    pub to_address: String,
    /// Expected amount in the chain's base unit (lamports for SOL)
    pub amount: u64,

    #[serde(default)]
    pub from_address: Option<String>,
    #[serde(default)]
    pub tx_hash: Option<String>,
    /// Position of the matched transfer inside its transaction
    #[serde(default)]
    pub instruction_index: Option<usize>,
    /// Height of the block containing the matched transfer
    #[serde(default)]
    pub height: Option<u64>,
    #[serde(default)]
    pub current_confirm: u64,
    #[serde(default)]
    pub upchain_status: Option<UpchainStatus>,
    #[serde(default)]
    pub upchain_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub upchain_success_at: Option<DateTime<Utc>>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl DepositRecord {
    pub fn expect(
        id: impl Into<String>,
        currency: impl Into<String>,
        to_address: impl Into<String>,
        amount: u64,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            currency: currency.into(),
            to_address: to_address.into(),
            amount,
            from_address: None,
            tx_hash: None,
            instruction_index: None,
            height: None,
            current_confirm: 0,
            upchain_status: None,
            upchain_at: None,
            upchain_success_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_success(&self) -> bool {
        self.upchain_status == Some(UpchainStatus::Success)
    }

    /// Whether this record may be bound to the given transfer.
    /// Rebinding to the transfer it already holds is allowed so that a
    /// re-scan of the same block overwrites with identical values.
    pub fn accepts_transfer(&self, tx_hash: &str, instruction_index: usize) -> bool {
        match &self.tx_hash {
            None => true,
            Some(bound) => {
                bound == tx_hash && self.instruction_index.is_none_or(|ix| ix == instruction_index)
            }
        }
    }
}

/// A native-currency transfer observed in a block. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferEvent {
    pub from: String,
    pub to: String,
    pub amount: u64,
    /// Identity of the owning transaction (first signature on Solana)
    pub tx_hash: String,
    pub instruction_index: usize,
    pub height: u64,
    pub block_time: Option<DateTime<Utc>>,
}
