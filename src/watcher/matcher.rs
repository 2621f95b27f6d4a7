use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::core::storage::DepositStore;
use crate::core::types::{Currency, DepositRecord, TransferEvent, UpchainStatus};
use crate::error::{WatchError, WatchResult};
use crate::utils::metrics::WatcherMetrics;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchResult {
    Matched {
        deposit_id: String,
        status: UpchainStatus,
    },
    /// Most transfers on chain are unrelated to us
    NoExpectation,
    /// The expectation already holds a different transaction
    BoundElsewhere { deposit_id: String },
    Rejected,
}

/// Binds observed transfers to pending deposit expectations
pub struct DepositMatcher {
    deposits: Arc<dyn DepositStore>,
    metrics: Arc<dyn WatcherMetrics>,
}

impl DepositMatcher {
    pub fn new(deposits: Arc<dyn DepositStore>, metrics: Arc<dyn WatcherMetrics>) -> Self {
        Self { deposits, metrics }
    }

    /// Match one transfer. `tip` is the chain tip read once at the start of
    /// the scan call, so every transfer in that call is measured against it.
    ///
    /// A transfer already claimed by a deposit goes back to that deposit, so a
    /// rescan can never hand it to a newer expectation on the same slot.
    ///
    /// Only storage failures are returned as errors; they must abort the
    /// block so its checkpoint is not advanced.
    pub fn match_event(
        &self,
        currency: &Currency,
        event: &TransferEvent,
        tip: u64,
    ) -> WatchResult<MatchResult> {
        if event.to.is_empty() {
            warn!(tx = %event.tx_hash, "Transfer without destination address");
            return Ok(MatchResult::Rejected);
        }

        if let Some(bound) = self
            .deposits
            .find_by_transfer(&currency.name, &event.tx_hash, event.instruction_index)
            .map_err(WatchError::persistence)?
        {
            if bound.is_success() {
                debug!(deposit = %bound.id, tx = %event.tx_hash, "Transfer already confirmed for deposit");
                return Ok(MatchResult::Matched {
                    deposit_id: bound.id,
                    status: UpchainStatus::Success,
                });
            }
            return self.bind(currency, bound, event, tip);
        }

        let Some(record) = self
            .deposits
            .find_expectation(&currency.name, &event.to, event.amount)
            .map_err(WatchError::persistence)?
        else {
            debug!(to = %event.to, amount = event.amount, "Address not awaiting a deposit");
            return Ok(MatchResult::NoExpectation);
        };

        if !record.accepts_transfer(&event.tx_hash, event.instruction_index) {
            debug!(
                deposit = %record.id,
                bound = ?record.tx_hash,
                tx = %event.tx_hash,
                "Deposit already bound to another transfer"
            );
            return Ok(MatchResult::BoundElsewhere {
                deposit_id: record.id,
            });
        }

        self.bind(currency, record, event, tip)
    }

    fn bind(
        &self,
        currency: &Currency,
        mut record: DepositRecord,
        event: &TransferEvent,
        tip: u64,
    ) -> WatchResult<MatchResult> {
        let confirmations = tip.saturating_sub(event.height);
        let status = UpchainStatus::from_confirmations(confirmations, currency.confirms);

        record.from_address = Some(event.from.clone());
        record.tx_hash = Some(event.tx_hash.clone());
        record.instruction_index = Some(event.instruction_index);
        record.height = Some(event.height);
        record.current_confirm = confirmations;
        record.upchain_at = event.block_time;
        record.upchain_status = Some(status);
        record.upchain_success_at = match status {
            UpchainStatus::Success => Some(event.block_time.unwrap_or_else(Utc::now)),
            UpchainStatus::WaitingConfirm => None,
        };
        record.updated_at = Utc::now();

        self.deposits
            .persist(&record)
            .map_err(WatchError::persistence)?;
        self.metrics.record_deposit_matched(status);

        info!(
            deposit = %record.id,
            tx = %event.tx_hash,
            ix = event.instruction_index,
            height = event.height,
            confirmations,
            status = %status,
            "💰 Deposit matched"
        );

        Ok(MatchResult::Matched {
            deposit_id: record.id,
            status,
        })
    }
}
