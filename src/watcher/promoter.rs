use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::{
    core::{
        chain::ChainClient,
        task::{ReconfirmReport, TaskReport, WatchTask},
        types::{Currency, DepositRecord, UpchainStatus},
    },
    error::{WatchError, WatchResult},
    watcher::context::WatcherContext,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RecordOutcome {
    Promoted,
    Refreshed,
    Missing,
}

/// Re-evaluates deposits awaiting confirmation against the current tip
pub struct ConfirmationPromoter<C: ChainClient> {
    context: WatcherContext,
    client: Arc<C>,
    shutdown: Option<watch::Receiver<bool>>,
}

impl<C: ChainClient> ConfirmationPromoter<C> {
    pub fn new(context: WatcherContext, client: Arc<C>) -> Self {
        Self {
            context,
            client,
            shutdown: None,
        }
    }

    /// Stop between records once the flag flips to `true`
    pub fn with_shutdown(mut self, shutdown: watch::Receiver<bool>) -> Self {
        self.shutdown = Some(shutdown);
        self
    }

    fn shutdown_requested(&self) -> bool {
        self.shutdown.as_ref().is_some_and(|rx| *rx.borrow())
    }

    pub async fn reconfirm(&self, currency_name: &str) -> WatchResult<ReconfirmReport> {
        let currency = self.context.currency(currency_name)?;
        let tip = self.client.tip_height().await?;

        let waiting = self
            .context
            .deposits
            .list_by_status(&currency.name, UpchainStatus::WaitingConfirm)
            .map_err(WatchError::persistence)?;

        let mut report = ReconfirmReport {
            tip,
            ..Default::default()
        };

        if waiting.is_empty() {
            debug!(currency = %currency.name, "No deposits waiting for confirmation");
            return Ok(report);
        }

        let pending = waiting.len();
        for record in waiting {
            if self.shutdown_requested() {
                report.interrupted = true;
                info!(
                    currency = %currency.name,
                    checked = report.checked,
                    remaining = pending - report.checked,
                    "🛑 Reconfirmation interrupted by shutdown"
                );
                return Ok(report);
            }

            report.checked += 1;
            let id = record.id.clone();
            match self.reconfirm_record(&currency, record, tip).await {
                Ok(RecordOutcome::Promoted) => report.promoted += 1,
                Ok(RecordOutcome::Refreshed) => report.refreshed += 1,
                Ok(RecordOutcome::Missing) => report.missing += 1,
                Err(e) => {
                    report.failed += 1;
                    self.context.metrics.record_reconfirm_failure();
                    error!(currency = %currency.name, deposit = %id, "❌ Reconfirmation failed: {}", e);
                }
            }
        }

        info!(
            currency = %currency.name,
            tip,
            checked = report.checked,
            promoted = report.promoted,
            refreshed = report.refreshed,
            missing = report.missing,
            failed = report.failed,
            "🔁 Reconfirmation finished"
        );
        Ok(report)
    }

    async fn reconfirm_record(
        &self,
        currency: &Currency,
        mut record: DepositRecord,
        tip: u64,
    ) -> WatchResult<RecordOutcome> {
        let (Some(tx_hash), Some(height)) = (record.tx_hash.clone(), record.height) else {
            return Err(WatchError::Persistence(format!(
                "deposit {} is WAITING_CONFIRM without tx_hash/height",
                record.id
            )));
        };

        match self.client.get_transaction(&tx_hash).await {
            Ok(tx) if tx.failed => {
                warn!(deposit = %record.id, tx = %tx_hash, "Matched transaction reports failure, left unchanged");
                return Ok(RecordOutcome::Missing);
            }
            Ok(tx) => {
                if tx.height != height {
                    warn!(
                        deposit = %record.id,
                        tx = %tx_hash,
                        recorded = height,
                        node = tx.height,
                        "Transaction height differs from recorded height"
                    );
                }
            }
            Err(WatchError::NotFound(_)) => {
                warn!(deposit = %record.id, tx = %tx_hash, "Matched transaction not found on node, left unchanged");
                return Ok(RecordOutcome::Missing);
            }
            Err(e) => return Err(e),
        }

        let confirmations = tip.saturating_sub(height);
        record.current_confirm = confirmations;
        record.updated_at = Utc::now();

        let outcome = match UpchainStatus::from_confirmations(confirmations, currency.confirms) {
            UpchainStatus::Success => {
                record.upchain_status = Some(UpchainStatus::Success);
                record.upchain_success_at = Some(Utc::now());
                RecordOutcome::Promoted
            }
            UpchainStatus::WaitingConfirm => RecordOutcome::Refreshed,
        };

        self.context
            .deposits
            .persist(&record)
            .map_err(WatchError::persistence)?;

        if outcome == RecordOutcome::Promoted {
            self.context.metrics.record_deposit_confirmed();
            info!(deposit = %record.id, tx = %tx_hash, confirmations, "✅ Deposit confirmed");
        } else {
            debug!(deposit = %record.id, confirmations, required = currency.confirms, "Confirmations refreshed");
        }

        Ok(outcome)
    }
}

#[async_trait]
impl<C: ChainClient + 'static> WatchTask for ConfirmationPromoter<C> {
    fn name(&self) -> &'static str {
        "reconfirm"
    }

    async fn run_once(&self, currency: &str) -> WatchResult<TaskReport> {
        self.reconfirm(currency).await.map(TaskReport::Reconfirm)
    }
}
