use crate::core::types::UpchainStatus;
use crate::error::WatchError;

/// Categorizes block fetch failures for metrics reporting.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BlockFetchFailureReason {
    NotFound,
    Rpc,
}

impl From<&WatchError> for BlockFetchFailureReason {
    fn from(err: &WatchError) -> Self {
        if err.is_not_found() {
            BlockFetchFailureReason::NotFound
        } else {
            BlockFetchFailureReason::Rpc
        }
    }
}

/// Abstraction over watcher runtime metrics, allowing a no-op implementation when disabled.
pub trait WatcherMetrics: Send + Sync {
    fn record_block_fetch_success(&self);
    fn record_block_fetch_failure(&self, reason: BlockFetchFailureReason);
    fn record_blocks_processed(&self, processed: u64, current_height: u64);
    fn record_sync_gap(&self, gap: u64);
    fn record_deposit_matched(&self, status: UpchainStatus);
    fn record_deposit_confirmed(&self);
    fn record_reconfirm_failure(&self);
}

#[derive(Default)]
pub struct NoopWatcherMetrics;

impl NoopWatcherMetrics {
    pub fn new() -> Self {
        Self
    }
}

impl WatcherMetrics for NoopWatcherMetrics {
    fn record_block_fetch_success(&self) {}

    fn record_block_fetch_failure(&self, _reason: BlockFetchFailureReason) {}

    fn record_blocks_processed(&self, _processed: u64, _current_height: u64) {}

    fn record_sync_gap(&self, _gap: u64) {}

    fn record_deposit_matched(&self, _status: UpchainStatus) {}

    fn record_deposit_confirmed(&self) {}

    fn record_reconfirm_failure(&self) {}
}

pub struct PrometheusWatcherMetrics {
    currency: String,
}

impl PrometheusWatcherMetrics {
    pub fn new(currency: impl Into<String>) -> Self {
        Self {
            currency: currency.into(),
        }
    }
}

impl WatcherMetrics for PrometheusWatcherMetrics {
    fn record_block_fetch_success(&self) {
        let currency = self.currency.clone();
        metrics::counter!(
            "watcher_block_fetch_success_total",
            1,
            "currency" => currency
        );
    }

    fn record_block_fetch_failure(&self, reason: BlockFetchFailureReason) {
        let currency = self.currency.clone();
        let reason_label = match reason {
            BlockFetchFailureReason::NotFound => "not_found",
            BlockFetchFailureReason::Rpc => "rpc_error",
        };
        metrics::counter!(
            "watcher_block_fetch_failure_total",
            1,
            "currency" => currency,
            "reason" => reason_label
        );
    }

    fn record_blocks_processed(&self, processed: u64, current_height: u64) {
        let currency = self.currency.clone();
        if processed > 0 {
            metrics::counter!(
                "watcher_blocks_processed_total",
                processed,
                "currency" => currency.clone()
            );
        }
        metrics::gauge!(
            "watcher_checkpoint_height",
            current_height as f64,
            "currency" => currency
        );
    }

    fn record_sync_gap(&self, gap: u64) {
        let currency = self.currency.clone();
        metrics::gauge!(
            "watcher_sync_gap_blocks",
            gap as f64,
            "currency" => currency
        );
    }

    fn record_deposit_matched(&self, status: UpchainStatus) {
        let currency = self.currency.clone();
        metrics::counter!(
            "watcher_deposits_matched_total",
            1,
            "currency" => currency,
            "status" => status.as_str()
        );
    }

    fn record_deposit_confirmed(&self) {
        let currency = self.currency.clone();
        metrics::counter!(
            "watcher_deposits_confirmed_total",
            1,
            "currency" => currency
        );
    }

    fn record_reconfirm_failure(&self) {
        let currency = self.currency.clone();
        metrics::counter!(
            "watcher_reconfirm_failure_total",
            1,
            "currency" => currency
        );
    }
}
