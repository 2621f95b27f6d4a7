use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::{
    core::{
        chain::{ChainBlock, ChainClient, TransferExtractor},
        task::{ScanOutcome, TaskReport, WatchTask},
        types::Currency,
    },
    error::WatchResult,
    utils::metrics::BlockFetchFailureReason,
    watcher::{
        checkpoint::HeightCheckpoint,
        context::WatcherContext,
        matcher::{DepositMatcher, MatchResult},
    },
};

/// Per-block tallies
#[derive(Debug, Default, Clone, Copy)]
struct BlockStats {
    transfers: usize,
    matched: usize,
}

/// Drives `(checkpoint, tip]` block by block
pub struct BlockScanner<C, X>
where
    C: ChainClient,
    X: TransferExtractor<Block = C::Block>,
{
    context: WatcherContext,
    client: Arc<C>,
    extractor: X,
    checkpoint: HeightCheckpoint,
    matcher: DepositMatcher,
    shutdown: Option<watch::Receiver<bool>>,
}

impl<C, X> BlockScanner<C, X>
where
    C: ChainClient,
    X: TransferExtractor<Block = C::Block>,
{
    pub fn new(context: WatcherContext, client: Arc<C>, extractor: X) -> Self {
        let checkpoint = HeightCheckpoint::new(context.heights.clone());
        let matcher = DepositMatcher::new(context.deposits.clone(), context.metrics.clone());
        Self {
            context,
            client,
            extractor,
            checkpoint,
            matcher,
            shutdown: None,
        }
    }

    /// Stop between blocks once `true` is published on this channel
    pub fn with_shutdown(mut self, shutdown: watch::Receiver<bool>) -> Self {
        self.shutdown = Some(shutdown);
        self
    }

    fn shutdown_requested(&self) -> bool {
        self.shutdown.as_ref().is_some_and(|rx| *rx.borrow())
    }

    pub async fn scan(&self, currency_name: &str) -> WatchResult<ScanOutcome> {
        let currency = self.context.currency(currency_name)?;
        let metrics = &self.context.metrics;

        let tip = self.client.tip_height().await?;

        let Some(record) = self.checkpoint.get(&currency.name)? else {
            // History before the first run is out of scope
            self.checkpoint.set(&currency, tip, Utc::now())?;
            metrics.record_blocks_processed(0, tip);
            info!(currency = %currency.name, height = tip, "✅ Checkpoint seeded at chain tip");
            return Ok(ScanOutcome::Seeded { height: tip });
        };

        let checkpoint = record.current_height;
        let gap = tip.saturating_sub(checkpoint);
        metrics.record_sync_gap(gap);

        // One-block buffer: never act on the very latest tip alone
        if gap <= 1 {
            debug!(currency = %currency.name, checkpoint, tip, "No new block range to scan");
            return Ok(ScanOutcome::UpToDate { checkpoint, tip });
        }

        let from = checkpoint + 1;
        info!(currency = %currency.name, from, to = tip, "🔍 Scanning block range");

        let mut transfers = 0;
        let mut matched = 0;

        for height in from..=tip {
            if self.shutdown_requested() {
                let done = height - 1;
                info!(currency = %currency.name, checkpoint = done, tip, "🛑 Scan interrupted by shutdown");
                return Ok(ScanOutcome::Interrupted {
                    checkpoint: done,
                    tip,
                });
            }

            let block = match self.client.get_block(height).await {
                Ok(block) => {
                    metrics.record_block_fetch_success();
                    block
                }
                Err(e) => {
                    metrics.record_block_fetch_failure(BlockFetchFailureReason::from(&e));
                    warn!(currency = %currency.name, height, "❌ Fetch block failed, range aborted: {}", e);
                    return Err(e);
                }
            };

            let stats = self.process_block(&currency, &block, tip).inspect_err(|e| {
                error!(currency = %currency.name, height, "❌ Block processing failed, checkpoint kept at {}: {}", height - 1, e);
            })?;
            transfers += stats.transfers;
            matched += stats.matched;

            self.checkpoint.set(&currency, height, Utc::now())?;
            metrics.record_blocks_processed(1, height);
        }

        info!(
            currency = %currency.name,
            from,
            to = tip,
            transfers,
            matched,
            "✅ Block range scanned"
        );

        Ok(ScanOutcome::Scanned {
            from,
            to: tip,
            transfers,
            matched,
        })
    }

    fn process_block(&self, currency: &Currency, block: &C::Block, tip: u64) -> WatchResult<BlockStats> {
        let mut stats = BlockStats::default();

        for event in self.extractor.extract(block) {
            stats.transfers += 1;
            if let MatchResult::Matched { .. } = self.matcher.match_event(currency, &event, tip)? {
                stats.matched += 1;
            }
        }

        debug!(
            currency = %currency.name,
            height = block.height(),
            txs = block.transaction_count(),
            transfers = stats.transfers,
            matched = stats.matched,
            "Block processed"
        );
        Ok(stats)
    }
}

#[async_trait]
impl<C, X> WatchTask for BlockScanner<C, X>
where
    C: ChainClient + 'static,
    X: TransferExtractor<Block = C::Block> + 'static,
{
    fn name(&self) -> &'static str {
        "scan"
    }

    async fn run_once(&self, currency: &str) -> WatchResult<TaskReport> {
        self.scan(currency).await.map(TaskReport::Scan)
    }
}
