use async_trait::async_trait;
use std::fmt;

use crate::error::WatchResult;

/// Result of one `BlockScanner::scan` call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanOutcome {
    /// No checkpoint existed; it was seeded to the tip and nothing was scanned
    Seeded { height: u64 },
    /// Fewer than two new blocks; nothing fetched
    UpToDate { checkpoint: u64, tip: u64 },
    /// Every height in `from..=to` was processed
    Scanned {
        from: u64,
        to: u64,
        transfers: usize,
        matched: usize,
    },
    /// Shutdown was requested; the checkpoint stops at the last finished block
    Interrupted { checkpoint: u64, tip: u64 },
}

/// Result of one `ConfirmationPromoter::reconfirm` call
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconfirmReport {
    pub tip: u64,
    pub checked: usize,
    pub promoted: usize,
    pub refreshed: usize,
    pub missing: usize,
    pub failed: usize,
    /// Shutdown arrived before every waiting record was checked
    pub interrupted: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskReport {
    Scan(ScanOutcome),
    Reconfirm(ReconfirmReport),
}

impl fmt::Display for TaskReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskReport::Scan(ScanOutcome::Seeded { height }) => {
                write!(f, "checkpoint seeded at {height}")
            }
            TaskReport::Scan(ScanOutcome::UpToDate { checkpoint, tip }) => {
                write!(f, "up to date (checkpoint {checkpoint}, tip {tip})")
            }
            TaskReport::Scan(ScanOutcome::Scanned {
                from,
                to,
                transfers,
                matched,
            }) => write!(
                f,
                "scanned {from}..={to}: {transfers} transfers, {matched} matched"
            ),
            TaskReport::Scan(ScanOutcome::Interrupted { checkpoint, tip }) => {
                write!(f, "interrupted at {checkpoint} (tip {tip})")
            }
            TaskReport::Reconfirm(r) => {
                write!(
                    f,
                    "reconfirmed {} at tip {}: {} promoted, {} refreshed, {} missing, {} failed",
                    r.checked, r.tip, r.promoted, r.refreshed, r.missing, r.failed
                )?;
                if r.interrupted {
                    write!(f, " (interrupted)")?;
                }
                Ok(())
            }
        }
    }
}

/// A recurring unit of work the scheduler invokes once per tick
#[async_trait]
pub trait WatchTask: Send + Sync {
    fn name(&self) -> &'static str;
    async fn run_once(&self, currency: &str) -> WatchResult<TaskReport>;
}
