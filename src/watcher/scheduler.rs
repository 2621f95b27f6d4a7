use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info};

use crate::core::task::WatchTask;
use crate::watcher::guard::RunGuard;

/// Runs watch tasks on fixed intervals until shutdown is published.
///
/// A tick that finds the currency busy is skipped rather than queued, so a
/// slow scan never stacks up behind itself or overlaps a reconfirm pass.
/// A task already running when shutdown arrives is allowed to finish.
#[derive(Clone)]
pub struct Scheduler {
    guard: Arc<RunGuard>,
    shutdown: watch::Receiver<bool>,
}

impl Scheduler {
    pub fn new(guard: Arc<RunGuard>, shutdown: watch::Receiver<bool>) -> Self {
        Self { guard, shutdown }
    }

    pub fn spawn(
        &self,
        task: Arc<dyn WatchTask>,
        currency: String,
        every: Duration,
    ) -> JoinHandle<()> {
        let guard = self.guard.clone();
        let mut shutdown = self.shutdown.clone();

        tokio::spawn(async move {
            let name = task.name();
            let mut ticker = tokio::time::interval(every);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            info!(task = name, currency = %currency, every = ?every, "🔄 Task loop started");

            loop {
                if *shutdown.borrow() {
                    break;
                }

                tokio::select! {
                    changed = shutdown.changed() => {
                        // Sender dropped counts as shutdown too
                        if changed.is_err() || *shutdown.borrow() {
                            break;
                        }
                        continue;
                    }
                    _ = ticker.tick() => {}
                }

                let Some(_permit) = guard.try_acquire(&currency) else {
                    debug!(task = name, currency = %currency, "Previous run still in flight, tick skipped");
                    continue;
                };

                match task.run_once(&currency).await {
                    Ok(report) => info!(task = name, currency = %currency, "{}", report),
                    Err(e) => error!(task = name, currency = %currency, "❌ Task failed: {}", e),
                }
            }

            info!(task = name, currency = %currency, "👋 Task loop stopped");
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::task::{ReconfirmReport, TaskReport};
    use crate::error::WatchResult;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingTask {
        runs: AtomicUsize,
    }

    #[async_trait]
    impl WatchTask for CountingTask {
        fn name(&self) -> &'static str {
            "count"
        }

        async fn run_once(&self, _currency: &str) -> WatchResult<TaskReport> {
            self.runs.fetch_add(1, Ordering::SeqCst);
            Ok(TaskReport::Reconfirm(ReconfirmReport::default()))
        }
    }

    #[tokio::test(start_paused = true)]
    async fn runs_on_ticks_and_stops_on_shutdown() {
        let (tx, rx) = watch::channel(false);
        let scheduler = Scheduler::new(Arc::new(RunGuard::new()), rx);
        let task = Arc::new(CountingTask {
            runs: AtomicUsize::new(0),
        });

        let handle = scheduler.spawn(task.clone(), "SOL".to_string(), Duration::from_secs(10));
        tokio::time::sleep(Duration::from_secs(25)).await;
        tx.send(true).unwrap();
        handle.await.unwrap();

        // Immediate first tick, then at 10s and 20s
        assert_eq!(task.runs.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn busy_currency_skips_tick() {
        let (tx, rx) = watch::channel(false);
        let guard = Arc::new(RunGuard::new());
        let scheduler = Scheduler::new(guard.clone(), rx);
        let task = Arc::new(CountingTask {
            runs: AtomicUsize::new(0),
        });

        let held = guard.try_acquire("SOL").unwrap();
        let handle = scheduler.spawn(task.clone(), "SOL".to_string(), Duration::from_secs(10));
        tokio::time::sleep(Duration::from_secs(15)).await;
        assert_eq!(task.runs.load(Ordering::SeqCst), 0);

        drop(held);
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(task.runs.load(Ordering::SeqCst), 1);

        tx.send(true).unwrap();
        handle.await.unwrap();
    }
}
