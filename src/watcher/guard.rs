use std::collections::HashSet;
use std::sync::{Arc, Mutex};

/// Tracks which currencies have a task in flight. Scan and reconfirm for one
/// currency share a guard so they never overlap.
#[derive(Debug, Default)]
pub struct RunGuard {
    running: Mutex<HashSet<String>>,
}

/// Held for the duration of one task run; releases the currency on drop
#[derive(Debug)]
pub struct RunPermit {
    guard: Arc<RunGuard>,
    currency: String,
}

impl RunGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// `None` when another task for this currency is still running
    pub fn try_acquire(self: &Arc<Self>, currency: &str) -> Option<RunPermit> {
        let mut running = self.running.lock().unwrap_or_else(|e| e.into_inner());
        if !running.insert(currency.to_string()) {
            return None;
        }
        Some(RunPermit {
            guard: Arc::clone(self),
            currency: currency.to_string(),
        })
    }
}

impl Drop for RunPermit {
    fn drop(&mut self) {
        self.guard
            .running
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&self.currency);
    }
}
