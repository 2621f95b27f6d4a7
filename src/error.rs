use thiserror::Error;

/// Failure kinds surfaced by the watcher core.
///
/// None of these terminate the process; the scheduler logs them and the next
/// tick re-attempts from the last checkpoint.
#[derive(Debug, Error)]
pub enum WatchError {
    #[error("currency not configured: {0}")]
    ConfigMissing(String),

    #[error("transient node failure: {0}")]
    Transient(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("persistence failure: {0}")]
    Persistence(String),
}

impl WatchError {
    /// Wrap a storage error, keeping its context chain in the message
    pub fn persistence(err: anyhow::Error) -> Self {
        WatchError::Persistence(format!("{err:#}"))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, WatchError::NotFound(_))
    }
}

pub type WatchResult<T> = std::result::Result<T, WatchError>;
