use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use crate::core::storage::HeightStore;
use crate::core::types::{Currency, HeightRecord};
use crate::error::{WatchError, WatchResult};

/// Last fully-scanned height per currency; the only source of resumability
#[derive(Clone)]
pub struct HeightCheckpoint {
    store: Arc<dyn HeightStore>,
}

impl HeightCheckpoint {
    pub fn new(store: Arc<dyn HeightStore>) -> Self {
        Self { store }
    }

    pub fn get(&self, currency: &str) -> WatchResult<Option<HeightRecord>> {
        self.store
            .get_height(currency)
            .map_err(WatchError::persistence)
    }

    /// Overwrite the checkpoint. Writing the same height again is a no-op in
    /// effect; a lower height is refused and the stored record is returned.
    pub fn set(
        &self,
        currency: &Currency,
        height: u64,
        at: DateTime<Utc>,
    ) -> WatchResult<HeightRecord> {
        if let Some(existing) = self.get(&currency.name)?
            && existing.current_height > height
        {
            warn!(
                currency = %currency.name,
                stored = existing.current_height,
                requested = height,
                "Refusing to move checkpoint backwards"
            );
            return Ok(existing);
        }

        let record = HeightRecord {
            currency_id: currency.id,
            currency_name: currency.name.clone(),
            current_height: height,
            updated_at: at,
        };
        self.store
            .save_height(&record)
            .map_err(WatchError::persistence)?;
        debug!(currency = %currency.name, height, "Checkpoint advanced");
        Ok(record)
    }
}
