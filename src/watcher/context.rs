use std::collections::HashMap;
use std::sync::Arc;

use crate::{
    config::CurrencyConfig,
    core::{
        storage::{DepositStore, HeightStore},
        types::Currency,
    },
    error::{WatchError, WatchResult},
    utils::metrics::WatcherMetrics,
};

/// Configured currencies by name
#[derive(Debug, Clone, Default)]
pub struct CurrencyRegistry {
    currencies: HashMap<String, Currency>,
}

impl CurrencyRegistry {
    pub fn new(currencies: impl IntoIterator<Item = Currency>) -> Self {
        Self {
            currencies: currencies
                .into_iter()
                .map(|c| (c.name.clone(), c))
                .collect(),
        }
    }

    pub fn from_config(configs: &[CurrencyConfig]) -> Self {
        Self::new(configs.iter().map(CurrencyConfig::currency))
    }

    pub fn resolve(&self, name: &str) -> WatchResult<&Currency> {
        self.currencies
            .get(name)
            .ok_or_else(|| WatchError::ConfigMissing(name.to_string()))
    }
}

/// Capabilities shared by the scanner, matcher and promoter
#[derive(Clone)]
pub struct WatcherContext {
    pub registry: Arc<CurrencyRegistry>,
    pub heights: Arc<dyn HeightStore>,
    pub deposits: Arc<dyn DepositStore>,
    pub metrics: Arc<dyn WatcherMetrics>,
}

impl WatcherContext {
    pub fn new(
        registry: Arc<CurrencyRegistry>,
        heights: Arc<dyn HeightStore>,
        deposits: Arc<dyn DepositStore>,
        metrics: Arc<dyn WatcherMetrics>,
    ) -> Self {
        Self {
            registry,
            heights,
            deposits,
            metrics,
        }
    }

    pub fn currency(&self, name: &str) -> WatchResult<Currency> {
        self.registry.resolve(name).cloned()
    }
}
