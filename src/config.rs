use anyhow::Result;
use config as config_loader;
use dotenvy::dotenv;
use serde::Deserialize;
use std::collections::HashSet;
use std::path::Path;

use crate::core::types::{ChainType, Currency};

/// Global config structure
#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub storage: StorageConfig,
    pub logging: LoggingConfig,
    pub metrics: MetricsConfig,
    #[serde(default)]
    pub schedule: ScheduleConfig,
    pub currencies: Vec<CurrencyConfig>,
}

/// RocksDB storage config
#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    pub path: String,
}

/// Logging config
#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    #[serde(default = "LoggingConfig::default_level")]
    pub level: String,
    #[serde(default = "LoggingConfig::default_to_file")]
    pub to_file: bool,
    #[serde(default = "LoggingConfig::default_file_path")]
    pub file_path: String,
}

impl LoggingConfig {
    fn default_level() -> String {
        "info".to_string()
    }
    fn default_to_file() -> bool {
        true
    }
    fn default_file_path() -> String {
        "./logs/watcher.log".to_string()
    }
}

/// Metrics config
#[derive(Debug, Deserialize, Clone)]
pub struct MetricsConfig {
    #[serde(default = "MetricsConfig::default_enable")]
    pub enable: bool,
    #[serde(default = "MetricsConfig::default_prometheus_exporter_port")]
    pub prometheus_exporter_port: u16,
}

impl MetricsConfig {
    fn default_enable() -> bool {
        true
    }
    fn default_prometheus_exporter_port() -> u16 {
        9100
    }
}

/// Fixed intervals of the two recurring tasks
#[derive(Debug, Deserialize, Clone)]
pub struct ScheduleConfig {
    #[serde(default = "ScheduleConfig::default_scan_interval_secs")]
    pub scan_interval_secs: u64,
    #[serde(default = "ScheduleConfig::default_confirm_interval_secs")]
    pub confirm_interval_secs: u64,
}

impl ScheduleConfig {
    fn default_scan_interval_secs() -> u64 {
        10
    }
    fn default_confirm_interval_secs() -> u64 {
        10
    }
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            scan_interval_secs: Self::default_scan_interval_secs(),
            confirm_interval_secs: Self::default_confirm_interval_secs(),
        }
    }
}

/// One watched currency and the node serving it
#[derive(Debug, Deserialize, Clone)]
pub struct CurrencyConfig {
    pub id: u64,
    pub name: String,
    pub chain_type: ChainType,
    pub confirms: u64,
    pub rpc_url: String,
    #[serde(default = "CurrencyConfig::default_rpc_timeout_secs")]
    pub rpc_timeout_secs: u64,
    #[serde(default = "CurrencyConfig::default_commitment")]
    pub commitment: String,
}

impl CurrencyConfig {
    fn default_rpc_timeout_secs() -> u64 {
        15
    }
    fn default_commitment() -> String {
        "confirmed".to_string()
    }

    pub fn currency(&self) -> Currency {
        Currency {
            id: self.id,
            name: self.name.clone(),
            chain_type: self.chain_type,
            confirms: self.confirms,
        }
    }
}

impl AppConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        dotenv().ok(); // Load the .env file

        if !path.as_ref().exists() {
            anyhow::bail!("Config file not found: {:?}", path.as_ref());
        }

        let builder = config_loader::Config::builder()
            .add_source(config_loader::File::from(path.as_ref().to_path_buf()))
            .add_source(config_loader::Environment::with_prefix("WATCHER").separator("__"))
            .build()?;

        let cfg = builder.try_deserialize::<AppConfig>()?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        if self.currencies.is_empty() {
            anyhow::bail!("At least one currency must be configured");
        }

        let mut seen = HashSet::new();
        for currency in &self.currencies {
            if !seen.insert(currency.name.as_str()) {
                anyhow::bail!("Duplicate currency name in config: {}", currency.name);
            }
            if currency.confirms == 0 {
                anyhow::bail!("Currency {} must require at least one confirmation", currency.name);
            }
        }

        if self.schedule.scan_interval_secs == 0 || self.schedule.confirm_interval_secs == 0 {
            anyhow::bail!("Schedule intervals must be greater than zero");
        }

        Ok(())
    }

    pub fn currency(&self, name: &str) -> Option<&CurrencyConfig> {
        self.currencies.iter().find(|c| c.name == name)
    }
}
