use anyhow::{Context, Result};
use clap::Parser;
use metrics_exporter_prometheus::PrometheusBuilder;
use sol_deposit_watcher::{
    chains::solana::{SolanaClient, SolanaTransferExtractor},
    cli::{Cli, Commands},
    config::{AppConfig, CurrencyConfig},
    core::{
        chain::{ChainClient, TransferExtractor},
        storage::{DepositStore, HeightStore},
        task::WatchTask,
        types::{ChainType, DepositRecord},
    },
    error::WatchError,
    storage::{manager::WatcherStorageManager, rocksdb::RocksDBStorage, traits::KVStorage},
    utils::{
        logger::init_logger,
        metrics::{NoopWatcherMetrics, PrometheusWatcherMetrics, WatcherMetrics},
    },
    watcher::{
        context::{CurrencyRegistry, WatcherContext},
        guard::RunGuard,
        promoter::ConfirmationPromoter,
        scanner::BlockScanner,
        scheduler::Scheduler,
    },
};
use std::{net::SocketAddr, sync::Arc, time::Duration};
use tokio::sync::watch;
use tracing::{error, info};

/// Scan and reconfirm tasks of one currency
struct CurrencyTasks {
    scan: Arc<dyn WatchTask>,
    reconfirm: Arc<dyn WatchTask>,
}

fn build_tasks(
    currency: &CurrencyConfig,
    context: WatcherContext,
    shutdown: watch::Receiver<bool>,
) -> Result<CurrencyTasks> {
    match currency.chain_type {
        ChainType::Solana => {
            let client = Arc::new(SolanaClient::from_config(currency)?);
            Ok(wire_tasks(
                context,
                client,
                SolanaTransferExtractor::new(),
                shutdown,
            ))
        }
    }
}

fn wire_tasks<C, X>(
    context: WatcherContext,
    client: Arc<C>,
    extractor: X,
    shutdown: watch::Receiver<bool>,
) -> CurrencyTasks
where
    C: ChainClient + 'static,
    X: TransferExtractor<Block = C::Block> + 'static,
{
    let scanner = BlockScanner::new(context.clone(), client.clone(), extractor)
        .with_shutdown(shutdown.clone());
    let promoter = ConfirmationPromoter::new(context, client).with_shutdown(shutdown);
    CurrencyTasks {
        scan: Arc::new(scanner),
        reconfirm: Arc::new(promoter),
    }
}

fn spawn_signal_handlers(shutdown_tx: Arc<watch::Sender<bool>>) {
    let tx_sigint = shutdown_tx.clone();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            return;
        }
        info!("📡 Received shutdown signal (Ctrl+C)");
        let _ = tx_sigint.send(true);
    });

    // SIGTERM handler (Unix only)
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        let tx_sigterm = shutdown_tx.clone();
        tokio::spawn(async move {
            if let Ok(mut sigterm) = signal(SignalKind::terminate()) {
                sigterm.recv().await;
                info!("📡 Received SIGTERM signal");
                let _ = tx_sigterm.send(true);
            }
        });
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Cli::parse();
    let cfg = AppConfig::load(&args.config)?;

    init_logger(
        &cfg.logging.level,
        cfg.logging.to_file,
        &cfg.logging.file_path,
    );
    info!("✅ Configuration load successful");

    let command = args.command.unwrap_or(Commands::Run);

    if cfg.metrics.enable && command == Commands::Run {
        let addr: SocketAddr = ([0, 0, 0, 0], cfg.metrics.prometheus_exporter_port).into();
        PrometheusBuilder::new()
            .with_http_listener(addr)
            .install()
            .context("Failed to install Prometheus exporter")?;
        info!(%addr, "📈 Prometheus exporter listening");
    }

    let storage = Arc::new(RocksDBStorage::new(&cfg.storage.path)?);
    storage.init()?;
    info!("✅ Storage initialized at: {}", cfg.storage.path);

    let manager = WatcherStorageManager::new(storage.clone());
    let registry = Arc::new(CurrencyRegistry::from_config(&cfg.currencies));

    let context_for = |name: &str| -> WatcherContext {
        let metrics: Arc<dyn WatcherMetrics> = if cfg.metrics.enable {
            Arc::new(PrometheusWatcherMetrics::new(name))
        } else {
            Arc::new(NoopWatcherMetrics::new())
        };
        WatcherContext::new(
            registry.clone(),
            manager.heights.clone(),
            manager.deposits.clone(),
            metrics,
        )
    };

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let shutdown_tx = Arc::new(shutdown_tx);

    match command {
        Commands::Run => {
            spawn_signal_handlers(shutdown_tx.clone());

            let scheduler = Scheduler::new(Arc::new(RunGuard::new()), shutdown_rx.clone());
            let scan_every = Duration::from_secs(cfg.schedule.scan_interval_secs);
            let confirm_every = Duration::from_secs(cfg.schedule.confirm_interval_secs);

            let mut handles = Vec::new();
            for currency in &cfg.currencies {
                let tasks = build_tasks(currency, context_for(&currency.name), shutdown_rx.clone())?;
                info!(
                    currency = %currency.name,
                    chain = currency.chain_type.as_str(),
                    confirms = currency.confirms,
                    rpc_url = %currency.rpc_url,
                    "🚀 Starting deposit watcher"
                );
                handles.push(scheduler.spawn(tasks.scan, currency.name.clone(), scan_every));
                handles.push(scheduler.spawn(
                    tasks.reconfirm,
                    currency.name.clone(),
                    confirm_every,
                ));
            }
            info!("💡 Press Ctrl+C to stop gracefully");

            for handle in handles {
                if let Err(e) = handle.await {
                    error!("Task loop panicked: {}", e);
                }
            }
            info!("✨ Watcher exited successfully");
        }
        Commands::Scan { currency } => {
            let currency_cfg = currency_config(&cfg, &currency)?;
            let tasks = build_tasks(currency_cfg, context_for(&currency), shutdown_rx)?;
            let report = tasks.scan.run_once(&currency).await?;
            println!("{report}");
        }
        Commands::Reconfirm { currency } => {
            let currency_cfg = currency_config(&cfg, &currency)?;
            let tasks = build_tasks(currency_cfg, context_for(&currency), shutdown_rx)?;
            let report = tasks.reconfirm.run_once(&currency).await?;
            println!("{report}");
        }
        Commands::Expect {
            currency,
            id,
            address,
            amount,
        } => {
            registry.resolve(&currency)?;
            if amount == 0 {
                anyhow::bail!("Deposit amount must be greater than zero");
            }
            let record = DepositRecord::expect(id, currency, address, amount);
            manager.deposits.insert_expectation(&record)?;
            info!(deposit = %record.id, to = %record.to_address, amount, "📝 Deposit expectation registered");
            println!("{}", serde_json::to_string_pretty(&record)?);
        }
        Commands::Status { currency } => {
            registry.resolve(&currency)?;
            let height = manager.heights.get_height(&currency)?;
            let deposits = manager.deposits.list(&currency)?;
            let status = serde_json::json!({
                "checkpoint": height,
                "deposits": deposits,
            });
            println!("{}", serde_json::to_string_pretty(&status)?);
        }
    }

    storage.flush()?;
    Ok(())
}

fn currency_config<'a>(cfg: &'a AppConfig, name: &str) -> Result<&'a CurrencyConfig> {
    cfg.currency(name)
        .ok_or_else(|| WatchError::ConfigMissing(name.to_string()).into())
}
