use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "deposit-watcher",
    version,
    about = "Checkpointed deposit watcher: scans blocks for transfers and confirms pending deposits"
)]
pub struct Cli {
    /// Specify the config file path (default: ./config.yaml)
    #[arg(long, default_value = "config.yaml")]
    pub config: PathBuf,

    /// Defaults to `run` when omitted
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Start the scan and reconfirm loops for every configured currency
    Run,
    /// Run one scan pass for a currency and exit
    Scan {
        #[arg(long)]
        currency: String,
    },
    /// Run one reconfirmation pass for a currency and exit
    Reconfirm {
        #[arg(long)]
        currency: String,
    },
    /// Register a pending deposit expectation
    Expect {
        #[arg(long)]
        currency: String,
        /// Caller-chosen deposit identifier
        #[arg(long)]
        id: String,
        /// Destination address the deposit must arrive at
        #[arg(long)]
        address: String,
        /// Exact amount in base units (lamports for SOL)
        #[arg(long)]
        amount: u64,
    },
    /// Print the checkpoint and tracked deposits of a currency
    Status {
        #[arg(long)]
        currency: String,
    },
}
