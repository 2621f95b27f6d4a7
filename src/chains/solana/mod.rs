pub mod client;
pub mod extractor;
pub mod types;

pub use client::SolanaClient;
pub use extractor::SolanaTransferExtractor;
pub use types::SolanaBlock;
