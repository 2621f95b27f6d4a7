// Key naming conventions and prefix constants
pub mod keys {
    /// Checkpoint key suffix: "{currency}:height"
    pub const HEIGHT_PREFIX: &str = "height";

    /// Deposit record prefix: "{currency}:deposit:{id}"
    pub const DEPOSIT_PREFIX: &str = "deposit";

    /// Pending lookup index prefix: "{currency}:deposit_index:{address}:{amount}"
    pub const DEPOSIT_INDEX_PREFIX: &str = "deposit_index";

    /// Transfer ownership index: "{currency}:deposit_tx:{tx_hash}:{instruction_index}"
    pub const DEPOSIT_TX_PREFIX: &str = "deposit_tx";

    // example: SOL:height
    pub fn height_key(currency: &str) -> String {
        format!("{}:{}", currency, HEIGHT_PREFIX)
    }

    // example: SOL:deposit:order-1001
    pub fn deposit_key(currency: &str, id: &str) -> String {
        format!("{}:{}:{}", currency, DEPOSIT_PREFIX, id)
    }

    // example: SOL:deposit:
    pub fn deposit_prefix(currency: &str) -> String {
        format!("{}:{}:", currency, DEPOSIT_PREFIX)
    }

    // example: SOL:deposit_index:9xQeWvG816bUx9EPjHmaT23yvVM2ZWbrrpZb9PusVFin:1500000000
    pub fn deposit_index_key(currency: &str, address: &str, amount: u64) -> String {
        format!(
            "{}:{}:{}:{}",
            currency, DEPOSIT_INDEX_PREFIX, address, amount
        )
    }

    // example: SOL:deposit_tx:5VERv8NMvzbJMEkV8xnrLkEaWRtSz9CosKDYjCJjBRnb:0
    pub fn deposit_tx_key(currency: &str, tx_hash: &str, instruction_index: usize) -> String {
        format!(
            "{}:{}:{}:{}",
            currency, DEPOSIT_TX_PREFIX, tx_hash, instruction_index
        )
    }
}
