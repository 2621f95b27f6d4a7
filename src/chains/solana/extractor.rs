use tracing::{debug, trace};

use crate::chains::solana::types::{SolanaBlock, UiCompiledInstruction, UiTransactionWithMeta};
use crate::core::chain::{ChainBlock, TransferExtractor};
use crate::core::types::TransferEvent;

/// Native program that owns lamport transfers
pub const SYSTEM_PROGRAM_ID: &str = "11111111111111111111111111111111";

/// `SystemInstruction::Transfer` discriminant (u32, little endian)
const TRANSFER_DISCRIMINANT: u32 = 2;

/// discriminant (4) + lamports (8)
const TRANSFER_DATA_LEN: usize = 12;

/// Decode the lamports of a System Program `Transfer` payload.
/// Any other system instruction, or a malformed payload, yields `None`.
pub fn decode_system_transfer(data: &[u8]) -> Option<u64> {
    if data.len() != TRANSFER_DATA_LEN {
        return None;
    }
    let discriminant = u32::from_le_bytes(data[0..4].try_into().ok()?);
    if discriminant != TRANSFER_DISCRIMINANT {
        return None;
    }
    Some(u64::from_le_bytes(data[4..12].try_into().ok()?))
}

/// Encode a System Program `Transfer` payload
pub fn encode_system_transfer(lamports: u64) -> Vec<u8> {
    let mut data = Vec::with_capacity(TRANSFER_DATA_LEN);
    data.extend_from_slice(&TRANSFER_DISCRIMINANT.to_le_bytes());
    data.extend_from_slice(&lamports.to_le_bytes());
    data
}

/// Pulls System Program lamport transfers out of top-level instructions
#[derive(Default)]
pub struct SolanaTransferExtractor;

impl SolanaTransferExtractor {
    pub fn new() -> Self {
        Self
    }

    fn decode_instruction(
        keys: &[&str],
        tx: &UiTransactionWithMeta,
        index: usize,
        ix: &UiCompiledInstruction,
        block: &SolanaBlock,
    ) -> Option<TransferEvent> {
        let program_id = keys.get(ix.program_id_index as usize).copied()?;
        if program_id != SYSTEM_PROGRAM_ID {
            return None;
        }

        let data = match bs58::decode(&ix.data).into_vec() {
            Ok(data) => data,
            Err(e) => {
                debug!(slot = block.slot, index, "Skipping system instruction with bad payload: {}", e);
                return None;
            }
        };
        let Some(amount) = decode_system_transfer(&data) else {
            trace!(slot = block.slot, index, "Skipping non-transfer system instruction");
            return None;
        };

        let account = |pos: usize| {
            ix.accounts
                .get(pos)
                .and_then(|i| keys.get(*i as usize))
                .copied()
                .unwrap_or_default()
        };
        let from = account(0);
        let to = account(1);

        if to.is_empty() {
            debug!(slot = block.slot, index, "Transfer has no destination account, skipping");
            return None;
        }

        let Some(tx_hash) = tx.first_signature() else {
            debug!(slot = block.slot, index, "Transfer in unsigned transaction, skipping");
            return None;
        };

        Some(TransferEvent {
            from: from.to_string(),
            to: to.to_string(),
            amount,
            tx_hash: tx_hash.to_string(),
            instruction_index: index,
            height: block.height(),
            block_time: block.timestamp(),
        })
    }
}

impl TransferExtractor for SolanaTransferExtractor {
    type Block = SolanaBlock;

    fn extract<'a>(
        &'a self,
        block: &'a SolanaBlock,
    ) -> Box<dyn Iterator<Item = TransferEvent> + Send + 'a> {
        let events = block
            .block
            .transactions
            .iter()
            .filter(|tx| {
                if tx.failed() {
                    trace!(slot = block.slot, sig = ?tx.first_signature(), "Skipping failed transaction");
                    return false;
                }
                true
            })
            .flat_map(move |tx| {
                let keys = tx.account_keys();
                tx.transaction
                    .message
                    .instructions
                    .iter()
                    .enumerate()
                    .filter_map(move |(index, ix)| {
                        Self::decode_instruction(&keys, tx, index, ix, block)
                    })
            });

        Box::new(events)
    }
}
