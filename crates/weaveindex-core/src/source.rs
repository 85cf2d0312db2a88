//! The chain-source seam: where blocks and transactions come from.
//!
//! The HTTP client, retries, and peer selection live outside this core; the
//! orchestrator hands the index whatever this trait returns.

use async_trait::async_trait;

use crate::error::IndexError;
use crate::types::{JsonBlock, JsonTransaction};

/// A block, the transactions of it that could be fetched, and the ids that
/// could not. `txs` and `missing_tx_ids` together cover every id in
/// `block.txs`.
#[derive(Debug, Clone)]
pub struct BlockAndTxs {
    pub block: JsonBlock,
    pub txs: Vec<JsonTransaction>,
    pub missing_tx_ids: Vec<String>,
}

/// Supplies blocks and their transactions by height.
#[async_trait]
pub trait ChainSource: Send + Sync {
    async fn block_and_txs_by_height(&self, height: u64) -> Result<BlockAndTxs, IndexError>;
}
