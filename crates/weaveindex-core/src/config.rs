//! Index configuration and its shipped defaults.

use serde::{Deserialize, Serialize};

/// Per-block transaction index bound assumed by single-key
/// (`height * bound + index`) cursor encodings. The engine itself compares
/// `(height, index)` tuples lexicographically and does not depend on this
/// bound, but callers that pack both into one integer must respect it.
pub const BLOCK_TX_INDEX_BOUND: u64 = 1000;

/// Tunables for the indexing core.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexConfig {
    /// Run stabilization after every Nth accepted block.
    pub stable_flush_interval: u64,
    /// Number of recent blocks treated as potentially reorg-able; a block is
    /// promoted only once the tip is this far past it.
    pub max_fork_depth: u64,
    /// Pending transactions older than this (seconds, relative to the newest
    /// confirmed block timestamp) are dropped at cleanup if still unmined.
    pub new_tx_cleanup_wait_secs: i64,
    /// SQLite page size applied when the database file is created.
    pub page_size: u32,
    /// Listing page size used when the caller passes zero.
    pub default_page_size: usize,
    /// Hard upper bound on listing page size.
    pub max_page_size: usize,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            stable_flush_interval: 50,
            max_fork_depth: 18,
            new_tx_cleanup_wait_secs: 60 * 60 * 24,
            page_size: 4096,
            default_page_size: 10,
            max_page_size: 100,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shipped_defaults() {
        let config = IndexConfig::default();
        assert_eq!(config.stable_flush_interval, 50);
        assert_eq!(config.max_fork_depth, 18);
        assert_eq!(config.new_tx_cleanup_wait_secs, 86_400);
    }
}
