//! Diagnostics surface: row counts and height summaries for health checks.

use serde::Serialize;

use weaveindex_core::IndexError;

use crate::db::{db_err, IndexDb};

/// Row counts per table group.
#[derive(Debug, Clone, Serialize)]
pub struct DebugCounts {
    pub wallets: i64,
    pub tag_names: i64,
    pub tag_values: i64,
    pub new_txs: i64,
    pub stable_txs: i64,
    pub new_blocks: i64,
    pub stable_blocks: i64,
    pub new_block_txs: i64,
    pub stable_block_txs: i64,
    pub missing_txs: i64,
}

/// Height extents per tier; `-1` when the tier is empty.
#[derive(Debug, Clone, Serialize)]
pub struct DebugHeights {
    pub min_new: i64,
    pub max_new: i64,
    pub min_stable: i64,
    pub max_stable: i64,
}

/// Snapshot of the index for health checks and operator tooling.
#[derive(Debug, Clone, Serialize)]
pub struct DebugInfo {
    pub counts: DebugCounts,
    pub heights: DebugHeights,
    /// Holes in the confirmed chain:
    /// `max_stable - (min_stable - 1) - stable_block_count`.
    pub missing_stable_blocks: i64,
}

impl IndexDb {
    pub async fn get_debug_info(&self) -> Result<DebugInfo, IndexError> {
        let counts = DebugCounts {
            wallets: self.count("wallets").await?,
            tag_names: self.count("tag_names").await?,
            tag_values: self.count("tag_values").await?,
            new_txs: self.count("new_transactions").await?,
            stable_txs: self.count("stable_transactions").await?,
            new_blocks: self.count("new_blocks").await?,
            stable_blocks: self.count("stable_blocks").await?,
            new_block_txs: self.count("new_block_transactions").await?,
            stable_block_txs: self.count("stable_block_transactions").await?,
            missing_txs: self.count("missing_transactions").await?,
        };

        let (min_new, max_new) = self.height_extent("new_block_heights").await?;
        let (min_stable, max_stable) = self.height_extent("stable_blocks").await?;
        let heights = DebugHeights {
            min_new,
            max_new,
            min_stable,
            max_stable,
        };

        let missing_stable_blocks = if counts.stable_blocks == 0 {
            0
        } else {
            max_stable - (min_stable - 1) - counts.stable_blocks
        };

        Ok(DebugInfo {
            counts,
            heights,
            missing_stable_blocks,
        })
    }

    async fn count(&self, table: &str) -> Result<i64, IndexError> {
        let row: (i64,) = sqlx::query_as(&format!("SELECT COUNT(*) FROM {table}"))
            .fetch_one(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(row.0)
    }

    async fn height_extent(&self, table: &str) -> Result<(i64, i64), IndexError> {
        let row: (Option<i64>, Option<i64>) =
            sqlx::query_as(&format!("SELECT MIN(height), MAX(height) FROM {table}"))
                .fetch_one(&self.pool)
                .await
                .map_err(db_err)?;
        Ok((row.0.unwrap_or(-1), row.1.unwrap_or(-1)))
    }
}
