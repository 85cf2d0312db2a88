//! Stabilization engine: promotion of pending rows into the confirmed tier
//! once their block is deep enough below the tip, followed by cleanup of
//! aged-out pending rows.
//!
//! Promotion is one transaction of four ordered INSERT OR IGNORE … SELECT
//! statements, each joined through `new_block_heights` so rows from
//! orphaned forks (whose hash no longer wins the height mapping) are never
//! copied. Re-running promotion over the same range is a no-op. Cleanup
//! runs in its own transaction; tag and transaction rows go before the
//! block rows they join through, or the height predicates become
//! untestable, and the timestamp-aged transaction set is snapshotted once
//! so every table ages against the same ids regardless of delete order.

use tracing::{debug, info};

use weaveindex_core::IndexError;

use crate::db::{db_err, IndexDb};

const PROMOTE_BLOCKS: &str = "INSERT OR IGNORE INTO stable_blocks (
        height, indep_hash, previous_block, nonce, hash, block_timestamp,
        diff, cumulative_diff, last_retarget, reward_addr, reward_pool,
        block_size, weave_size,
        usd_to_ar_rate_dividend, usd_to_ar_rate_divisor,
        scheduled_usd_to_ar_rate_dividend, scheduled_usd_to_ar_rate_divisor,
        hash_list_merkle, wallet_list, tx_root, tx_count, missing_tx_count
    )
    SELECT
        nbh.height, nb.indep_hash, nb.previous_block, nb.nonce, nb.hash, nb.block_timestamp,
        nb.diff, nb.cumulative_diff, nb.last_retarget, nb.reward_addr, nb.reward_pool,
        nb.block_size, nb.weave_size,
        nb.usd_to_ar_rate_dividend, nb.usd_to_ar_rate_divisor,
        nb.scheduled_usd_to_ar_rate_dividend, nb.scheduled_usd_to_ar_rate_divisor,
        nb.hash_list_merkle, nb.wallet_list, nb.tx_root, nb.tx_count, nb.missing_tx_count
    FROM new_blocks nb
    JOIN new_block_heights nbh ON nbh.block_indep_hash = nb.indep_hash
    WHERE nbh.height < ?";

const PROMOTE_BLOCK_TRANSACTIONS: &str = "INSERT OR IGNORE INTO stable_block_transactions
        (block_indep_hash, transaction_id, block_transaction_index)
    SELECT nbt.block_indep_hash, nbt.transaction_id, nbt.block_transaction_index
    FROM new_block_transactions nbt
    JOIN new_block_heights nbh ON nbh.block_indep_hash = nbt.block_indep_hash
    WHERE nbh.height < ?";

const PROMOTE_TRANSACTIONS: &str = "INSERT OR IGNORE INTO stable_transactions (
        id, height, block_transaction_index, signature, format, last_tx,
        owner_address, target, quantity, reward, data_size, data_root,
        content_type, tag_count
    )
    SELECT
        nt.id, nbh.height, nbt.block_transaction_index, nt.signature, nt.format, nt.last_tx,
        nt.owner_address, nt.target, nt.quantity, nt.reward, nt.data_size, nt.data_root,
        nt.content_type, nt.tag_count
    FROM new_transactions nt
    JOIN new_block_transactions nbt ON nbt.transaction_id = nt.id
    JOIN new_block_heights nbh ON nbh.block_indep_hash = nbt.block_indep_hash
    WHERE nbh.height < ?";

const PROMOTE_TRANSACTION_TAGS: &str = "INSERT OR IGNORE INTO stable_transaction_tags (
        tag_name_hash, tag_value_hash, height, block_transaction_index,
        transaction_tag_index, transaction_id
    )
    SELECT
        ntt.tag_name_hash, ntt.tag_value_hash, nbh.height, nbt.block_transaction_index,
        ntt.transaction_tag_index, ntt.transaction_id
    FROM new_transaction_tags ntt
    JOIN new_block_transactions nbt ON nbt.transaction_id = ntt.transaction_id
    JOIN new_block_heights nbh ON nbh.block_indep_hash = nbt.block_indep_hash
    WHERE nbh.height < ?";

impl IndexDb {
    /// Promote everything below `end_height`, then sweep stale pending rows.
    ///
    /// Called automatically after every `stable_flush_interval`-th ingested
    /// block; safe to call directly (e.g. at startup after a crash).
    pub async fn flush_stable(&self, end_height: u64) -> Result<(), IndexError> {
        self.save_stable_data(end_height).await?;

        let newest_stable_ts: (Option<i64>,) =
            sqlx::query_as("SELECT MAX(block_timestamp) FROM stable_blocks")
                .fetch_one(&self.pool)
                .await
                .map_err(db_err)?;
        let created_at_threshold =
            newest_stable_ts.0.unwrap_or(0) - self.config.new_tx_cleanup_wait_secs;

        self.delete_stale_new_data(end_height, created_at_threshold)
            .await
    }

    /// Copy pending rows with `height < end_height` into the confirmed tier.
    pub async fn save_stable_data(&self, end_height: u64) -> Result<(), IndexError> {
        let end_height = end_height as i64;
        let mut dbtx = self.pool.begin().await.map_err(db_err)?;

        for statement in [
            PROMOTE_BLOCKS,
            PROMOTE_BLOCK_TRANSACTIONS,
            PROMOTE_TRANSACTIONS,
            PROMOTE_TRANSACTION_TAGS,
        ] {
            sqlx::query(statement)
                .bind(end_height)
                .execute(&mut *dbtx)
                .await
                .map_err(db_err)?;
        }

        dbtx.commit().await.map_err(db_err)?;
        info!(end_height, "pending rows promoted to confirmed tier");
        Ok(())
    }

    /// Delete pending rows below `height_threshold`, pending transactions
    /// (with their tags and block associations) whose `created_at` fell
    /// behind `created_at_threshold`, and satisfied missing-transaction
    /// placeholders.
    pub async fn delete_stale_new_data(
        &self,
        height_threshold: u64,
        created_at_threshold: i64,
    ) -> Result<(), IndexError> {
        let height = height_threshold as i64;
        let mut dbtx = self.pool.begin().await.map_err(db_err)?;

        // The aged-out transaction ids are snapshotted up front: tags,
        // transactions, and associations all age out against the same set,
        // no matter which DELETE runs first. Testing `created_at` inline
        // instead would go blind the moment the transaction rows themselves
        // are removed, stranding association rows that a later promotion
        // would copy into the confirmed tier with no transaction behind
        // them.
        sqlx::query("DROP TABLE IF EXISTS aged_out_transactions")
            .execute(&mut *dbtx)
            .await
            .map_err(db_err)?;
        sqlx::query(
            "CREATE TEMP TABLE aged_out_transactions AS
                SELECT id FROM new_transactions WHERE created_at < ?",
        )
        .bind(created_at_threshold)
        .execute(&mut *dbtx)
        .await
        .map_err(db_err)?;

        // Joins go through new_blocks.height rather than the height mapping:
        // a block orphaned by a fork reset has no mapping left but still
        // needs its rows swept once its height is behind the stable tip.
        sqlx::query(
            "DELETE FROM new_transaction_tags WHERE transaction_id IN (
                SELECT nbt.transaction_id
                FROM new_block_transactions nbt
                JOIN new_blocks nb ON nb.indep_hash = nbt.block_indep_hash
                WHERE nb.height < ?
            ) OR transaction_id IN (SELECT id FROM aged_out_transactions)",
        )
        .bind(height)
        .execute(&mut *dbtx)
        .await
        .map_err(db_err)?;

        sqlx::query(
            "DELETE FROM new_transactions WHERE id IN (
                SELECT nbt.transaction_id
                FROM new_block_transactions nbt
                JOIN new_blocks nb ON nb.indep_hash = nbt.block_indep_hash
                WHERE nb.height < ?
            ) OR id IN (SELECT id FROM aged_out_transactions)",
        )
        .bind(height)
        .execute(&mut *dbtx)
        .await
        .map_err(db_err)?;

        sqlx::query(
            "DELETE FROM new_block_transactions WHERE block_indep_hash IN (
                SELECT indep_hash FROM new_blocks WHERE height < ?
            ) OR transaction_id IN (SELECT id FROM aged_out_transactions)",
        )
        .bind(height)
        .execute(&mut *dbtx)
        .await
        .map_err(db_err)?;

        sqlx::query("DELETE FROM new_blocks WHERE height < ?")
            .bind(height)
            .execute(&mut *dbtx)
            .await
            .map_err(db_err)?;

        sqlx::query("DELETE FROM new_block_heights WHERE height < ?")
            .bind(height)
            .execute(&mut *dbtx)
            .await
            .map_err(db_err)?;

        // A placeholder whose association reached the confirmed tier has
        // served its purpose; ones for blocks that never stabilized stay and
        // keep driving re-fetch attempts.
        sqlx::query(
            "DELETE FROM missing_transactions WHERE height < ? AND EXISTS (
                SELECT 1 FROM stable_block_transactions sbt
                WHERE sbt.block_indep_hash = missing_transactions.block_indep_hash
                  AND sbt.transaction_id = missing_transactions.transaction_id
            )",
        )
        .bind(height)
        .execute(&mut *dbtx)
        .await
        .map_err(db_err)?;

        sqlx::query("DROP TABLE aged_out_transactions")
            .execute(&mut *dbtx)
            .await
            .map_err(db_err)?;

        dbtx.commit().await.map_err(db_err)?;
        debug!(
            height_threshold,
            created_at_threshold, "stale pending rows deleted"
        );
        Ok(())
    }
}
