//! Ingestion engine: atomic block + transaction commit into the pending
//! tier.
//!
//! Every insert is INSERT OR IGNORE on its primary key, so replaying the
//! same block is a no-op and the caller is free to retry after a storage
//! failure. Block↔transaction association rows are written for every id in
//! `block.txs` — fetched and missing alike — so a transaction that arrives
//! later still joins its block at promotion time.

use sqlx::{Sqlite, Transaction};
use tracing::{debug, info};

use weaveindex_core::encoding::{b64url_decode, b64url_encode, owner_address, tag_hash};
use weaveindex_core::types::{content_type_of, BlockRecord, TxRecord};
use weaveindex_core::{IndexError, JsonBlock, JsonTransaction};

use crate::db::{bind_args, db_err, IndexDb, SqlArg};

const INSERT_NEW_BLOCK: &str = "INSERT OR IGNORE INTO new_blocks (
        indep_hash, height, previous_block, nonce, hash, block_timestamp,
        diff, cumulative_diff, last_retarget, reward_addr, reward_pool,
        block_size, weave_size,
        usd_to_ar_rate_dividend, usd_to_ar_rate_divisor,
        scheduled_usd_to_ar_rate_dividend, scheduled_usd_to_ar_rate_divisor,
        hash_list_merkle, wallet_list, tx_root, tx_count, missing_tx_count
    ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)";

const INSERT_NEW_TRANSACTION: &str = "INSERT OR IGNORE INTO new_transactions (
        id, signature, format, last_tx, owner_address, target,
        quantity, reward, data_size, data_root, content_type, tag_count, created_at
    ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)";

impl IndexDb {
    /// Atomically commit one block, its block↔tx associations, the fetched
    /// transactions (tags and owner wallets included), and a placeholder row
    /// per missing transaction id.
    ///
    /// `txs` and `missing_tx_ids` together cover every id in `block.txs`.
    /// After a successful commit, every `stable_flush_interval`-th height
    /// triggers stabilization at `height - max_fork_depth`.
    pub async fn save_block_and_txs(
        &self,
        block: &JsonBlock,
        txs: &[JsonTransaction],
        missing_tx_ids: &[String],
    ) -> Result<(), IndexError> {
        let block_record = BlockRecord::try_from(block)?;
        let tx_records = txs
            .iter()
            .map(TxRecord::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        let missing_ids = missing_tx_ids
            .iter()
            .map(|id| b64url_decode(id))
            .collect::<Result<Vec<_>, _>>()?;
        let created_at = chrono::Utc::now().timestamp();

        let mut dbtx = self.pool.begin().await.map_err(db_err)?;

        insert_block(&mut dbtx, &block_record, missing_ids.len() as i64).await?;

        for (index, tx_id) in block_record.txs.iter().enumerate() {
            sqlx::query(
                "INSERT OR IGNORE INTO new_block_transactions
                    (block_indep_hash, transaction_id, block_transaction_index)
                 VALUES (?, ?, ?)",
            )
            .bind(block_record.indep_hash.clone())
            .bind(tx_id.clone())
            .bind(index as i64)
            .execute(&mut *dbtx)
            .await
            .map_err(db_err)?;
        }

        for record in &tx_records {
            insert_transaction(&mut dbtx, record, created_at).await?;
        }

        for tx_id in &missing_ids {
            sqlx::query(
                "INSERT OR IGNORE INTO missing_transactions
                    (block_indep_hash, transaction_id, height)
                 VALUES (?, ?, ?)",
            )
            .bind(block_record.indep_hash.clone())
            .bind(tx_id.clone())
            .bind(block_record.height as i64)
            .execute(&mut *dbtx)
            .await
            .map_err(db_err)?;
        }

        dbtx.commit().await.map_err(db_err)?;

        info!(
            height = block_record.height,
            indep_hash = %b64url_encode(&block_record.indep_hash),
            txs = tx_records.len(),
            missing = missing_ids.len(),
            "block ingested"
        );

        if block_record.height % self.config.stable_flush_interval == 0 {
            let end_height = block_record.height.saturating_sub(self.config.max_fork_depth);
            self.flush_stable(end_height).await?;
        }
        Ok(())
    }

    /// Insert a single loose transaction (one not tied to any block yet),
    /// e.g. one that was missing when its block was ingested. The next
    /// promotion pass carries it into the confirmed tier through its block
    /// association; if it is never mined it ages out at cleanup.
    pub async fn save_tx(&self, tx: &JsonTransaction) -> Result<(), IndexError> {
        let record = TxRecord::try_from(tx)?;
        let created_at = chrono::Utc::now().timestamp();

        let mut dbtx = self.pool.begin().await.map_err(db_err)?;
        insert_transaction(&mut dbtx, &record, created_at).await?;
        dbtx.commit().await.map_err(db_err)?;

        debug!(id = %b64url_encode(&record.id), "loose transaction saved");
        Ok(())
    }
}

async fn insert_block(
    dbtx: &mut Transaction<'_, Sqlite>,
    block: &BlockRecord,
    missing_tx_count: i64,
) -> Result<(), IndexError> {
    let (rate_dividend, rate_divisor) = rate_args(block.usd_to_ar_rate.as_ref());
    let (sched_dividend, sched_divisor) = rate_args(block.scheduled_usd_to_ar_rate.as_ref());
    let args = [
        SqlArg::Blob(block.indep_hash.clone()),
        SqlArg::Int(block.height as i64),
        blob_opt(block.previous_block.as_ref()),
        SqlArg::Blob(block.nonce.clone()),
        SqlArg::Blob(block.hash.clone()),
        SqlArg::Int(block.block_timestamp as i64),
        SqlArg::from(&block.diff),
        SqlArg::from(block.cumulative_diff.as_ref()),
        SqlArg::Int(block.last_retarget as i64),
        blob_opt(block.reward_addr.as_ref()),
        SqlArg::from(&block.reward_pool),
        SqlArg::from(&block.block_size),
        SqlArg::from(&block.weave_size),
        rate_dividend,
        rate_divisor,
        sched_dividend,
        sched_divisor,
        blob_opt(block.hash_list_merkle.as_ref()),
        SqlArg::Blob(block.wallet_list.clone()),
        blob_opt(block.tx_root.as_ref()),
        SqlArg::Int(block.txs.len() as i64),
        SqlArg::Int(missing_tx_count),
    ];
    bind_args(sqlx::query(INSERT_NEW_BLOCK), &args)
        .execute(&mut **dbtx)
        .await
        .map_err(db_err)?;

    sqlx::query("INSERT OR IGNORE INTO new_block_heights (height, block_indep_hash) VALUES (?, ?)")
        .bind(block.height as i64)
        .bind(block.indep_hash.clone())
        .execute(&mut **dbtx)
        .await
        .map_err(db_err)?;
    Ok(())
}

/// Tags, owner wallet, and the transaction row itself. Shared by block
/// ingestion and the loose-transaction path.
async fn insert_transaction(
    dbtx: &mut Transaction<'_, Sqlite>,
    record: &TxRecord,
    created_at: i64,
) -> Result<(), IndexError> {
    for (index, tag) in record.tags.iter().enumerate() {
        let name_hash = tag_hash(&tag.name);
        let value_hash = tag_hash(&tag.value);

        sqlx::query("INSERT OR IGNORE INTO tag_names (hash, name) VALUES (?, ?)")
            .bind(name_hash.clone())
            .bind(tag.name.clone())
            .execute(&mut **dbtx)
            .await
            .map_err(db_err)?;
        sqlx::query("INSERT OR IGNORE INTO tag_values (hash, value) VALUES (?, ?)")
            .bind(value_hash.clone())
            .bind(tag.value.clone())
            .execute(&mut **dbtx)
            .await
            .map_err(db_err)?;
        sqlx::query(
            "INSERT OR IGNORE INTO new_transaction_tags
                (tag_name_hash, tag_value_hash, transaction_id, transaction_tag_index)
             VALUES (?, ?, ?, ?)",
        )
        .bind(name_hash)
        .bind(value_hash)
        .bind(record.id.clone())
        .bind(index as i64)
        .execute(&mut **dbtx)
        .await
        .map_err(db_err)?;
    }

    let address = owner_address(&record.owner);
    sqlx::query("INSERT OR IGNORE INTO wallets (address, public_modulus) VALUES (?, ?)")
        .bind(address.clone())
        .bind(record.owner.clone())
        .execute(&mut **dbtx)
        .await
        .map_err(db_err)?;

    let args = [
        SqlArg::Blob(record.id.clone()),
        SqlArg::Blob(record.signature.clone()),
        SqlArg::Int(record.format as i64),
        SqlArg::Blob(record.last_tx.clone()),
        SqlArg::Blob(address),
        SqlArg::Blob(record.target.clone()),
        SqlArg::from(&record.quantity),
        SqlArg::from(&record.reward),
        SqlArg::from(&record.data_size),
        SqlArg::Blob(record.data_root.clone()),
        match content_type_of(&record.tags) {
            Some(ct) => SqlArg::Text(ct),
            None => SqlArg::Null,
        },
        SqlArg::Int(record.tags.len() as i64),
        SqlArg::Int(created_at),
    ];
    bind_args(sqlx::query(INSERT_NEW_TRANSACTION), &args)
        .execute(&mut **dbtx)
        .await
        .map_err(db_err)?;
    Ok(())
}

fn blob_opt(value: Option<&Vec<u8>>) -> SqlArg {
    value
        .map(|v| SqlArg::Blob(v.clone()))
        .unwrap_or(SqlArg::Null)
}

fn rate_args(rate: Option<&(weaveindex_core::Amount, weaveindex_core::Amount)>) -> (SqlArg, SqlArg) {
    match rate {
        Some((dividend, divisor)) => (SqlArg::from(dividend), SqlArg::from(divisor)),
        None => (SqlArg::Null, SqlArg::Null),
    }
}
