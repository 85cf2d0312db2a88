//! Fixture builders shared by the integration suites.
//!
//! Identities are readable labels (`block-42`, `tx-42-0`) run through the
//! same base64url codec the wire uses, so every test value round-trips the
//! way real chain data does.

#![allow(dead_code)] // each suite uses its own subset

use weaveindex_core::encoding::b64url_encode;
use weaveindex_core::types::Amount;
use weaveindex_core::{IndexConfig, JsonBlock, JsonTag, JsonTransaction};
use weaveindex_storage::IndexDb;

/// An index whose automatic stabilization never fires, so tests drive
/// promotion explicitly.
pub async fn open_index() -> IndexDb {
    let config = IndexConfig {
        stable_flush_interval: 1_000_000,
        ..IndexConfig::default()
    };
    IndexDb::in_memory(config).await.expect("open in-memory index")
}

pub fn b64(label: &str) -> String {
    b64url_encode(label.as_bytes())
}

pub fn make_tag(name: &str, value: &str) -> JsonTag {
    JsonTag {
        name: b64(name),
        value: b64(value),
    }
}

pub fn make_tx(id_label: &str, owner_label: &str, tags: &[(&str, &str)]) -> JsonTransaction {
    JsonTransaction {
        id: b64(id_label),
        format: 2,
        last_tx: b64("anchor"),
        owner: b64(owner_label),
        target: String::new(),
        quantity: Amount::new("0"),
        reward: Amount::new("65595508"),
        data_size: Amount::new("1024"),
        data_root: b64("data-root"),
        signature: b64(&format!("sig-{id_label}")),
        tags: tags
            .iter()
            .map(|(name, value)| make_tag(name, value))
            .collect(),
    }
}

pub fn make_block(height: u64, hash_label: &str, tx_ids: Vec<String>) -> JsonBlock {
    JsonBlock {
        indep_hash: b64(hash_label),
        height,
        previous_block: height
            .checked_sub(1)
            .map(|prev| b64(&format!("block-{prev}"))),
        nonce: b64("nonce"),
        hash: b64(&format!("pow-{hash_label}")),
        timestamp: 1_600_000_000 + height * 120,
        diff: Amount::new("115792089"),
        cumulative_diff: Some(Amount::new((1_000_000 + height).to_string())),
        last_retarget: 1_600_000_000,
        reward_addr: Some(b64("miner")),
        reward_pool: Amount::new("0"),
        block_size: Amount::new("786432"),
        weave_size: Amount::new("91272160256"),
        usd_to_ar_rate: Some((Amount::new("1"), Amount::new("10"))),
        scheduled_usd_to_ar_rate: Some((Amount::new("1"), Amount::new("10"))),
        hash_list_merkle: Some(b64("hash-list")),
        wallet_list: b64("wallet-list"),
        tx_root: Some(b64("tx-root")),
        txs: tx_ids,
    }
}

/// Ingest a block holding `txs` plus placeholders for `missing` ids.
pub async fn ingest(db: &IndexDb, height: u64, txs: Vec<JsonTransaction>, missing: Vec<String>) {
    let mut ids: Vec<String> = txs.iter().map(|tx| tx.id.clone()).collect();
    ids.extend(missing.iter().cloned());
    let block = make_block(height, &format!("block-{height}"), ids);
    db.save_block_and_txs(&block, &txs, &missing)
        .await
        .expect("ingest block");
}

/// Ingest heights `from..=to`, one untagged transaction per block.
pub async fn ingest_chain(db: &IndexDb, from: u64, to: u64) {
    for height in from..=to {
        let tx = make_tx(&format!("tx-{height}-0"), &format!("owner-{height}"), &[]);
        ingest(db, height, vec![tx], vec![]).await;
    }
}
