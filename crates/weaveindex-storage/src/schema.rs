//! Table and index definitions.
//!
//! The pending tier (`new_` prefix) is written by ingestion and rewritten by
//! fork handling; the confirmed tier (`stable_` prefix) is append-only and
//! populated by stabilization. Tag name/value bytes and wallets are shared
//! between tiers and insert-or-ignore only.
//!
//! `stable_blocks` doubles as the confirmed height→hash mapping: `height` is
//! its primary key and `indep_hash` is unique, so promotion's INSERT OR
//! IGNORE keeps the confirmed chain linear with at most one block per
//! height.

/// Executed in order at open, each statement separately.
pub const CREATE_TABLES: &[&str] = &[
    // ── pending tier ──
    "CREATE TABLE IF NOT EXISTS new_blocks (
        indep_hash BLOB PRIMARY KEY,
        height INTEGER NOT NULL,
        previous_block BLOB,
        nonce BLOB NOT NULL,
        hash BLOB NOT NULL,
        block_timestamp INTEGER NOT NULL,
        diff TEXT,
        cumulative_diff TEXT,
        last_retarget INTEGER,
        reward_addr BLOB,
        reward_pool INTEGER,
        block_size INTEGER,
        weave_size INTEGER,
        usd_to_ar_rate_dividend INTEGER,
        usd_to_ar_rate_divisor INTEGER,
        scheduled_usd_to_ar_rate_dividend INTEGER,
        scheduled_usd_to_ar_rate_divisor INTEGER,
        hash_list_merkle BLOB,
        wallet_list BLOB,
        tx_root BLOB,
        tx_count INTEGER NOT NULL,
        missing_tx_count INTEGER NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS new_block_heights (
        height INTEGER NOT NULL,
        block_indep_hash BLOB NOT NULL,
        PRIMARY KEY (height, block_indep_hash)
    )",
    "CREATE TABLE IF NOT EXISTS new_block_transactions (
        block_indep_hash BLOB NOT NULL,
        transaction_id BLOB NOT NULL,
        block_transaction_index INTEGER NOT NULL,
        PRIMARY KEY (block_indep_hash, transaction_id)
    )",
    "CREATE TABLE IF NOT EXISTS new_transactions (
        id BLOB PRIMARY KEY,
        signature BLOB NOT NULL,
        format INTEGER NOT NULL,
        last_tx BLOB NOT NULL,
        owner_address BLOB NOT NULL,
        target BLOB,
        quantity INTEGER NOT NULL,
        reward INTEGER NOT NULL,
        data_size INTEGER NOT NULL,
        data_root BLOB,
        content_type TEXT,
        tag_count INTEGER NOT NULL,
        created_at INTEGER NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS new_transaction_tags (
        tag_name_hash BLOB NOT NULL,
        tag_value_hash BLOB NOT NULL,
        transaction_id BLOB NOT NULL,
        transaction_tag_index INTEGER NOT NULL,
        PRIMARY KEY (transaction_id, transaction_tag_index)
    )",
    // ── confirmed tier ──
    "CREATE TABLE IF NOT EXISTS stable_blocks (
        height INTEGER PRIMARY KEY,
        indep_hash BLOB UNIQUE NOT NULL,
        previous_block BLOB,
        nonce BLOB NOT NULL,
        hash BLOB NOT NULL,
        block_timestamp INTEGER NOT NULL,
        diff TEXT,
        cumulative_diff TEXT,
        last_retarget INTEGER,
        reward_addr BLOB,
        reward_pool INTEGER,
        block_size INTEGER,
        weave_size INTEGER,
        usd_to_ar_rate_dividend INTEGER,
        usd_to_ar_rate_divisor INTEGER,
        scheduled_usd_to_ar_rate_dividend INTEGER,
        scheduled_usd_to_ar_rate_divisor INTEGER,
        hash_list_merkle BLOB,
        wallet_list BLOB,
        tx_root BLOB,
        tx_count INTEGER NOT NULL,
        missing_tx_count INTEGER NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS stable_block_transactions (
        block_indep_hash BLOB NOT NULL,
        transaction_id BLOB NOT NULL,
        block_transaction_index INTEGER NOT NULL,
        PRIMARY KEY (block_indep_hash, transaction_id)
    )",
    "CREATE TABLE IF NOT EXISTS stable_transactions (
        id BLOB PRIMARY KEY,
        height INTEGER NOT NULL,
        block_transaction_index INTEGER NOT NULL,
        signature BLOB NOT NULL,
        format INTEGER NOT NULL,
        last_tx BLOB NOT NULL,
        owner_address BLOB NOT NULL,
        target BLOB,
        quantity INTEGER NOT NULL,
        reward INTEGER NOT NULL,
        data_size INTEGER NOT NULL,
        data_root BLOB,
        content_type TEXT,
        tag_count INTEGER NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS stable_transaction_tags (
        tag_name_hash BLOB NOT NULL,
        tag_value_hash BLOB NOT NULL,
        height INTEGER NOT NULL,
        block_transaction_index INTEGER NOT NULL,
        transaction_tag_index INTEGER NOT NULL,
        transaction_id BLOB NOT NULL,
        PRIMARY KEY (transaction_id, transaction_tag_index)
    )",
    // ── shared ──
    "CREATE TABLE IF NOT EXISTS tag_names (
        hash BLOB PRIMARY KEY,
        name BLOB NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS tag_values (
        hash BLOB PRIMARY KEY,
        value BLOB NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS wallets (
        address BLOB PRIMARY KEY,
        public_modulus BLOB
    )",
    "CREATE TABLE IF NOT EXISTS missing_transactions (
        block_indep_hash BLOB NOT NULL,
        transaction_id BLOB NOT NULL,
        height INTEGER NOT NULL,
        PRIMARY KEY (block_indep_hash, transaction_id)
    )",
];

pub const CREATE_INDEXES: &[&str] = &[
    "CREATE INDEX IF NOT EXISTS new_blocks_height_idx ON new_blocks (height)",
    "CREATE INDEX IF NOT EXISTS new_block_heights_block_indep_hash_idx
        ON new_block_heights (block_indep_hash)",
    "CREATE INDEX IF NOT EXISTS new_block_transactions_transaction_id_idx
        ON new_block_transactions (transaction_id)",
    "CREATE INDEX IF NOT EXISTS new_transactions_owner_address_idx
        ON new_transactions (owner_address)",
    "CREATE INDEX IF NOT EXISTS new_transactions_target_idx ON new_transactions (target)",
    "CREATE INDEX IF NOT EXISTS new_transactions_created_at_idx ON new_transactions (created_at)",
    "CREATE INDEX IF NOT EXISTS new_transaction_tags_name_value_idx
        ON new_transaction_tags (tag_name_hash, tag_value_hash)",
    "CREATE INDEX IF NOT EXISTS stable_block_transactions_transaction_id_idx
        ON stable_block_transactions (transaction_id)",
    "CREATE INDEX IF NOT EXISTS stable_transactions_height_idx
        ON stable_transactions (height, block_transaction_index)",
    "CREATE INDEX IF NOT EXISTS stable_transactions_owner_address_idx
        ON stable_transactions (owner_address)",
    "CREATE INDEX IF NOT EXISTS stable_transactions_target_idx ON stable_transactions (target)",
    "CREATE INDEX IF NOT EXISTS stable_transaction_tags_name_value_idx
        ON stable_transaction_tags (tag_name_hash, tag_value_hash)",
    "CREATE INDEX IF NOT EXISTS stable_transaction_tags_height_idx
        ON stable_transaction_tags (height, block_transaction_index)",
    "CREATE INDEX IF NOT EXISTS missing_transactions_height_idx
        ON missing_transactions (height)",
];
