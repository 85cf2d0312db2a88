//! weaveindex-storage — the SQLite tier of the chain indexing core.
//!
//! A single [`IndexDb`] handle owns the database for its lifetime
//! (`open → serve → close`) and exposes:
//!
//! - ingestion: [`IndexDb::save_block_and_txs`], [`IndexDb::save_tx`]
//! - stabilization: [`IndexDb::flush_stable`] (promotion + cleanup)
//! - fork handling: [`IndexDb::reset_to_height`]
//! - queries: [`IndexDb::get_gql_transactions`], [`IndexDb::get_gql_blocks`]
//!   and the single-item lookups
//! - diagnostics: [`IndexDb::get_debug_info`]
//!
//! The database runs in WAL mode; every mutation is one engine-level
//! transaction and replays are idempotent (insert-or-ignore on every
//! primary key).

mod db;
mod debug;
mod ingest;
mod query;
pub mod schema;
mod stabilize;

pub use db::IndexDb;
pub use debug::{DebugCounts, DebugHeights, DebugInfo};
