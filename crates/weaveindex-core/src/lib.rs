//! weaveindex-core — foundation for the two-tier chain indexing core.
//!
//! # Architecture
//!
//! ```text
//! ChainSource ──▶ IndexDb (weaveindex-storage)
//!                    ├── ingestion      (pending tier, one tx per block)
//!                    ├── stabilization  (pending → confirmed promotion + cleanup)
//!                    ├── query engine   (two-tier paginated listings)
//!                    └── diagnostics    (counts and height summaries)
//! ```
//!
//! This crate is storage-free: record shapes and boundary decoding,
//! pagination cursors, query argument/result types, hashing and base64
//! utilities, errors, and configuration.

pub mod config;
pub mod cursor;
pub mod encoding;
pub mod error;
pub mod query;
pub mod source;
pub mod types;

pub use config::{IndexConfig, BLOCK_TX_INDEX_BOUND};
pub use cursor::{BlockCursor, TxCursor};
pub use error::IndexError;
pub use query::{
    GqlBlock, GqlBlocksArgs, GqlEdge, GqlPage, GqlTag, GqlTransaction, GqlTransactionsArgs,
    SortOrder, TagMatch,
};
pub use source::{BlockAndTxs, ChainSource};
pub use types::{Amount, BlockRecord, JsonBlock, JsonTag, JsonTransaction, TagRecord, TxRecord};
