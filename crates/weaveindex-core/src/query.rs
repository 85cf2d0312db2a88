//! Query arguments and result shapes for the GraphQL-facing listing engine.

use serde::{Deserialize, Serialize};

/// Total-order direction for listings. The order key is
/// `(height, block_transaction_index)` for transactions and `height` for
/// blocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortOrder {
    HeightAsc,
    HeightDesc,
}

impl Default for SortOrder {
    fn default() -> Self {
        Self::HeightDesc
    }
}

/// One tag predicate: `name == tag.name AND tag.value IN values`.
/// Values are OR'd within a tag; separate tags AND across.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagMatch {
    /// UTF-8 tag name as the API caller wrote it (e.g. `"Content-Type"`).
    pub name: String,
    /// UTF-8 candidate values.
    pub values: Vec<String>,
}

/// Arguments for a paginated transaction listing.
///
/// `ids`, `recipients`, and `owners` are base64url identifiers matched as
/// equality-in-set after decoding. `min_height`/`max_height` are inclusive;
/// `-1` means unbounded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GqlTransactionsArgs {
    pub page_size: usize,
    #[serde(default)]
    pub cursor: Option<String>,
    #[serde(default)]
    pub sort_order: SortOrder,
    #[serde(default)]
    pub ids: Vec<String>,
    #[serde(default)]
    pub recipients: Vec<String>,
    #[serde(default)]
    pub owners: Vec<String>,
    #[serde(default = "unbounded")]
    pub min_height: i64,
    #[serde(default = "unbounded")]
    pub max_height: i64,
    #[serde(default)]
    pub tags: Vec<TagMatch>,
}

impl Default for GqlTransactionsArgs {
    fn default() -> Self {
        Self {
            page_size: 10,
            cursor: None,
            sort_order: SortOrder::default(),
            ids: vec![],
            recipients: vec![],
            owners: vec![],
            min_height: -1,
            max_height: -1,
            tags: vec![],
        }
    }
}

/// Arguments for a paginated block listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GqlBlocksArgs {
    pub page_size: usize,
    #[serde(default)]
    pub cursor: Option<String>,
    #[serde(default)]
    pub sort_order: SortOrder,
    #[serde(default)]
    pub ids: Vec<String>,
    #[serde(default = "unbounded")]
    pub min_height: i64,
    #[serde(default = "unbounded")]
    pub max_height: i64,
}

impl Default for GqlBlocksArgs {
    fn default() -> Self {
        Self {
            page_size: 10,
            cursor: None,
            sort_order: SortOrder::default(),
            ids: vec![],
            min_height: -1,
            max_height: -1,
        }
    }
}

fn unbounded() -> i64 {
    -1
}

/// A tag returned with a transaction, as UTF-8 text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GqlTag {
    pub name: String,
    pub value: String,
}

/// One transaction as the API layer renders it. Byte fields are base64url
/// strings again on the way out. Block fields are absent for a pending
/// transaction that has not been tied to a block yet.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GqlTransaction {
    pub id: String,
    pub anchor: String,
    pub signature: String,
    pub recipient: Option<String>,
    pub owner_address: String,
    pub fee: String,
    pub quantity: String,
    pub data_size: String,
    pub content_type: Option<String>,
    pub block_indep_hash: Option<String>,
    pub block_timestamp: Option<u64>,
    pub height: Option<u64>,
    pub block_transaction_index: Option<u64>,
    pub tags: Vec<GqlTag>,
}

/// One block as the API layer renders it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GqlBlock {
    pub id: String,
    pub timestamp: u64,
    pub height: u64,
    pub previous: Option<String>,
}

/// A listing edge: the node plus the opaque cursor that resumes after it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GqlEdge<T> {
    pub cursor: String,
    pub node: T,
}

/// One page of a listing. `edges` holds at most `page_size` entries;
/// `has_next_page` reports whether another page exists past the last edge.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GqlPage<T> {
    pub has_next_page: bool,
    pub edges: Vec<GqlEdge<T>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_unbounded_desc() {
        let args = GqlTransactionsArgs::default();
        assert_eq!(args.sort_order, SortOrder::HeightDesc);
        assert_eq!(args.min_height, -1);
        assert_eq!(args.max_height, -1);
        assert!(args.tags.is_empty());
    }

    #[test]
    fn args_deserialize_with_partial_fields() {
        let args: GqlTransactionsArgs =
            serde_json::from_str(r#"{"page_size": 3, "tags": [{"name": "Content-Type", "values": ["image/png"]}]}"#)
                .unwrap();
        assert_eq!(args.page_size, 3);
        assert_eq!(args.tags[0].name, "Content-Type");
        assert_eq!(args.min_height, -1);
    }
}
