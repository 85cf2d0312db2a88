//! Chain-source record shapes and their decoded forms.
//!
//! The chain source hands the index JSON blocks and transactions whose byte
//! fields (ids, signatures, roots, owner keys, tag names/values) are
//! URL-safe base64 strings. `JsonBlock`/`JsonTransaction` mirror that wire
//! format; [`BlockRecord`]/[`TxRecord`] are the decoded raw-byte forms the
//! ingestion engine persists. Decoding happens once, at this boundary.

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize};

use crate::encoding::b64url_decode;
use crate::error::IndexError;

// ─── Amounts ──────────────────────────────────────────────────────────────────

/// A large decimal-valued field (quantity, reward, size, rate component).
///
/// These arrive as decimal strings or bare JSON numbers depending on the
/// block's era. They are stored as 64-bit integers where they fit and as
/// text otherwise; `as_i64` tells the storage layer which.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Amount(pub String);

impl Amount {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// The value as an `i64`, if it fits.
    pub fn as_i64(&self) -> Option<i64> {
        self.0.parse::<i64>().ok()
    }
}

impl<'de> Deserialize<'de> for Amount {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct AmountVisitor;

        impl<'de> Visitor<'de> for AmountVisitor {
            type Value = Amount;

            fn expecting(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str("a decimal string or integer")
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<Amount, E> {
                Ok(Amount(v.to_string()))
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<Amount, E> {
                Ok(Amount(v.to_string()))
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<Amount, E> {
                Ok(Amount(v.to_string()))
            }
        }

        deserializer.deserialize_any(AmountVisitor)
    }
}

// ─── Wire shapes ──────────────────────────────────────────────────────────────

/// One `{name, value}` tag as it appears on the wire (both fields base64url).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JsonTag {
    pub name: String,
    pub value: String,
}

/// A block header as served by the chain source.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonBlock {
    pub indep_hash: String,
    pub height: u64,
    #[serde(default)]
    pub previous_block: Option<String>,
    pub nonce: String,
    pub hash: String,
    pub timestamp: u64,
    pub diff: Amount,
    #[serde(default)]
    pub cumulative_diff: Option<Amount>,
    pub last_retarget: u64,
    #[serde(default)]
    pub reward_addr: Option<String>,
    pub reward_pool: Amount,
    pub block_size: Amount,
    pub weave_size: Amount,
    /// `[dividend, divisor]`; absent before the fork that introduced it.
    #[serde(default)]
    pub usd_to_ar_rate: Option<(Amount, Amount)>,
    #[serde(default)]
    pub scheduled_usd_to_ar_rate: Option<(Amount, Amount)>,
    #[serde(default)]
    pub hash_list_merkle: Option<String>,
    pub wallet_list: String,
    #[serde(default)]
    pub tx_root: Option<String>,
    /// Transaction ids in block order.
    pub txs: Vec<String>,
}

/// A full transaction as served by the chain source.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonTransaction {
    pub id: String,
    #[serde(default = "default_format")]
    pub format: u32,
    pub last_tx: String,
    pub owner: String,
    #[serde(default)]
    pub target: String,
    pub quantity: Amount,
    pub reward: Amount,
    #[serde(default)]
    pub data_size: Amount,
    #[serde(default)]
    pub data_root: String,
    pub signature: String,
    #[serde(default)]
    pub tags: Vec<JsonTag>,
}

fn default_format() -> u32 {
    1
}

// ─── Decoded records ──────────────────────────────────────────────────────────

/// A decoded tag: raw name and value bytes in wire order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagRecord {
    pub name: Vec<u8>,
    pub value: Vec<u8>,
}

/// A block with every byte field decoded, ready for the ingestion engine.
#[derive(Debug, Clone)]
pub struct BlockRecord {
    pub indep_hash: Vec<u8>,
    pub height: u64,
    pub previous_block: Option<Vec<u8>>,
    pub nonce: Vec<u8>,
    pub hash: Vec<u8>,
    pub block_timestamp: u64,
    pub diff: Amount,
    pub cumulative_diff: Option<Amount>,
    pub last_retarget: u64,
    pub reward_addr: Option<Vec<u8>>,
    pub reward_pool: Amount,
    pub block_size: Amount,
    pub weave_size: Amount,
    pub usd_to_ar_rate: Option<(Amount, Amount)>,
    pub scheduled_usd_to_ar_rate: Option<(Amount, Amount)>,
    pub hash_list_merkle: Option<Vec<u8>>,
    pub wallet_list: Vec<u8>,
    pub tx_root: Option<Vec<u8>>,
    /// Decoded transaction ids in block order.
    pub txs: Vec<Vec<u8>>,
}

impl TryFrom<&JsonBlock> for BlockRecord {
    type Error = IndexError;

    fn try_from(block: &JsonBlock) -> Result<Self, IndexError> {
        let txs = block
            .txs
            .iter()
            .map(|id| b64url_decode(id))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            indep_hash: b64url_decode(&block.indep_hash)?,
            height: block.height,
            previous_block: decode_opt(block.previous_block.as_deref())?,
            nonce: b64url_decode(&block.nonce)?,
            hash: b64url_decode(&block.hash)?,
            block_timestamp: block.timestamp,
            diff: block.diff.clone(),
            cumulative_diff: block.cumulative_diff.clone(),
            last_retarget: block.last_retarget,
            reward_addr: decode_opt(block.reward_addr.as_deref())?,
            reward_pool: block.reward_pool.clone(),
            block_size: block.block_size.clone(),
            weave_size: block.weave_size.clone(),
            usd_to_ar_rate: block.usd_to_ar_rate.clone(),
            scheduled_usd_to_ar_rate: block.scheduled_usd_to_ar_rate.clone(),
            hash_list_merkle: decode_opt(block.hash_list_merkle.as_deref())?,
            wallet_list: b64url_decode(&block.wallet_list)?,
            tx_root: decode_opt(block.tx_root.as_deref())?,
            txs,
        })
    }
}

/// A transaction with every byte field decoded.
#[derive(Debug, Clone)]
pub struct TxRecord {
    pub id: Vec<u8>,
    pub signature: Vec<u8>,
    pub format: u32,
    pub last_tx: Vec<u8>,
    /// The owner's public modulus; the wallet address is its SHA-256.
    pub owner: Vec<u8>,
    /// Empty for transactions with no recipient.
    pub target: Vec<u8>,
    pub quantity: Amount,
    pub reward: Amount,
    pub data_size: Amount,
    pub data_root: Vec<u8>,
    pub tags: Vec<TagRecord>,
}

impl TryFrom<&JsonTransaction> for TxRecord {
    type Error = IndexError;

    fn try_from(tx: &JsonTransaction) -> Result<Self, IndexError> {
        let tags = tx
            .tags
            .iter()
            .map(|t| {
                Ok(TagRecord {
                    name: b64url_decode(&t.name)?,
                    value: b64url_decode(&t.value)?,
                })
            })
            .collect::<Result<Vec<_>, IndexError>>()?;
        Ok(Self {
            id: b64url_decode(&tx.id)?,
            signature: b64url_decode(&tx.signature)?,
            format: tx.format,
            last_tx: b64url_decode(&tx.last_tx)?,
            owner: b64url_decode(&tx.owner)?,
            target: b64url_decode(&tx.target)?,
            quantity: tx.quantity.clone(),
            reward: tx.reward.clone(),
            data_size: tx.data_size.clone(),
            data_root: b64url_decode(&tx.data_root)?,
            tags,
        })
    }
}

fn decode_opt(value: Option<&str>) -> Result<Option<Vec<u8>>, IndexError> {
    match value {
        Some("") | None => Ok(None),
        Some(v) => Ok(Some(b64url_decode(v)?)),
    }
}

/// The content type of a transaction: the value of the first tag whose
/// lowercased UTF-8 name equals `content-type`. When several such tags are
/// present the first in tag order wins; later duplicates are ignored.
pub fn content_type_of(tags: &[TagRecord]) -> Option<String> {
    tags.iter()
        .find(|t| t.name.to_ascii_lowercase() == b"content-type")
        .and_then(|t| String::from_utf8(t.value.clone()).ok())
}
