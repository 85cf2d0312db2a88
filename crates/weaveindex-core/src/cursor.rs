//! Opaque pagination cursors.
//!
//! A cursor is the URL-safe base64 (no padding) of a small JSON array:
//! `[height, block_transaction_index]` for transaction listings, `[height]`
//! for block listings. Clients treat the string as opaque; the engine
//! round-trips every cursor it emits. The decoded value is the *exclusive*
//! bound of the next page in the active sort order.

use crate::encoding::{b64url_decode, b64url_encode};
use crate::error::IndexError;

/// Position of one transaction edge in the total `(height, index)` order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TxCursor {
    pub height: u64,
    pub block_transaction_index: u64,
}

impl TxCursor {
    pub fn new(height: u64, block_transaction_index: u64) -> Self {
        Self {
            height,
            block_transaction_index,
        }
    }

    /// Encode as base64url of the JSON array `[height, index]`.
    pub fn encode(&self) -> String {
        let json = format!("[{},{}]", self.height, self.block_transaction_index);
        b64url_encode(json.as_bytes())
    }

    /// Decode an optional cursor string. An absent cursor means "no bound".
    pub fn decode(cursor: Option<&str>) -> Result<Option<Self>, IndexError> {
        let Some(cursor) = cursor else {
            return Ok(None);
        };
        let bytes = b64url_decode(cursor)
            .map_err(|_| IndexError::BadCursor(cursor.to_string()))?;
        let (height, block_transaction_index) = serde_json::from_slice::<(u64, u64)>(&bytes)
            .map_err(|_| IndexError::BadCursor(cursor.to_string()))?;
        Ok(Some(Self {
            height,
            block_transaction_index,
        }))
    }
}

/// Position of one block edge in the total height order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockCursor {
    pub height: u64,
}

impl BlockCursor {
    pub fn new(height: u64) -> Self {
        Self { height }
    }

    pub fn encode(&self) -> String {
        b64url_encode(format!("[{}]", self.height).as_bytes())
    }

    pub fn decode(cursor: Option<&str>) -> Result<Option<Self>, IndexError> {
        let Some(cursor) = cursor else {
            return Ok(None);
        };
        let bytes = b64url_decode(cursor)
            .map_err(|_| IndexError::BadCursor(cursor.to_string()))?;
        let (height,) = serde_json::from_slice::<(u64,)>(&bytes)
            .map_err(|_| IndexError::BadCursor(cursor.to_string()))?;
        Ok(Some(Self { height }))
    }
}
