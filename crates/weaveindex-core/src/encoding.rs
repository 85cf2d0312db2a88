//! Binary/textual identifier conversion and index-key fingerprints.
//!
//! Everything the chain puts on the wire — ids, signatures, roots, owner
//! keys, tag names and values — travels as URL-safe base64 without padding
//! and is stored as raw bytes. Tag names and values are additionally
//! fingerprinted with SHA-1 and wallet owners with SHA-256; those digests
//! are index keys, not security tokens.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use sha1::Sha1;
use sha2::{Digest, Sha256};

use crate::error::IndexError;

/// Encode raw bytes as URL-safe base64 without padding.
pub fn b64url_encode(bytes: &[u8]) -> String {
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Decode URL-safe unpadded base64 into raw bytes.
pub fn b64url_decode(s: &str) -> Result<Vec<u8>, IndexError> {
    URL_SAFE_NO_PAD
        .decode(s)
        .map_err(|e| IndexError::InvalidArgument(format!("invalid base64url value {s:?}: {e}")))
}

/// SHA-1 fingerprint used as the join/index key for tag names and values.
pub fn tag_hash(bytes: &[u8]) -> Vec<u8> {
    let mut hasher = Sha1::new();
    hasher.update(bytes);
    hasher.finalize().to_vec()
}

/// Wallet address: SHA-256 of the owner's public modulus.
pub fn owner_address(public_modulus: &[u8]) -> Vec<u8> {
    let mut hasher = Sha256::new();
    hasher.update(public_modulus);
    hasher.finalize().to_vec()
}
