//! Content-derived share identifiers.
//!
//! A share id is the first 128 bits of the BLAKE3 digest of the share's
//! content, rendered as 32 lowercase hex characters. Identical content always
//! maps to the same id, which is what makes republishing a no-op.

use crate::constants::BLOB_KEY_PREFIX;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Number of hex characters in a share id.
pub const SHARE_ID_LEN: usize = 32;

/// Validated content-derived share identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ShareId(String);

impl ShareId {
    /// Accept only well-formed ids (32 lowercase hex characters).
    ///
    /// # Returns
    /// `None` for anything that could not have been minted by [`identify`].
    pub fn parse(raw: &str) -> Option<Self> {
        let well_formed = raw.len() == SHARE_ID_LEN
            && raw
                .bytes()
                .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b));
        well_formed.then(|| Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Blob store key holding this share's raster image.
    pub fn blob_key(&self) -> String {
        format!("{}/{}.png", BLOB_KEY_PREFIX, self.0)
    }
}

impl fmt::Display for ShareId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ShareId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Derive the share id for a (text, raster) pair.
///
/// Non-empty text (after trimming) wins; otherwise the raster payload is
/// hashed. Total over every input, including empty ones.
pub fn identify(text: &str, raster_payload: &[u8]) -> ShareId {
    let text = text.trim();
    let source = if text.is_empty() {
        raster_payload
    } else {
        text.as_bytes()
    };
    ShareId(digest_hex(source))
}

/// 128-bit BLAKE3 digest of `bytes` as lowercase hex.
pub fn digest_hex(bytes: &[u8]) -> String {
    let hex = blake3::hash(bytes).to_hex();
    hex.as_str()[..SHARE_ID_LEN].to_string()
}
