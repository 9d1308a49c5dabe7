//! Share-related data models.

use crate::clock::duration_millis;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Persisted share metadata.
///
/// Records are immutable once written; republishing identical content returns
/// the stored record instead of replacing it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShareRecord {
    pub id: String,
    /// Normalized (trimmed) text; may be empty.
    pub text: String,
    /// Epoch milliseconds of the first publish.
    pub created_at: i64,
    /// Blob store key of the raster image.
    pub blob_key: String,
    pub data_url: String,
    pub svg_string: String,
}

impl ShareRecord {
    /// Absolute expiry in epoch milliseconds for a given retention window.
    pub fn expires_at(&self, retention: Duration) -> i64 {
        self.created_at.saturating_add(duration_millis(retention))
    }

    /// Whether the record is past its expiry at `now_millis`.
    pub fn is_expired_at(&self, retention: Duration, now_millis: i64) -> bool {
        now_millis > self.expires_at(retention)
    }

    /// Whole seconds left before expiry, clamped at zero.
    pub fn expires_in_secs(&self, retention: Duration, now_millis: i64) -> u64 {
        let remaining = self.expires_at(retention).saturating_sub(now_millis).max(0);
        (remaining / 1000) as u64
    }

    /// Both encodings are present; anything else is treated as corrupt.
    pub fn is_complete(&self) -> bool {
        !self.data_url.is_empty() && !self.svg_string.is_empty()
    }
}

/// Request payload for publishing a share.
///
/// Required fields are optional at the type level so a missing field is a
/// 400 from the handler rather than a JSON rejection.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishRequest {
    pub text: Option<String>,
    pub data_url: Option<String>,
    pub svg_string: Option<String>,
}

/// Response payload for a publish (fresh or deduplicated).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishResponse {
    pub id: String,
    pub url: String,
    pub expires_in: u64,
    pub expires_at: i64,
}

/// Query parameters for the metadata endpoint. `share` is accepted as an alias.
#[derive(Debug, Default, Deserialize)]
pub struct LookupQuery {
    pub id: Option<String>,
    pub share: Option<String>,
}

/// Full share payload returned by the metadata endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShareResponse {
    pub id: String,
    pub text: String,
    pub data_url: String,
    pub svg_string: String,
    pub url: String,
    pub created: i64,
    pub expires_at: i64,
}
