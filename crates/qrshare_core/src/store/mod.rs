//! Storage seams for share persistence.
//!
//! Metadata (small, structured, expiring) and blobs (large, opaque) are kept
//! behind two independent traits so each can be backed by a different
//! technology without touching the share service or the HTTP handlers.

/// Filesystem blob store.
pub mod blob_dir;
/// In-memory stores with invocation counters.
pub mod memory;

pub use blob_dir::BlobDir;
pub use memory::{MemoryBlobStore, MemoryMetadataStore};

use crate::{error::AppError, identity::digest_hex, models::share::ShareRecord};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Key-value store for share records with per-record expiration.
///
/// Implementations must stop returning a record no later than `ttl` after it
/// was written. Whether expired rows are evicted eagerly or lazily is up to
/// the backend.
pub trait MetadataStore: Send + Sync {
    /// Fetch a live record by id.
    ///
    /// # Returns
    /// `Ok(None)` when the id is unknown or its TTL has elapsed.
    ///
    /// # Errors
    /// Returns an error when the backend cannot be read.
    fn get(&self, id: &str) -> Result<Option<ShareRecord>, AppError>;

    /// Write `record` unconditionally, expiring it after `ttl`.
    ///
    /// # Errors
    /// Returns an error when the backend cannot be written.
    fn put_with_ttl(&self, record: &ShareRecord, ttl: Duration) -> Result<(), AppError>;

    /// Write `record` only when no live record exists for its id.
    ///
    /// The default implementation reads before writing and is therefore not
    /// atomic; backends with a native conditional write override it.
    ///
    /// # Returns
    /// `true` when the record was written, `false` when a live one already existed.
    ///
    /// # Errors
    /// Returns an error when the backend cannot be read or written.
    fn put_if_absent(&self, record: &ShareRecord, ttl: Duration) -> Result<bool, AppError> {
        if self.contains(&record.id)? {
            return Ok(false);
        }
        self.put_with_ttl(record, ttl)?;
        Ok(true)
    }

    /// Whether a live record exists for `id`.
    ///
    /// # Errors
    /// Returns an error when the backend cannot be read.
    fn contains(&self, id: &str) -> Result<bool, AppError> {
        Ok(self.get(id)?.is_some())
    }

    /// Physically remove every expired record.
    ///
    /// Backends that evict expired rows on their own have nothing to purge
    /// and keep the default.
    ///
    /// # Returns
    /// The removed records, so their blobs can be reclaimed.
    ///
    /// # Errors
    /// Returns an error when the backend cannot be written.
    fn purge_expired(&self) -> Result<Vec<ShareRecord>, AppError> {
        Ok(Vec::new())
    }
}

/// HTTP-facing metadata for a stored object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlobMeta {
    pub content_type: String,
    /// Quoted strong validator, usable directly as an `ETag` header value.
    pub etag: String,
    pub size: u64,
    /// Epoch milliseconds of the upload.
    pub uploaded_at: i64,
}

impl BlobMeta {
    /// Describe `bytes` as they are about to be stored.
    pub fn describe(bytes: &[u8], content_type: &str) -> Self {
        Self {
            content_type: content_type.to_string(),
            etag: etag_for(bytes),
            size: bytes.len() as u64,
            uploaded_at: Utc::now().timestamp_millis(),
        }
    }
}

/// A stored object together with its metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlobObject {
    pub meta: BlobMeta,
    pub bytes: Vec<u8>,
}

/// Object store mapping string keys to opaque bytes.
pub trait BlobStore: Send + Sync {
    /// Store `bytes` under `key`, replacing any previous object.
    ///
    /// # Returns
    /// Metadata of the stored object.
    ///
    /// # Errors
    /// Returns [`AppError::BadRequest`] for unusable keys, or a storage error
    /// when the write fails.
    fn put(&self, key: &str, bytes: &[u8], content_type: &str) -> Result<BlobMeta, AppError>;

    /// Fetch an object and its metadata.
    ///
    /// # Returns
    /// `Ok(None)` when nothing is stored under `key`.
    ///
    /// # Errors
    /// Returns an error when the backend cannot be read.
    fn get(&self, key: &str) -> Result<Option<BlobObject>, AppError>;

    /// Fetch only the metadata of an object.
    ///
    /// # Errors
    /// Returns an error when the backend cannot be read.
    fn head(&self, key: &str) -> Result<Option<BlobMeta>, AppError> {
        Ok(self.get(key)?.map(|object| object.meta))
    }

    /// Remove the object under `key`.
    ///
    /// # Returns
    /// `true` when an object was removed, `false` when none was stored.
    ///
    /// # Errors
    /// Returns an error when the backend cannot be written.
    fn delete(&self, key: &str) -> Result<bool, AppError>;
}

/// Strong entity tag for `bytes`: the quoted 128-bit content digest.
pub fn etag_for(bytes: &[u8]) -> String {
    format!("\"{}\"", digest_hex(bytes))
}
