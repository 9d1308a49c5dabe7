//! Share publishing and retrieval over a metadata store and a blob store.
//!
//! The service owns the ordering rules: a share's raster is written to the
//! blob store before its metadata, and content that is already published is
//! never written again.

/// Raster data-URL decoding.
pub mod data_url;

#[cfg(test)]
mod tests;

use crate::{
    clock::{Clock, SystemClock},
    constants::{SHARE_IMAGE_CONTENT_TYPE, SHARE_RETENTION},
    error::AppError,
    identity::{identify, ShareId},
    models::share::{PublishRequest, ShareRecord},
    store::{BlobMeta, BlobObject, BlobStore, MetadataStore},
    text::{normalize_optional_nonempty, normalize_share_text},
};
use std::sync::Arc;
use std::time::Duration;

pub use data_url::decode_payload;

/// Outcome of [`ShareService::publish`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Published {
    pub record: ShareRecord,
    /// Epoch milliseconds at which the share stops resolving.
    pub expires_at: i64,
    /// Whole seconds until `expires_at`, clamped at zero.
    pub expires_in: u64,
    /// `false` when the content was already published and nothing was written.
    pub created: bool,
}

/// Publish/lookup orchestration shared by every HTTP handler.
pub struct ShareService {
    metadata: Arc<dyn MetadataStore>,
    blobs: Arc<dyn BlobStore>,
    clock: Arc<dyn Clock>,
    retention: Duration,
    sweep_on_publish: bool,
}

impl ShareService {
    /// Service over the given stores with the system clock and the default
    /// seven-day retention.
    pub fn new(metadata: Arc<dyn MetadataStore>, blobs: Arc<dyn BlobStore>) -> Self {
        Self::with_clock(metadata, blobs, Arc::new(SystemClock))
    }

    pub fn with_clock(
        metadata: Arc<dyn MetadataStore>,
        blobs: Arc<dyn BlobStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            metadata,
            blobs,
            clock,
            retention: SHARE_RETENTION,
            sweep_on_publish: false,
        }
    }

    /// Purge expired shares after every fresh publish.
    ///
    /// For stores without their own eviction, such as the in-memory ones,
    /// this keeps memory bounded by the shares published within one
    /// retention window.
    pub fn sweeping_on_publish(mut self) -> Self {
        self.sweep_on_publish = true;
        self
    }

    /// Publish a share, or return the live one with the same content.
    ///
    /// # Arguments
    /// - `request`: Text plus the raster data URL and SVG markup.
    ///
    /// # Returns
    /// The stored record with its expiry; `created` tells whether anything
    /// was written.
    ///
    /// # Errors
    /// - [`AppError::BadRequest`] when either encoding is missing or empty.
    /// - [`AppError::Decode`] when the raster data URL cannot be decoded.
    /// - A storage error when either store fails. No metadata is written when
    ///   the blob write fails.
    pub fn publish(&self, request: PublishRequest) -> Result<Published, AppError> {
        let data_url = request.data_url.filter(|value| !value.is_empty());
        let svg_string = request.svg_string.filter(|value| !value.is_empty());
        let (Some(data_url), Some(svg_string)) = (data_url, svg_string) else {
            return Err(AppError::BadRequest("Missing data".to_string()));
        };

        let text = normalize_share_text(request.text.as_deref());
        let id = identify(&text, data_url.as_bytes());

        if let Some(existing) = self.find_live(&id)? {
            tracing::debug!(share_id = %id, "share already published; skipping writes");
            return Ok(self.published(existing, false));
        }

        let bytes = decode_payload(&data_url)?;
        let blob_key = id.blob_key();
        let meta = self.blobs.put(&blob_key, &bytes, SHARE_IMAGE_CONTENT_TYPE)?;

        let record = ShareRecord {
            id: id.as_str().to_string(),
            text,
            created_at: self.clock.now_millis(),
            blob_key,
            data_url,
            svg_string,
        };

        if self.metadata.put_if_absent(&record, self.retention)? {
            tracing::info!(
                share_id = %id,
                bytes = meta.size,
                "published share"
            );
            if self.sweep_on_publish {
                if let Err(err) = self.purge_expired() {
                    tracing::warn!("Failed to purge expired shares: {}", err);
                }
            }
            return Ok(self.published(record, true));
        }

        // A concurrent publish of the same content won; report its record.
        let winner = self.metadata.get(id.as_str())?.ok_or_else(|| {
            AppError::StorageMessage(format!(
                "share '{}' vanished after a conflicting write",
                id
            ))
        })?;
        tracing::debug!(share_id = %id, "lost publish race; returning existing share");
        Ok(self.published(winner, false))
    }

    /// Resolve a share id for the metadata endpoint.
    ///
    /// # Errors
    /// [`AppError::NotFound`] for malformed, unknown, expired or incomplete
    /// shares, so callers cannot tell those cases apart.
    pub fn lookup(&self, raw_id: &str) -> Result<ShareRecord, AppError> {
        let id = ShareId::parse(raw_id.trim()).ok_or(AppError::NotFound)?;
        match self.find_live(&id)? {
            Some(record) if record.is_complete() => Ok(record),
            _ => Err(AppError::NotFound),
        }
    }

    /// Live record for `id`, if any.
    ///
    /// Applies the logical retention window on top of the store's own TTL,
    /// so a backend that evicts late never resurrects an expired share.
    ///
    /// # Errors
    /// Returns an error when the metadata store cannot be read.
    pub fn find_live(&self, id: &ShareId) -> Result<Option<ShareRecord>, AppError> {
        let now = self.clock.now_millis();
        Ok(self
            .metadata
            .get(id.as_str())?
            .filter(|record| !record.is_expired_at(self.retention, now)))
    }

    /// Metadata of the raster behind `record`.
    ///
    /// # Errors
    /// [`AppError::NotFound`] when the blob is missing.
    pub fn blob_meta(&self, record: &ShareRecord) -> Result<BlobMeta, AppError> {
        self.blobs.head(&record.blob_key)?.ok_or(AppError::NotFound)
    }

    /// The raster behind `record`.
    ///
    /// # Errors
    /// [`AppError::NotFound`] when the blob is missing.
    pub fn fetch_blob(&self, record: &ShareRecord) -> Result<BlobObject, AppError> {
        self.blobs.get(&record.blob_key)?.ok_or(AppError::NotFound)
    }

    /// Physically remove expired shares and their rasters.
    ///
    /// A raster is kept when its id was republished since the purge removed
    /// the old record.
    ///
    /// # Returns
    /// Number of share records removed.
    ///
    /// # Errors
    /// Returns an error when either store fails; records purged before a
    /// blob deletion fails stay purged.
    pub fn purge_expired(&self) -> Result<usize, AppError> {
        let purged = self.metadata.purge_expired()?;
        let mut reclaimed = 0usize;
        for record in &purged {
            if self.metadata.contains(&record.id)? {
                continue;
            }
            if self.blobs.delete(&record.blob_key)? {
                reclaimed += 1;
            }
        }
        if !purged.is_empty() {
            tracing::debug!(
                shares = purged.len(),
                blobs = reclaimed,
                "reclaimed expired shares"
            );
        }
        Ok(purged.len())
    }

    /// Expiry of `record` as (absolute millis, remaining seconds).
    pub fn expiry_of(&self, record: &ShareRecord) -> (i64, u64) {
        (
            record.expires_at(self.retention),
            record.expires_in_secs(self.retention, self.clock.now_millis()),
        )
    }

    fn published(&self, record: ShareRecord, created: bool) -> Published {
        let (expires_at, expires_in) = self.expiry_of(&record);
        Published {
            record,
            expires_at,
            expires_in,
            created,
        }
    }
}

/// Extract a usable id from the metadata query (`id`, falling back to `share`).
pub fn requested_id(id: Option<String>, share: Option<String>) -> Option<String> {
    normalize_optional_nonempty(id).or_else(|| normalize_optional_nonempty(share))
}
