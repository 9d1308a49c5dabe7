//! In-memory store adapters.
//!
//! Used for `EPHEMERAL=1` runs and by tests, which read the invocation
//! counters to observe how many store round-trips a request performed.

use super::{BlobMeta, BlobObject, BlobStore, MetadataStore};
use crate::{
    clock::{duration_millis, Clock, SystemClock},
    error::AppError,
    models::share::ShareRecord,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;

fn poisoned() -> AppError {
    AppError::StorageMessage("In-memory store lock poisoned".to_string())
}

struct MemoryRow {
    record: ShareRecord,
    expires_at_ms: i64,
}

/// Metadata store over a `HashMap`.
///
/// Reads evict the expired row they touch; [`MetadataStore::purge_expired`]
/// sweeps the rest.
pub struct MemoryMetadataStore {
    rows: RwLock<HashMap<String, MemoryRow>>,
    clock: Arc<dyn Clock>,
    get_calls: AtomicUsize,
    put_calls: AtomicUsize,
}

impl Default for MemoryMetadataStore {
    fn default() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }
}

impl MemoryMetadataStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store whose TTL checks read `clock`.
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            rows: RwLock::new(HashMap::new()),
            clock,
            get_calls: AtomicUsize::new(0),
            put_calls: AtomicUsize::new(0),
        }
    }

    /// Number of `get`/`contains` lookups served so far.
    pub fn get_calls(&self) -> usize {
        self.get_calls.load(Ordering::SeqCst)
    }

    /// Number of records actually written so far.
    pub fn put_calls(&self) -> usize {
        self.put_calls.load(Ordering::SeqCst)
    }

    /// Rows held in memory, including expired rows not yet evicted.
    pub fn physical_len(&self) -> usize {
        self.rows.read().map(|rows| rows.len()).unwrap_or(0)
    }

    fn expiry_for(&self, ttl: Duration) -> i64 {
        self.clock.now_millis().saturating_add(duration_millis(ttl))
    }
}

impl MetadataStore for MemoryMetadataStore {
    fn get(&self, id: &str) -> Result<Option<ShareRecord>, AppError> {
        self.get_calls.fetch_add(1, Ordering::SeqCst);
        let now = self.clock.now_millis();
        let mut rows = self.rows.write().map_err(|_| poisoned())?;
        let Some(row) = rows.get(id) else {
            return Ok(None);
        };
        if now <= row.expires_at_ms {
            return Ok(Some(row.record.clone()));
        }
        rows.remove(id);
        Ok(None)
    }

    fn put_with_ttl(&self, record: &ShareRecord, ttl: Duration) -> Result<(), AppError> {
        let expires_at_ms = self.expiry_for(ttl);
        let mut rows = self.rows.write().map_err(|_| poisoned())?;
        rows.insert(
            record.id.clone(),
            MemoryRow {
                record: record.clone(),
                expires_at_ms,
            },
        );
        self.put_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn put_if_absent(&self, record: &ShareRecord, ttl: Duration) -> Result<bool, AppError> {
        let now = self.clock.now_millis();
        let expires_at_ms = self.expiry_for(ttl);
        let mut rows = self.rows.write().map_err(|_| poisoned())?;
        if rows.get(&record.id).is_some_and(|row| now <= row.expires_at_ms) {
            return Ok(false);
        }
        rows.insert(
            record.id.clone(),
            MemoryRow {
                record: record.clone(),
                expires_at_ms,
            },
        );
        self.put_calls.fetch_add(1, Ordering::SeqCst);
        Ok(true)
    }

    fn purge_expired(&self) -> Result<Vec<ShareRecord>, AppError> {
        let now = self.clock.now_millis();
        let mut rows = self.rows.write().map_err(|_| poisoned())?;
        let expired: Vec<String> = rows
            .iter()
            .filter(|(_, row)| now > row.expires_at_ms)
            .map(|(id, _)| id.clone())
            .collect();
        Ok(expired
            .iter()
            .filter_map(|id| rows.remove(id))
            .map(|row| row.record)
            .collect())
    }
}

/// Blob store over a `HashMap`.
#[derive(Default)]
pub struct MemoryBlobStore {
    objects: RwLock<HashMap<String, BlobObject>>,
    get_calls: AtomicUsize,
    put_calls: AtomicUsize,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `get`/`head` calls served so far.
    pub fn get_calls(&self) -> usize {
        self.get_calls.load(Ordering::SeqCst)
    }

    /// Number of `put` calls served so far.
    pub fn put_calls(&self) -> usize {
        self.put_calls.load(Ordering::SeqCst)
    }

    /// Number of objects held.
    pub fn len(&self) -> usize {
        self.objects.read().map(|objects| objects.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl BlobStore for MemoryBlobStore {
    fn put(&self, key: &str, bytes: &[u8], content_type: &str) -> Result<BlobMeta, AppError> {
        if key.is_empty() {
            return Err(AppError::BadRequest("Blob key must not be empty".to_string()));
        }
        let meta = BlobMeta::describe(bytes, content_type);
        let mut objects = self.objects.write().map_err(|_| poisoned())?;
        objects.insert(
            key.to_string(),
            BlobObject {
                meta: meta.clone(),
                bytes: bytes.to_vec(),
            },
        );
        self.put_calls.fetch_add(1, Ordering::SeqCst);
        Ok(meta)
    }

    fn get(&self, key: &str) -> Result<Option<BlobObject>, AppError> {
        self.get_calls.fetch_add(1, Ordering::SeqCst);
        let objects = self.objects.read().map_err(|_| poisoned())?;
        Ok(objects.get(key).cloned())
    }

    fn head(&self, key: &str) -> Result<Option<BlobMeta>, AppError> {
        self.get_calls.fetch_add(1, Ordering::SeqCst);
        let objects = self.objects.read().map_err(|_| poisoned())?;
        Ok(objects.get(key).map(|object| object.meta.clone()))
    }

    fn delete(&self, key: &str) -> Result<bool, AppError> {
        let mut objects = self.objects.write().map_err(|_| poisoned())?;
        Ok(objects.remove(key).is_some())
    }
}
