//! Share metadata storage backed by redb.
//!
//! Rows carry an absolute expiry. Reads hide rows past it, and
//! [`MetadataStore::purge_expired`] removes them physically using the expiry
//! index.

use crate::{
    clock::{duration_millis, Clock},
    db::tables::*,
    error::AppError,
    models::share::ShareRecord,
    store::MetadataStore,
};
use redb::{ReadableDatabase, ReadableTable};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Serialize, Deserialize)]
struct StoredShare {
    record: ShareRecord,
    expires_at_ms: i64,
}

impl StoredShare {
    fn is_expired_at(&self, now_millis: i64) -> bool {
        now_millis > self.expires_at_ms
    }
}

fn decode_row(bytes: &[u8]) -> Result<StoredShare, AppError> {
    Ok(bincode::deserialize(bytes)?)
}

// Pre-epoch values are clamped; they only arise from a broken clock.
fn expiry_key(expires_at_ms: i64) -> u64 {
    expires_at_ms.max(0) as u64
}

/// Accessor for the share tables; implements [`MetadataStore`].
#[derive(Clone)]
pub struct ShareDb {
    db: Arc<redb::Database>,
    clock: Arc<dyn Clock>,
}

impl ShareDb {
    /// Initialize share tables if they do not exist yet.
    ///
    /// # Errors
    /// Returns an error when redb transaction/table initialization fails.
    pub fn new(db: Arc<redb::Database>, clock: Arc<dyn Clock>) -> Result<Self, AppError> {
        let write_txn = db.begin_write()?;
        write_txn.open_table(SHARES)?;
        write_txn.open_table(SHARES_BY_EXPIRY)?;
        write_txn.commit()?;
        Ok(Self { db, clock })
    }

    fn encode(&self, record: &ShareRecord, ttl: Duration) -> Result<(i64, Vec<u8>), AppError> {
        let expires_at_ms = self.clock.now_millis().saturating_add(duration_millis(ttl));
        let row = StoredShare {
            record: record.clone(),
            expires_at_ms,
        };
        Ok((expires_at_ms, bincode::serialize(&row)?))
    }

    fn write(
        &self,
        record: &ShareRecord,
        ttl: Duration,
        only_if_absent: bool,
    ) -> Result<bool, AppError> {
        let now = self.clock.now_millis();
        let (expires_at_ms, encoded) = self.encode(record, ttl)?;
        let id = record.id.as_str();

        let write_txn = self.db.begin_write()?;
        {
            let mut shares = write_txn.open_table(SHARES)?;
            let mut by_expiry = write_txn.open_table(SHARES_BY_EXPIRY)?;

            let existing = shares
                .get(id)?
                .map(|guard| decode_row(guard.value()))
                .transpose()?;
            if let Some(existing) = existing {
                if only_if_absent && !existing.is_expired_at(now) {
                    return Ok(false);
                }
                by_expiry.remove((expiry_key(existing.expires_at_ms), id))?;
            }

            shares.insert(id, encoded.as_slice())?;
            by_expiry.insert((expiry_key(expires_at_ms), id), ())?;
        }
        write_txn.commit()?;
        Ok(true)
    }

    /// Rows on disk, including expired rows not yet purged.
    ///
    /// # Errors
    /// Returns an error when storage access fails.
    pub fn physical_len(&self) -> Result<usize, AppError> {
        let read_txn = self.db.begin_read()?;
        let shares = read_txn.open_table(SHARES)?;
        let mut count = 0;
        for entry in shares.iter()? {
            entry?;
            count += 1;
        }
        Ok(count)
    }
}

impl MetadataStore for ShareDb {
    fn get(&self, id: &str) -> Result<Option<ShareRecord>, AppError> {
        let read_txn = self.db.begin_read()?;
        let shares = read_txn.open_table(SHARES)?;
        let Some(value) = shares.get(id)? else {
            return Ok(None);
        };
        let row = decode_row(value.value())?;
        if row.is_expired_at(self.clock.now_millis()) {
            return Ok(None);
        }
        Ok(Some(row.record))
    }

    fn put_with_ttl(&self, record: &ShareRecord, ttl: Duration) -> Result<(), AppError> {
        self.write(record, ttl, false).map(|_| ())
    }

    fn put_if_absent(&self, record: &ShareRecord, ttl: Duration) -> Result<bool, AppError> {
        self.write(record, ttl, true)
    }

    fn purge_expired(&self) -> Result<Vec<ShareRecord>, AppError> {
        let cutoff = expiry_key(self.clock.now_millis());
        let write_txn = self.db.begin_write()?;
        let purged = {
            let mut shares = write_txn.open_table(SHARES)?;
            let mut by_expiry = write_txn.open_table(SHARES_BY_EXPIRY)?;

            let mut expired = Vec::new();
            for entry in by_expiry.range(..(cutoff, ""))? {
                let (key, _) = entry?;
                let (expires_at, id) = key.value();
                expired.push((expires_at, id.to_string()));
            }

            let mut purged = Vec::with_capacity(expired.len());
            for (expires_at, id) in &expired {
                by_expiry.remove((*expires_at, id.as_str()))?;
                if let Some(value) = shares.remove(id.as_str())? {
                    purged.push(decode_row(value.value())?.record);
                }
            }
            purged
        };
        write_txn.commit()?;

        if !purged.is_empty() {
            tracing::info!(purged = purged.len(), "purged expired shares");
        }
        Ok(purged)
    }
}
