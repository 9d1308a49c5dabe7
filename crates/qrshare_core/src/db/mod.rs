//! Database layer for share metadata.

/// Share metadata storage helpers.
pub mod share;
/// Table definitions.
pub mod tables;

use crate::clock::{Clock, SystemClock};
use crate::constants::REDB_FILE_NAME;
use crate::error::AppError;
use std::path::Path;
use std::sync::Arc;

pub use share::ShareDb;

#[cfg(test)]
mod tests;

/// Database handle with access to the share tables.
pub struct Database {
    pub db: Arc<redb::Database>,
    pub shares: ShareDb,
}

impl Database {
    /// Open the database under `path` (a directory) using the system clock.
    ///
    /// # Returns
    /// A fully initialized [`Database`].
    ///
    /// # Errors
    /// Returns an error if the directory cannot be created or redb cannot open
    /// the database file.
    pub fn new(path: &str) -> Result<Self, AppError> {
        Self::with_clock(path, Arc::new(SystemClock))
    }

    /// Open the database under `path` with an explicit clock for TTL checks.
    ///
    /// # Errors
    /// Returns an error if the directory cannot be created or redb cannot open
    /// the database file.
    pub fn with_clock(path: &str, clock: Arc<dyn Clock>) -> Result<Self, AppError> {
        let dir = Path::new(path);
        std::fs::create_dir_all(dir).map_err(|err| {
            AppError::StorageMessage(format!(
                "Failed to create database directory '{}': {}",
                dir.display(),
                err
            ))
        })?;

        let file = dir.join(REDB_FILE_NAME);
        let db = match redb::Database::create(&file) {
            Ok(db) => Arc::new(db),
            Err(redb::DatabaseError::DatabaseAlreadyOpen) => {
                return Err(AppError::StorageMessage(format!(
                    "Database '{}' is already open in another QR Share process.\n\
                    Stop it first, or set DB_PATH to use a different database location.",
                    file.display()
                )));
            }
            Err(err) => return Err(err.into()),
        };

        Self::from_shared(db, clock)
    }

    /// Build a database handle from an existing shared redb instance.
    ///
    /// # Errors
    /// Returns an error if the share tables cannot be initialized.
    pub fn from_shared(db: Arc<redb::Database>, clock: Arc<dyn Clock>) -> Result<Self, AppError> {
        Ok(Self {
            shares: ShareDb::new(db.clone(), clock)?,
            db,
        })
    }
}
