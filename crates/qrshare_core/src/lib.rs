//! Core domain library for QR Share (config, identity, storage, share service).

/// Injectable wall clock used for TTL and expiry arithmetic.
pub mod clock;
/// Configuration loading and defaults.
pub mod config;
/// Shared constants used across QR Share crates.
pub mod constants;
/// redb-backed metadata storage.
pub mod db;
/// Application error types (storage/domain).
pub mod error;
/// Content-derived share identifiers.
pub mod identity;
/// Data models for API requests, responses, and persistence.
pub mod models;
/// Publish and retrieval orchestration over the two stores.
pub mod share;
/// Store traits plus filesystem and in-memory adapters.
pub mod store;
/// Shared text normalization helpers.
pub mod text;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::Config;
pub use constants::*;
pub use db::Database;
pub use error::AppError;
pub use identity::{identify, ShareId};
pub use share::{Published, ShareService};
pub use store::{BlobMeta, BlobObject, BlobStore, MetadataStore};
