//! Shared integration-test server bootstrap helpers.

#![allow(dead_code)]

use axum_test::TestServer;
use qrshare_core::store::{MemoryBlobStore, MemoryMetadataStore};
use qrshare_core::ManualClock;
use qrshare_server::{create_app, open_share_service, AppState, Config, ShareService};
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

pub(crate) const ORIGIN: &str = "https://qr.test";
pub(crate) const START_MILLIS: i64 = 1_700_000_000_000;

pub(crate) fn test_config(db_path: &Path) -> Config {
    Config {
        db_path: db_path.to_str().expect("db path").to_string(),
        blob_path: db_path.join("blobs").to_str().expect("blob path").to_string(),
        port: 0,
        max_share_size: 1_000_000,
        public_url: Some(ORIGIN.to_string()),
        bind: None,
        ephemeral: true,
        allow_public_access: false,
    }
}

/// Server over in-memory stores with a hand-driven clock.
pub(crate) struct MemoryHarness {
    pub server: TestServer,
    pub metadata: Arc<MemoryMetadataStore>,
    pub blobs: Arc<MemoryBlobStore>,
    pub clock: Arc<ManualClock>,
}

pub(crate) fn memory_server_with(configure: impl FnOnce(&mut Config)) -> MemoryHarness {
    let mut config = test_config(Path::new("/nonexistent/qrshare"));
    configure(&mut config);

    let clock = Arc::new(ManualClock::new(START_MILLIS));
    let metadata = Arc::new(MemoryMetadataStore::with_clock(clock.clone()));
    let blobs = Arc::new(MemoryBlobStore::new());
    let shares = ShareService::with_clock(metadata.clone(), blobs.clone(), clock.clone())
        .sweeping_on_publish();
    let server = TestServer::new(create_app(AppState::new(config, shares))).expect("server");
    MemoryHarness {
        server,
        metadata,
        blobs,
        clock,
    }
}

pub(crate) fn memory_server() -> MemoryHarness {
    memory_server_with(|_| {})
}

/// Server over redb and the filesystem blob store in a temp directory.
pub(crate) fn disk_server() -> (TestServer, TempDir) {
    let temp_dir = TempDir::new().expect("temp dir");
    let mut config = test_config(&temp_dir.path().join("db"));
    config.ephemeral = false;

    let shares = open_share_service(&config).expect("open stores");
    let server = TestServer::new(create_app(AppState::new(config, shares))).expect("server");
    (server, temp_dir)
}
