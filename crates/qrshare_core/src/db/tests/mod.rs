//! Database integration tests.

use super::*;
use crate::clock::{Clock, ManualClock};
use crate::error::AppError;
use crate::models::share::ShareRecord;
use crate::store::MetadataStore;
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;
use tempfile::TempDir;

const TTL: Duration = Duration::from_secs(60);

fn setup_test_db() -> (Database, Arc<ManualClock>, TempDir) {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("test.db");
    let clock = Arc::new(ManualClock::new(1_000_000));
    let db = Database::with_clock(db_path.to_str().unwrap(), clock.clone()).unwrap();
    (db, clock, temp_dir)
}

fn sample_record(id: &str, text: &str) -> ShareRecord {
    ShareRecord {
        id: id.to_string(),
        text: text.to_string(),
        created_at: 1_000_000,
        blob_key: format!("qrcode/{}.png", id),
        data_url: "data:image/png;base64,AAAA".to_string(),
        svg_string: "<svg/>".to_string(),
    }
}
