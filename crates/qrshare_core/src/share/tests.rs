use super::*;
use crate::clock::ManualClock;
use crate::constants::SHARE_TTL_SECONDS;
use crate::store::{MemoryBlobStore, MemoryMetadataStore};
use std::sync::atomic::{AtomicUsize, Ordering};

const START: i64 = 1_700_000_000_000;

struct Harness {
    service: ShareService,
    metadata: Arc<MemoryMetadataStore>,
    blobs: Arc<MemoryBlobStore>,
    clock: Arc<ManualClock>,
}

fn harness() -> Harness {
    harness_with(|service| service)
}

fn harness_with(configure: impl FnOnce(ShareService) -> ShareService) -> Harness {
    let clock = Arc::new(ManualClock::new(START));
    let metadata = Arc::new(MemoryMetadataStore::with_clock(clock.clone()));
    let blobs = Arc::new(MemoryBlobStore::new());
    let service = configure(ShareService::with_clock(
        metadata.clone(),
        blobs.clone(),
        clock.clone(),
    ));
    Harness {
        service,
        metadata,
        blobs,
        clock,
    }
}

fn request(text: Option<&str>, data_url: &str) -> PublishRequest {
    PublishRequest {
        text: text.map(str::to_string),
        data_url: Some(data_url.to_string()),
        svg_string: Some("<svg/>".to_string()),
    }
}

/// Blob store whose writes always fail.
struct BrokenBlobs;

impl BlobStore for BrokenBlobs {
    fn put(&self, _key: &str, _bytes: &[u8], _content_type: &str) -> Result<BlobMeta, AppError> {
        Err(AppError::StorageMessage("disk full".to_string()))
    }

    fn get(&self, _key: &str) -> Result<Option<BlobObject>, AppError> {
        Ok(None)
    }

    fn delete(&self, _key: &str) -> Result<bool, AppError> {
        Ok(false)
    }
}

/// Metadata store that always loses the conditional write to another
/// publisher. The first `get` sees nothing; later ones see `winner`, if any.
struct LosingRace {
    winner: Option<ShareRecord>,
    gets: AtomicUsize,
}

impl LosingRace {
    fn new(winner: Option<ShareRecord>) -> Self {
        Self {
            winner,
            gets: AtomicUsize::new(0),
        }
    }
}

impl MetadataStore for LosingRace {
    fn get(&self, _id: &str) -> Result<Option<ShareRecord>, AppError> {
        if self.gets.fetch_add(1, Ordering::SeqCst) == 0 {
            return Ok(None);
        }
        Ok(self.winner.clone())
    }

    fn put_with_ttl(&self, _record: &ShareRecord, _ttl: Duration) -> Result<(), AppError> {
        Ok(())
    }

    fn put_if_absent(&self, _record: &ShareRecord, _ttl: Duration) -> Result<bool, AppError> {
        Ok(false)
    }
}

fn racing_service(metadata: Arc<LosingRace>) -> ShareService {
    ShareService::with_clock(
        metadata,
        Arc::new(MemoryBlobStore::new()),
        Arc::new(ManualClock::new(START)),
    )
}

#[test]
fn publish_writes_blob_then_metadata() {
    let h = harness();
    let published = h
        .service
        .publish(request(Some("hello"), "data:image/png;base64,AAAA"))
        .expect("publish");

    assert!(published.created);
    assert_eq!(published.record.id, identify("hello", b"").as_str());
    assert_eq!(published.record.text, "hello");
    assert_eq!(published.record.created_at, START);
    assert_eq!(
        published.record.blob_key,
        format!("qrcode/{}.png", published.record.id)
    );
    assert_eq!(published.expires_in, SHARE_TTL_SECONDS);
    assert_eq!(published.expires_at - published.record.created_at, 604_800_000);
    assert_eq!(h.blobs.put_calls(), 1);
    assert_eq!(h.metadata.put_calls(), 1);

    let object = h.service.fetch_blob(&published.record).expect("blob");
    assert_eq!(object.bytes, vec![0, 0, 0]);
    assert_eq!(object.meta.content_type, "image/png");
}

#[test]
fn republishing_same_content_writes_nothing() {
    let h = harness();
    let first = h
        .service
        .publish(request(Some("hello"), "data:image/png;base64,AAAA"))
        .expect("first");

    h.clock.advance(Duration::from_secs(3600));
    let second = h
        .service
        .publish(request(Some("  hello \n"), "data:image/png;base64,AAAA"))
        .expect("second");

    assert!(!second.created);
    assert_eq!(second.record, first.record);
    assert_eq!(second.expires_at, first.expires_at);
    assert_eq!(second.expires_in, SHARE_TTL_SECONDS - 3600);
    assert_eq!(h.blobs.put_calls(), 1);
    assert_eq!(h.metadata.put_calls(), 1);
}

#[test]
fn empty_text_falls_back_to_data_url_identity() {
    let h = harness();
    let data_url = "data:image/png;base64,AAAA";
    let published = h
        .service
        .publish(request(Some("   "), data_url))
        .expect("publish");

    assert_eq!(published.record.id, identify("", data_url.as_bytes()).as_str());
    assert_eq!(published.record.text, "");

    let missing_text = h.service.publish(request(None, data_url)).expect("publish");
    assert!(!missing_text.created);
    assert_eq!(missing_text.record.id, published.record.id);
}

#[test]
fn missing_encodings_are_rejected_without_store_calls() {
    let h = harness();
    let cases = [
        PublishRequest {
            text: Some("x".to_string()),
            data_url: None,
            svg_string: Some("<svg/>".to_string()),
        },
        PublishRequest {
            text: Some("x".to_string()),
            data_url: Some("data:image/png;base64,AAAA".to_string()),
            svg_string: None,
        },
        PublishRequest {
            text: Some("x".to_string()),
            data_url: Some(String::new()),
            svg_string: Some("<svg/>".to_string()),
        },
        PublishRequest::default(),
    ];

    for case in cases {
        let err = h.service.publish(case).expect_err("must reject");
        assert!(
            matches!(err, AppError::BadRequest(ref message) if message == "Missing data"),
            "unexpected: {}",
            err
        );
    }
    assert_eq!(h.metadata.get_calls(), 0);
    assert_eq!(h.blobs.put_calls(), 0);
}

#[test]
fn undecodable_raster_writes_nothing() {
    let h = harness();
    let err = h
        .service
        .publish(request(Some("bad"), "data:image/png;base64,@@@"))
        .expect_err("decode must fail");
    assert!(matches!(err, AppError::Decode(_)), "unexpected: {}", err);
    assert_eq!(h.blobs.put_calls(), 0);
    assert_eq!(h.metadata.put_calls(), 0);
}

#[test]
fn failed_blob_write_skips_metadata() {
    let clock = Arc::new(ManualClock::new(START));
    let metadata = Arc::new(MemoryMetadataStore::with_clock(clock.clone()));
    let service = ShareService::with_clock(metadata.clone(), Arc::new(BrokenBlobs), clock);

    let err = service
        .publish(request(Some("hello"), "data:image/png;base64,AAAA"))
        .expect_err("blob failure must surface");
    assert!(matches!(err, AppError::StorageMessage(_)), "unexpected: {}", err);
    assert_eq!(metadata.put_calls(), 0);
    assert_eq!(metadata.physical_len(), 0);
}

#[test]
fn lost_publish_race_returns_the_winner() {
    let id = identify("race", b"");
    let winner = ShareRecord {
        id: id.as_str().to_string(),
        text: "race".to_string(),
        created_at: START - 5_000,
        blob_key: id.blob_key(),
        data_url: "data:image/png;base64,AAAA".to_string(),
        svg_string: "<svg/>".to_string(),
    };
    let metadata = Arc::new(LosingRace::new(Some(winner.clone())));
    let service = racing_service(metadata.clone());

    let published = service
        .publish(request(Some("race"), "data:image/png;base64,AAAA"))
        .expect("publish");

    assert!(!published.created);
    assert_eq!(published.record, winner);
    assert_eq!(
        published.expires_at,
        START - 5_000 + SHARE_RETENTION.as_millis() as i64
    );
    assert_eq!(metadata.gets.load(Ordering::SeqCst), 2);
}

#[test]
fn vanished_race_winner_is_a_storage_error() {
    let service = racing_service(Arc::new(LosingRace::new(None)));

    let err = service
        .publish(request(Some("race"), "data:image/png;base64,AAAA"))
        .expect_err("missing winner must surface");
    assert!(
        matches!(err, AppError::StorageMessage(ref message) if message.contains("vanished")),
        "unexpected: {}",
        err
    );
}

#[test]
fn lookup_returns_live_record() {
    let h = harness();
    let published = h
        .service
        .publish(request(Some("hello"), "data:image/png;base64,AAAA"))
        .expect("publish");

    let record = h.service.lookup(&published.record.id).expect("lookup");
    assert_eq!(record, published.record);
}

#[test]
fn lookup_hides_malformed_and_unknown_ids() {
    let h = harness();
    for raw in ["", "nope", "../etc/passwd", "ABCDEF0123456789ABCDEF0123456789"] {
        assert!(matches!(h.service.lookup(raw), Err(AppError::NotFound)), "{raw}");
    }
    let unknown = identify("never published", b"");
    assert!(matches!(
        h.service.lookup(unknown.as_str()),
        Err(AppError::NotFound)
    ));
    // Malformed ids never reach the store.
    assert_eq!(h.metadata.get_calls(), 1);
}

#[test]
fn shares_disappear_after_retention() {
    let h = harness();
    let published = h
        .service
        .publish(request(Some("short lived"), "data:image/png;base64,AAAA"))
        .expect("publish");

    h.clock.advance(SHARE_RETENTION);
    assert!(h.service.lookup(&published.record.id).is_ok());

    h.clock.advance(Duration::from_millis(1));
    assert!(matches!(
        h.service.lookup(&published.record.id),
        Err(AppError::NotFound)
    ));

    let again = h
        .service
        .publish(request(Some("short lived"), "data:image/png;base64,AAAA"))
        .expect("republish");
    assert!(again.created);
    assert_eq!(again.record.created_at, START + 604_800_001);
    assert_eq!(h.blobs.put_calls(), 2);
}

#[test]
fn sweeping_publish_reclaims_expired_shares() {
    let h = harness_with(ShareService::sweeping_on_publish);
    for n in 0..50 {
        h.service
            .publish(request(Some(&format!("share {}", n)), "data:image/png;base64,AAAA"))
            .expect("publish");
    }
    assert_eq!(h.metadata.physical_len(), 50);
    assert_eq!(h.blobs.len(), 50);

    h.clock.advance(SHARE_RETENTION * 2);
    let survivor = h
        .service
        .publish(request(Some("survivor"), "data:image/png;base64,AAAA"))
        .expect("publish");

    assert_eq!(h.metadata.physical_len(), 1);
    assert_eq!(h.blobs.len(), 1);
    assert!(h.service.fetch_blob(&survivor.record).is_ok());
}

#[test]
fn dedup_hits_do_not_sweep() {
    let h = harness_with(ShareService::sweeping_on_publish);
    h.service
        .publish(request(Some("old"), "data:image/png;base64,AAAA"))
        .expect("old");
    h.clock.advance(SHARE_RETENTION / 2);
    h.service
        .publish(request(Some("young"), "data:image/png;base64,AAAA"))
        .expect("young");

    h.clock.advance(SHARE_RETENTION / 2 + Duration::from_secs(1));
    let again = h
        .service
        .publish(request(Some("young"), "data:image/png;base64,AAAA"))
        .expect("dedup");
    assert!(!again.created);
    assert_eq!(h.metadata.physical_len(), 2);
    assert_eq!(h.blobs.len(), 2);
}

#[test]
fn purge_is_explicit_without_sweeping() {
    let h = harness();
    let expired = h
        .service
        .publish(request(Some("expired"), "data:image/png;base64,AAAA"))
        .expect("expired");
    h.clock.advance(SHARE_RETENTION + Duration::from_secs(1));
    h.service
        .publish(request(Some("fresh"), "data:image/png;base64,AAAA"))
        .expect("fresh");
    assert_eq!(h.metadata.physical_len(), 2);
    assert_eq!(h.blobs.len(), 2);

    assert_eq!(h.service.purge_expired().expect("purge"), 1);
    assert_eq!(h.metadata.physical_len(), 1);
    assert_eq!(h.blobs.len(), 1);
    assert!(matches!(
        h.service.fetch_blob(&expired.record),
        Err(AppError::NotFound)
    ));
    assert_eq!(h.service.purge_expired().expect("purge again"), 0);
}

#[test]
fn incomplete_records_are_not_found() {
    let h = harness();
    let id = identify("partial", b"");
    let record = ShareRecord {
        id: id.as_str().to_string(),
        text: "partial".to_string(),
        created_at: START,
        blob_key: id.blob_key(),
        data_url: "data:image/png;base64,AAAA".to_string(),
        svg_string: String::new(),
    };
    h.metadata.put_with_ttl(&record, SHARE_RETENTION).expect("seed");

    assert!(matches!(h.service.lookup(id.as_str()), Err(AppError::NotFound)));
}

#[test]
fn missing_blob_is_not_found() {
    let h = harness();
    let published = h
        .service
        .publish(request(Some("evicted"), "data:image/png;base64,AAAA"))
        .expect("publish");
    assert!(h.blobs.delete(&published.record.blob_key).expect("delete"));

    assert!(matches!(
        h.service.blob_meta(&published.record),
        Err(AppError::NotFound)
    ));
    assert!(matches!(
        h.service.fetch_blob(&published.record),
        Err(AppError::NotFound)
    ));
}

#[test]
fn requested_id_prefers_id_over_share_alias() {
    assert_eq!(
        requested_id(Some(" abc ".to_string()), Some("def".to_string())),
        Some("abc".to_string())
    );
    assert_eq!(
        requested_id(Some("  ".to_string()), Some("def".to_string())),
        Some("def".to_string())
    );
    assert_eq!(requested_id(None, None), None);
}
