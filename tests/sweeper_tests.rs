use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Duration as ChronoDuration, Utc};

use file_store::gateway::{BlobGateway, ObjectBackend};
use file_store::object_store::{
    stream_from_bytes, ByteStream, LocalStore, ObjectStore, ObjectStoreError,
};
use file_store::storage::models::{FileRecord, SCHEMA_VERSION};
use file_store::storage::{Database, MetadataStore};
use file_store::sweeper::ExpirationSweeper;

/// Backend whose every operation fails, standing in for an unreachable
/// object store.
struct DownStore;

#[async_trait]
impl ObjectStore for DownStore {
    async fn put(&self, _: &str, _: ByteStream, _: u64) -> Result<(), ObjectStoreError> {
        Err(ObjectStoreError::Backend("backend down".to_string()))
    }

    async fn get(&self, _: &str) -> Result<ByteStream, ObjectStoreError> {
        Err(ObjectStoreError::Backend("backend down".to_string()))
    }

    async fn delete(&self, _: &str) -> Result<(), ObjectStoreError> {
        Err(ObjectStoreError::Backend("backend down".to_string()))
    }

    async fn exists(&self, _: &str) -> Result<bool, ObjectStoreError> {
        Err(ObjectStoreError::Backend("backend down".to_string()))
    }
}

fn setup(dir: &tempfile::TempDir) -> (Database, Arc<BlobGateway>) {
    let db = Database::open(dir.path().join("data")).unwrap();
    let local = LocalStore::new(dir.path().join("files")).unwrap();
    let gateway = Arc::new(BlobGateway::new(Arc::new(local), None));
    (db, gateway)
}

fn record_at(id: &str, location: &str, expires_at: Option<DateTime<Utc>>) -> FileRecord {
    let now = Utc::now();
    FileRecord {
        id: id.to_string(),
        original_name: format!("{id}.bin"),
        stored_name: FileRecord::stored_name_for(id, &format!("{id}.bin")),
        mime_type: "application/octet-stream".to_string(),
        size_bytes: 4,
        checksum: None,
        location: location.to_string(),
        owner_id: "alice".to_string(),
        uploaded_at: now - ChronoDuration::days(1),
        last_accessed_at: now - ChronoDuration::days(1),
        expires_at,
        description: None,
        tags: None,
        is_public: false,
        content_encoding: None,
        content_language: None,
        schema_version: SCHEMA_VERSION.to_string(),
    }
}

async fn upload_blob(gateway: &BlobGateway, key: &str) -> String {
    gateway
        .upload(key, stream_from_bytes(Bytes::from("data")), Some(4))
        .await
        .unwrap()
        .encode()
}

#[tokio::test]
async fn test_sweep_removes_expired_record_and_blob() {
    let dir = tempfile::tempdir().unwrap();
    let (db, gateway) = setup(&dir);

    let location = upload_blob(&gateway, "expired-key").await;
    let expired = record_at("exp-1", &location, Some(Utc::now() - ChronoDuration::hours(1)));
    db.insert_record(&expired).unwrap();

    let sweeper = ExpirationSweeper::new(db.clone(), Arc::clone(&gateway), Duration::from_secs(60));
    let stats = sweeper.sweep_once().await.unwrap();

    assert_eq!(stats.swept, 1);
    assert_eq!(stats.failed, 0);
    assert!(db.find_by_id("exp-1").unwrap().is_none());
    assert!(!gateway.exists(&location).await);
}

#[tokio::test]
async fn test_sweep_keeps_live_records() {
    let dir = tempfile::tempdir().unwrap();
    let (db, gateway) = setup(&dir);

    let future_loc = upload_blob(&gateway, "future-key").await;
    db.insert_record(&record_at(
        "future",
        &future_loc,
        Some(Utc::now() + ChronoDuration::hours(1)),
    ))
    .unwrap();

    let forever_loc = upload_blob(&gateway, "forever-key").await;
    db.insert_record(&record_at("forever", &forever_loc, None))
        .unwrap();

    let sweeper = ExpirationSweeper::new(db.clone(), Arc::clone(&gateway), Duration::from_secs(60));
    let stats = sweeper.sweep_once().await.unwrap();

    assert_eq!(stats.swept, 0);
    assert_eq!(stats.failed, 0);
    assert!(db.find_by_id("future").unwrap().is_some());
    assert!(db.find_by_id("forever").unwrap().is_some());
    assert!(gateway.exists(&future_loc).await);
    assert!(gateway.exists(&forever_loc).await);
}

#[tokio::test]
async fn test_sweep_heals_record_whose_blob_is_already_gone() {
    let dir = tempfile::tempdir().unwrap();
    let (db, gateway) = setup(&dir);

    // Orphaned metadata: the location points at nothing. The idempotent
    // backend delete lets the sweep reclaim the row anyway.
    let orphan = record_at(
        "orphan",
        "local://never-written",
        Some(Utc::now() - ChronoDuration::hours(2)),
    );
    db.insert_record(&orphan).unwrap();

    let sweeper = ExpirationSweeper::new(db.clone(), Arc::clone(&gateway), Duration::from_secs(60));
    let stats = sweeper.sweep_once().await.unwrap();

    assert_eq!(stats.swept, 1);
    assert!(db.find_by_id("orphan").unwrap().is_none());
}

#[tokio::test]
async fn test_one_failing_delete_does_not_abort_the_batch() {
    let dir = tempfile::tempdir().unwrap();
    let db = Database::open(dir.path().join("data")).unwrap();
    let local = LocalStore::new(dir.path().join("files")).unwrap();
    let gateway = Arc::new(BlobGateway::new(
        Arc::new(local),
        Some(ObjectBackend {
            bucket: "dead-bucket".to_string(),
            store: Arc::new(DownStore),
        }),
    ));

    let past = Some(Utc::now() - ChronoDuration::hours(1));

    // This one's blob delete will fail against the dead backend
    db.insert_record(&record_at("stuck", "object://dead-bucket/stuck-key", past))
        .unwrap();

    // This one lives on the healthy local backend; its blob goes through the
    // same gateway but never touches the dead store
    let local_gateway = BlobGateway::new(
        Arc::new(LocalStore::new(dir.path().join("files")).unwrap()),
        None,
    );
    let good_loc = upload_blob(&local_gateway, "good-key").await;
    db.insert_record(&record_at("good", &good_loc, past)).unwrap();

    let sweeper = ExpirationSweeper::new(db.clone(), Arc::clone(&gateway), Duration::from_secs(60));
    let stats = sweeper.sweep_once().await.unwrap();

    assert_eq!(stats.swept, 1);
    assert_eq!(stats.failed, 1);

    // The failed record is retained for retry next cycle
    assert!(db.find_by_id("stuck").unwrap().is_some());
    assert!(db.find_by_id("good").unwrap().is_none());
}

#[tokio::test]
async fn test_malformed_location_counts_as_failure() {
    let dir = tempfile::tempdir().unwrap();
    let (db, gateway) = setup(&dir);

    db.insert_record(&record_at(
        "bad-loc",
        "not-a-location",
        Some(Utc::now() - ChronoDuration::hours(1)),
    ))
    .unwrap();

    let sweeper = ExpirationSweeper::new(db.clone(), Arc::clone(&gateway), Duration::from_secs(60));
    let stats = sweeper.sweep_once().await.unwrap();

    assert_eq!(stats.swept, 0);
    assert_eq!(stats.failed, 1);
    assert!(db.find_by_id("bad-loc").unwrap().is_some());
}
