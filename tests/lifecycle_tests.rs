use std::sync::Arc;

use bytes::Bytes;
use chrono::Utc;
use futures::StreamExt;

use file_store::gateway::{BlobGateway, GatewayError};
use file_store::object_store::{stream_from_bytes, ByteStream, LocalStore};
use file_store::storage::models::{FileRecord, SCHEMA_VERSION};
use file_store::storage::{Database, MetadataStore};

async fn collect(mut stream: ByteStream) -> Bytes {
    let mut buf = Vec::new();
    while let Some(chunk) = stream.next().await {
        buf.extend_from_slice(&chunk.unwrap());
    }
    Bytes::from(buf)
}

fn setup(dir: &tempfile::TempDir) -> (Database, Arc<BlobGateway>) {
    let db = Database::open(dir.path().join("data")).unwrap();
    let local = LocalStore::new(dir.path().join("files")).unwrap();
    (db, Arc::new(BlobGateway::new(Arc::new(local), None)))
}

/// The full object lifecycle the service is built around: store bytes, index
/// them, read them back by id, tear both down.
#[tokio::test]
async fn test_upload_download_delete_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let (db, gateway) = setup(&dir);

    let payload = Bytes::from("ten bytes!");
    assert_eq!(payload.len(), 10);

    // Upload as the handler does: blob first, record immediately after.
    let id = uuid::Uuid::new_v4().to_string();
    let original_name = "report.txt";
    let stored_name = FileRecord::stored_name_for(&id, original_name);
    let now = Utc::now();

    let location = gateway
        .upload(
            &stored_name,
            stream_from_bytes(payload.clone()),
            Some(payload.len() as u64),
        )
        .await
        .unwrap();

    let record = FileRecord {
        id: id.clone(),
        original_name: original_name.to_string(),
        stored_name,
        mime_type: "text/plain".to_string(),
        size_bytes: payload.len() as u64,
        checksum: None,
        location: location.encode(),
        owner_id: "alice".to_string(),
        uploaded_at: now,
        last_accessed_at: now,
        expires_at: None,
        description: None,
        tags: None,
        is_public: false,
        content_encoding: None,
        content_language: None,
        schema_version: SCHEMA_VERSION.to_string(),
    };
    db.insert_record(&record).unwrap();

    // The indexed record carries everything needed to serve the object
    let found = db.find_by_id(&id).unwrap().expect("record should exist");
    assert_eq!(found.original_name, "report.txt");
    assert_eq!(found.owner_id, "alice");
    assert!(!found.is_public);
    assert!(!found.location.is_empty());

    // Download by id resolves metadata, then streams the original bytes
    let data = collect(gateway.download(&found.location).await.unwrap()).await;
    assert_eq!(data, payload);

    // Delete by id: blob first, then the record
    gateway.delete(&found.location).await.unwrap();
    assert!(db.delete_record(&id).unwrap());

    assert!(db.find_by_id(&id).unwrap().is_none());
    let result = gateway.download(&found.location).await;
    assert!(matches!(result, Err(GatewayError::NotFound(_))));
}
