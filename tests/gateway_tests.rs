use std::sync::Arc;

use bytes::Bytes;
use futures::StreamExt;

use file_store::gateway::{BlobGateway, GatewayError, ObjectBackend};
use file_store::location::StorageLocation;
use file_store::object_store::{stream_from_bytes, ByteStream, LocalStore};

async fn collect(mut stream: ByteStream) -> Bytes {
    let mut buf = Vec::new();
    while let Some(chunk) = stream.next().await {
        buf.extend_from_slice(&chunk.unwrap());
    }
    Bytes::from(buf)
}

fn local_only(dir: &tempfile::TempDir) -> BlobGateway {
    let local = LocalStore::new(dir.path().join("local")).unwrap();
    BlobGateway::new(Arc::new(local), None)
}

/// Gateway with an "object store" that is really a second local directory;
/// the gateway only sees the trait, so this stands in for the remote backend.
fn with_object_backend(dir: &tempfile::TempDir, bucket: &str) -> BlobGateway {
    let local = LocalStore::new(dir.path().join("local")).unwrap();
    let object = LocalStore::new(dir.path().join("object")).unwrap();
    BlobGateway::new(
        Arc::new(local),
        Some(ObjectBackend {
            bucket: bucket.to_string(),
            store: Arc::new(object),
        }),
    )
}

#[tokio::test]
async fn test_upload_falls_back_to_local() {
    let dir = tempfile::tempdir().unwrap();
    let gateway = local_only(&dir);

    let location = gateway
        .upload("key-1", stream_from_bytes(Bytes::from("ten bytes!")), Some(10))
        .await
        .unwrap();

    assert_eq!(location, StorageLocation::local("key-1"));

    let data = collect(gateway.download(&location.encode()).await.unwrap()).await;
    assert_eq!(data, Bytes::from("ten bytes!"));
}

#[tokio::test]
async fn test_upload_prefers_object_backend() {
    let dir = tempfile::tempdir().unwrap();
    let gateway = with_object_backend(&dir, "test-bucket");

    let location = gateway
        .upload("key-2", stream_from_bytes(Bytes::from("payload")), Some(7))
        .await
        .unwrap();

    assert_eq!(location.encode(), "object://test-bucket/key-2");

    let data = collect(gateway.download(&location.encode()).await.unwrap()).await;
    assert_eq!(data, Bytes::from("payload"));
}

#[tokio::test]
async fn test_object_upload_requires_known_size() {
    let dir = tempfile::tempdir().unwrap();
    let gateway = with_object_backend(&dir, "test-bucket");

    let result = gateway
        .upload("key-3", stream_from_bytes(Bytes::from("data")), None)
        .await;
    assert!(matches!(result, Err(GatewayError::SizeUnknown)));

    // The local backend has no such requirement
    let gateway = local_only(&dir);
    gateway
        .upload("key-3", stream_from_bytes(Bytes::from("data")), None)
        .await
        .unwrap();
}

#[tokio::test]
async fn test_download_malformed_location() {
    let dir = tempfile::tempdir().unwrap();
    let gateway = local_only(&dir);

    let result = gateway.download("s3://elsewhere/key").await;
    assert!(matches!(result, Err(GatewayError::MalformedLocation(_))));
}

#[tokio::test]
async fn test_download_missing_object() {
    let dir = tempfile::tempdir().unwrap();
    let gateway = local_only(&dir);

    let result = gateway.download("local://never-uploaded").await;
    assert!(matches!(result, Err(GatewayError::NotFound(_))));
}

#[tokio::test]
async fn test_object_location_requires_matching_backend() {
    let dir = tempfile::tempdir().unwrap();

    // No object backend attached at all
    let gateway = local_only(&dir);
    let result = gateway.download("object://test-bucket/key").await;
    assert!(matches!(result, Err(GatewayError::Unreachable(_))));

    // Attached, but for a different bucket; re-routing would hit the wrong
    // data, so this must fail rather than fall back
    let gateway = with_object_backend(&dir, "other-bucket");
    let result = gateway.download("object://test-bucket/key").await;
    assert!(matches!(result, Err(GatewayError::Unreachable(_))));
}

#[tokio::test]
async fn test_backend_choice_is_pinned_per_object() {
    let dir = tempfile::tempdir().unwrap();

    let location = {
        let gateway = with_object_backend(&dir, "test-bucket");
        gateway
            .upload("pinned", stream_from_bytes(Bytes::from("pinned")), Some(6))
            .await
            .unwrap()
    };

    // Reconfigured without the object backend: the recorded location still
    // names it, and the gateway must not silently re-derive a local route.
    let gateway = local_only(&dir);
    let result = gateway.download(&location.encode()).await;
    assert!(matches!(result, Err(GatewayError::Unreachable(_))));
}

#[tokio::test]
async fn test_delete_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let gateway = with_object_backend(&dir, "test-bucket");

    let location = gateway
        .upload("gone", stream_from_bytes(Bytes::from("bytes")), Some(5))
        .await
        .unwrap();
    let encoded = location.encode();

    gateway.delete(&encoded).await.unwrap();
    gateway.delete(&encoded).await.unwrap();

    let result = gateway.download(&encoded).await;
    assert!(matches!(result, Err(GatewayError::NotFound(_))));
}

#[tokio::test]
async fn test_exists_is_best_effort() {
    let dir = tempfile::tempdir().unwrap();
    let gateway = with_object_backend(&dir, "test-bucket");

    let location = gateway
        .upload("probe", stream_from_bytes(Bytes::from("here")), Some(4))
        .await
        .unwrap();
    let encoded = location.encode();

    assert!(gateway.exists(&encoded).await);

    gateway.delete(&encoded).await.unwrap();
    assert!(!gateway.exists(&encoded).await);

    // Errors read as absent instead of propagating
    assert!(!gateway.exists("garbage-location").await);
    assert!(!gateway.exists("object://unknown-bucket/key").await);
}
