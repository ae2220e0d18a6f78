use file_store::location::{LocationError, StorageLocation};

#[test]
fn test_local_round_trip() {
    let location = StorageLocation::local("abc123_report.txt");
    let encoded = location.encode();
    assert_eq!(encoded, "local://abc123_report.txt");

    let decoded = StorageLocation::decode(&encoded).unwrap();
    assert_eq!(decoded, location);
    assert_eq!(decoded.key(), "abc123_report.txt");
}

#[test]
fn test_object_round_trip() {
    let location = StorageLocation::object("my-bucket", "abc123_photo.png");
    let encoded = location.encode();
    assert_eq!(encoded, "object://my-bucket/abc123_photo.png");

    let decoded = StorageLocation::decode(&encoded).unwrap();
    assert_eq!(decoded, location);
    assert_eq!(decoded.key(), "abc123_photo.png");
}

#[test]
fn test_object_key_may_contain_slashes() {
    let location = StorageLocation::object("bucket", "nested/path/key");
    let decoded = StorageLocation::decode(&location.encode()).unwrap();
    assert_eq!(
        decoded,
        StorageLocation::Object {
            bucket: "bucket".to_string(),
            key: "nested/path/key".to_string(),
        }
    );
}

#[test]
fn test_unknown_scheme_is_rejected() {
    // Picking a default backend for an unknown scheme would route deletes at
    // the wrong data; decode must fail instead.
    for raw in ["s3://bucket/key", "file:///tmp/x", "ftp://host/key", "plain-string"] {
        let result = StorageLocation::decode(raw);
        assert!(
            matches!(result, Err(LocationError::Malformed(_))),
            "expected {raw} to be rejected"
        );
    }
}

#[test]
fn test_empty_components_are_rejected() {
    assert!(StorageLocation::decode("local://").is_err());
    assert!(StorageLocation::decode("object://bucket").is_err());
    assert!(StorageLocation::decode("object://bucket/").is_err());
    assert!(StorageLocation::decode("object:///key").is_err());
    assert!(StorageLocation::decode("").is_err());
}
