use chrono::Utc;
use jsonwebtoken::{encode, EncodingKey, Header};
use serde::Serialize;

use file_store::auth::{AuthChain, AuthError, Principal, TokenAuthenticator, SCOPE_READ, SCOPE_WRITE};
use file_store::storage::models::{FileRecord, SCHEMA_VERSION};

const SECRET: &str = "test-secret";

#[derive(Serialize)]
struct TestClaims<'a> {
    sub: &'a str,
    scope: &'a str,
    exp: usize,
}

fn token_with(secret: &str, sub: &str, scope: &str, exp_offset_secs: i64) -> String {
    let exp = (Utc::now().timestamp() + exp_offset_secs) as usize;
    encode(
        &Header::default(),
        &TestClaims { sub, scope, exp },
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .unwrap()
}

fn chain() -> AuthChain {
    AuthChain::new(SECRET, vec!["key-001".to_string(), "key-002".to_string()])
}

fn record_owned_by(owner: &str, is_public: bool) -> FileRecord {
    let now = Utc::now();
    FileRecord {
        id: "r-1".to_string(),
        original_name: "doc.txt".to_string(),
        stored_name: "r-1_doc.txt".to_string(),
        mime_type: "text/plain".to_string(),
        size_bytes: 10,
        checksum: None,
        location: "local://r-1_doc.txt".to_string(),
        owner_id: owner.to_string(),
        uploaded_at: now,
        last_accessed_at: now,
        expires_at: None,
        description: None,
        tags: None,
        is_public,
        content_encoding: None,
        content_language: None,
        schema_version: SCHEMA_VERSION.to_string(),
    }
}

// ============================================================================
// Claim tokens
// ============================================================================

#[test]
fn test_write_scope_token_grants_as_subject() {
    let token = token_with(SECRET, "bob", SCOPE_WRITE, 3600);
    let principal = chain().authenticate(&token).unwrap();
    assert_eq!(principal.name, "bob");
    assert_eq!(principal.scopes, vec![SCOPE_WRITE.to_string()]);
}

#[test]
fn test_read_scope_token_grants() {
    let token = token_with(SECRET, "carol", SCOPE_READ, 3600);
    let principal = chain().authenticate(&token).unwrap();
    assert_eq!(principal.name, "carol");
}

#[test]
fn test_multi_scope_token_keeps_all_scopes() {
    let token = token_with(SECRET, "dave", "file:read file:write", 3600);
    let principal = chain().authenticate(&token).unwrap();
    assert_eq!(
        principal.scopes,
        vec![SCOPE_READ.to_string(), SCOPE_WRITE.to_string()]
    );
}

#[test]
fn test_token_without_file_scope_is_rejected() {
    // Valid signature, valid expiry -- but no file scope. Still closed.
    let token = token_with(SECRET, "mallory", "email profile", 3600);
    let result = chain().authenticate(&token);
    assert_eq!(result.unwrap_err(), AuthError::InsufficientScope);
}

#[test]
fn test_expired_token_is_rejected() {
    // Past the default validation leeway
    let token = token_with(SECRET, "bob", SCOPE_WRITE, -3600);
    let result = chain().authenticate(&token);
    assert_eq!(result.unwrap_err(), AuthError::Expired);
}

#[test]
fn test_tampered_signature_is_rejected() {
    let token = token_with("wrong-secret", "bob", SCOPE_WRITE, 3600);
    let authenticator = TokenAuthenticator::new(SECRET);
    assert_eq!(
        authenticator.authenticate(&token).unwrap_err(),
        AuthError::Malformed
    );
}

// ============================================================================
// Static keys and the chain
// ============================================================================

#[test]
fn test_api_key_grants_shared_identity() {
    let principal = chain().authenticate("key-001").unwrap();
    assert_eq!(principal.name, "api-user");
    assert!(principal.scopes.iter().any(|s| s == SCOPE_READ));
    assert!(principal.scopes.iter().any(|s| s == SCOPE_WRITE));
}

#[test]
fn test_unknown_key_fails_closed() {
    let result = chain().authenticate("key-999");
    assert_eq!(result.unwrap_err(), AuthError::UnknownKey);
}

#[test]
fn test_garbage_credential_fails_closed() {
    for garbage in ["", "not.a.token", "Bearer nested", "aaaa.bbbb"] {
        assert!(chain().authenticate(garbage).is_err(), "{garbage:?} must fail");
    }
}

#[test]
fn test_chain_preserves_token_specific_failures() {
    // An expired real token should not be misreported as an unknown key
    let token = token_with(SECRET, "bob", SCOPE_WRITE, -3600);
    assert_eq!(chain().authenticate(&token).unwrap_err(), AuthError::Expired);

    let token = token_with(SECRET, "bob", "none", 3600);
    assert_eq!(
        chain().authenticate(&token).unwrap_err(),
        AuthError::InsufficientScope
    );
}

#[test]
fn test_empty_key_list_still_validates_tokens() {
    let chain = AuthChain::new(SECRET, Vec::new());
    let token = token_with(SECRET, "bob", SCOPE_WRITE, 3600);
    assert_eq!(chain.authenticate(&token).unwrap().name, "bob");
    assert!(chain.authenticate("key-001").is_err());
}

// ============================================================================
// Ownership predicates
// ============================================================================

#[test]
fn test_owner_can_read_and_modify_own_records() {
    let alice = Principal {
        name: "alice".to_string(),
        scopes: vec![SCOPE_WRITE.to_string()],
    };
    let record = record_owned_by("alice", false);
    assert!(alice.can_read(&record));
    assert!(alice.can_modify(&record));
}

#[test]
fn test_private_records_are_isolated_between_principals() {
    let alice = Principal {
        name: "alice".to_string(),
        scopes: vec![SCOPE_READ.to_string(), SCOPE_WRITE.to_string()],
    };
    let record = record_owned_by("bob", false);
    assert!(!alice.can_read(&record));
    assert!(!alice.can_modify(&record));
}

#[test]
fn test_public_records_are_readable_but_not_writable() {
    let alice = Principal {
        name: "alice".to_string(),
        scopes: vec![SCOPE_READ.to_string()],
    };
    let record = record_owned_by("bob", true);
    assert!(alice.can_read(&record));
    assert!(!alice.can_modify(&record));
}
