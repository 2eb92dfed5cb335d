//! Per-request credential verification.
//!
//! Every authenticated endpoint carries HTTP Basic credentials that are
//! checked against the stored password digest. The request's identity is
//! also pushed into the logging context.

use actix_web::HttpRequest;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use log::warn;
use sha2::{Digest, Sha256};

use crate::errors::GalleryError;
use crate::metadata::MetadataStore;

/// The authenticated identity of the current request.
#[derive(Debug, Clone, PartialEq)]
pub struct UserContext {
    pub username: String,
}

impl UserContext {
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
        }
    }
}

/// Deterministic one-way digest of a plaintext password.
pub fn hash_password(password: &str) -> String {
    hex::encode(Sha256::digest(password.as_bytes()))
}

fn decode_basic(header: &str) -> Option<(String, String)> {
    let encoded = header.strip_prefix("Basic ")?;
    let decoded = BASE64.decode(encoded.trim()).ok()?;
    let text = String::from_utf8(decoded).ok()?;
    let (username, password) = text.split_once(':')?;
    Some((username.to_string(), password.to_string()))
}

/// Check a username/password pair against the metadata store. An unknown
/// username and a wrong password are indistinguishable to the caller.
pub fn verify_credentials(
    store: &dyn MetadataStore,
    username: &str,
    password: &str,
) -> Result<UserContext, GalleryError> {
    match store.get_user(username)? {
        Some(user) if user.password_hash == hash_password(password) => {
            log_mdc::insert("user", username);
            Ok(UserContext::new(username))
        }
        _ => {
            warn!("Failed login attempt for username: {}", username);
            Err(GalleryError::Unauthorized)
        }
    }
}

/// Extract and verify Basic credentials from a request.
pub fn authenticate(
    req: &HttpRequest,
    store: &dyn MetadataStore,
) -> Result<UserContext, GalleryError> {
    let header = req
        .headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .ok_or(GalleryError::Unauthorized)?;
    let (username, password) = decode_basic(header).ok_or(GalleryError::Unauthorized)?;
    verify_credentials(store, &username, &password)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::mock_store::MockMetadataStore;
    use crate::metadata::UserRecord;
    use actix_web::test as actix_test;
    use chrono::Utc;

    fn store_with_alice() -> MockMetadataStore {
        let store = MockMetadataStore::new();
        store
            .create_user(&UserRecord {
                username: "alice".to_string(),
                password_hash: hash_password("pw1"),
                email: None,
                created_at: Utc::now(),
            })
            .unwrap();
        store
    }

    fn basic_header(username: &str, password: &str) -> String {
        format!("Basic {}", BASE64.encode(format!("{username}:{password}")))
    }

    #[test]
    fn test_hash_password_is_deterministic() {
        assert_eq!(hash_password("pw1"), hash_password("pw1"));
        assert_ne!(hash_password("pw1"), hash_password("pw2"));
        // sha-256 hex digest
        assert_eq!(hash_password("pw1").len(), 64);
    }

    #[test]
    fn test_decode_basic() {
        let header = basic_header("alice", "pw:with:colons");
        let (user, pass) = decode_basic(&header).unwrap();
        assert_eq!(user, "alice");
        assert_eq!(pass, "pw:with:colons");

        assert!(decode_basic("Bearer token").is_none());
        assert!(decode_basic("Basic not-base64!!!").is_none());
    }

    #[test]
    fn test_authenticate_with_valid_credentials() {
        let store = store_with_alice();
        let req = actix_test::TestRequest::default()
            .insert_header(("Authorization", basic_header("alice", "pw1")))
            .to_http_request();

        let context = authenticate(&req, &store).unwrap();
        assert_eq!(context.username, "alice");
    }

    #[test]
    fn test_authenticate_rejects_bad_password_and_unknown_user() {
        let store = store_with_alice();

        let req = actix_test::TestRequest::default()
            .insert_header(("Authorization", basic_header("alice", "wrong")))
            .to_http_request();
        assert!(matches!(
            authenticate(&req, &store),
            Err(GalleryError::Unauthorized)
        ));

        let req = actix_test::TestRequest::default()
            .insert_header(("Authorization", basic_header("mallory", "pw1")))
            .to_http_request();
        assert!(matches!(
            authenticate(&req, &store),
            Err(GalleryError::Unauthorized)
        ));
    }

    #[test]
    fn test_authenticate_missing_header() {
        let store = store_with_alice();
        let req = actix_test::TestRequest::default().to_http_request();
        assert!(matches!(
            authenticate(&req, &store),
            Err(GalleryError::Unauthorized)
        ));
    }
}
