//! Integration tests for the credential store.
//!
//! These tests verify that the CredentialStore correctly:
//! - Round-trips tokens keyed by normalized base URL
//! - Keeps serving a token from the file after the keychain goes away
//! - Reports missing credentials as NotFound

use std::sync::Arc;

use tempfile::TempDir;
use xbe_core::{
    BackendKind, BaseUrl, CredentialStore, FileBackend, MemoryBackend, Secret, StoreError,
};

/// Helper to build a store with a fake keychain and a file in a temp dir.
fn setup_store() -> (CredentialStore, Arc<MemoryBackend>, TempDir) {
    let temp_dir = TempDir::new().unwrap();
    let keychain = Arc::new(MemoryBackend::new().with_kind(BackendKind::Keychain));
    let file = FileBackend::new(temp_dir.path().join("xbe").join("config.json"));
    let store = CredentialStore::with_backends(Arc::clone(&keychain), file);
    (store, keychain, temp_dir)
}

#[tokio::test]
async fn test_set_get_delete_round_trip() {
    let (store, _keychain, _temp) = setup_store();
    let url = BaseUrl::normalize("staging");

    store.set(&url, &Secret::new("tok_staging")).await.unwrap();
    let stored = store.get(&url).await.unwrap();
    assert_eq!(stored.token.expose(), "tok_staging");

    store.delete(&url).await.unwrap();
    let err = store.get(&url).await.unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_keys_are_normalized_urls() {
    let (store, _keychain, _temp) = setup_store();

    store
        .set(&BaseUrl::normalize("staging.x-b-e.com/"), &Secret::new("tok"))
        .await
        .unwrap();

    let stored = store
        .get(&BaseUrl::normalize("https://staging.x-b-e.com"))
        .await
        .unwrap();
    assert_eq!(stored.token.expose(), "tok");

    let err = store.get(&BaseUrl::default_root()).await.unwrap_err();
    assert!(matches!(err, StoreError::NotFound { .. }));
}

#[tokio::test]
async fn test_file_serves_after_keychain_disappears() {
    let (store, keychain, _temp) = setup_store();
    let url = BaseUrl::default_root();

    let kind = store.set(&url, &Secret::new("tok_prod")).await.unwrap();
    assert_eq!(kind, BackendKind::Keychain);

    keychain.set_available(false);

    let stored = store.get(&url).await.unwrap();
    assert_eq!(stored.token.expose(), "tok_prod");
    assert_eq!(stored.backend, BackendKind::File);
}

#[tokio::test]
async fn test_delete_clears_both_backends() {
    let (store, keychain, temp) = setup_store();
    let url = BaseUrl::default_root();

    store.set(&url, &Secret::new("tok")).await.unwrap();
    store.delete(&url).await.unwrap();

    assert!(keychain.is_empty());
    let contents =
        std::fs::read_to_string(temp.path().join("xbe").join("config.json")).unwrap();
    assert!(!contents.contains("tok"));

    let err = store.delete(&url).await.unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_file_survives_store_reopen() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("config.json");
    let url = BaseUrl::normalize("local");

    {
        let store = CredentialStore::file_only(FileBackend::new(&path));
        store.set(&url, &Secret::new("tok_local")).await.unwrap();
    }

    let store = CredentialStore::file_only(FileBackend::new(&path));
    let stored = store.get(&url).await.unwrap();
    assert_eq!(stored.token.expose(), "tok_local");
    assert_eq!(stored.backend.as_str(), "file");
}

#[tokio::test]
async fn test_delete_during_keychain_outage_leaves_keychain_copy() {
    let (store, keychain, _temp) = setup_store();
    let url = BaseUrl::default_root();

    store.set(&url, &Secret::new("tok_old")).await.unwrap();

    keychain.set_available(false);
    store.delete(&url).await.unwrap();
    assert!(store.get(&url).await.unwrap_err().is_not_found());

    // The keychain entry was never removed and is served again once reachable.
    keychain.set_available(true);
    let stored = store.get(&url).await.unwrap();
    assert_eq!(stored.token.expose(), "tok_old");
    assert_eq!(stored.backend, BackendKind::Keychain);
}
