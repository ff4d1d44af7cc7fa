//! In-memory credential backend.

use std::collections::HashMap;
use std::sync::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;

use super::{BackendKind, CredentialBackend, Secret, StoreError};

/// In-memory credential backend for testing.
///
/// The backend can impersonate another [`BackendKind`] and be switched
/// unavailable at runtime, which makes it a stand-in for a keychain that
/// disappears between a `set` and a later `get`.
///
/// # Thread Safety
///
/// This implementation uses interior mutability via `RwLock` and is
/// safe to share across threads.
pub struct MemoryBackend {
    data: RwLock<HashMap<String, Secret>>,
    kind: BackendKind,
    available: AtomicBool,
}

impl MemoryBackend {
    /// Create a new empty, available memory backend.
    pub fn new() -> Self {
        Self {
            data: RwLock::new(HashMap::new()),
            kind: BackendKind::Memory,
            available: AtomicBool::new(true),
        }
    }

    /// Report a different backend kind (e.g. to act as the keychain).
    pub fn with_kind(mut self, kind: BackendKind) -> Self {
        self.kind = kind;
        self
    }

    /// Make every subsequent operation succeed or fail with `Unavailable`.
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Number of stored credentials.
    pub fn len(&self) -> usize {
        self.data.read().map(|d| d.len()).unwrap_or(0)
    }

    /// Check whether the backend holds no credentials.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn ensure_available(&self) -> Result<(), StoreError> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(StoreError::Unavailable {
                backend: self.kind,
                message: "backend switched off".to_string(),
            })
        }
    }

    fn poisoned(e: impl std::fmt::Display) -> StoreError {
        StoreError::BackendError {
            message: format!("lock poisoned: {}", e),
        }
    }
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for MemoryBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryBackend")
            .field("kind", &self.kind)
            .field("keys_count", &self.len())
            .field("available", &self.available.load(Ordering::SeqCst))
            .finish()
    }
}

#[async_trait]
impl CredentialBackend for MemoryBackend {
    fn kind(&self) -> BackendKind {
        self.kind
    }

    async fn get(&self, key: &str) -> Result<Option<Secret>, StoreError> {
        self.ensure_available()?;
        let data = self.data.read().map_err(Self::poisoned)?;
        Ok(data.get(key).cloned())
    }

    async fn set(&self, key: &str, secret: &Secret) -> Result<(), StoreError> {
        self.ensure_available()?;
        let mut data = self.data.write().map_err(Self::poisoned)?;
        data.insert(key.to_string(), secret.clone());
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool, StoreError> {
        self.ensure_available()?;
        let mut data = self.data.write().map_err(Self::poisoned)?;
        Ok(data.remove(key).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_backend_set_get() {
        let backend = MemoryBackend::new();
        backend.set("key", &Secret::new("value")).await.unwrap();

        let retrieved = backend.get("key").await.unwrap();
        assert_eq!(retrieved.unwrap().expose(), "value");
        assert_eq!(backend.len(), 1);
    }

    #[tokio::test]
    async fn test_memory_backend_delete() {
        let backend = MemoryBackend::new();
        backend.set("key", &Secret::new("value")).await.unwrap();

        assert!(backend.delete("key").await.unwrap());
        assert!(!backend.delete("key").await.unwrap());
        assert!(backend.is_empty());
    }

    #[tokio::test]
    async fn test_memory_backend_unavailable() {
        let backend = MemoryBackend::new().with_kind(BackendKind::Keychain);
        backend.set("key", &Secret::new("value")).await.unwrap();
        backend.set_available(false);

        let err = backend.get("key").await.unwrap_err();
        assert!(matches!(
            err,
            StoreError::Unavailable {
                backend: BackendKind::Keychain,
                ..
            }
        ));

        backend.set_available(true);
        assert!(backend.get("key").await.unwrap().is_some());
    }
}
