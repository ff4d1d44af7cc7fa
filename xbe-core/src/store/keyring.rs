//! OS keychain backend.

use async_trait::async_trait;
use keyring::Entry;

use super::{BackendKind, CredentialBackend, Secret, StoreError};

/// Keychain service name under which tokens are stored.
pub const KEYRING_SERVICE: &str = "xbe-cli";

/// OS keychain-backed credential backend.
///
/// This backend uses the platform's native secret facility:
/// - macOS: Keychain
/// - Windows: Credential Manager
/// - Linux: kernel keyutils
///
/// Each credential is an entry with service [`KEYRING_SERVICE`] and the
/// normalized base URL as the user name. Platform calls block, so they run on
/// the blocking thread pool and a cancelled caller can walk away from them.
pub struct KeyringBackend {
    service: String,
}

impl KeyringBackend {
    /// Create a keychain backend for the given service name.
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
        }
    }

    /// Run `op` against the entry for `key` on the blocking pool.
    async fn with_entry<T, F>(&self, key: &str, op: F) -> Result<T, StoreError>
    where
        T: Send + 'static,
        F: FnOnce(&Entry) -> Result<T, keyring::Error> + Send + 'static,
    {
        let service = self.service.clone();
        let user = key.to_string();

        tokio::task::spawn_blocking(move || {
            let entry = Entry::new(&service, &user)?;
            op(&entry)
        })
        .await
        .map_err(|e| StoreError::BackendError {
            message: format!("keychain task failed: {}", e),
        })?
        .map_err(unavailable)
    }
}

/// Any keychain failure other than a missing entry makes the backend unusable
/// for this operation.
fn unavailable(e: keyring::Error) -> StoreError {
    let message = match e {
        keyring::Error::PlatformFailure(e) => format!("platform failure: {}", e),
        keyring::Error::NoStorageAccess(e) => format!("no storage access: {}", e),
        keyring::Error::Ambiguous(_) => "ambiguous keychain entry".to_string(),
        e => e.to_string(),
    };
    StoreError::Unavailable {
        backend: BackendKind::Keychain,
        message,
    }
}

impl std::fmt::Debug for KeyringBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyringBackend")
            .field("service", &self.service)
            .finish()
    }
}

#[async_trait]
impl CredentialBackend for KeyringBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Keychain
    }

    async fn get(&self, key: &str) -> Result<Option<Secret>, StoreError> {
        self.with_entry(key, |entry| match entry.get_password() {
            Ok(password) => Ok(Some(Secret::new(password))),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(e),
        })
        .await
    }

    async fn set(&self, key: &str, secret: &Secret) -> Result<(), StoreError> {
        let secret = secret.clone();
        self.with_entry(key, move |entry| entry.set_password(secret.expose()))
            .await
    }

    async fn delete(&self, key: &str) -> Result<bool, StoreError> {
        self.with_entry(key, |entry| match entry.delete_credential() {
            Ok(()) => Ok(true),
            Err(keyring::Error::NoEntry) => Ok(false),
            Err(e) => Err(e),
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // These tests never touch the real keychain.

    #[test]
    fn test_keyring_backend_kind() {
        let backend = KeyringBackend::new("xbe-test");
        assert_eq!(backend.kind(), BackendKind::Keychain);
        assert_eq!(backend.service, "xbe-test");
    }

    #[test]
    fn test_platform_failure_maps_to_unavailable() {
        let err = unavailable(keyring::Error::PlatformFailure("no session bus".into()));
        match err {
            StoreError::Unavailable { backend, message } => {
                assert_eq!(backend, BackendKind::Keychain);
                assert!(message.contains("no session bus"));
            }
            other => panic!("unexpected error: {}", other),
        }
    }
}
