//! Credential storage.
//!
//! This module provides:
//! - [`Secret`] - A wrapper for tokens that prevents accidental logging
//! - [`CredentialBackend`] - Trait for a single storage backend
//! - [`KeyringBackend`] - OS keychain backend (with `keyring-store` feature)
//! - [`FileBackend`] - JSON file fallback with owner-only permissions
//! - [`MemoryBackend`] - In-memory backend for tests
//! - [`CredentialStore`] - Native-then-file store used by the CLI
//!
//! # Storage Key Convention
//!
//! Credentials are keyed by the normalized base URL (see [`BaseUrl`]), one
//! token per key.
//!
//! # Example
//!
//! ```rust,ignore
//! use xbe_core::{BaseUrl, CredentialStore, Secret};
//!
//! let store = CredentialStore::open_default()?;
//! let key = BaseUrl::normalize("staging");
//!
//! store.set(&key, &Secret::new("tok_123")).await?;
//! let stored = store.get(&key).await?;
//! println!("token served by {}", stored.backend);
//! ```

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tracing::debug;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::base_url::BaseUrl;

mod file;
#[cfg(feature = "keyring-store")]
mod keyring;
mod memory;

pub use file::FileBackend;
#[cfg(feature = "keyring-store")]
pub use keyring::{KeyringBackend, KEYRING_SERVICE};
pub use memory::MemoryBackend;

/// A secret value that prevents accidental exposure in logs.
///
/// The inner value is only accessible via [`expose()`](Secret::expose).
/// Debug and Display implementations show `[REDACTED]` instead of the value,
/// and the buffer is zeroed when the secret is dropped.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct Secret(String);

impl Secret {
    /// Create a new secret from a string value.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Expose the secret value.
    ///
    /// Use sparingly and never log the result.
    pub fn expose(&self) -> &str {
        &self.0
    }

    /// Check whether the secret is empty or whitespace.
    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }

    /// A short, non-reversible preview such as `tok_…9f3a` for status output.
    pub fn masked(&self) -> String {
        let chars: Vec<char> = self.0.chars().collect();
        if chars.len() <= 8 {
            return "****".to_string();
        }
        let head: String = chars[..4].iter().collect();
        let tail: String = chars[chars.len() - 4..].iter().collect();
        format!("{}…{}", head, tail)
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Secret([REDACTED])")
    }
}

impl fmt::Display for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[REDACTED]")
    }
}

impl PartialEq for Secret {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl Eq for Secret {}

/// Which backend holds (or served) a credential.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendKind {
    /// The platform's native secret facility (Keychain, Credential Manager, kernel keyring).
    Keychain,
    /// The JSON fallback file.
    File,
    /// Process memory; tests only.
    Memory,
}

impl BackendKind {
    /// Stable lowercase label, used as the token source name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Keychain => "keychain",
            Self::File => "file",
            Self::Memory => "memory",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error type for credential store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// No credential is stored for the key.
    #[error("no credential stored for {key}")]
    NotFound { key: String },

    /// The backend cannot be reached (no session, daemon down, access denied).
    #[error("{backend} backend unavailable: {message}")]
    Unavailable { backend: BackendKind, message: String },

    /// The backend failed in some other way.
    #[error("backend error: {message}")]
    BackendError { message: String },

    /// I/O error reading or writing the credential file.
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The credential file exists but is not a JSON object of strings.
    #[error("credential file {} is corrupt: {source}", path.display())]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Configuration directory not available.
    #[error("configuration directory not available")]
    ConfigDirUnavailable,

    /// Neither the native backend nor the file could complete the operation.
    #[error("credential store unavailable (keychain: {native}; file: {file})")]
    AllBackendsFailed {
        native: Box<StoreError>,
        file: Box<StoreError>,
    },
}

impl StoreError {
    /// Check if this error means "nothing stored", as opposed to a failure.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// A single credential storage backend.
///
/// Implementations include:
/// - [`KeyringBackend`] (with `keyring-store` feature) - OS keychain
/// - [`FileBackend`] - JSON file with owner-only permissions
/// - [`MemoryBackend`] - In-memory storage for testing
#[async_trait]
pub trait CredentialBackend: Send + Sync {
    /// Which kind of backend this is.
    fn kind(&self) -> BackendKind;

    /// Retrieve the secret for a key.
    ///
    /// Returns `Ok(None)` if the key doesn't exist.
    async fn get(&self, key: &str) -> Result<Option<Secret>, StoreError>;

    /// Store a secret at the given key, overwriting any existing value.
    async fn set(&self, key: &str, secret: &Secret) -> Result<(), StoreError>;

    /// Delete the secret for a key.
    ///
    /// Returns `Ok(false)` if nothing was stored.
    async fn delete(&self, key: &str) -> Result<bool, StoreError>;
}

#[async_trait]
impl<T: CredentialBackend + ?Sized> CredentialBackend for Arc<T> {
    fn kind(&self) -> BackendKind {
        (**self).kind()
    }

    async fn get(&self, key: &str) -> Result<Option<Secret>, StoreError> {
        (**self).get(key).await
    }

    async fn set(&self, key: &str, secret: &Secret) -> Result<(), StoreError> {
        (**self).set(key, secret).await
    }

    async fn delete(&self, key: &str) -> Result<bool, StoreError> {
        (**self).delete(key).await
    }
}

/// A token read from the store along with the backend that served it.
#[derive(Debug, Clone)]
pub struct StoredCredential {
    /// The stored token.
    pub token: Secret,
    /// The backend the token was read from.
    pub backend: BackendKind,
}

/// Credential store that prefers the native facility and falls back to a file.
///
/// Every `set` is written to the native backend and mirrored to the file, so a
/// credential stays readable if the native facility later becomes unreachable.
/// Reads try the native backend first and fall back to the file on a miss or
/// on any native error. An operation fails only when both backends fail.
pub struct CredentialStore {
    native: Option<Box<dyn CredentialBackend>>,
    file: Box<dyn CredentialBackend>,
}

impl CredentialStore {
    /// Create a store from explicit backends.
    pub fn new(
        native: Option<Box<dyn CredentialBackend>>,
        file: Box<dyn CredentialBackend>,
    ) -> Self {
        Self { native, file }
    }

    /// Create a store with both a native backend and a file fallback.
    pub fn with_backends(
        native: impl CredentialBackend + 'static,
        file: impl CredentialBackend + 'static,
    ) -> Self {
        Self::new(Some(Box::new(native)), Box::new(file))
    }

    /// Create a store that only uses the file backend.
    pub fn file_only(file: impl CredentialBackend + 'static) -> Self {
        Self::new(None, Box::new(file))
    }

    /// Open the default store: OS keychain (when the `keyring-store` feature
    /// is enabled) backed by `<config dir>/xbe/config.json`.
    pub fn open_default() -> Result<Self, StoreError> {
        let file = FileBackend::open_default()?;

        #[cfg(feature = "keyring-store")]
        {
            Ok(Self::with_backends(KeyringBackend::new(KEYRING_SERVICE), file))
        }

        #[cfg(not(feature = "keyring-store"))]
        {
            debug!("keyring-store feature disabled; using file backend only");
            Ok(Self::file_only(file))
        }
    }

    /// Store a token for `key`.
    ///
    /// Returns the preferred backend that accepted the write.
    pub async fn set(&self, key: &BaseUrl, token: &Secret) -> Result<BackendKind, StoreError> {
        let key = key.as_str();

        let native = match &self.native {
            Some(native) => Some(native.set(key, token).await.map(|()| native.kind())),
            None => None,
        };
        let file = self.file.set(key, token).await;

        match (native, file) {
            (Some(Ok(kind)), file) => {
                if let Err(e) = file {
                    debug!("credential file mirror failed for {}: {}", key, e);
                }
                Ok(kind)
            }
            (Some(Err(native_err)), Ok(())) => {
                debug!("native backend rejected write for {}: {}; stored in file", key, native_err);
                Ok(self.file.kind())
            }
            (None, Ok(())) => Ok(self.file.kind()),
            (Some(Err(native_err)), Err(file_err)) => Err(StoreError::AllBackendsFailed {
                native: Box::new(native_err),
                file: Box::new(file_err),
            }),
            (None, Err(file_err)) => Err(file_err),
        }
    }

    /// Retrieve the token for `key`.
    ///
    /// Fails with [`StoreError::NotFound`] when no backend holds a token.
    pub async fn get(&self, key: &BaseUrl) -> Result<StoredCredential, StoreError> {
        let key = key.as_str();

        let mut native_err = None;
        if let Some(native) = &self.native {
            match native.get(key).await {
                Ok(Some(token)) => {
                    debug!("credential for {} served by {}", key, native.kind());
                    return Ok(StoredCredential {
                        token,
                        backend: native.kind(),
                    });
                }
                Ok(None) => {}
                Err(e) => {
                    debug!("native backend read failed for {}: {}; trying file", key, e);
                    native_err = Some(e);
                }
            }
        }

        match self.file.get(key).await {
            Ok(Some(token)) => {
                debug!("credential for {} served by {}", key, self.file.kind());
                Ok(StoredCredential {
                    token,
                    backend: self.file.kind(),
                })
            }
            Ok(None) => Err(StoreError::NotFound {
                key: key.to_string(),
            }),
            Err(file_err) => match native_err {
                Some(native_err) => Err(StoreError::AllBackendsFailed {
                    native: Box::new(native_err),
                    file: Box::new(file_err),
                }),
                None => Err(file_err),
            },
        }
    }

    /// Delete the token for `key` from every backend.
    ///
    /// Fails with [`StoreError::NotFound`] when no backend held a token.
    pub async fn delete(&self, key: &BaseUrl) -> Result<(), StoreError> {
        let key = key.as_str();

        let native = match &self.native {
            Some(native) => Some(native.delete(key).await),
            None => None,
        };
        let file = self.file.delete(key).await;

        if let Some(Err(e)) = &native {
            debug!("native backend delete failed for {}: {}; its copy may remain", key, e);
        }

        let removed = matches!(native, Some(Ok(true))) || matches!(file, Ok(true));
        if removed {
            return Ok(());
        }

        match (native, file) {
            (Some(Err(native_err)), Err(file_err)) => Err(StoreError::AllBackendsFailed {
                native: Box::new(native_err),
                file: Box::new(file_err),
            }),
            (_, Err(file_err)) => Err(file_err),
            _ => Err(StoreError::NotFound {
                key: key.to_string(),
            }),
        }
    }
}

impl fmt::Debug for CredentialStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialStore")
            .field("native", &self.native.as_ref().map(|n| n.kind()))
            .field("file", &self.file.kind())
            .finish()
    }
}
