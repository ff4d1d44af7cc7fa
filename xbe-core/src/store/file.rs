//! JSON file fallback backend.
//!
//! The file is a single JSON object mapping normalized base URL to token:
//!
//! ```json
//! {
//!   "https://app.x-b-e.com": "tok_live_…",
//!   "https://staging.x-b-e.com": "tok_test_…"
//! }
//! ```
//!
//! # Storage Location
//!
//! `~/.config/xbe/config.json` on Linux (honoring `XDG_CONFIG_HOME`), and the
//! platform configuration directory elsewhere.
//!
//! Writes go to a temporary file in the same directory which is then renamed
//! over the original, so a crash or a concurrent writer never leaves a
//! truncated file behind. Concurrent processes follow last-writer-wins.

use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use async_trait::async_trait;

use super::{BackendKind, CredentialBackend, Secret, StoreError};

/// File name of the fallback credential file.
pub const CREDENTIAL_FILE_NAME: &str = "config.json";

type CredentialMap = BTreeMap<String, String>;

/// JSON file-backed credential backend.
pub struct FileBackend {
    path: PathBuf,
    /// Serializes read-modify-write cycles within this process.
    write_lock: Mutex<()>,
}

impl FileBackend {
    /// Create a backend for the credential file at `path`.
    ///
    /// Nothing is touched on disk until the first write.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// Get the default credential file path.
    pub fn default_path() -> Result<PathBuf, StoreError> {
        let dirs = directories::ProjectDirs::from("com", "x-b-e", "xbe")
            .ok_or(StoreError::ConfigDirUnavailable)?;

        Ok(dirs.config_dir().join(CREDENTIAL_FILE_NAME))
    }

    /// Create a backend for the default credential file.
    pub fn open_default() -> Result<Self, StoreError> {
        Ok(Self::new(Self::default_path()?))
    }

    /// Get the path of the credential file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: std::io::Error) -> StoreError {
        StoreError::Io {
            path: self.path.clone(),
            source,
        }
    }

    /// Read the whole map. A missing or empty file is an empty map.
    fn load(&self) -> Result<CredentialMap, StoreError> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(CredentialMap::new()),
            Err(e) => return Err(self.io_error(e)),
        };

        if contents.trim().is_empty() {
            return Ok(CredentialMap::new());
        }

        serde_json::from_str(&contents).map_err(|source| StoreError::Corrupt {
            path: self.path.clone(),
            source,
        })
    }

    /// Atomically replace the file with `data`.
    fn save(&self, data: &CredentialMap) -> Result<(), StoreError> {
        let parent = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        create_private_dir(&parent).map_err(|e| self.io_error(e))?;

        let contents = serde_json::to_vec_pretty(data).map_err(|source| StoreError::Corrupt {
            path: self.path.clone(),
            source,
        })?;

        // NamedTempFile is created with mode 0600 on Unix.
        let mut temp = tempfile::NamedTempFile::new_in(&parent).map_err(|e| self.io_error(e))?;
        temp.write_all(&contents).map_err(|e| self.io_error(e))?;
        temp.as_file().sync_all().map_err(|e| self.io_error(e))?;
        restrict_permissions(temp.path()).map_err(|e| self.io_error(e))?;
        temp.persist(&self.path)
            .map_err(|e| self.io_error(e.error))?;

        Ok(())
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, ()>, StoreError> {
        self.write_lock.lock().map_err(|e| StoreError::BackendError {
            message: format!("credential file lock poisoned: {}", e),
        })
    }
}

#[cfg(unix)]
fn create_private_dir(dir: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::DirBuilderExt;

    if dir.exists() {
        return Ok(());
    }
    fs::DirBuilder::new().recursive(true).mode(0o700).create(dir)
}

#[cfg(not(unix))]
fn create_private_dir(dir: &Path) -> std::io::Result<()> {
    fs::create_dir_all(dir)
}

#[cfg(unix)]
fn restrict_permissions(path: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;

    fs::set_permissions(path, fs::Permissions::from_mode(0o600))
}

#[cfg(not(unix))]
fn restrict_permissions(_path: &Path) -> std::io::Result<()> {
    Ok(())
}

impl std::fmt::Debug for FileBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileBackend")
            .field("path", &self.path)
            .finish()
    }
}

#[async_trait]
impl CredentialBackend for FileBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::File
    }

    async fn get(&self, key: &str) -> Result<Option<Secret>, StoreError> {
        let data = self.load()?;
        Ok(data
            .get(key)
            .filter(|token| !token.trim().is_empty())
            .map(Secret::new))
    }

    async fn set(&self, key: &str, secret: &Secret) -> Result<(), StoreError> {
        let _guard = self.lock()?;
        let mut data = self.load()?;
        data.insert(key.to_string(), secret.expose().to_string());
        self.save(&data)
    }

    async fn delete(&self, key: &str) -> Result<bool, StoreError> {
        let _guard = self.lock()?;
        let mut data = self.load()?;
        if data.remove(key).is_none() {
            return Ok(false);
        }
        self.save(&data)?;
        Ok(true)
    }
}
