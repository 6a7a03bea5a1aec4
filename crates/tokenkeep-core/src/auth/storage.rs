//! Key/value backends for the two token scopes.

use std::collections::HashMap;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use keyring::Entry;
use tempfile::NamedTempFile;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Storage I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Keychain error: {0}")]
    Keyring(#[from] keyring::Error),

    #[error("Invalid storage key: {0:?}")]
    InvalidKey(String),

    #[error("No storage directory available: {0}")]
    NoDirectory(&'static str),

    #[error("Refusing to use {}: {reason}", path.display())]
    Untrusted { path: PathBuf, reason: &'static str },
}

/// A single storage scope holding string values by key.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

// ============================================================================
// In-memory
// ============================================================================

#[derive(Debug, Default)]
pub struct MemoryStore {
    values: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn values(&self) -> std::sync::MutexGuard<'_, HashMap<String, String>> {
        self.values.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.values().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.values().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.values().remove(key);
        Ok(())
    }
}

// ============================================================================
// Files
// ============================================================================

/// One file per key inside a directory.
///
/// The directory must be a real directory owned by the current user; it is
/// tightened to 0700 when needed. Values are written to a 0600 temp file and
/// renamed into place, so a symlink planted at the key is never followed.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, StorageError> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.')
            && !key.starts_with('.');
        if !valid {
            return Err(StorageError::InvalidKey(key.to_string()));
        }
        Ok(self.dir.join(key))
    }

    /// Errors if `path` is a symlink; a missing path is fine
    fn reject_symlink(path: &Path) -> Result<(), StorageError> {
        match std::fs::symlink_metadata(path) {
            Ok(meta) if meta.file_type().is_symlink() => Err(StorageError::Untrusted {
                path: path.to_path_buf(),
                reason: "it is a symlink",
            }),
            Ok(_) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn ensure_dir(&self) -> Result<(), StorageError> {
        Self::reject_symlink(&self.dir)?;
        if !self.dir.exists() {
            std::fs::create_dir_all(&self.dir)?;
            Self::restrict_permissions(&self.dir, 0o700)?;
        }
        Ok(())
    }

    /// The directory must belong to whoever owns `probe`, a file we just created in it
    #[cfg(unix)]
    fn check_dir_owner(&self, probe: &std::fs::File) -> Result<(), StorageError> {
        use std::os::unix::fs::MetadataExt;

        let dir_meta = std::fs::symlink_metadata(&self.dir)?;
        if dir_meta.uid() != probe.metadata()?.uid() {
            return Err(StorageError::Untrusted {
                path: self.dir.clone(),
                reason: "the directory is owned by another user",
            });
        }
        if dir_meta.mode() & 0o077 != 0 {
            Self::restrict_permissions(&self.dir, 0o700)?;
        }
        Ok(())
    }

    #[cfg(not(unix))]
    fn check_dir_owner(&self, _probe: &std::fs::File) -> Result<(), StorageError> {
        Ok(())
    }

    #[cfg(unix)]
    fn restrict_permissions(path: &Path, mode: u32) -> io::Result<()> {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(path, std::fs::Permissions::from_mode(mode))
    }

    #[cfg(not(unix))]
    fn restrict_permissions(_path: &Path, _mode: u32) -> io::Result<()> {
        Ok(())
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let path = self.path_for(key)?;
        Self::reject_symlink(&path)?;
        match std::fs::read_to_string(&path) {
            Ok(contents) => {
                let value = contents.trim();
                Ok((!value.is_empty()).then(|| value.to_string()))
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let path = self.path_for(key)?;
        self.ensure_dir()?;

        // NamedTempFile is created 0600
        let mut file = NamedTempFile::new_in(&self.dir)?;
        self.check_dir_owner(file.as_file())?;
        Self::reject_symlink(&path)?;

        file.write_all(value.as_bytes())?;
        file.persist(&path).map_err(|e| e.error)?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        let path = self.path_for(key)?;
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

// ============================================================================
// OS keychain
// ============================================================================

/// Values kept in the OS keychain under one service name.
#[derive(Debug, Clone)]
pub struct KeyringStore {
    service: String,
}

impl KeyringStore {
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
        }
    }

    fn entry(&self, key: &str) -> Result<Entry, StorageError> {
        Ok(Entry::new(&self.service, key)?)
    }
}

impl KeyValueStore for KeyringStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        match self.entry(key)?.get_password() {
            Ok(value) => Ok(Some(value)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.entry(key)?.set_password(value)?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        match self.entry(key)?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
