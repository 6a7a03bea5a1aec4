use std::path::PathBuf;
use std::sync::Arc;

use tracing::{debug, warn};

use super::storage::{FileStore, KeyValueStore, KeyringStore, MemoryStore, StorageError};
use super::token::{StorageScope, Token};

/// Default key under which the token is kept in both scopes
pub const DEFAULT_TOKEN_KEY: &str = "jwt";

/// Directory and keychain service name
const APP_NAME: &str = "tokenkeep";

/// Token persistence over a durable and an ephemeral scope.
///
/// A save writes to exactly one scope. Reads check the durable scope first
/// and fall back to the ephemeral one.
#[derive(Clone)]
pub struct TokenStore {
    durable: Arc<dyn KeyValueStore>,
    ephemeral: Arc<dyn KeyValueStore>,
    key: String,
}

impl TokenStore {
    pub fn new(durable: Arc<dyn KeyValueStore>, ephemeral: Arc<dyn KeyValueStore>) -> Self {
        Self {
            durable,
            ephemeral,
            key: DEFAULT_TOKEN_KEY.to_string(),
        }
    }

    /// Both scopes in process memory
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStore::new()), Arc::new(MemoryStore::new()))
    }

    /// Durable tokens in the user data directory, ephemeral tokens in the
    /// runtime directory (temp directory where there is none)
    pub fn files() -> Result<Self, StorageError> {
        Ok(Self::new(
            Arc::new(FileStore::new(durable_dir()?)),
            Arc::new(FileStore::new(ephemeral_dir())),
        ))
    }

    /// Durable tokens in the OS keychain, ephemeral tokens as files
    pub fn keyring() -> Self {
        Self::new(
            Arc::new(KeyringStore::new(APP_NAME)),
            Arc::new(FileStore::new(ephemeral_dir())),
        )
    }

    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = key.into();
        self
    }

    fn scope(&self, scope: StorageScope) -> &dyn KeyValueStore {
        match scope {
            StorageScope::Durable => self.durable.as_ref(),
            StorageScope::Ephemeral => self.ephemeral.as_ref(),
        }
    }

    /// Save into the durable scope if `durable`, otherwise the ephemeral one.
    /// The other scope is left untouched.
    pub fn save(&self, token: &Token, durable: bool) -> Result<StorageScope, StorageError> {
        let scope = StorageScope::from_remember_me(durable);
        self.save_in(token, scope)?;
        Ok(scope)
    }

    pub fn save_in(&self, token: &Token, scope: StorageScope) -> Result<(), StorageError> {
        self.scope(scope).set(&self.key, token.expose())?;
        debug!(%scope, "Token saved");
        Ok(())
    }

    /// Read a single scope
    pub fn get(&self, scope: StorageScope) -> Result<Option<Token>, StorageError> {
        Ok(self.scope(scope).get(&self.key)?.map(Token::new))
    }

    /// The stored token and its scope, durable first
    pub fn load(&self) -> Result<Option<(Token, StorageScope)>, StorageError> {
        for scope in [StorageScope::Durable, StorageScope::Ephemeral] {
            if let Some(token) = self.get(scope)? {
                return Ok(Some((token, scope)));
            }
        }
        Ok(None)
    }

    /// True if either scope holds a token. Unreadable storage counts as absent.
    pub fn is_present(&self) -> bool {
        match self.load() {
            Ok(found) => found.is_some(),
            Err(e) => {
                warn!(error = %e, "Failed to read token storage");
                false
            }
        }
    }

    /// Remove the token from both scopes. Both removals are attempted even
    /// if the first one fails.
    pub fn clear(&self) -> Result<(), StorageError> {
        let durable = self.durable.remove(&self.key);
        let ephemeral = self.ephemeral.remove(&self.key);
        debug!("Token cleared");
        durable.and(ephemeral)
    }
}

fn durable_dir() -> Result<PathBuf, StorageError> {
    let data_dir = dirs::data_dir().ok_or(StorageError::NoDirectory("user data directory"))?;
    Ok(data_dir.join(APP_NAME))
}

/// `$XDG_RUNTIME_DIR/tokenkeep`, or a per-user directory under the shared
/// temp directory
fn ephemeral_dir() -> PathBuf {
    match dirs::runtime_dir() {
        Some(runtime) => runtime.join(APP_NAME),
        None => std::env::temp_dir().join(per_user_dir_name(
            std::env::var("USER")
                .or_else(|_| std::env::var("USERNAME"))
                .ok()
                .as_deref(),
        )),
    }
}

fn per_user_dir_name(user: Option<&str>) -> String {
    let user: String = user
        .unwrap_or_default()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '_')
        .collect();
    if user.is_empty() {
        APP_NAME.to_string()
    } else {
        format!("{}-{}", APP_NAME, user)
    }
}
