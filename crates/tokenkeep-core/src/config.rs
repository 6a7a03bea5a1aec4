//! Application configuration management.
//!
//! This module handles loading and saving the configuration: backend base
//! URL, landing page, redirect delay, storage backend, registration mode and
//! the last email used to log in.
//!
//! Configuration is stored at `~/.config/tokenkeep/config.json`.

use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::api::client::DEFAULT_TIMEOUT_SECS;
use crate::auth::store::DEFAULT_TOKEN_KEY;
use crate::auth::{StorageError, TokenStore};

/// Application name used for the config directory path
const APP_NAME: &str = "tokenkeep";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// Environment variable overriding `base_url`
pub const BASE_URL_ENV: &str = "TOKENKEEP_BASE_URL";

const DEFAULT_BASE_URL: &str = "http://localhost:8080";
const DEFAULT_LANDING_PAGE: &str = "/index.html";

/// Delay before navigating away, so the success notice stays visible.
const DEFAULT_REDIRECT_DELAY_MS: u64 = 1000;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Could not find config directory")]
    NoConfigDir,

    #[error("Failed to access config file {path}: {source}")]
    Io { path: PathBuf, source: io::Error },

    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
}

/// Where durable tokens are kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageBackend {
    #[default]
    File,
    Keyring,
}

/// Which registration endpoint the registration form posts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegistrationMode {
    /// Unauthenticated self-registration
    #[default]
    SelfService,
    /// Requires an existing token sent as a bearer credential
    Authenticated,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub base_url: String,
    pub landing_page: String,
    pub redirect_delay_ms: u64,
    pub request_timeout_secs: u64,
    pub storage: StorageBackend,
    pub registration_mode: RegistrationMode,
    pub token_key: String,
    pub last_email: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            landing_page: DEFAULT_LANDING_PAGE.to_string(),
            redirect_delay_ms: DEFAULT_REDIRECT_DELAY_MS,
            request_timeout_secs: DEFAULT_TIMEOUT_SECS,
            storage: StorageBackend::default(),
            registration_mode: RegistrationMode::default(),
            token_key: DEFAULT_TOKEN_KEY.to_string(),
            last_email: None,
        }
    }
}

impl Config {
    /// Load from the default location, then apply environment overrides
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = Self::load_from(&Self::config_path()?)?;
        config.apply_env();
        Ok(config)
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let io_err = |source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }
        let contents = serde_json::to_string_pretty(self).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        std::fs::write(path, contents).map_err(io_err)
    }

    /// Record the last email used to log in, leaving the rest of the saved
    /// file as it is (environment overrides are not persisted)
    pub fn remember_email(email: &str) -> Result<(), ConfigError> {
        Self::remember_email_at(&Self::config_path()?, email)
    }

    pub fn remember_email_at(path: &Path, email: &str) -> Result<(), ConfigError> {
        let mut saved = Self::load_from(path)?;
        saved.last_email = Some(email.to_string());
        saved.save_to(path)
    }

    pub fn config_path() -> Result<PathBuf, ConfigError> {
        let config_dir = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    fn apply_env(&mut self) {
        if let Ok(base_url) = std::env::var(BASE_URL_ENV) {
            if !base_url.trim().is_empty() {
                self.base_url = base_url;
            }
        }
    }

    pub fn redirect_delay(&self) -> Duration {
        Duration::from_millis(self.redirect_delay_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Open the token store for the configured backend
    pub fn token_store(&self) -> Result<TokenStore, StorageError> {
        let store = match self.storage {
            StorageBackend::File => TokenStore::files()?,
            StorageBackend::Keyring => TokenStore::keyring(),
        };
        Ok(store.with_key(self.token_key.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_from(&dir.path().join("config.json")).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.landing_page, "/index.html");
        assert_eq!(config.redirect_delay(), Duration::from_millis(1000));
        assert_eq!(config.registration_mode, RegistrationMode::SelfService);
        assert_eq!(config.token_key, "jwt");
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(
            &path,
            r#"{"base_url": "https://tickets.example", "registration_mode": "authenticated", "storage": "keyring"}"#,
        )
        .unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.base_url, "https://tickets.example");
        assert_eq!(config.registration_mode, RegistrationMode::Authenticated);
        assert_eq!(config.storage, StorageBackend::Keyring);
        assert_eq!(config.redirect_delay_ms, 1000);
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");
        let config = Config {
            last_email: Some("a@b.co".to_string()),
            ..Config::default()
        };
        config.save_to(&path).unwrap();
        assert_eq!(Config::load_from(&path).unwrap(), config);
    }

    #[test]
    fn test_remember_email_keeps_saved_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        let saved = Config {
            base_url: "https://tickets.example".to_string(),
            registration_mode: RegistrationMode::Authenticated,
            last_email: Some("old@b.co".to_string()),
            ..Config::default()
        };
        saved.save_to(&path).unwrap();

        // An in-memory override must not reach the file
        let mut running = Config::load_from(&path).unwrap();
        running.base_url = "http://override.local".to_string();

        Config::remember_email_at(&path, "a@b.co").unwrap();

        let reloaded = Config::load_from(&path).unwrap();
        assert_eq!(reloaded.last_email.as_deref(), Some("a@b.co"));
        assert_eq!(reloaded.base_url, "https://tickets.example");
        assert_ne!(reloaded.base_url, running.base_url);
        assert_eq!(reloaded.registration_mode, RegistrationMode::Authenticated);
    }

    #[test]
    fn test_remember_email_creates_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tokenkeep").join("config.json");

        Config::remember_email_at(&path, "a@b.co").unwrap();

        let reloaded = Config::load_from(&path).unwrap();
        assert_eq!(reloaded.last_email.as_deref(), Some("a@b.co"));
        assert_eq!(reloaded.base_url, Config::default().base_url);
    }

    #[test]
    fn test_invalid_file_is_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "not json").unwrap();
        assert!(matches!(Config::load_from(&path), Err(ConfigError::Parse { .. })));
    }
}
