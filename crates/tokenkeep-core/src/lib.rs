//! Session-token client for login and registration pages.
//!
//! This crate provides:
//! - `TokenStore`: persistence of an opaque bearer token in a durable or
//!   ephemeral storage scope
//! - `ApiClient`: the HTTP client for the login and registration endpoints
//! - `LoginFlow` and `RegistrationFlow`: form handlers that validate input,
//!   issue one request per submission and report the result
//! - `Notifier` and `FormReader`: presentation ports implemented by front ends

pub mod api;
pub mod auth;
pub mod config;
pub mod forms;

pub use api::{ApiClient, ApiError};
pub use auth::{StorageError, StorageScope, Token, TokenStore};
pub use config::{Config, ConfigError, RegistrationMode, StorageBackend};
pub use forms::{
    Entry, FormReader, FormValues, LoginFlow, LoginForm, NoticeKind, Notifier, Redirect,
    RegistrationFlow, RegistrationForm, SubmitError, ValidationError,
};
