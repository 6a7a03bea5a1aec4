//! Authentication module for persisting the session token.
//!
//! This module provides:
//! - `Token`: the opaque bearer credential issued by the backend
//! - `TokenStore`: save/load/clear across the durable and ephemeral scopes
//! - `KeyValueStore` backends: in-memory, file-based and OS keychain
//!
//! Tokens are never inspected or expired client-side; presence in either
//! scope means "authenticated".

pub mod storage;
pub mod store;
pub mod token;

pub use storage::{FileStore, KeyValueStore, KeyringStore, MemoryStore, StorageError};
pub use store::TokenStore;
pub use token::{StorageScope, Token};
