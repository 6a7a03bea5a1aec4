//! REST API client module for the authentication backend.
//!
//! This module provides the `ApiClient` for the login and registration
//! endpoints, and the request/response types sent over the wire.
//!
//! Login returns an opaque JWT which later requests attach as a bearer
//! credential.

pub mod client;
pub mod error;
pub mod models;

pub use client::ApiClient;
pub use error::ApiError;
pub use models::{Credentials, LoginResponse, RegistrationRequest};
