//! API client for the authentication backend.
//!
//! This module provides the `ApiClient` struct, which issues exactly one
//! request per call: no retries, no queueing.

use std::time::Duration;

use reqwest::{header, Client};
use serde::Serialize;
use tracing::debug;

use crate::auth::Token;

use super::{ApiError, Credentials, LoginResponse, RegistrationRequest};

// ============================================================================
// Constants
// ============================================================================

/// Login endpoint, relative to the base URL
const LOGIN_PATH: &str = "/login";

/// Self-service registration endpoint
const REGISTER_PATH: &str = "/register";

/// Registration endpoint that requires a bearer token
const AUTHENTICATED_REGISTER_PATH: &str = "/api/auth/register";

/// Default HTTP request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// API client for the authentication backend.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
}

impl ApiClient {
    /// Create a new API client for the given base URL
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ApiError> {
        let base_url = base_url.trim().trim_end_matches('/').to_string();
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(ApiError::Configuration(format!(
                "base URL must start with http:// or https://, got {:?}",
                base_url
            )));
        }

        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Exchange credentials for a session token
    pub async fn login(&self, credentials: &Credentials) -> Result<Token, ApiError> {
        let response = self.post_json(LOGIN_PATH, credentials, None).await?;

        let body: LoginResponse = response
            .json()
            .await
            .map_err(|e| ApiError::InvalidResponse(format!("login response: {}", e)))?;

        match body.token {
            Some(token) if !token.trim().is_empty() => Ok(Token::new(token)),
            _ => Err(ApiError::InvalidResponse(
                "login response has no token".to_string(),
            )),
        }
    }

    /// Create an account through the unauthenticated endpoint
    pub async fn register(&self, request: &RegistrationRequest) -> Result<(), ApiError> {
        self.post_json(REGISTER_PATH, request, None).await?;
        Ok(())
    }

    /// Create an account on behalf of an already authenticated user
    pub async fn register_authenticated(
        &self,
        request: &RegistrationRequest,
        token: &Token,
    ) -> Result<(), ApiError> {
        self.post_json(AUTHENTICATED_REGISTER_PATH, request, Some(token))
            .await?;
        Ok(())
    }

    async fn post_json<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
        bearer: Option<&Token>,
    ) -> Result<reqwest::Response, ApiError> {
        let url = self.url(path);
        debug!(url = %url, authenticated = bearer.is_some(), "POST");

        let mut request = self
            .client
            .post(&url)
            .header(header::ACCEPT, "application/json")
            .json(body);
        if let Some(token) = bearer {
            request = request.bearer_auth(token.expose());
        }

        let response = request.send().await?;
        Self::check_response(response).await
    }

    /// Check if response is successful, returning an error with body if not.
    async fn check_response(response: reqwest::Response) -> Result<reqwest::Response, ApiError> {
        if response.status().is_success() {
            Ok(response)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            debug!(%status, "request failed");
            Err(ApiError::from_status(status, &body))
        }
    }
}
