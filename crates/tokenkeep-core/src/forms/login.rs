//! Login form handler.

use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::api::{ApiClient, Credentials};
use crate::auth::{StorageError, StorageScope, TokenStore};
use crate::config::Config;

use super::{
    is_valid_email, Entry, FormReader, InFlight, NoticeKind, Notifier, Redirect, SubmitError,
    ValidationError,
};

const LOGIN_SUCCESS: &str = "Login successful!";
const LOGIN_FAILED: &str = "Login failed. Check your credentials.";
const TOKEN_NOT_SAVED: &str = "Login succeeded but the session could not be saved.";

/// Contents of the login form.
#[derive(Debug, Clone)]
pub struct LoginForm {
    pub credentials: Credentials,
    pub remember_me: bool,
}

impl LoginForm {
    pub fn new(email: &str, password: &str, remember_me: bool) -> Self {
        Self {
            credentials: Credentials::new(email.trim(), password),
            remember_me,
        }
    }

    /// Read the `email`, `password` and `rememberMe` controls
    pub fn read(form: &dyn FormReader) -> Self {
        Self::new(
            &form.trimmed("email"),
            &form.raw("password"),
            form.checked("rememberMe"),
        )
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if is_valid_email(&self.credentials.email) {
            Ok(())
        } else {
            Err(ValidationError::InvalidEmail)
        }
    }
}

pub struct LoginFlow {
    api: ApiClient,
    store: TokenStore,
    notifier: Arc<dyn Notifier>,
    landing_page: String,
    redirect_delay: std::time::Duration,
    in_flight: AtomicBool,
}

impl LoginFlow {
    pub fn new(
        api: ApiClient,
        store: TokenStore,
        notifier: Arc<dyn Notifier>,
        config: &Config,
    ) -> Self {
        Self {
            api,
            store,
            notifier,
            landing_page: config.landing_page.clone(),
            redirect_delay: config.redirect_delay(),
            in_flight: AtomicBool::new(false),
        }
    }

    pub fn store(&self) -> &TokenStore {
        &self.store
    }

    /// Skip the form entirely when a session token is already stored
    pub fn start(&self) -> Entry {
        if self.store.is_present() {
            debug!("Token already present, skipping login form");
            Entry::AlreadyAuthenticated(Redirect::immediate(&self.landing_page))
        } else {
            Entry::ShowForm
        }
    }

    /// Read the form controls and submit them
    pub async fn submit_form(&self, form: &dyn FormReader) -> Result<Redirect, SubmitError> {
        self.submit(LoginForm::read(form)).await
    }

    /// Validate, exchange the credentials for a token and store it in the
    /// scope picked by "remember me". The token store is only written on
    /// success.
    pub async fn submit(&self, form: LoginForm) -> Result<Redirect, SubmitError> {
        let Some(_guard) = InFlight::acquire(&self.in_flight) else {
            debug!("Login already in flight, ignoring submission");
            return Err(SubmitError::Busy);
        };

        if let Err(e) = form.validate() {
            self.notifier.notify(&e.to_string(), NoticeKind::Error);
            return Err(e.into());
        }

        let token = match self.api.login(&form.credentials).await {
            Ok(token) => token,
            Err(e) => {
                warn!(error = %e, "Login failed");
                self.notifier.notify(LOGIN_FAILED, NoticeKind::Error);
                return Err(e.into());
            }
        };

        let scope = match self.store.save(&token, form.remember_me) {
            Ok(scope) => scope,
            Err(e) => {
                warn!(error = %e, "Failed to save token");
                self.notifier.notify(TOKEN_NOT_SAVED, NoticeKind::Error);
                return Err(e.into());
            }
        };

        info!(%scope, "Login successful");
        self.notifier.notify(LOGIN_SUCCESS, NoticeKind::Success);
        Ok(Redirect::after(&self.landing_page, self.redirect_delay))
    }

    /// Remove the token from both scopes and go back to the landing page
    pub fn logout(&self) -> Result<Redirect, StorageError> {
        self.store.clear()?;
        info!("Logged out");
        Ok(Redirect::immediate(&self.landing_page))
    }

    /// Scope the current token lives in, if any
    pub fn session_scope(&self) -> Result<Option<StorageScope>, StorageError> {
        Ok(self.store.load()?.map(|(_, scope)| scope))
    }
}
