//! Registration form handler.

use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use tracing::{debug, info, warn};

use crate::api::{ApiClient, ApiError, RegistrationRequest};
use crate::auth::TokenStore;
use crate::config::{Config, RegistrationMode};

use super::{FormReader, InFlight, NoticeKind, Notifier, Redirect, SubmitError, ValidationError};

const REGISTRATION_SUCCESS: &str = "Registration successful! You can now log in.";
const REGISTRATION_FAILED: &str = "Registration failed. Check your information.";

/// Raw contents of the registration form, as typed.
#[derive(Clone, Default)]
pub struct RegistrationForm {
    pub username: String,
    pub firstname: String,
    pub date: String,
    pub email: String,
    pub phonenumber: String,
    pub streetnumber: String,
    pub address: String,
    pub postalcode: String,
    pub city: String,
    pub country: String,
    pub password: String,
    pub confirm_password: String,
}

impl RegistrationForm {
    /// Read the registration controls. Passwords are kept verbatim, every
    /// other field is trimmed.
    pub fn read(form: &dyn FormReader) -> Self {
        Self {
            username: form.trimmed("username"),
            firstname: form.trimmed("firstname"),
            date: form.trimmed("date"),
            email: form.trimmed("email"),
            phonenumber: form.trimmed("phonenumber"),
            streetnumber: form.trimmed("streetnumber"),
            address: form.trimmed("address"),
            postalcode: form.trimmed("postalcode"),
            city: form.trimmed("city"),
            country: form.trimmed("country"),
            password: form.raw("password"),
            confirm_password: form.raw("confirmPassword"),
        }
    }

    /// Check the form and build the request body. The password confirmation
    /// is checked before anything else.
    pub fn into_request(self) -> Result<RegistrationRequest, ValidationError> {
        if self.password != self.confirm_password {
            return Err(ValidationError::PasswordMismatch);
        }

        let date = match self.date.as_str() {
            "" => None,
            raw => Some(
                NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                    .map_err(|_| ValidationError::InvalidDate(raw.to_string()))?,
            ),
        };

        let streetnumber = match self.streetnumber.as_str() {
            "" => None,
            raw => Some(
                raw.parse::<u32>()
                    .map_err(|_| ValidationError::InvalidStreetNumber(raw.to_string()))?,
            ),
        };

        Ok(RegistrationRequest {
            username: self.username,
            firstname: self.firstname,
            date,
            email: self.email,
            phonenumber: self.phonenumber,
            streetnumber,
            address: self.address,
            postalcode: self.postalcode,
            city: self.city,
            country: (!self.country.is_empty()).then_some(self.country),
            password: self.password,
        })
    }
}

pub struct RegistrationFlow {
    api: ApiClient,
    store: TokenStore,
    notifier: Arc<dyn Notifier>,
    mode: RegistrationMode,
    landing_page: String,
    redirect_delay: Duration,
    in_flight: AtomicBool,
}

impl RegistrationFlow {
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
            mode: config.registration_mode,
            landing_page: config.landing_page.clone(),
            redirect_delay: config.redirect_delay(),
            in_flight: AtomicBool::new(false),
        }
    }

    pub fn with_mode(mut self, mode: RegistrationMode) -> Self {
        self.mode = mode;
        self
    }

    pub async fn submit_form(&self, form: &dyn FormReader) -> Result<Redirect, SubmitError> {
        self.submit(RegistrationForm::read(form)).await
    }

    /// Validate and post the new account. Nothing is stored on success.
    pub async fn submit(&self, form: RegistrationForm) -> Result<Redirect, SubmitError> {
        let Some(_guard) = InFlight::acquire(&self.in_flight) else {
            debug!("Registration already in flight, ignoring submission");
            return Err(SubmitError::Busy);
        };

        let request = match form.into_request() {
            Ok(request) => request,
            Err(e) => return Err(self.reject(e)),
        };

        let result = match self.mode {
            RegistrationMode::SelfService => self.api.register(&request).await,
            RegistrationMode::Authenticated => {
                let token = match self.store.load() {
                    Ok(Some((token, _))) => token,
                    Ok(None) => return Err(self.reject(ValidationError::MissingToken)),
                    Err(e) => {
                        warn!(error = %e, "Failed to read token storage");
                        self.notifier.notify(REGISTRATION_FAILED, NoticeKind::Error);
                        return Err(e.into());
                    }
                };
                self.api.register_authenticated(&request, &token).await
            }
        };

        match result {
            Ok(()) => {
                info!(mode = ?self.mode, "Registration successful");
                self.notifier
                    .notify(REGISTRATION_SUCCESS, NoticeKind::Success);
                Ok(Redirect::after(&self.landing_page, self.redirect_delay))
            }
            Err(e) => {
                warn!(error = %e, "Registration failed");
                self.notifier
                    .notify(&Self::failure_message(&e), NoticeKind::Error);
                Err(e.into())
            }
        }
    }

    fn reject(&self, error: ValidationError) -> SubmitError {
        self.notifier.notify(&error.to_string(), NoticeKind::Error);
        error.into()
    }

    /// The backend's own error text when it sent one
    fn failure_message(error: &ApiError) -> String {
        error
            .backend_message()
            .map(str::to_string)
            .unwrap_or_else(|| REGISTRATION_FAILED.to_string())
    }
}
