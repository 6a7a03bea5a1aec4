//! Login and registration form handlers.
//!
//! Each flow validates its form locally, issues at most one request per
//! submission, reports the outcome through a `Notifier` and returns the
//! `Redirect` the front end should follow. Front ends supply the
//! presentation ports (`Notifier`, `FormReader`).

pub mod error;
pub mod login;
pub mod ports;
pub mod register;

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

pub use error::{SubmitError, ValidationError};
pub use login::{LoginFlow, LoginForm};
pub use ports::{FormReader, FormValues, NoticeKind, Notifier};
pub use register::{RegistrationFlow, RegistrationForm};

/// Navigation requested by a flow: go to `target` once `delay` has passed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Redirect {
    pub target: String,
    pub delay: Duration,
}

impl Redirect {
    pub fn immediate(target: impl Into<String>) -> Self {
        Self::after(target, Duration::ZERO)
    }

    pub fn after(target: impl Into<String>, delay: Duration) -> Self {
        Self {
            target: target.into(),
            delay,
        }
    }

    /// Sleep until the redirect is due
    pub async fn wait(&self) {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
    }
}

/// What a page should do when it is first shown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Entry {
    /// No session yet: display the form
    ShowForm,
    /// A token is already stored: skip the form
    AlreadyAuthenticated(Redirect),
}

/// Basic `local@domain.tld` shape check: no whitespace, a single `@`, and a
/// dot inside the domain with text on both sides.
pub fn is_valid_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') {
        return false;
    }
    domain
        .char_indices()
        .any(|(i, c)| c == '.' && i > 0 && i + 1 < domain.len())
}

/// Held for the duration of one submission; rejects overlapping ones.
struct InFlight<'a>(&'a AtomicBool);

impl<'a> InFlight<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_emails() {
        assert!(is_valid_email("a@b.co"));
        assert!(is_valid_email("jean.dupont@mail.example.fr"));
        assert!(is_valid_email("x+tag@sub.domain.org"));
        assert!(is_valid_email("a@b..c"));
    }

    #[test]
    fn test_invalid_emails() {
        assert!(!is_valid_email(""));
        assert!(!is_valid_email("plainaddress"));
        assert!(!is_valid_email("a.b.co"));
        assert!(!is_valid_email("@b.co"));
        assert!(!is_valid_email("a@bco"));
        assert!(!is_valid_email("a@b."));
        assert!(!is_valid_email("a@.co"));
        assert!(!is_valid_email("a@b@c.co"));
        assert!(!is_valid_email("a b@c.co"));
        assert!(!is_valid_email("a@b.co "));
        // Dot only before the @ does not count
        assert!(!is_valid_email("first.last@localhost"));
    }

    #[test]
    fn test_in_flight_guard() {
        let flag = AtomicBool::new(false);
        let guard = InFlight::acquire(&flag).unwrap();
        assert!(InFlight::acquire(&flag).is_none());
        drop(guard);
        assert!(InFlight::acquire(&flag).is_some());
    }

    #[test]
    fn test_redirect_constructors() {
        let now = Redirect::immediate("/index.html");
        assert!(now.delay.is_zero());
        let later = Redirect::after("/index.html", Duration::from_millis(1000));
        assert_eq!(later.delay, Duration::from_secs(1));
    }
}
