use thiserror::Error;

use crate::api::ApiError;
use crate::auth::StorageError;

/// Local, pre-network rejection. The message is shown to the user as is.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Please enter a valid email address.")]
    InvalidEmail,

    #[error("Passwords do not match.")]
    PasswordMismatch,

    #[error("You must be logged in to register an account.")]
    MissingToken,

    #[error("Invalid birth date {0:?}, expected YYYY-MM-DD.")]
    InvalidDate(String),

    #[error("Invalid street number {0:?}.")]
    InvalidStreetNumber(String),
}

/// Why a submission ended without a redirect.
#[derive(Error, Debug)]
pub enum SubmitError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("A submission is already in progress")]
    Busy,
}

impl SubmitError {
    /// True if the submission was rejected before any request was sent
    pub fn is_local(&self) -> bool {
        matches!(self, SubmitError::Validation(_) | SubmitError::Busy)
    }
}
