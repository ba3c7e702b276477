//! Business logic services for the storefront.
//!
//! # Services
//!
//! - `auth` - Session controller, profile cache and form validation
//! - `catalog` - Cached menu reads
//! - `addresses` - Delivery addresses
//! - `checkout` - Turning the cart into an order
//! - `orders` - Order history
//! - `profile` - Profile edits
//! - `settings` - App name, logo and colours
//! - `admin` - Back-office operations, administrators only

pub mod addresses;
pub mod admin;
pub mod auth;
pub mod catalog;
pub mod checkout;
pub mod orders;
pub mod profile;
pub mod settings;

use thiserror::Error;

use crate::backend::BackendError;
use crate::notify::Notifier;
use auth::validation::ValidationErrors;

/// Errors shared by the customer-facing services.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// The submitted form has invalid fields.
    #[error("invalid input: {0}")]
    Validation(#[from] ValidationErrors),

    /// The backend call failed.
    #[error("backend error: {0}")]
    Backend(#[from] BackendError),

    /// The operation needs a signed-in user.
    #[error("not signed in")]
    NotSignedIn,

    /// The record does not exist or belongs to someone else.
    #[error("not found: {0}")]
    NotFound(String),
}

impl ServiceError {
    /// Message suitable for showing to the user.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Validation(errors) => errors.to_string(),
            Self::Backend(e) => e.user_message(),
            Self::NotSignedIn => "Please sign in to continue".to_string(),
            Self::NotFound(what) => format!("{what} not found"),
        }
    }
}

/// Text to show for a failed backend call.
///
/// Client errors carry a message meant for the user; anything else gets
/// `fallback`.
pub(crate) fn failure_message(error: &BackendError, fallback: &str) -> String {
    match error {
        BackendError::Api {
            status, message, ..
        } if (400..500).contains(status) && !message.is_empty() => message.clone(),
        BackendError::RateLimited(_) | BackendError::Unauthenticated => error.user_message(),
        _ => fallback.to_string(),
    }
}

/// Log a failed call, tell the user, and pass the error on.
pub(crate) fn report_failure<E>(notifier: &dyn Notifier, error: BackendError, fallback: &str) -> E
where
    E: From<BackendError>,
{
    tracing::error!(error = %error, "{fallback}");
    notifier.error(&failure_message(&error, fallback));
    E::from(error)
}
