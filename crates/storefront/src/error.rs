//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type for the binaries. Server-side failures
//! are captured to Sentry when reported; user mistakes are not.

use thiserror::Error;

use crate::backend::BackendError;
use crate::config::ConfigError;
use crate::services::ServiceError;
use crate::services::admin::AdminError;
use crate::services::auth::AuthError;
use crate::services::auth::validation::ValidationErrors;
use crate::services::checkout::CheckoutError;
use crate::storage::StorageError;

/// Application-level error type.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Local persistence failed.
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),

    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    #[error("{0}")]
    Service(#[from] ServiceError),

    #[error("Checkout error: {0}")]
    Checkout(#[from] CheckoutError),

    #[error("Admin error: {0}")]
    Admin(#[from] AdminError),

    /// Bad input from the user.
    #[error("Invalid input: {0}")]
    Validation(#[from] ValidationErrors),

    /// Command-line arguments that parsed but make no sense.
    #[error("Bad request: {0}")]
    BadRequest(String),
}

impl AppError {
    /// Whether the failure is on our side rather than the user's.
    #[must_use]
    pub const fn is_server_error(&self) -> bool {
        match self {
            Self::Config(_) | Self::Storage(_) => true,
            Self::Backend(e)
            | Self::Auth(AuthError::Backend(e))
            | Self::Service(ServiceError::Backend(e))
            | Self::Checkout(CheckoutError::Backend(e))
            | Self::Admin(AdminError::Backend(e)) => is_server_failure(e),
            _ => false,
        }
    }

    /// Message suitable for showing to the user.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Config(e) => e.to_string(),
            Self::Storage(_) => "Could not save local data".to_string(),
            Self::Backend(e) => e.user_message(),
            Self::Auth(e) => e.user_message(),
            Self::Service(e) => e.user_message(),
            Self::Checkout(e) => match e {
                CheckoutError::NotSignedIn => "Please sign in to place an order".to_string(),
                CheckoutError::EmptyCart => "Your cart is empty".to_string(),
                CheckoutError::AddressNotFound => "Select a delivery address".to_string(),
                CheckoutError::Backend(e) => e.user_message(),
            },
            Self::Admin(e) => e.user_message(),
            Self::Validation(errors) => errors.to_string(),
            Self::BadRequest(message) => message.clone(),
        }
    }

    /// Process exit status for the binaries (sysexits values).
    #[must_use]
    pub const fn exit_status(&self) -> u8 {
        match self {
            Self::Config(_) => 78,
            Self::Auth(AuthError::NotSignedIn)
            | Self::Service(ServiceError::NotSignedIn)
            | Self::Checkout(CheckoutError::NotSignedIn)
            | Self::Admin(AdminError::Forbidden) => 77,
            _ if self.is_server_error() => 70,
            _ => 65,
        }
    }

    /// Log the error and capture server-side failures to Sentry.
    pub fn report(&self) {
        if self.is_server_error() {
            let event_id = sentry::capture_error(self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Command failed"
            );
        } else {
            tracing::debug!(error = %self, "Command rejected");
        }
    }
}

const fn is_server_failure(error: &BackendError) -> bool {
    match error {
        BackendError::Api { status, .. } => *status >= 500 || *status == 0,
        BackendError::Http(_) | BackendError::Parse(_) | BackendError::Storage(_) => true,
        BackendError::NotFound(_) | BackendError::RateLimited(_) | BackendError::Unauthenticated => {
            false
        }
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Set the Sentry user context from a user ID.
///
/// Call this after the session is restored to associate errors with users.
pub fn set_sentry_user(user_id: &impl ToString, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            email: email.map(String::from),
            ..Default::default()
        }));
    });
}

/// Clear the Sentry user context.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}

/// Add a breadcrumb for user actions.
///
/// # Example
///
/// ```rust,ignore
/// add_breadcrumb("cart", "Added item", Some(&[("product_id", "123")]));
/// ```
pub fn add_breadcrumb(category: &str, message: &str, data: Option<&[(&str, &str)]>) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    if let Some(pairs) = data {
        for (key, value) in pairs {
            breadcrumb.data.insert(
                (*key).to_string(),
                serde_json::Value::String((*value).to_string()),
            );
        }
    }

    sentry::add_breadcrumb(breadcrumb);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_app_error_display() {
        let err = AppError::BadRequest("quantity must be positive".to_string());
        assert_eq!(err.to_string(), "Bad request: quantity must be positive");

        let err = AppError::Service(ServiceError::NotFound("Order".to_string()));
        assert_eq!(err.to_string(), "not found: Order");
        assert_eq!(err.user_message(), "Order not found");
    }

    #[test]
    fn test_server_errors() {
        let outage = AppError::Backend(BackendError::Api {
            status: 503,
            code: None,
            message: "unavailable".to_string(),
        });
        assert!(outage.is_server_error());
        assert_eq!(outage.exit_status(), 70);

        let rejected = AppError::Auth(AuthError::Backend(BackendError::Api {
            status: 400,
            code: Some("invalid_credentials".to_string()),
            message: "Invalid login credentials".to_string(),
        }));
        assert!(!rejected.is_server_error());
        assert_eq!(rejected.user_message(), "Invalid login credentials");
    }

    #[test]
    fn test_access_errors() {
        assert_eq!(AppError::Admin(AdminError::Forbidden).exit_status(), 77);
        assert_eq!(
            AppError::Checkout(CheckoutError::EmptyCart).user_message(),
            "Your cart is empty"
        );
    }
}
