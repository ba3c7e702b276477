//! Authentication error types.

use thiserror::Error;

use super::validation::ValidationErrors;
use crate::backend::BackendError;

/// Errors from the auth session controller.
#[derive(Debug, Error)]
pub enum AuthError {
    /// The submitted form has invalid fields.
    #[error("invalid input: {0}")]
    Validation(#[from] ValidationErrors),

    /// The auth service or profile table failed.
    #[error("backend error: {0}")]
    Backend(#[from] BackendError),

    /// The operation needs a signed-in user.
    #[error("not signed in")]
    NotSignedIn,
}

impl AuthError {
    /// Message suitable for showing to the user.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Validation(errors) => errors.to_string(),
            Self::Backend(e) => e.user_message(),
            Self::NotSignedIn => "Please sign in to continue".to_string(),
        }
    }
}
