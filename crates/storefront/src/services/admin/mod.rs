//! Back-office operations.
//!
//! Every operation checks that the signed-in profile is an administrator
//! before touching the backend; row-level security on the backend enforces
//! the same rule server-side.
//!
//! # Sections
//!
//! - `dashboard` - Sales figures and recent orders
//! - `orders` - All orders and status changes
//! - `catalog` - Products, categories and their images
//! - `users` - Profiles and the admin flag
//! - `sponsors` - Sponsors and their display order
//! - `settings` - The branding row

mod catalog;
mod dashboard;
mod orders;
mod settings;
mod sponsors;
mod users;

pub use catalog::{CategoryForm, ImageUpload, ProductForm, image_path, product_matches};
pub use dashboard::DashboardStats;
pub use orders::OrderFilter;
pub use settings::SettingsForm;
pub use sponsors::{Direction, SponsorForm};
pub use users::user_matches;

use thiserror::Error;

use super::auth::AuthController;
use super::auth::validation::ValidationErrors;
use super::catalog::CatalogService;
use super::failure_message;
use crate::backend::{BackendError, Backends};
use crate::notify::Notifier;

/// Errors from back-office operations.
#[derive(Debug, Error)]
pub enum AdminError {
    /// The current user is not an administrator.
    #[error("administrator access required")]
    Forbidden,

    #[error("invalid input: {0}")]
    Validation(#[from] ValidationErrors),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("backend error: {0}")]
    Backend(#[from] BackendError),
}

impl AdminError {
    /// Message suitable for showing to the user.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Forbidden => "Administrator access required".to_string(),
            Self::Validation(errors) => errors.to_string(),
            Self::NotFound(what) => format!("{what} not found"),
            Self::Backend(e) => e.user_message(),
        }
    }
}

/// Back-office service. Cheap to clone.
#[derive(Clone)]
pub struct AdminService {
    backends: Backends,
    auth: AuthController,
    catalog: CatalogService,
    notifier: std::sync::Arc<dyn Notifier>,
}

impl std::fmt::Debug for AdminService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdminService").finish_non_exhaustive()
    }
}

impl AdminService {
    #[must_use]
    pub fn new(
        backends: Backends,
        auth: AuthController,
        catalog: CatalogService,
        notifier: std::sync::Arc<dyn Notifier>,
    ) -> Self {
        Self {
            backends,
            auth,
            catalog,
            notifier,
        }
    }

    /// Fail unless the signed-in profile is an administrator.
    fn require_admin(&self) -> Result<(), AdminError> {
        if self.auth.is_admin() {
            Ok(())
        } else {
            tracing::warn!(user_id = ?self.auth.current_user_id(), "back-office access denied");
            Err(AdminError::Forbidden)
        }
    }

    /// Log a failed call, tell the user, and convert it.
    fn fail(&self, error: BackendError, fallback: &str) -> AdminError {
        tracing::error!(error = %error, "{fallback}");
        self.notifier.error(&failure_message(&error, fallback));
        AdminError::Backend(error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forbidden_message() {
        assert_eq!(
            AdminError::Forbidden.user_message(),
            "Administrator access required"
        );
    }
}
