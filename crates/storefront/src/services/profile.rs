//! Profile edits by the signed-in user.

use std::sync::Arc;

use chrono::Utc;

use super::auth::AuthController;
use super::auth::validation::ProfileForm;
use super::{ServiceError, report_failure};
use crate::backend::ProfileTable;
use crate::models::{Profile, ProfilePatch};
use crate::notify::Notifier;

#[derive(Clone)]
pub struct ProfileService {
    table: Arc<dyn ProfileTable>,
    auth: AuthController,
    notifier: Arc<dyn Notifier>,
}

impl std::fmt::Debug for ProfileService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProfileService").finish_non_exhaustive()
    }
}

impl ProfileService {
    #[must_use]
    pub fn new(table: Arc<dyn ProfileTable>, auth: AuthController, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            table,
            auth,
            notifier,
        }
    }

    /// Save name and phone, then reload the profile into the auth state.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Validation` for bad input (nothing is sent),
    /// `ServiceError::NotSignedIn` without a user and
    /// `ServiceError::Backend` when the update fails.
    pub async fn update(&self, form: &ProfileForm) -> Result<Option<Profile>, ServiceError> {
        let fields = form.validate()?;
        let user_id = self.auth.current_user_id().ok_or(ServiceError::NotSignedIn)?;
        let patch = ProfilePatch {
            name: fields.name,
            phone: fields.phone.into_inner(),
            updated_at: Utc::now(),
        };

        self.table
            .update(user_id, &patch)
            .await
            .map_err(|e| {
                report_failure::<ServiceError>(
                    self.notifier.as_ref(),
                    e,
                    "Failed to update profile",
                )
            })?;
        tracing::info!(user_id = %user_id, "profile updated");
        self.notifier.success("Profile updated successfully");

        self.auth
            .refresh_profile()
            .await
            .map_err(|_| ServiceError::NotSignedIn)
    }
}
