//! User management.

use foodtruck_core::ProfileId;

use super::{AdminError, AdminService};
use crate::models::Profile;

/// Whether `profile` matches a search on name or phone.
#[must_use]
pub fn user_matches(profile: &Profile, search: &str) -> bool {
    let search = search.trim().to_lowercase();
    search.is_empty()
        || profile.name.to_lowercase().contains(&search)
        || profile.phone.to_lowercase().contains(&search)
}

impl AdminService {
    /// Profiles ordered by name, filtered by `search`.
    ///
    /// # Errors
    ///
    /// Returns `AdminError::Forbidden` for non-administrators and
    /// `AdminError::Backend` when the lookup fails.
    pub async fn users(&self, search: &str) -> Result<Vec<Profile>, AdminError> {
        self.require_admin()?;
        let profiles = self
            .backends
            .profiles
            .list()
            .await
            .map_err(|e| self.fail(e, "Failed to load users"))?;
        Ok(profiles
            .into_iter()
            .filter(|p| user_matches(p, search))
            .collect())
    }

    /// Grant or revoke administrator access. Returns the new flag.
    ///
    /// # Errors
    ///
    /// Returns `AdminError::NotFound` for a profile without an id and
    /// `AdminError::Backend` when the update fails.
    pub async fn toggle_admin(&self, profile: &Profile) -> Result<bool, AdminError> {
        self.require_admin()?;
        let id = profile_id(profile)?;
        let is_admin = !profile.is_admin;
        self.backends
            .profiles
            .set_admin(id, is_admin)
            .await
            .map_err(|e| self.fail(e, "Failed to update user permissions"))?;
        tracing::info!(profile_id = %id, is_admin, "admin flag changed");
        self.notifier.success(&if is_admin {
            format!("{} is now an administrator", profile.name)
        } else {
            format!("{} is no longer an administrator", profile.name)
        });
        Ok(is_admin)
    }

    /// Delete a profile row. The auth identity is left alone.
    ///
    /// # Errors
    ///
    /// Returns `AdminError::Backend` when the delete fails.
    pub async fn delete_user(&self, profile: &Profile) -> Result<(), AdminError> {
        self.require_admin()?;
        let id = profile_id(profile)?;
        self.backends
            .profiles
            .delete(id)
            .await
            .map_err(|e| self.fail(e, "Failed to delete user"))?;
        tracing::info!(profile_id = %id, "profile deleted");
        self.notifier
            .success(&format!("User {} deleted", profile.name));
        Ok(())
    }
}

fn profile_id(profile: &Profile) -> Result<ProfileId, AdminError> {
    profile
        .id
        .ok_or_else(|| AdminError::NotFound("Profile".to_string()))
}

#[cfg(test)]
mod tests {
    use foodtruck_core::UserId;

    use super::*;

    #[test]
    fn test_user_matches_name_or_phone() {
        let profile = Profile {
            id: Some(ProfileId::random()),
            user_id: UserId::random(),
            name: "Maria Silva".into(),
            phone: "(11) 91234-5678".into(),
            is_admin: false,
            created_at: None,
            updated_at: None,
            extra: serde_json::Map::new(),
        };
        assert!(user_matches(&profile, "silva"));
        assert!(user_matches(&profile, "91234"));
        assert!(user_matches(&profile, "  "));
        assert!(!user_matches(&profile, "joão"));
    }
}
