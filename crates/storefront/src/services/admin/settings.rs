//! Branding settings.

use super::{AdminError, AdminService};
use crate::models::AppSettings;
use crate::services::auth::validation::ValidationErrors;
use crate::services::settings::is_hex_color;

/// Settings editor fields.
#[derive(Debug, Clone, Default)]
pub struct SettingsForm {
    pub app_name: String,
    pub logo_url: String,
    pub primary_color: String,
    pub secondary_color: String,
}

impl From<AppSettings> for SettingsForm {
    fn from(settings: AppSettings) -> Self {
        Self {
            app_name: settings.app_name,
            logo_url: settings.logo_url,
            primary_color: settings.primary_color,
            secondary_color: settings.secondary_color,
        }
    }
}

impl SettingsForm {
    /// # Errors
    ///
    /// Returns the colour fields that are not `#rrggbb`.
    pub fn validate(&self) -> Result<AppSettings, ValidationErrors> {
        let mut errors = ValidationErrors::new();
        for (field, value) in [
            ("primary_color", &self.primary_color),
            ("secondary_color", &self.secondary_color),
        ] {
            if !is_hex_color(value.trim()) {
                errors.add(field, "Use a colour like #ff0000");
            }
        }
        errors.finish(|| AppSettings {
            app_name: self.app_name.trim().to_string(),
            logo_url: self.logo_url.trim().to_string(),
            primary_color: self.primary_color.trim().to_lowercase(),
            secondary_color: self.secondary_color.trim().to_lowercase(),
        })
    }
}

impl AdminService {
    /// Create or replace the configuration row.
    ///
    /// # Errors
    ///
    /// Returns `AdminError::Validation` for a malformed colour and
    /// `AdminError::Backend` when the write fails.
    pub async fn save_settings(&self, form: &SettingsForm) -> Result<AppSettings, AdminError> {
        self.require_admin()?;
        let settings = form.validate()?;
        self.backends
            .settings
            .upsert(&settings)
            .await
            .map_err(|e| self.fail(e, "Failed to save settings"))?;
        tracing::info!(app_name = %settings.app_name, "settings saved");
        self.notifier.success("Settings saved!");
        Ok(settings)
    }
}
