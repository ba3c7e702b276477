//! App branding settings.

use std::sync::{Arc, LazyLock};

use regex::Regex;

use crate::backend::{BackendError, SettingsTable};
use crate::models::AppSettings;

static HEX_COLOR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^#[0-9a-fA-F]{6}$").expect("Invalid regex")
});

/// Whether `value` is a `#rrggbb` colour.
#[must_use]
pub fn is_hex_color(value: &str) -> bool {
    HEX_COLOR.is_match(value)
}

/// Reads the configuration row.
#[derive(Clone)]
pub struct SettingsService {
    table: Arc<dyn SettingsTable>,
}

impl std::fmt::Debug for SettingsService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SettingsService").finish_non_exhaustive()
    }
}

impl SettingsService {
    #[must_use]
    pub fn new(table: Arc<dyn SettingsTable>) -> Self {
        Self { table }
    }

    /// The stored row, `None` if it was never saved.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend request fails.
    pub async fn fetch(&self) -> Result<Option<AppSettings>, BackendError> {
        self.table.fetch().await
    }

    /// Settings to render with; defaults when absent or unreadable.
    pub async fn current(&self) -> AppSettings {
        match self.table.fetch().await {
            Ok(settings) => settings.unwrap_or_default(),
            Err(e) => {
                tracing::warn!(error = %e, "failed to load app settings, using defaults");
                AppSettings::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex_color() {
        assert!(is_hex_color("#ff0000"));
        assert!(is_hex_color("#A1b2C3"));
        assert!(!is_hex_color("ff0000"));
        assert!(!is_hex_color("#fff"));
        assert!(!is_hex_color("#gg0000"));
    }
}
