//! App-wide configuration row.

/// Id of the single configuration row.
pub const SETTINGS_ROW_ID: &str = "config-unica";

pub const DEFAULT_PRIMARY_COLOR: &str = "#ff0000";
pub const DEFAULT_SECONDARY_COLOR: &str = "#ffffff";

/// Branding shown by every client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppSettings {
    pub app_name: String,
    pub logo_url: String,
    pub primary_color: String,
    pub secondary_color: String,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            app_name: String::new(),
            logo_url: String::new(),
            primary_color: DEFAULT_PRIMARY_COLOR.to_owned(),
            secondary_color: DEFAULT_SECONDARY_COLOR.to_owned(),
        }
    }
}
