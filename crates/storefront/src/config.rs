//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `BACKEND_URL` - Base URL of the Backend-as-a-Service project
//! - `BACKEND_ANON_KEY` - Public API key of the project (high entropy, not a placeholder)
//!
//! ## Optional
//! - `STOREFRONT_BASE_URL` - Public URL of the web client, used for
//!   password-reset links (default: `http://localhost:5173`)
//! - `STOREFRONT_DATA_DIR` - Directory for the local cart, session and
//!   profile cache (default: `$HOME/.foodtruck`)
//! - `STOREFRONT_DELIVERY_FEE` - Flat delivery fee added to every order (default: 5.00)
//! - `STOREFRONT_STORAGE_BUCKET` - Object storage bucket for images (default: imagens)
//! - `STOREFRONT_CATALOG_TTL_SECS` - Menu cache lifetime in seconds (default: 300)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name

use std::collections::HashMap;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use rust_decimal::Decimal;
use secrecy::SecretString;
use thiserror::Error;
use url::Url;

use foodtruck_core::Price;

use crate::storage::FileBackend;

const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;

const DEFAULT_BASE_URL: &str = "http://localhost:5173";
const DEFAULT_DELIVERY_FEE: &str = "5.00";
const DEFAULT_STORAGE_BUCKET: &str = "imagens";
const DEFAULT_CATALOG_TTL_SECS: &str = "300";

/// Path appended to the base URL for password-reset links.
const RESET_PASSWORD_PATH: &str = "/reset-password";

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "secret",
    "password",
    "xxx",
    "todo",
    "fixme",
    "insert",
    "enter-",
    "put-your",
    "add-your",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// Storefront application configuration.
#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    /// Backend-as-a-Service connection
    pub backend: BackendConfig,
    /// Public base URL of the web client
    pub base_url: String,
    /// Directory for locally persisted state
    pub data_dir: PathBuf,
    /// Flat delivery fee added to every order
    pub delivery_fee: Price,
    /// How long menu listings stay cached
    pub catalog_ttl: Duration,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment name
    pub sentry_environment: Option<String>,
}

/// Backend-as-a-Service connection settings.
///
/// Implements `Debug` manually to redact the API key.
#[derive(Clone)]
pub struct BackendConfig {
    /// Project base URL (e.g., `https://abcd.supabase.co`)
    pub url: Url,
    /// Public API key sent with every request
    pub anon_key: SecretString,
    /// Bucket holding product, category and sponsor images
    pub storage_bucket: String,
}

impl std::fmt::Debug for BackendConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendConfig")
            .field("url", &self.url.as_str())
            .field("anon_key", &"[REDACTED]")
            .field("storage_bucket", &self.storage_bucket)
            .finish()
    }
}

impl StorefrontConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing, invalid, or
    /// if the API key fails validation (placeholder detection, entropy check).
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let backend = BackendConfig::from_env()?;
        let base_url = get_env_or_default("STOREFRONT_BASE_URL", DEFAULT_BASE_URL)
            .trim_end_matches('/')
            .to_string();
        let data_dir = match get_optional_env("STOREFRONT_DATA_DIR") {
            Some(dir) => PathBuf::from(dir),
            None => FileBackend::default_dir().ok_or_else(|| {
                ConfigError::MissingEnvVar("STOREFRONT_DATA_DIR".to_string())
            })?,
        };
        let fee: Decimal = parse_env(
            "STOREFRONT_DELIVERY_FEE",
            &get_env_or_default("STOREFRONT_DELIVERY_FEE", DEFAULT_DELIVERY_FEE),
        )?;
        let delivery_fee = Price::new(fee).map_err(|e| {
            ConfigError::InvalidEnvVar("STOREFRONT_DELIVERY_FEE".to_string(), e.to_string())
        })?;
        let ttl_secs: u64 = parse_env(
            "STOREFRONT_CATALOG_TTL_SECS",
            &get_env_or_default("STOREFRONT_CATALOG_TTL_SECS", DEFAULT_CATALOG_TTL_SECS),
        )?;

        Ok(Self {
            backend,
            base_url,
            data_dir,
            delivery_fee,
            catalog_ttl: Duration::from_secs(ttl_secs),
            sentry_dsn: get_optional_env("SENTRY_DSN"),
            sentry_environment: get_optional_env("SENTRY_ENVIRONMENT"),
        })
    }

    /// Link target for password-reset emails.
    #[must_use]
    pub fn password_reset_url(&self) -> String {
        format!("{}{RESET_PASSWORD_PATH}", self.base_url)
    }
}

impl BackendConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let url = parse_env::<Url>("BACKEND_URL", &get_required_env("BACKEND_URL")?)?;
        Ok(Self {
            url,
            anon_key: get_validated_secret("BACKEND_ANON_KEY")?,
            storage_bucket: get_env_or_default("STOREFRONT_STORAGE_BUCKET", DEFAULT_STORAGE_BUCKET),
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    get_optional_env(key).unwrap_or_else(|| default.to_string())
}

/// Parse a variable's value, reporting failures against `key`.
fn parse_env<T>(key: &str, value: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e: T::Err| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

/// Calculate Shannon entropy in bits per character.
fn shannon_entropy(s: &str) -> f64 {
    if s.is_empty() {
        return 0.0;
    }

    let mut freq: HashMap<char, usize> = HashMap::new();
    for c in s.chars() {
        *freq.entry(c).or_insert(0) += 1;
    }

    #[allow(clippy::cast_precision_loss)] // String length will never exceed f64 precision
    let len = s.len() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)] // Character count will never exceed f64 precision
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Validate that a secret is not a placeholder and has sufficient entropy.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();

    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(ConfigError::InsecureSecret(
                var_name.to_string(),
                format!("appears to be a placeholder (contains '{pattern}')"),
            ));
        }
    }

    // Real API keys (JWTs) are long base64 strings with high entropy
    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1}). Copy the key from the project settings."
            ),
        ));
    }

    Ok(())
}

/// Load and validate a secret from environment.
fn get_validated_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    validate_secret_strength(&value, key)?;
    Ok(SecretString::from(value))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_shannon_entropy_empty() {
        assert!((shannon_entropy("") - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_shannon_entropy_two_chars() {
        let entropy = shannon_entropy("ab");
        assert!((entropy - 1.0).abs() < 0.01);
    }

    #[test]
    fn test_validate_secret_strength_placeholder() {
        let result = validate_secret_strength("your-anon-key-here", "BACKEND_ANON_KEY");
        assert!(matches!(result, Err(ConfigError::InsecureSecret(_, _))));
    }

    #[test]
    fn test_validate_secret_strength_low_entropy() {
        let result = validate_secret_strength("aaaaaaaaaaaaaaaaaaaaaaaa", "BACKEND_ANON_KEY");
        assert!(matches!(result, Err(ConfigError::InsecureSecret(_, _))));
    }

    #[test]
    fn test_validate_secret_strength_jwt_like() {
        let key = "eyJhbGciOiJIUzI1NiIsInR5cCI6IkpXVCJ9.eyJyb2xlIjoiYW5vbiJ9.Zk3q8Vb1";
        assert!(validate_secret_strength(key, "BACKEND_ANON_KEY").is_ok());
    }

    #[test]
    fn test_parse_env_reports_key() {
        let err = parse_env::<u64>("STOREFRONT_CATALOG_TTL_SECS", "soon").unwrap_err();
        assert!(err.to_string().contains("STOREFRONT_CATALOG_TTL_SECS"));
        assert_eq!(parse_env::<u64>("X", " 60 ").unwrap(), 60);
    }

    #[test]
    fn test_password_reset_url() {
        let config = StorefrontConfig {
            backend: BackendConfig {
                url: "https://project.supabase.co".parse().unwrap(),
                anon_key: SecretString::from("k".to_string()),
                storage_bucket: DEFAULT_STORAGE_BUCKET.to_string(),
            },
            base_url: "https://foodtruck.app".to_string(),
            data_dir: PathBuf::from("/tmp/foodtruck"),
            delivery_fee: Price::from_cents(500),
            catalog_ttl: Duration::from_secs(300),
            sentry_dsn: None,
            sentry_environment: None,
        };
        assert_eq!(
            config.password_reset_url(),
            "https://foodtruck.app/reset-password"
        );
    }

    #[test]
    fn test_backend_config_debug_redacts_key() {
        let config = BackendConfig {
            url: "https://project.supabase.co".parse().unwrap(),
            anon_key: SecretString::from("super_secret_anon_key".to_string()),
            storage_bucket: "imagens".to_string(),
        };
        let debug_output = format!("{config:?}");
        assert!(debug_output.contains("project.supabase.co"));
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("super_secret_anon_key"));
    }
}
