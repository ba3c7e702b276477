//! Account email address.

use core::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

static EMAIL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-z0-9._%+-]+@[a-z0-9-]+(\.[a-z0-9-]+)*\.[a-z]{2,}$").expect("Invalid regex")
});

/// Why an address was rejected.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum EmailError {
    #[error("email cannot be empty")]
    Empty,
    #[error("email must be at most {max} characters")]
    TooLong { max: usize },
    #[error("invalid email")]
    Invalid,
}

/// A sign-in address, trimmed and lowercased.
///
/// The auth backend matches accounts case-insensitively, so two spellings of
/// the same address compare equal here too.
///
/// ```
/// use foodtruck_core::Email;
///
/// let email = Email::parse(" Maria@Example.com ").unwrap();
/// assert_eq!(email.as_str(), "maria@example.com");
/// assert!(Email::parse("maria@localhost").is_err());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(try_from = "String", into = "String")]
pub struct Email(String);

impl Email {
    /// RFC 5321 limit.
    pub const MAX_LENGTH: usize = 254;

    /// # Errors
    ///
    /// Returns `EmailError::Empty` for blank input, `EmailError::TooLong`
    /// past [`Self::MAX_LENGTH`] and `EmailError::Invalid` for anything that
    /// is not `local@domain.tld`.
    pub fn parse(raw: &str) -> Result<Self, EmailError> {
        let normalized = raw.trim().to_lowercase();
        if normalized.is_empty() {
            return Err(EmailError::Empty);
        }
        if normalized.len() > Self::MAX_LENGTH {
            return Err(EmailError::TooLong {
                max: Self::MAX_LENGTH,
            });
        }
        if !EMAIL_PATTERN.is_match(&normalized) {
            return Err(EmailError::Invalid);
        }
        Ok(Self(normalized))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Email {
    type Error = EmailError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Email> for String {
    fn from(email: Email) -> Self {
        email.0
    }
}

impl fmt::Display for Email {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for Email {
    type Err = EmailError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_common_addresses() {
        for raw in [
            "maria@example.com",
            "maria.souza+pedidos@mail.example.com.br",
            "joao_99@food-truck.io",
        ] {
            assert!(Email::parse(raw).is_ok(), "{raw}");
        }
    }

    #[test]
    fn test_normalizes_case_and_whitespace() {
        let a = Email::parse("  Maria@Example.COM").unwrap();
        let b = Email::parse("maria@example.com").unwrap();
        assert_eq!(a, b);
        assert_eq!(a.to_string(), "maria@example.com");
    }

    #[test]
    fn test_rejections() {
        assert_eq!(Email::parse("   "), Err(EmailError::Empty));
        for raw in ["no-at", "@example.com", "maria@", "maria@localhost", "a@@b.com", "a@b.c"] {
            assert_eq!(Email::parse(raw), Err(EmailError::Invalid), "{raw}");
        }
        let long = format!("{}@example.com", "a".repeat(250));
        assert!(matches!(Email::parse(&long), Err(EmailError::TooLong { .. })));
    }

    #[test]
    fn test_deserialize_validates() {
        let email: Email = serde_json::from_str("\"Ana@Example.com\"").unwrap();
        assert_eq!(email.as_str(), "ana@example.com");
        assert!(serde_json::from_str::<Email>("\"nope\"").is_err());
    }
}
