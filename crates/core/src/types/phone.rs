//! Brazilian mobile phone number in display format.

use core::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

static PHONE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\(\d{2}\) \d{5}-\d{4}$").expect("Invalid regex")
});

/// Errors that can occur when parsing a [`Phone`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PhoneError {
    /// The input string is empty.
    #[error("phone is required")]
    Empty,
    /// The input does not follow `(00) 00000-0000`.
    #[error("phone must use the format (00) 00000-0000")]
    InvalidFormat,
}

/// A phone number stored exactly as displayed, e.g. `(11) 98765-4321`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct Phone(String);

impl Phone {
    /// Maximum number of digits (two area digits plus nine subscriber digits).
    pub const MAX_DIGITS: usize = 11;

    /// Parse a phone number already in display format.
    ///
    /// # Errors
    ///
    /// Returns `PhoneError::Empty` for blank input and
    /// `PhoneError::InvalidFormat` for anything not shaped `(00) 00000-0000`.
    pub fn parse(s: &str) -> Result<Self, PhoneError> {
        let s = s.trim();
        if s.is_empty() {
            return Err(PhoneError::Empty);
        }
        if !PHONE_PATTERN.is_match(s) {
            return Err(PhoneError::InvalidFormat);
        }
        Ok(Self(s.to_owned()))
    }

    /// Apply the progressive input mask to raw keyboard input.
    ///
    /// Non-digits are dropped and input is capped at [`Self::MAX_DIGITS`].
    /// The result is suitable for [`Phone::parse`] once all digits are typed.
    ///
    /// ```
    /// use foodtruck_core::Phone;
    ///
    /// assert_eq!(Phone::format_input("1"), "(1");
    /// assert_eq!(Phone::format_input("119"), "(11) 9");
    /// assert_eq!(Phone::format_input("11987654321"), "(11) 98765-4321");
    /// ```
    #[must_use]
    pub fn format_input(raw: &str) -> String {
        let digits: String = raw
            .chars()
            .filter(char::is_ascii_digit)
            .take(Self::MAX_DIGITS)
            .collect();

        // Every char is an ASCII digit, so byte offsets are char offsets.
        if digits.is_empty() {
            return digits;
        }
        if digits.len() <= 2 {
            return format!("({digits}");
        }
        let (area, subscriber) = digits.split_at(2);
        if subscriber.len() <= 4 {
            return format!("({area}) {subscriber}");
        }
        let (prefix, suffix) = subscriber.split_at(5);
        format!("({area}) {prefix}-{suffix}")
    }

    /// Returns the phone number as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the `Phone` and returns its inner string.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for Phone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for Phone {
    type Err = PhoneError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
