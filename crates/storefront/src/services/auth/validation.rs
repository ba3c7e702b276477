//! Form validation.
//!
//! Every form is checked field by field before any network call. All
//! failing fields are reported together so a UI can show each message next
//! to its input.

use std::collections::BTreeMap;

use thiserror::Error;

use foodtruck_core::{Email, EmailError, Phone, PhoneError};

use crate::models::NewAddress;

/// Minimum length of a person's name.
const MIN_NAME_CHARS: usize = 3;

/// Minimum password length.
const MIN_PASSWORD_CHARS: usize = 6;

/// Maximum length of a state abbreviation (UF).
const MAX_STATE_CHARS: usize = 2;

/// One invalid field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

/// Per-field validation failures, keyed by field name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Error)]
#[error("{}", summarize(.errors))]
pub struct ValidationErrors {
    errors: BTreeMap<&'static str, String>,
}

fn summarize(errors: &BTreeMap<&'static str, String>) -> String {
    errors
        .iter()
        .map(|(field, message)| format!("{field}: {message}"))
        .collect::<Vec<_>>()
        .join("; ")
}

impl ValidationErrors {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a failure for `field`. The first message per field wins.
    pub fn add(&mut self, field: &'static str, message: impl Into<String>) {
        self.errors.entry(field).or_insert_with(|| message.into());
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    /// Message for `field`, if it failed.
    #[must_use]
    pub fn get(&self, field: &str) -> Option<&str> {
        self.errors.get(field).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = FieldError> + '_ {
        self.errors.iter().map(|(field, message)| FieldError {
            field,
            message: message.clone(),
        })
    }

    /// `Ok(value)` when nothing failed.
    ///
    /// # Errors
    ///
    /// Returns `self` when at least one field failed.
    pub fn finish<T>(self, value: impl FnOnce() -> T) -> Result<T, Self> {
        if self.is_empty() { Ok(value()) } else { Err(self) }
    }
}

// =============================================================================
// Field rules
// =============================================================================

fn check_email(errors: &mut ValidationErrors, raw: &str) -> Option<Email> {
    match Email::parse(raw.trim()) {
        Ok(email) => Some(email),
        Err(EmailError::Empty) => {
            errors.add("email", "Email is required");
            None
        }
        Err(_) => {
            errors.add("email", "Invalid email");
            None
        }
    }
}

fn check_phone(errors: &mut ValidationErrors, raw: &str) -> Option<Phone> {
    match Phone::parse(raw.trim()) {
        Ok(phone) => Some(phone),
        Err(PhoneError::Empty) => {
            errors.add("phone", "Phone is required");
            None
        }
        Err(PhoneError::InvalidFormat) => {
            errors.add("phone", "Phone must use the format (00) 00000-0000");
            None
        }
    }
}

fn check_name(errors: &mut ValidationErrors, raw: &str) -> String {
    let name = raw.trim();
    if name.is_empty() {
        errors.add("name", "Name is required");
    } else if name.chars().count() < MIN_NAME_CHARS {
        errors.add("name", "Name must be at least 3 characters");
    }
    name.to_string()
}

fn check_password(errors: &mut ValidationErrors, password: &str) {
    if password.is_empty() {
        errors.add("password", "Password is required");
    } else if password.chars().count() < MIN_PASSWORD_CHARS {
        errors.add("password", "Password must be at least 6 characters");
    }
}

fn require(errors: &mut ValidationErrors, field: &'static str, label: &str, raw: &str) -> String {
    let value = raw.trim();
    if value.is_empty() {
        errors.add(field, format!("{label} is required"));
    }
    value.to_string()
}

/// Validate a lone email field, as on the password reset form.
///
/// # Errors
///
/// Returns the `email` field error.
pub fn parse_email(raw: &str) -> Result<Email, ValidationErrors> {
    let mut errors = ValidationErrors::new();
    check_email(&mut errors, raw).ok_or(errors)
}

// =============================================================================
// Forms
// =============================================================================

/// Sign-in form.
#[derive(Debug, Clone, Default)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

/// Validated sign-in credentials.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub email: Email,
    pub password: String,
}

impl LoginForm {
    /// # Errors
    ///
    /// Returns the failing fields.
    pub fn validate(&self) -> Result<Credentials, ValidationErrors> {
        let mut errors = ValidationErrors::new();
        let email = check_email(&mut errors, &self.email);
        if self.password.is_empty() {
            errors.add("password", "Password is required");
        }
        match email {
            Some(email) if errors.is_empty() => Ok(Credentials {
                email,
                password: self.password.clone(),
            }),
            _ => Err(errors),
        }
    }
}

/// Account registration form.
#[derive(Debug, Clone, Default)]
pub struct RegistrationForm {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub password: String,
    pub confirm_password: String,
}

/// Validated registration.
#[derive(Debug, Clone)]
pub struct Registration {
    pub name: String,
    pub email: Email,
    pub phone: Phone,
    pub password: String,
}

impl RegistrationForm {
    /// # Errors
    ///
    /// Returns the failing fields.
    pub fn validate(&self) -> Result<Registration, ValidationErrors> {
        let mut errors = ValidationErrors::new();
        let name = check_name(&mut errors, &self.name);
        let email = check_email(&mut errors, &self.email);
        let phone = check_phone(&mut errors, &self.phone);
        check_password(&mut errors, &self.password);
        if self.confirm_password.is_empty() {
            errors.add("confirm_password", "Password confirmation is required");
        } else if self.confirm_password != self.password {
            errors.add("confirm_password", "Passwords do not match");
        }

        match (email, phone) {
            (Some(email), Some(phone)) if errors.is_empty() => Ok(Registration {
                name,
                email,
                phone,
                password: self.password.clone(),
            }),
            _ => Err(errors),
        }
    }
}

/// Profile edit form.
#[derive(Debug, Clone, Default)]
pub struct ProfileForm {
    pub name: String,
    pub phone: String,
}

/// Validated profile fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileFields {
    pub name: String,
    pub phone: Phone,
}

impl ProfileForm {
    /// # Errors
    ///
    /// Returns the failing fields.
    pub fn validate(&self) -> Result<ProfileFields, ValidationErrors> {
        let mut errors = ValidationErrors::new();
        let name = check_name(&mut errors, &self.name);
        let phone = check_phone(&mut errors, &self.phone);
        match phone {
            Some(phone) if errors.is_empty() => Ok(ProfileFields { name, phone }),
            _ => Err(errors),
        }
    }
}

/// Delivery address form.
#[derive(Debug, Clone, Default)]
pub struct AddressForm {
    pub street: String,
    pub number: String,
    pub complement: Option<String>,
    pub district: String,
    pub city: String,
    pub state: String,
    pub postal_code: String,
}

impl AddressForm {
    /// # Errors
    ///
    /// Returns the failing fields.
    pub fn validate(&self) -> Result<NewAddress, ValidationErrors> {
        let mut errors = ValidationErrors::new();
        let postal_code = require(&mut errors, "postal_code", "Postal code", &self.postal_code);
        let street = require(&mut errors, "street", "Street", &self.street);
        let number = require(&mut errors, "number", "Number", &self.number);
        let district = require(&mut errors, "district", "District", &self.district);
        let city = require(&mut errors, "city", "City", &self.city);
        let state = require(&mut errors, "state", "State", &self.state);
        if state.chars().count() > MAX_STATE_CHARS {
            errors.add("state", "Use the two-letter state abbreviation");
        }
        let complement = self
            .complement
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(str::to_string);

        errors.finish(|| NewAddress {
            street,
            number,
            complement,
            district,
            city,
            state: state.to_uppercase(),
            postal_code,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn registration() -> RegistrationForm {
        RegistrationForm {
            name: "Ana Souza".into(),
            email: "ana@example.com".into(),
            phone: "(11) 91234-5678".into(),
            password: "secret1".into(),
            confirm_password: "secret1".into(),
        }
    }

    #[test]
    fn test_login_requires_both_fields() {
        let errors = LoginForm::default().validate().unwrap_err();
        assert_eq!(errors.get("email"), Some("Email is required"));
        assert_eq!(errors.get("password"), Some("Password is required"));
    }

    #[test]
    fn test_login_rejects_malformed_email() {
        let form = LoginForm {
            email: "ana@localhost".into(),
            password: "x".into(),
        };
        let errors = form.validate().unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors.get("email"), Some("Invalid email"));
    }

    #[test]
    fn test_valid_registration() {
        let valid = registration().validate().unwrap();
        assert_eq!(valid.name, "Ana Souza");
        assert_eq!(valid.phone.as_str(), "(11) 91234-5678");
    }

    #[test]
    fn test_registration_collects_every_failure() {
        let form = RegistrationForm {
            name: "Al".into(),
            email: "nope".into(),
            phone: "11912345678".into(),
            password: "12345".into(),
            confirm_password: "54321".into(),
        };
        let errors = form.validate().unwrap_err();
        assert_eq!(errors.len(), 5);
        assert_eq!(errors.get("name"), Some("Name must be at least 3 characters"));
        assert_eq!(
            errors.get("phone"),
            Some("Phone must use the format (00) 00000-0000")
        );
        assert_eq!(errors.get("confirm_password"), Some("Passwords do not match"));
    }

    #[test]
    fn test_profile_form() {
        let form = ProfileForm {
            name: "  Bia  ".into(),
            phone: "(21) 99876-5432".into(),
        };
        assert_eq!(form.validate().unwrap().name, "Bia");

        let form = ProfileForm {
            name: String::new(),
            phone: String::new(),
        };
        let errors = form.validate().unwrap_err();
        assert_eq!(errors.get("name"), Some("Name is required"));
        assert_eq!(errors.get("phone"), Some("Phone is required"));
    }

    #[test]
    fn test_address_form() {
        let form = AddressForm {
            street: "Rua das Flores".into(),
            number: "42".into(),
            complement: Some("   ".into()),
            district: "Centro".into(),
            city: "Campinas".into(),
            state: "sp".into(),
            postal_code: "13010-000".into(),
        };
        let address = form.validate().unwrap();
        assert_eq!(address.state, "SP");
        assert_eq!(address.complement, None);

        let errors = AddressForm::default().validate().unwrap_err();
        assert_eq!(errors.len(), 6);
        assert!(errors.get("complement").is_none());
        assert_eq!(errors.get("street"), Some("Street is required"));
    }

    #[test]
    fn test_parse_email() {
        assert_eq!(parse_email(" ana@example.com ").unwrap().as_str(), "ana@example.com");
        assert_eq!(parse_email("").unwrap_err().get("email"), Some("Email is required"));
    }

    #[test]
    fn test_display_lists_fields() {
        let mut errors = ValidationErrors::new();
        errors.add("phone", "bad");
        errors.add("name", "short");
        errors.add("name", "ignored");
        assert_eq!(errors.to_string(), "name: short; phone: bad");
    }
}
