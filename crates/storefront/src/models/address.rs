//! Delivery addresses.

use chrono::{DateTime, Utc};

use foodtruck_core::{AddressId, UserId};

/// A saved delivery address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Address {
    pub id: AddressId,
    pub user_id: UserId,
    pub street: String,
    pub number: String,
    pub complement: Option<String>,
    pub district: String,
    pub city: String,
    pub state: String,
    pub postal_code: String,
    pub is_default: bool,
    pub created_at: Option<DateTime<Utc>>,
}

impl Address {
    /// Single-line form written onto orders.
    #[must_use]
    pub fn one_line(&self) -> String {
        let mut line = format!(
            "{}, {}, {}, {} - {}, {}",
            self.street, self.number, self.district, self.city, self.state, self.postal_code
        );
        if let Some(complement) = self.complement.as_deref().filter(|c| !c.trim().is_empty()) {
            line.push_str(" (");
            line.push_str(complement);
            line.push(')');
        }
        line
    }
}

/// Fields for creating or updating an address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAddress {
    pub street: String,
    pub number: String,
    pub complement: Option<String>,
    pub district: String,
    pub city: String,
    pub state: String,
    pub postal_code: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn address(complement: Option<&str>) -> Address {
        Address {
            id: AddressId::random(),
            user_id: UserId::random(),
            street: "Rua das Flores".into(),
            number: "12".into(),
            complement: complement.map(Into::into),
            district: "Centro".into(),
            city: "Campinas".into(),
            state: "SP".into(),
            postal_code: "13010-000".into(),
            is_default: true,
            created_at: None,
        }
    }

    #[test]
    fn test_one_line_with_complement() {
        assert_eq!(
            address(Some("apto 3")).one_line(),
            "Rua das Flores, 12, Centro, Campinas - SP, 13010-000 (apto 3)"
        );
    }

    #[test]
    fn test_one_line_without_complement() {
        assert_eq!(
            address(None).one_line(),
            "Rua das Flores, 12, Centro, Campinas - SP, 13010-000"
        );
        assert_eq!(address(Some("  ")).one_line(), address(None).one_line());
    }
}
