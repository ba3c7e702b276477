//! Application-level user records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use foodtruck_core::{ProfileId, UserId};

/// A user's profile, distinct from their authentication identity.
///
/// This is also the shape cached in durable storage between runs. Fields the
/// client does not know about are kept in `extra` so a cached profile
/// round-trips unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    #[serde(default)]
    pub id: Option<ProfileId>,
    pub user_id: UserId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub is_admin: bool,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Row to insert for a new profile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewProfile {
    pub user_id: UserId,
    pub name: String,
    pub phone: String,
    pub is_admin: bool,
}

impl NewProfile {
    /// The empty profile created on first login when none exists.
    #[must_use]
    pub const fn empty(user_id: UserId) -> Self {
        Self {
            user_id,
            name: String::new(),
            phone: String::new(),
            is_admin: false,
        }
    }
}

/// Editable profile fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfilePatch {
    pub name: String,
    pub phone: String,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_cached_profile_keeps_unknown_fields() {
        let raw = r#"{
            "user_id": "6f1c9d0e-6a55-4d4b-9a57-2a1f4d8c0b11",
            "name": "Ana",
            "phone": "(11) 91234-5678",
            "is_admin": false,
            "avatar": "cat.png"
        }"#;
        let profile: Profile = serde_json::from_str(raw).unwrap();
        assert_eq!(profile.name, "Ana");
        assert_eq!(profile.extra.get("avatar").unwrap(), "cat.png");

        let again: Profile =
            serde_json::from_str(&serde_json::to_string(&profile).unwrap()).unwrap();
        assert_eq!(again, profile);
    }
}
