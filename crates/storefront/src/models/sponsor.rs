//! Sponsors shown on the storefront.

use foodtruck_core::SponsorId;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sponsor {
    pub id: SponsorId,
    pub name: String,
    pub logo_url: String,
    pub website: String,
    pub active: bool,
    /// Display position, ascending.
    pub position: i32,
}

/// Fields for creating or updating a sponsor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSponsor {
    pub name: String,
    pub logo_url: String,
    pub website: String,
    pub active: bool,
}
