//! Sponsor management.

use foodtruck_core::SponsorId;

use super::{AdminError, AdminService};
use crate::models::{NewSponsor, Sponsor};
use crate::services::auth::validation::ValidationErrors;

/// Which way to move a sponsor in the display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
}

#[derive(Debug, Clone)]
pub struct SponsorForm {
    pub name: String,
    pub logo_url: String,
    pub website: String,
    pub active: bool,
}

impl Default for SponsorForm {
    fn default() -> Self {
        Self {
            name: String::new(),
            logo_url: String::new(),
            website: String::new(),
            active: true,
        }
    }
}

impl SponsorForm {
    fn validate(&self) -> Result<NewSponsor, ValidationErrors> {
        let mut errors = ValidationErrors::new();
        let name = self.name.trim();
        let logo_url = self.logo_url.trim();
        let website = self.website.trim();
        if name.is_empty() {
            errors.add("name", "Name is required");
        }
        if logo_url.is_empty() {
            errors.add("logo_url", "Logo URL is required");
        }
        if website.is_empty() {
            errors.add("website", "Website is required");
        }
        errors.finish(|| NewSponsor {
            name: name.to_string(),
            logo_url: logo_url.to_string(),
            website: website.to_string(),
            active: self.active,
        })
    }
}

/// Position for a sponsor appended after `sponsors`.
fn next_position(sponsors: &[Sponsor]) -> i32 {
    sponsors
        .iter()
        .map(|s| s.position)
        .max()
        .map_or(1, |max| max.saturating_add(1))
}

/// Position writes that move `id` one step in `direction`.
///
/// The list is reordered and renumbered `1..`; only sponsors whose position
/// changes are returned. Empty when `id` is unknown or already at the edge.
fn reorder(sponsors: &[Sponsor], id: SponsorId, direction: Direction) -> Vec<(SponsorId, i32)> {
    let Some(index) = sponsors.iter().position(|s| s.id == id) else {
        return Vec::new();
    };
    let neighbour = match direction {
        Direction::Up => index.checked_sub(1),
        Direction::Down => Some(index + 1).filter(|&i| i < sponsors.len()),
    };
    let Some(neighbour) = neighbour else {
        return Vec::new();
    };

    let mut order: Vec<&Sponsor> = sponsors.iter().collect();
    order.swap(index, neighbour);
    order
        .into_iter()
        .zip(1..)
        .filter(|(sponsor, position)| sponsor.position != *position)
        .map(|(sponsor, position)| (sponsor.id, position))
        .collect()
}

impl AdminService {
    /// Sponsors in display order.
    ///
    /// # Errors
    ///
    /// Returns `AdminError::Forbidden` for non-administrators and
    /// `AdminError::Backend` when the lookup fails.
    pub async fn sponsors(&self) -> Result<Vec<Sponsor>, AdminError> {
        self.require_admin()?;
        self.backends
            .sponsors
            .list()
            .await
            .map_err(|e| self.fail(e, "Failed to load sponsors"))
    }

    /// Add a sponsor at the end of the display order.
    ///
    /// # Errors
    ///
    /// Returns `AdminError::Validation` when a field is missing and
    /// `AdminError::Backend` when the insert fails.
    pub async fn create_sponsor(&self, form: &SponsorForm) -> Result<Sponsor, AdminError> {
        self.require_admin()?;
        let sponsor = form.validate().inspect_err(|_| {
            self.notifier.error("Fill in all required fields");
        })?;
        let position = next_position(&self.sponsors().await?);
        let created = self
            .backends
            .sponsors
            .insert(&sponsor, position)
            .await
            .map_err(|e| self.fail(e, "Failed to add sponsor"))?;
        self.notifier.success("Sponsor added successfully");
        Ok(created)
    }

    /// # Errors
    ///
    /// Returns `AdminError::Validation` when a field is missing and
    /// `AdminError::Backend` when the update fails.
    pub async fn update_sponsor(&self, id: SponsorId, form: &SponsorForm) -> Result<(), AdminError> {
        self.require_admin()?;
        let sponsor = form.validate().inspect_err(|_| {
            self.notifier.error("Fill in all required fields");
        })?;
        self.backends
            .sponsors
            .update(id, &sponsor)
            .await
            .map_err(|e| self.fail(e, "Failed to update sponsor"))?;
        self.notifier.success("Sponsor updated successfully");
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `AdminError::Backend` when the delete fails.
    pub async fn delete_sponsor(&self, id: SponsorId) -> Result<(), AdminError> {
        self.require_admin()?;
        self.backends
            .sponsors
            .delete(id)
            .await
            .map_err(|e| self.fail(e, "Failed to delete sponsor"))?;
        self.notifier.success("Sponsor deleted successfully");
        Ok(())
    }

    /// Show or hide a sponsor. Returns the new flag.
    ///
    /// # Errors
    ///
    /// Returns `AdminError::Backend` when the update fails.
    pub async fn toggle_sponsor(&self, sponsor: &Sponsor) -> Result<bool, AdminError> {
        self.require_admin()?;
        let active = !sponsor.active;
        self.backends
            .sponsors
            .set_active(sponsor.id, active)
            .await
            .map_err(|e| self.fail(e, "Failed to update sponsor status"))?;
        self.notifier.success(if active {
            "Sponsor enabled"
        } else {
            "Sponsor disabled"
        });
        Ok(active)
    }

    /// Swap a sponsor with its neighbour. Moving past either end is a no-op.
    ///
    /// # Errors
    ///
    /// Returns `AdminError::NotFound` for an unknown id and
    /// `AdminError::Backend` when a write fails.
    pub async fn move_sponsor(&self, id: SponsorId, direction: Direction) -> Result<(), AdminError> {
        self.require_admin()?;
        let sponsors = self.sponsors().await?;
        if !sponsors.iter().any(|s| s.id == id) {
            return Err(AdminError::NotFound("Sponsor".to_string()));
        }
        for (sponsor_id, position) in reorder(&sponsors, id, direction) {
            self.backends
                .sponsors
                .set_position(sponsor_id, position)
                .await
                .map_err(|e| self.fail(e, "Failed to reorder sponsors"))?;
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn sponsor(position: i32) -> Sponsor {
        Sponsor {
            id: SponsorId::random(),
            name: format!("Sponsor {position}"),
            logo_url: "https://example.com/logo.png".into(),
            website: "https://example.com".into(),
            active: true,
            position,
        }
    }

    #[test]
    fn test_next_position() {
        assert_eq!(next_position(&[]), 1);
        assert_eq!(next_position(&[sponsor(1), sponsor(4)]), 5);
    }

    #[test]
    fn test_move_up_swaps_neighbours() {
        let sponsors = vec![sponsor(1), sponsor(2), sponsor(3)];
        let writes = reorder(&sponsors, sponsors[2].id, Direction::Up);
        assert_eq!(writes, vec![(sponsors[2].id, 2), (sponsors[1].id, 3)]);
    }

    #[test]
    fn test_move_at_edges_is_noop() {
        let sponsors = vec![sponsor(1), sponsor(2)];
        assert!(reorder(&sponsors, sponsors[0].id, Direction::Up).is_empty());
        assert!(reorder(&sponsors, sponsors[1].id, Direction::Down).is_empty());
        assert!(reorder(&sponsors, SponsorId::random(), Direction::Down).is_empty());
    }

    #[test]
    fn test_move_renumbers_equal_positions() {
        let sponsors = vec![sponsor(0), sponsor(0)];
        let writes = reorder(&sponsors, sponsors[0].id, Direction::Down);
        assert_eq!(writes, vec![(sponsors[1].id, 1), (sponsors[0].id, 2)]);
    }

    #[test]
    fn test_form_requires_every_field() {
        let errors = SponsorForm::default().validate().unwrap_err();
        assert_eq!(errors.len(), 3);
    }
}
