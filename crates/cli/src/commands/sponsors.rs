//! Sponsor commands.

use foodtruck_core::SponsorId;
use foodtruck_storefront::AppError;
use foodtruck_storefront::services::admin::{AdminService, Direction, SponsorForm};

use crate::SponsorAction;

pub async fn run(admin: &AdminService, action: SponsorAction) -> Result<(), AppError> {
    match action {
        SponsorAction::List | SponsorAction::Up { .. } | SponsorAction::Down { .. } => {}
        SponsorAction::Add {
            name,
            logo_url,
            website,
            inactive,
        } => {
            let form = SponsorForm {
                name,
                logo_url,
                website,
                active: !inactive,
            };
            admin.create_sponsor(&form).await?;
        }
        SponsorAction::Toggle { id } => {
            let sponsor = admin
                .sponsors()
                .await?
                .into_iter()
                .find(|s| s.id == id)
                .ok_or_else(|| AppError::BadRequest(format!("no sponsor {id}")))?;
            admin.toggle_sponsor(&sponsor).await?;
        }
        SponsorAction::Delete { id } => admin.delete_sponsor(id).await?,
    }
    print(admin).await
}

pub async fn reorder(
    admin: &AdminService,
    id: SponsorId,
    direction: Direction,
) -> Result<(), AppError> {
    admin.move_sponsor(id, direction).await?;
    print(admin).await
}

async fn print(admin: &AdminService) -> Result<(), AppError> {
    for sponsor in admin.sponsors().await? {
        let shown = if sponsor.active { " " } else { "x" };
        println!(
            "{shown} {:>3}  {}  {:<24} {}",
            sponsor.position, sponsor.id, sponsor.name, sponsor.website
        );
    }
    Ok(())
}
