//! User commands.

use foodtruck_core::UserId;
use foodtruck_storefront::AppError;
use foodtruck_storefront::models::Profile;
use foodtruck_storefront::services::admin::AdminService;

use crate::UserAction;

pub async fn run(admin: &AdminService, action: UserAction) -> Result<(), AppError> {
    match action {
        UserAction::List { search } => {
            for profile in admin.users(&search).await? {
                let role = if profile.is_admin { "admin" } else { "" };
                println!(
                    "{}  {:<28} {:<16} {role}",
                    profile.user_id, profile.name, profile.phone
                );
            }
        }
        UserAction::ToggleAdmin { user } => {
            let profile = find(admin, user).await?;
            admin.toggle_admin(&profile).await?;
        }
        UserAction::Delete { user } => {
            let profile = find(admin, user).await?;
            admin.delete_user(&profile).await?;
        }
    }
    Ok(())
}

async fn find(admin: &AdminService, user: UserId) -> Result<Profile, AppError> {
    admin
        .users("")
        .await?
        .into_iter()
        .find(|p| p.user_id == user)
        .ok_or_else(|| AppError::BadRequest(format!("no profile for user {user}")))
}
