//! Branding commands.

use foodtruck_storefront::{AppError, AppState};
use foodtruck_storefront::services::admin::SettingsForm;

use crate::SettingsAction;

pub async fn run(state: &AppState, action: SettingsAction) -> Result<(), AppError> {
    let current = state.settings().current().await;
    let settings = match action {
        SettingsAction::Show => current,
        SettingsAction::Set {
            app_name,
            logo_url,
            primary_color,
            secondary_color,
        } => {
            let mut form = SettingsForm::from(current);
            if let Some(app_name) = app_name {
                form.app_name = app_name;
            }
            if let Some(logo_url) = logo_url {
                form.logo_url = logo_url;
            }
            if let Some(color) = primary_color {
                form.primary_color = color;
            }
            if let Some(color) = secondary_color {
                form.secondary_color = color;
            }
            state.admin().save_settings(&form).await?
        }
    };
    println!("App name:         {}", settings.app_name);
    println!("Logo:             {}", settings.logo_url);
    println!("Primary colour:   {}", settings.primary_color);
    println!("Secondary colour: {}", settings.secondary_color);
    Ok(())
}
