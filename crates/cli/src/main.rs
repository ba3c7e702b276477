//! Foodtruck back-office CLI.
//!
//! # Usage
//!
//! ```bash
//! # Sign in with the customer client first; the session is shared
//! foodtruck login -e admin@example.com -p secret123
//!
//! ft-admin dashboard
//! ft-admin orders list --status pending
//! ft-admin orders status <order-uuid> preparing
//! ft-admin products add --name "X-Burger" --description "..." --price "24,90" --category <uuid> --image burger.jpg
//! ft-admin sponsors up <sponsor-uuid>
//! ft-admin settings set --app-name "Foodtruck" --primary-color "#ff0000"
//! ```
//!
//! # Commands
//!
//! - `dashboard` - Sales figures and recent orders
//! - `orders` - List, inspect and advance orders
//! - `products` / `categories` - Menu management
//! - `users` - Profiles and the admin flag
//! - `sponsors` - Sponsors and their display order
//! - `settings` - App name, logo and colours

#![cfg_attr(not(test), forbid(unsafe_code))]
#![allow(clippy::print_stdout, clippy::print_stderr)]

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};

use foodtruck_core::{CategoryId, OrderId, OrderStatus, ProductId, SponsorId, UserId};
use foodtruck_storefront::config::StorefrontConfig;
use foodtruck_storefront::error::{self, AppError};
use foodtruck_storefront::notify::{ChannelNotifier, NoticeKind};
use foodtruck_storefront::services::admin::{AdminError, Direction};
use foodtruck_storefront::{AppState, telemetry};

mod commands;

#[derive(Parser)]
#[command(name = "ft-admin")]
#[command(author, version, about = "Foodtruck back-office tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show sales figures and recent orders
    Dashboard,
    /// Manage orders
    Orders {
        #[command(subcommand)]
        action: OrderAction,
    },
    /// Manage products
    Products {
        #[command(subcommand)]
        action: ProductAction,
    },
    /// Manage categories
    Categories {
        #[command(subcommand)]
        action: CategoryAction,
    },
    /// Manage users
    Users {
        #[command(subcommand)]
        action: UserAction,
    },
    /// Manage sponsors
    Sponsors {
        #[command(subcommand)]
        action: SponsorAction,
    },
    /// Show or change branding
    Settings {
        #[command(subcommand)]
        action: SettingsAction,
    },
}

#[derive(Subcommand)]
enum OrderAction {
    /// List orders, newest first
    List {
        /// Part of the order id
        #[arg(short, long, default_value = "")]
        search: String,
        /// `pending`, `preparing`, `delivery`, `completed` or `cancelled`
        #[arg(long)]
        status: Option<OrderStatus>,
    },
    /// Show one order with its items
    Show { id: OrderId },
    /// Move an order to a new status
    Status { id: OrderId, status: OrderStatus },
}

#[derive(Subcommand)]
enum ProductAction {
    /// List products
    List {
        #[arg(short, long, default_value = "")]
        search: String,
        #[arg(short, long)]
        category: Option<CategoryId>,
    },
    /// Create a product
    Add(ProductArgs),
    /// Edit a product; omitted fields keep their value
    Edit {
        id: ProductId,
        #[command(flatten)]
        fields: ProductEdit,
    },
    /// Flip availability
    ToggleAvailable { id: ProductId },
    /// Flip the featured flag
    ToggleFeatured { id: ProductId },
    /// Delete a product
    Delete { id: ProductId },
}

#[derive(clap::Args)]
struct ProductArgs {
    #[arg(long)]
    name: String,
    #[arg(long)]
    description: String,
    /// Price such as 24.90 or "24,90"
    #[arg(long)]
    price: String,
    #[arg(long)]
    category: CategoryId,
    /// Hide from the menu
    #[arg(long)]
    unavailable: bool,
    #[arg(long)]
    featured: bool,
    /// Image file to upload
    #[arg(long)]
    image: Option<PathBuf>,
}

#[derive(clap::Args)]
struct ProductEdit {
    #[arg(long)]
    name: Option<String>,
    #[arg(long)]
    description: Option<String>,
    #[arg(long)]
    price: Option<String>,
    #[arg(long)]
    category: Option<CategoryId>,
    #[arg(long)]
    image: Option<PathBuf>,
}

#[derive(Subcommand)]
enum CategoryAction {
    /// List categories
    List,
    /// Create a category
    Add {
        #[arg(long)]
        name: String,
        #[arg(long)]
        position: Option<i32>,
        /// Image file to upload
        #[arg(long)]
        image: Option<PathBuf>,
    },
    /// Rename a category or replace its image
    Edit {
        id: CategoryId,
        #[arg(long)]
        name: String,
        #[arg(long)]
        position: Option<i32>,
        #[arg(long)]
        image: Option<PathBuf>,
    },
    /// Delete a category
    Delete { id: CategoryId },
}

#[derive(Subcommand)]
enum UserAction {
    /// List users
    List {
        /// Part of the name or phone
        #[arg(short, long, default_value = "")]
        search: String,
    },
    /// Grant or revoke administrator access
    ToggleAdmin { user: UserId },
    /// Delete a user's profile
    Delete { user: UserId },
}

#[derive(Subcommand)]
enum SponsorAction {
    /// List sponsors in display order
    List,
    /// Add a sponsor at the end
    Add {
        #[arg(long)]
        name: String,
        #[arg(long)]
        logo_url: String,
        #[arg(long)]
        website: String,
        /// Add hidden
        #[arg(long)]
        inactive: bool,
    },
    /// Show or hide a sponsor
    Toggle { id: SponsorId },
    /// Move one place earlier
    Up { id: SponsorId },
    /// Move one place later
    Down { id: SponsorId },
    /// Delete a sponsor
    Delete { id: SponsorId },
}

#[derive(Subcommand)]
enum SettingsAction {
    /// Print the current settings
    Show,
    /// Change settings; omitted fields keep their value
    Set {
        #[arg(long)]
        app_name: Option<String>,
        #[arg(long)]
        logo_url: Option<String>,
        #[arg(long)]
        primary_color: Option<String>,
        #[arg(long)]
        secondary_color: Option<String>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match StorefrontConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{e}");
            return ExitCode::from(AppError::from(e).exit_status());
        }
    };

    let _sentry_guard = telemetry::init_sentry(&config);
    telemetry::init_tracing("foodtruck_storefront=warn,ft_admin=info");

    let (notifier, mut notices) = ChannelNotifier::new();
    let state = AppState::from_config(config, Arc::new(notifier));

    // The cached profile may be stale; settle the admin flag before acting.
    let auth = state.auth().bootstrap().await;
    state.auth().wait_for_background_refresh().await;
    if let Some(user) = &auth.user {
        error::set_sentry_user(&user.id, user.email.as_deref());
    }

    let result = if state.auth().is_admin() {
        run(&state, cli.command).await
    } else {
        Err(AppError::Admin(AdminError::Forbidden))
    };

    while let Ok(notice) = notices.try_recv() {
        match notice.kind {
            NoticeKind::Success => println!("✓ {}", notice.message),
            NoticeKind::Error => eprintln!("✗ {}", notice.message),
        }
    }

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            e.report();
            eprintln!("error: {}", e.user_message());
            ExitCode::from(e.exit_status())
        }
    }
}

async fn run(state: &AppState, command: Commands) -> Result<(), AppError> {
    let admin = state.admin();
    match command {
        Commands::Dashboard => commands::orders::dashboard(admin).await,
        Commands::Orders { action } => match action {
            OrderAction::List { search, status } => {
                commands::orders::list(admin, search, status).await
            }
            OrderAction::Show { id } => commands::orders::show(admin, id).await,
            OrderAction::Status { id, status } => Ok(admin.set_order_status(id, status).await?),
        },
        Commands::Products { action } => match action {
            ProductAction::List { search, category } => {
                commands::catalog::list_products(admin, &search, category).await
            }
            ProductAction::Add(args) => commands::catalog::add_product(admin, args).await,
            ProductAction::Edit { id, fields } => {
                commands::catalog::edit_product(admin, id, fields).await
            }
            ProductAction::ToggleAvailable { id } => {
                let product = admin.product(id).await?;
                admin.toggle_product_available(&product).await?;
                Ok(())
            }
            ProductAction::ToggleFeatured { id } => {
                let product = admin.product(id).await?;
                admin.toggle_product_featured(&product).await?;
                Ok(())
            }
            ProductAction::Delete { id } => Ok(admin.delete_product(id).await?),
        },
        Commands::Categories { action } => commands::catalog::categories(admin, action).await,
        Commands::Users { action } => commands::users::run(admin, action).await,
        Commands::Sponsors { action } => match action {
            SponsorAction::Up { id } => commands::sponsors::reorder(admin, id, Direction::Up).await,
            SponsorAction::Down { id } => {
                commands::sponsors::reorder(admin, id, Direction::Down).await
            }
            other => commands::sponsors::run(admin, other).await,
        },
        Commands::Settings { action } => commands::settings::run(state, action).await,
    }
}
