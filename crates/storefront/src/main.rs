//! Foodtruck customer client.
//!
//! # Usage
//!
//! ```bash
//! foodtruck login -e maria@example.com -p secret123
//! foodtruck menu --category <uuid>
//! foodtruck cart add <product-uuid> --quantity 2 --note "no onions"
//! foodtruck addresses list
//! foodtruck checkout --address <uuid> --payment pix
//! foodtruck orders
//! ```
//!
//! Every run restores the persisted session before executing the command;
//! notices raised by the command are printed when it finishes.

#![cfg_attr(not(test), forbid(unsafe_code))]
#![allow(clippy::print_stdout, clippy::print_stderr)]

use std::num::NonZeroU32;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tokio::sync::mpsc;

use foodtruck_core::{AddressId, CategoryId, OrderId, PaymentMethod, ProductId};
use foodtruck_storefront::config::StorefrontConfig;
use foodtruck_storefront::error::{self, AppError};
use foodtruck_storefront::models::OrderWithItems;
use foodtruck_storefront::notify::{ChannelNotifier, Notice, NoticeKind};
use foodtruck_storefront::services::addresses::preselected;
use foodtruck_storefront::services::auth::validation::{
    AddressForm, LoginForm, ProfileForm, RegistrationForm,
};
use foodtruck_storefront::{AppState, telemetry};

#[derive(Parser)]
#[command(name = "foodtruck")]
#[command(author, version, about = "Order from the food truck")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sign in with email and password
    Login {
        #[arg(short, long)]
        email: String,
        #[arg(short, long)]
        password: String,
    },
    /// Sign out and clear local account data
    Logout,
    /// Create an account
    Register {
        #[arg(short, long)]
        name: String,
        #[arg(short, long)]
        email: String,
        /// Phone as (00) 00000-0000; digits are formatted automatically
        #[arg(long)]
        phone: String,
        #[arg(short, long)]
        password: String,
        #[arg(long)]
        confirm_password: String,
    },
    /// Send a password recovery email
    ResetPassword {
        #[arg(short, long)]
        email: String,
    },
    /// Show the signed-in account
    Whoami,
    /// List the menu
    Menu {
        /// Only show this category
        #[arg(short, long)]
        category: Option<CategoryId>,
    },
    /// List menu categories
    Categories,
    /// Inspect or change the cart
    Cart {
        #[command(subcommand)]
        action: CartAction,
    },
    /// Manage delivery addresses
    Addresses {
        #[command(subcommand)]
        action: AddressAction,
    },
    /// Place an order for the cart
    Checkout {
        /// Delivery address; defaults to the default address
        #[arg(short, long)]
        address: Option<AddressId>,
        /// `credit_card`, `cash` or `pix`
        #[arg(short, long, default_value = "credit_card")]
        payment: PaymentMethod,
    },
    /// Show order history
    Orders {
        /// Show one order
        #[arg(long)]
        id: Option<OrderId>,
    },
    /// Update name and phone
    Profile {
        #[arg(short, long)]
        name: String,
        #[arg(long)]
        phone: String,
    },
}

#[derive(Subcommand)]
enum CartAction {
    /// List the cart
    Show,
    /// Add a product
    Add {
        product: ProductId,
        #[arg(short, long, default_value = "1")]
        quantity: NonZeroU32,
        #[arg(long)]
        note: Option<String>,
    },
    /// Remove a product
    Remove { product: ProductId },
    /// Set a product's quantity; zero or less removes it
    Set {
        product: ProductId,
        #[arg(allow_negative_numbers = true)]
        quantity: i64,
    },
    /// Empty the cart
    Clear,
}

#[derive(Subcommand)]
enum AddressAction {
    /// List saved addresses
    List,
    /// Save a new address
    Add {
        #[arg(long)]
        street: String,
        #[arg(long)]
        number: String,
        #[arg(long)]
        complement: Option<String>,
        #[arg(long)]
        district: String,
        #[arg(long)]
        city: String,
        /// Two-letter state abbreviation
        #[arg(long)]
        state: String,
        #[arg(long)]
        postal_code: String,
    },
    /// Make an address the default
    Default { id: AddressId },
    /// Remove an address
    Delete { id: AddressId },
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

    // Sentry must be up before the subscriber so the layer can report.
    let _sentry_guard = telemetry::init_sentry(&config);
    telemetry::init_tracing("foodtruck_storefront=warn,foodtruck=info");

    let (notifier, mut notices) = ChannelNotifier::new();
    let state = AppState::from_config(config, Arc::new(notifier));

    let auth_state = state.auth().bootstrap().await;
    if let Some(user) = &auth_state.user {
        error::set_sentry_user(&user.id, user.email.as_deref());
    }
    let subscription = state.auth().listen();

    let result = run(&state, cli.command).await;
    state.auth().wait_for_background_refresh().await;
    subscription.unsubscribe();
    print_notices(&mut notices);

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
    match command {
        Commands::Login { email, password } => {
            let route = state.auth().sign_in(&LoginForm { email, password }).await?;
            if let Some(user) = state.auth().state().user {
                error::set_sentry_user(&user.id, user.email.as_deref());
            }
            println!("Next: {route}");
        }
        Commands::Logout => {
            state.auth().sign_out().await?;
            error::clear_sentry_user();
        }
        Commands::Register {
            name,
            email,
            phone,
            password,
            confirm_password,
        } => {
            let form = RegistrationForm {
                name,
                email,
                phone: foodtruck_core::Phone::format_input(&phone),
                password,
                confirm_password,
            };
            let route = state.auth().sign_up(&form).await?;
            println!("Next: {route}");
        }
        Commands::ResetPassword { email } => {
            state.auth().reset_password(&email).await?;
        }
        Commands::Whoami => whoami(state),
        Commands::Menu { category } => {
            for product in state.catalog().menu(category).await? {
                let marker = if product.featured { "*" } else { " " };
                println!("{marker} {}  {:<32} {}", product.id, product.name, product.price);
            }
        }
        Commands::Categories => {
            for category in state.catalog().categories().await? {
                println!("{}  {}", category.id, category.name);
            }
        }
        Commands::Cart { action } => cart(state, action).await?,
        Commands::Addresses { action } => addresses(state, action).await?,
        Commands::Checkout { address, payment } => {
            let address_id = match address {
                Some(id) => id,
                None => {
                    let saved = state.addresses().list().await?;
                    preselected(&saved).map(|a| a.id).ok_or_else(|| {
                        AppError::BadRequest("Add a delivery address first".to_string())
                    })?
                }
            };
            let summary = state.checkout().summary();
            println!("Subtotal: {}", summary.subtotal);
            println!("Delivery: {}", summary.delivery_fee);
            println!("Total:    {}", summary.total);
            let placed = state.checkout().place_order(address_id, payment).await?;
            println!("Order {} placed", placed.order.id);
        }
        Commands::Orders { id: Some(id) } => print_order(&state.orders().get(id).await?),
        Commands::Orders { id: None } => {
            let orders = state.orders().list().await?;
            if orders.is_empty() {
                println!("No orders yet");
            }
            for order in &orders {
                print_order(order);
            }
        }
        Commands::Profile { name, phone } => {
            let form = ProfileForm {
                name,
                phone: foodtruck_core::Phone::format_input(&phone),
            };
            state.profile().update(&form).await?;
        }
    }
    Ok(())
}

fn whoami(state: &AppState) {
    let auth = state.auth().state();
    let Some(user) = auth.user else {
        println!("Not signed in");
        return;
    };
    println!("User:  {}", user.id);
    if let Some(email) = user.email {
        println!("Email: {email}");
    }
    if let Some(profile) = auth.profile {
        println!("Name:  {}", profile.name);
        println!("Phone: {}", profile.phone);
        if profile.is_admin {
            println!("Role:  administrator");
        }
    }
}

async fn cart(state: &AppState, action: CartAction) -> Result<(), AppError> {
    let cart = state.cart();
    match action {
        CartAction::Show => {}
        CartAction::Add {
            product,
            quantity,
            note,
        } => {
            let product = state.catalog().product(product).await?;
            if !product.available {
                return Err(AppError::BadRequest(format!(
                    "{} is not available right now",
                    product.name
                )));
            }
            cart.add(&product, quantity, note.as_deref());
        }
        CartAction::Remove { product } => {
            cart.remove(product);
        }
        CartAction::Set { product, quantity } => cart.set_quantity(product, quantity),
        CartAction::Clear => cart.clear(),
    }

    let items = cart.items();
    if items.is_empty() {
        println!("Your cart is empty");
        return Ok(());
    }
    for line in &items {
        println!(
            "{:>3} x {:<32} {}",
            line.quantity,
            line.product.name,
            line.line_total()
        );
        if let Some(note) = &line.note {
            println!("      note: {note}");
        }
    }
    println!("{} items, {}", cart.total_item_count(), cart.total_price());
    Ok(())
}

async fn addresses(state: &AppState, action: AddressAction) -> Result<(), AppError> {
    let service = state.addresses();
    match action {
        AddressAction::List => {}
        AddressAction::Add {
            street,
            number,
            complement,
            district,
            city,
            state: region,
            postal_code,
        } => {
            let form = AddressForm {
                street,
                number,
                complement,
                district,
                city,
                state: region,
                postal_code,
            };
            service.add(&form).await?;
        }
        AddressAction::Default { id } => service.set_default(id).await?,
        AddressAction::Delete { id } => service.delete(id).await?,
    }

    for address in service.list().await? {
        let marker = if address.is_default { "*" } else { " " };
        println!("{marker} {}  {}", address.id, address.one_line());
    }
    Ok(())
}

fn print_order(entry: &OrderWithItems) {
    let order = &entry.order;
    println!(
        "{}  {}  {:<16} {}",
        order.id,
        order.created_at.format("%d/%m/%Y %H:%M"),
        order.status.label(),
        order.total
    );
    for item in &entry.items {
        let name = item.product_name.as_deref().unwrap_or("(removed product)");
        println!("    {:>3} x {name:<28} {}", item.quantity, item.line_total());
    }
}

fn print_notices(notices: &mut mpsc::UnboundedReceiver<Notice>) {
    while let Ok(notice) = notices.try_recv() {
        match notice.kind {
            NoticeKind::Success => println!("✓ {}", notice.message),
            NoticeKind::Error => eprintln!("✗ {}", notice.message),
        }
    }
}
