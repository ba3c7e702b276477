//! Collaborator contracts for the Backend-as-a-Service.
//!
//! Every remote capability the app needs (authentication, relational
//! tables, object storage) is expressed as an async trait so services can
//! run against the REST client in production and an in-memory fake in
//! tests.
//!
//! # Architecture
//!
//! - [`rest::BackendClient`] implements every trait over HTTP
//! - [`Backends`] bundles one trait object per concern for [`crate::AppState`]
//! - Errors are [`BackendError`]; `NotFound` is kept distinct so callers can
//!   recover from a missing row

pub mod rest;

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::broadcast;

use foodtruck_core::{
    AddressId, CategoryId, Email, OrderId, OrderStatus, ProductId, ProfileId, SponsorId, UserId,
};

use crate::models::{
    Address, AppSettings, AuthEvent, AuthUser, Category, NewAddress, NewCategory, NewOrder,
    NewOrderItem, NewProduct, NewProfile, NewSponsor, Order, OrderItem, Product, Profile,
    ProfilePatch, Session, Sponsor,
};
use crate::storage::StorageError;

/// Errors that can occur when talking to the backend.
#[derive(Debug, Error)]
pub enum BackendError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The service answered with an error.
    #[error("backend error ({status}): {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Service-specific error code, when given.
        code: Option<String>,
        /// Human-readable message from the service.
        message: String,
    },

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// The requested row does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Rate limited by the service.
    #[error("rate limited, retry after {0} seconds")]
    RateLimited(u64),

    /// The call needs a signed-in session and there is none.
    #[error("not signed in")]
    Unauthenticated,

    /// Persisting the session locally failed.
    #[error("session storage error: {0}")]
    Storage(#[from] StorageError),
}

impl BackendError {
    /// Whether this is the "no such row" condition.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Message suitable for showing to the user.
    ///
    /// Service messages for client errors are passed through (they describe
    /// what the user did wrong, e.g. bad credentials); everything else is
    /// replaced by a generic text.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Api {
                status, message, ..
            } if (400..500).contains(status) && !message.is_empty() => message.clone(),
            Self::NotFound(_) => "Not found".to_string(),
            Self::RateLimited(_) => "Too many requests. Please try again shortly.".to_string(),
            Self::Unauthenticated => "Please sign in to continue".to_string(),
            Self::Http(_) => "Could not reach the server. Check your connection.".to_string(),
            _ => "Something went wrong. Please try again.".to_string(),
        }
    }
}

/// Filter for product listings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct ProductQuery {
    /// Only products in this category.
    pub category: Option<CategoryId>,
    /// Only products marked available.
    pub available_only: bool,
    /// Only featured products.
    pub featured_only: bool,
}

impl ProductQuery {
    /// Every product, for the back-office.
    pub const ALL: Self = Self {
        category: None,
        available_only: false,
        featured_only: false,
    };

    /// What customers can order, optionally within one category.
    #[must_use]
    pub const fn menu(category: Option<CategoryId>) -> Self {
        Self {
            category,
            available_only: true,
            featured_only: false,
        }
    }

    /// Available featured products for the home page.
    pub const FEATURED: Self = Self {
        category: None,
        available_only: true,
        featured_only: true,
    };
}

/// Authentication service.
#[async_trait]
pub trait AuthBackend: Send + Sync {
    /// The current session, refreshed if it had expired.
    async fn current_session(&self) -> Result<Option<Session>, BackendError>;

    async fn sign_in_with_password(
        &self,
        email: &Email,
        password: &str,
    ) -> Result<Session, BackendError>;

    /// Create an identity. Does not sign it in.
    async fn sign_up(&self, email: &Email, password: &str) -> Result<AuthUser, BackendError>;

    async fn sign_out(&self) -> Result<(), BackendError>;

    async fn send_password_reset(
        &self,
        email: &Email,
        redirect_url: &str,
    ) -> Result<(), BackendError>;

    /// Subscribe to auth-state changes.
    fn subscribe(&self) -> broadcast::Receiver<AuthEvent>;
}

/// The `perfis` table.
#[async_trait]
pub trait ProfileTable: Send + Sync {
    /// Fetch the profile of `user_id`, `NotFound` when there is none.
    async fn select_by_user_id(&self, user_id: UserId) -> Result<Profile, BackendError>;

    async fn insert(&self, profile: &NewProfile) -> Result<Profile, BackendError>;

    async fn update(&self, user_id: UserId, patch: &ProfilePatch) -> Result<(), BackendError>;

    /// Every profile, ordered by name.
    async fn list(&self) -> Result<Vec<Profile>, BackendError>;

    async fn set_admin(&self, id: ProfileId, is_admin: bool) -> Result<(), BackendError>;

    async fn delete(&self, id: ProfileId) -> Result<(), BackendError>;
}

/// The `categorias` and `produtos` tables.
#[async_trait]
pub trait CatalogTable: Send + Sync {
    /// Categories ordered by position.
    async fn list_categories(&self) -> Result<Vec<Category>, BackendError>;

    async fn insert_category(&self, category: &NewCategory) -> Result<Category, BackendError>;

    async fn update_category(
        &self,
        id: CategoryId,
        category: &NewCategory,
    ) -> Result<(), BackendError>;

    async fn delete_category(&self, id: CategoryId) -> Result<(), BackendError>;

    /// Products matching `query`, ordered by name.
    async fn list_products(&self, query: &ProductQuery) -> Result<Vec<Product>, BackendError>;

    async fn get_product(&self, id: ProductId) -> Result<Product, BackendError>;

    async fn insert_product(&self, product: &NewProduct) -> Result<Product, BackendError>;

    async fn update_product(&self, id: ProductId, product: &NewProduct)
    -> Result<(), BackendError>;

    async fn set_product_available(
        &self,
        id: ProductId,
        available: bool,
    ) -> Result<(), BackendError>;

    async fn set_product_featured(&self, id: ProductId, featured: bool)
    -> Result<(), BackendError>;

    async fn delete_product(&self, id: ProductId) -> Result<(), BackendError>;
}

/// The `enderecos` table.
#[async_trait]
pub trait AddressTable: Send + Sync {
    /// Addresses of `user_id`, default first.
    async fn list_for_user(&self, user_id: UserId) -> Result<Vec<Address>, BackendError>;

    async fn insert(
        &self,
        user_id: UserId,
        address: &NewAddress,
        is_default: bool,
    ) -> Result<Address, BackendError>;

    async fn update(&self, id: AddressId, address: &NewAddress) -> Result<(), BackendError>;

    /// Make `id` the only default address of `user_id`.
    async fn set_default(&self, user_id: UserId, id: AddressId) -> Result<(), BackendError>;

    async fn delete(&self, id: AddressId) -> Result<(), BackendError>;
}

/// The `pedidos` and `itens_pedido` tables.
#[async_trait]
pub trait OrderTable: Send + Sync {
    async fn insert_order(&self, order: &NewOrder) -> Result<Order, BackendError>;

    async fn insert_items(&self, items: &[NewOrderItem]) -> Result<(), BackendError>;

    /// Orders of `user_id`, newest first.
    async fn list_for_user(&self, user_id: UserId) -> Result<Vec<Order>, BackendError>;

    /// Every order, newest first.
    async fn list_all(&self) -> Result<Vec<Order>, BackendError>;

    async fn get(&self, id: OrderId) -> Result<Order, BackendError>;

    async fn items_for(&self, id: OrderId) -> Result<Vec<OrderItem>, BackendError>;

    async fn update_status(&self, id: OrderId, status: OrderStatus) -> Result<(), BackendError>;
}

/// The `patrocinadores` table.
#[async_trait]
pub trait SponsorTable: Send + Sync {
    /// Sponsors ordered by position.
    async fn list(&self) -> Result<Vec<Sponsor>, BackendError>;

    async fn insert(&self, sponsor: &NewSponsor, position: i32) -> Result<Sponsor, BackendError>;

    async fn update(&self, id: SponsorId, sponsor: &NewSponsor) -> Result<(), BackendError>;

    async fn delete(&self, id: SponsorId) -> Result<(), BackendError>;

    async fn set_active(&self, id: SponsorId, active: bool) -> Result<(), BackendError>;

    async fn set_position(&self, id: SponsorId, position: i32) -> Result<(), BackendError>;
}

/// The `configuracoes` table.
#[async_trait]
pub trait SettingsTable: Send + Sync {
    /// The configuration row, if it has been created.
    async fn fetch(&self) -> Result<Option<AppSettings>, BackendError>;

    async fn upsert(&self, settings: &AppSettings) -> Result<(), BackendError>;
}

/// Public file storage.
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    /// Upload `bytes` to `path` and return its public URL.
    async fn upload(
        &self,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<String, BackendError>;
}

/// One handle per backend concern.
#[derive(Clone)]
pub struct Backends {
    pub auth: Arc<dyn AuthBackend>,
    pub profiles: Arc<dyn ProfileTable>,
    pub catalog: Arc<dyn CatalogTable>,
    pub addresses: Arc<dyn AddressTable>,
    pub orders: Arc<dyn OrderTable>,
    pub sponsors: Arc<dyn SponsorTable>,
    pub settings: Arc<dyn SettingsTable>,
    pub objects: Arc<dyn ObjectStorage>,
}

impl Backends {
    /// Use one implementation for every concern.
    pub fn from_shared<B>(backend: Arc<B>) -> Self
    where
        B: AuthBackend
            + ProfileTable
            + CatalogTable
            + AddressTable
            + OrderTable
            + SponsorTable
            + SettingsTable
            + ObjectStorage
            + 'static,
    {
        Self {
            auth: backend.clone(),
            profiles: backend.clone(),
            catalog: backend.clone(),
            addresses: backend.clone(),
            orders: backend.clone(),
            sponsors: backend.clone(),
            settings: backend.clone(),
            objects: backend,
        }
    }
}

impl std::fmt::Debug for Backends {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Backends").finish_non_exhaustive()
    }
}
