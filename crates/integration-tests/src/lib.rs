//! Integration tests for the Foodtruck client.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p foodtruck-integration-tests
//! ```
//!
//! Scenarios run the real stores and services from `foodtruck-storefront`
//! against [`FakeBackend`], an in-memory stand-in for the hosted backend
//! with fault injection and a gate for holding profile reads.
//!
//! # Test Categories
//!
//! - `cart_identity` - Cart persistence and isolation between accounts
//! - `auth_profile` - Session restore, profile self-healing and stale caches
//! - `checkout` - Placing orders
//! - `admin` - Back-office access and operations

#![allow(clippy::missing_panics_doc, clippy::unwrap_used)]

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::{broadcast, watch};

use foodtruck_core::{
    AddressId, CategoryId, Email, OrderId, OrderItemId, OrderStatus, Price, ProductId, ProfileId,
    SponsorId, UserId,
};
use foodtruck_storefront::AppState;
use foodtruck_storefront::backend::{
    AddressTable, AuthBackend, BackendError, Backends, CatalogTable, ObjectStorage, OrderTable,
    ProductQuery, ProfileTable, SettingsTable, SponsorTable,
};
use foodtruck_storefront::config::{BackendConfig, StorefrontConfig};
use foodtruck_storefront::models::{
    Address, AppSettings, AuthEvent, AuthUser, Category, NewAddress, NewCategory, NewOrder,
    NewOrderItem, NewProduct, NewProfile, NewSponsor, Order, OrderItem, Product, Profile,
    ProfilePatch, Session, Sponsor,
};
use foodtruck_storefront::notify::RecordingNotifier;
use foodtruck_storefront::storage::DurableStorage;

/// Base URL returned for uploaded objects.
pub const OBJECT_BASE_URL: &str = "https://cdn.test/imagens/";

/// Delivery fee used by [`test_config`].
pub const DELIVERY_FEE_CENTS: u32 = 500;

/// Backend operations that can be made to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Fault {
    SessionRestore,
    ProfileRead,
    ProfileInsert,
    OrderInsert,
    OrderItems,
    SignOut,
}

#[derive(Default)]
struct Tables {
    accounts: HashMap<String, (String, UserId)>,
    session: Option<Session>,
    profiles: Vec<Profile>,
    categories: Vec<Category>,
    products: Vec<Product>,
    addresses: Vec<Address>,
    orders: Vec<Order>,
    items: Vec<OrderItem>,
    sponsors: Vec<Sponsor>,
    settings: Option<AppSettings>,
    objects: HashMap<String, (String, usize)>,
}

/// In-memory backend implementing every collaborator trait.
pub struct FakeBackend {
    tables: Mutex<Tables>,
    faults: Mutex<HashSet<Fault>>,
    events: broadcast::Sender<AuthEvent>,
    profile_gate: watch::Sender<bool>,
    profile_inserts: AtomicUsize,
    profile_reads: AtomicUsize,
}

impl std::fmt::Debug for FakeBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FakeBackend").finish_non_exhaustive()
    }
}

impl Default for FakeBackend {
    fn default() -> Self {
        let (events, _) = broadcast::channel(16);
        let (profile_gate, _) = watch::channel(true);
        Self {
            tables: Mutex::new(Tables::default()),
            faults: Mutex::new(HashSet::new()),
            events,
            profile_gate,
            profile_inserts: AtomicUsize::new(0),
            profile_reads: AtomicUsize::new(0),
        }
    }
}

fn injected() -> BackendError {
    BackendError::Api {
        status: 500,
        code: None,
        message: "injected failure".to_string(),
    }
}

fn missing(what: &str) -> BackendError {
    BackendError::NotFound(what.to_string())
}

impl FakeBackend {
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn tables(&self) -> MutexGuard<'_, Tables> {
        self.tables.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn check(&self, fault: Fault) -> Result<(), BackendError> {
        if self
            .faults
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(&fault)
        {
            Err(injected())
        } else {
            Ok(())
        }
    }

    /// Make `fault` fail until [`Self::heal`] is called.
    pub fn fail(&self, fault: Fault) {
        self.faults
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(fault);
    }

    pub fn heal(&self, fault: Fault) {
        self.faults
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&fault);
    }

    /// Hold every profile read until [`Self::resume_profile_reads`].
    pub fn pause_profile_reads(&self) {
        self.profile_gate.send_replace(false);
    }

    pub fn resume_profile_reads(&self) {
        self.profile_gate.send_replace(true);
    }

    /// Profile reads started so far, including held ones.
    pub fn profile_reads(&self) -> usize {
        self.profile_reads.load(Ordering::SeqCst)
    }

    /// Wait until at least `count` profile reads have started.
    pub async fn wait_for_profile_reads(&self, count: usize) {
        tokio::time::timeout(Duration::from_secs(5), async {
            while self.profile_reads() < count {
                tokio::task::yield_now().await;
            }
        })
        .await
        .unwrap();
    }

    /// Profiles inserted through the table so far.
    pub fn profile_inserts(&self) -> usize {
        self.profile_inserts.load(Ordering::SeqCst)
    }

    // =========================================================================
    // Seeding and inspection
    // =========================================================================

    /// Register an account without a profile.
    pub fn add_account(&self, email: &str, password: &str) -> UserId {
        let user_id = UserId::random();
        self.tables()
            .accounts
            .insert(email.to_string(), (password.to_string(), user_id));
        user_id
    }

    /// Register an account with a profile.
    pub fn add_user(&self, email: &str, password: &str, name: &str, is_admin: bool) -> UserId {
        let user_id = self.add_account(email, password);
        self.tables().profiles.push(profile(NewProfile {
            user_id,
            name: name.to_string(),
            phone: "(11) 91234-5678".to_string(),
            is_admin,
        }));
        user_id
    }

    /// Change the admin flag directly on the server.
    pub fn set_admin_flag(&self, user_id: UserId, is_admin: bool) {
        if let Some(p) = self.tables().profiles.iter_mut().find(|p| p.user_id == user_id) {
            p.is_admin = is_admin;
        }
    }

    /// Drop the server-side session without telling the client.
    pub fn revoke_session(&self) {
        self.tables().session = None;
    }

    /// Publish an auth event as the auth service would.
    pub fn emit(&self, event: AuthEvent) {
        let _ = self.events.send(event);
    }

    pub fn add_category(&self, name: &str, position: i32) -> Category {
        let category = Category {
            id: CategoryId::random(),
            name: name.to_string(),
            image_url: None,
            position,
            created_at: Some(Utc::now()),
        };
        self.tables().categories.push(category.clone());
        category
    }

    pub fn add_product(&self, name: &str, cents: u32, category: Option<CategoryId>) -> Product {
        let product = Product {
            id: ProductId::random(),
            name: name.to_string(),
            description: format!("{name} from the grill"),
            price: Price::from_cents(cents),
            image_url: None,
            category_id: category,
            available: true,
            featured: false,
        };
        self.tables().products.push(product.clone());
        product
    }

    pub fn add_sponsor(&self, name: &str, position: i32) -> Sponsor {
        let sponsor = Sponsor {
            id: SponsorId::random(),
            name: name.to_string(),
            logo_url: format!("https://cdn.test/{name}.png"),
            website: format!("https://{name}.test"),
            active: true,
            position,
        };
        self.tables().sponsors.push(sponsor.clone());
        sponsor
    }

    #[must_use]
    pub fn profiles(&self) -> Vec<Profile> {
        self.tables().profiles.clone()
    }

    #[must_use]
    pub fn orders(&self) -> Vec<Order> {
        self.tables().orders.clone()
    }

    #[must_use]
    pub fn items(&self) -> Vec<OrderItem> {
        self.tables().items.clone()
    }

    /// Paths of uploaded objects.
    #[must_use]
    pub fn object_paths(&self) -> Vec<String> {
        self.tables().objects.keys().cloned().collect()
    }

    fn sign_in_account(&self, email: &str, password: &str) -> Result<Session, BackendError> {
        let mut tables = self.tables();
        let Some((expected, user_id)) = tables.accounts.get(email).cloned() else {
            return Err(invalid_credentials());
        };
        if expected != password {
            return Err(invalid_credentials());
        }
        let session = Session {
            access_token: format!("access-{user_id}"),
            refresh_token: format!("refresh-{user_id}"),
            expires_at: Utc::now() + chrono::Duration::hours(1),
            user: AuthUser {
                id: user_id,
                email: Some(email.to_string()),
            },
        };
        tables.session = Some(session.clone());
        Ok(session)
    }
}

fn invalid_credentials() -> BackendError {
    BackendError::Api {
        status: 400,
        code: Some("invalid_credentials".to_string()),
        message: "Invalid login credentials".to_string(),
    }
}

fn profile(new: NewProfile) -> Profile {
    Profile {
        id: Some(ProfileId::random()),
        user_id: new.user_id,
        name: new.name,
        phone: new.phone,
        is_admin: new.is_admin,
        created_at: Some(Utc::now()),
        updated_at: None,
        extra: serde_json::Map::new(),
    }
}

// =============================================================================
// Auth
// =============================================================================

#[async_trait]
impl AuthBackend for FakeBackend {
    async fn current_session(&self) -> Result<Option<Session>, BackendError> {
        self.check(Fault::SessionRestore)?;
        Ok(self.tables().session.clone())
    }

    async fn sign_in_with_password(
        &self,
        email: &Email,
        password: &str,
    ) -> Result<Session, BackendError> {
        let session = self.sign_in_account(email.as_str(), password)?;
        self.emit(AuthEvent::SignedIn(session.clone()));
        Ok(session)
    }

    async fn sign_up(&self, email: &Email, password: &str) -> Result<AuthUser, BackendError> {
        if self.tables().accounts.contains_key(email.as_str()) {
            return Err(BackendError::Api {
                status: 422,
                code: Some("user_already_exists".to_string()),
                message: "User already registered".to_string(),
            });
        }
        let id = self.add_account(email.as_str(), password);
        Ok(AuthUser {
            id,
            email: Some(email.as_str().to_string()),
        })
    }

    async fn sign_out(&self) -> Result<(), BackendError> {
        self.check(Fault::SignOut)?;
        self.tables().session = None;
        self.emit(AuthEvent::SignedOut);
        Ok(())
    }

    async fn send_password_reset(
        &self,
        _email: &Email,
        _redirect_url: &str,
    ) -> Result<(), BackendError> {
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<AuthEvent> {
        self.events.subscribe()
    }
}

// =============================================================================
// Profiles
// =============================================================================

#[async_trait]
impl ProfileTable for FakeBackend {
    async fn select_by_user_id(&self, user_id: UserId) -> Result<Profile, BackendError> {
        self.profile_reads.fetch_add(1, Ordering::SeqCst);
        let mut gate = self.profile_gate.subscribe();
        gate.wait_for(|open| *open).await.map_err(|_| injected())?;
        self.check(Fault::ProfileRead)?;
        self.tables()
            .profiles
            .iter()
            .find(|p| p.user_id == user_id)
            .cloned()
            .ok_or_else(|| missing("perfis"))
    }

    async fn insert(&self, new: &NewProfile) -> Result<Profile, BackendError> {
        self.check(Fault::ProfileInsert)?;
        self.profile_inserts.fetch_add(1, Ordering::SeqCst);
        let row = profile(new.clone());
        self.tables().profiles.push(row.clone());
        Ok(row)
    }

    async fn update(&self, user_id: UserId, patch: &ProfilePatch) -> Result<(), BackendError> {
        let mut tables = self.tables();
        let row = tables
            .profiles
            .iter_mut()
            .find(|p| p.user_id == user_id)
            .ok_or_else(|| missing("perfis"))?;
        row.name.clone_from(&patch.name);
        row.phone.clone_from(&patch.phone);
        row.updated_at = Some(patch.updated_at);
        Ok(())
    }

    async fn list(&self) -> Result<Vec<Profile>, BackendError> {
        let mut profiles = self.tables().profiles.clone();
        profiles.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(profiles)
    }

    async fn set_admin(&self, id: ProfileId, is_admin: bool) -> Result<(), BackendError> {
        let mut tables = self.tables();
        let row = tables
            .profiles
            .iter_mut()
            .find(|p| p.id == Some(id))
            .ok_or_else(|| missing("perfis"))?;
        row.is_admin = is_admin;
        Ok(())
    }

    async fn delete(&self, id: ProfileId) -> Result<(), BackendError> {
        self.tables().profiles.retain(|p| p.id != Some(id));
        Ok(())
    }
}

// =============================================================================
// Catalog
// =============================================================================

#[async_trait]
impl CatalogTable for FakeBackend {
    async fn list_categories(&self) -> Result<Vec<Category>, BackendError> {
        let mut categories = self.tables().categories.clone();
        categories.sort_by_key(|c| c.position);
        Ok(categories)
    }

    async fn insert_category(&self, category: &NewCategory) -> Result<Category, BackendError> {
        let row = Category {
            id: CategoryId::random(),
            name: category.name.clone(),
            image_url: category.image_url.clone(),
            position: category.position.unwrap_or(0),
            created_at: Some(Utc::now()),
        };
        self.tables().categories.push(row.clone());
        Ok(row)
    }

    async fn update_category(
        &self,
        id: CategoryId,
        category: &NewCategory,
    ) -> Result<(), BackendError> {
        let mut tables = self.tables();
        let row = tables
            .categories
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or_else(|| missing("categorias"))?;
        row.name.clone_from(&category.name);
        row.image_url.clone_from(&category.image_url);
        if let Some(position) = category.position {
            row.position = position;
        }
        Ok(())
    }

    async fn delete_category(&self, id: CategoryId) -> Result<(), BackendError> {
        self.tables().categories.retain(|c| c.id != id);
        Ok(())
    }

    async fn list_products(&self, query: &ProductQuery) -> Result<Vec<Product>, BackendError> {
        let mut products: Vec<Product> = self
            .tables()
            .products
            .iter()
            .filter(|p| query.category.is_none_or(|c| p.category_id == Some(c)))
            .filter(|p| !query.available_only || p.available)
            .filter(|p| !query.featured_only || p.featured)
            .cloned()
            .collect();
        products.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(products)
    }

    async fn get_product(&self, id: ProductId) -> Result<Product, BackendError> {
        self.tables()
            .products
            .iter()
            .find(|p| p.id == id)
            .cloned()
            .ok_or_else(|| missing("produtos"))
    }

    async fn insert_product(&self, product: &NewProduct) -> Result<Product, BackendError> {
        let row = Product {
            id: ProductId::random(),
            name: product.name.clone(),
            description: product.description.clone(),
            price: product.price,
            image_url: product.image_url.clone(),
            category_id: Some(product.category_id),
            available: product.available,
            featured: product.featured,
        };
        self.tables().products.push(row.clone());
        Ok(row)
    }

    async fn update_product(
        &self,
        id: ProductId,
        product: &NewProduct,
    ) -> Result<(), BackendError> {
        let mut tables = self.tables();
        let row = tables
            .products
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or_else(|| missing("produtos"))?;
        row.name.clone_from(&product.name);
        row.description.clone_from(&product.description);
        row.price = product.price;
        row.image_url.clone_from(&product.image_url);
        row.category_id = Some(product.category_id);
        row.available = product.available;
        row.featured = product.featured;
        Ok(())
    }

    async fn set_product_available(
        &self,
        id: ProductId,
        available: bool,
    ) -> Result<(), BackendError> {
        let mut tables = self.tables();
        let row = tables
            .products
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or_else(|| missing("produtos"))?;
        row.available = available;
        Ok(())
    }

    async fn set_product_featured(
        &self,
        id: ProductId,
        featured: bool,
    ) -> Result<(), BackendError> {
        let mut tables = self.tables();
        let row = tables
            .products
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or_else(|| missing("produtos"))?;
        row.featured = featured;
        Ok(())
    }

    async fn delete_product(&self, id: ProductId) -> Result<(), BackendError> {
        self.tables().products.retain(|p| p.id != id);
        Ok(())
    }
}

// =============================================================================
// Addresses
// =============================================================================

#[async_trait]
impl AddressTable for FakeBackend {
    async fn list_for_user(&self, user_id: UserId) -> Result<Vec<Address>, BackendError> {
        let mut addresses: Vec<Address> = self
            .tables()
            .addresses
            .iter()
            .filter(|a| a.user_id == user_id)
            .cloned()
            .collect();
        addresses.sort_by_key(|a| !a.is_default);
        Ok(addresses)
    }

    async fn insert(
        &self,
        user_id: UserId,
        address: &NewAddress,
        is_default: bool,
    ) -> Result<Address, BackendError> {
        let row = Address {
            id: AddressId::random(),
            user_id,
            street: address.street.clone(),
            number: address.number.clone(),
            complement: address.complement.clone(),
            district: address.district.clone(),
            city: address.city.clone(),
            state: address.state.clone(),
            postal_code: address.postal_code.clone(),
            is_default,
            created_at: Some(Utc::now()),
        };
        self.tables().addresses.push(row.clone());
        Ok(row)
    }

    async fn update(&self, id: AddressId, address: &NewAddress) -> Result<(), BackendError> {
        let mut tables = self.tables();
        let row = tables
            .addresses
            .iter_mut()
            .find(|a| a.id == id)
            .ok_or_else(|| missing("enderecos"))?;
        row.street.clone_from(&address.street);
        row.number.clone_from(&address.number);
        row.complement.clone_from(&address.complement);
        row.district.clone_from(&address.district);
        row.city.clone_from(&address.city);
        row.state.clone_from(&address.state);
        row.postal_code.clone_from(&address.postal_code);
        Ok(())
    }

    async fn set_default(&self, user_id: UserId, id: AddressId) -> Result<(), BackendError> {
        for row in self
            .tables()
            .addresses
            .iter_mut()
            .filter(|a| a.user_id == user_id)
        {
            row.is_default = row.id == id;
        }
        Ok(())
    }

    async fn delete(&self, id: AddressId) -> Result<(), BackendError> {
        self.tables().addresses.retain(|a| a.id != id);
        Ok(())
    }
}

// =============================================================================
// Orders
// =============================================================================

#[async_trait]
impl OrderTable for FakeBackend {
    async fn insert_order(&self, order: &NewOrder) -> Result<Order, BackendError> {
        self.check(Fault::OrderInsert)?;
        let row = Order {
            id: OrderId::random(),
            user_id: order.user_id,
            status: order.status,
            total: order.total,
            delivery_address: order.delivery_address.clone(),
            created_at: Utc::now(),
            updated_at: None,
        };
        // Newest first.
        self.tables().orders.insert(0, row.clone());
        Ok(row)
    }

    async fn insert_items(&self, items: &[NewOrderItem]) -> Result<(), BackendError> {
        self.check(Fault::OrderItems)?;
        let mut tables = self.tables();
        for item in items {
            let product_name = tables
                .products
                .iter()
                .find(|p| p.id == item.product_id)
                .map(|p| p.name.clone());
            tables.items.push(OrderItem {
                id: OrderItemId::random(),
                order_id: item.order_id,
                product_id: item.product_id,
                product_name,
                quantity: item.quantity,
                unit_price: item.unit_price,
                note: item.note.clone(),
            });
        }
        Ok(())
    }

    async fn list_for_user(&self, user_id: UserId) -> Result<Vec<Order>, BackendError> {
        Ok(self
            .tables()
            .orders
            .iter()
            .filter(|o| o.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn list_all(&self) -> Result<Vec<Order>, BackendError> {
        Ok(self.tables().orders.clone())
    }

    async fn get(&self, id: OrderId) -> Result<Order, BackendError> {
        self.tables()
            .orders
            .iter()
            .find(|o| o.id == id)
            .cloned()
            .ok_or_else(|| missing("pedidos"))
    }

    async fn items_for(&self, id: OrderId) -> Result<Vec<OrderItem>, BackendError> {
        Ok(self
            .tables()
            .items
            .iter()
            .filter(|i| i.order_id == id)
            .cloned()
            .collect())
    }

    async fn update_status(&self, id: OrderId, status: OrderStatus) -> Result<(), BackendError> {
        let mut tables = self.tables();
        let row = tables
            .orders
            .iter_mut()
            .find(|o| o.id == id)
            .ok_or_else(|| missing("pedidos"))?;
        row.status = status;
        row.updated_at = Some(Utc::now());
        Ok(())
    }
}

// =============================================================================
// Sponsors, settings and objects
// =============================================================================

#[async_trait]
impl SponsorTable for FakeBackend {
    async fn list(&self) -> Result<Vec<Sponsor>, BackendError> {
        let mut sponsors = self.tables().sponsors.clone();
        sponsors.sort_by_key(|s| s.position);
        Ok(sponsors)
    }

    async fn insert(&self, sponsor: &NewSponsor, position: i32) -> Result<Sponsor, BackendError> {
        let row = Sponsor {
            id: SponsorId::random(),
            name: sponsor.name.clone(),
            logo_url: sponsor.logo_url.clone(),
            website: sponsor.website.clone(),
            active: sponsor.active,
            position,
        };
        self.tables().sponsors.push(row.clone());
        Ok(row)
    }

    async fn update(&self, id: SponsorId, sponsor: &NewSponsor) -> Result<(), BackendError> {
        let mut tables = self.tables();
        let row = tables
            .sponsors
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or_else(|| missing("patrocinadores"))?;
        row.name.clone_from(&sponsor.name);
        row.logo_url.clone_from(&sponsor.logo_url);
        row.website.clone_from(&sponsor.website);
        row.active = sponsor.active;
        Ok(())
    }

    async fn delete(&self, id: SponsorId) -> Result<(), BackendError> {
        self.tables().sponsors.retain(|s| s.id != id);
        Ok(())
    }

    async fn set_active(&self, id: SponsorId, active: bool) -> Result<(), BackendError> {
        let mut tables = self.tables();
        let row = tables
            .sponsors
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or_else(|| missing("patrocinadores"))?;
        row.active = active;
        Ok(())
    }

    async fn set_position(&self, id: SponsorId, position: i32) -> Result<(), BackendError> {
        let mut tables = self.tables();
        let row = tables
            .sponsors
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or_else(|| missing("patrocinadores"))?;
        row.position = position;
        Ok(())
    }
}

#[async_trait]
impl SettingsTable for FakeBackend {
    async fn fetch(&self) -> Result<Option<AppSettings>, BackendError> {
        Ok(self.tables().settings.clone())
    }

    async fn upsert(&self, settings: &AppSettings) -> Result<(), BackendError> {
        self.tables().settings = Some(settings.clone());
        Ok(())
    }
}

#[async_trait]
impl ObjectStorage for FakeBackend {
    async fn upload(
        &self,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<String, BackendError> {
        self.tables()
            .objects
            .insert(path.to_string(), (content_type.to_string(), bytes.len()));
        Ok(format!("{OBJECT_BASE_URL}{path}"))
    }
}

// =============================================================================
// Client harness
// =============================================================================

/// Configuration pointing at nothing in particular; the fake ignores it.
#[must_use]
pub fn test_config(data_dir: PathBuf) -> StorefrontConfig {
    StorefrontConfig {
        backend: BackendConfig {
            url: url::Url::parse("https://backend.test").unwrap(),
            anon_key: secrecy::SecretString::from("k3y-Fq9zLx2Wm8Rt".to_string()),
            storage_bucket: "imagens".to_string(),
        },
        base_url: "https://app.test".to_string(),
        data_dir,
        delivery_fee: Price::from_cents(DELIVERY_FEE_CENTS),
        catalog_ttl: Duration::from_secs(300),
        sentry_dsn: None,
        sentry_environment: None,
    }
}

/// One client process: its state and the notices it raised.
pub struct Client {
    pub state: AppState,
    pub notices: Arc<RecordingNotifier>,
}

impl Client {
    /// Start a client over `storage`, as a fresh process would, without
    /// restoring the session.
    #[must_use]
    pub fn start(backend: &Arc<FakeBackend>, storage: &DurableStorage) -> Self {
        let notices = Arc::new(RecordingNotifier::default());
        let state = AppState::new(
            test_config(PathBuf::from("/nonexistent")),
            Backends::from_shared(Arc::clone(backend)),
            storage.connect(),
            notices.clone(),
        );
        Self { state, notices }
    }

    /// Start a client and restore its session.
    pub async fn boot(backend: &Arc<FakeBackend>, storage: &DurableStorage) -> Self {
        let client = Self::start(backend, storage);
        client.state.auth().bootstrap().await;
        client
    }

    /// Start a client and sign in.
    pub async fn signed_in(
        backend: &Arc<FakeBackend>,
        storage: &DurableStorage,
        email: &str,
        password: &str,
    ) -> Self {
        use foodtruck_storefront::services::auth::validation::LoginForm;

        let client = Self::boot(backend, storage).await;
        client
            .state
            .auth()
            .sign_in(&LoginForm {
                email: email.to_string(),
                password: password.to_string(),
            })
            .await
            .unwrap();
        client
    }

    /// Messages raised so far.
    #[must_use]
    pub fn messages(&self) -> Vec<String> {
        self.notices.messages()
    }
}
