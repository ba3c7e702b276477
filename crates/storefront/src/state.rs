//! Application state shared by every command.

use std::sync::Arc;

use crate::backend::Backends;
use crate::backend::rest::BackendClient;
use crate::cart::CartStore;
use crate::config::StorefrontConfig;
use crate::notify::Notifier;
use crate::services::addresses::AddressService;
use crate::services::admin::AdminService;
use crate::services::auth::AuthController;
use crate::services::catalog::CatalogService;
use crate::services::checkout::CheckoutService;
use crate::services::orders::OrderHistory;
use crate::services::profile::ProfileService;
use crate::services::settings::SettingsService;
use crate::storage::{DurableStorage, FileBackend};

/// Application state shared across the client.
///
/// This struct is cheaply cloneable via `Arc` and owns one instance of
/// every store and service, wired to the same storage and backend.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    storage: DurableStorage,
    backends: Backends,
    auth: AuthController,
    cart: Arc<CartStore>,
    catalog: CatalogService,
    addresses: AddressService,
    checkout: CheckoutService,
    orders: OrderHistory,
    profile: ProfileService,
    settings: SettingsService,
    admin: AdminService,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("config", &self.inner.config)
            .field("storage", &self.inner.storage)
            .finish_non_exhaustive()
    }
}

impl AppState {
    /// Wire every store and service together.
    ///
    /// The cart is registered with the auth controller so it is emptied
    /// whenever the signed-in identity goes away.
    #[must_use]
    pub fn new(
        config: StorefrontConfig,
        backends: Backends,
        storage: DurableStorage,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let auth = AuthController::new(
            backends.auth.clone(),
            backends.profiles.clone(),
            &storage,
            notifier.clone(),
            config.password_reset_url(),
        );
        let cart = Arc::new(CartStore::open(&storage, notifier.clone()));
        auth.register_observer(cart.clone());

        let catalog = CatalogService::new(backends.catalog.clone(), config.catalog_ttl);
        let addresses =
            AddressService::new(backends.addresses.clone(), auth.clone(), notifier.clone());
        let checkout = CheckoutService::new(
            backends.orders.clone(),
            addresses.clone(),
            auth.clone(),
            cart.clone(),
            notifier.clone(),
            config.delivery_fee,
        );
        let orders = OrderHistory::new(backends.orders.clone(), auth.clone(), notifier.clone());
        let profile = ProfileService::new(backends.profiles.clone(), auth.clone(), notifier.clone());
        let settings = SettingsService::new(backends.settings.clone());
        let admin = AdminService::new(backends.clone(), auth.clone(), catalog.clone(), notifier);

        Self {
            inner: Arc::new(AppStateInner {
                config,
                storage,
                backends,
                auth,
                cart,
                catalog,
                addresses,
                checkout,
                orders,
                profile,
                settings,
                admin,
            }),
        }
    }

    /// Build the state against the REST backend with file-backed storage
    /// under the configured data directory.
    #[must_use]
    pub fn from_config(config: StorefrontConfig, notifier: Arc<dyn Notifier>) -> Self {
        let storage = DurableStorage::new(FileBackend::new(config.data_dir.clone()));
        let client = BackendClient::new(&config.backend, storage.connect());
        let backends = Backends::from_shared(Arc::new(client));
        Self::new(config, backends, storage, notifier)
    }

    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// Local key-value storage.
    #[must_use]
    pub fn storage(&self) -> &DurableStorage {
        &self.inner.storage
    }

    #[must_use]
    pub fn backends(&self) -> &Backends {
        &self.inner.backends
    }

    /// Session controller.
    #[must_use]
    pub fn auth(&self) -> &AuthController {
        &self.inner.auth
    }

    #[must_use]
    pub fn cart(&self) -> &CartStore {
        &self.inner.cart
    }

    /// Cached menu reads.
    #[must_use]
    pub fn catalog(&self) -> &CatalogService {
        &self.inner.catalog
    }

    #[must_use]
    pub fn addresses(&self) -> &AddressService {
        &self.inner.addresses
    }

    #[must_use]
    pub fn checkout(&self) -> &CheckoutService {
        &self.inner.checkout
    }

    #[must_use]
    pub fn orders(&self) -> &OrderHistory {
        &self.inner.orders
    }

    #[must_use]
    pub fn profile(&self) -> &ProfileService {
        &self.inner.profile
    }

    #[must_use]
    pub fn settings(&self) -> &SettingsService {
        &self.inner.settings
    }

    /// Back-office operations. Every call checks the admin flag.
    #[must_use]
    pub fn admin(&self) -> &AdminService {
        &self.inner.admin
    }
}
