//! Auth session controller.
//!
//! Owns the signed-in identity and its profile for one running app:
//!
//! - bootstrap restores the session and adopts a cached profile when it
//!   belongs to the same user, refreshing it in the background
//! - sign-in, sign-up, sign-out and password reset wrap the auth backend
//! - backend auth events (sign-in/out elsewhere, token refresh) are applied
//!   through [`AuthController::listen`]
//!
//! The profile is cached in durable storage under [`PROFILE_CACHE_KEY`] and
//! erased when the identity goes away. Components that hold per-identity
//! data (the cart) register an [`IdentityObserver`] to be cleared at the
//! same moment.
//!
//! A profile fetch is only applied while the identity it was issued for is
//! still current: each fetch records the user id and the identity epoch,
//! and the epoch advances on every identity change.

mod error;
pub mod validation;

pub use error::AuthError;

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError, Weak};

use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;

use foodtruck_core::UserId;

use crate::backend::{AuthBackend, BackendError, ProfileTable};
use crate::cache::DurableValue;
use crate::models::{AuthEvent, AuthUser, NewProfile, Profile, Session};
use crate::navigation::Route;
use crate::notify::Notifier;
use crate::storage::DurableStorage;
use validation::{LoginForm, RegistrationForm};

/// Storage key of the cached profile.
pub const PROFILE_CACHE_KEY: &str = "foodtruck_profile";

/// Told synchronously when the identity transitions to "no user".
pub trait IdentityObserver: Send + Sync {
    fn on_signed_out(&self);
}

/// Bootstrap progress.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AuthPhase {
    #[default]
    Uninitialized,
    Bootstrapping,
    Ready,
}

/// Snapshot of the auth state for UIs.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AuthState {
    pub session: Option<Session>,
    pub user: Option<AuthUser>,
    pub profile: Option<Profile>,
    /// True during bootstrap and any blocking operation.
    pub loading: bool,
    pub phase: AuthPhase,
}

impl AuthState {
    /// Derived from the profile only.
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.profile.as_ref().is_some_and(|p| p.is_admin)
    }

    #[must_use]
    pub fn user_id(&self) -> Option<UserId> {
        self.user.as_ref().map(|u| u.id)
    }
}

/// Live subscription to backend auth events.
///
/// Dropping it stops listening.
#[must_use = "dropping the subscription stops listening"]
#[derive(Debug)]
pub struct AuthSubscription {
    handle: JoinHandle<()>,
}

impl AuthSubscription {
    /// Stop listening.
    pub fn unsubscribe(self) {}
}

impl Drop for AuthSubscription {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

// =============================================================================
// AuthController
// =============================================================================

/// Auth session controller. Cheap to clone.
#[derive(Clone)]
pub struct AuthController {
    inner: Arc<Inner>,
}

struct Inner {
    auth: Arc<dyn AuthBackend>,
    profiles: Arc<dyn ProfileTable>,
    notifier: Arc<dyn Notifier>,
    profile_cache: DurableValue<Option<Profile>>,
    reset_redirect_url: String,
    state: watch::Sender<AuthState>,
    /// Advances on every identity change; guarded by the `state` lock.
    epoch: AtomicU64,
    /// Outstanding blocking operations.
    busy: AtomicUsize,
    /// Serializes profile fetches so concurrent first logins create one row.
    profile_fetch: tokio::sync::Mutex<()>,
    observers: Mutex<Vec<Arc<dyn IdentityObserver>>>,
    background: Mutex<Option<JoinHandle<()>>>,
}

impl Drop for Inner {
    fn drop(&mut self) {
        if let Some(handle) = self
            .background
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            handle.abort();
        }
    }
}

impl std::fmt::Debug for AuthController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthController")
            .field("state", &*self.inner.state.borrow())
            .finish_non_exhaustive()
    }
}

/// Decrements the busy count and clears `loading` when the last one ends.
struct LoadingGuard<'a> {
    inner: &'a Inner,
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        if self.inner.busy.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.inner.state.send_if_modified(|s| {
                let changed = s.loading;
                s.loading = false;
                changed
            });
        }
    }
}

impl AuthController {
    /// Create a controller. Call [`Self::bootstrap`] before use.
    pub fn new(
        auth: Arc<dyn AuthBackend>,
        profiles: Arc<dyn ProfileTable>,
        storage: &DurableStorage,
        notifier: Arc<dyn Notifier>,
        reset_redirect_url: impl Into<String>,
    ) -> Self {
        let profile_cache = DurableValue::load(storage, PROFILE_CACHE_KEY, None);
        let (state, _) = watch::channel(AuthState::default());
        Self {
            inner: Arc::new(Inner {
                auth,
                profiles,
                notifier,
                profile_cache,
                reset_redirect_url: reset_redirect_url.into(),
                state,
                epoch: AtomicU64::new(0),
                busy: AtomicUsize::new(0),
                profile_fetch: tokio::sync::Mutex::new(()),
                observers: Mutex::new(Vec::new()),
                background: Mutex::new(None),
            }),
        }
    }

    /// Register a component to clear when the identity goes away.
    pub fn register_observer(&self, observer: Arc<dyn IdentityObserver>) {
        self.inner
            .observers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(observer);
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> AuthState {
        self.inner.state.borrow().clone()
    }

    /// Receiver that sees every state change.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<AuthState> {
        self.inner.state.subscribe()
    }

    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.inner.state.borrow().is_admin()
    }

    #[must_use]
    pub fn current_user_id(&self) -> Option<UserId> {
        self.inner.state.borrow().user_id()
    }

    // =========================================================================
    // Bootstrap
    // =========================================================================

    /// Restore the session and its profile.
    ///
    /// A cached profile for the same user is adopted at once and refreshed
    /// in the background; otherwise the profile is fetched before this
    /// returns. Failures leave the controller signed out but ready.
    pub async fn bootstrap(&self) -> AuthState {
        self.inner
            .state
            .send_modify(|s| s.phase = AuthPhase::Bootstrapping);
        let loading = self.begin_loading();

        match self.inner.auth.current_session().await {
            Ok(Some(session)) => {
                let user_id = session.user.id;
                let cached = self.inner.profile_cache.get();
                self.adopt_session(Some(session));

                match cached {
                    Some(profile) if profile.user_id == user_id => {
                        tracing::debug!(user_id = %user_id, "adopting cached profile");
                        self.inner
                            .state
                            .send_modify(|s| s.profile = Some(profile));
                        self.spawn_background_refresh(user_id);
                    }
                    cached => {
                        if let Some(stale) = cached {
                            tracing::info!(
                                cached_user_id = %stale.user_id,
                                user_id = %user_id,
                                "cached profile belongs to another identity"
                            );
                            self.identity_cleared();
                        }
                        self.fetch_profile_now(user_id).await;
                    }
                }
            }
            Ok(None) => {
                self.adopt_session(None);
                if self.inner.profile_cache.get().is_some() {
                    tracing::info!("stored identity is no longer signed in");
                    self.identity_cleared();
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to restore session");
                self.adopt_session(None);
            }
        }

        drop(loading);
        self.inner.state.send_modify(|s| s.phase = AuthPhase::Ready);
        self.state()
    }

    /// Wait for a pending background profile refresh, if any.
    pub async fn wait_for_background_refresh(&self) {
        let handle = self
            .inner
            .background
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = handle
            && let Err(e) = handle.await
            && !e.is_cancelled()
        {
            tracing::error!(error = %e, "background profile refresh panicked");
        }
    }

    /// Apply backend auth events until the subscription is dropped.
    pub fn listen(&self) -> AuthSubscription {
        let mut events = self.inner.auth.subscribe();
        let weak = Arc::downgrade(&self.inner);
        let handle = tokio::spawn(async move {
            loop {
                let event = match events.recv().await {
                    Ok(event) => event,
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "auth events lagged");
                        continue;
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                };
                let Some(inner) = weak.upgrade() else { break };
                Self { inner }.handle_event(event).await;
            }
        });
        AuthSubscription { handle }
    }

    async fn handle_event(&self, event: AuthEvent) {
        match event {
            AuthEvent::SignedIn(session) => {
                let user_id = session.user.id;
                tracing::debug!(user_id = %user_id, "signed-in event");
                self.adopt_session(Some(session));
                self.fetch_profile_now(user_id).await;
            }
            AuthEvent::TokenRefreshed(session) => {
                self.adopt_session(Some(session));
            }
            AuthEvent::SignedOut => {
                tracing::debug!("signed-out event");
                self.adopt_session(None);
            }
        }
    }

    // =========================================================================
    // User operations
    // =========================================================================

    /// Sign in and load the profile.
    ///
    /// Returns where to go next: the back-office for administrators, the
    /// storefront otherwise.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Validation` for bad input (nothing is sent) and
    /// `AuthError::Backend` when the credentials are rejected.
    pub async fn sign_in(&self, form: &LoginForm) -> Result<Route, AuthError> {
        let credentials = form.validate()?;
        let _loading = self.begin_loading();

        let session = match self
            .inner
            .auth
            .sign_in_with_password(&credentials.email, &credentials.password)
            .await
        {
            Ok(session) => session,
            Err(e) => {
                tracing::warn!(error = %e, "sign-in failed");
                self.inner.notifier.error(&e.user_message());
                return Err(e.into());
            }
        };

        let user_id = session.user.id;
        tracing::info!(user_id = %user_id, "signed in");
        self.adopt_session(Some(session));
        self.fetch_profile_now(user_id).await;

        self.inner.notifier.success("Signed in successfully");
        Ok(if self.is_admin() {
            Route::Admin
        } else {
            Route::Home
        })
    }

    /// Create an account and its profile. The user signs in afterwards.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Validation` for bad input and
    /// `AuthError::Backend` when the account or profile cannot be created.
    pub async fn sign_up(&self, form: &RegistrationForm) -> Result<Route, AuthError> {
        let registration = form.validate()?;
        let _loading = self.begin_loading();

        let result = async {
            let user = self
                .inner
                .auth
                .sign_up(&registration.email, &registration.password)
                .await?;
            self.inner
                .profiles
                .insert(&NewProfile {
                    user_id: user.id,
                    name: registration.name.clone(),
                    phone: registration.phone.as_str().to_string(),
                    is_admin: false,
                })
                .await?;
            Ok::<_, BackendError>(user)
        }
        .await;

        match result {
            Ok(user) => {
                tracing::info!(user_id = %user.id, "account created");
                self.inner.notifier.success("Account created successfully");
                Ok(Route::Login)
            }
            Err(e) => {
                tracing::warn!(error = %e, "sign-up failed");
                self.inner.notifier.error(&e.user_message());
                Err(e.into())
            }
        }
    }

    /// Sign out and clear everything tied to the identity.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Backend` when the auth service fails; the
    /// session is then kept.
    pub async fn sign_out(&self) -> Result<Route, AuthError> {
        let _loading = self.begin_loading();

        if let Err(e) = self.inner.auth.sign_out().await {
            tracing::warn!(error = %e, "sign-out failed");
            self.inner.notifier.error("Failed to sign out");
            return Err(e.into());
        }

        if !self.adopt_session(None) {
            self.identity_cleared();
        }
        tracing::info!("signed out");
        self.inner.notifier.success("Signed out successfully");
        Ok(Route::Login)
    }

    /// Email a password reset link.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Validation` for a malformed email and
    /// `AuthError::Backend` when the request fails.
    pub async fn reset_password(&self, email: &str) -> Result<Route, AuthError> {
        let email = validation::parse_email(email)?;
        let _loading = self.begin_loading();

        match self
            .inner
            .auth
            .send_password_reset(&email, &self.inner.reset_redirect_url)
            .await
        {
            Ok(()) => {
                self.inner
                    .notifier
                    .success("Password recovery email sent. Check your inbox.");
                Ok(Route::Login)
            }
            Err(e) => {
                tracing::warn!(error = %e, "password reset failed");
                self.inner.notifier.error(&e.user_message());
                Err(e.into())
            }
        }
    }

    /// Re-fetch the current user's profile, blocking.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::NotSignedIn` without a user.
    pub async fn refresh_profile(&self) -> Result<Option<Profile>, AuthError> {
        let user_id = self.current_user_id().ok_or(AuthError::NotSignedIn)?;
        self.fetch_profile_now(user_id).await;
        Ok(self.inner.state.borrow().profile.clone())
    }

    // =========================================================================
    // Identity and profile plumbing
    // =========================================================================

    fn begin_loading(&self) -> LoadingGuard<'_> {
        if self.inner.busy.fetch_add(1, Ordering::SeqCst) == 0 {
            self.inner.state.send_if_modified(|s| {
                let changed = !s.loading;
                s.loading = true;
                changed
            });
        }
        LoadingGuard { inner: &self.inner }
    }

    /// Install `session` as current. Returns whether a previous user's
    /// identity was cleared, either by signing out or by switching to
    /// another account.
    fn adopt_session(&self, session: Option<Session>) -> bool {
        let mut cleared = false;
        self.inner.state.send_modify(|s| {
            let previous = s.user_id();
            let next = session.as_ref().map(|session| session.user.id);
            if previous != next {
                self.inner.epoch.fetch_add(1, Ordering::SeqCst);
                s.profile = None;
                cleared = previous.is_some();
            }
            s.user = session.as_ref().map(|session| session.user.clone());
            s.session = session;
        });
        if cleared {
            self.identity_cleared();
        }
        cleared
    }

    /// Erase the cached profile and tell observers.
    fn identity_cleared(&self) {
        self.inner.profile_cache.remove();
        let observers = self
            .inner
            .observers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        for observer in observers {
            observer.on_signed_out();
        }
    }

    /// Epoch of the identity currently installed.
    fn epoch(&self) -> u64 {
        let _state = self.inner.state.borrow();
        self.inner.epoch.load(Ordering::SeqCst)
    }

    /// Blocking fetch applied to state and cache.
    async fn fetch_profile_now(&self, user_id: UserId) {
        let epoch = self.epoch();
        let _loading = self.begin_loading();
        let fetched = {
            let _serial = self.inner.profile_fetch.lock().await;
            fetch_profile(self.inner.profiles.as_ref(), user_id).await
        };
        if let Some(profile) = fetched
            && !apply_profile(&self.inner, user_id, epoch, profile)
        {
            tracing::debug!(user_id = %user_id, "identity changed, discarding fetched profile");
        }
    }

    fn spawn_background_refresh(&self, user_id: UserId) {
        let epoch = self.epoch();
        let weak: Weak<Inner> = Arc::downgrade(&self.inner);
        let handle = tokio::spawn(async move {
            let Some(inner) = weak.upgrade() else { return };
            let fetched = {
                let _serial = inner.profile_fetch.lock().await;
                fetch_profile(inner.profiles.as_ref(), user_id).await
            };
            // Only the fetch keeps the controller alive.
            drop(inner);

            let Some(profile) = fetched else {
                tracing::warn!(user_id = %user_id, "background refresh failed, keeping cached profile");
                return;
            };
            let Some(inner) = weak.upgrade() else {
                tracing::debug!("controller gone, discarding background refresh");
                return;
            };
            if !apply_profile(&inner, user_id, epoch, profile) {
                tracing::debug!(user_id = %user_id, "identity changed, discarding background refresh");
            }
        });

        let previous = self
            .inner
            .background
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(handle);
        if let Some(previous) = previous {
            previous.abort();
        }
    }
}

/// Look up the user's profile, creating an empty one when none exists.
///
/// Any other failure is logged and yields `None`.
async fn fetch_profile(profiles: &dyn ProfileTable, user_id: UserId) -> Option<Profile> {
    match profiles.select_by_user_id(user_id).await {
        Ok(profile) => Some(profile),
        Err(e) if e.is_not_found() => {
            tracing::info!(user_id = %user_id, "no profile yet, creating an empty one");
            match profiles.insert(&NewProfile::empty(user_id)).await {
                Ok(profile) => Some(profile),
                Err(e) => {
                    tracing::error!(user_id = %user_id, error = %e, "failed to create profile");
                    None
                }
            }
        }
        Err(e) => {
            tracing::error!(user_id = %user_id, error = %e, "failed to fetch profile");
            None
        }
    }
}

/// Install `profile` if `user_id` at `epoch` is still the current identity.
///
/// The cache write happens under the state lock so it cannot land after a
/// sign-out has moved the epoch on.
fn apply_profile(inner: &Inner, user_id: UserId, epoch: u64, profile: Profile) -> bool {
    let mut applied = false;
    inner.state.send_if_modified(|s| {
        let current = inner.epoch.load(Ordering::SeqCst) == epoch && s.user_id() == Some(user_id);
        if !current {
            return false;
        }
        inner.profile_cache.set(Some(profile.clone()));
        applied = true;
        let changed = s.profile.as_ref() != Some(&profile);
        s.profile = Some(profile);
        changed
    });
    applied
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::atomic::AtomicBool;

    use async_trait::async_trait;
    use chrono::{Duration, Utc};
    use foodtruck_core::{Email, ProfileId};

    use super::*;
    use crate::models::ProfilePatch;
    use crate::notify::RecordingNotifier;

    /// Auth backend with a fixed current session.
    struct StaticAuth {
        session: Mutex<Option<Session>>,
        events: broadcast::Sender<AuthEvent>,
    }

    impl StaticAuth {
        fn new(session: Option<Session>) -> Arc<Self> {
            Arc::new(Self {
                session: Mutex::new(session),
                events: broadcast::channel(8).0,
            })
        }
    }

    #[async_trait]
    impl AuthBackend for StaticAuth {
        async fn current_session(&self) -> Result<Option<Session>, BackendError> {
            Ok(self.session.lock().unwrap().clone())
        }

        async fn sign_in_with_password(
            &self,
            _email: &Email,
            _password: &str,
        ) -> Result<Session, BackendError> {
            Err(BackendError::Api {
                status: 400,
                code: Some("invalid_credentials".into()),
                message: "Invalid login credentials".into(),
            })
        }

        async fn sign_up(&self, _email: &Email, _password: &str) -> Result<AuthUser, BackendError> {
            Err(BackendError::Unauthenticated)
        }

        async fn sign_out(&self) -> Result<(), BackendError> {
            *self.session.lock().unwrap() = None;
            let _ = self.events.send(AuthEvent::SignedOut);
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

    /// Profile table holding at most one row per user.
    #[derive(Default)]
    struct Profiles {
        rows: Mutex<Vec<Profile>>,
        fail_reads: AtomicBool,
        inserts: AtomicUsize,
    }

    #[async_trait]
    impl ProfileTable for Profiles {
        async fn select_by_user_id(&self, user_id: UserId) -> Result<Profile, BackendError> {
            if self.fail_reads.load(Ordering::SeqCst) {
                return Err(BackendError::RateLimited(1));
            }
            self.rows
                .lock()
                .unwrap()
                .iter()
                .find(|p| p.user_id == user_id)
                .cloned()
                .ok_or_else(|| BackendError::NotFound("perfis".into()))
        }

        async fn insert(&self, profile: &NewProfile) -> Result<Profile, BackendError> {
            self.inserts.fetch_add(1, Ordering::SeqCst);
            let row = profile_row(profile.user_id, &profile.name, profile.is_admin);
            self.rows.lock().unwrap().push(row.clone());
            Ok(row)
        }

        async fn update(&self, _user_id: UserId, _patch: &ProfilePatch) -> Result<(), BackendError> {
            Ok(())
        }

        async fn list(&self) -> Result<Vec<Profile>, BackendError> {
            Ok(self.rows.lock().unwrap().clone())
        }

        async fn set_admin(&self, _id: ProfileId, _is_admin: bool) -> Result<(), BackendError> {
            Ok(())
        }

        async fn delete(&self, _id: ProfileId) -> Result<(), BackendError> {
            Ok(())
        }
    }

    struct Flag(AtomicBool);

    impl IdentityObserver for Flag {
        fn on_signed_out(&self) {
            self.0.store(true, Ordering::SeqCst);
        }
    }

    fn profile_row(user_id: UserId, name: &str, is_admin: bool) -> Profile {
        Profile {
            id: Some(ProfileId::random()),
            user_id,
            name: name.to_string(),
            phone: String::new(),
            is_admin,
            created_at: None,
            updated_at: None,
            extra: serde_json::Map::new(),
        }
    }

    fn session_for(user_id: UserId) -> Session {
        Session {
            access_token: "a".into(),
            refresh_token: "r".into(),
            expires_at: Utc::now() + Duration::hours(1),
            user: AuthUser { id: user_id, email: None },
        }
    }

    fn controller(
        auth: Arc<StaticAuth>,
        profiles: Arc<Profiles>,
        storage: &DurableStorage,
    ) -> (AuthController, Arc<RecordingNotifier>) {
        let notifier = Arc::new(RecordingNotifier::default());
        let controller = AuthController::new(
            auth,
            profiles,
            storage,
            notifier.clone(),
            "http://localhost:5173/reset-password",
        );
        (controller, notifier)
    }

    #[tokio::test]
    async fn test_bootstrap_without_session() {
        let storage = DurableStorage::in_memory();
        let (controller, _) =
            controller(StaticAuth::new(None), Arc::new(Profiles::default()), &storage);

        let state = controller.bootstrap().await;
        assert_eq!(state.phase, AuthPhase::Ready);
        assert!(!state.loading);
        assert!(state.user.is_none());
        assert!(!state.is_admin());
    }

    #[tokio::test]
    async fn test_bootstrap_creates_missing_profile() {
        let user_id = UserId::random();
        let storage = DurableStorage::in_memory();
        let profiles = Arc::new(Profiles::default());
        let (controller, _) = controller(
            StaticAuth::new(Some(session_for(user_id))),
            profiles.clone(),
            &storage,
        );

        let state = controller.bootstrap().await;
        let profile = state.profile.unwrap();
        assert_eq!(profile.user_id, user_id);
        assert_eq!(profile.name, "");
        assert!(!profile.is_admin);
        assert_eq!(profiles.inserts.load(Ordering::SeqCst), 1);
        assert!(storage.get_item(PROFILE_CACHE_KEY).unwrap().is_some());
    }

    #[tokio::test]
    async fn test_bootstrap_fetch_error_keeps_no_profile() {
        let user_id = UserId::random();
        let storage = DurableStorage::in_memory();
        let profiles = Arc::new(Profiles::default());
        profiles.fail_reads.store(true, Ordering::SeqCst);
        let (controller, _) = controller(
            StaticAuth::new(Some(session_for(user_id))),
            profiles.clone(),
            &storage,
        );

        let state = controller.bootstrap().await;
        assert_eq!(state.user_id(), Some(user_id));
        assert!(state.profile.is_none());
        assert_eq!(profiles.inserts.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_cached_profile_is_refreshed_in_background() {
        let user_id = UserId::random();
        let storage = DurableStorage::in_memory();
        let cached = profile_row(user_id, "Ana", false);
        storage
            .set_item(PROFILE_CACHE_KEY, &serde_json::to_string(&cached).unwrap())
            .unwrap();

        let profiles = Arc::new(Profiles::default());
        profiles
            .rows
            .lock()
            .unwrap()
            .push(profile_row(user_id, "Ana", true));
        let (controller, _) =
            controller(StaticAuth::new(Some(session_for(user_id))), profiles, &storage);

        let state = controller.bootstrap().await;
        assert_eq!(state.profile.as_ref().map(|p| p.name.as_str()), Some("Ana"));

        controller.wait_for_background_refresh().await;
        assert!(controller.is_admin());
        let stored: Profile =
            serde_json::from_str(&storage.get_item(PROFILE_CACHE_KEY).unwrap().unwrap()).unwrap();
        assert!(stored.is_admin);
    }

    #[tokio::test]
    async fn test_sign_in_failure_notifies_and_keeps_state() {
        let storage = DurableStorage::in_memory();
        let (controller, notifier) =
            controller(StaticAuth::new(None), Arc::new(Profiles::default()), &storage);
        controller.bootstrap().await;

        let form = LoginForm {
            email: "ana@example.com".into(),
            password: "wrong".into(),
        };
        let err = controller.sign_in(&form).await.unwrap_err();
        assert!(matches!(err, AuthError::Backend(_)));
        assert_eq!(notifier.messages(), vec!["Invalid login credentials"]);
        assert!(controller.state().user.is_none());
        assert!(!controller.state().loading);
    }

    #[tokio::test]
    async fn test_invalid_login_sends_nothing() {
        let storage = DurableStorage::in_memory();
        let (controller, notifier) =
            controller(StaticAuth::new(None), Arc::new(Profiles::default()), &storage);

        let err = controller.sign_in(&LoginForm::default()).await.unwrap_err();
        assert!(matches!(err, AuthError::Validation(_)));
        assert!(notifier.messages().is_empty());
    }

    #[tokio::test]
    async fn test_sign_out_clears_profile_and_observers() {
        let user_id = UserId::random();
        let storage = DurableStorage::in_memory();
        let profiles = Arc::new(Profiles::default());
        let (controller, notifier) = controller(
            StaticAuth::new(Some(session_for(user_id))),
            profiles,
            &storage,
        );
        let flag = Arc::new(Flag(AtomicBool::new(false)));
        controller.register_observer(flag.clone());
        controller.bootstrap().await;
        assert!(storage.get_item(PROFILE_CACHE_KEY).unwrap().is_some());

        let route = controller.sign_out().await.unwrap();
        assert_eq!(route, Route::Login);
        assert!(flag.0.load(Ordering::SeqCst));
        assert!(controller.state().profile.is_none());
        assert_eq!(storage.get_item(PROFILE_CACHE_KEY).unwrap(), None);
        assert_eq!(notifier.messages(), vec!["Signed out successfully"]);
    }

    #[tokio::test]
    async fn test_stale_fetch_is_discarded_after_identity_change() {
        let user_id = UserId::random();
        let storage = DurableStorage::in_memory();
        let (controller, _) = controller(
            StaticAuth::new(Some(session_for(user_id))),
            Arc::new(Profiles::default()),
            &storage,
        );
        controller.bootstrap().await;

        let epoch = controller.epoch();
        controller.adopt_session(None);
        let applied = apply_profile(
            &controller.inner,
            user_id,
            epoch,
            profile_row(user_id, "Ana", true),
        );
        assert!(!applied);
        assert!(controller.state().profile.is_none());
        assert_eq!(storage.get_item(PROFILE_CACHE_KEY).unwrap(), None);
    }

    #[tokio::test]
    async fn test_switching_account_clears_identity() {
        let storage = DurableStorage::in_memory();
        let (controller, _) = controller(
            StaticAuth::new(Some(session_for(UserId::random()))),
            Arc::new(Profiles::default()),
            &storage,
        );
        let flag = Arc::new(Flag(AtomicBool::new(false)));
        controller.register_observer(flag.clone());
        controller.bootstrap().await;
        assert!(storage.get_item(PROFILE_CACHE_KEY).unwrap().is_some());

        let other = UserId::random();
        assert!(controller.adopt_session(Some(session_for(other))));
        assert!(flag.0.load(Ordering::SeqCst));
        assert_eq!(controller.current_user_id(), Some(other));
        assert_eq!(storage.get_item(PROFILE_CACHE_KEY).unwrap(), None);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_profile_applied_during_sign_out_is_not_cached() {
        for _ in 0..50 {
            let user_id = UserId::random();
            let storage = DurableStorage::in_memory();
            let (controller, _) = controller(
                StaticAuth::new(Some(session_for(user_id))),
                Arc::new(Profiles::default()),
                &storage,
            );
            controller.bootstrap().await;

            let epoch = controller.epoch();
            let inner = Arc::clone(&controller.inner);
            let late = tokio::spawn(async move {
                apply_profile(&inner, user_id, epoch, profile_row(user_id, "Ana", true))
            });
            controller.sign_out().await.unwrap();
            late.await.unwrap();

            assert!(controller.state().profile.is_none());
            assert_eq!(storage.get_item(PROFILE_CACHE_KEY).unwrap(), None);
        }
    }

    #[tokio::test]
    async fn test_session_loss_between_runs_clears_identity() {
        let storage = DurableStorage::in_memory();
        let cached = profile_row(UserId::random(), "Ana", false);
        storage
            .set_item(PROFILE_CACHE_KEY, &serde_json::to_string(&cached).unwrap())
            .unwrap();
        let (controller, _) =
            controller(StaticAuth::new(None), Arc::new(Profiles::default()), &storage);
        let flag = Arc::new(Flag(AtomicBool::new(false)));
        controller.register_observer(flag.clone());

        controller.bootstrap().await;
        assert!(flag.0.load(Ordering::SeqCst));
        assert_eq!(storage.get_item(PROFILE_CACHE_KEY).unwrap(), None);
    }

    #[tokio::test]
    async fn test_listen_applies_signed_out_event() {
        let user_id = UserId::random();
        let storage = DurableStorage::in_memory();
        let auth = StaticAuth::new(Some(session_for(user_id)));
        let (controller, _) = controller(auth.clone(), Arc::new(Profiles::default()), &storage);
        controller.bootstrap().await;

        let mut states = controller.subscribe();
        let _subscription = controller.listen();
        auth.events.send(AuthEvent::SignedOut).unwrap();

        states
            .wait_for(|s| s.user.is_none())
            .await
            .unwrap();
        assert_eq!(storage.get_item(PROFILE_CACHE_KEY).unwrap(), None);
    }
}
