//! Auth API (`/auth/v1`) and local session persistence.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use reqwest::{Method, StatusCode};
use secrecy::ExposeSecret;
use serde::Deserialize;
use tokio::sync::broadcast;
use tracing::instrument;

use foodtruck_core::{Email, UserId};

use super::BackendClient;
use crate::backend::{AuthBackend, BackendError};
use crate::models::{AuthEvent, AuthUser, Session};

/// Storage key of the persisted session.
pub const SESSION_KEY: &str = "foodtruck_session";

/// Refresh tokens this long before they expire.
const EXPIRY_LEEWAY_SECS: i64 = 30;

/// Lifetime assumed when the service omits `expires_in`.
const DEFAULT_TOKEN_LIFETIME_SECS: i64 = 3600;

#[derive(Debug, Deserialize)]
struct UserResponse {
    id: UserId,
    #[serde(default)]
    email: Option<String>,
}

impl From<UserResponse> for AuthUser {
    fn from(user: UserResponse) -> Self {
        Self {
            id: user.id,
            email: user.email,
        }
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    expires_at: Option<i64>,
    user: UserResponse,
}

impl TokenResponse {
    fn into_session(self, now: DateTime<Utc>) -> Session {
        let expires_at = self
            .expires_at
            .and_then(|ts| DateTime::from_timestamp(ts, 0))
            .unwrap_or_else(|| {
                now + Duration::seconds(self.expires_in.unwrap_or(DEFAULT_TOKEN_LIFETIME_SECS))
            });
        Session {
            access_token: self.access_token,
            refresh_token: self.refresh_token,
            expires_at,
            user: self.user.into(),
        }
    }
}

/// Sign-up answers with a session when confirmation is off, else a bare user.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SignUpResponse {
    Session(TokenResponse),
    User(UserResponse),
}

impl BackendClient {
    /// Replace the in-memory and persisted session.
    fn store_session(&self, session: Option<&Session>) -> Result<(), BackendError> {
        match session {
            Some(session) => {
                let raw = serde_json::to_string(session)?;
                self.inner.storage.set_item(SESSION_KEY, &raw)?;
            }
            None => self.inner.storage.remove_item(SESSION_KEY)?,
        }
        *self
            .inner
            .session
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner) = session.cloned();
        Ok(())
    }

    /// Session persisted by an earlier run, if readable.
    fn load_persisted_session(&self) -> Option<Session> {
        let raw = match self.inner.storage.get_item(SESSION_KEY) {
            Ok(raw) => raw?,
            Err(e) => {
                tracing::warn!(error = %e, "failed to read stored session");
                return None;
            }
        };
        match serde_json::from_str(&raw) {
            Ok(session) => Some(session),
            Err(e) => {
                tracing::warn!(error = %e, "discarding undecodable stored session");
                if let Err(e) = self.inner.storage.remove_item(SESSION_KEY) {
                    tracing::warn!(error = %e, "failed to remove stored session");
                }
                None
            }
        }
    }

    fn publish(&self, event: AuthEvent) {
        // No subscribers is fine.
        let _ = self.inner.events.send(event);
    }

    fn anon_request(&self, method: Method, url: url::Url) -> reqwest::RequestBuilder {
        let key = self.inner.anon_key.expose_secret().to_string();
        self.request_with_token(method, url, &key)
    }

    async fn refresh(&self, refresh_token: &str) -> Result<Session, BackendError> {
        let mut url = self.url("auth/v1/token")?;
        url.query_pairs_mut().append_pair("grant_type", "refresh_token");
        let request = self
            .anon_request(Method::POST, url)
            .json(&serde_json::json!({ "refresh_token": refresh_token }));
        let token: TokenResponse = self.execute_json(request, "auth/token").await?;
        Ok(token.into_session(Utc::now()))
    }
}

#[async_trait]
impl AuthBackend for BackendClient {
    #[instrument(skip(self))]
    async fn current_session(&self) -> Result<Option<Session>, BackendError> {
        let Some(session) = self.session_snapshot().or_else(|| self.load_persisted_session())
        else {
            return Ok(None);
        };

        if !session.is_expired_at(Utc::now(), Duration::seconds(EXPIRY_LEEWAY_SECS)) {
            *self
                .inner
                .session
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner) = Some(session.clone());
            return Ok(Some(session));
        }

        tracing::debug!(user_id = %session.user.id, "refreshing expired session");
        match self.refresh(&session.refresh_token).await {
            Ok(fresh) => {
                self.store_session(Some(&fresh))?;
                self.publish(AuthEvent::TokenRefreshed(fresh.clone()));
                Ok(Some(fresh))
            }
            Err(e @ BackendError::Api { .. }) => {
                tracing::warn!(error = %e, "session refresh rejected, dropping stored session");
                self.store_session(None)?;
                self.publish(AuthEvent::SignedOut);
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    #[instrument(skip(self, password))]
    async fn sign_in_with_password(
        &self,
        email: &Email,
        password: &str,
    ) -> Result<Session, BackendError> {
        let mut url = self.url("auth/v1/token")?;
        url.query_pairs_mut().append_pair("grant_type", "password");
        let request = self.anon_request(Method::POST, url).json(&serde_json::json!({
            "email": email.as_str(),
            "password": password,
        }));

        let token: TokenResponse = self.execute_json(request, "auth/token").await?;
        let session = token.into_session(Utc::now());
        self.store_session(Some(&session))?;
        self.publish(AuthEvent::SignedIn(session.clone()));
        Ok(session)
    }

    #[instrument(skip(self, password))]
    async fn sign_up(&self, email: &Email, password: &str) -> Result<AuthUser, BackendError> {
        let url = self.url("auth/v1/signup")?;
        let request = self.anon_request(Method::POST, url).json(&serde_json::json!({
            "email": email.as_str(),
            "password": password,
        }));

        let user = match self.execute_json::<SignUpResponse>(request, "auth/signup").await? {
            SignUpResponse::Session(token) => token.user,
            SignUpResponse::User(user) => user,
        };
        Ok(user.into())
    }

    #[instrument(skip(self))]
    async fn sign_out(&self) -> Result<(), BackendError> {
        let Some(session) = self.session_snapshot().or_else(|| self.load_persisted_session())
        else {
            return Ok(());
        };

        let url = self.url("auth/v1/logout")?;
        let request = self.request_with_token(Method::POST, url, &session.access_token);
        match self.execute(request, "auth/logout").await {
            Ok(_) => {}
            // The token is already invalid server-side; finish locally.
            Err(BackendError::Api { status, .. })
                if status == StatusCode::UNAUTHORIZED.as_u16()
                    || status == StatusCode::FORBIDDEN.as_u16()
                    || status == StatusCode::NOT_FOUND.as_u16() => {}
            Err(BackendError::NotFound(_)) => {}
            Err(e) => return Err(e),
        }

        self.store_session(None)?;
        self.publish(AuthEvent::SignedOut);
        Ok(())
    }

    #[instrument(skip(self))]
    async fn send_password_reset(
        &self,
        email: &Email,
        redirect_url: &str,
    ) -> Result<(), BackendError> {
        let mut url = self.url("auth/v1/recover")?;
        url.query_pairs_mut().append_pair("redirect_to", redirect_url);
        let request = self
            .anon_request(Method::POST, url)
            .json(&serde_json::json!({ "email": email.as_str() }));
        self.execute(request, "auth/recover").await.map(drop)
    }

    fn subscribe(&self) -> broadcast::Receiver<AuthEvent> {
        self.inner.events.subscribe()
    }
}
