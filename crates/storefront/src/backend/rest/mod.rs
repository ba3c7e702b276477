//! REST client for a Supabase-compatible Backend-as-a-Service.
//!
//! One [`BackendClient`] implements every collaborator trait:
//!
//! - auth (`/auth/v1`) in [`auth`]
//! - tables through `PostgREST` (`/rest/v1/<table>`) in [`tables`]
//! - object storage (`/storage/v1`) in [`objects`]
//!
//! Requests carry the project's anon key as `apikey` and, when signed in,
//! the user's access token as the bearer so row-level security applies.

mod auth;
mod objects;
pub mod rows;
mod tables;

use std::sync::{Arc, Mutex, PoisonError};

use reqwest::{Method, RequestBuilder, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tokio::sync::broadcast;
use url::Url;

use crate::backend::BackendError;
use crate::config::BackendConfig;
use crate::models::{AuthEvent, Session};
use crate::storage::DurableStorage;

/// Accept header asking `PostgREST` for exactly one row as an object.
const SINGLE_OBJECT: &str = "application/vnd.pgrst.object+json";

/// `PostgREST` error code for "zero rows where exactly one was required".
const NO_ROWS_CODE: &str = "PGRST116";

/// Capacity of the auth-event channel.
const AUTH_EVENT_CAPACITY: usize = 16;

/// Body length kept when logging failed responses.
const LOGGED_BODY_CHARS: usize = 500;

// =============================================================================
// BackendClient
// =============================================================================

/// Client for the backend's auth, table and storage APIs.
#[derive(Clone)]
pub struct BackendClient {
    inner: Arc<BackendClientInner>,
}

struct BackendClientInner {
    client: reqwest::Client,
    base_url: Url,
    anon_key: SecretString,
    bucket: String,
    storage: DurableStorage,
    session: Mutex<Option<Session>>,
    events: broadcast::Sender<AuthEvent>,
}

impl std::fmt::Debug for BackendClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendClient")
            .field("base_url", &self.inner.base_url.as_str())
            .field("bucket", &self.inner.bucket)
            .finish_non_exhaustive()
    }
}

/// Error body shapes returned by the auth, table and storage services.
#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    code: Option<serde_json::Value>,
    #[serde(default)]
    error_code: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    msg: Option<String>,
    #[serde(default)]
    error_description: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

impl ErrorBody {
    fn code(&self) -> Option<String> {
        self.error_code.clone().or_else(|| {
            self.code.as_ref().map(|c| match c {
                serde_json::Value::String(s) => s.clone(),
                other => other.to_string(),
            })
        })
    }

    fn message(self) -> Option<String> {
        self.message
            .or(self.msg)
            .or(self.error_description)
            .or(self.error)
    }
}

impl BackendClient {
    /// Create a client. The persisted session, if any, is loaded lazily.
    #[must_use]
    pub fn new(config: &BackendConfig, storage: DurableStorage) -> Self {
        let (events, _) = broadcast::channel(AUTH_EVENT_CAPACITY);
        Self {
            inner: Arc::new(BackendClientInner {
                client: reqwest::Client::new(),
                base_url: config.url.clone(),
                anon_key: config.anon_key.clone(),
                bucket: config.storage_bucket.clone(),
                storage,
                session: Mutex::new(None),
                events,
            }),
        }
    }

    /// Absolute URL for `path` under the project base URL.
    fn url(&self, path: &str) -> Result<Url, BackendError> {
        self.inner.base_url.join(path).map_err(|e| BackendError::Api {
            status: 0,
            code: None,
            message: format!("invalid request path {path}: {e}"),
        })
    }

    /// Request with the API key and the best available bearer token.
    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        let bearer = self
            .session_snapshot()
            .map_or_else(|| self.inner.anon_key.expose_secret().to_string(), |s| s.access_token);
        self.request_with_token(method, url, &bearer)
    }

    fn request_with_token(&self, method: Method, url: Url, token: &str) -> RequestBuilder {
        self.inner
            .client
            .request(method, url)
            .header("apikey", self.inner.anon_key.expose_secret())
            .bearer_auth(token)
    }

    /// Request against a `PostgREST` table.
    fn table(&self, method: Method, table: &str, query: &[(&str, String)]) -> Result<RequestBuilder, BackendError> {
        let mut url = self.url(&format!("rest/v1/{table}"))?;
        if !query.is_empty() {
            url.query_pairs_mut()
                .extend_pairs(query.iter().map(|(k, v)| (*k, v.as_str())));
        }
        Ok(self.request(method, url))
    }

    fn session_snapshot(&self) -> Option<Session> {
        self.inner
            .session
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Send a request and return the body of a successful response.
    async fn execute(&self, request: RequestBuilder, resource: &str) -> Result<String, BackendError> {
        let response = request.send().await?;
        let status = response.status();

        // Check for rate limiting
        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok())
                .unwrap_or(1);
            return Err(BackendError::RateLimited(retry_after));
        }

        let body = response.text().await?;
        if status.is_success() {
            return Ok(body);
        }

        let parsed: ErrorBody = serde_json::from_str(&body).unwrap_or_default();
        let code = parsed.code();
        if code.as_deref() == Some(NO_ROWS_CODE) || status == StatusCode::NOT_ACCEPTABLE {
            tracing::debug!(resource, "no matching row");
            return Err(BackendError::NotFound(resource.to_string()));
        }

        tracing::error!(
            status = %status,
            resource,
            body = %body.chars().take(LOGGED_BODY_CHARS).collect::<String>(),
            "backend returned non-success status"
        );
        Err(BackendError::Api {
            status: status.as_u16(),
            code,
            message: parsed.message().unwrap_or_else(|| status.to_string()),
        })
    }

    /// Send a request and decode its JSON body.
    async fn execute_json<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        resource: &str,
    ) -> Result<T, BackendError> {
        let body = self.execute(request, resource).await?;
        serde_json::from_str(&body).map_err(|e| {
            tracing::error!(
                error = %e,
                resource,
                body = %body.chars().take(LOGGED_BODY_CHARS).collect::<String>(),
                "failed to parse backend response"
            );
            BackendError::Parse(e)
        })
    }

    // -------------------------------------------------------------------------
    // PostgREST helpers
    // -------------------------------------------------------------------------

    /// Select exactly one row; `NotFound` when there is none.
    async fn select_one<R: DeserializeOwned>(
        &self,
        table: &str,
        query: &[(&str, String)],
    ) -> Result<R, BackendError> {
        let request = self
            .table(Method::GET, table, query)?
            .header("Accept", SINGLE_OBJECT);
        self.execute_json(request, table).await
    }

    async fn select_many<R: DeserializeOwned>(
        &self,
        table: &str,
        query: &[(&str, String)],
    ) -> Result<Vec<R>, BackendError> {
        let request = self.table(Method::GET, table, query)?;
        self.execute_json(request, table).await
    }

    /// Insert one row and return it as stored.
    async fn insert_returning<B, R>(&self, table: &str, body: &B) -> Result<R, BackendError>
    where
        B: serde::Serialize + Sync + ?Sized,
        R: DeserializeOwned,
    {
        let request = self
            .table(Method::POST, table, &[])?
            .header("Prefer", "return=representation")
            .header("Accept", SINGLE_OBJECT)
            .json(body);
        self.execute_json(request, table).await
    }

    async fn insert_rows<B>(&self, table: &str, body: &B) -> Result<(), BackendError>
    where
        B: serde::Serialize + Sync + ?Sized,
    {
        let request = self
            .table(Method::POST, table, &[])?
            .header("Prefer", "return=minimal")
            .json(body);
        self.execute(request, table).await.map(drop)
    }

    async fn patch<B>(&self, table: &str, filter: &[(&str, String)], body: &B) -> Result<(), BackendError>
    where
        B: serde::Serialize + Sync + ?Sized,
    {
        let request = self
            .table(Method::PATCH, table, filter)?
            .header("Prefer", "return=minimal")
            .json(body);
        self.execute(request, table).await.map(drop)
    }

    async fn delete_where(&self, table: &str, filter: &[(&str, String)]) -> Result<(), BackendError> {
        let request = self.table(Method::DELETE, table, filter)?;
        self.execute(request, table).await.map(drop)
    }
}

/// `column=eq.value` filter pair.
fn eq(column: &'static str, value: impl std::fmt::Display) -> (&'static str, String) {
    (column, format!("eq.{value}"))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn client() -> BackendClient {
        let config = BackendConfig {
            url: "https://project.supabase.co".parse().unwrap(),
            anon_key: SecretString::from("anon".to_string()),
            storage_bucket: "imagens".to_string(),
        };
        BackendClient::new(&config, DurableStorage::in_memory())
    }

    #[test]
    fn test_table_url_with_filters() {
        let request = client()
            .table(
                Method::GET,
                "perfis",
                &[("select", "*".to_string()), eq("user_id", "abc")],
            )
            .unwrap()
            .build()
            .unwrap();
        assert_eq!(
            request.url().as_str(),
            "https://project.supabase.co/rest/v1/perfis?select=*&user_id=eq.abc"
        );
        assert_eq!(request.headers()["apikey"], "anon");
        assert_eq!(request.headers()["authorization"], "Bearer anon");
    }

    #[test]
    fn test_error_body_shapes() {
        let rest: ErrorBody = serde_json::from_str(
            r#"{"code":"PGRST116","message":"JSON object requested, multiple (or no) rows returned"}"#,
        )
        .unwrap();
        assert_eq!(rest.code().as_deref(), Some("PGRST116"));

        let auth: ErrorBody = serde_json::from_str(
            r#"{"code":400,"error_code":"invalid_credentials","msg":"Invalid login credentials"}"#,
        )
        .unwrap();
        assert_eq!(auth.code().as_deref(), Some("invalid_credentials"));
        assert_eq!(auth.message().as_deref(), Some("Invalid login credentials"));

        let oauth: ErrorBody = serde_json::from_str(
            r#"{"error":"invalid_grant","error_description":"Refresh Token Not Found"}"#,
        )
        .unwrap();
        assert_eq!(oauth.message().as_deref(), Some("Refresh Token Not Found"));
    }
}
