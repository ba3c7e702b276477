//! Object storage (`/storage/v1`).

use async_trait::async_trait;
use reqwest::Method;
use tracing::instrument;

use super::BackendClient;
use crate::backend::{BackendError, ObjectStorage};

impl BackendClient {
    /// Public URL of an object in the configured bucket.
    #[must_use]
    pub fn public_url(&self, path: &str) -> String {
        format!(
            "{}/storage/v1/object/public/{}/{}",
            self.inner.base_url.as_str().trim_end_matches('/'),
            self.inner.bucket,
            path.trim_start_matches('/')
        )
    }
}

#[async_trait]
impl ObjectStorage for BackendClient {
    #[instrument(skip(self, bytes), fields(size = bytes.len()))]
    async fn upload(
        &self,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<String, BackendError> {
        let url = self.url(&format!(
            "storage/v1/object/{}/{}",
            self.inner.bucket,
            path.trim_start_matches('/')
        ))?;
        let request = self
            .request(Method::POST, url)
            .header("Content-Type", content_type)
            .header("Cache-Control", "3600")
            .header("x-upsert", "false")
            .body(bytes);
        self.execute(request, "storage/object").await?;
        Ok(self.public_url(path))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use crate::backend::rest::BackendClient;
    use crate::config::BackendConfig;
    use crate::storage::DurableStorage;
    use secrecy::SecretString;

    #[test]
    fn test_public_url() {
        let config = BackendConfig {
            url: "https://project.supabase.co/".parse().unwrap(),
            anon_key: SecretString::from("anon".to_string()),
            storage_bucket: "imagens".to_string(),
        };
        let client = BackendClient::new(&config, DurableStorage::in_memory());
        assert_eq!(
            client.public_url("produtos/1700000000-ab12cd.png"),
            "https://project.supabase.co/storage/v1/object/public/imagens/produtos/1700000000-ab12cd.png"
        );
    }
}
