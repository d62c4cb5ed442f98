//! Object storage for rendered artifacts.
//!
//! The client is built once at startup and shared by every request.

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use reqwest::header::{CACHE_CONTROL, CONTENT_TYPE};
use secrecy::{ExposeSecret, SecretString};
use tracing::info;

/// Blob store that can hold an artifact and hand back a public URL for it.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Writes `bytes` under `name`. Existing objects are never overwritten.
    async fn upload(&self, name: &str, bytes: Vec<u8>, content_type: &str) -> Result<()>;

    /// Publicly resolvable URL for an object written by [`ObjectStore::upload`].
    fn public_url(&self, name: &str) -> String;
}

/// Supabase Storage REST client.
///
/// Objects are written through the authenticated object endpoint and read back
/// through the bucket's public endpoint.
pub struct SupabaseStorage {
    client: reqwest::Client,
    base_url: String,
    api_key: SecretString,
    bucket: String,
}

impl SupabaseStorage {
    /// Creates a client for one bucket.
    ///
    /// # Arguments
    /// * `client` - Shared HTTP client
    /// * `base_url` - Project URL; a trailing slash is ignored
    /// * `api_key` - Service key sent as both bearer token and `apikey`
    /// * `bucket` - Target bucket name
    pub fn new(
        client: reqwest::Client,
        base_url: &str,
        api_key: SecretString,
        bucket: impl Into<String>,
    ) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            bucket: bucket.into(),
        }
    }

    fn object_url(&self, name: &str) -> String {
        format!("{}/storage/v1/object/{}/{}", self.base_url, self.bucket, name)
    }
}

#[async_trait]
impl ObjectStore for SupabaseStorage {
    async fn upload(&self, name: &str, bytes: Vec<u8>, content_type: &str) -> Result<()> {
        let size = bytes.len();
        let key = self.api_key.expose_secret();

        // x-upsert false: a name collision fails instead of replacing an object
        let response = self
            .client
            .post(self.object_url(name))
            .bearer_auth(key)
            .header("apikey", key.as_str())
            .header(CONTENT_TYPE, content_type)
            .header(CACHE_CONTROL, "max-age=3600")
            .header("x-upsert", "false")
            .body(bytes)
            .send()
            .await
            .with_context(|| format!("Failed to reach object store for {}", name))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            bail!("Object store rejected {} ({}): {}", name, status, body);
        }

        info!(
            "Uploaded artifact: bucket={}, name={}, bytes={}",
            self.bucket, name, size
        );
        Ok(())
    }

    fn public_url(&self, name: &str) -> String {
        format!(
            "{}/storage/v1/object/public/{}/{}",
            self.base_url, self.bucket, name
        )
    }
}
