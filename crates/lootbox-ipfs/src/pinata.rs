//! Pinata pinning service store
//!
//! `pinFileToIPFS` takes every file of a batch in one multipart request.
//! Pinata requires all parts to share a leading directory, so each part is
//! named `<label>/<name>`; with `wrapWithDirectory` off the returned hash is
//! that directory, and files resolve as `<root>/<name>`.
//!
//! Requests authenticate with either a JWT or the legacy API key pair.

use crate::error::{IpfsError, Result};
use crate::{check_status, file_part};
use async_trait::async_trait;
use lootbox_core::{ContentStore, NamedBlob, Secret, Secrets, StoreError};
use serde::Deserialize;
use serde_json::json;

/// Default Pinata API endpoint
pub const DEFAULT_API_URL: &str = "https://api.pinata.cloud";

const PIN_PATH: &str = "/pinning/pinFileToIPFS";

#[derive(Debug, Deserialize)]
struct PinResponse {
    #[serde(rename = "IpfsHash")]
    ipfs_hash: String,
}

/// Pinata credentials
#[derive(Debug, Clone)]
pub enum PinataAuth {
    /// `Authorization: Bearer <jwt>`
    Jwt(Secret),
    /// `pinata_api_key` / `pinata_secret_api_key` headers
    ApiKey {
        /// API key
        key: Secret,
        /// API secret
        secret: Secret,
    },
}

impl PinataAuth {
    /// Pick credentials from the run's secrets, preferring the JWT
    ///
    /// # Errors
    /// Returns `IpfsError::MissingToken` when neither a JWT nor a full key pair is set
    pub fn from_secrets(secrets: &Secrets) -> Result<Self> {
        match (&secrets.storage_token, &secrets.storage_api_key, &secrets.storage_api_secret) {
            (Some(jwt), _, _) => Ok(Self::Jwt(jwt.clone())),
            (None, Some(key), Some(secret)) => Ok(Self::ApiKey {
                key: key.clone(),
                secret: secret.clone(),
            }),
            _ => Err(IpfsError::MissingToken { backend: "pinata" }),
        }
    }

    fn apply(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self {
            Self::Jwt(jwt) => request.bearer_auth(jwt.expose()),
            Self::ApiKey { key, secret } => request
                .header("pinata_api_key", key.expose())
                .header("pinata_secret_api_key", secret.expose()),
        }
    }
}

/// Content store backed by Pinata
#[derive(Debug, Clone)]
pub struct PinataStore {
    client: reqwest::Client,
    api_url: String,
    auth: PinataAuth,
}

impl PinataStore {
    /// Create store with the given credentials
    #[must_use]
    pub fn new(client: reqwest::Client, api_url: impl Into<String>, auth: PinataAuth) -> Self {
        Self {
            client,
            api_url: api_url.into().trim_end_matches('/').to_string(),
            auth,
        }
    }

    async fn pin(&self, label: &str, files: Vec<NamedBlob>, wrap_in_directory: bool) -> Result<String> {
        let mut form = reqwest::multipart::Form::new();
        for file in files {
            form = form.part("file", file_part(format!("{label}/{}", file.name), file.bytes));
        }
        form = form
            .text("pinataMetadata", json!({ "name": label }).to_string())
            .text("pinataOptions", pin_options(wrap_in_directory).to_string());

        let url = format!("{}{PIN_PATH}", self.api_url);
        let request = self.auth.apply(self.client.post(&url)).multipart(form);

        let response = check_status(PIN_PATH, request.send().await?).await?;
        let body = response.text().await?;
        parse_pin_response(&body)
    }
}

fn pin_options(wrap_in_directory: bool) -> serde_json::Value {
    json!({ "cidVersion": 1, "wrapWithDirectory": wrap_in_directory })
}

/// Extract the root hash from a `pinFileToIPFS` response
pub fn parse_pin_response(body: &str) -> Result<String> {
    let parsed: PinResponse = serde_json::from_str(body)
        .map_err(|e| IpfsError::Response(format!("bad pin response: {e}")))?;
    Ok(parsed.ipfs_hash)
}

#[async_trait]
impl ContentStore for PinataStore {
    async fn put(
        &self,
        label: &str,
        files: Vec<NamedBlob>,
        wrap_in_directory: bool,
    ) -> std::result::Result<String, StoreError> {
        tracing::debug!(label, files = files.len(), "pinata pin");
        Ok(self.pin(label, files, wrap_in_directory).await?)
    }
}
