//! IPFS content stores for the lootbox pipeline
//!
//! Two [`ContentStore`] backends:
//! - [`KuboStore`]: a Kubo node's HTTP RPC (`/api/v0/add`)
//! - [`PinataStore`]: the Pinata pinning service (`pinFileToIPFS`)
//!
//! [`connect`] picks one from [`StorageConfig`].

#![warn(unreachable_pub)]

pub mod error;
pub mod kubo;
pub mod pinata;

pub use error::IpfsError;
pub use kubo::KuboStore;
pub use pinata::{PinataAuth, PinataStore};

use lootbox_core::{ContentStore, Secrets, StorageBackend, StorageConfig};
use std::sync::Arc;
use std::time::Duration;

/// Build the configured store
///
/// # Errors
/// - `IpfsError::InvalidUrl` if the API URL is not http(s)
/// - `IpfsError::MissingToken` if Pinata is selected without a JWT or key pair
/// - `IpfsError::Client` if the HTTP client cannot be built
pub fn connect(config: &StorageConfig, secrets: &Secrets) -> error::Result<Arc<dyn ContentStore>> {
    let default_url = match config.backend {
        StorageBackend::Kubo => kubo::DEFAULT_API_URL,
        StorageBackend::Pinata => pinata::DEFAULT_API_URL,
    };
    let api_url = config.api_url.as_deref().unwrap_or(default_url);
    validate_url(api_url)?;
    let client = http_client(Duration::from_secs(config.timeout_secs))?;

    tracing::info!(backend = ?config.backend, api = %api_url, "storage backend");
    let store: Arc<dyn ContentStore> = match config.backend {
        StorageBackend::Kubo => Arc::new(KuboStore::new(
            client,
            api_url,
            secrets.storage_token.clone(),
        )),
        StorageBackend::Pinata => {
            let auth = PinataAuth::from_secrets(secrets)?;
            Arc::new(PinataStore::new(client, api_url, auth))
        }
    };
    Ok(store)
}

fn validate_url(url: &str) -> error::Result<()> {
    let parsed = reqwest::Url::parse(url).map_err(|e| IpfsError::InvalidUrl {
        url: url.to_string(),
        reason: e.to_string(),
    })?;
    match parsed.scheme() {
        "http" | "https" => Ok(()),
        other => Err(IpfsError::InvalidUrl {
            url: url.to_string(),
            reason: format!("unsupported scheme '{other}'"),
        }),
    }
}

fn http_client(timeout: Duration) -> error::Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .user_agent(concat!("lootbox/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(IpfsError::Client)
}

/// Multipart file part for a batch entry
pub(crate) fn file_part(name: String, bytes: Vec<u8>) -> reqwest::multipart::Part {
    reqwest::multipart::Part::bytes(bytes).file_name(name)
}

/// Upload path of a file: flat, or nested under the batch label
pub(crate) fn part_name(label: &str, name: &str, wrap_in_directory: bool) -> String {
    if wrap_in_directory {
        format!("{label}/{name}")
    } else {
        name.to_string()
    }
}

/// Turn a non-success response into `IpfsError::Status`
pub(crate) async fn check_status(
    endpoint: &str,
    response: reqwest::Response,
) -> error::Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(IpfsError::Status {
        endpoint: endpoint.to_string(),
        status: status.as_u16(),
        body: body.chars().take(512).collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use lootbox_core::Secret;

    fn no_secrets() -> Secrets {
        Secrets::default()
    }

    #[test]
    fn part_names() {
        assert_eq!(part_name("assets", "1.gif", false), "1.gif");
        assert_eq!(part_name("assets", "1.gif", true), "assets/1.gif");
    }

    #[test]
    fn pinata_requires_token() {
        let config = StorageConfig {
            backend: StorageBackend::Pinata,
            ..StorageConfig::default()
        };
        assert!(matches!(
            connect(&config, &no_secrets()),
            Err(IpfsError::MissingToken { backend: "pinata" })
        ));

        let jwt = Secrets {
            storage_token: Some(Secret::new("jwt")),
            ..Secrets::default()
        };
        assert!(connect(&config, &jwt).is_ok());

        let key_pair = Secrets {
            storage_api_key: Some(Secret::new("key")),
            storage_api_secret: Some(Secret::new("secret")),
            ..Secrets::default()
        };
        assert!(connect(&config, &key_pair).is_ok());
    }

    #[test]
    fn kubo_token_is_optional() {
        assert!(connect(&StorageConfig::default(), &no_secrets()).is_ok());
    }

    #[test]
    fn rejects_non_http_urls() {
        let config = StorageConfig {
            api_url: Some("ftp://node".to_string()),
            ..StorageConfig::default()
        };
        assert!(matches!(connect(&config, &no_secrets()), Err(IpfsError::InvalidUrl { .. })));

        let config = StorageConfig {
            api_url: Some("not a url".to_string()),
            ..StorageConfig::default()
        };
        assert!(matches!(connect(&config, &no_secrets()), Err(IpfsError::InvalidUrl { .. })));
    }
}
