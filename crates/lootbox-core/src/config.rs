//! Pipeline configuration
//!
//! Non-secret settings come from a TOML file; every value can be overridden
//! from the environment. Secrets (storage token, signing key) are read from
//! the environment only.

use crate::error::ConfigError;
use crate::identity::normalize;
use crate::types::{MintDiscipline, UriStyle};
use alloy_primitives::Address;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::str::FromStr;

/// Environment variable names
pub mod env {
    /// JSON-RPC endpoint
    pub const RPC_URL: &str = "LOOTBOX_RPC_URL";
    /// Contract address
    pub const CONTRACT_ADDRESS: &str = "LOOTBOX_CONTRACT_ADDRESS";
    /// Owner signing key (secret)
    pub const OWNER_PRIVATE_KEY: &str = "LOOTBOX_OWNER_PRIVATE_KEY";
    /// Storage API token (secret)
    pub const STORAGE_TOKEN: &str = "LOOTBOX_STORAGE_TOKEN";
    /// Storage API key, paired with the API secret (secret)
    pub const STORAGE_API_KEY: &str = "LOOTBOX_STORAGE_API_KEY";
    /// Storage API secret (secret)
    pub const STORAGE_API_SECRET: &str = "LOOTBOX_STORAGE_API_SECRET";
    /// Storage API base URL
    pub const STORAGE_API_URL: &str = "LOOTBOX_STORAGE_API_URL";
    /// Inline recipient map, `handle=0xaddr,handle=0xaddr`
    pub const RECIPIENTS: &str = "LOOTBOX_RECIPIENTS";
}

/// Complete pipeline configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    /// Content-addressed storage settings
    pub storage: StorageConfig,
    /// Chain settings
    pub chain: ChainConfig,
    /// Mint stage settings
    pub mint: MintConfig,
    /// Recipient handle to wallet address
    pub recipients: BTreeMap<String, Address>,
}

/// Storage backend selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// Kubo (go-ipfs) HTTP RPC
    #[default]
    Kubo,
    /// Pinata pinning service
    Pinata,
}

/// Content-addressed storage settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StorageConfig {
    /// Backend kind
    pub backend: StorageBackend,
    /// API base URL (backend default when absent)
    pub api_url: Option<String>,
    /// How published URIs are formed
    pub uri_style: UriStyle,
    /// Per-request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::default(),
            api_url: None,
            uri_style: UriStyle::default(),
            timeout_secs: 300,
        }
    }
}

/// Chain settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ChainConfig {
    /// JSON-RPC endpoint
    pub endpoint: Option<String>,
    /// Token contract address
    pub contract_address: Option<Address>,
    /// Confirmations required for finality
    pub confirmations: u64,
    /// Seconds to wait for a receipt before failing the mint
    pub confirm_timeout_secs: u64,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            contract_address: None,
            confirmations: 1,
            confirm_timeout_secs: 600,
        }
    }
}

/// Mint stage settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MintConfig {
    /// Confirmation discipline
    pub discipline: MintDiscipline,
    /// Extension of asset files, without the dot
    pub asset_extension: String,
}

impl Default for MintConfig {
    fn default() -> Self {
        Self {
            discipline: MintDiscipline::default(),
            asset_extension: "gif".to_string(),
        }
    }
}

impl PipelineConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse from TOML text
    ///
    /// # Errors
    /// Returns `ConfigError::Parse` on malformed input
    pub fn from_toml_str(text: &str, origin: &Path) -> Result<Self, ConfigError> {
        toml::from_str(text).map_err(|source| ConfigError::Parse {
            path: origin.to_path_buf(),
            source,
        })
    }

    /// Load from a TOML file; a missing file yields defaults
    ///
    /// # Errors
    /// - `ConfigError::Read` if the file exists but cannot be read
    /// - `ConfigError::Parse` if it is not valid
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(text) => Self::from_toml_str(&text, path),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "no config file, using defaults");
                Ok(Self::default())
            }
            Err(source) => Err(ConfigError::Read {
                path: path.to_path_buf(),
                source,
            }),
        }
    }

    /// Overlay values from the environment
    ///
    /// `lookup` abstracts `std::env::var` so tests can supply a map.
    ///
    /// A recipient from the environment replaces any file entry whose handle
    /// normalizes to the same key.
    ///
    /// # Errors
    /// Returns `ConfigError::Invalid` if an override is malformed
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(env::RPC_URL) {
            self.chain.endpoint = Some(url);
        }
        if let Some(raw) = lookup(env::CONTRACT_ADDRESS) {
            let address = Address::from_str(raw.trim())
                .map_err(|e| ConfigError::invalid(env::CONTRACT_ADDRESS, e.to_string()))?;
            self.chain.contract_address = Some(address);
        }
        if let Some(url) = lookup(env::STORAGE_API_URL) {
            self.storage.api_url = Some(url);
        }
        if let Some(raw) = lookup(env::RECIPIENTS) {
            for (handle, address) in parse_recipient_list(&raw)? {
                let key = normalize(&handle);
                self.recipients.retain(|existing, _| normalize(existing) != key);
                self.recipients.insert(key, address);
            }
        }
        Ok(())
    }

    /// Check settings needed by any run (including dry runs)
    ///
    /// # Errors
    /// Returns the first problem found
    pub fn validate(&self) -> Result<(), ConfigError> {
        let ext = &self.mint.asset_extension;
        if ext.is_empty() || ext.starts_with('.') || ext.contains('/') {
            return Err(ConfigError::invalid(
                "mint.asset_extension",
                format!("'{ext}' must be a bare extension such as 'gif'"),
            ));
        }
        if self.recipients.is_empty() {
            return Err(ConfigError::Missing("recipients"));
        }
        if let UriStyle::Subdomain { gateway_host, .. } = &self.storage.uri_style {
            if gateway_host.is_empty() {
                return Err(ConfigError::invalid(
                    "storage.uri_style.gateway_host",
                    "must not be empty",
                ));
            }
        }
        Ok(())
    }

    /// Check settings needed to reach the chain
    ///
    /// # Errors
    /// Returns `ConfigError::Missing` for an absent endpoint or contract
    pub fn chain_target(&self) -> Result<(&str, Address), ConfigError> {
        let endpoint = self
            .chain
            .endpoint
            .as_deref()
            .ok_or(ConfigError::Missing(env::RPC_URL))?;
        let contract = self
            .chain
            .contract_address
            .ok_or(ConfigError::Missing(env::CONTRACT_ADDRESS))?;
        Ok((endpoint, contract))
    }
}

fn parse_recipient_list(raw: &str) -> Result<Vec<(String, Address)>, ConfigError> {
    raw.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| {
            let (handle, address) = entry.split_once('=').ok_or_else(|| {
                ConfigError::invalid(env::RECIPIENTS, format!("'{entry}' is not handle=address"))
            })?;
            let address = Address::from_str(address.trim())
                .map_err(|e| ConfigError::invalid(env::RECIPIENTS, format!("{handle}: {e}")))?;
            Ok((handle.trim().to_string(), address))
        })
        .collect()
}

/// Secret string whose `Debug` output is redacted
#[derive(Clone, PartialEq, Eq)]
pub struct Secret(String);

impl Secret {
    /// Wrap a secret value
    #[inline]
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Access the secret value
    #[inline]
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for Secret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Secret(***)")
    }
}

/// Secrets held for the duration of one run
#[derive(Debug, Clone, Default)]
pub struct Secrets {
    /// Storage service API token
    pub storage_token: Option<Secret>,
    /// Storage service API key, used with `storage_api_secret`
    pub storage_api_key: Option<Secret>,
    /// Storage service API secret
    pub storage_api_secret: Option<Secret>,
    /// Owner signing key
    pub signing_key: Option<Secret>,
}

impl Secrets {
    /// Read secrets through `lookup`; empty values count as absent
    pub fn from_env<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |key| lookup(key).filter(|v| !v.trim().is_empty()).map(Secret::new);
        Self {
            storage_token: read(env::STORAGE_TOKEN),
            storage_api_key: read(env::STORAGE_API_KEY),
            storage_api_secret: read(env::STORAGE_API_SECRET),
            signing_key: read(env::OWNER_PRIVATE_KEY),
        }
    }

    /// Signing key, required for any chain call
    ///
    /// # Errors
    /// Returns `ConfigError::Missing` when unset
    pub fn require_signing_key(&self) -> Result<&Secret, ConfigError> {
        self.signing_key
            .as_ref()
            .ok_or(ConfigError::Missing(env::OWNER_PRIVATE_KEY))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    const SAMPLE: &str = r#"
[storage]
backend = "pinata"
uri_style = { kind = "path", scheme = "ipfs" }

[chain]
endpoint = "https://eth-goerli.example/v2/key"
contract_address = "0x00000000000000000000000000000000000000aa"
confirmations = 2

[mint]
discipline = "submit-all-then-confirm"
asset_extension = "png"

[recipients]
aoth = "0x3fAb8CC827b4C41Dc9e6C07d522fD2f48A431f23"
"#;

    fn lookup(map: HashMap<&'static str, &'static str>) -> impl Fn(&str) -> Option<String> {
        move |key: &str| map.get(key).map(|v| (*v).to_string())
    }

    #[test]
    fn parses_full_file() {
        let config = PipelineConfig::from_toml_str(SAMPLE, Path::new("lootbox.toml")).unwrap();
        assert_eq!(config.storage.backend, StorageBackend::Pinata);
        assert_eq!(config.chain.confirmations, 2);
        assert_eq!(config.chain.confirm_timeout_secs, 600);
        assert_eq!(config.mint.discipline, MintDiscipline::SubmitAllThenConfirm);
        assert_eq!(config.mint.asset_extension, "png");
        assert_eq!(config.recipients.len(), 1);
        config.validate().unwrap();
        assert!(config.chain_target().is_ok());
    }

    #[test]
    fn rejects_unknown_keys() {
        let err = PipelineConfig::from_toml_str("[mint]\nspeed = 3\n", Path::new("x.toml"));
        assert!(matches!(err, Err(ConfigError::Parse { .. })));
    }

    #[test]
    fn missing_file_is_default() {
        let dir = tempfile::tempdir().unwrap();
        let config = PipelineConfig::load(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.mint.asset_extension, "gif");
        assert_eq!(config.mint.discipline, MintDiscipline::ConfirmThenContinue);
    }

    #[test]
    fn env_overrides_file() {
        let mut config = PipelineConfig::from_toml_str(SAMPLE, Path::new("lootbox.toml")).unwrap();
        config
            .apply_env(lookup(HashMap::from([
                (env::RPC_URL, "http://127.0.0.1:8545"),
                (
                    env::RECIPIENTS,
                    "bob=0x00000000000000000000000000000000000000b0, carol = 0x00000000000000000000000000000000000000c0",
                ),
            ])))
            .unwrap();
        assert_eq!(config.chain.endpoint.as_deref(), Some("http://127.0.0.1:8545"));
        assert_eq!(config.recipients.len(), 3);
        assert!(config.recipients.contains_key("carol"));
    }

    #[test]
    fn env_recipient_replaces_file_entry_regardless_of_case() {
        let mut config = PipelineConfig::from_toml_str(
            &SAMPLE.replace("\naoth = ", "\nAoth = "),
            Path::new("lootbox.toml"),
        )
        .unwrap();
        assert!(config.recipients.contains_key("Aoth"));

        config
            .apply_env(lookup(HashMap::from([(
                env::RECIPIENTS,
                " aoth =0x00000000000000000000000000000000000000a0",
            )])))
            .unwrap();

        assert_eq!(config.recipients.len(), 1);
        assert_eq!(
            config.recipients.get("aoth"),
            Some(&Address::from_str("0x00000000000000000000000000000000000000a0").unwrap())
        );
        let directory = crate::identity::RecipientDirectory::from_entries(
            config.recipients.iter().map(|(handle, address)| (handle, *address)),
        )
        .unwrap();
        assert_eq!(directory.len(), 1);
    }

    #[test]
    fn env_rejects_bad_address() {
        let mut config = PipelineConfig::new();
        let err = config
            .apply_env(lookup(HashMap::from([(env::CONTRACT_ADDRESS, "0x123")])))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { .. }));
    }

    #[test]
    fn validate_checks_extension_and_recipients() {
        let mut config = PipelineConfig::new();
        assert!(matches!(config.validate(), Err(ConfigError::Missing("recipients"))));

        config.recipients.insert("aoth".to_string(), Address::ZERO);
        config.mint.asset_extension = ".gif".to_string();
        assert!(matches!(config.validate(), Err(ConfigError::Invalid { .. })));

        config.mint.asset_extension = "gif".to_string();
        assert!(config.validate().is_ok());
        assert!(matches!(config.chain_target(), Err(ConfigError::Missing(_))));
    }

    #[test]
    fn secrets_are_redacted() {
        let secrets = Secrets::from_env(lookup(HashMap::from([
            (env::OWNER_PRIVATE_KEY, "deadbeef"),
            (env::STORAGE_TOKEN, "  "),
        ])));
        assert!(secrets.storage_token.is_none());
        let key = secrets.require_signing_key().unwrap();
        assert_eq!(key.expose(), "deadbeef");
        assert!(!format!("{secrets:?}").contains("deadbeef"));
    }
}
