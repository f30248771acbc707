//! Core types for the pipeline
//!
//! Defines the fundamental types shared by every stage:
//! - Run and token identifiers
//! - Publish results and URI construction
//! - Mint receipts and balance snapshots
//! - The end-of-run report

use alloy_primitives::{Address, TxHash, U256};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::str::FromStr;
use ulid::Ulid;

/// Unique run identifier (ULID for sortability)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RunId(pub Ulid);

impl RunId {
    /// Generate new run ID
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self(Ulid::new())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Token identifier, the base name of a metadata file
///
/// Also the join key between the asset and metadata directories.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TokenId(String);

impl TokenId {
    /// Create token ID from a file stem
    #[inline]
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow as string slice
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// First character that would need escaping in a URI path segment
    ///
    /// Token IDs end up verbatim in asset and metadata URIs, so only RFC 3986
    /// unreserved characters (`A-Z a-z 0-9 - . _ ~`) are accepted.
    #[must_use]
    pub fn first_unsafe_char(id: &str) -> Option<char> {
        id.chars()
            .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '-' | '.' | '_' | '~')))
    }

    /// File name for this token with the given extension
    #[inline]
    #[must_use]
    pub fn file_name(&self, extension: &str) -> String {
        format!("{}.{}", self.0, extension)
    }

    /// Enumeration order: numeric IDs ascending by value, then the rest lexicographically
    #[must_use]
    pub fn enumeration_cmp(&self, other: &Self) -> Ordering {
        match (self.0.parse::<u128>(), other.0.parse::<u128>()) {
            (Ok(a), Ok(b)) => a.cmp(&b).then_with(|| self.0.cmp(&other.0)),
            (Ok(_), Err(_)) => Ordering::Less,
            (Err(_), Ok(_)) => Ordering::Greater,
            (Err(_), Err(_)) => self.0.cmp(&other.0),
        }
    }
}

impl std::fmt::Display for TokenId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Which of the two per-run publish batches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PublishBatch {
    /// Image assets
    Assets,
    /// Bound metadata records
    Metadata,
}

impl PublishBatch {
    /// Label used for logs and storage-side batch names
    #[inline]
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::Assets => "assets",
            Self::Metadata => "metadata",
        }
    }
}

impl std::fmt::Display for PublishBatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// How child URIs are built from a root identifier
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum UriStyle {
    /// `<scheme>://<root>/<name>`
    Path {
        /// URI scheme, e.g. `ipfs`
        scheme: String,
    },
    /// `<scheme>://<root>.<gateway_host>/<name>`
    Subdomain {
        /// URI scheme, e.g. `https`
        scheme: String,
        /// Gateway host, e.g. `ipfs.w3s.link`
        gateway_host: String,
    },
}

impl UriStyle {
    /// Base URI for a root identifier, always ending in `/`
    #[must_use]
    pub fn base_uri(&self, root: &str) -> String {
        match self {
            Self::Path { scheme } => format!("{scheme}://{root}/"),
            Self::Subdomain {
                scheme,
                gateway_host,
            } => format!("{scheme}://{root}.{gateway_host}/"),
        }
    }
}

impl Default for UriStyle {
    fn default() -> Self {
        Self::Path {
            scheme: "ipfs".to_string(),
        }
    }
}

/// Root identifier of a published batch and its base URI
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishResult {
    /// Content identifier returned by the storage service
    pub root: String,
    /// Base URI children are resolved against
    pub base_uri: String,
}

impl PublishResult {
    /// Build from root identifier and URI style
    #[must_use]
    pub fn new(root: impl Into<String>, style: &UriStyle) -> Self {
        let root = root.into();
        let base_uri = style.base_uri(&root);
        Self { root, base_uri }
    }

    /// URI of a file published directly under the root
    #[must_use]
    pub fn join(&self, name: &str) -> String {
        format!("{}{}", self.base_uri, name.trim_start_matches('/'))
    }
}

/// Order in which mints are submitted and confirmed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MintDiscipline {
    /// Wait for each mint's finality before submitting the next
    #[default]
    ConfirmThenContinue,
    /// Submit every mint first, then wait for all receipts
    SubmitAllThenConfirm,
}

impl MintDiscipline {
    /// Kebab-case name as used in config and on the command line
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ConfirmThenContinue => "confirm-then-continue",
            Self::SubmitAllThenConfirm => "submit-all-then-confirm",
        }
    }
}

impl FromStr for MintDiscipline {
    type Err = crate::error::ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "confirm-then-continue" => Ok(Self::ConfirmThenContinue),
            "submit-all-then-confirm" => Ok(Self::SubmitAllThenConfirm),
            other => Err(crate::error::ConfigError::invalid(
                "mint.discipline",
                format!("unknown discipline '{other}'"),
            )),
        }
    }
}

impl std::fmt::Display for MintDiscipline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Resolved mint recipient
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecipientIdentity {
    /// Normalized handle
    pub handle: String,
    /// Wallet address
    pub address: Address,
}

/// Terminal (or pending) state of one mint transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum MintStatus {
    /// Submitted, not yet confirmed
    Pending,
    /// Reached the required confirmations
    Confirmed {
        /// Inclusion block, when the node reports it
        block_number: Option<u64>,
        /// Gas consumed
        gas_used: u64,
    },
    /// Reverted or timed out
    Failed {
        /// Failure description
        reason: String,
    },
}

/// Per-token mint record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MintReceipt {
    /// Token the mint was issued for
    pub token_id: TokenId,
    /// URI passed to the contract
    pub token_uri: String,
    /// Transaction hash returned at submission
    pub tx: TxHash,
    /// Observed state
    pub status: MintStatus,
}

impl MintReceipt {
    /// Check if the mint is final
    #[inline]
    #[must_use]
    pub fn is_confirmed(&self) -> bool {
        matches!(self.status, MintStatus::Confirmed { .. })
    }
}

/// Balances captured around the mint stage
///
/// A failed query leaves the field empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceSnapshot {
    /// Recipient's token count on the contract
    pub recipient_tokens: Option<U256>,
    /// Owner's native-currency balance (wei)
    pub owner_native: Option<U256>,
}

impl BalanceSnapshot {
    /// Token delta between two snapshots, when both sides are known
    #[must_use]
    pub fn token_delta(before: &Self, after: &Self) -> Option<U256> {
        match (before.recipient_tokens, after.recipient_tokens) {
            (Some(b), Some(a)) => Some(a.saturating_sub(b)),
            _ => None,
        }
    }

    /// Native currency spent between two snapshots, when both sides are known
    #[must_use]
    pub fn native_spent(before: &Self, after: &Self) -> Option<U256> {
        match (before.owner_native, after.owner_native) {
            (Some(b), Some(a)) => Some(b.saturating_sub(a)),
            _ => None,
        }
    }
}

/// Summary of a completed run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    /// Run identifier
    pub run_id: RunId,
    /// Mint recipient
    pub recipient: RecipientIdentity,
    /// Tokens in enumeration order
    pub tokens: Vec<TokenId>,
    /// Asset batch
    pub assets: PublishResult,
    /// Metadata batch
    pub metadata: PublishResult,
    /// Discipline used for minting
    pub discipline: MintDiscipline,
    /// One receipt per token
    pub receipts: Vec<MintReceipt>,
    /// Balances before minting
    pub balance_before: BalanceSnapshot,
    /// Balances after minting
    pub balance_after: BalanceSnapshot,
    /// Run start
    pub started_at: DateTime<Utc>,
    /// Run end
    pub finished_at: DateTime<Utc>,
}

impl RunReport {
    /// Number of confirmed mints
    #[must_use]
    pub fn confirmed(&self) -> usize {
        self.receipts.iter().filter(|r| r.is_confirmed()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uri_safe_token_ids() {
        assert_eq!(TokenId::first_unsafe_char("42"), None);
        assert_eq!(TokenId::first_unsafe_char("rare-sword_v2.1~b"), None);
        assert_eq!(TokenId::first_unsafe_char("my item"), Some(' '));
        assert_eq!(TokenId::first_unsafe_char("a#b"), Some('#'));
        assert_eq!(TokenId::first_unsafe_char("é"), Some('é'));
    }

    #[test]
    fn path_style_join() {
        let published = PublishResult::new("bafyASSET", &UriStyle::default());
        assert_eq!(published.base_uri, "ipfs://bafyASSET/");
        assert_eq!(published.join("42.gif"), "ipfs://bafyASSET/42.gif");
    }

    #[test]
    fn subdomain_style_join() {
        let style = UriStyle::Subdomain {
            scheme: "https".to_string(),
            gateway_host: "ipfs.w3s.link".to_string(),
        };
        let published = PublishResult::new("bafyMETA", &style);
        assert_eq!(published.join("/7.json"), "https://bafyMETA.ipfs.w3s.link/7.json");
    }

    #[test]
    fn enumeration_order_is_numeric_aware() {
        let mut ids: Vec<TokenId> = ["10", "b", "2", "a", "1"].into_iter().map(TokenId::new).collect();
        ids.sort_by(TokenId::enumeration_cmp);
        let sorted: Vec<&str> = ids.iter().map(TokenId::as_str).collect();
        assert_eq!(sorted, vec!["1", "2", "10", "a", "b"]);
    }

    #[test]
    fn leading_zero_ids_stay_distinct() {
        let a = TokenId::new("07");
        let b = TokenId::new("7");
        assert_ne!(a.enumeration_cmp(&b), Ordering::Equal);
    }

    #[test]
    fn discipline_parse() {
        assert_eq!(
            "submit-all-then-confirm".parse::<MintDiscipline>().unwrap(),
            MintDiscipline::SubmitAllThenConfirm
        );
        assert!("eventually".parse::<MintDiscipline>().is_err());
        assert_eq!(MintDiscipline::default().to_string(), "confirm-then-continue");
    }

    #[test]
    fn uri_style_from_toml() {
        #[derive(Deserialize)]
        struct Wrapper {
            style: UriStyle,
        }
        let parsed: Wrapper = toml::from_str(
            "style = { kind = \"subdomain\", scheme = \"https\", gateway_host = \"ipfs.w3s.link\" }",
        )
        .unwrap();
        assert_eq!(parsed.style.base_uri("bafy"), "https://bafy.ipfs.w3s.link/");
    }

    #[test]
    fn balance_delta() {
        let before = BalanceSnapshot {
            recipient_tokens: Some(U256::from(4)),
            owner_native: Some(U256::from(1_000)),
        };
        let after = BalanceSnapshot {
            recipient_tokens: Some(U256::from(5)),
            owner_native: Some(U256::from(900)),
        };
        assert_eq!(BalanceSnapshot::token_delta(&before, &after), Some(U256::from(1)));
        assert_eq!(BalanceSnapshot::native_spent(&before, &after), Some(U256::from(100)));
        assert_eq!(
            BalanceSnapshot::token_delta(&BalanceSnapshot::default(), &after),
            None
        );
    }
}
