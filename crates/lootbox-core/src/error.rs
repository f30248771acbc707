//! Error types for the publish-and-mint pipeline
//!
//! Provides error handling for:
//! - Pre-flight checks (recipient, token set, asset pairing)
//! - Content publishing (storage service failures)
//! - Metadata binding (corrupt records, failed writes)
//! - Minting (submission and confirmation, always per token)
//! - Balance queries (observational, never fatal)

use crate::types::{PublishBatch, TokenId};
use alloy_primitives::{Address, TxHash};
use std::path::PathBuf;

/// Main pipeline error type
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// Recipient handle has no configured address
    #[error("unknown recipient handle '{handle}'")]
    UnknownRecipient {
        /// Handle as given on the command line
        handle: String,
    },

    /// Metadata directory yielded no token records
    #[error("no metadata records found in {}", dir.display())]
    EmptyTokenSet {
        /// Metadata directory
        dir: PathBuf,
    },

    /// Directory could not be listed
    #[error("failed to list {}: {source}", dir.display())]
    Enumeration {
        /// Directory being listed
        dir: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Token has no asset file with the configured extension
    #[error("token {token_id} has no asset file at {}", expected.display())]
    MissingAsset {
        /// Token without an asset
        token_id: TokenId,
        /// Path the asset was expected at
        expected: PathBuf,
    },

    /// A metadata file name cannot serve as a token ID
    #[error("metadata file {} has an unusable token ID: {reason}", path.display())]
    InvalidTokenId {
        /// Offending metadata file
        path: PathBuf,
        /// What is wrong with the name
        reason: String,
    },

    /// A file destined for a publish batch could not be read
    #[error("failed to read {} for the {batch} batch: {source}", path.display())]
    BatchRead {
        /// Batch being assembled
        batch: PublishBatch,
        /// Unreadable file
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Storage service rejected or failed the batch
    #[error("{batch} publish failed: {source}")]
    PublishFailure {
        /// Batch that failed
        batch: PublishBatch,
        /// Storage error
        #[source]
        source: StoreError,
    },

    /// Metadata record unreadable, not JSON, or not a JSON object
    #[error("metadata for token {token_id} at {} is corrupt: {reason}", path.display())]
    MetadataCorrupt {
        /// Token owning the record
        token_id: TokenId,
        /// Record location
        path: PathBuf,
        /// Parse or read failure
        reason: String,
    },

    /// Bound metadata record could not be persisted
    #[error("failed to write metadata for token {token_id} to {}: {source}", path.display())]
    MetadataWriteFailure {
        /// Token owning the record
        token_id: TokenId,
        /// Record location
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Mint call was not accepted by the network or contract
    #[error("mint submission for token {token_id} failed ({confirmed} mints already confirmed): {source}")]
    MintSubmitFailure {
        /// Token being minted
        token_id: TokenId,
        /// Mints confirmed before this failure
        confirmed: usize,
        /// Chain error
        #[source]
        source: ChainError,
    },

    /// Mint transaction reverted or never reached finality
    #[error("mint {tx} for token {token_id} did not confirm ({confirmed} mints already confirmed): {source}")]
    MintConfirmFailure {
        /// Token being minted
        token_id: TokenId,
        /// Submitted transaction
        tx: TxHash,
        /// Mints confirmed before this failure
        confirmed: usize,
        /// Chain error
        #[source]
        source: ChainError,
    },

    /// Balance lookup failed
    #[error("balance query for {address} failed: {source}")]
    BalanceQueryFailure {
        /// Queried account
        address: Address,
        /// Chain error
        #[source]
        source: ChainError,
    },

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl PipelineError {
    /// Check if the error was raised before any storage or chain call
    #[inline]
    #[must_use]
    pub fn is_preflight(&self) -> bool {
        matches!(
            self,
            Self::UnknownRecipient { .. }
                | Self::EmptyTokenSet { .. }
                | Self::Enumeration { .. }
                | Self::MissingAsset { .. }
                | Self::MetadataCorrupt { .. }
                | Self::InvalidTokenId { .. }
                | Self::Config(_)
        )
    }

    /// Number of mints that were confirmed on-chain before this error
    ///
    /// Non-zero means the run left permanent on-chain state behind.
    #[inline]
    #[must_use]
    pub fn confirmed_mints(&self) -> usize {
        match self {
            Self::MintSubmitFailure { confirmed, .. } | Self::MintConfirmFailure { confirmed, .. } => {
                *confirmed
            }
            _ => 0,
        }
    }

    /// Check if mints may have landed on-chain before the run failed
    ///
    /// A confirm failure counts: the transaction was broadcast and may still
    /// be mined after the timeout.
    #[must_use]
    pub fn is_irreversible(&self) -> bool {
        self.confirmed_mints() > 0 || matches!(self, Self::MintConfirmFailure { .. })
    }

    /// Token the error is attributed to, if any
    #[must_use]
    pub fn token_id(&self) -> Option<&TokenId> {
        match self {
            Self::MissingAsset { token_id, .. }
            | Self::MetadataCorrupt { token_id, .. }
            | Self::MetadataWriteFailure { token_id, .. }
            | Self::MintSubmitFailure { token_id, .. }
            | Self::MintConfirmFailure { token_id, .. } => Some(token_id),
            _ => None,
        }
    }
}

/// Errors reported by a [`ContentStore`](crate::store::ContentStore) implementation
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Request never produced a response (connect, TLS, timeout)
    #[error("storage request failed: {0}")]
    Request(String),

    /// Service answered with a non-success status
    #[error("storage service returned {status}: {body}")]
    Rejected {
        /// HTTP status
        status: u16,
        /// Response body, possibly truncated
        body: String,
    },

    /// Response could not be interpreted
    #[error("invalid storage response: {0}")]
    InvalidResponse(String),
}

/// Errors reported by a [`MintContract`](crate::contract::MintContract) implementation
#[derive(Debug, thiserror::Error)]
pub enum ChainError {
    /// Transport or JSON-RPC failure
    #[error("rpc error: {0}")]
    Rpc(String),

    /// Call rejected before inclusion (estimation, nonce, funds)
    #[error("call rejected: {0}")]
    Rejected(String),

    /// Transaction was mined but reverted
    #[error("transaction {tx} reverted")]
    Reverted {
        /// Reverted transaction
        tx: TxHash,
    },

    /// Transaction did not reach the required confirmations in time
    #[error("transaction {tx} not confirmed after {after_secs}s")]
    Timeout {
        /// Pending transaction
        tx: TxHash,
        /// Seconds waited
        after_secs: u64,
    },
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Config file could not be read
    #[error("failed to read {}: {source}", path.display())]
    Read {
        /// Config file
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Config file is not valid TOML for the expected schema
    #[error("failed to parse {}: {source}", path.display())]
    Parse {
        /// Config file
        path: PathBuf,
        /// TOML error
        #[source]
        source: toml::de::Error,
    },

    /// Required value absent from both file and environment
    #[error("missing required setting {0}")]
    Missing(&'static str),

    /// Value present but malformed
    #[error("invalid value for {key}: {message}")]
    Invalid {
        /// Setting name
        key: String,
        /// What is wrong with it
        message: String,
    },

    /// Two recipient handles collide after normalization
    #[error("recipient handle '{0}' is configured more than once")]
    DuplicateRecipient(String),
}

impl ConfigError {
    /// Create invalid-value error
    pub fn invalid(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Invalid {
            key: key.into(),
            message: message.into(),
        }
    }
}
