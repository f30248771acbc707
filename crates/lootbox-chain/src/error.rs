//! Error types for the EVM adapter

use alloy::primitives::TxHash;
use alloy::transports::{RpcError, TransportErrorKind};
use lootbox_core::ChainError;

/// Errors from connecting to and calling the token contract
#[derive(Debug, thiserror::Error)]
pub enum ChainAdapterError {
    /// Chain settings missing or malformed
    #[error(transparent)]
    Config(#[from] lootbox_core::ConfigError),

    /// Owner key could not be parsed
    #[error("invalid signing key: {0}")]
    InvalidKey(String),

    /// RPC endpoint is not a valid URL
    #[error("invalid RPC endpoint '{url}': {reason}")]
    InvalidEndpoint {
        /// Endpoint as configured
        url: String,
        /// Parse failure
        reason: String,
    },

    /// Contract call or send failed
    #[error("contract call failed: {0}")]
    Contract(#[from] alloy::contract::Error),

    /// Provider request failed
    #[error("provider error: {0}")]
    Provider(#[from] RpcError<TransportErrorKind>),

    /// Waiting on a pending transaction failed
    #[error("pending transaction error: {0}")]
    Pending(#[from] alloy::providers::PendingTransactionError),

    /// Receipt reports a failed status
    #[error("transaction {tx} reverted")]
    Reverted {
        /// Reverted transaction
        tx: TxHash,
    },
}

impl From<ChainAdapterError> for ChainError {
    fn from(err: ChainAdapterError) -> Self {
        match err {
            ChainAdapterError::Reverted { tx } => ChainError::Reverted { tx },
            // Node answered with a JSON-RPC error: estimation, nonce, funds
            ChainAdapterError::Contract(alloy::contract::Error::TransportError(rpc))
                if rpc.is_error_resp() =>
            {
                ChainError::Rejected(rpc.to_string())
            }
            ChainAdapterError::Provider(rpc) if rpc.is_error_resp() => {
                ChainError::Rejected(rpc.to_string())
            }
            other => ChainError::Rpc(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn revert_keeps_tx() {
        let tx = TxHash::repeat_byte(7);
        let err: ChainError = ChainAdapterError::Reverted { tx }.into();
        assert!(matches!(err, ChainError::Reverted { tx: t } if t == tx));
    }

    #[test]
    fn key_errors_are_rpc_kind() {
        let err: ChainError = ChainAdapterError::InvalidKey("odd length".to_string()).into();
        assert!(matches!(err, ChainError::Rpc(msg) if msg.contains("odd length")));
    }
}
