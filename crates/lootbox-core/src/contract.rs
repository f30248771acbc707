//! Seam to the token contract and the signing wallet

use crate::error::ChainError;
use alloy_primitives::{Address, TxHash, U256};
use async_trait::async_trait;

/// Finality information for a confirmed transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Confirmation {
    /// Block the transaction was included in
    pub block_number: Option<u64>,
    /// Gas consumed
    pub gas_used: u64,
}

/// Mintable token contract, connected to the owner's wallet
///
/// Calls are issued from a single sender, so implementations may assume
/// they are never invoked concurrently.
#[async_trait]
pub trait MintContract: Send + Sync {
    /// Address transactions are signed with
    fn owner(&self) -> Address;

    /// Token count held by `holder`
    async fn token_balance(&self, holder: Address) -> Result<U256, ChainError>;

    /// Native-currency balance of `holder`
    async fn native_balance(&self, holder: Address) -> Result<U256, ChainError>;

    /// Submit a mint of one token to `recipient`; returns once the node accepts it
    async fn submit_mint(&self, recipient: Address, token_uri: &str) -> Result<TxHash, ChainError>;

    /// Wait for a submitted transaction to become final
    ///
    /// A reverted transaction is `ChainError::Reverted`.
    async fn confirm(&self, tx: TxHash) -> Result<Confirmation, ChainError>;
}
