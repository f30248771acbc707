//! EVM token contract adapter for the lootbox pipeline
//!
//! Implements [`MintContract`](lootbox_core::MintContract) with alloy over
//! HTTP JSON-RPC, signing as the contract owner.

#![warn(unreachable_pub)]

pub mod contract;
pub mod error;

pub use contract::{ConfirmPolicy, EvmMintContract};
pub use error::ChainAdapterError;

use lootbox_core::{PipelineConfig, Secrets};
use std::time::Duration;

/// Connect using the chain section of the configuration and the owner key
///
/// # Errors
/// - `ChainAdapterError::Config` if endpoint, contract, or key is missing
/// - see [`EvmMintContract::connect`]
pub fn connect(config: &PipelineConfig, secrets: &Secrets) -> Result<EvmMintContract, ChainAdapterError> {
    let (endpoint, contract) = config.chain_target()?;
    let key = secrets.require_signing_key()?;
    let policy = ConfirmPolicy {
        confirmations: config.chain.confirmations.max(1),
        timeout: Duration::from_secs(config.chain.confirm_timeout_secs),
    };
    EvmMintContract::connect(endpoint, contract, key, policy)
}
