//! [`MintContract`] over a JSON-RPC endpoint
//!
//! The contract exposes `mintNFT(address,string)` and ERC-721 `balanceOf`.
//! Transactions are signed locally by the owner key and sent through the
//! provider's wallet filler (nonce, gas, chain id).

use crate::error::ChainAdapterError;
use alloy::network::{EthereumWallet, ReceiptResponse};
use alloy::primitives::{Address, TxHash, U256};
use alloy::providers::{
    DynProvider, PendingTransactionBuilder, PendingTransactionError, Provider, ProviderBuilder,
    WatchTxError,
};
use alloy::signers::local::PrivateKeySigner;
use alloy::transports::http::reqwest::Url;
use async_trait::async_trait;
use lootbox_core::{ChainError, Confirmation, MintContract, Secret};
use std::str::FromStr;
use std::time::Duration;

mod bindings {
    #![allow(missing_docs)]

    alloy::sol! {
        #[sol(rpc)]
        contract LootBox {
            function balanceOf(address owner) external view returns (uint256);
            function mintNFT(address recipient, string memory tokenURI) external returns (uint256);
        }
    }
}

use bindings::LootBox;

/// Finality requirements for submitted mints
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfirmPolicy {
    /// Blocks on top of the inclusion block
    pub confirmations: u64,
    /// Give up after this long
    pub timeout: Duration,
}

impl Default for ConfirmPolicy {
    fn default() -> Self {
        Self {
            confirmations: 1,
            timeout: Duration::from_secs(600),
        }
    }
}

/// Token contract reached over HTTP JSON-RPC, signing as the owner
#[derive(Clone)]
pub struct EvmMintContract {
    provider: DynProvider,
    instance: LootBox::LootBoxInstance<DynProvider>,
    owner: Address,
    policy: ConfirmPolicy,
}

impl std::fmt::Debug for EvmMintContract {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EvmMintContract")
            .field("contract", self.instance.address())
            .field("owner", &self.owner)
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

impl EvmMintContract {
    /// Connect to `contract` at `endpoint` with the owner's signing key
    ///
    /// No request is made until the first call.
    ///
    /// # Errors
    /// - `ChainAdapterError::InvalidKey` if the key is not a hex secp256k1 key
    /// - `ChainAdapterError::InvalidEndpoint` if the URL does not parse
    pub fn connect(
        endpoint: &str,
        contract: Address,
        signing_key: &Secret,
        policy: ConfirmPolicy,
    ) -> Result<Self, ChainAdapterError> {
        let signer = PrivateKeySigner::from_str(signing_key.expose().trim())
            .map_err(|e| ChainAdapterError::InvalidKey(e.to_string()))?;
        let owner = signer.address();

        let url = Url::parse(endpoint).map_err(|e| ChainAdapterError::InvalidEndpoint {
            url: endpoint.to_string(),
            reason: e.to_string(),
        })?;

        let provider = ProviderBuilder::new()
            .wallet(EthereumWallet::from(signer))
            .connect_http(url)
            .erased();
        let instance = LootBox::new(contract, provider.clone());

        tracing::info!(%contract, %owner, endpoint, "connected token contract");
        Ok(Self {
            provider,
            instance,
            owner,
            policy,
        })
    }

    /// Contract address
    #[must_use]
    pub fn address(&self) -> Address {
        *self.instance.address()
    }

    async fn wait(&self, tx: TxHash) -> Result<Confirmation, ChainError> {
        let receipt = PendingTransactionBuilder::new(self.provider.root().clone(), tx)
            .with_required_confirmations(self.policy.confirmations)
            .with_timeout(Some(self.policy.timeout))
            .get_receipt()
            .await;

        let receipt = match receipt {
            Ok(r) => r,
            Err(PendingTransactionError::TxWatcher(WatchTxError::Timeout)) => {
                return Err(ChainError::Timeout {
                    tx,
                    after_secs: self.policy.timeout.as_secs(),
                });
            }
            Err(e) => return Err(ChainAdapterError::from(e).into()),
        };

        if !receipt.status() {
            return Err(ChainAdapterError::Reverted { tx }.into());
        }
        Ok(Confirmation {
            block_number: receipt.block_number,
            gas_used: receipt.gas_used,
        })
    }
}

#[async_trait]
impl MintContract for EvmMintContract {
    fn owner(&self) -> Address {
        self.owner
    }

    async fn token_balance(&self, holder: Address) -> Result<U256, ChainError> {
        let balance = self
            .instance
            .balanceOf(holder)
            .call()
            .await
            .map_err(ChainAdapterError::from)?;
        Ok(balance)
    }

    async fn native_balance(&self, holder: Address) -> Result<U256, ChainError> {
        let balance = self
            .provider
            .get_balance(holder)
            .await
            .map_err(ChainAdapterError::from)?;
        Ok(balance)
    }

    async fn submit_mint(&self, recipient: Address, token_uri: &str) -> Result<TxHash, ChainError> {
        let pending = self
            .instance
            .mintNFT(recipient, token_uri.to_string())
            .send()
            .await
            .map_err(ChainAdapterError::from)?;
        Ok(*pending.tx_hash())
    }

    async fn confirm(&self, tx: TxHash) -> Result<Confirmation, ChainError> {
        self.wait(tx).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Well-known development key (first anvil/hardhat account)
    const DEV_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

    #[test]
    fn rejects_malformed_key() {
        let err = EvmMintContract::connect(
            "http://127.0.0.1:8545",
            Address::ZERO,
            &Secret::new("not-a-key"),
            ConfirmPolicy::default(),
        )
        .unwrap_err();
        assert!(matches!(err, ChainAdapterError::InvalidKey(_)));
    }

    #[test]
    fn rejects_malformed_endpoint() {
        let err = EvmMintContract::connect(
            "localhost 8545",
            Address::ZERO,
            &Secret::new(DEV_KEY),
            ConfirmPolicy::default(),
        )
        .unwrap_err();
        assert!(matches!(err, ChainAdapterError::InvalidEndpoint { .. }));
    }

    #[tokio::test]
    async fn owner_is_derived_from_key() {
        let contract = Address::repeat_byte(0x42);
        let client = EvmMintContract::connect(
            "http://127.0.0.1:8545",
            contract,
            &Secret::new(DEV_KEY),
            ConfirmPolicy::default(),
        )
        .unwrap();
        assert_eq!(
            client.owner(),
            Address::from_str("0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266").unwrap()
        );
        assert_eq!(client.address(), contract);
        assert!(!format!("{client:?}").contains("ac0974"));
    }
}
