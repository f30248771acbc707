//! Balance reporting around the mint stage
//!
//! Purely observational: every failure is logged and swallowed.

use crate::contract::MintContract;
use crate::error::PipelineError;
use crate::types::BalanceSnapshot;
use alloy_primitives::{Address, U256};
use std::sync::Arc;

/// Captures recipient token and owner native balances
#[derive(Clone)]
pub struct BalanceReporter {
    contract: Arc<dyn MintContract>,
}

impl std::fmt::Debug for BalanceReporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BalanceReporter").finish_non_exhaustive()
    }
}

impl BalanceReporter {
    /// Create reporter
    #[inline]
    #[must_use]
    pub fn new(contract: Arc<dyn MintContract>) -> Self {
        Self { contract }
    }

    /// Token balance of `address`
    ///
    /// # Errors
    /// Returns `PipelineError::BalanceQueryFailure` if the query fails
    pub async fn query_balance(&self, address: Address) -> Result<U256, PipelineError> {
        self.contract
            .token_balance(address)
            .await
            .map_err(|source| PipelineError::BalanceQueryFailure { address, source })
    }

    /// Native balance of `address`
    ///
    /// # Errors
    /// Returns `PipelineError::BalanceQueryFailure` if the query fails
    pub async fn query_native(&self, address: Address) -> Result<U256, PipelineError> {
        self.contract
            .native_balance(address)
            .await
            .map_err(|source| PipelineError::BalanceQueryFailure { address, source })
    }

    /// Snapshot recipient tokens and owner funds; failed queries are left empty
    pub async fn snapshot(&self, recipient: Address, phase: &str) -> BalanceSnapshot {
        let recipient_tokens = swallow(self.query_balance(recipient).await, phase);
        let owner = self.contract.owner();
        let owner_native = swallow(self.query_native(owner).await, phase);

        tracing::info!(
            phase,
            %recipient,
            tokens = ?recipient_tokens,
            %owner,
            native_wei = ?owner_native,
            "balance snapshot"
        );
        BalanceSnapshot {
            recipient_tokens,
            owner_native,
        }
    }

    /// Compare the observed token delta with the number of confirmed mints
    pub fn audit(before: &BalanceSnapshot, after: &BalanceSnapshot, confirmed: usize) {
        match BalanceSnapshot::token_delta(before, after) {
            Some(delta) if delta == U256::from(confirmed) => {
                tracing::info!(%delta, "recipient balance matches confirmed mints");
            }
            Some(delta) => {
                tracing::warn!(%delta, confirmed, "recipient balance delta differs from confirmed mints");
            }
            None => tracing::warn!("recipient balance delta unknown"),
        }
        if let Some(spent) = BalanceSnapshot::native_spent(before, after) {
            tracing::info!(spent_wei = %spent, "owner funds spent on minting");
        }
    }
}

fn swallow(result: Result<U256, PipelineError>, phase: &str) -> Option<U256> {
    match result {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::warn!(phase, error = %e, "balance query failed, continuing");
            None
        }
    }
}
