//! Mint orchestration
//!
//! Issues one mint per token, in enumeration order, under one of two
//! confirmation disciplines:
//! - [`MintDiscipline::ConfirmThenContinue`]: each mint is final before the
//!   next is submitted, so a failure at token k leaves k+1..n unsubmitted.
//! - [`MintDiscipline::SubmitAllThenConfirm`]: all mints are submitted first.
//!   A submit failure stops further submissions; everything already submitted
//!   is still confirmed and logged before the run fails.
//!
//! Mints are never submitted concurrently (one sender, ordered nonces).

use crate::contract::MintContract;
use crate::enumerate::METADATA_EXTENSION;
use crate::error::PipelineError;
use crate::types::{MintDiscipline, MintReceipt, MintStatus, PublishResult, TokenId};
use alloy_primitives::{Address, TxHash};
use std::sync::Arc;

/// Drives mint submission and confirmation
#[derive(Clone)]
pub struct MintOrchestrator {
    contract: Arc<dyn MintContract>,
    discipline: MintDiscipline,
}

impl std::fmt::Debug for MintOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MintOrchestrator")
            .field("discipline", &self.discipline)
            .finish_non_exhaustive()
    }
}

/// Token URI for a token under the metadata root
#[must_use]
pub fn token_uri(metadata: &PublishResult, id: &TokenId) -> String {
    metadata.join(&id.file_name(METADATA_EXTENSION))
}

impl MintOrchestrator {
    /// Create orchestrator
    #[inline]
    #[must_use]
    pub fn new(contract: Arc<dyn MintContract>, discipline: MintDiscipline) -> Self {
        Self {
            contract,
            discipline,
        }
    }

    /// Discipline in use
    #[inline]
    #[must_use]
    pub fn discipline(&self) -> MintDiscipline {
        self.discipline
    }

    /// Mint every token to `recipient`
    ///
    /// # Returns
    /// One confirmed receipt per token, in token order
    ///
    /// # Errors
    /// - `PipelineError::MintSubmitFailure` if a mint is not accepted
    /// - `PipelineError::MintConfirmFailure` if a mint reverts or times out
    #[tracing::instrument(skip(self, tokens, metadata), fields(discipline = %self.discipline, tokens = tokens.len()))]
    pub async fn mint_all(
        &self,
        recipient: Address,
        tokens: &[TokenId],
        metadata: &PublishResult,
    ) -> Result<Vec<MintReceipt>, PipelineError> {
        match self.discipline {
            MintDiscipline::ConfirmThenContinue => {
                self.confirm_then_continue(recipient, tokens, metadata).await
            }
            MintDiscipline::SubmitAllThenConfirm => {
                self.submit_all_then_confirm(recipient, tokens, metadata).await
            }
        }
    }

    async fn confirm_then_continue(
        &self,
        recipient: Address,
        tokens: &[TokenId],
        metadata: &PublishResult,
    ) -> Result<Vec<MintReceipt>, PipelineError> {
        let mut receipts = Vec::with_capacity(tokens.len());
        for id in tokens {
            let pending = self.submit(recipient, id, metadata, receipts.len()).await?;
            let confirmed = self.confirm(pending, receipts.len()).await?;
            receipts.push(confirmed);
        }
        Ok(receipts)
    }

    async fn submit_all_then_confirm(
        &self,
        recipient: Address,
        tokens: &[TokenId],
        metadata: &PublishResult,
    ) -> Result<Vec<MintReceipt>, PipelineError> {
        let mut pending = Vec::with_capacity(tokens.len());
        let mut submit_error = None;
        for id in tokens {
            match self.submit(recipient, id, metadata, 0).await {
                Ok(receipt) => pending.push(receipt),
                Err(e) => {
                    submit_error = Some(e);
                    break;
                }
            }
        }

        let mut receipts = Vec::with_capacity(pending.len());
        let mut confirm_error = None;
        for receipt in pending {
            match self.confirm(receipt, receipts.len()).await {
                Ok(confirmed) => receipts.push(confirmed),
                Err(e) => {
                    if confirm_error.is_none() {
                        confirm_error = Some(e);
                    }
                }
            }
        }

        let confirmed = receipts.len();
        if let Some(mut e) = confirm_error {
            set_confirmed(&mut e, confirmed);
            return Err(e);
        }
        if let Some(mut e) = submit_error {
            set_confirmed(&mut e, confirmed);
            return Err(e);
        }
        Ok(receipts)
    }

    async fn submit(
        &self,
        recipient: Address,
        id: &TokenId,
        metadata: &PublishResult,
        confirmed: usize,
    ) -> Result<MintReceipt, PipelineError> {
        let uri = token_uri(metadata, id);
        let tx = self
            .contract
            .submit_mint(recipient, &uri)
            .await
            .map_err(|source| {
                tracing::error!(token_id = %id, error = %source, "mint submission failed");
                PipelineError::MintSubmitFailure {
                    token_id: id.clone(),
                    confirmed,
                    source,
                }
            })?;

        tracing::info!(token_id = %id, %tx, token_uri = %uri, "submitted mint");
        Ok(MintReceipt {
            token_id: id.clone(),
            token_uri: uri,
            tx,
            status: MintStatus::Pending,
        })
    }

    async fn confirm(
        &self,
        mut receipt: MintReceipt,
        confirmed: usize,
    ) -> Result<MintReceipt, PipelineError> {
        let tx: TxHash = receipt.tx;
        match self.contract.confirm(tx).await {
            Ok(c) => {
                receipt.status = MintStatus::Confirmed {
                    block_number: c.block_number,
                    gas_used: c.gas_used,
                };
                tracing::info!(token_id = %receipt.token_id, %tx, block = ?c.block_number, "mint confirmed");
                Ok(receipt)
            }
            Err(source) => {
                tracing::error!(token_id = %receipt.token_id, %tx, error = %source, "mint not confirmed");
                Err(PipelineError::MintConfirmFailure {
                    token_id: receipt.token_id,
                    tx,
                    confirmed,
                    source,
                })
            }
        }
    }
}

fn set_confirmed(err: &mut PipelineError, count: usize) {
    if let PipelineError::MintSubmitFailure { confirmed, .. }
    | PipelineError::MintConfirmFailure { confirmed, .. } = err
    {
        *confirmed = count;
    }
}
