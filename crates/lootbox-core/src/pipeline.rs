//! Publish-and-mint pipeline
//!
//! The central orchestrator that:
//! - Runs pre-flight checks (recipient, token set, asset pairing, record parsing)
//! - Publishes assets, binds metadata, publishes metadata
//! - Mints one token per record
//! - Brackets the mint stage with balance snapshots
//!
//! # Workflow
//! 1. [`Preflight::plan`] with no network access
//! 2. Balance snapshot (before)
//! 3. Asset publish
//! 4. Metadata bind (all records written and awaited)
//! 5. Metadata publish
//! 6. Mint orchestration
//! 7. Balance snapshot (after) and audit

use crate::balance::BalanceReporter;
use crate::binder::{MetadataBinder, TokenRecord};
use crate::config::PipelineConfig;
use crate::contract::MintContract;
use crate::enumerate::{TokenSet, TokenSetEnumerator};
use crate::error::PipelineError;
use crate::identity::RecipientDirectory;
use crate::mint::MintOrchestrator;
use crate::store::{ContentPublisher, ContentStore};
use crate::types::{PublishBatch, RecipientIdentity, RunId, RunReport};
use chrono::Utc;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::Instrument;

/// Inputs of one run
#[derive(Debug, Clone)]
pub struct RunRequest {
    /// Recipient handle
    pub handle: String,
    /// Directory of image assets
    pub asset_dir: PathBuf,
    /// Directory of metadata records
    pub metadata_dir: PathBuf,
}

impl RunRequest {
    /// Create request
    #[must_use]
    pub fn new(
        handle: impl Into<String>,
        asset_dir: impl Into<PathBuf>,
        metadata_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            handle: handle.into(),
            asset_dir: asset_dir.into(),
            metadata_dir: metadata_dir.into(),
        }
    }
}

/// Everything known after pre-flight, before any network call
#[derive(Debug, Clone)]
pub struct RunPlan {
    /// Resolved recipient
    pub recipient: RecipientIdentity,
    /// Paired token set
    pub tokens: TokenSet,
    /// Parsed records, in token order
    pub records: Vec<TokenRecord>,
}

/// Pre-flight checks; touches only the local filesystem (read-only)
#[derive(Debug, Clone)]
pub struct Preflight {
    recipients: RecipientDirectory,
    asset_extension: String,
    enumerator: TokenSetEnumerator,
    binder: MetadataBinder,
}

impl Preflight {
    /// Build from configuration
    ///
    /// # Errors
    /// Returns `PipelineError::Config` if the configuration is invalid
    pub fn from_config(config: &PipelineConfig) -> Result<Self, PipelineError> {
        config.validate()?;
        Ok(Self {
            recipients: RecipientDirectory::from_entries(config.recipients.iter().map(|(h, a)| (h, *a)))?,
            asset_extension: config.mint.asset_extension.clone(),
            enumerator: TokenSetEnumerator::new(),
            binder: MetadataBinder::new(),
        })
    }

    /// Resolve, enumerate, pair, and parse
    ///
    /// The recipient is resolved first so an unknown handle fails before any
    /// directory is read.
    ///
    /// # Errors
    /// - `PipelineError::UnknownRecipient`
    /// - `PipelineError::EmptyTokenSet` / `PipelineError::Enumeration`
    /// - `PipelineError::MissingAsset`
    /// - `PipelineError::MetadataCorrupt`
    #[tracing::instrument(skip(self), fields(handle = %request.handle))]
    pub async fn plan(&self, request: &RunRequest) -> Result<RunPlan, PipelineError> {
        let recipient = self.recipients.resolve(&request.handle)?;
        tracing::info!(handle = %recipient.handle, address = %recipient.address, "resolved recipient");

        let ids = self.enumerator.enumerate(&request.metadata_dir).await?;
        let tokens = self
            .enumerator
            .pair(ids, &request.asset_dir, &request.metadata_dir, &self.asset_extension)
            .await?;
        let records = self.binder.load(&tokens).await?;

        tracing::info!(tokens = tokens.len(), "pre-flight checks passed");
        Ok(RunPlan {
            recipient,
            tokens,
            records,
        })
    }
}

/// External services a run depends on
#[derive(Clone)]
pub struct PipelineDeps {
    /// Content-addressed storage
    pub store: Arc<dyn ContentStore>,
    /// Token contract connected to the owner wallet
    pub contract: Arc<dyn MintContract>,
}

/// The full publish-and-mint pipeline
#[derive(Debug, Clone)]
pub struct MintPipeline {
    preflight: Preflight,
    publisher: ContentPublisher,
    binder: MetadataBinder,
    orchestrator: MintOrchestrator,
    reporter: BalanceReporter,
}

impl MintPipeline {
    /// Wire the pipeline from configuration and dependencies
    ///
    /// # Errors
    /// Returns `PipelineError::Config` if the configuration is invalid
    pub fn new(config: &PipelineConfig, deps: PipelineDeps) -> Result<Self, PipelineError> {
        Ok(Self {
            preflight: Preflight::from_config(config)?,
            publisher: ContentPublisher::new(deps.store, config.storage.uri_style.clone()),
            binder: MetadataBinder::new(),
            orchestrator: MintOrchestrator::new(deps.contract.clone(), config.mint.discipline),
            reporter: BalanceReporter::new(deps.contract),
        })
    }

    /// Pre-flight only
    ///
    /// # Errors
    /// See [`Preflight::plan`]
    pub async fn plan(&self, request: &RunRequest) -> Result<RunPlan, PipelineError> {
        self.preflight.plan(request).await
    }

    /// Execute a complete run
    ///
    /// Nothing is rolled back on failure: published batches and confirmed
    /// mints stay valid.
    ///
    /// # Errors
    /// Any fatal [`PipelineError`]; `BalanceQueryFailure` is never returned
    pub async fn run(&self, request: RunRequest) -> Result<RunReport, PipelineError> {
        let run_id = RunId::new();
        let span = tracing::info_span!("run", %run_id, handle = %request.handle);
        self.execute(run_id, request).instrument(span).await
    }

    async fn execute(&self, run_id: RunId, request: RunRequest) -> Result<RunReport, PipelineError> {
        let started_at = Utc::now();
        tracing::info!("starting run");
        let RunPlan {
            recipient,
            tokens,
            mut records,
        } = self.preflight.plan(&request).await?;

        let balance_before = self.reporter.snapshot(recipient.address, "before").await;

        let assets = self
            .publisher
            .publish_files(PublishBatch::Assets, &tokens.asset_files())
            .await?;

        let metadata_batch = self.binder.bind(&tokens, &mut records, &assets).await?;

        let metadata = self
            .publisher
            .publish(PublishBatch::Metadata, metadata_batch)
            .await?;

        tracing::info!(
            address = %recipient.address,
            tokens = tokens.len(),
            discipline = %self.orchestrator.discipline(),
            "minting"
        );
        let receipts = self
            .orchestrator
            .mint_all(recipient.address, tokens.tokens(), &metadata)
            .await?;

        let balance_after = self.reporter.snapshot(recipient.address, "after").await;
        BalanceReporter::audit(&balance_before, &balance_after, receipts.len());

        let report = RunReport {
            run_id,
            recipient,
            tokens: tokens.tokens().to_vec(),
            assets,
            metadata,
            discipline: self.orchestrator.discipline(),
            receipts,
            balance_before,
            balance_after,
            started_at,
            finished_at: Utc::now(),
        };
        tracing::info!(confirmed = report.confirmed(), "run complete");
        Ok(report)
    }
}
