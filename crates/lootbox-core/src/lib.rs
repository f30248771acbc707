//! Loot Box Core - publish-and-mint pipeline
//!
//! Turns a directory of image assets and a directory of JSON metadata
//! records into minted tokens owned by a recipient:
//! - Resolves the recipient handle to an on-chain address
//! - Enumerates and pairs token records with their assets
//! - Publishes assets, binds each record's `image` field, publishes metadata
//! - Mints one token per record and reports balances around the mint stage
//!
//! Storage and chain access sit behind the [`ContentStore`] and
//! [`MintContract`] traits; concrete backends live in sibling crates.
//!
//! # Example
//!
//! ```rust,ignore
//! use lootbox_core::{MintPipeline, PipelineConfig, PipelineDeps, RunRequest};
//!
//! # async fn example(deps: PipelineDeps) -> Result<(), Box<dyn std::error::Error>> {
//! let config = PipelineConfig::load("lootbox.toml".as_ref())?;
//! let pipeline = MintPipeline::new(&config, deps)?;
//!
//! let report = pipeline.run(RunRequest::new("aoth", "assets", "metadata")).await?;
//! println!("Minted {} tokens", report.confirmed());
//! # Ok(())
//! # }
//! ```

#![warn(unreachable_pub)]

pub mod balance;
pub mod binder;
pub mod config;
pub mod contract;
pub mod enumerate;
pub mod error;
pub mod identity;
pub mod mint;
pub mod pipeline;
pub mod store;
pub mod types;

// Re-exports for convenience
pub use balance::BalanceReporter;
pub use binder::{MetadataBinder, TokenRecord, IMAGE_FIELD};
pub use config::{
    ChainConfig, MintConfig, PipelineConfig, Secret, Secrets, StorageBackend, StorageConfig,
};
pub use contract::{Confirmation, MintContract};
pub use enumerate::{TokenSet, TokenSetEnumerator, METADATA_EXTENSION};
pub use error::{ChainError, ConfigError, PipelineError, StoreError};
pub use identity::RecipientDirectory;
pub use mint::{token_uri, MintOrchestrator};
pub use pipeline::{MintPipeline, PipelineDeps, Preflight, RunPlan, RunRequest};
pub use store::{ContentPublisher, ContentStore, NamedBlob};
pub use types::{
    BalanceSnapshot, MintDiscipline, MintReceipt, MintStatus, PublishBatch, PublishResult,
    RecipientIdentity, RunId, RunReport, TokenId, UriStyle,
};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for working with the pipeline
    pub use crate::{
        ContentStore, MintContract, MintDiscipline, MintPipeline, PipelineConfig, PipelineDeps,
        PipelineError, RunReport, RunRequest, TokenId,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
