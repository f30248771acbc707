//! Content-addressed publishing
//!
//! [`ContentStore`] is the seam to the storage service; [`ContentPublisher`]
//! turns local files into one flat batch and a [`PublishResult`].

use crate::error::{PipelineError, StoreError};
use crate::types::{PublishBatch, PublishResult, UriStyle};
use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;

/// A named blob in a publish batch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamedBlob {
    /// File name, addressable as `<root>/<name>`
    pub name: String,
    /// Contents
    pub bytes: Vec<u8>,
}

impl NamedBlob {
    /// Create blob
    #[inline]
    #[must_use]
    pub fn new(name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            bytes: bytes.into(),
        }
    }
}

/// Content-addressed storage service
///
/// Implementations publish the whole batch or nothing and return the root
/// identifier of the batch.
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Publish a batch of files
    ///
    /// With `wrap_in_directory = false` every file must be reachable as
    /// `<root>/<name>`; with `true` as `<root>/<label>/<name>`.
    async fn put(
        &self,
        label: &str,
        files: Vec<NamedBlob>,
        wrap_in_directory: bool,
    ) -> Result<String, StoreError>;
}

/// Publishes local batches through a [`ContentStore`]
#[derive(Clone)]
pub struct ContentPublisher {
    store: Arc<dyn ContentStore>,
    uri_style: UriStyle,
}

impl std::fmt::Debug for ContentPublisher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContentPublisher")
            .field("uri_style", &self.uri_style)
            .finish_non_exhaustive()
    }
}

impl ContentPublisher {
    /// Create publisher
    #[inline]
    #[must_use]
    pub fn new(store: Arc<dyn ContentStore>, uri_style: UriStyle) -> Self {
        Self { store, uri_style }
    }

    /// Publish in-memory blobs as one flat batch
    ///
    /// # Errors
    /// Returns `PipelineError::PublishFailure` if the service fails or returns an empty root
    #[tracing::instrument(skip(self, files), fields(batch = %batch, files = files.len()))]
    pub async fn publish(
        &self,
        batch: PublishBatch,
        files: Vec<NamedBlob>,
    ) -> Result<PublishResult, PipelineError> {
        let bytes: usize = files.iter().map(|f| f.bytes.len()).sum();
        tracing::debug!(bytes, "uploading batch");

        let root = self
            .store
            .put(batch.label(), files, false)
            .await
            .map_err(|source| PipelineError::PublishFailure { batch, source })?;

        let root = root.trim();
        if root.is_empty() {
            return Err(PipelineError::PublishFailure {
                batch,
                source: StoreError::InvalidResponse("empty root identifier".to_string()),
            });
        }

        let result = PublishResult::new(root, &self.uri_style);
        tracing::info!(root = %result.root, base_uri = %result.base_uri, "published {batch}");
        Ok(result)
    }

    /// Read files from disk, then publish them as one flat batch
    ///
    /// All files are read before the upload starts.
    ///
    /// # Errors
    /// - `PipelineError::BatchRead` if any file cannot be read
    /// - `PipelineError::PublishFailure` from [`Self::publish`]
    pub async fn publish_files(
        &self,
        batch: PublishBatch,
        files: &[(String, PathBuf)],
    ) -> Result<PublishResult, PipelineError> {
        let mut blobs = Vec::with_capacity(files.len());
        for (name, path) in files {
            let bytes = tokio::fs::read(path)
                .await
                .map_err(|source| PipelineError::BatchRead {
                    batch,
                    path: path.clone(),
                    source,
                })?;
            blobs.push(NamedBlob::new(name.clone(), bytes));
        }
        self.publish(batch, blobs).await
    }
}
