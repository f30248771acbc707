//! Token set enumeration and asset pairing
//!
//! Token IDs are the base names of the metadata files. Assets are paired to
//! tokens by ID (`<id>.<asset_ext>`), never by listing position.

use crate::error::PipelineError;
use crate::types::TokenId;
use std::collections::HashSet;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};

/// Extension of metadata records
pub const METADATA_EXTENSION: &str = "json";

/// Ordered tokens paired with their asset and metadata files
#[derive(Debug, Clone)]
pub struct TokenSet {
    tokens: Vec<TokenId>,
    asset_dir: PathBuf,
    metadata_dir: PathBuf,
    asset_extension: String,
}

impl TokenSet {
    /// Tokens in enumeration order
    #[inline]
    #[must_use]
    pub fn tokens(&self) -> &[TokenId] {
        &self.tokens
    }

    /// Number of tokens
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    /// Always false for a constructed set
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Asset file name, e.g. `42.gif`
    #[inline]
    #[must_use]
    pub fn asset_name(&self, id: &TokenId) -> String {
        id.file_name(&self.asset_extension)
    }

    /// Metadata file name, e.g. `42.json`
    #[inline]
    #[must_use]
    pub fn metadata_name(&self, id: &TokenId) -> String {
        id.file_name(METADATA_EXTENSION)
    }

    /// Asset file path
    #[must_use]
    pub fn asset_path(&self, id: &TokenId) -> PathBuf {
        self.asset_dir.join(self.asset_name(id))
    }

    /// Metadata file path
    #[must_use]
    pub fn metadata_path(&self, id: &TokenId) -> PathBuf {
        self.metadata_dir.join(self.metadata_name(id))
    }

    /// Asset extension without the dot
    #[inline]
    #[must_use]
    pub fn asset_extension(&self) -> &str {
        &self.asset_extension
    }

    /// `(name, path)` of every asset, in token order
    #[must_use]
    pub fn asset_files(&self) -> Vec<(String, PathBuf)> {
        self.tokens
            .iter()
            .map(|id| (self.asset_name(id), self.asset_path(id)))
            .collect()
    }
}

/// Derives the token set from a metadata directory
#[derive(Debug, Clone, Default)]
pub struct TokenSetEnumerator;

impl TokenSetEnumerator {
    /// Create enumerator
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// List token IDs from metadata file names
    ///
    /// Every non-hidden `.json` entry that resolves to a regular file is a
    /// record; symlinks are followed. The result is sorted with
    /// [`TokenId::enumeration_cmp`] so the order does not depend on the
    /// filesystem's listing order.
    ///
    /// # Errors
    /// - `PipelineError::Enumeration` if the directory cannot be listed
    /// - `PipelineError::MetadataCorrupt` if a record cannot be stat'ed (e.g. a dangling link)
    /// - `PipelineError::InvalidTokenId` if a record name is not UTF-8 or not URI-safe
    /// - `PipelineError::EmptyTokenSet` if no record is found
    pub async fn enumerate(&self, metadata_dir: &Path) -> Result<Vec<TokenId>, PipelineError> {
        let list_err = |source| PipelineError::Enumeration {
            dir: metadata_dir.to_path_buf(),
            source,
        };

        let mut entries = tokio::fs::read_dir(metadata_dir).await.map_err(list_err)?;
        let mut tokens = Vec::new();

        while let Some(entry) = entries.next_entry().await.map_err(list_err)? {
            let path = entry.path();
            let Some(stem) = record_stem(&path) else {
                tracing::debug!(path = %path.display(), "skipping non-metadata entry");
                continue;
            };

            match tokio::fs::metadata(&path).await {
                Ok(meta) if meta.is_file() => {}
                Ok(_) => {
                    tracing::debug!(path = %path.display(), "skipping non-file entry");
                    continue;
                }
                Err(e) => {
                    let token_id = TokenId::new(stem.to_string_lossy());
                    return Err(PipelineError::MetadataCorrupt {
                        token_id,
                        path,
                        reason: format!("unreadable: {e}"),
                    });
                }
            }

            tokens.push(record_token_id(&path, stem)?);
        }

        if tokens.is_empty() {
            return Err(PipelineError::EmptyTokenSet {
                dir: metadata_dir.to_path_buf(),
            });
        }

        tokens.sort_by(TokenId::enumeration_cmp);
        tracing::debug!(count = tokens.len(), dir = %metadata_dir.display(), "enumerated tokens");
        Ok(tokens)
    }

    /// Check every token has an asset and build the paired set
    ///
    /// Asset files that match no token are logged and left out of the set.
    ///
    /// # Errors
    /// - `PipelineError::MissingAsset` for the first token without an asset
    /// - `PipelineError::Enumeration` if the asset directory cannot be listed
    pub async fn pair(
        &self,
        tokens: Vec<TokenId>,
        asset_dir: &Path,
        metadata_dir: &Path,
        asset_extension: &str,
    ) -> Result<TokenSet, PipelineError> {
        let list_err = |source| PipelineError::Enumeration {
            dir: asset_dir.to_path_buf(),
            source,
        };

        let mut present = HashSet::new();
        let mut entries = tokio::fs::read_dir(asset_dir).await.map_err(list_err)?;
        while let Some(entry) = entries.next_entry().await.map_err(list_err)? {
            // Dangling links count as absent
            match tokio::fs::metadata(entry.path()).await {
                Ok(meta) if meta.is_file() => {}
                _ => continue,
            }
            if let Some(name) = entry.file_name().to_str() {
                present.insert(name.to_string());
            }
        }

        let set = TokenSet {
            tokens,
            asset_dir: asset_dir.to_path_buf(),
            metadata_dir: metadata_dir.to_path_buf(),
            asset_extension: asset_extension.to_string(),
        };

        for id in set.tokens() {
            if !present.remove(&set.asset_name(id)) {
                return Err(PipelineError::MissingAsset {
                    token_id: id.clone(),
                    expected: set.asset_path(id),
                });
            }
        }

        if !present.is_empty() {
            let mut unmatched: Vec<_> = present.into_iter().collect();
            unmatched.sort();
            tracing::warn!(
                count = unmatched.len(),
                files = ?unmatched,
                "asset files without metadata will not be published"
            );
        }

        Ok(set)
    }
}

fn record_stem(path: &Path) -> Option<&OsStr> {
    if path.extension()? != METADATA_EXTENSION {
        return None;
    }
    let stem = path.file_stem()?;
    if stem.is_empty() || stem.to_string_lossy().starts_with('.') {
        return None;
    }
    Some(stem)
}

fn record_token_id(path: &Path, stem: &OsStr) -> Result<TokenId, PipelineError> {
    let invalid = |reason: String| PipelineError::InvalidTokenId {
        path: path.to_path_buf(),
        reason,
    };
    let stem = stem
        .to_str()
        .ok_or_else(|| invalid("file name is not valid UTF-8".to_string()))?;
    if let Some(c) = TokenId::first_unsafe_char(stem) {
        return Err(invalid(format!("{c:?} cannot appear unescaped in a URI")));
    }
    Ok(TokenId::new(stem))
}
