//! Metadata binding
//!
//! Points every token record's `image` field at the token's published asset
//! and persists the record in place.
//!
//! Binding is two-phase: [`MetadataBinder::load`] parses every record up
//! front, so one corrupt file stops the run before anything is written;
//! [`MetadataBinder::bind`] then rewrites all records and returns exactly the
//! bytes it wrote, which become the metadata publish batch.

use crate::enumerate::TokenSet;
use crate::error::PipelineError;
use crate::store::NamedBlob;
use crate::types::{PublishResult, TokenId};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};

/// Field holding the asset URI
pub const IMAGE_FIELD: &str = "image";

/// One token's metadata record
#[derive(Debug, Clone, PartialEq)]
pub struct TokenRecord {
    token_id: TokenId,
    path: PathBuf,
    fields: Map<String, Value>,
}

impl TokenRecord {
    /// Parse a record from raw file contents
    ///
    /// # Errors
    /// Returns `PipelineError::MetadataCorrupt` if the bytes are not a JSON object
    pub fn parse(token_id: TokenId, path: &Path, bytes: &[u8]) -> Result<Self, PipelineError> {
        let corrupt = |reason: String| PipelineError::MetadataCorrupt {
            token_id: token_id.clone(),
            path: path.to_path_buf(),
            reason,
        };

        match serde_json::from_slice::<Value>(bytes) {
            Ok(Value::Object(fields)) => Ok(Self {
                token_id: token_id.clone(),
                path: path.to_path_buf(),
                fields,
            }),
            Ok(other) => Err(corrupt(format!(
                "expected a JSON object, found {}",
                json_kind(&other)
            ))),
            Err(e) => Err(corrupt(e.to_string())),
        }
    }

    /// Token this record belongs to
    #[inline]
    #[must_use]
    pub fn token_id(&self) -> &TokenId {
        &self.token_id
    }

    /// Location on disk
    #[inline]
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current `image` value, if it is a string
    #[must_use]
    pub fn image(&self) -> Option<&str> {
        self.fields.get(IMAGE_FIELD).and_then(Value::as_str)
    }

    /// All fields, in file order
    #[inline]
    #[must_use]
    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    /// Set `image`, keeping its position if already present
    pub fn set_image(&mut self, uri: impl Into<String>) {
        self.fields
            .insert(IMAGE_FIELD.to_string(), Value::String(uri.into()));
    }

    /// Compact JSON encoding, as written to disk
    #[must_use]
    pub fn to_json_bytes(&self) -> Vec<u8> {
        // A Map<String, Value> always serializes.
        serde_json::to_vec(&self.fields).unwrap_or_default()
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Binds metadata records to published assets
#[derive(Debug, Clone, Default)]
pub struct MetadataBinder;

impl MetadataBinder {
    /// Create binder
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Read and parse every record in the set, in token order
    ///
    /// # Errors
    /// Returns `PipelineError::MetadataCorrupt` for the first unreadable or invalid record
    pub async fn load(&self, set: &TokenSet) -> Result<Vec<TokenRecord>, PipelineError> {
        let mut records = Vec::with_capacity(set.len());
        for id in set.tokens() {
            let path = set.metadata_path(id);
            let bytes = tokio::fs::read(&path)
                .await
                .map_err(|e| PipelineError::MetadataCorrupt {
                    token_id: id.clone(),
                    path: path.clone(),
                    reason: format!("unreadable: {e}"),
                })?;
            records.push(TokenRecord::parse(id.clone(), &path, &bytes)?);
        }
        Ok(records)
    }

    /// Point each record at its asset and persist it
    ///
    /// Every write is awaited; the first failure aborts the stage. Returns the
    /// written files as a publish batch, in token order.
    ///
    /// # Errors
    /// Returns `PipelineError::MetadataWriteFailure` if a record cannot be written
    #[tracing::instrument(skip_all, fields(records = records.len(), asset_root = %assets.root))]
    pub async fn bind(
        &self,
        set: &TokenSet,
        records: &mut [TokenRecord],
        assets: &PublishResult,
    ) -> Result<Vec<NamedBlob>, PipelineError> {
        let mut batch = Vec::with_capacity(records.len());

        for record in records.iter_mut() {
            let uri = assets.join(&set.asset_name(&record.token_id));
            if record.image() == Some(uri.as_str()) {
                tracing::debug!(token_id = %record.token_id, "image already bound");
            }
            record.set_image(uri);

            let bytes = record.to_json_bytes();
            tokio::fs::write(&record.path, &bytes)
                .await
                .map_err(|source| PipelineError::MetadataWriteFailure {
                    token_id: record.token_id.clone(),
                    path: record.path.clone(),
                    source,
                })?;

            tracing::info!(token_id = %record.token_id, image = ?record.image(), "updated metadata");
            batch.push(NamedBlob::new(set.metadata_name(&record.token_id), bytes));
        }

        Ok(batch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::enumerate::TokenSetEnumerator;
    use crate::types::UriStyle;
    use pretty_assertions::assert_eq;
    use std::fs;

    async fn token_set(assets: &Path, metadata: &Path) -> TokenSet {
        let enumerator = TokenSetEnumerator::new();
        let tokens = enumerator.enumerate(metadata).await.unwrap();
        enumerator.pair(tokens, assets, metadata, "gif").await.unwrap()
    }

    fn fixture(records: &[(&str, &str)]) -> (tempfile::TempDir, tempfile::TempDir) {
        let assets = tempfile::tempdir().unwrap();
        let metadata = tempfile::tempdir().unwrap();
        for (id, json) in records {
            fs::write(assets.path().join(format!("{id}.gif")), b"GIF89a").unwrap();
            fs::write(metadata.path().join(format!("{id}.json")), json).unwrap();
        }
        (assets, metadata)
    }

    #[test]
    fn rejects_non_object_records() {
        let err = TokenRecord::parse(TokenId::new("1"), Path::new("1.json"), b"[1,2]").unwrap_err();
        match err {
            PipelineError::MetadataCorrupt { reason, .. } => assert!(reason.contains("an array")),
            other => panic!("expected MetadataCorrupt, got {other:?}"),
        }
    }

    #[test]
    fn set_image_keeps_field_order() {
        let mut record = TokenRecord::parse(
            TokenId::new("1"),
            Path::new("1.json"),
            br#"{"name":"One","image":"old","rarity":"rare"}"#,
        )
        .unwrap();
        record.set_image("ipfs://root/1.gif");
        assert_eq!(
            String::from_utf8(record.to_json_bytes()).unwrap(),
            r#"{"name":"One","image":"ipfs://root/1.gif","rarity":"rare"}"#
        );
    }

    #[tokio::test]
    async fn binds_and_persists_image() {
        let (assets, metadata) = fixture(&[("42", r#"{"name":"Item 42"}"#)]);
        let set = token_set(assets.path(), metadata.path()).await;
        let binder = MetadataBinder::new();
        let published = PublishResult::new("bafyASSET", &UriStyle::default());

        let mut records = binder.load(&set).await.unwrap();
        let batch = binder.bind(&set, &mut records, &published).await.unwrap();

        let on_disk = fs::read_to_string(metadata.path().join("42.json")).unwrap();
        assert_eq!(on_disk, r#"{"name":"Item 42","image":"ipfs://bafyASSET/42.gif"}"#);
        assert_eq!(batch, vec![NamedBlob::new("42.json", on_disk.into_bytes())]);
    }

    #[tokio::test]
    async fn rebinding_is_idempotent() {
        let (assets, metadata) = fixture(&[("7", r#"{"name":"Seven","attributes":[{"trait_type":"hat"}]}"#)]);
        let set = token_set(assets.path(), metadata.path()).await;
        let binder = MetadataBinder::new();
        let published = PublishResult::new("bafyASSET", &UriStyle::default());

        let mut first = binder.load(&set).await.unwrap();
        binder.bind(&set, &mut first, &published).await.unwrap();
        let after_first = fs::read(metadata.path().join("7.json")).unwrap();

        let mut second = binder.load(&set).await.unwrap();
        binder.bind(&set, &mut second, &published).await.unwrap();
        let after_second = fs::read(metadata.path().join("7.json")).unwrap();

        assert_eq!(after_first, after_second);
        assert_eq!(second[0].image(), Some("ipfs://bafyASSET/7.gif"));
    }

    #[tokio::test]
    async fn write_failure_names_the_token() {
        let (assets, metadata) = fixture(&[("1", r#"{"name":"One"}"#), ("2", r#"{"name":"Two"}"#)]);
        let set = token_set(assets.path(), metadata.path()).await;
        let binder = MetadataBinder::new();
        let published = PublishResult::new("bafyASSET", &UriStyle::default());

        let mut records = binder.load(&set).await.unwrap();
        fs::remove_dir_all(metadata.path()).unwrap();

        let err = binder.bind(&set, &mut records, &published).await.unwrap_err();
        match err {
            PipelineError::MetadataWriteFailure { token_id, path, .. } => {
                assert_eq!(token_id.as_str(), "1");
                assert_eq!(path, metadata.path().join("1.json"));
            }
            other => panic!("expected MetadataWriteFailure, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn corrupt_record_fails_load_without_writes() {
        let (assets, metadata) = fixture(&[("1", r#"{"name":"One"}"#), ("2", "{not json")]);
        let set = token_set(assets.path(), metadata.path()).await;

        let err = MetadataBinder::new().load(&set).await.unwrap_err();
        assert!(matches!(
            err,
            PipelineError::MetadataCorrupt { ref token_id, .. } if token_id.as_str() == "2"
        ));
        assert_eq!(
            fs::read_to_string(metadata.path().join("1.json")).unwrap(),
            r#"{"name":"One"}"#
        );
    }
}
