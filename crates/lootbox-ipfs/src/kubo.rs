//! Kubo (go-ipfs) HTTP RPC store
//!
//! Uploads a batch with one `/api/v0/add` call using
//! `wrap-with-directory=true`, so every file lands under a single directory
//! node. The response is newline-delimited JSON with one entry per file and
//! directory; the entry with an empty `Name` is the batch root.

use crate::error::{IpfsError, Result};
use crate::{check_status, file_part, part_name};
use async_trait::async_trait;
use lootbox_core::{ContentStore, NamedBlob, Secret, StoreError};
use serde::Deserialize;

/// Default Kubo RPC endpoint
pub const DEFAULT_API_URL: &str = "http://127.0.0.1:5001";

const ADD_PATH: &str = "/api/v0/add";

/// One line of an `/api/v0/add` response
#[derive(Debug, Deserialize)]
struct AddEntry {
    #[serde(rename = "Name")]
    name: String,
    #[serde(rename = "Hash")]
    hash: String,
}

/// Content store backed by a Kubo node
#[derive(Clone)]
pub struct KuboStore {
    client: reqwest::Client,
    api_url: String,
    token: Option<Secret>,
}

impl std::fmt::Debug for KuboStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KuboStore")
            .field("api_url", &self.api_url)
            .field("token", &self.token)
            .finish_non_exhaustive()
    }
}

impl KuboStore {
    /// Create store; `token` is sent as a bearer token when the node sits behind a proxy
    #[must_use]
    pub fn new(client: reqwest::Client, api_url: impl Into<String>, token: Option<Secret>) -> Self {
        Self {
            client,
            api_url: api_url.into().trim_end_matches('/').to_string(),
            token,
        }
    }

    async fn add(&self, label: &str, files: Vec<NamedBlob>, wrap_in_directory: bool) -> Result<String> {
        let mut form = reqwest::multipart::Form::new();
        for file in files {
            let name = part_name(label, &file.name, wrap_in_directory);
            form = form.part("file", file_part(name, file.bytes));
        }

        let url = format!("{}{ADD_PATH}", self.api_url);
        let mut request = self
            .client
            .post(&url)
            .query(&[
                ("wrap-with-directory", "true"),
                ("cid-version", "1"),
                ("pin", "true"),
                ("quieter", "false"),
            ])
            .multipart(form);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token.expose());
        }

        let response = check_status(ADD_PATH, request.send().await?).await?;
        let body = response.text().await?;
        parse_add_response(&body)
    }
}

/// Extract the batch root from an `/api/v0/add` response
pub fn parse_add_response(body: &str) -> Result<String> {
    let mut root = None;
    for line in body.lines().map(str::trim).filter(|l| !l.is_empty()) {
        let entry: AddEntry = serde_json::from_str(line)
            .map_err(|e| IpfsError::Response(format!("bad add entry '{line}': {e}")))?;
        tracing::trace!(name = %entry.name, hash = %entry.hash, "added");
        if entry.name.is_empty() {
            root = Some(entry.hash);
        }
    }
    root.ok_or_else(|| IpfsError::Response("add response has no root directory entry".to_string()))
}

#[async_trait]
impl ContentStore for KuboStore {
    async fn put(
        &self,
        label: &str,
        files: Vec<NamedBlob>,
        wrap_in_directory: bool,
    ) -> std::result::Result<String, StoreError> {
        tracing::debug!(label, files = files.len(), api = %self.api_url, "kubo add");
        Ok(self.add(label, files, wrap_in_directory).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn root_is_unnamed_entry() {
        let body = concat!(
            r#"{"Name":"1.gif","Hash":"bafkA","Size":"12"}"#,
            "\n",
            r#"{"Name":"2.gif","Hash":"bafkB","Size":"12"}"#,
            "\n",
            r#"{"Name":"","Hash":"bafyROOT","Size":"130"}"#,
            "\n",
        );
        assert_eq!(parse_add_response(body).unwrap(), "bafyROOT");
    }

    #[test]
    fn missing_root_is_an_error() {
        let body = r#"{"Name":"1.gif","Hash":"bafkA","Size":"12"}"#;
        assert!(matches!(parse_add_response(body), Err(IpfsError::Response(_))));
    }

    #[test]
    fn garbage_is_an_error() {
        assert!(matches!(parse_add_response("<html>"), Err(IpfsError::Response(_))));
    }

    #[test]
    fn trailing_slash_is_trimmed() {
        let store = KuboStore::new(reqwest::Client::new(), "http://node:5001/", None);
        assert_eq!(store.api_url, "http://node:5001");
    }
}
