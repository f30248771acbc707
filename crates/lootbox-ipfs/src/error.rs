//! Error types for the IPFS storage backends

use lootbox_core::StoreError;
use thiserror::Error;

/// Errors from the IPFS storage backends
#[derive(Debug, Error)]
pub enum IpfsError {
    /// HTTP client could not be built
    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    /// Configured API URL is malformed
    #[error("invalid API URL '{url}': {reason}")]
    InvalidUrl {
        /// URL as configured
        url: String,
        /// Parse failure
        reason: String,
    },

    /// Backend needs credentials and none were supplied
    #[error("the {backend} backend requires a storage token or an API key and secret")]
    MissingToken {
        /// Backend name
        backend: &'static str,
    },

    /// Request failed before a response arrived
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Service answered with a non-success status
    #[error("{endpoint} returned {status}: {body}")]
    Status {
        /// Endpoint path
        endpoint: String,
        /// HTTP status
        status: u16,
        /// Response body
        body: String,
    },

    /// Response body could not be interpreted
    #[error("unexpected response: {0}")]
    Response(String),
}

/// Result alias for the storage backends
pub type Result<T> = std::result::Result<T, IpfsError>;

impl From<IpfsError> for StoreError {
    fn from(err: IpfsError) -> Self {
        match err {
            IpfsError::Status { status, body, .. } => StoreError::Rejected { status, body },
            IpfsError::Response(msg) => StoreError::InvalidResponse(msg),
            other => StoreError::Request(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_maps_to_rejected() {
        let err: StoreError = IpfsError::Status {
            endpoint: "/api/v0/add".to_string(),
            status: 401,
            body: "unauthorized".to_string(),
        }
        .into();
        assert!(matches!(err, StoreError::Rejected { status: 401, .. }));
    }

    #[test]
    fn missing_token_maps_to_request() {
        let err: StoreError = IpfsError::MissingToken { backend: "pinata" }.into();
        assert!(err.to_string().contains("requires a storage token"));
    }
}
