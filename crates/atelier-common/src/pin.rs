//! Metadata pinner trait

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Pinning Error
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Upload did not complete within the configured timeout
    #[error("Pin call timed out")]
    Timeout,
    /// Network failure reaching the pinning service
    #[error(transparent)]
    Transport(Box<dyn std::error::Error + Send + Sync>),
    /// The pinning service answered with something unusable
    #[error("Pinning service returned an invalid response: {0}")]
    InvalidResponse(String),
    /// Serde Error
    #[error(transparent)]
    Serde(#[from] serde_json::Error),
    /// AnyHow Error
    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
    /// Custom
    #[error("`{0}`")]
    Custom(String),
}

/// A pinned document
#[derive(Debug, Clone, Hash, PartialEq, Eq, Serialize, Deserialize)]
pub struct PinnedContent {
    /// Stable retrieval URL for the pinned content
    pub url: String,
    /// Content hash the URL is derived from
    pub content_hash: String,
}

/// Metadata pinner trait
///
/// Uploads a JSON document to a content-addressed store and returns a
/// stable retrieval URL. No retry logic of its own: a failed pin is an
/// immediate saga failure and the dispatcher's backoff governs redelivery.
#[async_trait]
pub trait MetadataPinner {
    /// Pinning Error
    type Err: Into<Error> + From<Error>;

    /// Pin a JSON document
    async fn pin_json(&self, document: &Value) -> Result<PinnedContent, Self::Err>;
}

/// Type alias for a shared metadata pinner
pub type DynMetadataPinner = std::sync::Arc<dyn MetadataPinner<Err = Error> + Send + Sync>;
