//! Atelier metadata pinner for IPFS pinning services
//!
//! Talks to a pinning service's `POST /pins` endpoint with bearer
//! authentication. The service returns the CID of the pinned document; the
//! retrieval URL handed back to the saga points at the configured public
//! gateway, while the on-ledger payload uses the bare `ipfs://` form of
//! the same CID.

use std::time::Duration;

use async_trait::async_trait;
use atelier_common::pin::{self, MetadataPinner, PinnedContent};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use url::Url;

pub mod error;

pub use error::Error;

/// Pinning service client
#[derive(Debug, Clone)]
pub struct IpfsPinner {
    client: reqwest::Client,
    api_url: Url,
    token: String,
    gateway_url: Url,
}

#[derive(Debug, Serialize)]
struct PinRequest<'a> {
    content: &'a Value,
}

#[derive(Debug, Deserialize)]
struct PinResponse {
    cid: String,
}

impl IpfsPinner {
    /// Create a new [`IpfsPinner`] client
    pub fn new(
        api_url: &str,
        token: String,
        gateway_url: &str,
        timeout: Duration,
    ) -> Result<Self, Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            api_url: Url::parse(api_url)?,
            token,
            gateway_url: Url::parse(gateway_url)?,
        })
    }

    fn pins_url(&self) -> Result<Url, Error> {
        let mut url = self.api_url.clone();
        url.path_segments_mut()
            .map_err(|_| Error::InvalidResponse("pinning API URL cannot be a base".to_string()))?
            .pop_if_empty()
            .push("pins");
        Ok(url)
    }

    fn retrieval_url(&self, cid: &str) -> Result<Url, Error> {
        let mut url = self.gateway_url.clone();
        url.path_segments_mut()
            .map_err(|_| Error::InvalidResponse("gateway URL cannot be a base".to_string()))?
            .pop_if_empty()
            .extend(["ipfs", cid]);
        Ok(url)
    }

    async fn pin(&self, document: &Value) -> Result<PinnedContent, Error> {
        let response = self
            .client
            .post(self.pins_url()?)
            .bearer_auth(&self.token)
            .json(&PinRequest { content: document })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            let message = message.chars().take(512).collect::<String>();
            tracing::warn!("Pinning service returned {}: {}", status, message);
            return Err(Error::Service {
                status: status.as_u16(),
                message,
            });
        }

        let pinned: PinResponse = response.json().await?;
        if pinned.cid.is_empty() {
            return Err(Error::InvalidResponse("empty CID".to_string()));
        }

        Ok(PinnedContent {
            url: self.retrieval_url(&pinned.cid)?.to_string(),
            content_hash: pinned.cid,
        })
    }
}

#[async_trait]
impl MetadataPinner for IpfsPinner {
    type Err = pin::Error;

    async fn pin_json(&self, document: &Value) -> Result<PinnedContent, Self::Err> {
        Ok(self.pin(document).await?)
    }
}
