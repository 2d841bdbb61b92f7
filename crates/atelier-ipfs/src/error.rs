//! Errors

use atelier_common::pin;

/// Pinning service Error
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid service or gateway URL
    #[error(transparent)]
    InvalidUrl(#[from] url::ParseError),
    /// HTTP transport Error
    #[error(transparent)]
    Http(#[from] reqwest::Error),
    /// The service answered with a non-success status
    #[error("Pinning service returned {status}: {message}")]
    Service {
        /// HTTP status code
        status: u16,
        /// Response body, truncated
        message: String,
    },
    /// The service answered with something unusable
    #[error("Invalid pinning service response: {0}")]
    InvalidResponse(String),
    /// Serde Error
    #[error(transparent)]
    Serde(#[from] serde_json::Error),
}

impl From<Error> for pin::Error {
    fn from(err: Error) -> Self {
        match err {
            Error::Http(http) if http.is_timeout() => pin::Error::Timeout,
            Error::Http(http) => pin::Error::Transport(Box::new(http)),
            Error::Service { status, message } => {
                pin::Error::InvalidResponse(format!("{status} {message}"))
            }
            Error::InvalidResponse(message) => pin::Error::InvalidResponse(message),
            Error::Serde(serde) => pin::Error::Serde(serde),
            err => pin::Error::Custom(err.to_string()),
        }
    }
}
