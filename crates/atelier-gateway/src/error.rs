//! Errors

use atelier_common::ledger;

/// Mint gateway Error
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid gateway URL
    #[error(transparent)]
    InvalidUrl(#[from] url::ParseError),
    /// HTTP transport Error
    #[error(transparent)]
    Http(#[from] reqwest::Error),
    /// The gateway answered with a non-success status
    #[error("Gateway returned {status}: {message}")]
    Gateway {
        /// HTTP status code
        status: u16,
        /// Response body, truncated
        message: String,
    },
    /// Serde Error
    #[error(transparent)]
    Serde(#[from] serde_json::Error),
}

impl From<Error> for ledger::Error {
    fn from(err: Error) -> Self {
        match err {
            Error::Http(http) if http.is_timeout() => ledger::Error::Timeout,
            Error::Http(http) => ledger::Error::Transport(Box::new(http)),
            Error::Gateway { status, message } => ledger::Error::Rejected {
                status: format!("{status} {message}"),
            },
            Error::Serde(serde) => ledger::Error::Serde(serde),
            err => ledger::Error::Custom(err.to_string()),
        }
    }
}
