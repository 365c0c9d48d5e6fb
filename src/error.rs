//! Error types for fetcher configuration and license lookups.

use thiserror::Error;

/// Why a single module's lookup failed.
///
/// Every variant is terminal for that module; nothing is retried.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The request could not be built (malformed URL, host outside the pin).
    #[error("new http req: {0}")]
    InvalidTarget(String),

    /// Connecting, sending, reading the body, or the request timeout.
    #[error("do http req: {0}")]
    Transport(#[from] reqwest::Error),

    /// The cancellation token fired while the request was in flight.
    #[error("lookup cancelled")]
    Cancelled,

    #[error("status not ok: {0}")]
    BadStatus(u16),

    #[error("new doc reader: {0}")]
    Parse(#[from] std::io::Error),
}

impl FetchError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, FetchError::Cancelled)
    }
}

/// Invalid fetcher settings, detected before any lookup starts.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid lookup base url {url:?}: {source}")]
    BaseUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("lookup base url {0:?} has no host")]
    MissingHost(String),

    #[error("{0} must be greater than zero")]
    Zero(&'static str),

    #[error("failed to build http client: {0}")]
    Client(#[from] reqwest::Error),
}
