//! Error type shared by every component of the SDK.

use reqwest::StatusCode;
use std::time::Duration;
use thiserror::Error;

/// Errors returned by the connector manager client and the event bridge.
#[derive(Debug, Error)]
pub enum Error {
    /// The API key was rejected (HTTP 401). Never retried: callers must stop
    /// instead of looping against a dead credential.
    #[error("connector's api key is either revoked or invalid: {body}")]
    Unauthorized {
        /// Value of the `code` field of the error body, when it could be parsed.
        code: Option<i64>,
        body: String,
    },

    /// Any other non-200 response (including 502 once the retry budget is spent).
    #[error("invalid response from connector manager, {status}: {body}")]
    Http { status: StatusCode, body: String },

    /// Network-level failure, or failure to build the HTTP client.
    #[error("request to connector manager failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// An event envelope carried a tag that maps to no known event variant.
    #[error("invalid event type '{0}'")]
    InvalidEventType(String),

    /// An event notification did not complete within its bounded timeout.
    #[error("event notification timed out after {0:?}")]
    Timeout(Duration),

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl Error {
    /// Returns true for the fatal authorization class.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Error::Unauthorized { .. })
    }
}

pub type Result<T> = std::result::Result<T, Error>;
