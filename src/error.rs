//! Error types for the content store, the scraper and the HTTP gateway.
//!
//! Service errors carry full detail and are logged where they are caught.
//! [`ApiError`] is what reaches callers: a status code and a sanitized message.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Failures of the content store and the queries over it.
#[derive(Error, Debug)]
pub enum ContentError {
    #[error("content store unavailable: {0}")]
    Unavailable(String),

    #[error("snapshot io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("snapshot is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Failures while ingesting a source.
#[derive(Error, Debug)]
pub enum ScrapeError {
    #[error("request failed for {url}: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("non-success status {status} for {url}")]
    Status { url: String, status: u16 },

    #[error("invalid selector `{0}`")]
    Selector(String),

    #[error("malformed feed: {0}")]
    Feed(String),

    #[error("invalid source url {url}: {reason}")]
    SourceUrl { url: String, reason: String },

    #[error("no scraper sources are configured")]
    NoSources,

    #[error("all {0} sources failed")]
    AllSourcesFailed(usize),

    #[error(transparent)]
    Store(#[from] ContentError),
}

impl ScrapeError {
    /// Whether a retry could plausibly succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            ScrapeError::Http { .. } => true,
            ScrapeError::Status { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

/// Error returned by gateway handlers.
///
/// `NotFound` messages are shown to the caller verbatim; `Upstream` messages
/// must already be generic, the underlying cause is logged by the handler.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    #[error("{0}")]
    NotFound(&'static str),

    #[error("{0}")]
    Upstream(&'static str),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Upstream(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let body = Json(json!({ "error": self.to_string() }));
        (status, body).into_response()
    }
}
