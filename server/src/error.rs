use axum::http::{Method, StatusCode};
use std::time::Duration;
use thiserror::Error;

/// Everything that can stop a request short of a relayed upstream response.
///
/// Client-caused errors map to 4xx, upstream errors to a single 502. None of
/// them is retried.
#[derive(Debug, Error)]
pub enum ProxyError {
    #[error("method {0} is not allowed")]
    MethodNotAllowed(Method),

    #[error("request body is not valid JSON: {0}")]
    BadJson(#[from] serde_json::Error),

    #[error("failed to read request body: {0}")]
    UnreadableBody(#[source] axum::Error),

    #[error("request body exceeds {0} bytes")]
    BodyTooLarge(usize),

    #[error("invalid target url: {0:?}")]
    InvalidUrl(String),

    #[error("upstream request failed: {0}")]
    Upstream(#[from] reqwest::Error),

    #[error("upstream did not respond within {0:?}")]
    Timeout(Duration),
}

impl ProxyError {
    pub fn status(&self) -> StatusCode {
        match self {
            ProxyError::MethodNotAllowed(_) => StatusCode::METHOD_NOT_ALLOWED,
            ProxyError::BadJson(_)
            | ProxyError::UnreadableBody(_)
            | ProxyError::BodyTooLarge(_)
            | ProxyError::InvalidUrl(_) => StatusCode::BAD_REQUEST,
            ProxyError::Upstream(_) | ProxyError::Timeout(_) => StatusCode::BAD_GATEWAY,
        }
    }

    /// Plain-text body sent to the caller.
    pub fn message(&self) -> &'static str {
        match self {
            ProxyError::MethodNotAllowed(_) => "Use POST with JSON { url: string }",
            ProxyError::BadJson(_) | ProxyError::UnreadableBody(_) | ProxyError::BodyTooLarge(_) => {
                "Bad JSON"
            }
            ProxyError::InvalidUrl(_) => "Invalid URL",
            ProxyError::Upstream(_) | ProxyError::Timeout(_) => "Failed to fetch page",
        }
    }

    pub fn is_upstream(&self) -> bool {
        matches!(self, ProxyError::Upstream(_) | ProxyError::Timeout(_))
    }
}
