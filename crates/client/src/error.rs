//! API error taxonomy and outcome classification
//!
//! Every failure surfaced by the client maps onto a closed set of variants so
//! that callers can branch on meaning (re-login prompt, backoff message,
//! connectivity message) without inspecting raw transport errors. The
//! classification functions are pure: status code + body text in, `ApiError`
//! out.

use serde::Deserialize;
use thiserror::Error;

/// Errors surfaced to callers of the secure API client
///
/// The retry and refresh machinery consumes transient variants internally;
/// anything returned from `get`/`post` is terminal for that logical call.
#[derive(Debug, Clone, Error)]
pub enum ApiError {
    /// HTTP 400, or a request body that could not be serialized
    #[error("Bad request: {message}")]
    BadRequest { message: String },

    /// HTTP 401, including failed refresh-and-replay cycles
    #[error("Unauthorized: {message}")]
    Unauthorized { message: String },

    /// HTTP 403
    #[error("Forbidden: {message}")]
    Forbidden { message: String },

    /// HTTP 404
    #[error("Not found: {message}")]
    NotFound { message: String },

    /// HTTP 429
    #[error("Rate limited: {message}")]
    RateLimited { message: String },

    /// HTTP 500
    #[error("Server error ({status}): {message}")]
    ServerError { status: u16, message: String },

    /// Transport-level failure with no response (timeout or unreachable)
    #[error("Network error: {message}")]
    Network { message: String },

    /// Any other status the taxonomy does not name
    #[error("Unclassified status {status}: {message}")]
    Unclassified { status: u16, message: String },

    /// Credential storage failure on a write path
    #[error("Credential storage error: {message}")]
    Storage { message: String },

    /// Response body did not match the expected shape
    #[error("Failed to decode response: {message}")]
    Decode { message: String },
}

impl ApiError {
    /// HTTP status associated with this error, when one exists
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::BadRequest { .. } => Some(400),
            Self::Unauthorized { .. } => Some(401),
            Self::Forbidden { .. } => Some(403),
            Self::NotFound { .. } => Some(404),
            Self::RateLimited { .. } => Some(429),
            Self::ServerError { status, .. } | Self::Unclassified { status, .. } => Some(*status),
            Self::Network { .. } | Self::Storage { .. } | Self::Decode { .. } => None,
        }
    }

    /// Whether the generic retry path may replay the request
    ///
    /// Transient means a transport failure with no response or HTTP >= 500.
    /// 401 is owned by the refresh-and-replay cycle, every other 4xx is
    /// terminal, and decode/storage faults cannot be fixed by retrying.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Network { .. } | Self::ServerError { .. } => true,
            Self::Unclassified { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

/// Structured error payload the backend attaches to failure responses
#[derive(Debug, Deserialize)]
struct ErrorBody {
    detail: Option<String>,
}

/// Extract the `detail` field from a JSON error body, if present
#[must_use]
pub(crate) fn detail_message(body: &str) -> Option<String> {
    serde_json::from_str::<ErrorBody>(body).ok().and_then(|parsed| parsed.detail)
}

/// Classify a non-success HTTP response into the error taxonomy
///
/// The JSON `detail` field is preferred as the human-readable message; the
/// status line text is the fallback.
#[must_use]
pub fn classify_status(status: reqwest::StatusCode, body: &str) -> ApiError {
    let message = detail_message(body).unwrap_or_else(|| {
        status.canonical_reason().map_or_else(|| format!("status {}", status.as_u16()), String::from)
    });

    match status.as_u16() {
        400 => ApiError::BadRequest { message },
        401 => ApiError::Unauthorized { message },
        403 => ApiError::Forbidden { message },
        404 => ApiError::NotFound { message },
        429 => ApiError::RateLimited { message },
        500 => ApiError::ServerError { status: 500, message },
        other => ApiError::Unclassified { status: other, message },
    }
}

/// Classify a transport-level failure that produced no response
#[must_use]
pub fn classify_transport(err: &reqwest::Error) -> ApiError {
    if err.is_timeout() {
        ApiError::Network { message: "timeout".to_string() }
    } else {
        ApiError::Network { message: "unreachable".to_string() }
    }
}
