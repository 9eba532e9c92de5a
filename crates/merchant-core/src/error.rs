use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Broad error category used for user-facing reporting.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ApiErrorCategory {
    /// Input rejected locally before any network call.
    Validation,
    /// Authentication/authorization failure reported by a backend.
    Auth,
    /// Transport failure or server-side (5xx) outage.
    Network,
    /// Non-success HTTP status that is not auth related.
    Http,
    /// Response body could not be decoded.
    Decode,
    /// Local persistent storage failure.
    Storage,
    /// Internal bug or invariant break.
    Internal,
}

/// Stable error payload surfaced by clients and the upload pipeline.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ApiError {
    /// High-level error category.
    pub category: ApiErrorCategory,
    /// Stable machine-readable error code.
    pub code: String,
    /// Human-readable message.
    pub message: String,
    /// HTTP status when the failure carried one.
    pub status: Option<u16>,
}

impl ApiError {
    /// Construct a new error.
    pub fn new(
        category: ApiErrorCategory,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            category,
            code: code.into(),
            message: message.into(),
            status: None,
        }
    }

    /// Attach the HTTP status that produced this error.
    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    /// Local validation failure.
    pub fn validation(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(ApiErrorCategory::Validation, code, message)
    }

    /// Failure to decode a response body.
    pub fn decode(message: impl Into<String>) -> Self {
        Self::new(ApiErrorCategory::Decode, "decode_error", message)
    }

    /// Build an error for a non-2xx response with an already resolved message.
    pub fn http_status(status: u16, message: impl Into<String>) -> Self {
        Self::new(classify_http_status(status), "http_status", message).with_status(status)
    }

    /// Prefix the message with context while keeping category and code.
    pub fn context(mut self, prefix: &str) -> Self {
        self.message = format!("{prefix}: {}", self.message);
        self
    }
}

/// Map HTTP status codes to error categories.
pub fn classify_http_status(status: u16) -> ApiErrorCategory {
    match status {
        401 | 403 => ApiErrorCategory::Auth,
        400..=499 => ApiErrorCategory::Http,
        500..=599 => ApiErrorCategory::Network,
        _ => ApiErrorCategory::Internal,
    }
}

/// Resolve a user-facing message from an error, falling back to `default`.
pub fn error_message(error: &ApiError, default: &str) -> String {
    if error.message.trim().is_empty() {
        default.to_owned()
    } else {
        error.message.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_http_status_categories() {
        assert_eq!(classify_http_status(401), ApiErrorCategory::Auth);
        assert_eq!(classify_http_status(403), ApiErrorCategory::Auth);
        assert_eq!(classify_http_status(404), ApiErrorCategory::Http);
        assert_eq!(classify_http_status(503), ApiErrorCategory::Network);
        assert_eq!(classify_http_status(700), ApiErrorCategory::Internal);
    }

    #[test]
    fn http_status_error_keeps_status_and_code() {
        let err = ApiError::http_status(502, "HTTP 502");
        assert_eq!(err.status, Some(502));
        assert_eq!(err.code, "http_status");
        assert_eq!(err.category, ApiErrorCategory::Network);
        assert_eq!(err.to_string(), "HTTP 502");
    }

    #[test]
    fn context_prefixes_message() {
        let err = ApiError::validation("bad", "nope").context("Image upload failed");
        assert_eq!(err.message, "Image upload failed: nope");
        assert_eq!(err.code, "bad");
    }

    #[test]
    fn error_message_falls_back_on_blank() {
        let blank = ApiError::decode("  ");
        assert_eq!(error_message(&blank, "An error occurred"), "An error occurred");
        let set = ApiError::decode("bad json");
        assert_eq!(error_message(&set, "An error occurred"), "bad json");
    }
}
