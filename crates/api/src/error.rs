//! Error types for `gaffer-api`.

use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

/// HTTP status codes the transport treats as transient.
pub const RETRYABLE_STATUS_CODES: [u16; 6] = [401, 429, 500, 502, 503, 504];

/// Main error type for the API core.
///
/// Every layer propagates these unchanged; the `Display` text is what ends up in the MCP tool
/// failure result.
#[derive(Error, Debug)]
pub enum GafferError {
    /// Missing configuration, a credential-kind mismatch, or an invalid input combination.
    /// Never retried and never sent over the network.
    #[error("{0}")]
    Config(String),

    /// Non-2xx response from the upstream service.
    #[error("{message}")]
    Api {
        status: u16,
        code: Option<String>,
        message: String,
        details: Option<Value>,
    },

    /// A single attempt exceeded its wall-clock deadline.
    #[error("Request timed out after {}ms", .timeout.as_millis())]
    Timeout { timeout: Duration },

    /// Connection-level failure (DNS, refused connection, reset while reading the body).
    #[error("Network error: {0}")]
    Transport(String),

    /// A 2xx response whose body is not JSON or does not match the declared output shape.
    #[error("Invalid response from API: {0}")]
    Decode(String),
}

/// Result type alias for API operations.
pub type Result<T> = std::result::Result<T, GafferError>;

impl GafferError {
    pub(crate) fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Build an error from a non-2xx response.
    ///
    /// Uses the structured `{error:{code,message,details}}` envelope when the body carries one,
    /// otherwise falls back to a generic status message.
    #[must_use]
    pub fn from_response(status: u16, body: &[u8]) -> Self {
        let envelope = serde_json::from_slice::<ErrorEnvelope>(body)
            .ok()
            .map(|e| e.error);

        let (code, message, details) = match envelope {
            Some(ErrorBody {
                code,
                message: Some(message),
                details,
            }) if !message.trim().is_empty() => (code, message, details),
            Some(ErrorBody { code, details, .. }) => {
                (code, generic_status_message(status), details)
            }
            None => (None, generic_status_message(status), None),
        };

        Self::Api {
            status,
            code,
            message,
            details,
        }
    }

    /// Whether the transport may spend another attempt on this error.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Api { status, .. } => RETRYABLE_STATUS_CODES.contains(status),
            Self::Timeout { .. } | Self::Transport(_) => true,
            Self::Config(_) | Self::Decode(_) => false,
        }
    }

    /// HTTP status, for errors that came from an upstream response.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            _ => None,
        }
    }
}

fn generic_status_message(status: u16) -> String {
    format!("API request failed with status {status}")
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    details: Option<Value>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn structured_envelope_message_is_surfaced() {
        let body = json!({"error": {"code": "NOT_FOUND", "message": "not found"}}).to_string();
        let err = GafferError::from_response(404, body.as_bytes());
        assert_eq!(err.to_string(), "not found");
        match err {
            GafferError::Api { status, code, .. } => {
                assert_eq!(status, 404);
                assert_eq!(code.as_deref(), Some("NOT_FOUND"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn missing_envelope_falls_back_to_status_message() {
        let err = GafferError::from_response(502, b"<html>bad gateway</html>");
        assert_eq!(err.to_string(), "API request failed with status 502");
    }

    #[test]
    fn envelope_without_message_falls_back_but_keeps_code() {
        let body = json!({"error": {"code": "RATE_LIMITED"}}).to_string();
        let err = GafferError::from_response(429, body.as_bytes());
        assert_eq!(err.to_string(), "API request failed with status 429");
        assert!(matches!(err, GafferError::Api { code: Some(ref c), .. } if c == "RATE_LIMITED"));
    }

    #[test]
    fn retryable_classification() {
        for status in RETRYABLE_STATUS_CODES {
            assert!(GafferError::from_response(status, b"").is_retryable());
        }
        for status in [400, 403, 404, 409, 422, 501] {
            assert!(!GafferError::from_response(status, b"").is_retryable());
        }
        assert!(
            GafferError::Timeout {
                timeout: Duration::from_secs(30)
            }
            .is_retryable()
        );
        assert!(GafferError::Transport("refused".to_string()).is_retryable());
        assert!(!GafferError::Decode("eof".to_string()).is_retryable());
        assert!(!GafferError::config("bad").is_retryable());
    }

    #[test]
    fn timeout_message_reports_milliseconds() {
        let err = GafferError::Timeout {
            timeout: Duration::from_secs(30),
        };
        assert_eq!(err.to_string(), "Request timed out after 30000ms");
    }
}
