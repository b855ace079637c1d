//! Error types for inspection-provider operations.
//!
//! Covers the HTTP client (network, timeout, non-2xx responses, decode
//! failures) and webhook envelope verification. Errors carry enough context
//! for logging without echoing payload contents.

use thiserror::Error;

/// Result type alias for provider operations.
pub type Result<T> = std::result::Result<T, InspectionError>;

/// Errors returned by the inspection-provider client and webhook parsing.
#[derive(Debug, Clone, Error)]
pub enum InspectionError {
    /// Network-level connectivity failure.
    #[error("network connection failed: {message}")]
    Network {
        /// Description of the network failure
        message: String,
    },

    /// HTTP request timeout exceeded.
    #[error("request timeout after {timeout_seconds}s")]
    Timeout {
        /// Seconds before the request timed out
        timeout_seconds: u64,
    },

    /// Provider responded with a non-2xx status.
    #[error("provider returned HTTP {status_code}")]
    HttpStatus {
        /// HTTP status code
        status_code: u16,
        /// Response body content, truncated
        body: String,
    },

    /// Provider response could not be decoded.
    #[error("failed to decode provider response: {message}")]
    Decode {
        /// Description of the decode failure
        message: String,
    },

    /// Webhook signature did not verify.
    ///
    /// Deliberately carries no payload data: the body is untrusted until the
    /// signature checks out.
    #[error("invalid webhook signature: {message}")]
    InvalidSignature {
        /// Description of the verification failure
        message: String,
    },

    /// Webhook body verified but did not parse as an event envelope.
    #[error("invalid webhook payload: {message}")]
    InvalidPayload {
        /// Description of the parse failure
        message: String,
    },

    /// Client could not be constructed from its configuration.
    #[error("invalid client configuration: {message}")]
    Configuration {
        /// Description of the configuration problem
        message: String,
    },
}

impl InspectionError {
    /// Creates a network error from a message.
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network { message: message.into() }
    }

    /// Creates a timeout error.
    pub fn timeout(timeout_seconds: u64) -> Self {
        Self::Timeout { timeout_seconds }
    }

    /// Creates an HTTP status error from a provider response.
    pub fn http_status(status_code: u16, body: impl Into<String>) -> Self {
        Self::HttpStatus { status_code, body: body.into() }
    }

    /// Creates a decode error.
    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode { message: message.into() }
    }

    /// Creates an invalid-signature error.
    pub fn invalid_signature(message: impl Into<String>) -> Self {
        Self::InvalidSignature { message: message.into() }
    }

    /// Creates an invalid-payload error.
    pub fn invalid_payload(message: impl Into<String>) -> Self {
        Self::InvalidPayload { message: message.into() }
    }

    /// Creates a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration { message: message.into() }
    }

    /// Whether this error came from verifying or parsing a webhook rather
    /// than from an outbound call.
    ///
    /// Webhook errors map to a 400 response; outbound-call errors map to 502.
    pub fn is_webhook_error(&self) -> bool {
        matches!(self, Self::InvalidSignature { .. } | Self::InvalidPayload { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn webhook_errors_classified() {
        assert!(InspectionError::invalid_signature("mismatch").is_webhook_error());
        assert!(InspectionError::invalid_payload("bad json").is_webhook_error());

        assert!(!InspectionError::network("refused").is_webhook_error());
        assert!(!InspectionError::timeout(30).is_webhook_error());
        assert!(!InspectionError::http_status(500, "oops").is_webhook_error());
    }

    #[test]
    fn error_display_format() {
        let err = InspectionError::timeout(30);
        assert_eq!(err.to_string(), "request timeout after 30s");

        let err = InspectionError::http_status(422, "unprocessable");
        assert_eq!(err.to_string(), "provider returned HTTP 422");
    }
}
