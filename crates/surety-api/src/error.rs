//! API error type and HTTP response mapping.
//!
//! Every handler returns `Result<_, ApiError>`. The response body is JSON
//! `{"error": {"code", "message"}}` with a stable machine-readable code per
//! variant; internal details are logged at the point of failure, never
//! echoed to the caller.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use surety_core::CoreError;
use surety_inspection::InspectionError;
use thiserror::Error;

/// Errors surfaced by the HTTP handlers.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Requested entity does not exist.
    #[error("{0} not found")]
    NotFound(String),

    /// Request failed validation.
    #[error("{0}")]
    Validation(String),

    /// Webhook signature or envelope rejected.
    #[error("webhook error: {0}")]
    InvalidWebhook(String),

    /// Callback token missing, malformed, or expired.
    #[error("invalid callback token")]
    InvalidToken,

    /// Request conflicts with the record's current state.
    #[error("{0}")]
    Conflict(String),

    /// Outbound call to the inspection provider failed.
    #[error("inspection provider unavailable")]
    Provider(#[source] InspectionError),

    /// Storage or other internal failure.
    #[error("internal error")]
    Internal(#[source] anyhow::Error),
}

impl ApiError {
    /// Not-found error naming the missing entity.
    pub fn not_found(entity: impl Into<String>) -> Self {
        Self::NotFound(entity.into())
    }

    /// Stable machine-readable code for this error.
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "not_found",
            Self::Validation(_) => "validation",
            Self::InvalidWebhook(_) => "invalid_webhook",
            Self::InvalidToken => "invalid_token",
            Self::Conflict(_) => "conflict",
            Self::Provider(_) => "provider_error",
            Self::Internal(_) => "internal",
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Validation(_) | Self::InvalidWebhook(_) | Self::InvalidToken => {
                StatusCode::BAD_REQUEST
            },
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Provider(_) => StatusCode::BAD_GATEWAY,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::NotFound(what) => Self::NotFound(what),
            other => Self::Internal(other.into()),
        }
    }
}

impl From<InspectionError> for ApiError {
    fn from(err: InspectionError) -> Self {
        if err.is_webhook_error() {
            Self::InvalidWebhook(err.to_string())
        } else {
            Self::Provider(err)
        }
    }
}

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error details including code and message.
    pub error: ErrorDetail,
}

/// Detailed error information.
#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    /// Machine-readable error code.
    pub code: String,
    /// Human-readable error description.
    pub message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();

        match &self {
            ApiError::Provider(source) => {
                tracing::error!(error = %source, "Provider call failed");
            },
            ApiError::Internal(source) => {
                tracing::error!(error = %source, "Internal error");
            },
            other => {
                tracing::debug!(code = other.code(), "Request rejected: {other}");
            },
        }

        let body = ErrorResponse {
            error: ErrorDetail { code: self.code().to_string(), message: self.to_string() },
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_match_error_classes() {
        assert_eq!(ApiError::not_found("policy").status(), StatusCode::NOT_FOUND);
        assert_eq!(ApiError::Validation("bad".into()).status(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::InvalidWebhook("sig".into()).status(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::InvalidToken.status(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::Conflict("state".into()).status(), StatusCode::CONFLICT);
        assert_eq!(
            ApiError::Provider(InspectionError::timeout(30)).status(),
            StatusCode::BAD_GATEWAY
        );
    }

    #[test]
    fn core_not_found_maps_to_404() {
        let err = ApiError::from(CoreError::NotFound("policy abc".to_string()));
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
        assert_eq!(err.code(), "not_found");
    }

    #[test]
    fn core_database_error_maps_to_internal() {
        let err = ApiError::from(CoreError::Database("connection lost".to_string()));
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        // The message must not echo the database failure
        assert_eq!(err.to_string(), "internal error");
    }

    #[test]
    fn webhook_inspection_errors_map_to_400() {
        let err = ApiError::from(InspectionError::invalid_signature("mismatch"));
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);

        let err = ApiError::from(InspectionError::network("refused"));
        assert_eq!(err.status(), StatusCode::BAD_GATEWAY);
    }
}
