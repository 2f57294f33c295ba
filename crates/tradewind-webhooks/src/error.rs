//! Error types for the webhook subsystem.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use utoipa::ToSchema;

/// Webhook subsystem error variants.
///
/// Validation, not-found, and limit errors surface synchronously to API
/// callers. Delivery failures never appear here: the delivery engine records
/// them on the delivery row itself and has no caller to fail.
#[derive(Debug, thiserror::Error)]
pub enum WebhookError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Invalid request: {0}")]
    Validation(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("SSRF protection: {0}")]
    SsrfDetected(String),

    #[error("Endpoint limit ({limit}) reached for tenant")]
    EndpointLimitExceeded { limit: i64 },

    #[error("API credential not found")]
    CredentialNotFound,

    #[error("Endpoint not found")]
    EndpointNotFound,

    #[error("Delivery not found")]
    DeliveryNotFound,

    #[error("Encryption failed: {0}")]
    EncryptionFailed(String),

    #[error("Missing or invalid tenant context")]
    TenantMissing,

    #[error("Internal server error: {0}")]
    Internal(String),
}

/// JSON error body returned by the webhook API.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    pub status: u16,
}

impl IntoResponse for WebhookError {
    fn into_response(self) -> Response {
        let (status, error_type) = match &self {
            WebhookError::Database(_) => (StatusCode::INTERNAL_SERVER_ERROR, "database_error"),
            WebhookError::Validation(_) => (StatusCode::BAD_REQUEST, "validation_error"),
            WebhookError::InvalidUrl(_) => (StatusCode::BAD_REQUEST, "invalid_url"),
            WebhookError::SsrfDetected(_) => (StatusCode::BAD_REQUEST, "ssrf_detected"),
            WebhookError::EndpointLimitExceeded { .. } => {
                (StatusCode::CONFLICT, "endpoint_limit_exceeded")
            }
            WebhookError::CredentialNotFound => (StatusCode::NOT_FOUND, "credential_not_found"),
            WebhookError::EndpointNotFound => (StatusCode::NOT_FOUND, "endpoint_not_found"),
            WebhookError::DeliveryNotFound => (StatusCode::NOT_FOUND, "delivery_not_found"),
            WebhookError::EncryptionFailed(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "encryption_error")
            }
            WebhookError::TenantMissing => (StatusCode::UNAUTHORIZED, "tenant_missing"),
            WebhookError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
        };

        let body = ErrorResponse {
            error: error_type.to_string(),
            message: self.to_string(),
            status: status.as_u16(),
        };

        (status, axum::Json(body)).into_response()
    }
}

pub type ApiResult<T> = Result<T, WebhookError>;
