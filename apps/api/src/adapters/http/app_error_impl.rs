use axum::Json;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use woosell_types::{ApiResponse, ErrorCode};

use crate::app_error::AppError;

impl AppError {
    /// HTTP status and machine code for each variant.
    pub fn status_and_code(&self) -> (StatusCode, ErrorCode) {
        match self {
            AppError::InvalidInput(_) => (StatusCode::BAD_REQUEST, ErrorCode::InvalidInput),
            AppError::MalformedPayload(_) => (StatusCode::BAD_REQUEST, ErrorCode::MalformedPayload),
            AppError::InvalidSignature => (StatusCode::UNAUTHORIZED, ErrorCode::InvalidSignature),
            AppError::InvalidCredentials => (StatusCode::UNAUTHORIZED, ErrorCode::Unauthorized),
            AppError::Forbidden => (StatusCode::FORBIDDEN, ErrorCode::Forbidden),
            AppError::NotFound => (StatusCode::NOT_FOUND, ErrorCode::NotFound),
            AppError::SiteNotFound(_) => (StatusCode::NOT_FOUND, ErrorCode::SiteNotFound),
            AppError::UpstreamProvisioning(_) => {
                (StatusCode::BAD_GATEWAY, ErrorCode::UpstreamProvisioningFailure)
            }
            AppError::Timeout => (StatusCode::SERVICE_UNAVAILABLE, ErrorCode::Timeout),
            AppError::Database(_) => (StatusCode::INTERNAL_SERVER_ERROR, ErrorCode::DatabaseError),
            AppError::Configuration(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, ErrorCode::ConfigurationError)
            }
            AppError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, ErrorCode::InternalError),
        }
    }

    /// Client-safe sentence; never contains internal error text.
    fn public_message(&self) -> &'static str {
        match self {
            AppError::InvalidInput(_) => "The request is invalid",
            AppError::MalformedPayload(_) => "The webhook payload is malformed",
            AppError::InvalidSignature => "The webhook signature is invalid",
            AppError::InvalidCredentials => "Authentication is required",
            AppError::Forbidden => "You do not have access to this resource",
            AppError::NotFound => "The requested resource was not found",
            AppError::SiteNotFound(_) => "No site matches the webhook",
            AppError::UpstreamProvisioning(_) => "The site provisioning service failed",
            AppError::Timeout => "The request took too long, retry later",
            AppError::Database(_) => "A storage error occurred",
            AppError::Configuration(_) => "The service is misconfigured",
            AppError::Internal(_) => "An internal error occurred",
        }
    }

    /// Only client errors carry details.
    fn public_details(&self) -> Option<serde_json::Value> {
        match self {
            AppError::InvalidInput(reason) => Some(json!({ "reason": reason })),
            AppError::MalformedPayload(e) => Some(json!({ "field": e.field(), "reason": e.to_string() })),
            AppError::SiteNotFound(site_ref) => Some(json!({ "siteRef": site_ref })),
            _ => None,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();
        if status.is_server_error() {
            tracing::error!(error = %self, code = code.as_str(), "Request failed");
        } else {
            tracing::warn!(error = %self, code = code.as_str(), "Request rejected");
        }

        let body = ApiResponse::<()>::failure(code, self.public_message(), self.public_details());
        (status, Json(body)).into_response()
    }
}
