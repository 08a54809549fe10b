use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;

use super::types::ErrorResponse;
use crate::usage::UsageError;

/// Errors surfaced to HTTP clients. Bodies carry a code and a generic message only.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Authentication required")]
    Unauthenticated,

    #[error(transparent)]
    Usage(#[from] UsageError),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Unauthenticated | ApiError::Usage(UsageError::IdentityUnresolved) => {
                StatusCode::UNAUTHORIZED
            }
            ApiError::Usage(UsageError::BackendUnavailable(_)) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Usage(UsageError::MalformedBackendResponse(_)) => StatusCode::BAD_GATEWAY,
        }
    }

    fn body(&self) -> ErrorResponse {
        let (code, message) = match self {
            ApiError::Unauthenticated | ApiError::Usage(UsageError::IdentityUnresolved) => {
                ("unauthenticated", "Authentication required. Please log in through the hub.")
            }
            ApiError::Usage(err @ UsageError::BackendUnavailable(_)) => (
                err.code(),
                "Usage data is temporarily unavailable. Please try again later.",
            ),
            ApiError::Usage(err @ UsageError::MalformedBackendResponse(_)) => (
                err.code(),
                "Usage data could not be read. Please try again later.",
            ),
        };

        ErrorResponse {
            error: code.to_string(),
            message: message.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status_code(), Json(self.body())).into_response()
    }
}
