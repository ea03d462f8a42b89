//! HTTP error responses.
//!
//! Every failure leaves the server as `{ "error": ..., "message"?: ... }`
//! with a status derived from the domain error.

use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::auth::AuthError;
use crate::catalog::CatalogError;
use crate::observability::Event;

#[derive(Debug, Clone, Serialize)]
pub struct ErrorBody {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Handler error carrying its HTTP status
#[derive(Debug, Clone)]
pub struct ApiError {
    pub status: StatusCode,
    pub error: String,
    pub message: Option<String>,
}

impl ApiError {
    pub fn new(status: StatusCode, error: impl Into<String>) -> Self {
        Self {
            status,
            error: error.into(),
            message: None,
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn bad_request(error: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, error)
    }

    fn from_code(code: u16, error: String) -> Self {
        let status = StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        Self::new(status, error)
    }
}

impl From<CatalogError> for ApiError {
    fn from(err: CatalogError) -> Self {
        Self::from_code(err.status_code(), err.to_string())
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        Self::from_code(err.status_code(), err.to_string())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::bad_request("Invalid request body").with_message(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::bad_request("Invalid query string").with_message(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        Self::bad_request("Invalid path").with_message(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            tracing::error!(event = %Event::RequestFailed, status = self.status.as_u16(), error = %self.error, "request failed");
        } else {
            tracing::debug!(status = self.status.as_u16(), error = %self.error, "request rejected");
        }

        let body = ErrorBody {
            error: self.error,
            message: self.message,
        };
        (self.status, Json(body)).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_domain_errors_map_to_status() {
        assert_eq!(
            ApiError::from(CatalogError::not_found("Product", "x")).status,
            StatusCode::NOT_FOUND
        );
        assert_eq!(ApiError::from(CatalogError::Unavailable).status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(ApiError::from(AuthError::Unauthorized).status, StatusCode::FORBIDDEN);
        assert_eq!(
            ApiError::from(AuthError::AuthenticationRequired).status,
            StatusCode::UNAUTHORIZED
        );
    }

    #[test]
    fn test_out_of_range_code_falls_back_to_500() {
        let err = ApiError::from_code(1000, "odd".into());
        assert_eq!(err.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.error, "odd");
    }

    #[test]
    fn test_error_body_omits_empty_message() {
        let body = serde_json::to_value(ErrorBody {
            error: "nope".into(),
            message: None,
        })
        .unwrap();
        assert_eq!(body, serde_json::json!({"error": "nope"}));
    }
}
