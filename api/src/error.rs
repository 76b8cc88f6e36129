//! API error responses

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use forge_common::ForgeError;
use serde_json::json;
use thiserror::Error;

/// Error returned by handlers
#[derive(Debug, Error)]
pub enum ApiError {
    /// Domain error, mapped by its own status
    #[error(transparent)]
    Forge(#[from] ForgeError),

    /// Caller role lacks the permission
    #[error("unauthorized")]
    Forbidden,

    /// Body could not be read as the expected JSON
    #[error("{0}")]
    BadRequest(String),
}

impl ApiError {
    /// HTTP status for the response
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Forge(err) => StatusCode::from_u16(err.http_status()).unwrap_or(StatusCode::BAD_REQUEST),
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }

    /// Machine-readable error code
    pub fn code(&self) -> &str {
        match self {
            Self::Forge(err) => err.code(),
            Self::Forbidden => "unauthorized",
            Self::BadRequest(_) => "invalid_request",
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let mut body = json!({
            "code": self.code(),
            "error": self.to_string(),
        });
        if let Self::Forge(err) = &self {
            if !err.violations().is_empty() {
                body["errors"] = json!(err.violations());
            }
        }
        (status, Json(body)).into_response()
    }
}

/// Result of a handler
pub type ApiResult<T> = Result<T, ApiError>;
