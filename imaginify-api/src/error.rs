/// Error handling for the API server
///
/// This module provides a unified error type that maps to HTTP responses.
/// All handlers return `Result<T, ApiError>`, which converts to the matching
/// status code and a JSON body:
///
/// ```json
/// { "error": "bad_request", "message": "Missing svix-id header" }
/// ```
///
/// # Example
///
/// ```
/// use imaginify_api::error::{ApiError, ApiResult};
/// use axum::Json;
/// use serde_json::json;
///
/// async fn handler(secret: Option<String>) -> ApiResult<Json<serde_json::Value>> {
///     let secret = secret.ok_or_else(|| ApiError::InternalError("secret missing".to_string()))?;
///     Ok(Json(json!({ "length": secret.len() })))
/// }
/// ```

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use imaginify_shared::assets::AssetError;
use imaginify_shared::error::DataError;
use imaginify_shared::webhook::{DispatchError, VerifyError};
use serde::{Deserialize, Serialize};
use std::fmt;

/// API result type alias
pub type ApiResult<T> = Result<T, ApiError>;

/// Unified API error type
#[derive(Debug)]
pub enum ApiError {
    /// Bad request (400)
    BadRequest(String),

    /// Internal server error (500)
    InternalError(String),

    /// Service unavailable (503) - the CDN could not be reached
    ServiceUnavailable(String),
}

/// Error response format
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Error code (e.g., "bad_request", "internal_error")
    pub error: String,

    /// Human-readable error message
    pub message: String,
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::BadRequest(msg) => write!(f, "Bad request: {}", msg),
            ApiError::InternalError(msg) => write!(f, "Internal error: {}", msg),
            ApiError::ServiceUnavailable(msg) => write!(f, "Service unavailable: {}", msg),
        }
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        let (error_code, message) = match self {
            ApiError::BadRequest(msg) => ("bad_request", msg),
            ApiError::InternalError(msg) => {
                // Log internal errors but don't expose details to clients
                tracing::error!("Internal error: {}", msg);
                ("internal_error", "An internal error occurred".to_string())
            }
            ApiError::ServiceUnavailable(msg) => {
                tracing::warn!("Upstream unavailable: {}", msg);
                (
                    "service_unavailable",
                    "Image search is temporarily unavailable".to_string(),
                )
            }
        };

        let body = Json(ErrorResponse {
            error: error_code.to_string(),
            message,
        });

        (status, body).into_response()
    }
}

/// Data failures behind the read-only gallery are server-side
impl From<DataError> for ApiError {
    fn from(err: DataError) -> Self {
        ApiError::InternalError(err.to_string())
    }
}

/// CDN transport and API failures are upstream; missing credentials are ours
impl From<AssetError> for ApiError {
    fn from(err: AssetError) -> Self {
        match err {
            AssetError::Request(_) | AssetError::Api { .. } => {
                ApiError::ServiceUnavailable(err.to_string())
            }
            AssetError::Config(msg) => ApiError::InternalError(msg),
            AssetError::Data(err) => err.into(),
        }
    }
}

/// Signature failures are the caller's fault; a bad signing secret is ours
impl From<VerifyError> for ApiError {
    fn from(err: VerifyError) -> Self {
        match err {
            VerifyError::InvalidSecret(_) => ApiError::InternalError(err.to_string()),
            _ => ApiError::BadRequest(err.to_string()),
        }
    }
}

/// A verified event that could not be applied is a server-side failure
impl From<DispatchError> for ApiError {
    fn from(err: DispatchError) -> Self {
        ApiError::InternalError(format!("Webhook handler failed: {}", err))
    }
}
