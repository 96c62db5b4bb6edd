// Custom error types and conversions
// This helps in providing consistent error responses in Axum

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde_json::json;
use std::sync::Arc;

/// Error shared between every waiter of a deduplicated fetch.
///
/// The in-flight registry hands the same future to all concurrent callers, so
/// the failure they observe has to be cloneable. The upstream error chain is
/// flattened to a string at the point of capture.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{0}")]
pub struct FetchError(pub Arc<String>);

impl FetchError {
    pub fn new(msg: impl Into<String>) -> Self {
        FetchError(Arc::new(msg.into()))
    }
}

impl From<anyhow::Error> for FetchError {
    fn from(error: anyhow::Error) -> Self {
        FetchError(Arc::new(format!("{:#}", error)))
    }
}

// Application-level error type for the gateway routes
#[derive(Debug)]
pub enum AppError {
    InternalServerError(anyhow::Error),
    /// The catalog API could not be reached or answered with an error.
    Upstream(FetchError),
    BadRequest(String),
}

// Implement conversion from anyhow::Error for easier error propagation
impl From<anyhow::Error> for AppError {
    fn from(error: anyhow::Error) -> Self {
        AppError::InternalServerError(error)
    }
}

impl From<FetchError> for AppError {
    fn from(error: FetchError) -> Self {
        AppError::Upstream(error)
    }
}

// Implement IntoResponse for AppError to convert errors into HTTP responses
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::InternalServerError(e) => {
                // Log the detailed error here
                tracing::error!("Internal server error: {:?}", e);
                // Don't expose internal details to the client
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal Server Error".to_string(),
                )
            }
            AppError::Upstream(e) => {
                tracing::error!("Catalog upstream error: {}", e);
                // The storefront shows this text next to its manual-retry button
                (
                    StatusCode::BAD_GATEWAY,
                    "Unable to load cars. Please try again.".to_string(),
                )
            }
            AppError::BadRequest(message) => {
                tracing::warn!("Bad request: {}", message);
                (StatusCode::BAD_REQUEST, message)
            }
        };

        let body = Json(json!({ "success": false, "error": error_message }));
        (status, body).into_response()
    }
}

// Define a custom Result type using our AppError
pub type AppResult<T> = Result<T, AppError>;
