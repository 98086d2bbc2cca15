//! API error types with HTTP response mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use domain::OrderError;

/// API-level error type that maps to HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    /// Malformed request: bad id, missing header.
    BadRequest(String),
    /// Error returned by the order engine.
    Order(OrderError),
}

impl ApiError {
    fn status_and_kind(&self) -> (StatusCode, &'static str) {
        match self {
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, "validation_error"),
            ApiError::Order(err) => {
                let status = match err {
                    OrderError::NotFound { .. } => StatusCode::NOT_FOUND,
                    OrderError::Validation(_) => StatusCode::BAD_REQUEST,
                    OrderError::DuplicateItem { .. }
                    | OrderError::InsufficientStock { .. }
                    | OrderError::OrderAlreadyPaid { .. }
                    | OrderError::NoChange { .. }
                    | OrderError::ConflictRetryExhausted(_) => StatusCode::CONFLICT,
                    OrderError::InsufficientPayment { .. } => StatusCode::PAYMENT_REQUIRED,
                    OrderError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
                };
                (status, err.kind())
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, kind) = self.status_and_kind();
        let message = match &self {
            ApiError::BadRequest(msg) => msg.clone(),
            ApiError::Order(err) if status == StatusCode::INTERNAL_SERVER_ERROR => {
                tracing::error!(error = %err, "internal server error");
                "Internal server error".to_string()
            }
            ApiError::Order(err) => err.to_string(),
        };

        let body = serde_json::json!({ "error": message, "kind": kind });
        (status, axum::Json(body)).into_response()
    }
}

impl From<OrderError> for ApiError {
    fn from(err: OrderError) -> Self {
        ApiError::Order(err)
    }
}
