//! Error taxonomy shared by every endpoint.
//!
//! Three failure classes reach the wire: `NotFound` (404), `BadRequest`
//! (400) and `Database` (500). A calculation with insufficient inputs is
//! deliberately *not* represented here — it is a successful no-op with an
//! explanatory message, never an error.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use tracing::error;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Referenced element, set, or plot does not exist.
    #[error("{0}")]
    NotFound(String),
    /// Zero usable fields supplied, or an enum value outside its domain.
    /// Rejected before any database write.
    #[error("{0}")]
    BadRequest(String),
    /// Lower-level database failure. The surrounding transaction is rolled
    /// back by drop; the underlying message is surfaced and logged.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl ApiError {
    pub fn element_not_found(ek_id: i64) -> Self {
        Self::NotFound(format!("Element with EK_ID {ek_id} not found"))
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

/// Wire shape of every error response: `{"detail": "..."}`.
#[derive(Debug, Serialize)]
struct ErrorBody {
    detail: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Database(e) => {
                error!(error = %e, "request failed with database error");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        let body = ErrorBody {
            detail: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}
