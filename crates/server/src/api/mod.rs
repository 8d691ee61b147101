//! API handlers split by domain.

mod dispatch;
mod health;
mod settings;
mod subscriptions;

pub use dispatch::*;
pub use health::*;
pub use settings::*;
pub use subscriptions::*;

use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;
use tracing::error;

use subwatch_core::ValidationError;
use subwatch_store::StoreError;

/// JSON error body returned by every failing endpoint.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

pub type ApiError = (StatusCode, Json<ErrorResponse>);

fn api_error(status: StatusCode, message: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
}

/// Map store failures: not found → 404, validation → 422, anything else → 500.
pub(crate) fn store_error(e: StoreError) -> ApiError {
    let status = match &e {
        StoreError::NotFound(_) => StatusCode::NOT_FOUND,
        StoreError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
        StoreError::Io(_) | StoreError::Json(_) => {
            error!(error = %e, "store operation failed");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    api_error(status, e.to_string())
}

pub(crate) fn validation_error(e: ValidationError) -> ApiError {
    api_error(StatusCode::UNPROCESSABLE_ENTITY, e.to_string())
}
