use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use petmind_core::aggregation::AggregateError;
use petmind_core::memory::{MemoryError, StorageErrorKind};
use serde::Serialize;
use utoipa::ToSchema;

/// Error body returned by every endpoint
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    pub error: String,
}

/// Handler error carrying its HTTP status
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }
}

impl From<MemoryError> for ApiError {
    fn from(err: MemoryError) -> Self {
        let status = match &err {
            MemoryError::InvalidArgument(_) => StatusCode::BAD_REQUEST,
            MemoryError::Storage {
                kind: StorageErrorKind::Malformed,
                ..
            } => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::SERVICE_UNAVAILABLE,
        };
        Self {
            status,
            message: err.to_string(),
        }
    }
}

impl From<AggregateError> for ApiError {
    fn from(err: AggregateError) -> Self {
        let status = match &err {
            AggregateError::InvalidArgument(_) => StatusCode::BAD_REQUEST,
            AggregateError::AllSourcesFailed(_) => StatusCode::SERVICE_UNAVAILABLE,
            AggregateError::TimedOut(_) => StatusCode::GATEWAY_TIMEOUT,
        };
        Self {
            status,
            message: err.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            tracing::warn!("Request failed ({}): {}", self.status, self.message);
        }
        (
            self.status,
            Json(ErrorBody {
                error: self.message,
            }),
        )
            .into_response()
    }
}
