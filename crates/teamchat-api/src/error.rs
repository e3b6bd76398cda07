use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;
use tracing::error;

use teamchat_db::StorageError;

#[derive(Debug, Error)]
pub enum ApiError {
    /// A required parameter is missing or the body is malformed.
    #[error("{0}")]
    Validation(String),

    #[error("storage: {0}")]
    Storage(#[from] StorageError),

    #[error("dispatch hub unavailable")]
    HubUnavailable,

    #[error("internal error")]
    Internal,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Storage(e) => {
                error!("Database error: {}", e);
                StatusCode::INTERNAL_SERVER_ERROR
            }
            Self::HubUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            Self::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = match &self {
            Self::Storage(_) => "Database error".to_string(),
            other => other.to_string(),
        };

        (status, body).into_response()
    }
}
