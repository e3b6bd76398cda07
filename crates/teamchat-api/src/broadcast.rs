use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
};
use tracing::debug;

use teamchat_types::{DEFAULT_USERNAME, Message};

use crate::error::ApiError;
use crate::state::AppState;

/// POST /api/broadcast — inject a message as if a client had sent it.
pub async fn inject(
    State(state): State<AppState>,
    body: Result<Json<Message>, JsonRejection>,
) -> Result<StatusCode, ApiError> {
    let Json(msg) = body.map_err(|e| ApiError::Validation(e.body_text()))?;
    let msg = msg.normalize(DEFAULT_USERNAME);

    debug!("Injecting {} message into #{}", msg.kind.as_str(), msg.channel);

    state
        .gateway
        .dispatcher
        .enqueue(msg)
        .await
        .map_err(|_| ApiError::HubUnavailable)?;

    Ok(StatusCode::OK)
}
