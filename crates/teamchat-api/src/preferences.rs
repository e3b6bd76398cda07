use axum::{
    Json,
    extract::{Query, State, rejection::JsonRejection},
    http::StatusCode,
};
use tracing::info;

use teamchat_types::api::{PreferencesQuery, UserPreferences};

use crate::error::ApiError;
use crate::state::AppState;

fn require_username(query: PreferencesQuery) -> Result<String, ApiError> {
    if query.username.is_empty() {
        return Err(ApiError::Validation("Username required".into()));
    }
    Ok(query.username)
}

/// GET /api/preferences?username=..
pub async fn get_preferences(
    State(state): State<AppState>,
    Query(query): Query<PreferencesQuery>,
) -> Result<Json<UserPreferences>, ApiError> {
    let username = require_username(query)?;
    let prefs = state.with_db(move |db| db.get_preferences(&username)).await?;
    Ok(Json(prefs))
}

/// POST /api/preferences?username=..
pub async fn save_preferences(
    State(state): State<AppState>,
    Query(query): Query<PreferencesQuery>,
    body: Result<Json<UserPreferences>, JsonRejection>,
) -> Result<StatusCode, ApiError> {
    let username = require_username(query)?;
    let Json(prefs) = body.map_err(|e| ApiError::Validation(e.body_text()))?;

    info!("Saving preferences for {}", username);
    state
        .with_db(move |db| db.save_preferences(&username, &prefs))
        .await?;

    Ok(StatusCode::OK)
}
