use axum::{
    Json,
    extract::{Query, State},
};

use teamchat_types::DEFAULT_CHANNEL;
use teamchat_types::api::{SearchQuery, SearchResponse};

use crate::error::ApiError;
use crate::state::AppState;

const SEARCH_LIMIT: u32 = 10;

/// GET /api/search?q=..&channel=..
pub async fn search(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<SearchResponse>, ApiError> {
    if query.q.is_empty() {
        return Err(ApiError::Validation("Query parameter 'q' is required".into()));
    }

    let channel = if query.channel.is_empty() {
        DEFAULT_CHANNEL.to_string()
    } else {
        query.channel
    };
    let needle = query.q;

    let results = state
        .with_db(move |db| db.search_messages(&channel, &needle, SEARCH_LIMIT))
        .await?;

    Ok(Json(SearchResponse {
        count: results.len(),
        results,
    }))
}
