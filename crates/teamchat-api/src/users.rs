use axum::{Json, extract::State};

use teamchat_types::api::{OnlineUser, UsersResponse};

use crate::state::AppState;

/// GET /api/users — who is connected right now.
pub async fn list_users(State(state): State<AppState>) -> Json<UsersResponse> {
    let users: Vec<OnlineUser> = state
        .gateway
        .registry()
        .snapshot()
        .into_iter()
        .map(|record| OnlineUser {
            username: record.display_name,
            remote_addr: record.remote_addr.to_string(),
            local_addr: record.local_addr.to_string(),
        })
        .collect();

    Json(UsersResponse {
        count: users.len(),
        users,
    })
}
