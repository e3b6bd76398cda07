use std::net::SocketAddr;
use std::path::Path;

use axum::{
    Router,
    extract::{ConnectInfo, State, WebSocketUpgrade, connect_info::Connected},
    response::IntoResponse,
    routing::{get, post},
    serve::IncomingStream,
};
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeFile;
use tower_http::trace::TraceLayer;

use teamchat_api::{AppState, broadcast, preferences, search, users};
use teamchat_gateway::connection;

/// Both ends of an accepted TCP connection.
#[derive(Debug, Clone, Copy)]
pub struct PeerAddrs {
    pub remote: SocketAddr,
    pub local: SocketAddr,
}

impl Connected<IncomingStream<'_, TcpListener>> for PeerAddrs {
    fn connect_info(stream: IncomingStream<'_, TcpListener>) -> Self {
        let remote = *stream.remote_addr();
        let local = stream
            .io()
            .local_addr()
            .unwrap_or_else(|_| SocketAddr::from(([0, 0, 0, 0], 0)));
        Self { remote, local }
    }
}

/// Assemble every route. Serve with
/// `into_make_service_with_connect_info::<PeerAddrs>()` so `/ws` can see
/// connection addresses.
pub fn router(state: AppState, static_dir: &Path) -> Router {
    let api_routes = Router::new()
        .route("/api/users", get(users::list_users))
        .route("/api/broadcast", post(broadcast::inject))
        .route("/api/search", get(search::search))
        .route(
            "/api/preferences",
            get(preferences::get_preferences).post(preferences::save_preferences),
        )
        .with_state(state.clone());

    let ws_route = Router::new()
        .route("/ws", get(ws_upgrade))
        .with_state(state);

    Router::new()
        .route_service("/", ServeFile::new(static_dir.join("index.html")))
        .merge(api_routes)
        .merge(ws_route)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

async fn ws_upgrade(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<PeerAddrs>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    let gateway = state.gateway.clone();
    ws.on_upgrade(move |socket| connection::handle_connection(socket, gateway, peer.remote, peer.local))
}
