use std::net::SocketAddr;
use std::sync::Arc;

use tracing::{info, warn};

use teamchat_api::AppStateInner;
use teamchat_db::Database;
use teamchat_gateway::{Gateway, HistoryStore};
use teamchat_server::{PeerAddrs, ServerConfig, router};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "teamchat=debug,teamchat_server=debug,teamchat_gateway=debug,teamchat_api=debug,teamchat_db=info,tower_http=debug"
                    .into()
            }),
        )
        .init();

    let config = ServerConfig::from_env()?;

    // Init database
    let db = Arc::new(Database::open(&config.db_path)?);

    // Hub + registry
    let store: Arc<dyn HistoryStore> = db.clone();
    let (gateway, hub) = Gateway::start(store, config.gateway.clone());

    let state = Arc::new(AppStateInner {
        db,
        gateway,
    });
    let app = router(state, &config.static_dir);

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Teamchat server listening on {}", listener.local_addr()?);
    info!(
        "Hub queue {} slots, history {} per channel",
        config.gateway.queue_capacity, config.gateway.history_limit
    );

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<PeerAddrs>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    hub.abort();
    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();
    #[cfg(unix)]
    {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = ctrl_c => info!("Received Ctrl+C, shutting down..."),
                    _ = sigterm.recv() => info!("Received SIGTERM, shutting down..."),
                }
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                ctrl_c.await.ok();
                info!("Received Ctrl+C, shutting down...");
            }
        }
    }
    #[cfg(not(unix))]
    {
        ctrl_c.await.ok();
        info!("Received Ctrl+C, shutting down...");
    }
}
