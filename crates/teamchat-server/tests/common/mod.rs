#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

use teamchat_api::AppStateInner;
use teamchat_db::Database;
use teamchat_gateway::{Gateway, GatewayConfig, HistoryStore};
use teamchat_server::{PeerAddrs, router};
use teamchat_types::Message;

pub type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

const RECV_TIMEOUT: Duration = Duration::from_secs(5);

pub struct TestApp {
    pub router: Router,
    pub db: Arc<Database>,
    pub gateway: Gateway,
    pub static_dir: tempfile::TempDir,
}

/// Gateway settings every test starts from.
pub fn test_config() -> GatewayConfig {
    GatewayConfig {
        host_id: "test-host".to_string(),
        ..Default::default()
    }
}

/// Fresh in-memory database, a running hub, and the full router.
pub fn test_app() -> TestApp {
    test_app_with(test_config(), |db| db as Arc<dyn HistoryStore>)
}

/// Like [`test_app`], with custom gateway settings and a hub store built
/// around the database.
pub fn test_app_with(
    config: GatewayConfig,
    wrap: impl FnOnce(Arc<Database>) -> Arc<dyn HistoryStore>,
) -> TestApp {
    let db = Arc::new(Database::open_in_memory().expect("in-memory db"));
    let (gateway, _hub) = Gateway::start(wrap(db.clone()), config);

    let static_dir = tempfile::tempdir().expect("tempdir");
    std::fs::write(static_dir.path().join("index.html"), "<h1>teamchat</h1>").expect("write index");

    let state = Arc::new(AppStateInner {
        db: db.clone(),
        gateway: gateway.clone(),
    });
    let router = router(state, static_dir.path());

    TestApp {
        router,
        db,
        gateway,
        static_dir,
    }
}

pub struct TestServer {
    pub addr: SocketAddr,
    pub app: TestApp,
}

/// Serve [`test_app`] on an ephemeral port.
pub async fn spawn_server() -> TestServer {
    serve(test_app()).await
}

/// Serve an app built by [`test_app_with`].
pub async fn spawn_server_with(
    config: GatewayConfig,
    wrap: impl FnOnce(Arc<Database>) -> Arc<dyn HistoryStore>,
) -> TestServer {
    serve(test_app_with(config, wrap)).await
}

async fn serve(app: TestApp) -> TestServer {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("local addr");

    let service = app.router.clone().into_make_service_with_connect_info::<PeerAddrs>();
    tokio::spawn(async move {
        axum::serve(listener, service).await.expect("serve");
    });

    TestServer { addr, app }
}

impl TestServer {
    /// Open a socket without sending anything.
    pub async fn open(&self) -> Client {
        let (client, _) = tokio_tungstenite::connect_async(format!("ws://{}/ws", self.addr))
            .await
            .expect("connect");
        client
    }

    /// Open a socket and send the handshake frame.
    pub async fn connect(&self, handshake: serde_json::Value) -> Client {
        let mut client = self.open().await;
        send(&mut client, handshake).await;
        client
    }

    /// Connect and consume the replayed history plus the welcome notice.
    /// Returns the history.
    pub async fn join(&self, handshake: serde_json::Value) -> (Client, Vec<Message>) {
        let mut client = self.connect(handshake).await;
        let mut history = Vec::new();
        loop {
            let msg = recv(&mut client).await;
            if msg.is_system() {
                assert!(msg.content.starts_with("Connected to test-host"), "{}", msg.content);
                return (client, history);
            }
            history.push(msg);
        }
    }

    /// Poll until the registry holds `expected` connections.
    pub async fn wait_for_online(&self, expected: usize) {
        let registry = self.app.gateway.registry();
        for _ in 0..250 {
            if registry.len() == expected {
                return;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        panic!("expected {} online, found {}", expected, registry.len());
    }
}

pub async fn send(client: &mut Client, frame: serde_json::Value) {
    client
        .send(WsMessage::text(frame.to_string()))
        .await
        .expect("send");
}

/// Next chat frame, skipping control frames.
pub async fn recv(client: &mut Client) -> Message {
    loop {
        let frame = tokio::time::timeout(RECV_TIMEOUT, client.next())
            .await
            .expect("timed out waiting for frame")
            .expect("stream ended")
            .expect("websocket error");

        match frame {
            WsMessage::Text(text) => return serde_json::from_str(text.as_str()).expect("decode frame"),
            WsMessage::Ping(_) | WsMessage::Pong(_) => continue,
            other => panic!("unexpected frame: {:?}", other),
        }
    }
}

/// True once the server has closed this socket.
pub async fn closed(client: &mut Client) -> bool {
    loop {
        match tokio::time::timeout(RECV_TIMEOUT, client.next()).await {
            Err(_) => return false,
            Ok(None) | Ok(Some(Err(_))) | Ok(Some(Ok(WsMessage::Close(_)))) => return true,
            Ok(Some(Ok(_))) => continue,
        }
    }
}
