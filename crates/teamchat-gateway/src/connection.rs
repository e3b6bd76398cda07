use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use axum::extract::ws::{Message as WsMessage, Utf8Bytes, WebSocket};
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use teamchat_types::{DEFAULT_USERNAME, Message};

use crate::Gateway;
use crate::config::GatewayConfig;
use crate::dispatcher::{Dispatcher, Joined};
use crate::error::SessionError;
use crate::registry::ConnectionRecord;

type WsSink = SplitSink<WebSocket, WsMessage>;
type WsStream = SplitStream<WebSocket>;

/// Drive one client from handshake to close.
///
/// The first frame names the client and may carry a first message. The hub
/// registers the client and hands back its channel's recent history, which is
/// replayed with a welcome notice. Every frame it sends after that is stamped
/// and queued to the hub.
/// Leaving for any reason unregisters the connection exactly once.
pub async fn handle_connection(
    socket: WebSocket,
    gateway: Gateway,
    remote_addr: SocketAddr,
    local_addr: SocketAddr,
) {
    let config = gateway.config.clone();
    let (sender, mut receiver) = socket.split();

    // Connecting: one handshake frame, or drop without registering
    let hello = match read_handshake(&mut receiver, config.handshake_timeout).await {
        Ok(hello) => hello,
        Err(e) => {
            warn!("Handshake from {} failed: {}", remote_addr, e);
            return;
        }
    };

    let display_name = if hello.username.is_empty() {
        DEFAULT_USERNAME.to_string()
    } else {
        hello.username.clone()
    };

    let conn_id = Uuid::new_v4();
    let (outbox, outbox_rx) = mpsc::channel(config.outbox_capacity.max(1));
    let record = ConnectionRecord {
        id: conn_id,
        display_name: display_name.clone(),
        remote_addr,
        local_addr,
    };

    let joined = match gateway.dispatcher.join(record, outbox, hello.channel_or_default()).await {
        Ok(joined) => joined,
        Err(e) => {
            warn!("{} from {} could not join: {}", display_name, remote_addr, e);
            return;
        }
    };

    info!("{} ({}) connected from {}", display_name, conn_id, remote_addr);

    // Active
    let outcome = run_session(&gateway, sender, receiver, outbox_rx, joined, hello, &display_name).await;

    // Closed
    match outcome {
        Ok(()) => {}
        Err(SessionError::Decode(e)) => warn!("{} ({}) sent a malformed frame: {}", display_name, conn_id, e),
        Err(e) => debug!("{} ({}) session ended: {}", display_name, conn_id, e),
    }

    if gateway.registry().unregister(conn_id).is_some() {
        info!("{} ({}) disconnected", display_name, conn_id);
    } else {
        info!("{} ({}) disconnected (dropped by hub)", display_name, conn_id);
    }
}

/// Heartbeat bookkeeping shared by a session's reader and writer.
struct Liveness {
    pong_received: AtomicBool,
    /// Set while the reader waits on a full hub queue and cannot see Pongs.
    waiting_on_hub: AtomicBool,
}

impl Liveness {
    fn new() -> Self {
        Self {
            pong_received: AtomicBool::new(true),
            waiting_on_hub: AtomicBool::new(false),
        }
    }

    /// Whether the peer counts as alive for this heartbeat tick. Clears the
    /// pong flag for the next one.
    fn check(&self) -> bool {
        let pong = self.pong_received.swap(false, Ordering::AcqRel);
        pong || self.waiting_on_hub.load(Ordering::Acquire)
    }
}

async fn run_session(
    gateway: &Gateway,
    mut sender: WsSink,
    receiver: WsStream,
    outbox_rx: mpsc::Receiver<Utf8Bytes>,
    joined: Joined,
    hello: Message,
    display_name: &str,
) -> Result<(), SessionError> {
    greet(&mut sender, &gateway.config, joined).await?;

    if !hello.content.is_empty() {
        gateway.dispatcher.enqueue(hello.normalize(display_name)).await?;
    }

    let liveness = Arc::new(Liveness::new());

    let mut send_task = tokio::spawn(write_loop(
        sender,
        outbox_rx,
        liveness.clone(),
        gateway.config.write_timeout,
        gateway.config.heartbeat_interval,
    ));
    let mut recv_task = tokio::spawn(read_loop(
        receiver,
        gateway.dispatcher.clone(),
        display_name.to_string(),
        liveness,
    ));

    let joined = tokio::select! {
        result = &mut send_task => {
            recv_task.abort();
            result
        }
        result = &mut recv_task => {
            send_task.abort();
            result
        }
    };

    match joined {
        Ok(outcome) => outcome,
        Err(e) => {
            warn!("Session task failed: {}", e);
            Ok(())
        }
    }
}

/// Wait for the first frame and decode it as a [`Message`].
async fn read_handshake(receiver: &mut WsStream, timeout: Duration) -> Result<Message, SessionError> {
    tokio::time::timeout(timeout, next_message(receiver))
        .await
        .map_err(|_| SessionError::HandshakeTimeout)?
}

async fn next_message(receiver: &mut WsStream) -> Result<Message, SessionError> {
    while let Some(frame) = receiver.next().await {
        match frame? {
            WsMessage::Text(text) => return Ok(serde_json::from_str(text.as_str())?),
            WsMessage::Binary(data) => return Ok(serde_json::from_slice(&data)?),
            WsMessage::Close(_) => break,
            WsMessage::Ping(_) | WsMessage::Pong(_) => {}
        }
    }
    Err(SessionError::ClosedBeforeHandshake)
}

/// Replay the channel's history, then the welcome notice. Sent straight to
/// this socket, not through the hub.
async fn greet(sender: &mut WsSink, config: &GatewayConfig, joined: Joined) -> Result<(), SessionError> {
    for msg in &joined.history {
        send_json(sender, msg, config.write_timeout).await?;
    }

    let welcome = Message::system(format!(
        "Connected to {} (v{}) • {} users online",
        config.host_id,
        env!("CARGO_PKG_VERSION"),
        joined.online
    ));
    send_json(sender, &welcome, config.write_timeout).await
}

/// Forward hub frames to the socket and keep the heartbeat going. Returns
/// when the hub drops this connection's outbox or a write fails.
async fn write_loop(
    mut sender: WsSink,
    mut outbox: mpsc::Receiver<Utf8Bytes>,
    liveness: Arc<Liveness>,
    write_timeout: Duration,
    heartbeat_interval: Duration,
) -> Result<(), SessionError> {
    let mut heartbeat = tokio::time::interval(heartbeat_interval);
    heartbeat.tick().await;
    let mut missed_heartbeats: u8 = 0;

    loop {
        tokio::select! {
            frame = outbox.recv() => {
                let Some(frame) = frame else {
                    // Unregistered by the hub
                    let _ = send_frame(&mut sender, WsMessage::Close(None), write_timeout).await;
                    return Ok(());
                };
                send_frame(&mut sender, WsMessage::Text(frame), write_timeout).await?;
            }
            _ = heartbeat.tick() => {
                if liveness.check() {
                    missed_heartbeats = 0;
                } else {
                    missed_heartbeats += 1;
                    if missed_heartbeats >= 2 {
                        return Err(SessionError::HeartbeatTimeout(missed_heartbeats));
                    }
                }
                send_frame(&mut sender, WsMessage::Ping(Default::default()), write_timeout).await?;
            }
        }
    }
}

/// Stamp each inbound frame and queue it to the hub.
async fn read_loop(
    mut receiver: WsStream,
    dispatcher: Dispatcher,
    display_name: String,
    liveness: Arc<Liveness>,
) -> Result<(), SessionError> {
    while let Some(frame) = receiver.next().await {
        let msg: Message = match frame? {
            WsMessage::Text(text) => serde_json::from_str(text.as_str())?,
            WsMessage::Binary(data) => serde_json::from_slice(&data)?,
            WsMessage::Pong(_) => {
                liveness.pong_received.store(true, Ordering::Release);
                continue;
            }
            WsMessage::Ping(_) => continue,
            WsMessage::Close(_) => break,
        };

        // Backpressure from the hub is not a dead peer
        liveness.waiting_on_hub.store(true, Ordering::Release);
        let queued = dispatcher.enqueue(msg.normalize(&display_name)).await;
        liveness.waiting_on_hub.store(false, Ordering::Release);
        queued?;
    }

    Ok(())
}

async fn send_json(sender: &mut WsSink, msg: &Message, timeout: Duration) -> Result<(), SessionError> {
    let text = serde_json::to_string(msg)?;
    send_frame(sender, WsMessage::Text(text.into()), timeout).await
}

async fn send_frame(sender: &mut WsSink, frame: WsMessage, timeout: Duration) -> Result<(), SessionError> {
    tokio::time::timeout(timeout, sender.send(frame))
        .await
        .map_err(|_| SessionError::WriteTimeout)??;
    Ok(())
}
