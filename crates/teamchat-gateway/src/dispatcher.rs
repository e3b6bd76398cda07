use std::sync::Arc;

use axum::extract::ws::Utf8Bytes;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, trace, warn};

use teamchat_types::Message;

use crate::config::GatewayConfig;
use crate::error::HubClosed;
use crate::registry::{ConnectionRecord, Outbox, Registry};
use crate::store::HistoryStore;

/// What a joining session gets back from the hub.
#[derive(Debug)]
pub struct Joined {
    /// Channel history up to the moment of registration, oldest first.
    pub history: Vec<Message>,
    /// Live connections, this one included.
    pub online: usize,
}

/// Work items for the hub, handled strictly in queue order.
enum Inbound {
    Publish(Message),
    Join {
        record: ConnectionRecord,
        outbox: Outbox,
        channel: String,
        reply: oneshot::Sender<Joined>,
    },
}

/// Handle to the dispatch hub. Every inbound message, from a socket or the
/// HTTP inject endpoint, goes through [`Dispatcher::enqueue`].
#[derive(Clone)]
pub struct Dispatcher {
    tx: mpsc::Sender<Inbound>,
    registry: Registry,
}

impl Dispatcher {
    /// Start the hub worker over `registry`.
    pub fn spawn(
        store: Arc<dyn HistoryStore>,
        registry: Registry,
        config: &GatewayConfig,
    ) -> (Self, JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(config.queue_capacity.max(1));

        let hub = Hub {
            rx,
            store,
            registry: registry.clone(),
            retention: config.history_limit,
        };
        let handle = tokio::spawn(hub.run());

        (Self { tx, registry }, handle)
    }

    /// Queue a message for persistence and fan-out. Waits while the queue is
    /// full.
    pub async fn enqueue(&self, msg: Message) -> Result<(), HubClosed> {
        self.tx.send(Inbound::Publish(msg)).await.map_err(|_| HubClosed)
    }

    /// Register a connection and load its channel history in one hub step.
    ///
    /// Every message the hub handled before the join is in the returned
    /// history; every later one goes to `outbox`. None is in both.
    pub async fn join(
        &self,
        record: ConnectionRecord,
        outbox: Outbox,
        channel: &str,
    ) -> Result<Joined, HubClosed> {
        let (reply, joined) = oneshot::channel();
        self.tx
            .send(Inbound::Join {
                record,
                outbox,
                channel: channel.to_string(),
                reply,
            })
            .await
            .map_err(|_| HubClosed)?;
        joined.await.map_err(|_| HubClosed)
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }
}

/// The single consumer of the inbound queue and the only writer to history.
struct Hub {
    rx: mpsc::Receiver<Inbound>,
    store: Arc<dyn HistoryStore>,
    registry: Registry,
    retention: u32,
}

impl Hub {
    async fn run(mut self) {
        info!("Dispatch hub started");

        while let Some(item) = self.rx.recv().await {
            match item {
                Inbound::Publish(msg) => {
                    if !msg.is_system() {
                        persist(self.store.clone(), msg.clone(), self.retention).await;
                    }
                    self.fan_out(&msg);
                }
                Inbound::Join {
                    record,
                    outbox,
                    channel,
                    reply,
                } => self.join(record, outbox, channel, reply).await,
            }
        }

        info!("Dispatch hub stopped: all senders dropped");
    }

    async fn join(
        &self,
        record: ConnectionRecord,
        outbox: Outbox,
        channel: String,
        reply: oneshot::Sender<Joined>,
    ) {
        let history = load_history(self.store.clone(), channel, self.retention).await;

        let id = record.id;
        if !self.registry.register(record, outbox) {
            warn!("Connection {} is already registered", id);
            return;
        }

        let joined = Joined {
            history,
            online: self.registry.len(),
        };
        if reply.send(joined).is_err() {
            // Session gave up before the reply
            self.registry.unregister(id);
        }
    }

    /// Deliver to every registered connection. A recipient that cannot take
    /// the frame is unregistered; the rest still get it.
    fn fan_out(&self, msg: &Message) {
        let frame = match serde_json::to_string(msg) {
            Ok(json) => Utf8Bytes::from(json),
            Err(e) => {
                error!("Failed to encode message: {}", e);
                return;
            }
        };

        for (id, outbox) in self.registry.recipients() {
            match outbox.try_send(frame.clone()) {
                Ok(()) => {}
                Err(TrySendError::Full(_)) => {
                    if let Some(record) = self.registry.unregister(id) {
                        warn!("{} ({}) fell behind, dropping connection", record.display_name, id);
                    }
                }
                Err(TrySendError::Closed(_)) => {
                    if let Some(record) = self.registry.unregister(id) {
                        debug!("{} ({}) writer gone, unregistered", record.display_name, id);
                    }
                }
            }
        }
    }
}

/// Recent history for a joining session. A failed load yields an empty replay.
async fn load_history(store: Arc<dyn HistoryStore>, channel: String, limit: u32) -> Vec<Message> {
    match tokio::task::spawn_blocking(move || store.load_recent_history(Some(&channel), limit)).await {
        Ok(Ok(history)) => history,
        Ok(Err(e)) => {
            warn!("Failed to load message history: {}", e);
            Vec::new()
        }
        Err(e) => {
            error!("History task failed: {}", e);
            Vec::new()
        }
    }
}

/// Append then prune. Failures are logged and never block delivery.
async fn persist(store: Arc<dyn HistoryStore>, msg: Message, keep: u32) {
    let result = tokio::task::spawn_blocking(move || {
        let channel = msg.channel_or_default();
        store.append_message(&msg)?;
        store.prune_channel(channel, keep)
    })
    .await;

    match result {
        Ok(Ok(removed)) => {
            if removed > 0 {
                trace!("Pruned {} old messages", removed);
            }
        }
        Ok(Err(e)) => warn!("Failed to save message to database: {}", e),
        Err(e) => error!("Persist task failed: {}", e),
    }
}
