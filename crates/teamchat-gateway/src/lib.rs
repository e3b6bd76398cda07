pub mod config;
pub mod connection;
pub mod dispatcher;
pub mod error;
pub mod registry;
pub mod store;

use std::sync::Arc;

use tokio::task::JoinHandle;

pub use config::GatewayConfig;
pub use dispatcher::{Dispatcher, Joined};
pub use error::{HubClosed, SessionError};
pub use registry::{ConnectionId, ConnectionRecord, Registry};
pub use store::HistoryStore;

/// Everything a connection session needs, cheap to clone into each upgrade.
#[derive(Clone)]
pub struct Gateway {
    pub dispatcher: Dispatcher,
    pub config: Arc<GatewayConfig>,
}

impl Gateway {
    /// Spawn the dispatch hub and return the shared gateway handle together
    /// with the hub's task.
    pub fn start(store: Arc<dyn HistoryStore>, config: GatewayConfig) -> (Self, JoinHandle<()>) {
        let registry = Registry::new();
        let (dispatcher, hub) = Dispatcher::spawn(store, registry, &config);

        let gateway = Self {
            dispatcher,
            config: Arc::new(config),
        };
        (gateway, hub)
    }

    pub fn registry(&self) -> &Registry {
        self.dispatcher.registry()
    }
}
