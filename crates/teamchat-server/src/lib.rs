pub mod app;
pub mod config;

pub use app::{PeerAddrs, router};
pub use config::ServerConfig;
