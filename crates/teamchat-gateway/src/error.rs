use thiserror::Error;

/// The hub worker has stopped and no longer accepts messages.
#[derive(Debug, Error)]
#[error("dispatch hub is not running")]
pub struct HubClosed;

/// Why a connection session ended. Each variant terminates only the session
/// that produced it.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("transport: {0}")]
    Transport(#[from] axum::Error),

    #[error("malformed frame: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("no handshake frame before deadline")]
    HandshakeTimeout,

    #[error("connection closed before handshake")]
    ClosedBeforeHandshake,

    #[error("write deadline exceeded")]
    WriteTimeout,

    #[error("heartbeat timeout (missed {0} pongs)")]
    HeartbeatTimeout(u8),

    #[error(transparent)]
    HubClosed(#[from] HubClosed),
}
