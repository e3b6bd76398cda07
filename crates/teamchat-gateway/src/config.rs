use std::time::Duration;

use teamchat_db::HISTORY_RETENTION;

/// Tuning knobs for the hub and connection sessions.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Host identifier shown in the welcome notice.
    pub host_id: String,
    /// Slots in the hub's inbound queue. Producers wait when it is full.
    pub queue_capacity: usize,
    /// Messages replayed on join, and rows kept per channel.
    pub history_limit: u32,
    /// Frames buffered per connection before the hub evicts it as too slow.
    pub outbox_capacity: usize,
    pub handshake_timeout: Duration,
    pub write_timeout: Duration,
    /// Ping interval. Two unanswered pings drop the connection.
    pub heartbeat_interval: Duration,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host_id: "teamchat-prod".to_string(),
            queue_capacity: 100,
            history_limit: HISTORY_RETENTION,
            outbox_capacity: 256,
            handshake_timeout: Duration::from_secs(10),
            write_timeout: Duration::from_secs(10),
            heartbeat_interval: Duration::from_secs(15),
        }
    }
}
