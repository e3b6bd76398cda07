use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};

use teamchat_gateway::GatewayConfig;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub db_path: PathBuf,
    /// Directory holding `index.html`.
    pub static_dir: PathBuf,
    pub gateway: GatewayConfig,
}

impl ServerConfig {
    /// Read configuration from the environment, falling back to defaults.
    pub fn from_env() -> Result<Self> {
        let defaults = GatewayConfig::default();

        let gateway = GatewayConfig {
            host_id: env_string("HOSTNAME", &defaults.host_id),
            queue_capacity: env_parse("TEAMCHAT_QUEUE_CAPACITY", defaults.queue_capacity)?,
            history_limit: env_parse("TEAMCHAT_HISTORY_LIMIT", defaults.history_limit)?,
            outbox_capacity: env_parse("TEAMCHAT_OUTBOX_CAPACITY", defaults.outbox_capacity)?,
            handshake_timeout: env_secs("TEAMCHAT_HANDSHAKE_TIMEOUT_SECS", defaults.handshake_timeout)?,
            write_timeout: env_secs("TEAMCHAT_WRITE_TIMEOUT_SECS", defaults.write_timeout)?,
            heartbeat_interval: env_secs("TEAMCHAT_HEARTBEAT_SECS", defaults.heartbeat_interval)?,
        };

        Ok(Self {
            host: env_string("TEAMCHAT_HOST", "0.0.0.0"),
            port: env_parse("TEAMCHAT_PORT", 8080)?,
            db_path: env_string("TEAMCHAT_DB_PATH", "teamchat.db").into(),
            static_dir: env_string("TEAMCHAT_STATIC_DIR", "static").into(),
            gateway,
        })
    }
}

fn env_string(key: &str, default: &str) -> String {
    std::env::var(key)
        .ok()
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn env_parse<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) if !raw.is_empty() => raw
            .parse()
            .with_context(|| format!("{} has invalid value '{}'", key, raw)),
        _ => Ok(default),
    }
}

fn env_secs(key: &str, default: Duration) -> Result<Duration> {
    let secs = env_parse(key, default.as_secs())?;
    Ok(Duration::from_secs(secs.max(1)))
}
