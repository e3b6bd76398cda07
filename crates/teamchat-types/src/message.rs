use serde::{Deserialize, Serialize};

/// Channel used when a message does not name one.
pub const DEFAULT_CHANNEL: &str = "general";

/// Display name given to clients that connect without one.
pub const DEFAULT_USERNAME: &str = "Anonymous";

/// Wall-clock format stamped on every message the server accepts.
const TIME_FORMAT: &str = "%H:%M:%S";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    #[default]
    Chat,
    /// Server-generated notices. Never persisted.
    System,
}

impl MessageKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Chat => "chat",
            Self::System => "system",
        }
    }

    /// Parse the value stored in the `type` column.
    pub fn from_db(value: &str) -> Option<Self> {
        match value {
            "chat" => Some(Self::Chat),
            "system" => Some(Self::System),
            _ => None,
        }
    }
}

/// A chat frame as it travels over the WebSocket and through the hub.
///
/// Every field is optional on the wire; absent fields decode to their
/// defaults and are filled in by [`Message::normalize`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Message {
    #[serde(rename = "type")]
    pub kind: MessageKind,
    pub username: String,
    pub content: String,
    pub time: String,
    pub channel: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            kind: MessageKind::System,
            content: content.into(),
            time: now_hms(),
            ..Default::default()
        }
    }

    pub fn is_system(&self) -> bool {
        self.kind == MessageKind::System
    }

    /// Channel this message belongs to, falling back to [`DEFAULT_CHANNEL`].
    pub fn channel_or_default(&self) -> &str {
        if self.channel.is_empty() {
            DEFAULT_CHANNEL
        } else {
            &self.channel
        }
    }

    /// Apply server-assigned defaults and stamp the current time.
    ///
    /// `sender` is used only when the frame carried no username.
    pub fn normalize(mut self, sender: &str) -> Self {
        if self.username.is_empty() {
            self.username = sender.to_string();
        }
        if self.channel.is_empty() {
            self.channel = DEFAULT_CHANNEL.to_string();
        }
        self.time = now_hms();
        self
    }
}

/// Current local time as `HH:MM:SS`.
pub fn now_hms() -> String {
    chrono::Local::now().format(TIME_FORMAT).to_string()
}
