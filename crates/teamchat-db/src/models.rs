//! Database row types. These map directly to SQLite rows and stay
//! independent of the wire types in teamchat-types.

use teamchat_types::{Message, MessageKind};
use tracing::warn;

pub struct MessageRow {
    pub id: i64,
    pub kind: String,
    pub username: String,
    pub content: String,
    pub time: String,
    pub channel: String,
}

impl MessageRow {
    pub fn into_message(self) -> Message {
        let kind = MessageKind::from_db(&self.kind).unwrap_or_else(|| {
            warn!("Unknown message type '{}' on row {}", self.kind, self.id);
            MessageKind::Chat
        });

        Message {
            kind,
            username: self.username,
            content: self.content,
            time: self.time,
            channel: self.channel,
        }
    }
}

pub struct PreferenceRow {
    pub theme: String,
    pub notifications: bool,
    pub language: String,
}

impl From<PreferenceRow> for teamchat_types::api::UserPreferences {
    fn from(row: PreferenceRow) -> Self {
        Self {
            theme: row.theme,
            notifications: row.notifications,
            language: row.language,
        }
    }
}
