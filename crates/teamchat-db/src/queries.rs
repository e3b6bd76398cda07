use rusqlite::{Connection, OptionalExtension};
use teamchat_types::Message;
use teamchat_types::api::{SearchHit, UserPreferences};

use crate::models::{MessageRow, PreferenceRow};
use crate::{Database, Result};

impl Database {
    // -- Messages --

    /// Append a message to its channel's history. Returns the new row id.
    pub fn append_message(&self, msg: &Message) -> Result<i64> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO messages (type, username, content, time, channel) VALUES (?1, ?2, ?3, ?4, ?5)",
                (
                    msg.kind.as_str(),
                    &msg.username,
                    &msg.content,
                    &msg.time,
                    msg.channel_or_default(),
                ),
            )?;
            Ok(conn.last_insert_rowid())
        })
    }

    /// Delete all but the newest `keep` rows of `channel`. Returns the number
    /// of rows removed. Other channels are untouched.
    pub fn prune_channel(&self, channel: &str, keep: u32) -> Result<usize> {
        self.with_conn(|conn| {
            let removed = conn.execute(
                "DELETE FROM messages
                 WHERE channel = ?1
                   AND id NOT IN (
                       SELECT id FROM messages WHERE channel = ?1 ORDER BY id DESC LIMIT ?2
                   )",
                rusqlite::params![channel, keep],
            )?;
            Ok(removed)
        })
    }

    /// Most recent `limit` messages, oldest first. `None` reads across all
    /// channels.
    pub fn load_recent_history(&self, channel: Option<&str>, limit: u32) -> Result<Vec<Message>> {
        self.with_conn(|conn| query_recent(conn, channel, limit))
    }

    /// Newest-first messages in `channel` whose content contains `needle`.
    /// Matching is ASCII case-insensitive.
    pub fn search_messages(&self, channel: &str, needle: &str, limit: u32) -> Result<Vec<SearchHit>> {
        self.with_conn(|conn| {
            let pattern = format!("%{}%", escape_like(needle));
            let mut stmt = conn.prepare(
                "SELECT id, username, content, time FROM messages
                 WHERE channel = ?1 AND content LIKE ?2 ESCAPE '\\'
                 ORDER BY id DESC
                 LIMIT ?3",
            )?;

            let hits = stmt
                .query_map(rusqlite::params![channel, pattern, limit], |row| {
                    Ok(SearchHit {
                        id: row.get(0)?,
                        username: row.get(1)?,
                        content: row.get(2)?,
                        time: row.get(3)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            Ok(hits)
        })
    }

    pub fn count_messages(&self, channel: &str) -> Result<u64> {
        self.with_conn(|conn| {
            let count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM messages WHERE channel = ?1",
                [channel],
                |row| row.get(0),
            )?;
            Ok(count as u64)
        })
    }

    // -- Preferences --

    /// Stored preferences for `username`, or the defaults if none are saved.
    pub fn get_preferences(&self, username: &str) -> Result<UserPreferences> {
        self.with_conn(|conn| {
            let row = conn
                .query_row(
                    "SELECT theme, notifications, language FROM preferences WHERE username = ?1",
                    [username],
                    |row| {
                        Ok(PreferenceRow {
                            theme: row.get(0)?,
                            notifications: row.get(1)?,
                            language: row.get(2)?,
                        })
                    },
                )
                .optional()?;

            Ok(row.map(UserPreferences::from).unwrap_or_default())
        })
    }

    pub fn save_preferences(&self, username: &str, prefs: &UserPreferences) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO preferences (username, theme, notifications, language)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(username) DO UPDATE SET
                     theme = excluded.theme,
                     notifications = excluded.notifications,
                     language = excluded.language",
                rusqlite::params![username, prefs.theme, prefs.notifications, prefs.language],
            )?;
            Ok(())
        })
    }
}

fn query_recent(conn: &Connection, channel: Option<&str>, limit: u32) -> Result<Vec<Message>> {
    // Newest `limit` rows, flipped back to insertion order
    let sql = match channel {
        Some(_) => {
            "SELECT id, type, username, content, time, channel FROM (
                 SELECT * FROM messages WHERE channel = ?1 ORDER BY id DESC LIMIT ?2
             ) ORDER BY id ASC"
        }
        None => {
            "SELECT id, type, username, content, time, channel FROM (
                 SELECT * FROM messages ORDER BY id DESC LIMIT ?1
             ) ORDER BY id ASC"
        }
    };

    let mut stmt = conn.prepare(sql)?;
    let map_row = |row: &rusqlite::Row<'_>| {
        Ok(MessageRow {
            id: row.get(0)?,
            kind: row.get(1)?,
            username: row.get(2)?,
            content: row.get(3)?,
            time: row.get(4)?,
            channel: row.get(5)?,
        })
    };

    let rows = match channel {
        Some(channel) => stmt
            .query_map(rusqlite::params![channel, limit], map_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?,
        None => stmt
            .query_map([limit], map_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?,
    };

    Ok(rows.into_iter().map(MessageRow::into_message).collect())
}

/// Escape LIKE wildcards so the needle matches literally.
fn escape_like(needle: &str) -> String {
    let mut escaped = String::with_capacity(needle.len());
    for c in needle.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
