use rusqlite::Connection;
use tracing::info;

use crate::Result;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS messages (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            type        TEXT NOT NULL,
            username    TEXT NOT NULL,
            content     TEXT NOT NULL,
            time        TEXT NOT NULL,
            channel     TEXT NOT NULL,
            created_at  TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE INDEX IF NOT EXISTS idx_messages_channel
            ON messages(channel, id);

        CREATE TABLE IF NOT EXISTS preferences (
            username        TEXT PRIMARY KEY,
            theme           TEXT NOT NULL DEFAULT 'light',
            notifications   INTEGER NOT NULL DEFAULT 1,
            language        TEXT NOT NULL DEFAULT 'en'
        );
        ",
    )?;

    info!("Database migrations complete");
    Ok(())
}
