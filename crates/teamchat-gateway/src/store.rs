use teamchat_db::{Database, StorageError};
use teamchat_types::Message;

/// The slice of the persistence store the gateway depends on.
///
/// Calls are blocking; the gateway runs them on the blocking pool.
pub trait HistoryStore: Send + Sync + 'static {
    fn append_message(&self, msg: &Message) -> Result<i64, StorageError>;

    fn prune_channel(&self, channel: &str, keep: u32) -> Result<usize, StorageError>;

    fn load_recent_history(&self, channel: Option<&str>, limit: u32) -> Result<Vec<Message>, StorageError>;
}

impl HistoryStore for Database {
    fn append_message(&self, msg: &Message) -> Result<i64, StorageError> {
        Database::append_message(self, msg)
    }

    fn prune_channel(&self, channel: &str, keep: u32) -> Result<usize, StorageError> {
        Database::prune_channel(self, channel, keep)
    }

    fn load_recent_history(&self, channel: Option<&str>, limit: u32) -> Result<Vec<Message>, StorageError> {
        Database::load_recent_history(self, channel, limit)
    }
}
