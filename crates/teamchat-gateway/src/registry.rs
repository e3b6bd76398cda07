use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use axum::extract::ws::Utf8Bytes;
use tokio::sync::mpsc;
use uuid::Uuid;

pub type ConnectionId = Uuid;

/// Serialized frames queued for one connection's writer.
pub type Outbox = mpsc::Sender<Utf8Bytes>;

/// Identity of a live connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionRecord {
    pub id: ConnectionId,
    pub display_name: String,
    pub remote_addr: SocketAddr,
    pub local_addr: SocketAddr,
}

struct Entry {
    record: ConnectionRecord,
    outbox: Outbox,
}

/// Live connections keyed by handle.
///
/// The registry never owns a socket. It holds each session's outbox sender;
/// removing an entry drops that sender, which ends the session's writer.
/// The lock is only held for map updates and copies, never across I/O.
#[derive(Clone, Default)]
pub struct Registry {
    inner: Arc<Mutex<HashMap<ConnectionId, Entry>>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<ConnectionId, Entry>> {
        // Entries are plain data, so a panic mid-update cannot leave one half-written
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Insert a connection. Returns false and leaves the existing entry in
    /// place if the handle is already registered.
    pub fn register(&self, record: ConnectionRecord, outbox: Outbox) -> bool {
        let mut entries = self.lock();
        if entries.contains_key(&record.id) {
            return false;
        }
        entries.insert(record.id, Entry { record, outbox });
        true
    }

    /// Remove a connection. Only the first call for a handle returns the record.
    pub fn unregister(&self, id: ConnectionId) -> Option<ConnectionRecord> {
        self.lock().remove(&id).map(|entry| entry.record)
    }

    /// Point-in-time copy of every record.
    pub fn snapshot(&self) -> Vec<ConnectionRecord> {
        self.lock().values().map(|entry| entry.record.clone()).collect()
    }

    /// Point-in-time copy of every outbox, for fan-out.
    pub(crate) fn recipients(&self) -> Vec<(ConnectionId, Outbox)> {
        self.lock()
            .iter()
            .map(|(id, entry)| (*id, entry.outbox.clone()))
            .collect()
    }

    pub fn contains(&self, id: ConnectionId) -> bool {
        self.lock().contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(name: &str) -> ConnectionRecord {
        ConnectionRecord {
            id: Uuid::new_v4(),
            display_name: name.to_string(),
            remote_addr: "127.0.0.1:50000".parse().unwrap(),
            local_addr: "127.0.0.1:8080".parse().unwrap(),
        }
    }

    #[test]
    fn register_ignores_duplicate_handle() {
        let registry = Registry::new();
        let (tx, _rx) = mpsc::channel(1);
        let alice = record("alice");

        assert!(registry.register(alice.clone(), tx.clone()));

        let mut imposter = alice.clone();
        imposter.display_name = "mallory".to_string();
        assert!(!registry.register(imposter, tx));

        assert_eq!(registry.snapshot(), vec![alice]);
    }

    #[test]
    fn duplicate_display_names_are_allowed() {
        let registry = Registry::new();
        let (tx, _rx) = mpsc::channel(1);

        assert!(registry.register(record("Anonymous"), tx.clone()));
        assert!(registry.register(record("Anonymous"), tx));
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn unregister_is_idempotent() {
        let registry = Registry::new();
        let (tx, _rx) = mpsc::channel(1);
        let alice = record("alice");
        registry.register(alice.clone(), tx);

        assert_eq!(registry.unregister(alice.id), Some(alice.clone()));
        assert_eq!(registry.unregister(alice.id), None);
        assert!(!registry.contains(alice.id));
        assert!(registry.is_empty());
    }

    #[test]
    fn snapshot_is_detached_from_later_changes() {
        let registry = Registry::new();
        let (tx, _rx) = mpsc::channel(1);
        let alice = record("alice");
        registry.register(alice.clone(), tx.clone());

        let snapshot = registry.snapshot();
        registry.register(record("bob"), tx);
        registry.unregister(alice.id);

        assert_eq!(snapshot, vec![alice]);
        assert_eq!(registry.len(), 1);
    }

    #[tokio::test]
    async fn unregister_closes_outbox() {
        let registry = Registry::new();
        let (tx, mut rx) = mpsc::channel(1);
        let alice = record("alice");
        registry.register(alice.clone(), tx);

        registry.unregister(alice.id);
        assert!(rx.recv().await.is_none());
    }
}
