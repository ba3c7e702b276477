//! Durable key-value storage.
//!
//! A [`DurableStorage`] is one client instance's handle onto a shared string
//! key-value area (the platform's persistent storage). Several instances can
//! be connected to the same area with [`DurableStorage::connect`]; a write by
//! one instance is announced to every *other* instance through
//! [`StorageEvents`], mirroring how browser tabs observe each other's
//! `localStorage` writes.
//!
//! Last writer wins. There is no locking between instances.
//!
//! # Backends
//!
//! - [`MemoryBackend`] - process-local, used for tests and ephemeral sessions
//! - [`FileBackend`] - one JSON file per key under a data directory

mod file;
mod memory;

pub use file::FileBackend;
pub use memory::MemoryBackend;

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use thiserror::Error;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::TryRecvError;

/// Capacity of the change-event channel shared by connected instances.
const EVENT_CHANNEL_CAPACITY: usize = 64;

static NEXT_INSTANCE_ID: AtomicU64 = AtomicU64::new(1);

/// Errors raised by a storage backend.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Filesystem I/O failed.
    #[error("storage I/O error on {key}: {source}")]
    Io {
        /// Key being accessed.
        key: String,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// The key cannot be mapped onto the backend.
    #[error("invalid storage key: {0}")]
    InvalidKey(String),
}

/// Raw persistence primitive behind [`DurableStorage`].
pub trait StorageBackend: Send + Sync + 'static {
    /// Read the value stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be read.
    fn read(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Store `value` under `key`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be written.
    fn write(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Delete the value under `key`. Deleting a missing key succeeds.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be written.
    fn delete(&self, key: &str) -> Result<(), StorageError>;
}

/// Notification that another instance changed a key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageEvent {
    /// Key that changed.
    pub key: String,
    /// New raw value, `None` when the key was removed.
    pub new_value: Option<String>,
    origin: u64,
}

/// Handle onto a shared storage area for one client instance.
///
/// Cloning keeps the same instance identity; use [`DurableStorage::connect`]
/// to attach a distinct instance to the same area.
#[derive(Clone)]
pub struct DurableStorage {
    backend: Arc<dyn StorageBackend>,
    events: broadcast::Sender<StorageEvent>,
    instance: u64,
}

impl std::fmt::Debug for DurableStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DurableStorage")
            .field("instance", &self.instance)
            .finish_non_exhaustive()
    }
}

impl DurableStorage {
    /// Create the first instance over a backend.
    #[must_use]
    pub fn new(backend: impl StorageBackend) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            backend: Arc::new(backend),
            events,
            instance: NEXT_INSTANCE_ID.fetch_add(1, Ordering::Relaxed),
        }
    }

    /// Process-local storage with nothing persisted.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::new(MemoryBackend::default())
    }

    /// Attach another instance to the same storage area.
    #[must_use]
    pub fn connect(&self) -> Self {
        Self {
            backend: Arc::clone(&self.backend),
            events: self.events.clone(),
            instance: NEXT_INSTANCE_ID.fetch_add(1, Ordering::Relaxed),
        }
    }

    /// Read the raw value under `key`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be read.
    pub fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.backend.read(key)
    }

    /// Write the raw value under `key` and announce it to other instances.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be written.
    pub fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.backend.write(key, value)?;
        self.announce(key, Some(value.to_owned()));
        Ok(())
    }

    /// Remove `key` and announce the removal to other instances.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be written.
    pub fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        self.backend.delete(key)?;
        self.announce(key, None);
        Ok(())
    }

    /// Subscribe to changes made by other instances.
    #[must_use]
    pub fn subscribe(&self) -> StorageEvents {
        StorageEvents {
            receiver: self.events.subscribe(),
            instance: self.instance,
        }
    }

    fn announce(&self, key: &str, new_value: Option<String>) {
        // No receivers is fine: nobody else is connected.
        let _ = self.events.send(StorageEvent {
            key: key.to_owned(),
            new_value,
            origin: self.instance,
        });
    }
}

/// Stream of changes made by other instances of the same storage area.
#[derive(Debug)]
pub struct StorageEvents {
    receiver: broadcast::Receiver<StorageEvent>,
    instance: u64,
}

impl StorageEvents {
    /// Return the next pending foreign event without waiting.
    pub fn try_next(&mut self) -> Option<StorageEvent> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) if event.origin == self.instance => {}
                Ok(event) => return Some(event),
                Err(TryRecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "storage change events dropped");
                }
                Err(TryRecvError::Empty | TryRecvError::Closed) => return None,
            }
        }
    }

    /// Wait for the next foreign event. Returns `None` once every storage
    /// handle has been dropped.
    pub async fn next(&mut self) -> Option<StorageEvent> {
        loop {
            match self.receiver.recv().await {
                Ok(event) if event.origin == self.instance => {}
                Ok(event) => return Some(event),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "storage change events dropped");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_set_get_remove() {
        let storage = DurableStorage::in_memory();
        assert_eq!(storage.get_item("k").unwrap(), None);

        storage.set_item("k", "v").unwrap();
        assert_eq!(storage.get_item("k").unwrap().as_deref(), Some("v"));

        storage.remove_item("k").unwrap();
        assert_eq!(storage.get_item("k").unwrap(), None);
    }

    #[test]
    fn test_connected_instances_share_values() {
        let a = DurableStorage::in_memory();
        let b = a.connect();
        a.set_item("k", "from-a").unwrap();
        assert_eq!(b.get_item("k").unwrap().as_deref(), Some("from-a"));
    }

    #[test]
    fn test_events_skip_own_writes() {
        let a = DurableStorage::in_memory();
        let b = a.connect();
        let mut a_events = a.subscribe();
        let mut b_events = b.subscribe();

        a.set_item("k", "1").unwrap();
        assert_eq!(a_events.try_next(), None);

        let event = b_events.try_next().unwrap();
        assert_eq!(event.key, "k");
        assert_eq!(event.new_value.as_deref(), Some("1"));

        a.remove_item("k").unwrap();
        assert_eq!(b_events.try_next().unwrap().new_value, None);
        assert_eq!(b_events.try_next(), None);
    }

    #[test]
    fn test_clone_keeps_instance_identity() {
        let a = DurableStorage::in_memory();
        let a2 = a.clone();
        let mut events = a.subscribe();
        a2.set_item("k", "v").unwrap();
        assert_eq!(events.try_next(), None);
    }

    #[tokio::test]
    async fn test_next_waits_for_foreign_event() {
        let a = DurableStorage::in_memory();
        let b = a.connect();
        let mut events = b.subscribe();

        a.set_item("k", "v").unwrap();
        let event = events.next().await.unwrap();
        assert_eq!(event.new_value.as_deref(), Some("v"));
    }
}
