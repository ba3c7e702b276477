//! Typed values persisted in [`DurableStorage`].
//!
//! [`DurableValue`] keeps an in-memory copy of one JSON-encoded key and
//! writes through to storage on every change. Reads first drain change
//! events from other storage instances so a value written elsewhere is
//! adopted the next time it is read.

use std::sync::{Mutex, MutexGuard, PoisonError};

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::storage::{DurableStorage, StorageEvents};

/// What was found in storage when the value was loaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Hydration {
    /// Nothing stored; the initial value is in use.
    Missing,
    /// A stored value was decoded.
    Loaded,
    /// A stored value could not be decoded; the initial value is in use.
    Corrupt,
}

/// A typed value mirrored to one storage key.
///
/// Every failure is absorbed: unreadable or undecodable values fall back to
/// the initial value and failed writes are logged. Callers never see an error.
pub struct DurableValue<T> {
    storage: DurableStorage,
    key: String,
    initial: T,
    hydration: Hydration,
    inner: Mutex<Inner<T>>,
}

struct Inner<T> {
    value: T,
    events: StorageEvents,
}

impl<T> std::fmt::Debug for DurableValue<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DurableValue")
            .field("key", &self.key)
            .field("hydration", &self.hydration)
            .finish_non_exhaustive()
    }
}

impl<T> DurableValue<T>
where
    T: Serialize + DeserializeOwned + Clone + PartialEq,
{
    /// Load `key` from storage, falling back to `initial`.
    pub fn load(storage: &DurableStorage, key: impl Into<String>, initial: T) -> Self {
        let key = key.into();
        // Subscribe before reading so a concurrent write is not missed.
        let events = storage.subscribe();

        let (value, hydration) = match storage.get_item(&key) {
            Ok(None) => (initial.clone(), Hydration::Missing),
            Ok(Some(raw)) => match serde_json::from_str(&raw) {
                Ok(value) => (value, Hydration::Loaded),
                Err(e) => {
                    tracing::warn!(key = %key, error = %e, "discarding undecodable stored value");
                    (initial.clone(), Hydration::Corrupt)
                }
            },
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "failed to read stored value");
                (initial.clone(), Hydration::Missing)
            }
        };

        Self {
            storage: storage.clone(),
            key,
            initial,
            hydration,
            inner: Mutex::new(Inner { value, events }),
        }
    }

    /// Storage key backing this value.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Outcome of the initial load.
    #[must_use]
    pub const fn hydration(&self) -> Hydration {
        self.hydration
    }

    /// Current value, after adopting any change made by another instance.
    #[must_use]
    pub fn get(&self) -> T {
        self.lock().value.clone()
    }

    /// Replace the value. Skips the write when `value` equals the current one.
    ///
    /// Returns whether the value changed.
    pub fn set(&self, value: T) -> bool {
        let mut inner = self.lock();
        if inner.value == value {
            return false;
        }
        inner.value = value;
        self.persist(&inner.value);
        true
    }

    /// Mutate the value in place under the lock, then write it through if it
    /// changed. Returns whatever `f` returns.
    pub fn update<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        let mut inner = self.lock();
        let mut next = inner.value.clone();
        let out = f(&mut next);
        if next != inner.value {
            inner.value = next;
            self.persist(&inner.value);
        }
        out
    }

    /// Reset to the initial value and erase the stored copy.
    pub fn remove(&self) {
        let mut inner = self.lock();
        inner.value = self.initial.clone();
        if let Err(e) = self.storage.remove_item(&self.key) {
            tracing::error!(key = %self.key, error = %e, "failed to erase stored value");
        }
    }

    fn persist(&self, value: &T) {
        let raw = match serde_json::to_string(value) {
            Ok(raw) => raw,
            Err(e) => {
                tracing::error!(key = %self.key, error = %e, "failed to encode value");
                return;
            }
        };
        if let Err(e) = self.storage.set_item(&self.key, &raw) {
            tracing::error!(key = %self.key, error = %e, "failed to persist value");
        }
    }

    /// Lock the inner state, adopting foreign writes to this key first.
    fn lock(&self) -> MutexGuard<'_, Inner<T>> {
        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        while let Some(event) = inner.events.try_next() {
            if event.key != self.key {
                continue;
            }
            let next = match event.new_value {
                None => self.initial.clone(),
                Some(raw) => match serde_json::from_str::<T>(&raw) {
                    Ok(value) => value,
                    Err(e) => {
                        tracing::warn!(key = %self.key, error = %e, "ignoring undecodable external write");
                        continue;
                    }
                },
            };
            if next != inner.value {
                tracing::debug!(key = %self.key, "adopting external write");
                inner.value = next;
            }
        }
        inner
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::storage::{MemoryBackend, StorageBackend};
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Memory backend that counts writes.
    #[derive(Default)]
    struct CountingBackend {
        inner: MemoryBackend,
        writes: Arc<AtomicUsize>,
    }

    impl StorageBackend for CountingBackend {
        fn read(&self, key: &str) -> Result<Option<String>, crate::storage::StorageError> {
            self.inner.read(key)
        }

        fn write(&self, key: &str, value: &str) -> Result<(), crate::storage::StorageError> {
            self.writes.fetch_add(1, Ordering::SeqCst);
            self.inner.write(key, value)
        }

        fn delete(&self, key: &str) -> Result<(), crate::storage::StorageError> {
            self.inner.delete(key)
        }
    }

    #[test]
    fn test_missing_key_uses_initial() {
        let storage = DurableStorage::in_memory();
        let value = DurableValue::load(&storage, "n", 7_u32);
        assert_eq!(value.hydration(), Hydration::Missing);
        assert_eq!(value.get(), 7);
    }

    #[test]
    fn test_set_writes_through() {
        let storage = DurableStorage::in_memory();
        let value = DurableValue::load(&storage, "n", 0_u32);
        assert!(value.set(3));
        assert_eq!(storage.get_item("n").unwrap().as_deref(), Some("3"));

        let reloaded = DurableValue::load(&storage, "n", 0_u32);
        assert_eq!(reloaded.hydration(), Hydration::Loaded);
        assert_eq!(reloaded.get(), 3);
    }

    #[test]
    fn test_equal_set_skips_write() {
        let backend = CountingBackend::default();
        let writes = Arc::clone(&backend.writes);
        let storage = DurableStorage::new(backend);
        let value = DurableValue::load(&storage, "v", vec![1, 2]);

        assert!(value.set(vec![1, 2, 3]));
        assert!(!value.set(vec![1, 2, 3]));
        value.update(|v| v.sort_unstable());
        assert_eq!(writes.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_corrupt_value_falls_back() {
        let storage = DurableStorage::in_memory();
        storage.set_item("v", "{not json").unwrap();
        let value = DurableValue::load(&storage, "v", vec![0_u8]);
        assert_eq!(value.hydration(), Hydration::Corrupt);
        assert_eq!(value.get(), vec![0]);
    }

    #[test]
    fn test_adopts_external_write() {
        let tab_a = DurableStorage::in_memory();
        let tab_b = tab_a.connect();
        let a = DurableValue::load(&tab_a, "shared", String::new());
        let b = DurableValue::load(&tab_b, "shared", String::new());

        a.set("hello".to_owned());
        assert_eq!(b.get(), "hello");

        a.remove();
        assert_eq!(b.get(), "");
    }

    #[test]
    fn test_ignores_undecodable_external_write() {
        let tab_a = DurableStorage::in_memory();
        let tab_b = tab_a.connect();
        let b = DurableValue::load(&tab_b, "n", 1_u32);

        tab_a.set_item("n", "garbage").unwrap();
        assert_eq!(b.get(), 1);
        tab_a.set_item("other", "5").unwrap();
        assert_eq!(b.get(), 1);
    }

    #[test]
    fn test_remove_erases_and_resets() {
        let storage = DurableStorage::in_memory();
        let value = DurableValue::load(&storage, "n", 0_u32);
        value.set(9);
        value.remove();
        assert_eq!(value.get(), 0);
        assert_eq!(storage.get_item("n").unwrap(), None);
        value.remove();
        assert_eq!(value.get(), 0);
    }
}
