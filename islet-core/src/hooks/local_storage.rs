//! Signals persisted to a storage area.
//!
//! The stored form is JSON. A value identical to the initial one is not
//! stored at all: the key is removed instead, so a reset leaves no trace.
//! Storage failures never reach the caller; they are logged at debug level
//! and the in-memory value stays authoritative.

use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::StorageError;
use crate::host::Storage;
use crate::reactive::{Identical, Signal, Subscription};

/// A [`Signal`] mirrored into a storage area under one key.
///
/// Dereferences to the underlying signal, so `get`, `set` and `subscribe`
/// work as usual.
pub struct LocalStorage<T>
where
    T: Clone + Send + Sync + 'static,
{
    signal: Signal<T>,
    storage: Arc<dyn Storage>,
    key: String,
    initial: T,
    persist: Subscription,
}

impl<T> LocalStorage<T>
where
    T: Serialize + DeserializeOwned + Identical + Clone + Send + Sync + 'static,
{
    /// Restore the initial value and remove the key.
    pub fn reset(&self) {
        self.signal.set(self.initial.clone());
        if let Err(error) = self.storage.remove_item(&self.key) {
            tracing::debug!(key = %self.key, %error, "failed to remove stored value");
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// The underlying signal.
    pub fn signal(&self) -> &Signal<T> {
        &self.signal
    }

    /// Stop mirroring changes into storage. The signal keeps working.
    pub fn detach(&self) {
        self.persist.unsubscribe();
    }
}

impl<T> Deref for LocalStorage<T>
where
    T: Clone + Send + Sync + 'static,
{
    type Target = Signal<T>;

    fn deref(&self) -> &Signal<T> {
        &self.signal
    }
}

impl<T> fmt::Debug for LocalStorage<T>
where
    T: Clone + Send + Sync + fmt::Debug + 'static,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalStorage")
            .field("key", &self.key)
            .field("signal", &self.signal)
            .finish()
    }
}

fn read_stored<T: DeserializeOwned>(storage: &dyn Storage, key: &str) -> Result<Option<T>, StorageError> {
    match storage.get_item(key)? {
        Some(raw) => serde_json::from_str(&raw)
            .map(Some)
            .map_err(|source| StorageError::Serialization {
                key: key.to_string(),
                source,
            }),
        None => Ok(None),
    }
}

fn write_stored<T: Serialize + Identical>(
    storage: &dyn Storage,
    key: &str,
    value: &T,
    initial: &T,
) -> Result<(), StorageError> {
    if value.identical(initial) {
        return storage.remove_item(key);
    }
    let raw = serde_json::to_string(value).map_err(|source| StorageError::Serialization {
        key: key.to_string(),
        source,
    })?;
    storage.set_item(key, &raw)
}

/// Create a signal seeded from `storage[key]` and written back on change.
///
/// A missing key, or one whose contents fail to parse, yields `initial`.
pub fn use_local_storage<T>(storage: Arc<dyn Storage>, key: &str, initial: T) -> LocalStorage<T>
where
    T: Serialize + DeserializeOwned + Identical + Clone + Send + Sync + 'static,
{
    let stored = read_stored(storage.as_ref(), key).unwrap_or_else(|error| {
        tracing::debug!(key = %key, %error, "ignoring unreadable stored value");
        None
    });
    let signal = Signal::new(stored.unwrap_or_else(|| initial.clone()));

    let persist = {
        let storage = Arc::clone(&storage);
        let key = key.to_string();
        let initial = initial.clone();
        signal.subscribe(move |value: &T| {
            if let Err(error) = write_stored(storage.as_ref(), &key, value, &initial) {
                tracing::debug!(key = %key, %error, "failed to persist value");
            }
        })
    };

    LocalStorage {
        signal,
        storage,
        key: key.to_string(),
        initial,
        persist,
    }
}
