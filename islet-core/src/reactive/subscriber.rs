//! Subscriber handles for the reactive system.
//!
//! Every registration on a signal gets a `SubscriberId`. The id is the
//! stable handle used to remove exactly that registration later, even when
//! the same closure was registered twice.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Unique identifier for a subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriberId(u64);

impl SubscriberId {
    /// Generate a new unique subscriber ID.
    ///
    /// Uses an atomic counter to ensure uniqueness across threads.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for SubscriberId {
    fn default() -> Self {
        Self::new()
    }
}

/// Handle returned by `subscribe`.
///
/// Calling [`Subscription::unsubscribe`] removes the registration it was
/// created for. Removal is idempotent. Dropping the handle does *not*
/// unsubscribe: the signal owns its subscribers.
#[derive(Clone)]
pub struct Subscription {
    id: SubscriberId,
    remove: Arc<dyn Fn(SubscriberId) + Send + Sync>,
}

impl Subscription {
    pub(crate) fn new<F>(id: SubscriberId, remove: F) -> Self
    where
        F: Fn(SubscriberId) + Send + Sync + 'static,
    {
        Self {
            id,
            remove: Arc::new(remove),
        }
    }

    /// The id of the registration this handle removes.
    pub fn id(&self) -> SubscriberId {
        self.id
    }

    /// Remove the registration. Safe to call more than once.
    pub fn unsubscribe(&self) {
        (self.remove)(self.id);
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}
