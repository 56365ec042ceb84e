//! Signal Implementation
//!
//! A Signal is the fundamental reactive primitive. It holds a value and
//! a set of change subscribers.
//!
//! # How Signals Work
//!
//! 1. `subscribe` registers a callback and returns a [`Subscription`].
//!
//! 2. `set` replaces the value. If the new value is not [`Identical`] to the
//!    old one, every subscriber is called with the new value, synchronously,
//!    in registration order.
//!
//! 3. Assigning an identical value is a no-op: nothing is stored and nobody
//!    is notified.
//!
//! # Re-entrancy
//!
//! No lock is held while subscribers run. The subscriber list is
//! snapshotted before notification, so a subscriber may freely read or set
//! the signal, subscribe, or unsubscribe. Registrations made during a
//! notification are first called on the next change; removals made during
//! a notification do not cancel calls already in flight.
//!
//! Panics raised by subscribers are not caught. They propagate to the caller
//! of `set`.

use std::fmt::Debug;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use indexmap::IndexMap;
use parking_lot::{Mutex, RwLock};
use smallvec::SmallVec;

use super::identity::Identical;
use super::subscriber::{SubscriberId, Subscription};

/// Counter for generating unique signal IDs.
static SIGNAL_ID_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Generate a new unique signal ID.
fn next_signal_id() -> u64 {
    SIGNAL_ID_COUNTER.fetch_add(1, Ordering::Relaxed)
}

type Notifier<T> = Arc<dyn Fn(&T) + Send + Sync>;
type SubscriberMap<T> = Mutex<IndexMap<SubscriberId, Notifier<T>>>;

/// A reactive signal holding a value of type T.
///
/// Cloning a signal yields another handle to the same value and subscriber
/// set.
///
/// # Example
///
/// ```rust
/// use islet_core::reactive::Signal;
///
/// let count = Signal::new(0);
/// let subscription = count.subscribe(|value| println!("count is {value}"));
///
/// count.set(5); // prints "count is 5"
/// count.set(5); // identical value, no notification
///
/// subscription.unsubscribe();
/// ```
pub struct Signal<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Unique identifier for this signal.
    id: u64,

    /// The current value.
    value: Arc<RwLock<T>>,

    /// Registered callbacks, in registration order.
    subscribers: Arc<SubscriberMap<T>>,
}

impl<T> Signal<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Create a new signal with the given initial value.
    pub fn new(value: T) -> Self {
        Self {
            id: next_signal_id(),
            value: Arc::new(RwLock::new(value)),
            subscribers: Arc::new(Mutex::new(IndexMap::new())),
        }
    }

    /// Get the signal's unique ID.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Get a clone of the current value.
    pub fn get(&self) -> T {
        self.value.read().clone()
    }

    /// Borrow the current value for the duration of `f`.
    ///
    /// `f` must not set this signal.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&*self.value.read())
    }

    /// Register `notify` to be called with every new, non-identical value.
    ///
    /// The returned handle removes exactly this registration.
    pub fn subscribe<F>(&self, notify: F) -> Subscription
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        let id = SubscriberId::new();
        self.subscribers.lock().insert(id, Arc::new(notify));

        let subscribers: Weak<SubscriberMap<T>> = Arc::downgrade(&self.subscribers);
        Subscription::new(id, move |id| {
            if let Some(subscribers) = subscribers.upgrade() {
                subscribers.lock().shift_remove(&id);
            }
        })
    }

    /// Get the number of subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.lock().len()
    }

    fn notify_subscribers(&self, value: &T) {
        let notifiers: SmallVec<[Notifier<T>; 4]> =
            self.subscribers.lock().values().cloned().collect();
        for notify in notifiers {
            notify(value);
        }
    }
}

impl<T> Signal<T>
where
    T: Identical + Clone + Send + Sync + 'static,
{
    /// Set a new value and notify subscribers.
    ///
    /// Returns `true` when the value changed and subscribers were notified.
    pub fn set(&self, value: T) -> bool {
        {
            let mut guard = self.value.write();
            if guard.identical(&value) {
                return false;
            }
            *guard = value.clone();
        }

        self.notify_subscribers(&value);
        true
    }

    /// Update the value using a function of the current value.
    pub fn update<F>(&self, f: F) -> bool
    where
        F: FnOnce(&T) -> T,
    {
        let next = {
            let guard = self.value.read();
            f(&*guard)
        };
        self.set(next)
    }
}

impl<T> Clone for Signal<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            value: Arc::clone(&self.value),
            subscribers: Arc::clone(&self.subscribers),
        }
    }
}

impl<T> Debug for Signal<T>
where
    T: Clone + Send + Sync + Debug + 'static,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Signal")
            .field("id", &self.id)
            .field("value", &self.get())
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}

/// Create a signal. Shorthand for [`Signal::new`].
pub fn use_signal<T>(initial: T) -> Signal<T>
where
    T: Clone + Send + Sync + 'static,
{
    Signal::new(initial)
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicI32, Ordering};

    #[test]
    fn signal_get_and_set() {
        let signal = Signal::new(0);
        assert_eq!(signal.get(), 0);

        assert!(signal.set(42));
        assert_eq!(signal.get(), 42);
    }

    #[test]
    fn signal_update() {
        let signal = Signal::new(10);
        signal.update(|v| v + 5);
        assert_eq!(signal.get(), 15);
    }

    #[test]
    fn signal_notifies_subscribers_with_new_value() {
        let signal = Signal::new(0);
        let seen = Arc::new(AtomicI32::new(-1));
        let seen_clone = seen.clone();

        signal.subscribe(move |value| {
            seen_clone.store(*value, Ordering::SeqCst);
        });

        signal.set(7);
        assert_eq!(seen.load(Ordering::SeqCst), 7);
    }

    #[test]
    fn identical_assignment_does_not_notify() {
        let signal = Signal::new(1);
        let call_count = Arc::new(AtomicI32::new(0));
        let call_count_clone = call_count.clone();

        signal.subscribe(move |_| {
            call_count_clone.fetch_add(1, Ordering::SeqCst);
        });

        assert!(!signal.set(1));
        assert!(signal.set(2));
        assert!(!signal.set(2));
        assert!(!signal.set(2));
        assert!(signal.set(1));
        assert_eq!(call_count.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn arc_values_notify_on_new_allocation() {
        let first = Arc::new(vec![1, 2]);
        let signal = Signal::new(first.clone());
        let call_count = Arc::new(AtomicI32::new(0));
        let call_count_clone = call_count.clone();

        signal.subscribe(move |_| {
            call_count_clone.fetch_add(1, Ordering::SeqCst);
        });

        signal.set(first);
        assert_eq!(call_count.load(Ordering::SeqCst), 0);

        signal.set(Arc::new(vec![1, 2]));
        assert_eq!(call_count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn nan_is_identical_to_nan() {
        let signal = Signal::new(f64::NAN);
        let call_count = Arc::new(AtomicI32::new(0));
        let call_count_clone = call_count.clone();

        signal.subscribe(move |_| {
            call_count_clone.fetch_add(1, Ordering::SeqCst);
        });

        signal.set(f64::NAN);
        assert_eq!(call_count.load(Ordering::SeqCst), 0);
        signal.set(-0.0);
        signal.set(0.0);
        assert_eq!(call_count.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn subscribers_run_in_registration_order() {
        let signal = Signal::new(0);
        let order = Arc::new(Mutex::new(Vec::new()));

        for tag in ["a", "b", "c"] {
            let order = order.clone();
            signal.subscribe(move |_| order.lock().push(tag));
        }

        signal.set(1);
        assert_eq!(*order.lock(), vec!["a", "b", "c"]);
    }

    #[test]
    fn signal_unsubscribe_is_idempotent() {
        let signal = Signal::new(0);
        let call_count = Arc::new(AtomicI32::new(0));
        let call_count_clone = call_count.clone();

        let subscription = signal.subscribe(move |_| {
            call_count_clone.fetch_add(1, Ordering::SeqCst);
        });
        let other = signal.subscribe(|_| {});

        signal.set(1);
        assert_eq!(call_count.load(Ordering::SeqCst), 1);

        subscription.unsubscribe();
        subscription.unsubscribe();
        assert_eq!(signal.subscriber_count(), 1);

        signal.set(2);
        // Should not have been called again
        assert_eq!(call_count.load(Ordering::SeqCst), 1);

        other.unsubscribe();
        assert_eq!(signal.subscriber_count(), 0);
    }

    #[test]
    fn unsubscribe_during_notification_keeps_in_flight_call() {
        let signal = Signal::new(0);
        let second_calls = Arc::new(AtomicI32::new(0));
        let second_handle: Arc<Mutex<Option<Subscription>>> = Arc::new(Mutex::new(None));

        let handle_clone = second_handle.clone();
        signal.subscribe(move |_| {
            if let Some(second) = handle_clone.lock().as_ref() {
                second.unsubscribe();
            }
        });

        let second_calls_clone = second_calls.clone();
        let second = signal.subscribe(move |_| {
            second_calls_clone.fetch_add(1, Ordering::SeqCst);
        });
        *second_handle.lock() = Some(second);

        signal.set(1);
        assert_eq!(second_calls.load(Ordering::SeqCst), 1);

        signal.set(2);
        assert_eq!(second_calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn subscriber_may_set_the_signal_again() {
        let signal = Signal::new(0);
        let signal_clone = signal.clone();

        signal.subscribe(move |value| {
            if *value < 3 {
                signal_clone.set(value + 1);
            }
        });

        signal.set(1);
        assert_eq!(signal.get(), 3);
    }

    #[test]
    #[should_panic(expected = "subscriber failed")]
    fn subscriber_panics_propagate_to_setter() {
        let signal = Signal::new(0);
        signal.subscribe(|_| panic!("subscriber failed"));
        signal.set(1);
    }

    #[test]
    fn signal_clone_shares_state() {
        let signal1 = use_signal(0);
        let signal2 = signal1.clone();

        signal1.set(42);
        assert_eq!(signal2.get(), 42);

        signal2.set(100);
        assert_eq!(signal1.get(), 100);
        assert_eq!(signal1.id(), signal2.id());
    }

    #[test]
    fn signal_ids_are_unique() {
        let s1 = Signal::new(0);
        let s2 = Signal::new(0);
        let s3 = Signal::new(0);

        assert_ne!(s1.id(), s2.id());
        assert_ne!(s2.id(), s3.id());
        assert_ne!(s1.id(), s3.id());
    }
}
