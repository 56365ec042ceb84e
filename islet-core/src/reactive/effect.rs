//! Effect Implementation
//!
//! An Effect is a side-effecting callback bound to an explicit list of
//! signals. It re-runs whenever any of them changes.
//!
//! # How Effects Work
//!
//! 1. On creation the effect subscribes to every listed signal, then runs
//!    its callback once.
//!
//! 2. The callback may return a [`Cleanup`]. At most one cleanup is held at
//!    a time.
//!
//! 3. When any bound signal changes, the held cleanup runs first, then the
//!    callback runs again and its new cleanup is held.
//!
//! 4. [`Effect::dispose`] runs the held cleanup and unsubscribes from every
//!    signal. Disposal is terminal: a notification already in flight when the
//!    effect is disposed does not re-run it.
//!
//! # Re-entrancy
//!
//! Runs never nest. A change to a bound signal made while the callback is
//! running (typically the callback clamping its own input) is recorded and
//! handled after the current run has stored its cleanup: the held cleanup
//! runs, then the callback runs again. An effect disposed from inside its
//! own callback runs the cleanup that callback returns immediately.
//!
//! Cleanup and callback panics are not caught; they propagate to whoever
//! triggered the run (the creator, or the caller of `Signal::set`).
//!
//! Dependencies are listed explicitly. There is no automatic tracking and
//! no batching: an effect bound to two signals that both change runs twice.

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use super::identity::Identical;
use super::signal::Signal;
use super::subscriber::Subscription;
use crate::component::{Cleanup, IntoCleanup};

/// Counter for generating unique effect IDs.
static EFFECT_ID_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Generate a new unique effect ID.
fn next_effect_id() -> u64 {
    EFFECT_ID_COUNTER.fetch_add(1, Ordering::Relaxed)
}

/// Something an effect can be bound to.
///
/// Implemented by [`Signal`] so that effects can watch signals of different
/// value types.
pub trait Watch {
    /// Call `notify` whenever the watched value changes.
    fn watch(&self, notify: Arc<dyn Fn() + Send + Sync>) -> Subscription;
}

impl<T> Watch for Signal<T>
where
    T: Identical + Clone + Send + Sync + 'static,
{
    fn watch(&self, notify: Arc<dyn Fn() + Send + Sync>) -> Subscription {
        self.subscribe(move |_| notify())
    }
}

struct EffectInner {
    id: u64,
    run: Box<dyn Fn() -> Option<Cleanup> + Send + Sync>,
    cleanup: Mutex<Option<Cleanup>>,
    subscriptions: Mutex<Vec<Subscription>>,
    state: Mutex<RunState>,
    disposed: AtomicBool,
    run_count: AtomicUsize,
}

#[derive(Default)]
struct RunState {
    running: bool,
    /// A bound signal changed while the callback was running.
    pending: bool,
}

/// Clears the run state when a run ends, including by panic.
struct RunGuard<'a>(&'a Mutex<RunState>);

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        *self.0.lock() = RunState::default();
    }
}

impl EffectInner {
    fn execute(&self) {
        if self.disposed.load(Ordering::SeqCst) {
            return;
        }

        {
            let mut state = self.state.lock();
            if state.running {
                state.pending = true;
                return;
            }
            state.running = true;
        }
        let _guard = RunGuard(&self.state);

        loop {
            let previous = self.cleanup.lock().take();
            if let Some(cleanup) = previous {
                cleanup.run();
            }
            if self.disposed.load(Ordering::SeqCst) {
                return;
            }

            let next = (self.run)();
            self.run_count.fetch_add(1, Ordering::SeqCst);
            *self.cleanup.lock() = next;

            // Disposed during the run: `dispose` already emptied the slot.
            if self.disposed.load(Ordering::SeqCst) {
                let orphan = self.cleanup.lock().take();
                if let Some(cleanup) = orphan {
                    cleanup.run();
                }
                return;
            }

            let mut state = self.state.lock();
            if !state.pending {
                return;
            }
            state.pending = false;
        }
    }
}

/// Handle to a running effect.
///
/// Dropping the handle does not stop the effect; the bound signals keep it
/// alive until [`Effect::dispose`] is called.
///
/// # Example
///
/// ```rust
/// use islet_core::reactive::{use_effect, use_signal};
///
/// let count = use_signal(0);
///
/// let reader = count.clone();
/// let effect = use_effect(move || println!("count is {}", reader.get()), &[&count]);
///
/// count.set(1); // prints "count is 1"
/// effect.dispose();
/// count.set(2); // nothing
/// ```
#[derive(Clone)]
pub struct Effect {
    inner: Arc<EffectInner>,
}

impl Effect {
    /// Bind `callback` to `signals` and run it once.
    pub fn new<F, R>(callback: F, signals: &[&dyn Watch]) -> Self
    where
        F: Fn() -> R + Send + Sync + 'static,
        R: IntoCleanup,
    {
        let inner = Arc::new(EffectInner {
            id: next_effect_id(),
            run: Box::new(move || callback().into_cleanup()),
            cleanup: Mutex::new(None),
            subscriptions: Mutex::new(Vec::with_capacity(signals.len())),
            state: Mutex::new(RunState::default()),
            disposed: AtomicBool::new(false),
            run_count: AtomicUsize::new(0),
        });

        for signal in signals {
            let target = Arc::clone(&inner);
            let subscription = signal.watch(Arc::new(move || target.execute()));
            inner.subscriptions.lock().push(subscription);
        }

        inner.execute();

        Self { inner }
    }

    /// Get the effect's unique ID.
    pub fn id(&self) -> u64 {
        self.inner.id
    }

    /// Run the held cleanup and unsubscribe from every signal.
    ///
    /// Only the first call has any effect.
    pub fn dispose(&self) {
        if self.inner.disposed.swap(true, Ordering::SeqCst) {
            return;
        }

        let cleanup = self.inner.cleanup.lock().take();
        if let Some(cleanup) = cleanup {
            cleanup.run();
        }

        let subscriptions = std::mem::take(&mut *self.inner.subscriptions.lock());
        for subscription in subscriptions {
            subscription.unsubscribe();
        }
    }

    /// Check if the effect has been disposed.
    pub fn is_disposed(&self) -> bool {
        self.inner.disposed.load(Ordering::SeqCst)
    }

    /// Get the number of times the callback has run.
    pub fn run_count(&self) -> usize {
        self.inner.run_count.load(Ordering::SeqCst)
    }
}

impl std::fmt::Debug for Effect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Effect")
            .field("id", &self.inner.id)
            .field("run_count", &self.run_count())
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

/// Run `callback` now and again whenever any of `signals` changes.
///
/// The returned handle's [`Effect::dispose`] stops it.
pub fn use_effect<F, R>(callback: F, signals: &[&dyn Watch]) -> Effect
where
    F: Fn() -> R + Send + Sync + 'static,
    R: IntoCleanup,
{
    Effect::new(callback, signals)
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicI32;

    fn counter() -> (Arc<AtomicI32>, Arc<AtomicI32>) {
        let count = Arc::new(AtomicI32::new(0));
        (count.clone(), count)
    }

    #[test]
    fn effect_runs_on_creation() {
        let (run_count, run_count_clone) = counter();

        let effect = use_effect(
            move || {
                run_count_clone.fetch_add(1, Ordering::SeqCst);
            },
            &[],
        );

        // Effect should have run once on creation
        assert_eq!(run_count.load(Ordering::SeqCst), 1);
        assert_eq!(effect.run_count(), 1);
    }

    #[test]
    fn effect_reruns_once_per_distinct_change_on_any_signal() {
        let a = Signal::new(0);
        let b = Signal::new("x".to_string());
        let (run_count, run_count_clone) = counter();

        let _effect = use_effect(
            move || {
                run_count_clone.fetch_add(1, Ordering::SeqCst);
            },
            &[&a, &b],
        );
        assert_eq!(run_count.load(Ordering::SeqCst), 1);

        a.set(1);
        assert_eq!(run_count.load(Ordering::SeqCst), 2);

        a.set(1);
        assert_eq!(run_count.load(Ordering::SeqCst), 2);

        b.set("y".to_string());
        assert_eq!(run_count.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn cleanup_runs_before_each_rerun_and_on_dispose() {
        let signal = Signal::new(0);
        let log = Arc::new(Mutex::new(Vec::new()));

        let reader = signal.clone();
        let log_clone = log.clone();
        let effect = use_effect(
            move || {
                let value = reader.get();
                log_clone.lock().push(format!("run {value}"));
                let log = log_clone.clone();
                Cleanup::new(move || log.lock().push(format!("cleanup {value}")))
            },
            &[&signal],
        );

        signal.set(1);
        signal.set(2);
        effect.dispose();

        assert_eq!(
            *log.lock(),
            vec!["run 0", "cleanup 0", "run 1", "cleanup 1", "run 2", "cleanup 2"]
        );
    }

    #[test]
    fn effect_does_not_run_after_disposal() {
        let signal = Signal::new(0);
        let (run_count, run_count_clone) = counter();

        let effect = use_effect(
            move || {
                run_count_clone.fetch_add(1, Ordering::SeqCst);
            },
            &[&signal],
        );

        effect.dispose();
        assert!(effect.is_disposed());
        assert_eq!(signal.subscriber_count(), 0);

        signal.set(1);
        signal.set(2);
        assert_eq!(run_count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn dispose_twice_runs_cleanup_once() {
        let (cleanups, cleanups_clone) = counter();

        let effect = use_effect(
            move || {
                let cleanups = cleanups_clone.clone();
                Some(Cleanup::new(move || {
                    cleanups.fetch_add(1, Ordering::SeqCst);
                }))
            },
            &[],
        );

        effect.dispose();
        effect.clone().dispose();
        assert_eq!(cleanups.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn in_flight_notification_after_dispose_is_ignored() {
        let trigger = Signal::new(0);
        let (run_count, run_count_clone) = counter();
        let slot: Arc<Mutex<Option<Effect>>> = Arc::new(Mutex::new(None));

        // Registered before the effect, so it runs first in the same
        // notification and disposes the effect before its turn.
        let slot_clone = slot.clone();
        trigger.subscribe(move |_| {
            if let Some(effect) = slot_clone.lock().as_ref() {
                effect.dispose();
            }
        });

        let effect = use_effect(
            move || {
                run_count_clone.fetch_add(1, Ordering::SeqCst);
            },
            &[&trigger],
        );
        *slot.lock() = Some(effect);

        trigger.set(1);
        assert_eq!(run_count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn effect_setting_its_own_signal_reruns_sequentially() {
        let signal = Signal::new(0);
        let log = Arc::new(Mutex::new(Vec::new()));

        let reader = signal.clone();
        let log_clone = log.clone();
        let effect = use_effect(
            move || {
                let value = reader.get();
                log_clone.lock().push(format!("run {value}"));
                if value > 3 {
                    reader.set(3);
                }
                let log = log_clone.clone();
                Cleanup::new(move || log.lock().push(format!("cleanup {value}")))
            },
            &[&signal],
        );

        signal.set(5);
        assert_eq!(signal.get(), 3);
        assert_eq!(effect.run_count(), 3);

        effect.dispose();
        assert_eq!(
            *log.lock(),
            vec!["run 0", "cleanup 0", "run 5", "cleanup 5", "run 3", "cleanup 3"]
        );
    }

    #[test]
    fn effect_disposed_by_its_own_callback_runs_returned_cleanup() {
        let trigger = Signal::new(0);
        let (cleanups, cleanups_clone) = counter();
        let slot: Arc<Mutex<Option<Effect>>> = Arc::new(Mutex::new(None));

        let reader = trigger.clone();
        let slot_clone = slot.clone();
        let effect = use_effect(
            move || {
                if reader.get() == 1 {
                    if let Some(effect) = slot_clone.lock().as_ref() {
                        effect.dispose();
                    }
                }
                let cleanups = cleanups_clone.clone();
                Cleanup::new(move || {
                    cleanups.fetch_add(1, Ordering::SeqCst);
                })
            },
            &[&trigger],
        );
        *slot.lock() = Some(effect.clone());

        trigger.set(1);
        assert!(effect.is_disposed());
        assert_eq!(effect.run_count(), 2);
        assert_eq!(cleanups.load(Ordering::SeqCst), 2);

        trigger.set(2);
        assert_eq!(effect.run_count(), 2);
        assert_eq!(cleanups.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn panicking_run_does_not_wedge_the_effect() {
        let signal = Signal::new(0);
        let reader = signal.clone();
        let effect = use_effect(
            move || {
                if reader.get() == 1 {
                    panic!("bad value");
                }
            },
            &[&signal],
        );

        let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| signal.set(1)));
        assert!(outcome.is_err());

        signal.set(2);
        assert_eq!(effect.run_count(), 2);
    }

    #[test]
    fn effect_ids_are_unique() {
        let e1 = use_effect(|| {}, &[]);
        let e2 = use_effect(|| {}, &[]);
        assert_ne!(e1.id(), e2.id());
    }
}
