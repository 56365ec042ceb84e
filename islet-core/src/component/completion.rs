//! Single-resolution completion value.
//!
//! A `Completion` starts pending and is settled at most once, either
//! resolved with a value or rejected with a [`MountError`]. Any number of
//! [`Mounted`] futures may wait on it; each observes the same outcome.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll, Waker};

use parking_lot::Mutex;

use crate::error::MountError;

/// Observable state of a completion.
#[derive(Debug, Clone)]
pub enum CompletionState<T> {
    Pending,
    Resolved(T),
    Rejected(MountError),
}

enum Slot<T> {
    Pending(Vec<Waker>),
    Settled(Result<T, MountError>),
}

/// Write side of a single-resolution value.
pub(crate) struct Completion<T> {
    slot: Arc<Mutex<Slot<T>>>,
}

impl<T: Clone> Completion<T> {
    pub(crate) fn new() -> Self {
        Self {
            slot: Arc::new(Mutex::new(Slot::Pending(Vec::new()))),
        }
    }

    /// Settle with `outcome`. Returns `false` if already settled.
    pub(crate) fn settle(&self, outcome: Result<T, MountError>) -> bool {
        let wakers = {
            let mut slot = self.slot.lock();
            match &mut *slot {
                Slot::Settled(_) => return false,
                Slot::Pending(wakers) => {
                    let wakers = std::mem::take(wakers);
                    *slot = Slot::Settled(outcome);
                    wakers
                }
            }
        };

        for waker in wakers {
            waker.wake();
        }
        true
    }

    pub(crate) fn resolve(&self, value: T) -> bool {
        self.settle(Ok(value))
    }

    pub(crate) fn reject(&self, error: MountError) -> bool {
        self.settle(Err(error))
    }

    pub(crate) fn state(&self) -> CompletionState<T> {
        match &*self.slot.lock() {
            Slot::Pending(_) => CompletionState::Pending,
            Slot::Settled(Ok(value)) => CompletionState::Resolved(value.clone()),
            Slot::Settled(Err(error)) => CompletionState::Rejected(error.clone()),
        }
    }

    pub(crate) fn future(&self) -> Mounted<T> {
        Mounted {
            slot: Arc::clone(&self.slot),
        }
    }
}

/// Future resolving to the outcome of the first initialization.
#[must_use = "futures do nothing unless awaited"]
pub struct Mounted<T> {
    slot: Arc<Mutex<Slot<T>>>,
}

impl<T> Clone for Mounted<T> {
    fn clone(&self) -> Self {
        Self {
            slot: Arc::clone(&self.slot),
        }
    }
}

impl<T: Clone> Future for Mounted<T> {
    type Output = Result<T, MountError>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let mut slot = self.slot.lock();
        match &mut *slot {
            Slot::Settled(outcome) => Poll::Ready(outcome.clone()),
            Slot::Pending(wakers) => {
                if !wakers.iter().any(|waker| waker.will_wake(cx.waker())) {
                    wakers.push(cx.waker().clone());
                }
                Poll::Pending
            }
        }
    }
}

impl<T> std::fmt::Debug for Mounted<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let settled = matches!(&*self.slot.lock(), Slot::Settled(_));
        f.debug_struct("Mounted").field("settled", &settled).finish()
    }
}
