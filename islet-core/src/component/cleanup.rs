//! Cleanup handles and the return types accepted from callbacks.

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::CallbackError;

/// A cleanup function returned by a component or effect callback.
///
/// Handles are cheap to clone; clones refer to the same function, which is
/// how the mount completion can hand out a copy of the active cleanup list.
#[derive(Clone)]
pub struct Cleanup(Arc<dyn Fn() + Send + Sync>);

impl Cleanup {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    /// Wrap a function that may only run once. Later runs do nothing.
    pub fn once<F>(f: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        let slot = Mutex::new(Some(f));
        Self::new(move || {
            let f = slot.lock().take();
            if let Some(f) = f {
                f();
            }
        })
    }

    pub fn run(&self) {
        (self.0)();
    }

    /// Whether both handles refer to the same function.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for Cleanup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Cleanup")
            .field(&Arc::as_ptr(&self.0).cast::<()>())
            .finish()
    }
}

/// Values a callback may return in place of a cleanup.
///
/// Returning `()` or `None` registers nothing.
pub trait IntoCleanup {
    fn into_cleanup(self) -> Option<Cleanup>;
}

impl IntoCleanup for () {
    fn into_cleanup(self) -> Option<Cleanup> {
        None
    }
}

impl IntoCleanup for Cleanup {
    fn into_cleanup(self) -> Option<Cleanup> {
        Some(self)
    }
}

impl IntoCleanup for Option<Cleanup> {
    fn into_cleanup(self) -> Option<Cleanup> {
        self
    }
}

/// Values a component callback may return.
///
/// Anything that is [`IntoCleanup`], or a `Result` of one. An `Err` marks the
/// element's initialization as failed.
pub trait ComponentOutput {
    fn into_outcome(self) -> Result<Option<Cleanup>, CallbackError>;
}

impl ComponentOutput for () {
    fn into_outcome(self) -> Result<Option<Cleanup>, CallbackError> {
        Ok(None)
    }
}

impl ComponentOutput for Cleanup {
    fn into_outcome(self) -> Result<Option<Cleanup>, CallbackError> {
        Ok(Some(self))
    }
}

impl ComponentOutput for Option<Cleanup> {
    fn into_outcome(self) -> Result<Option<Cleanup>, CallbackError> {
        Ok(self)
    }
}

impl<R, E> ComponentOutput for Result<R, E>
where
    R: IntoCleanup,
    E: Into<CallbackError>,
{
    fn into_outcome(self) -> Result<Option<Cleanup>, CallbackError> {
        self.map(IntoCleanup::into_cleanup).map_err(Into::into)
    }
}
