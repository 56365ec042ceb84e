//! Mount Lifecycle
//!
//! `mount` binds a [`ComponentConfig`] to a [`Host`] and manages the
//! component's lifetime on the page.
//!
//! # States
//!
//! ```text
//! Created -> AwaitingReady -> Mounted <-> (navigation cleanup) -> Unmounted
//! ```
//!
//! 1. **Created.** The completion is pending. If the host supports
//!    navigation events, `BeforeRender` and `Load` listeners are registered.
//!
//! 2. **AwaitingReady.** Initialization is deferred: to the one-shot
//!    `DomContentLoaded` event while the document is loading, otherwise to
//!    the next microtask. It never runs inside `mount` itself, so the caller
//!    always gets the [`MountResult`] back first.
//!
//! 3. **Mounted.** Every element matching the selector got its callback
//!    run. A callback that fails (returns `Err` or panics) is logged and
//!    contributes no cleanup; its siblings are unaffected. The completion
//!    resolves with the collected cleanups.
//!
//! 4. **Navigation.** `BeforeRender` runs every cleanup and leaves the state
//!    unmounted but not terminal; the following `Load` initializes again
//!    against the new body.
//!
//! 5. **Unmounted.** `unmount` is terminal and idempotent. It runs the
//!    active cleanups and removes every listener registered by `mount`.
//!
//! Each cleanup and each listener removal is isolated: a panic is logged as
//! a warning and the remaining ones still run. No lock is held while user
//! code runs, and every transition checks the lifecycle flags first, so a
//! callback or cleanup that re-enters the lifecycle is harmless.

use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use super::cleanup::{Cleanup, ComponentOutput};
use super::completion::{Completion, CompletionState, Mounted};
use super::config::{create_component, ComponentConfig};
use super::instance::ComponentInstance;
use crate::dom::{Document, Element};
use crate::error::{panic_message, ComponentError, ConfigError, MountError};
use crate::host::{Host, HostEvent, ListenerId, ReadyState};

/// Removes one listener registered by `mount`.
type ListenerDisposer = Box<dyn FnOnce() + Send>;

#[derive(Default)]
struct Lifecycle {
    cleanups: Vec<Cleanup>,
    is_mounted: bool,
    is_unmounted: bool,
    /// Set while callbacks run, so a re-entrant initialize is a no-op.
    initializing: bool,
    listeners: Vec<ListenerDisposer>,
}

struct MountState {
    component: ComponentConfig,
    host: Weak<dyn Host>,
    lifecycle: Mutex<Lifecycle>,
    completion: Completion<Vec<Cleanup>>,
}

impl MountState {
    fn selector(&self) -> &str {
        self.component.selector()
    }

    /// `AwaitingReady -> Mounted`.
    fn initialize(&self) {
        let stale = {
            let mut lifecycle = self.lifecycle.lock();
            if lifecycle.is_mounted || lifecycle.is_unmounted || lifecycle.initializing {
                return;
            }
            lifecycle.initializing = true;
            std::mem::take(&mut lifecycle.cleanups)
        };

        tracing::debug!(selector = %self.selector(), "initializing components");
        run_cleanups(self.selector(), stale);

        let outcome = self.collect();

        let mut lifecycle = self.lifecycle.lock();
        lifecycle.initializing = false;
        match outcome {
            Ok(cleanups) if lifecycle.is_unmounted => {
                drop(lifecycle);
                // Unmounted from inside a callback: nothing will run these later.
                run_cleanups(self.selector(), cleanups.clone());
                self.completion.resolve(cleanups);
            }
            Ok(cleanups) => {
                lifecycle.cleanups = cleanups.clone();
                lifecycle.is_mounted = true;
                drop(lifecycle);
                tracing::debug!(
                    selector = %self.selector(),
                    cleanups = cleanups.len(),
                    "components mounted"
                );
                self.completion.resolve(cleanups);
            }
            Err(error) => {
                drop(lifecycle);
                tracing::error!(selector = %self.selector(), %error, "error mounting component");
                self.completion.reject(error);
            }
        }
    }

    /// Query the document and run the callback for every match.
    fn collect(&self) -> Result<Vec<Cleanup>, MountError> {
        let host = self.host.upgrade().ok_or_else(|| MountError::HostUnavailable {
            selector: self.selector().to_string(),
        })?;
        let document = host.document();

        panic::catch_unwind(AssertUnwindSafe(|| {
            initialize_components(&document, &self.component)
        }))
        .map_err(|payload| MountError::Panicked {
            selector: self.selector().to_string(),
            message: panic_message(payload.as_ref()),
        })
    }

    /// Navigation cleanup: `Mounted -> AwaitingReady`.
    fn lifecycle_cleanup(&self) {
        let cleanups = {
            let mut lifecycle = self.lifecycle.lock();
            if !lifecycle.is_mounted || lifecycle.is_unmounted {
                return;
            }
            lifecycle.is_mounted = false;
            std::mem::take(&mut lifecycle.cleanups)
        };

        tracing::debug!(selector = %self.selector(), "cleaning up before navigation");
        run_cleanups(self.selector(), cleanups);
    }

    /// Terminal teardown.
    fn unmount(&self) {
        let (cleanups, listeners) = {
            let mut lifecycle = self.lifecycle.lock();
            if lifecycle.is_unmounted {
                return;
            }
            lifecycle.is_unmounted = true;
            lifecycle.is_mounted = false;
            (
                std::mem::take(&mut lifecycle.cleanups),
                std::mem::take(&mut lifecycle.listeners),
            )
        };

        tracing::debug!(selector = %self.selector(), "unmounting");
        run_cleanups(self.selector(), cleanups);

        for remove in listeners {
            if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(remove)) {
                tracing::warn!(
                    selector = %self.selector(),
                    panic = %panic_message(payload.as_ref()),
                    "error removing event listener"
                );
            }
        }
    }

    fn is_mounted(&self) -> bool {
        let lifecycle = self.lifecycle.lock();
        lifecycle.is_mounted && !lifecycle.is_unmounted
    }

    fn track_listener(&self, host: &Arc<dyn Host>, id: ListenerId) {
        let host = Arc::downgrade(host);
        self.lifecycle.lock().listeners.push(Box::new(move || {
            if let Some(host) = host.upgrade() {
                host.remove_event_listener(id);
            }
        }));
    }
}

/// Run each cleanup in order. A panicking cleanup is logged and skipped.
fn run_cleanups(selector: &str, cleanups: Vec<Cleanup>) {
    for cleanup in cleanups {
        if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| cleanup.run())) {
            tracing::warn!(
                selector = %selector,
                panic = %panic_message(payload.as_ref()),
                "error during cleanup"
            );
        }
    }
}

/// Run the callback for one element, isolating any failure.
fn initialize_single(element: &Element, component: &ComponentConfig) -> Option<Cleanup> {
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
        let instance = ComponentInstance::new(element.clone());
        component.invoke(&instance)
    }));

    match outcome {
        Ok(Ok(cleanup)) => cleanup,
        Ok(Err(error)) => {
            tracing::error!(
                selector = %component.selector(),
                %error,
                "error initializing component"
            );
            None
        }
        Err(payload) => {
            tracing::error!(
                selector = %component.selector(),
                panic = %panic_message(payload.as_ref()),
                "error initializing component"
            );
            None
        }
    }
}

/// Run `component`'s callback for every matching element of `document`, in
/// document order, and collect the returned cleanups.
///
/// Failing callbacks are logged and skipped. There is no lifecycle here:
/// the caller owns the returned cleanups.
pub fn initialize_components(document: &Document, component: &ComponentConfig) -> Vec<Cleanup> {
    document
        .select_all(component.selector_list())
        .iter()
        .filter_map(|element| initialize_single(element, component))
        .collect()
}

/// Handle to a mounted component.
///
/// Dropping the handle does not unmount: registered listeners keep the
/// component alive until [`MountResult::unmount`] is called.
pub struct MountResult {
    state: Arc<MountState>,
}

impl MountResult {
    /// Future resolving with the cleanups collected by the first
    /// initialization, or the error that prevented it.
    pub fn mounted(&self) -> Mounted<Vec<Cleanup>> {
        self.state.completion.future()
    }

    /// Current state of the completion without waiting.
    pub fn try_mounted(&self) -> CompletionState<Vec<Cleanup>> {
        self.state.completion.state()
    }

    /// Tear down permanently. Safe to call repeatedly and before the first
    /// initialization.
    pub fn unmount(&self) {
        self.state.unmount();
    }

    pub fn is_mounted(&self) -> bool {
        self.state.is_mounted()
    }

    pub fn selector(&self) -> &str {
        self.state.selector()
    }
}

impl fmt::Debug for MountResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MountResult")
            .field("selector", &self.selector())
            .field("is_mounted", &self.is_mounted())
            .finish()
    }
}

/// Mount `component` on `host`.
///
/// Returns immediately; initialization happens once the document is ready
/// and never before this function returns.
pub fn mount(host: Arc<dyn Host>, component: ComponentConfig) -> MountResult {
    let state = Arc::new(MountState {
        component,
        host: Arc::downgrade(&host),
        lifecycle: Mutex::new(Lifecycle::default()),
        completion: Completion::new(),
    });

    if host.supports_navigation_events() {
        let target = Arc::clone(&state);
        let before_render = host.add_event_listener(
            HostEvent::BeforeRender,
            Arc::new(move || target.lifecycle_cleanup()),
            false,
        );
        state.track_listener(&host, before_render);

        let target = Arc::clone(&state);
        let load = host.add_event_listener(
            HostEvent::Load,
            Arc::new(move || target.initialize()),
            false,
        );
        state.track_listener(&host, load);
    }

    let target = Arc::clone(&state);
    if host.ready_state() == ReadyState::Loading {
        let ready = host.add_event_listener(
            HostEvent::DomContentLoaded,
            Arc::new(move || target.initialize()),
            true,
        );
        state.track_listener(&host, ready);
    } else {
        host.queue_microtask(Box::new(move || target.initialize()));
    }

    MountResult { state }
}

/// [`create_component`] followed by [`mount`].
pub fn create_component_and_mount<F, R>(
    host: Arc<dyn Host>,
    selector: &str,
    callback: F,
) -> Result<MountResult, ConfigError>
where
    F: Fn(&ComponentInstance) -> R + Send + Sync + 'static,
    R: ComponentOutput,
{
    let component = create_component(selector, callback)?;
    Ok(mount(host, component))
}

/// Run `callback` once, synchronously, for the first element matching
/// `selector`.
///
/// Returns `Ok(None)` and logs a warning when nothing matches. Unlike
/// `mount`, a failing callback is returned to the caller rather than logged.
pub fn create_single_component<F, R>(
    host: &dyn Host,
    selector: &str,
    callback: F,
) -> Result<Option<Cleanup>, ComponentError>
where
    F: Fn(&ComponentInstance) -> R + Send + Sync + 'static,
    R: ComponentOutput,
{
    let component = create_component(selector, callback)?;
    let Some(element) = host.document().select_first(component.selector_list()) else {
        tracing::warn!(selector = %selector, "no element found for selector");
        return Ok(None);
    };

    let instance = ComponentInstance::new(element);
    component
        .invoke(&instance)
        .map_err(|source| ComponentError::Callback {
            selector: selector.to_string(),
            source,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CallbackError;
    use crate::host::{Page, PageOptions};
    use futures_util::FutureExt;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn page_with(count: usize, options: PageOptions) -> Arc<Page> {
        let items = (0..count).map(|i| {
            Element::new("div")
                .with_class("test-component")
                .with_attribute("data-props-index", &i.to_string())
        });
        Page::with_options(Document::with_body(items), options)
    }

    fn counting_component(calls: &Arc<AtomicUsize>, cleanups: &Arc<AtomicUsize>) -> ComponentConfig {
        let calls = calls.clone();
        let cleanups = cleanups.clone();
        create_component(".test-component", move |_| {
            calls.fetch_add(1, Ordering::SeqCst);
            let cleanups = cleanups.clone();
            Cleanup::new(move || {
                cleanups.fetch_add(1, Ordering::SeqCst);
            })
        })
        .unwrap()
    }

    #[test]
    fn initialization_is_deferred_to_a_microtask() {
        let page = page_with(1, PageOptions::default());
        let calls = Arc::new(AtomicUsize::new(0));
        let cleanups = Arc::new(AtomicUsize::new(0));

        let result = mount(page.clone(), counting_component(&calls, &cleanups));
        assert!(!result.is_mounted());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert!(matches!(result.try_mounted(), CompletionState::Pending));

        page.run_microtasks();
        assert!(result.is_mounted());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(result.mounted().now_or_never().unwrap().unwrap().len(), 1);
    }

    #[test]
    fn loading_document_waits_for_dom_content_loaded() {
        let page = page_with(
            2,
            PageOptions {
                ready_state: ReadyState::Loading,
                ..PageOptions::default()
            },
        );
        let calls = Arc::new(AtomicUsize::new(0));
        let cleanups = Arc::new(AtomicUsize::new(0));

        let result = mount(page.clone(), counting_component(&calls, &cleanups));
        assert_eq!(page.run_microtasks(), 0);
        assert!(!result.is_mounted());

        page.finish_loading();
        assert!(result.is_mounted());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn unmount_runs_cleanups_once_and_removes_listeners() {
        let page = page_with(
            2,
            PageOptions {
                navigation_events: true,
                ..PageOptions::default()
            },
        );
        let calls = Arc::new(AtomicUsize::new(0));
        let cleanups = Arc::new(AtomicUsize::new(0));

        let result = mount(page.clone(), counting_component(&calls, &cleanups));
        assert_eq!(page.listener_count(), 2);
        page.run_microtasks();

        result.unmount();
        result.unmount();

        assert!(!result.is_mounted());
        assert_eq!(cleanups.load(Ordering::SeqCst), 2);
        assert_eq!(page.listener_count(), 0);
    }

    #[test]
    fn unmount_before_initialization_makes_it_a_no_op() {
        let page = page_with(1, PageOptions::default());
        let calls = Arc::new(AtomicUsize::new(0));
        let cleanups = Arc::new(AtomicUsize::new(0));

        let result = mount(page.clone(), counting_component(&calls, &cleanups));
        result.unmount();
        page.run_microtasks();

        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert!(!result.is_mounted());
        assert!(matches!(result.try_mounted(), CompletionState::Pending));
    }

    #[test]
    fn failing_callbacks_do_not_block_siblings() {
        let page = page_with(3, PageOptions::default());
        let component = create_component(".test-component", |component| -> Result<Cleanup, CallbackError> {
            match component.props().get::<i64>("index") {
                Some(0) => Err("first element is broken".into()),
                Some(1) => panic!("second element panicked"),
                _ => Ok(Cleanup::new(|| {})),
            }
        })
        .unwrap();

        let result = mount(page.clone(), component);
        page.run_microtasks();

        let cleanups = result.mounted().now_or_never().unwrap().unwrap();
        assert_eq!(cleanups.len(), 1);
        assert!(result.is_mounted());
    }

    #[test]
    fn panicking_cleanup_does_not_stop_the_rest() {
        let page = page_with(3, PageOptions::default());
        let ran = Arc::new(AtomicUsize::new(0));

        let ran_clone = ran.clone();
        let component = create_component(".test-component", move |component| {
            let index = component.props().get::<i64>("index").unwrap_or_default();
            let ran = ran_clone.clone();
            Cleanup::new(move || {
                if index == 1 {
                    panic!("cleanup failed");
                }
                ran.fetch_add(1, Ordering::SeqCst);
            })
        })
        .unwrap();

        let result = mount(page.clone(), component);
        page.run_microtasks();
        result.unmount();

        assert_eq!(ran.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn dropped_host_rejects_the_completion() {
        let page = page_with(1, PageOptions::default());
        let component = create_component(".test-component", |_| ()).unwrap();
        let result = mount(page.clone(), component);

        // Keep the queued microtask, drop every strong reference to the page.
        let tasks = page.take_microtasks();
        drop(page);
        for task in tasks {
            task();
        }

        assert!(matches!(
            result.mounted().now_or_never(),
            Some(Err(MountError::HostUnavailable { .. }))
        ));
        assert!(!result.is_mounted());
    }

    #[test]
    fn reentrant_unmount_from_callback_still_cleans_up() {
        let page = page_with(1, PageOptions::default());
        let cleaned = Arc::new(AtomicUsize::new(0));
        let slot: Arc<Mutex<Option<Arc<MountResult>>>> = Arc::new(Mutex::new(None));

        let slot_clone = slot.clone();
        let cleaned_clone = cleaned.clone();
        let component = create_component(".test-component", move |_| {
            if let Some(result) = slot_clone.lock().as_ref() {
                result.unmount();
            }
            let cleaned = cleaned_clone.clone();
            Cleanup::new(move || {
                cleaned.fetch_add(1, Ordering::SeqCst);
            })
        })
        .unwrap();

        let result = Arc::new(mount(page.clone(), component));
        *slot.lock() = Some(result.clone());
        page.run_microtasks();

        assert!(!result.is_mounted());
        assert_eq!(cleaned.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn single_component_binds_first_match_only() {
        let page = page_with(2, PageOptions::default());
        let seen = Arc::new(Mutex::new(Vec::new()));

        let seen_clone = seen.clone();
        let cleanup = create_single_component(page.as_ref(), ".test-component", move |component| {
            seen_clone
                .lock()
                .push(component.props().get::<i64>("index"));
            Cleanup::new(|| {})
        })
        .unwrap();

        assert!(cleanup.is_some());
        assert_eq!(*seen.lock(), vec![Some(0)]);
    }

    #[test]
    fn single_component_without_match_returns_none() {
        let page = page_with(0, PageOptions::default());
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_clone = calls.clone();

        let cleanup = create_single_component(page.as_ref(), ".missing", move |_| {
            calls_clone.fetch_add(1, Ordering::SeqCst);
        })
        .unwrap();

        assert!(cleanup.is_none());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn single_component_surfaces_callback_errors() {
        let page = page_with(1, PageOptions::default());
        let err = create_single_component(page.as_ref(), ".test-component", |_| {
            Err::<(), _>("boom")
        })
        .unwrap_err();

        assert!(matches!(err, ComponentError::Callback { ref selector, .. } if selector == ".test-component"));
    }
}
