//! Host Environment
//!
//! Everything the mount lifecycle needs from its environment goes through
//! the [`Host`] trait: the document, the ready state, event listener
//! registration, and the microtask queue. Optional capabilities (navigation
//! events, media queries, local storage) are reported by the host rather
//! than probed from globals, so tests can substitute any combination.
//!
//! [`Page`] is the in-memory implementation. It is driven explicitly:
//! `run_microtasks`, `finish_loading`, `navigate` and `dispatch` play the
//! role of the browser's event loop.

mod page;
mod storage;

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::dom::Document;
use crate::reactive::Signal;

pub use page::{Page, PageOptions};
pub use storage::{MemoryStorage, Storage};

/// Callback registered for a host event.
pub type Listener = Arc<dyn Fn() + Send + Sync>;

/// Work queued to run after the current call stack unwinds.
pub type Microtask = Box<dyn FnOnce() + Send>;

/// Document loading progress.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReadyState {
    Loading,
    Interactive,
    #[default]
    Complete,
}

/// Events the mount lifecycle listens for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum HostEvent {
    /// The document finished parsing. Fired once.
    DomContentLoaded,
    /// A client-side navigation is about to swap the page body.
    BeforeRender,
    /// A client-side navigation finished and the new body is in place.
    Load,
}

impl HostEvent {
    /// Conventional DOM event name.
    pub fn name(self) -> &'static str {
        match self {
            HostEvent::DomContentLoaded => "DOMContentLoaded",
            HostEvent::BeforeRender => "turbo:before-render",
            HostEvent::Load => "turbo:load",
        }
    }
}

impl fmt::Display for HostEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Handle for removing a registered listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

impl ListenerId {
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for ListenerId {
    fn default() -> Self {
        Self::new()
    }
}

/// The environment a component is mounted into.
pub trait Host: Send + Sync {
    /// The live document.
    fn document(&self) -> Document;

    fn ready_state(&self) -> ReadyState;

    /// Whether client-side navigation events (`BeforeRender`/`Load`) fire.
    fn supports_navigation_events(&self) -> bool;

    /// Register `listener` for `event`. A `once` listener is removed after
    /// its first call.
    fn add_event_listener(&self, event: HostEvent, listener: Listener, once: bool) -> ListenerId;

    /// Remove a listener. Unknown ids are ignored.
    fn remove_event_listener(&self, id: ListenerId);

    /// Run `task` after the current call stack, before any further event.
    fn queue_microtask(&self, task: Microtask);

    /// Live match state of a media query, or `None` without media-query
    /// support.
    fn match_media(&self, _query: &str) -> Option<Signal<bool>> {
        None
    }

    /// Persistent key/value storage, if the host has one.
    fn local_storage(&self) -> Option<Arc<dyn Storage>> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_names() {
        assert_eq!(HostEvent::DomContentLoaded.to_string(), "DOMContentLoaded");
        assert_eq!(HostEvent::BeforeRender.name(), "turbo:before-render");
        assert_eq!(HostEvent::Load.name(), "turbo:load");
    }

    #[test]
    fn ready_state_deserializes_kebab_case() {
        let state: ReadyState = serde_json::from_str("\"loading\"").unwrap();
        assert_eq!(state, ReadyState::Loading);
        assert_eq!(ReadyState::default(), ReadyState::Complete);
    }

    #[test]
    fn listener_ids_are_unique() {
        assert_ne!(ListenerId::new(), ListenerId::new());
    }
}
