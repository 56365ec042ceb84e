//! In-memory page host.
//!
//! A `Page` owns a [`Document`] plus the pieces of a browser event loop the
//! mount lifecycle relies on. Nothing runs on its own: queued microtasks
//! run on [`Page::run_microtasks`], and events fire on [`Page::dispatch`]
//! or the higher-level [`Page::finish_loading`] and [`Page::navigate`].

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use super::storage::{MemoryStorage, Storage};
use super::{Host, HostEvent, Listener, ListenerId, Microtask, ReadyState};
use crate::dom::{Document, Element};
use crate::reactive::Signal;

/// Configuration for an in-memory page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PageOptions {
    /// Ready state the page starts in.
    pub ready_state: ReadyState,
    /// Whether `BeforeRender`/`Load` navigation events are supported.
    pub navigation_events: bool,
    /// Whether `match_media` is available.
    pub media_queries: bool,
    /// Media queries that match initially.
    pub matching_media: Vec<String>,
    /// `lang` attribute set on the root element.
    pub language: Option<String>,
    /// Byte quota of the local storage area.
    pub storage_quota: Option<usize>,
}

impl Default for PageOptions {
    fn default() -> Self {
        Self {
            ready_state: ReadyState::Complete,
            navigation_events: false,
            media_queries: true,
            matching_media: Vec::new(),
            language: None,
            storage_quota: None,
        }
    }
}

struct Registration {
    event: HostEvent,
    listener: Listener,
    once: bool,
}

/// A document together with a manually driven event loop.
pub struct Page {
    document: Document,
    ready_state: RwLock<ReadyState>,
    options: PageOptions,
    listeners: Mutex<IndexMap<ListenerId, Registration>>,
    microtasks: Mutex<VecDeque<Microtask>>,
    media: Mutex<HashMap<String, Signal<bool>>>,
    storage: Arc<MemoryStorage>,
}

impl Page {
    /// A fully loaded page with default options.
    pub fn new(document: Document) -> Arc<Self> {
        Self::with_options(document, PageOptions::default())
    }

    pub fn with_options(document: Document, options: PageOptions) -> Arc<Self> {
        if let Some(language) = &options.language {
            document.document_element().set_attribute("lang", language);
        }

        let media = options
            .matching_media
            .iter()
            .map(|query| (query.clone(), Signal::new(true)))
            .collect();
        let storage = match options.storage_quota {
            Some(bytes) => MemoryStorage::with_quota(bytes),
            None => MemoryStorage::new(),
        };

        Arc::new(Self {
            document,
            ready_state: RwLock::new(options.ready_state),
            options,
            listeners: Mutex::new(IndexMap::new()),
            microtasks: Mutex::new(VecDeque::new()),
            media: Mutex::new(media),
            storage: Arc::new(storage),
        })
    }

    pub fn options(&self) -> &PageOptions {
        &self.options
    }

    /// Run queued microtasks, including any queued while running, until the
    /// queue is empty. Returns how many ran.
    pub fn run_microtasks(&self) -> usize {
        let mut ran = 0;
        loop {
            let task = self.microtasks.lock().pop_front();
            match task {
                Some(task) => {
                    task();
                    ran += 1;
                }
                None => return ran,
            }
        }
    }

    pub fn pending_microtasks(&self) -> usize {
        self.microtasks.lock().len()
    }

    #[cfg(test)]
    pub(crate) fn take_microtasks(&self) -> Vec<Microtask> {
        self.microtasks.lock().drain(..).collect()
    }

    /// Fire `event`, then drain microtasks. Returns the number of listeners
    /// called.
    ///
    /// Listeners registered during the dispatch are not called until the next
    /// one. A listener removed during the dispatch is not called once removed.
    pub fn dispatch(&self, event: HostEvent) -> usize {
        let candidates: SmallVec<[ListenerId; 4]> = self
            .listeners
            .lock()
            .iter()
            .filter(|(_, registration)| registration.event == event)
            .map(|(id, _)| *id)
            .collect();

        tracing::debug!(event = %event, listeners = candidates.len(), "dispatching host event");
        let mut called = 0;
        for id in candidates {
            let listener = {
                let mut registrations = self.listeners.lock();
                let Some(once) = registrations.get(&id).map(|registration| registration.once) else {
                    // Removed by an earlier listener of this dispatch.
                    continue;
                };
                if once {
                    registrations.shift_remove(&id).map(|registration| registration.listener)
                } else {
                    registrations.get(&id).map(|registration| Arc::clone(&registration.listener))
                }
            };
            if let Some(listener) = listener {
                listener();
                called += 1;
            }
        }
        self.run_microtasks();
        called
    }

    /// Move from `Loading` to `Interactive` and fire `DomContentLoaded`.
    /// Does nothing if the page already finished loading.
    pub fn finish_loading(&self) {
        {
            let mut state = self.ready_state.write();
            if *state != ReadyState::Loading {
                return;
            }
            *state = ReadyState::Interactive;
        }
        self.dispatch(HostEvent::DomContentLoaded);
    }

    /// Simulate a client-side navigation: fire `BeforeRender`, swap the body
    /// for `body`, fire `Load`.
    pub fn navigate(&self, body: impl IntoIterator<Item = Element>) {
        self.dispatch(HostEvent::BeforeRender);
        if let Err(error) = self.document.body().replace_children(body) {
            tracing::warn!(%error, "navigation body partially replaced");
        }
        self.dispatch(HostEvent::Load);
    }

    /// Change whether `query` matches, notifying its signal.
    pub fn set_media(&self, query: &str, matches: bool) {
        let signal = self
            .media
            .lock()
            .entry(query.to_string())
            .or_insert_with(|| Signal::new(false))
            .clone();
        signal.set(matches);
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.lock().len()
    }

    pub fn storage(&self) -> Arc<MemoryStorage> {
        Arc::clone(&self.storage)
    }
}

impl Host for Page {
    fn document(&self) -> Document {
        self.document.clone()
    }

    fn ready_state(&self) -> ReadyState {
        *self.ready_state.read()
    }

    fn supports_navigation_events(&self) -> bool {
        self.options.navigation_events
    }

    fn add_event_listener(&self, event: HostEvent, listener: Listener, once: bool) -> ListenerId {
        let id = ListenerId::new();
        self.listeners.lock().insert(
            id,
            Registration {
                event,
                listener,
                once,
            },
        );
        id
    }

    fn remove_event_listener(&self, id: ListenerId) {
        self.listeners.lock().shift_remove(&id);
    }

    fn queue_microtask(&self, task: Microtask) {
        self.microtasks.lock().push_back(task);
    }

    fn match_media(&self, query: &str) -> Option<Signal<bool>> {
        if !self.options.media_queries {
            return None;
        }
        let signal = self
            .media
            .lock()
            .entry(query.to_string())
            .or_insert_with(|| Signal::new(false))
            .clone();
        Some(signal)
    }

    fn local_storage(&self) -> Option<Arc<dyn Storage>> {
        let storage: Arc<dyn Storage> = self.storage.clone();
        Some(storage)
    }
}

impl std::fmt::Debug for Page {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Page")
            .field("ready_state", &self.ready_state())
            .field("listeners", &self.listener_count())
            .field("pending_microtasks", &self.pending_microtasks())
            .finish()
    }
}
