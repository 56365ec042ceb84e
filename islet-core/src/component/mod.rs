//! Components
//!
//! A component is a CSS selector paired with a callback. Mounting it runs
//! the callback once for every element in the document that matches the
//! selector and keeps whatever cleanup each call returns.
//!
//! # How Mounting Works
//!
//! ```text
//! create_component(".counter", callback)   validate the selector
//!        │
//!        ▼
//! mount(host, config)                      register listeners, defer init
//!        │
//!        ▼  DOMContentLoaded or next microtask
//! initialize_components                    callback per match, collect cleanups
//!        │
//!        ▼
//! MountResult::unmount                     run cleanups, remove listeners
//! ```
//!
//! Callbacks may return nothing, a [`Cleanup`], an `Option<Cleanup>`, or a
//! `Result` of any of those. See [`ComponentOutput`].

mod cleanup;
mod completion;
mod config;
mod instance;
mod mount;

pub use cleanup::{Cleanup, ComponentOutput, IntoCleanup};
pub use completion::{CompletionState, Mounted};
pub use config::{create_component, ComponentCallback, ComponentConfig};
pub use instance::{create_instance, ComponentInstance};
pub use mount::{
    create_component_and_mount, create_single_component, initialize_components, mount,
    MountResult,
};
