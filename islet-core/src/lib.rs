//! Islet Core
//!
//! This crate binds small interactive behaviors ("islands") to elements of
//! a server-rendered page. It implements:
//!
//! - Components: a selector plus a callback, run for every matching element
//! - A mount lifecycle with deferred initialization, navigation-aware
//!   re-initialization, and idempotent teardown
//! - Reactive primitives (signals, effects) for component-local state
//! - Props decoding from `data-props-*` attributes
//! - Hooks for persisted values, media queries, and the document language
//!
//! # Architecture
//!
//! - `component`: component configuration, instances, and the mount lifecycle
//! - `reactive`: signals, effects, and value identity
//! - `dom`: the element tree, selector engine, and props decoding
//! - `host`: the environment seam (`Host` trait) and the in-memory `Page`
//! - `hooks`: ready-made signals built on the host
//! - `error`: error types
//!
//! # Example
//!
//! ```rust
//! use islet_core::component::{create_component_and_mount, Cleanup};
//! use islet_core::dom::{Document, Element};
//! use islet_core::host::Page;
//!
//! let page = Page::new(Document::with_body([
//!     Element::new("button")
//!         .with_class("counter")
//!         .with_attribute("data-props-start", "3"),
//! ]));
//!
//! let mounted = create_component_and_mount(page.clone(), ".counter", |component| {
//!     let start = component.props().get::<i64>("start").unwrap_or_default();
//!     component.element().set_text(&start.to_string());
//!     Cleanup::new(|| {})
//! })
//! .unwrap();
//!
//! page.run_microtasks();
//! assert!(mounted.is_mounted());
//!
//! mounted.unmount();
//! ```

pub mod component;
pub mod dom;
pub mod error;
pub mod hooks;
pub mod host;
pub mod reactive;

pub use component::{
    create_component, create_component_and_mount, create_single_component, mount, Cleanup,
    ComponentConfig, ComponentInstance, MountResult,
};
pub use error::{ComponentError, ConfigError, MountError};
pub use reactive::{use_effect, use_signal, Effect, Signal};
