//! Reactive Primitives
//!
//! This module implements the small reactive system components use for
//! local state: signals and effects.
//!
//! # Concepts
//!
//! ## Signals
//!
//! A Signal is a container for mutable state with an explicit subscriber
//! list. Setting a value that differs from the current one calls every
//! subscriber synchronously, in registration order. "Differs" means not
//! [`Identical`]: plain equality for scalars and strings, NaN equal to
//! itself, pointer identity for `Arc`.
//!
//! ## Effects
//!
//! An Effect is a side-effecting callback with an explicit dependency list.
//! It runs once when created and again whenever one of its signals changes,
//! calling the cleanup returned by its previous run first.
//!
//! # Implementation Notes
//!
//! There is no automatic dependency tracking: dependencies are exactly the
//! signals handed to [`Effect::new`]. Nothing is scheduled or batched, so
//! every change is observed before `set` returns.

mod effect;
mod identity;
mod signal;
mod subscriber;

pub use effect::{use_effect, Effect, Watch};
pub use identity::Identical;
pub use signal::{use_signal, Signal};
pub use subscriber::{SubscriberId, Subscription};
