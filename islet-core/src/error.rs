//! Error types.
//!
//! Configuration problems are reported synchronously when a component is
//! created. Failures that happen later, inside the mount lifecycle, are
//! either isolated and logged (callbacks, cleanups) or surface through a
//! rejected mount completion.

use thiserror::Error;

/// Error type returned by a failing component callback.
pub type CallbackError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// A selector string could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SelectorError {
    #[error("selector is empty")]
    Empty,

    #[error("unexpected character {found:?} at offset {offset}")]
    UnexpectedChar { found: char, offset: usize },

    #[error("unexpected end of selector")]
    UnexpectedEnd,

    #[error("unterminated attribute selector starting at offset {offset}")]
    UnterminatedAttribute { offset: usize },
}

/// A tree mutation was refused.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomError {
    #[error("cannot insert <{child}> into <{parent}>: it is the parent or one of its ancestors")]
    HierarchyRequest { parent: String, child: String },
}

/// Invalid component configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("component selector must be a non-empty string")]
    EmptySelector,

    #[error("invalid component selector {selector:?}: {source}")]
    InvalidSelector {
        selector: String,
        #[source]
        source: SelectorError,
    },
}

/// The collection step of a mount failed.
///
/// This is `Clone` so a settled completion can hand the same error to
/// every awaiter.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MountError {
    #[error("host for selector {selector:?} was dropped before initialization")]
    HostUnavailable { selector: String },

    #[error("mounting selector {selector:?} panicked: {message}")]
    Panicked { selector: String, message: String },
}

/// Errors from the one-shot component helpers.
#[derive(Debug, Error)]
pub enum ComponentError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("component callback for selector {selector:?} failed: {source}")]
    Callback {
        selector: String,
        #[source]
        source: CallbackError,
    },
}

/// A storage area refused a read or write.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage quota exceeded while writing {key:?}")]
    QuotaExceeded { key: String },

    #[error("storage is unavailable")]
    Unavailable,

    #[error("stored value for {key:?} is not valid JSON: {source}")]
    Serialization {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Extract a readable message from a caught panic payload.
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&'static str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
