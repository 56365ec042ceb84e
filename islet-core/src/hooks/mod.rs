//! Hooks
//!
//! Ready-made signals for common browser state: persisted values, media
//! queries, the preferred color scheme, and the document language. Each
//! takes the piece of the host it reads from explicitly.

mod document_language;
mod local_storage;
mod media_query;

pub use document_language::use_document_language;
pub use local_storage::{use_local_storage, LocalStorage};
pub use media_query::{use_media_query, use_preferred_color_scheme, ColorScheme};
