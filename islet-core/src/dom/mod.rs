//! Document Model
//!
//! A small in-memory DOM: elements with ordered attributes and parent
//! links, a selector engine for `query_selector`-style lookups, and the
//! `data-props-*` decoding used to build component props.

mod element;
mod props;
mod selector;

pub use element::{Document, Element};
pub use props::{kebab_to_camel_case, parse_value, Props, PROPS_PREFIX};
pub use selector::SelectorList;
