//! In-memory element tree.
//!
//! Elements are shared handles: cloning an [`Element`] yields another
//! handle to the same node, and [`Element::ptr_eq`] compares node identity.
//! Each node keeps a weak link to its parent so selectors with ancestor
//! combinators can be matched from the element outwards.

use std::fmt;
use std::sync::{Arc, Weak};

use indexmap::IndexMap;
use parking_lot::RwLock;

use super::selector::SelectorList;
use crate::error::{DomError, SelectorError};

struct Node {
    tag: String,
    attributes: RwLock<IndexMap<String, String>>,
    children: RwLock<Vec<Element>>,
    parent: RwLock<Weak<Node>>,
    text: RwLock<String>,
}

/// Handle to an element node.
#[derive(Clone)]
pub struct Element(Arc<Node>);

impl Element {
    /// Create a detached element. Tag names are stored lowercase.
    pub fn new(tag: &str) -> Self {
        Self(Arc::new(Node {
            tag: tag.to_ascii_lowercase(),
            attributes: RwLock::new(IndexMap::new()),
            children: RwLock::new(Vec::new()),
            parent: RwLock::new(Weak::new()),
            text: RwLock::new(String::new()),
        }))
    }

    /// Builder form of [`Element::set_attribute`].
    pub fn with_attribute(self, name: &str, value: &str) -> Self {
        self.set_attribute(name, value);
        self
    }

    /// Builder shorthand for adding one class.
    pub fn with_class(self, class: &str) -> Self {
        let classes = match self.attribute("class") {
            Some(existing) if !existing.is_empty() => format!("{existing} {class}"),
            _ => class.to_string(),
        };
        self.set_attribute("class", &classes);
        self
    }

    pub fn with_id(self, id: &str) -> Self {
        self.set_attribute("id", id);
        self
    }

    pub fn with_text(self, text: &str) -> Self {
        *self.0.text.write() = text.to_string();
        self
    }

    /// Builder form of [`Element::append_child`]. A child that would
    /// create a cycle is skipped with a warning.
    pub fn with_child(self, child: Element) -> Self {
        self.append_or_warn(child);
        self
    }

    pub fn with_children(self, children: impl IntoIterator<Item = Element>) -> Self {
        for child in children {
            self.append_or_warn(child);
        }
        self
    }

    fn append_or_warn(&self, child: Element) {
        if let Err(error) = self.append_child(child) {
            tracing::warn!(%error, "child not appended");
        }
    }

    pub fn tag(&self) -> &str {
        &self.0.tag
    }

    pub fn id(&self) -> Option<String> {
        self.attribute("id")
    }

    /// Attribute names are case-insensitive and stored lowercase.
    pub fn attribute(&self, name: &str) -> Option<String> {
        self.0
            .attributes
            .read()
            .get(&name.to_ascii_lowercase())
            .cloned()
    }

    pub fn has_attribute(&self, name: &str) -> bool {
        self.0
            .attributes
            .read()
            .contains_key(&name.to_ascii_lowercase())
    }

    pub fn set_attribute(&self, name: &str, value: &str) {
        self.0
            .attributes
            .write()
            .insert(name.to_ascii_lowercase(), value.to_string());
    }

    pub fn remove_attribute(&self, name: &str) -> Option<String> {
        self.0
            .attributes
            .write()
            .shift_remove(&name.to_ascii_lowercase())
    }

    /// All attributes in the order they were first set.
    pub fn attributes(&self) -> Vec<(String, String)> {
        self.0
            .attributes
            .read()
            .iter()
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect()
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.0
            .attributes
            .read()
            .get("class")
            .is_some_and(|classes| classes.split_ascii_whitespace().any(|c| c == class))
    }

    pub fn text(&self) -> String {
        self.0.text.read().clone()
    }

    pub fn set_text(&self, text: &str) {
        *self.0.text.write() = text.to_string();
    }

    pub fn parent(&self) -> Option<Element> {
        self.0.parent.read().upgrade().map(Element)
    }

    pub fn children(&self) -> Vec<Element> {
        self.0.children.read().clone()
    }

    /// Append `child`, detaching it from any previous parent first.
    ///
    /// Fails when `child` is this element or one of its ancestors.
    pub fn append_child(&self, child: Element) -> Result<(), DomError> {
        if child.is_inclusive_ancestor_of(self) {
            return Err(DomError::HierarchyRequest {
                parent: self.tag().to_string(),
                child: child.tag().to_string(),
            });
        }
        child.detach();
        *child.0.parent.write() = Arc::downgrade(&self.0);
        self.0.children.write().push(child);
        Ok(())
    }

    fn is_inclusive_ancestor_of(&self, other: &Element) -> bool {
        let mut current = Some(other.clone());
        while let Some(element) = current {
            if element.ptr_eq(self) {
                return true;
            }
            current = element.parent();
        }
        false
    }

    /// Remove this element from its parent, if it has one.
    pub fn detach(&self) {
        let parent = std::mem::take(&mut *self.0.parent.write());
        if let Some(parent) = parent.upgrade() {
            parent
                .children
                .write()
                .retain(|sibling| !Arc::ptr_eq(&sibling.0, &self.0));
        }
    }

    /// Replace every child with `children`.
    ///
    /// Stops at the first child that would create a cycle; children before
    /// it stay appended.
    pub fn replace_children(&self, children: impl IntoIterator<Item = Element>) -> Result<(), DomError> {
        let previous = std::mem::take(&mut *self.0.children.write());
        for child in previous {
            *child.0.parent.write() = Weak::new();
        }
        for child in children {
            self.append_child(child)?;
        }
        Ok(())
    }

    /// Whether both handles refer to the same node.
    pub fn ptr_eq(&self, other: &Element) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    /// Test this element against a parsed selector.
    pub fn matches(&self, selector: &SelectorList) -> bool {
        selector.matches(self)
    }

    /// First descendant matching `selector`, in document order.
    pub fn query_selector(&self, selector: &str) -> Result<Option<Element>, SelectorError> {
        let selector = SelectorList::parse(selector)?;
        Ok(self.find_first(&selector))
    }

    /// All descendants matching `selector`, in document order.
    pub fn query_selector_all(&self, selector: &str) -> Result<Vec<Element>, SelectorError> {
        let selector = SelectorList::parse(selector)?;
        Ok(self.find_all(&selector))
    }

    pub(crate) fn find_first(&self, selector: &SelectorList) -> Option<Element> {
        let mut found = None;
        self.walk_descendants(&mut |element| {
            if selector.matches(element) {
                found = Some(element.clone());
                false
            } else {
                true
            }
        });
        found
    }

    pub(crate) fn find_all(&self, selector: &SelectorList) -> Vec<Element> {
        let mut found = Vec::new();
        self.walk_descendants(&mut |element| {
            if selector.matches(element) {
                found.push(element.clone());
            }
            true
        });
        found
    }

    /// Pre-order walk over descendants. `visit` returns `false` to stop.
    fn walk_descendants(&self, visit: &mut dyn FnMut(&Element) -> bool) -> bool {
        for child in self.children() {
            if !visit(&child) || !child.walk_descendants(visit) {
                return false;
            }
        }
        true
    }
}

impl PartialEq for Element {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl Eq for Element {}

impl fmt::Debug for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{}", self.tag())?;
        for (name, value) in self.attributes() {
            write!(f, " {name}={value:?}")?;
        }
        write!(f, ">")
    }
}

/// A document: an `<html>` root with a `<body>`.
#[derive(Clone, Debug)]
pub struct Document {
    root: Element,
    body: Element,
}

impl Document {
    pub fn new() -> Self {
        let body = Element::new("body");
        let root = Element::new("html").with_child(body.clone());
        Self { root, body }
    }

    /// Document whose body holds `children`.
    pub fn with_body(children: impl IntoIterator<Item = Element>) -> Self {
        let document = Self::new();
        for child in children {
            document.body.append_or_warn(child);
        }
        document
    }

    /// The root `<html>` element.
    pub fn document_element(&self) -> &Element {
        &self.root
    }

    pub fn body(&self) -> &Element {
        &self.body
    }

    pub fn query_selector(&self, selector: &str) -> Result<Option<Element>, SelectorError> {
        let selector = SelectorList::parse(selector)?;
        Ok(self.select_first(&selector))
    }

    pub fn query_selector_all(&self, selector: &str) -> Result<Vec<Element>, SelectorError> {
        let selector = SelectorList::parse(selector)?;
        Ok(self.select_all(&selector))
    }

    /// First element matching `selector`, root included, in document order.
    pub fn select_first(&self, selector: &SelectorList) -> Option<Element> {
        if selector.matches(&self.root) {
            return Some(self.root.clone());
        }
        self.root.find_first(selector)
    }

    /// Every element matching `selector`, root included, in document order.
    pub fn select_all(&self, selector: &SelectorList) -> Vec<Element> {
        let mut found = Vec::new();
        if selector.matches(&self.root) {
            found.push(self.root.clone());
        }
        found.extend(self.root.find_all(selector));
        found
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}
