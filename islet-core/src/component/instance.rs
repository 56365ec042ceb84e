//! Component instances.
//!
//! An instance is the read-only view a component callback receives: the
//! bound element, its decoded props, and lookups scoped to the element's
//! subtree. Instances are built fresh for every initialization and are not
//! kept afterwards, so props reflect the attributes at that moment only.

use crate::dom::{Element, Props};
use crate::error::SelectorError;

/// The element a component callback is bound to.
#[derive(Debug, Clone)]
pub struct ComponentInstance {
    element: Element,
    props: Props,
}

impl ComponentInstance {
    /// Build an instance for `element`, decoding its `data-props-*`
    /// attributes.
    pub fn new(element: Element) -> Self {
        let props = Props::from_element(&element);
        Self { element, props }
    }

    pub fn element(&self) -> &Element {
        &self.element
    }

    pub fn props(&self) -> &Props {
        &self.props
    }

    /// First descendant of the element matching `selector`.
    pub fn query_selector(&self, selector: &str) -> Result<Option<Element>, SelectorError> {
        self.element.query_selector(selector)
    }

    /// Every descendant of the element matching `selector`.
    pub fn query_selector_all(&self, selector: &str) -> Result<Vec<Element>, SelectorError> {
        self.element.query_selector_all(selector)
    }
}

/// Build a [`ComponentInstance`] for `element`.
pub fn create_instance(element: &Element) -> ComponentInstance {
    ComponentInstance::new(element.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn exposes_element_props_and_scoped_queries() {
        let child = Element::new("span").with_class("child");
        let element = Element::new("div")
            .with_class("test-component")
            .with_attribute("data-props-name", "test")
            .with_attribute("data-props-count", "42")
            .with_child(child.clone());
        // A sibling outside the element must not be found.
        let _outside = Element::new("section")
            .with_child(element.clone())
            .with_child(Element::new("span").with_class("child"));

        let instance = create_instance(&element);

        assert!(instance.element().ptr_eq(&element));
        assert_eq!(instance.props().to_value(), json!({"name": "test", "count": 42}));
        assert_eq!(instance.query_selector(".child").unwrap(), Some(child));
        assert_eq!(instance.query_selector_all(".child").unwrap().len(), 1);
    }

    #[test]
    fn props_are_a_snapshot() {
        let element = Element::new("div").with_attribute("data-props-step", "1");
        let instance = create_instance(&element);

        element.set_attribute("data-props-step", "2");
        assert_eq!(instance.props().get::<i64>("step"), Some(1));
        assert_eq!(create_instance(&element).props().get::<i64>("step"), Some(2));
    }
}
