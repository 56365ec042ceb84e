//! Component configuration.

use std::fmt;
use std::sync::Arc;

use super::cleanup::{Cleanup, ComponentOutput};
use super::instance::ComponentInstance;
use crate::dom::SelectorList;
use crate::error::{CallbackError, ConfigError, SelectorError};

/// Type-erased component callback.
pub type ComponentCallback =
    Arc<dyn Fn(&ComponentInstance) -> Result<Option<Cleanup>, CallbackError> + Send + Sync>;

/// A validated selector paired with the callback run for each match.
#[derive(Clone)]
pub struct ComponentConfig {
    selector: SelectorList,
    callback: ComponentCallback,
}

impl ComponentConfig {
    pub fn selector(&self) -> &str {
        self.selector.as_str()
    }

    pub fn selector_list(&self) -> &SelectorList {
        &self.selector
    }

    pub fn callback(&self) -> &ComponentCallback {
        &self.callback
    }

    pub(crate) fn invoke(
        &self,
        instance: &ComponentInstance,
    ) -> Result<Option<Cleanup>, CallbackError> {
        (self.callback)(instance)
    }
}

impl fmt::Debug for ComponentConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentConfig")
            .field("selector", &self.selector())
            .finish_non_exhaustive()
    }
}

/// Validate `selector` and pair it with `callback`.
///
/// Fails on an empty or unparsable selector.
///
/// # Example
///
/// ```rust
/// use islet_core::component::{create_component, Cleanup};
///
/// let counter = create_component(".counter", |component| {
///     let start: i64 = component.props().get("start").unwrap_or(0);
///     println!("counter starts at {start}");
///     Cleanup::new(|| println!("counter removed"))
/// })
/// .unwrap();
///
/// assert_eq!(counter.selector(), ".counter");
/// ```
pub fn create_component<F, R>(selector: &str, callback: F) -> Result<ComponentConfig, ConfigError>
where
    F: Fn(&ComponentInstance) -> R + Send + Sync + 'static,
    R: ComponentOutput,
{
    if selector.trim().is_empty() {
        return Err(ConfigError::EmptySelector);
    }
    let parsed = SelectorList::parse(selector).map_err(|source| match source {
        SelectorError::Empty => ConfigError::EmptySelector,
        source => ConfigError::InvalidSelector {
            selector: selector.to_string(),
            source,
        },
    })?;

    Ok(ComponentConfig {
        selector: parsed,
        callback: Arc::new(move |instance: &ComponentInstance| callback(instance).into_outcome()),
    })
}
