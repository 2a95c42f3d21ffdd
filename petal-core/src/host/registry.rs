//! Tag-name registry for component definitions.

use std::cell::RefCell;
use std::rc::Rc;

use indexmap::IndexMap;

use crate::config::HostConfig;
use crate::error::{Error, Result};
use crate::vdom::RetainedTree;

use super::component::ComponentHost;
use super::definition::ComponentDefinition;

/// Maps custom tag names to their definitions and creates instances.
pub struct Registry<T: RetainedTree + 'static> {
    definitions: IndexMap<String, ComponentDefinition<T>>,
    config: HostConfig,
}

impl<T: RetainedTree + 'static> Registry<T> {
    pub fn new(config: HostConfig) -> Self {
        Self {
            definitions: IndexMap::new(),
            config,
        }
    }

    /// Register `definition` under `name`.
    ///
    /// A name can only be defined once; later definitions are ignored and
    /// `false` is returned.
    pub fn define(&mut self, name: impl Into<String>, definition: ComponentDefinition<T>) -> bool {
        let name = name.into();
        if self.definitions.contains_key(&name) {
            tracing::debug!(%name, "component already defined, keeping the first definition");
            return false;
        }
        tracing::debug!(%name, "component defined");
        self.definitions.insert(name, definition);
        true
    }

    pub fn is_defined(&self, name: &str) -> bool {
        self.definitions.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<&ComponentDefinition<T>> {
        self.definitions.get(name)
    }

    /// Defined names, in definition order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.definitions.keys().map(String::as_str)
    }

    pub fn config(&self) -> &HostConfig {
        &self.config
    }

    /// Construct an instance of the component defined as `name`.
    pub fn create(&self, tree: &Rc<RefCell<T>>, name: &str) -> Result<ComponentHost<T>> {
        let definition = self
            .definitions
            .get(name)
            .ok_or_else(|| Error::UnknownComponent(name.to_string()))?;
        ComponentHost::new(Rc::clone(tree), name, definition, self.config.clone())
    }
}

impl<T: RetainedTree + 'static> Default for Registry<T> {
    fn default() -> Self {
        Self::new(HostConfig::default())
    }
}
