//! Component definitions: observed attributes, styles and the setup function.

use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;

use crate::vdom::{PropValue, RetainedTree, VNode};

use super::context::SetupContext;

/// Turns an incoming attribute string into a typed prop value.
pub type Converter = Rc<dyn Fn(&str) -> PropValue>;

/// Produces a fresh VNode tree from component state. Called once per
/// render pass, inside the host's render effect.
pub type RenderFn = Box<dyn Fn() -> Rc<VNode>>;

type SetupFn<T> = Rc<dyn Fn(&mut SetupContext<'_, T>) -> RenderFn>;

/// Everything needed to instantiate a component.
///
/// # Example
///
/// ```rust
/// use std::rc::Rc;
///
/// use petal_core::host::{ComponentDefinition, RenderFn};
/// use petal_core::vdom::{MemoryTree, PropValue, VNode};
///
/// let counter = ComponentDefinition::<MemoryTree>::new(|cx| {
///     let start = cx.prop("start").expect("observed attribute");
///     let render: RenderFn = Box::new(move || {
///         let label = format!("{:?}", start.get());
///         Rc::new(VNode::element("span").child(label))
///     });
///     render
/// })
/// .attribute_with("start", |raw| PropValue::Int(raw.parse().unwrap_or(0)))
/// .style(":host { display: inline-block }");
///
/// assert_eq!(counter.observed_attributes().count(), 1);
/// ```
pub struct ComponentDefinition<T: RetainedTree + 'static> {
    observed: IndexMap<String, Option<Converter>>,
    styles: Vec<String>,
    setup: SetupFn<T>,
}

impl<T: RetainedTree + 'static> ComponentDefinition<T> {
    /// Create a definition from its setup function.
    ///
    /// Setup runs once per instance. It registers lifecycle hooks, reads or
    /// creates reactive state, and returns the render function.
    pub fn new(setup: impl Fn(&mut SetupContext<'_, T>) -> RenderFn + 'static) -> Self {
        Self {
            observed: IndexMap::new(),
            styles: Vec::new(),
            setup: Rc::new(setup),
        }
    }

    /// Observe an attribute, passing its raw string through.
    pub fn attribute(mut self, name: impl Into<String>) -> Self {
        self.observed.insert(name.into(), None);
        self
    }

    /// Observe an attribute, converting it with `converter`.
    pub fn attribute_with(mut self, name: impl Into<String>, converter: impl Fn(&str) -> PropValue + 'static) -> Self {
        self.observed.insert(name.into(), Some(Rc::new(converter)));
        self
    }

    /// Add a stylesheet injected into every instance's rendering root.
    pub fn style(mut self, css: impl Into<String>) -> Self {
        self.styles.push(css.into());
        self
    }

    pub fn observed_attributes(&self) -> impl Iterator<Item = &str> {
        self.observed.keys().map(String::as_str)
    }

    pub fn is_observed(&self, name: &str) -> bool {
        self.observed.contains_key(name)
    }

    pub fn styles(&self) -> &[String] {
        &self.styles
    }

    /// Convert an attribute value for the observed attribute `name`.
    /// Removal becomes `Null`; without a converter the raw string passes
    /// through.
    pub fn convert(&self, name: &str, raw: Option<&str>) -> PropValue {
        let Some(raw) = raw else {
            return PropValue::Null;
        };
        match self.observed.get(name) {
            Some(Some(converter)) => converter(raw),
            _ => PropValue::Str(raw.to_string()),
        }
    }

    pub(crate) fn setup(&self, cx: &mut SetupContext<'_, T>) -> RenderFn {
        (self.setup)(cx)
    }
}

impl<T: RetainedTree + 'static> Clone for ComponentDefinition<T> {
    fn clone(&self) -> Self {
        Self {
            observed: self.observed.clone(),
            styles: self.styles.clone(),
            setup: Rc::clone(&self.setup),
        }
    }
}

impl<T: RetainedTree + 'static> fmt::Debug for ComponentDefinition<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentDefinition")
            .field("observed", &self.observed.keys().collect::<Vec<_>>())
            .field("styles", &self.styles.len())
            .finish()
    }
}
