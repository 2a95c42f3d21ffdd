//! Setup context handed to a component's setup function, and the event
//! emitter components use to talk to the outside world.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;

use crate::reactive::Signal;
use crate::vdom::{dispatch_event, Event, EventInit, PropValue, RetainedTree};

pub(crate) type Hook = Rc<dyn Fn()>;
pub(crate) type AttributeHook = Rc<dyn Fn(&str, Option<&str>, Option<&str>)>;

/// Lifecycle callbacks registered during setup.
#[derive(Default, Clone)]
pub(crate) struct Hooks {
    pub(crate) connected: Vec<Hook>,
    pub(crate) disconnected: Vec<Hook>,
    pub(crate) attribute_changed: Vec<AttributeHook>,
    pub(crate) adopted: Vec<Hook>,
}

/// Emits named events from a host element.
pub struct Emitter<T: RetainedTree + 'static> {
    tree: Rc<RefCell<T>>,
    target: T::Node,
    prefix: String,
}

impl<T: RetainedTree + 'static> Emitter<T> {
    pub(crate) fn new(tree: Rc<RefCell<T>>, target: T::Node, prefix: String) -> Self {
        Self { tree, target, prefix }
    }

    /// Dispatch `name` (with the configured prefix) from the host element.
    ///
    /// Returns `false` if a listener cancelled the event.
    pub fn emit(&self, name: &str, detail: serde_json::Value, init: EventInit) -> bool {
        let event = Event::new(self.event_name(name), detail, init);
        tracing::trace!(event = event.name(), "emitting");
        dispatch_event(&self.tree, &self.target, &event)
    }

    /// Full name under which `name` is emitted.
    pub fn event_name(&self, name: &str) -> String {
        format!("{}{}", self.prefix, name)
    }
}

impl<T: RetainedTree + 'static> Clone for Emitter<T> {
    fn clone(&self) -> Self {
        Self {
            tree: Rc::clone(&self.tree),
            target: self.target.clone(),
            prefix: self.prefix.clone(),
        }
    }
}

impl<T: RetainedTree + 'static> fmt::Debug for Emitter<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Emitter")
            .field("target", &self.target)
            .field("prefix", &self.prefix)
            .finish()
    }
}

/// What a setup function can see and register.
///
/// Hooks must be registered here; there is no way to add them after setup.
pub struct SetupContext<'a, T: RetainedTree + 'static> {
    props: &'a IndexMap<String, Signal<PropValue>>,
    hooks: &'a mut Hooks,
    emitter: Emitter<T>,
}

impl<'a, T: RetainedTree + 'static> SetupContext<'a, T> {
    pub(crate) fn new(props: &'a IndexMap<String, Signal<PropValue>>, hooks: &'a mut Hooks, emitter: Emitter<T>) -> Self {
        Self { props, hooks, emitter }
    }

    /// Signal tracking the observed attribute `name`.
    pub fn prop(&self, name: &str) -> Option<Signal<PropValue>> {
        self.props.get(name).cloned()
    }

    /// Every observed attribute, in declaration order.
    pub fn props(&self) -> impl Iterator<Item = (&str, &Signal<PropValue>)> {
        self.props.iter().map(|(name, signal)| (name.as_str(), signal))
    }

    /// Run after the host is connected and has rendered.
    pub fn on_connected(&mut self, hook: impl Fn() + 'static) {
        self.hooks.connected.push(Rc::new(hook));
    }

    pub fn on_disconnected(&mut self, hook: impl Fn() + 'static) {
        self.hooks.disconnected.push(Rc::new(hook));
    }

    /// Run after an observed attribute changed, with its name, old and new
    /// values.
    pub fn on_attribute_changed(&mut self, hook: impl Fn(&str, Option<&str>, Option<&str>) + 'static) {
        self.hooks.attribute_changed.push(Rc::new(hook));
    }

    pub fn on_adopted(&mut self, hook: impl Fn() + 'static) {
        self.hooks.adopted.push(Rc::new(hook));
    }

    /// Emitter bound to the host element.
    pub fn emitter(&self) -> Emitter<T> {
        self.emitter.clone()
    }

    /// Shorthand for `self.emitter().emit(..)`.
    pub fn emit(&self, name: &str, detail: serde_json::Value, init: EventInit) -> bool {
        self.emitter.emit(name, detail, init)
    }
}
