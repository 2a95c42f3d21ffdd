//! Retained Trees
//!
//! [`RetainedTree`] is the capability set the reconciler needs from a live
//! tree: create nodes, edit attributes and listeners, and move children
//! around. The same mount and patch code drives any implementation, such as
//! the in-memory [`MemoryTree`](super::MemoryTree) used by tests and
//! headless rendering.

use std::cell::{Cell, RefCell};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::Result;

use super::vnode::Handler;

/// Element namespace.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Namespace {
    #[default]
    Html,
    Svg,
    MathMl,
}

impl Namespace {
    pub fn uri(self) -> &'static str {
        match self {
            Namespace::Html => "http://www.w3.org/1999/xhtml",
            Namespace::Svg => "http://www.w3.org/2000/svg",
            Namespace::MathMl => "http://www.w3.org/1998/Math/MathML",
        }
    }
}

/// Standard event options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventInit {
    /// Continue to ancestors after the target.
    pub bubbles: bool,
    /// Cross shadow-root boundaries while bubbling.
    pub composed: bool,
    /// Allow handlers to cancel the default action.
    pub cancelable: bool,
}

/// An event delivered to listeners.
pub struct Event {
    name: String,
    detail: serde_json::Value,
    init: EventInit,
    default_prevented: Cell<bool>,
    propagation_stopped: Cell<bool>,
}

impl Event {
    pub fn new(name: impl Into<String>, detail: serde_json::Value, init: EventInit) -> Self {
        Self {
            name: name.into(),
            detail,
            init,
            default_prevented: Cell::new(false),
            propagation_stopped: Cell::new(false),
        }
    }

    /// A plain event with no payload that does not bubble.
    pub fn simple(name: impl Into<String>) -> Self {
        Self::new(name, serde_json::Value::Null, EventInit::default())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn detail(&self) -> &serde_json::Value {
        &self.detail
    }

    pub fn init(&self) -> EventInit {
        self.init
    }

    /// Cancel the default action. Ignored unless the event is cancelable.
    pub fn prevent_default(&self) {
        if self.init.cancelable {
            self.default_prevented.set(true);
        }
    }

    pub fn default_prevented(&self) -> bool {
        self.default_prevented.get()
    }

    /// Stop bubbling after the current node's listeners.
    pub fn stop_propagation(&self) {
        self.propagation_stopped.set(true);
    }
}

impl fmt::Debug for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Event")
            .field("name", &self.name)
            .field("detail", &self.detail)
            .field("init", &self.init)
            .field("default_prevented", &self.default_prevented.get())
            .finish()
    }
}

/// A retained-mode tree the reconciler can mutate.
///
/// Container nodes are elements, fragments and shadow roots. Text and
/// placeholder nodes hold no children.
pub trait RetainedTree {
    /// Handle to a live node.
    type Node: Clone + PartialEq + fmt::Debug + 'static;

    fn create_element(&mut self, tag: &str, namespace: Namespace) -> Result<Self::Node>;
    fn create_text(&mut self, text: &str) -> Result<Self::Node>;

    /// A zero-content node standing in for absent content.
    fn create_placeholder(&mut self) -> Result<Self::Node>;

    /// A grouping node that holds children and nothing else.
    fn create_fragment(&mut self) -> Result<Self::Node>;

    /// Namespace of an element; `None` for every other node.
    fn namespace(&self, node: &Self::Node) -> Option<Namespace>;

    fn set_text(&mut self, node: &Self::Node, text: &str) -> Result<()>;

    fn attribute(&self, node: &Self::Node, name: &str) -> Option<String>;
    fn set_attribute(&mut self, node: &Self::Node, name: &str, value: &str) -> Result<()>;
    fn remove_attribute(&mut self, node: &Self::Node, name: &str) -> Result<()>;

    fn add_listener(&mut self, node: &Self::Node, event: &str, handler: Handler) -> Result<()>;

    /// Remove one listener, matched by handler identity.
    fn remove_listener(&mut self, node: &Self::Node, event: &str, handler: &Handler) -> Result<()>;

    /// Listeners registered on `node` for `event`, in registration order.
    fn listeners(&self, node: &Self::Node, event: &str) -> Vec<Handler>;

    /// Insert `child` before `reference`, or at the end when `reference` is
    /// `None`. A child that is already attached somewhere is moved.
    fn insert_before(
        &mut self,
        parent: &Self::Node,
        child: &Self::Node,
        reference: Option<&Self::Node>,
    ) -> Result<()>;

    fn append_child(&mut self, parent: &Self::Node, child: &Self::Node) -> Result<()> {
        self.insert_before(parent, child, None)
    }

    /// Append several children as one batched insertion.
    fn append_children(&mut self, parent: &Self::Node, children: Vec<Self::Node>) -> Result<()> {
        for child in &children {
            self.append_child(parent, child)?;
        }
        Ok(())
    }

    /// Detach `child` from `parent`. The removed subtree is discarded.
    fn remove_child(&mut self, parent: &Self::Node, child: &Self::Node) -> Result<()>;

    /// Put `new` where `old` is. The old subtree is discarded.
    fn replace_child(&mut self, parent: &Self::Node, new: &Self::Node, old: &Self::Node) -> Result<()>;

    fn child_at(&self, parent: &Self::Node, index: usize) -> Option<Self::Node>;
    fn child_count(&self, parent: &Self::Node) -> usize;
    fn parent(&self, node: &Self::Node) -> Option<Self::Node>;

    /// Attach an isolated rendering root to an element.
    fn attach_shadow(&mut self, host: &Self::Node) -> Result<Self::Node>;

    /// The element a shadow root is attached to.
    fn shadow_host(&self, root: &Self::Node) -> Option<Self::Node>;
}

/// Deliver `event` to `target`, then bubble through its ancestors.
///
/// Bubbling stops at a shadow root unless the event is composed, in which
/// case it continues at the root's host. Listeners run with the tree
/// unborrowed, so they may mutate it. Returns `false` if a listener
/// cancelled the event.
pub fn dispatch_event<T: RetainedTree>(tree: &RefCell<T>, target: &T::Node, event: &Event) -> bool {
    let mut current = Some(target.clone());
    while let Some(node) = current {
        let handlers = tree.borrow().listeners(&node, event.name());
        for handler in handlers {
            handler(event);
        }
        if !event.init.bubbles || event.propagation_stopped.get() {
            break;
        }
        let live = tree.borrow();
        current = live.parent(&node).or_else(|| {
            if event.init.composed {
                live.shadow_host(&node)
            } else {
                None
            }
        });
    }
    !event.default_prevented()
}
