//! Component Host
//!
//! A [`ComponentHost`] is one instance of a component: a host element with
//! an isolated rendering root, the instance's prop signals and hooks, and a
//! render effect that keeps the root's view in sync with reactive state.
//!
//! # Lifecycle
//!
//! ```text
//! Constructed --connect--> Connected <--> Updating
//!                              |
//!                          disconnect
//!                              v
//!                        Disconnected --connect--> Connected
//! ```
//!
//! Every render pass calls the render function for a fresh tree, patches it
//! against the tree retained from the previous pass, then retains the new
//! one. What disconnecting does to the effects depends on the configured
//! [`DisconnectPolicy`].

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use indexmap::{IndexMap, IndexSet};

use crate::config::{DisconnectPolicy, HostConfig};
use crate::error::{Error, Result};
use crate::reactive::{batch, untrack, Effect, EffectScope, Signal};
use crate::vdom::{patch, Namespace, PropValue, RetainedTree, VNode};

use super::context::{Emitter, Hooks, SetupContext};
use super::definition::{ComponentDefinition, RenderFn};

/// Where a host is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostState {
    /// Setup done, nothing rendered yet.
    Constructed,
    /// Rendered and watching its dependencies.
    Connected,
    /// A re-render is being applied.
    Updating,
    /// Detached from the document.
    Disconnected,
}

struct HostInner<T: RetainedTree + 'static> {
    tag: String,
    tree: Rc<RefCell<T>>,
    element: T::Node,
    root: T::Node,
    config: HostConfig,
    definition: ComponentDefinition<T>,
    props: IndexMap<String, Signal<PropValue>>,
    hooks: Hooks,
    render: RenderFn,
    view: RefCell<Option<(Rc<VNode>, T::Node)>>,
    state: Cell<HostState>,
    scope: EffectScope,
    render_effect: RefCell<Option<Effect>>,
    styles: RefCell<IndexSet<String>>,
}

impl<T: RetainedTree + 'static> HostInner<T> {
    fn render_pass(&self) {
        let next = (self.render)();
        let previous = self.view.borrow().clone();
        let updating = previous.is_some() && self.state.get() == HostState::Connected;
        if updating {
            self.state.set(HostState::Updating);
        }

        let result = self.apply(&next, previous);

        if updating {
            self.state.set(HostState::Connected);
        }
        match result {
            Ok(live) => {
                tracing::trace!(tag = %self.tag, "rendered");
                *self.view.borrow_mut() = Some((next, live));
            }
            Err(err) => {
                tracing::error!(tag = %self.tag, error = %err, "render failed, keeping previous view");
            }
        }
    }

    fn apply(&self, next: &Rc<VNode>, previous: Option<(Rc<VNode>, T::Node)>) -> Result<T::Node> {
        let mut tree = self.tree.try_borrow_mut().map_err(|_| Error::TreeBusy)?;
        let (old, live) = match previous {
            Some((old, live)) => (old, Some(live)),
            None => (Rc::clone(next), None),
        };
        patch(&mut *tree, &old, next, &self.root, live.as_ref())
    }

    fn adopt_style(&self, css: &str) -> Result<bool> {
        if self.styles.borrow().contains(css) {
            return Ok(false);
        }
        let mut tree = self.tree.try_borrow_mut().map_err(|_| Error::TreeBusy)?;
        let style = tree.create_element("style", Namespace::Html)?;
        let text = tree.create_text(css)?;
        tree.append_child(&style, &text)?;
        // Stylesheets stay ahead of the rendered view.
        let reference = tree.child_at(&self.root, self.styles.borrow().len());
        tree.insert_before(&self.root, &style, reference.as_ref())?;
        self.styles.borrow_mut().insert(css.to_string());
        Ok(true)
    }

    fn start_render_effect(self: &Rc<Self>) {
        let host: Weak<Self> = Rc::downgrade(self);
        let effect = self.scope.run(|| {
            Effect::new(move || {
                if let Some(host) = host.upgrade() {
                    host.render_pass();
                }
            })
        });
        *self.render_effect.borrow_mut() = Some(effect);
    }
}

impl<T: RetainedTree + 'static> Drop for HostInner<T> {
    fn drop(&mut self) {
        self.scope.stop();
    }
}

/// A live component instance.
pub struct ComponentHost<T: RetainedTree + 'static> {
    inner: Rc<HostInner<T>>,
}

impl<T: RetainedTree + 'static> ComponentHost<T> {
    /// Create the host element and its rendering root, then run setup.
    ///
    /// Nothing is rendered until [`connect`](Self::connect).
    pub fn new(
        tree: Rc<RefCell<T>>,
        tag: &str,
        definition: &ComponentDefinition<T>,
        config: HostConfig,
    ) -> Result<Self> {
        let (element, root) = {
            let mut live = tree.try_borrow_mut().map_err(|_| Error::TreeBusy)?;
            let element = live.create_element(tag, Namespace::Html)?;
            let root = live.attach_shadow(&element)?;
            (element, root)
        };

        let props: IndexMap<String, Signal<PropValue>> = definition
            .observed_attributes()
            .map(|name| (name.to_string(), Signal::new(PropValue::Null)))
            .collect();

        let mut hooks = Hooks::default();
        let scope = EffectScope::new();
        let emitter = Emitter::new(Rc::clone(&tree), element.clone(), config.event_prefix.clone());
        let render = scope.run(|| {
            untrack(|| {
                let mut cx = SetupContext::new(&props, &mut hooks, emitter);
                definition.setup(&mut cx)
            })
        });

        tracing::debug!(tag, "component constructed");
        Ok(Self {
            inner: Rc::new(HostInner {
                tag: tag.to_string(),
                tree,
                element,
                root,
                config,
                definition: definition.clone(),
                props,
                hooks,
                render,
                view: RefCell::new(None),
                state: Cell::new(HostState::Constructed),
                scope,
                render_effect: RefCell::new(None),
                styles: RefCell::new(IndexSet::new()),
            }),
        })
    }

    /// Attach to the document: inject styles, render (or resume rendering)
    /// and run the connected hooks. Connecting twice is a no-op.
    pub fn connect(&self) -> Result<()> {
        let inner = &self.inner;
        if matches!(inner.state.get(), HostState::Connected | HostState::Updating) {
            return Ok(());
        }

        for css in inner.definition.styles() {
            inner.adopt_style(css)?;
        }
        inner.state.set(HostState::Connected);
        if inner.render_effect.borrow().is_none() {
            inner.start_render_effect();
        }

        tracing::debug!(tag = %inner.tag, "component connected");
        for hook in &inner.hooks.connected {
            hook();
        }
        Ok(())
    }

    /// Detach from the document and run the disconnected hooks.
    ///
    /// Under [`DisconnectPolicy::StopEffects`] every effect of the instance
    /// is stopped; the retained view is kept for the next connect.
    pub fn disconnect(&self) {
        let inner = &self.inner;
        if !matches!(inner.state.get(), HostState::Connected | HostState::Updating) {
            return;
        }
        inner.state.set(HostState::Disconnected);

        if inner.config.disconnect_policy == DisconnectPolicy::StopEffects {
            inner.scope.stop();
            inner.render_effect.borrow_mut().take();
        }

        tracing::debug!(tag = %inner.tag, policy = ?inner.config.disconnect_policy, "component disconnected");
        for hook in &inner.hooks.disconnected {
            hook();
        }
    }

    /// The host moved to another document.
    pub fn adopt(&self) {
        for hook in &self.inner.hooks.adopted {
            hook();
        }
    }

    /// Write (or with `None`, remove) an attribute on the host element and
    /// notify the component if the attribute is observed.
    pub fn set_attribute(&self, name: &str, value: Option<&str>) -> Result<()> {
        let old = {
            let mut tree = self.inner.tree.try_borrow_mut().map_err(|_| Error::TreeBusy)?;
            let old = tree.attribute(&self.inner.element, name);
            match value {
                Some(value) => tree.set_attribute(&self.inner.element, name, value)?,
                None if old.is_some() => tree.remove_attribute(&self.inner.element, name)?,
                None => {}
            }
            old
        };
        self.attribute_changed(name, old.as_deref(), value);
        Ok(())
    }

    /// Observed-attribute callback: convert the new value into the prop
    /// signal, then run the attribute hooks. Unobserved names are ignored.
    pub fn attribute_changed(&self, name: &str, old: Option<&str>, new: Option<&str>) {
        let inner = &self.inner;
        if !inner.definition.is_observed(name) {
            return;
        }
        let value = inner.definition.convert(name, new);
        batch(|| {
            if let Some(signal) = inner.props.get(name) {
                signal.set(value);
            }
            for hook in &inner.hooks.attribute_changed {
                hook(name, old, new);
            }
        });
    }

    /// Inject a stylesheet into the rendering root. Returns `false` if the
    /// same text was already injected.
    pub fn adopt_style(&self, css: &str) -> Result<bool> {
        self.inner.adopt_style(css)
    }

    pub fn tag(&self) -> &str {
        &self.inner.tag
    }

    pub fn state(&self) -> HostState {
        self.inner.state.get()
    }

    /// The host element.
    pub fn element(&self) -> &T::Node {
        &self.inner.element
    }

    /// The rendering root attached to the host element.
    pub fn root(&self) -> &T::Node {
        &self.inner.root
    }

    pub fn config(&self) -> &HostConfig {
        &self.inner.config
    }

    /// Signal for the observed attribute `name`.
    pub fn prop(&self, name: &str) -> Option<Signal<PropValue>> {
        self.inner.props.get(name).cloned()
    }

    /// The tree retained from the last successful render.
    pub fn view(&self) -> Option<Rc<VNode>> {
        self.inner.view.borrow().as_ref().map(|(vnode, _)| Rc::clone(vnode))
    }

    /// The live node holding the rendered view.
    pub fn live_view(&self) -> Option<T::Node> {
        self.inner.view.borrow().as_ref().map(|(_, live)| live.clone())
    }

    /// Whether a render effect is currently watching.
    pub fn is_rendering(&self) -> bool {
        self.inner
            .render_effect
            .borrow()
            .as_ref()
            .is_some_and(|effect| !effect.is_stopped())
    }

    /// Number of render passes run by the current render effect.
    pub fn render_count(&self) -> usize {
        self.inner
            .render_effect
            .borrow()
            .as_ref()
            .map_or(0, Effect::run_count)
    }

    pub fn emitter(&self) -> Emitter<T> {
        Emitter::new(
            Rc::clone(&self.inner.tree),
            self.inner.element.clone(),
            self.inner.config.event_prefix.clone(),
        )
    }
}

impl<T: RetainedTree + 'static> Clone for ComponentHost<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: RetainedTree + 'static> fmt::Debug for ComponentHost<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentHost")
            .field("tag", &self.inner.tag)
            .field("state", &self.inner.state.get())
            .field("element", &self.inner.element)
            .finish()
    }
}
