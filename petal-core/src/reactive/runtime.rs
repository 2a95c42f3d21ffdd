//! Reactive Runtime
//!
//! The runtime is the central coordinator that connects signals, computeds
//! and effects. It owns the dependency graph, the effect queue and the
//! active-subscriber slot for the current thread.
//!
//! # How It Works
//!
//! 1. When a computed or effect reads a signal, the runtime links the signal
//!    to the active subscriber.
//!
//! 2. When a signal's value changes, the runtime:
//!    a. Propagates `DIRTY` / `PENDING_COMPUTED` marks through the graph
//!    b. Queues every effect it reached
//!    c. Drains the queue, unless a batch is open
//!
//! 3. A pending subscriber is only confirmed dirty after `check_dirty` walks
//!    its dependencies and some upstream computed really changed value.
//!    Computeds stay lazy: they recompute on read or on such a check.
//!
//! # Borrowing
//!
//! Recomputing a computed or running an effect calls user code, which in turn
//! reads signals and touches the graph. The runtime therefore never holds a
//! borrow of the graph or the queue across one of those calls.
//!
//! # Thread Safety
//!
//! The runtime is thread-local. Reactive values are `!Send` and every thread
//! that uses them gets its own independent graph.

use std::cell::{Cell, RefCell};
use std::rc::Weak;

use crate::graph::{DerivedNode, EffectQueue, Graph, LinkId, NodeId, NodeKind, SubscriberFlags};

thread_local! {
    static RUNTIME: Runtime = Runtime::new();
}

/// The per-thread reactive runtime.
pub struct Runtime {
    graph: RefCell<Graph>,
    queue: RefCell<EffectQueue>,

    /// The subscriber whose tracking pass is currently running.
    active: Cell<Option<NodeId>>,
}

impl Runtime {
    fn new() -> Self {
        Self {
            graph: RefCell::new(Graph::new()),
            queue: RefCell::new(EffectQueue::new()),
            active: Cell::new(None),
        }
    }

    pub(crate) fn with<R>(f: impl FnOnce(&Runtime) -> R) -> R {
        RUNTIME.with(f)
    }

    /// Like [`Runtime::with`], but does nothing once the thread's runtime has
    /// been torn down. Used from `Drop` impls.
    pub(crate) fn try_with<R>(f: impl FnOnce(&Runtime) -> R) -> Option<R> {
        RUNTIME.try_with(f).ok()
    }

    // ------------------------------------------------------------------
    // Introspection
    // ------------------------------------------------------------------

    /// Get the subscriber currently being tracked, if any.
    pub fn current_subscriber() -> Option<NodeId> {
        Self::with(|rt| rt.active.get())
    }

    /// Check if we're inside a tracking pass.
    pub fn is_tracking() -> bool {
        Self::current_subscriber().is_some()
    }

    /// Number of live nodes in this thread's graph.
    pub fn node_count() -> usize {
        Self::with(|rt| rt.graph.borrow().node_count())
    }

    /// Number of live links in this thread's graph.
    pub fn link_count() -> usize {
        Self::with(|rt| rt.graph.borrow().link_count())
    }

    /// Current batch nesting depth.
    pub fn batch_depth() -> u32 {
        Self::with(|rt| rt.queue.borrow().depth())
    }

    /// Number of effect notifications waiting for a flush.
    pub fn pending_effects() -> usize {
        Self::with(|rt| rt.queue.borrow().len())
    }

    // ------------------------------------------------------------------
    // Nodes
    // ------------------------------------------------------------------

    pub(crate) fn insert(&self, kind: NodeKind) -> NodeId {
        self.graph.borrow_mut().insert(kind)
    }

    pub(crate) fn insert_with(&self, make: impl FnOnce(NodeId) -> NodeKind) -> NodeId {
        self.graph.borrow_mut().insert_with(make)
    }

    /// Remove a node and every link touching it.
    pub(crate) fn dispose(&self, id: NodeId) {
        let removed = match self.graph.try_borrow_mut() {
            Ok(mut graph) => graph.remove(id),
            Err(_) => {
                tracing::warn!(node = %id, "graph busy, node leaked on dispose");
                None
            }
        };
        // Dropping the node may drop an effect body and the handles it
        // captured, which re-enter the runtime.
        drop(removed);
    }

    #[cfg(test)]
    pub(crate) fn contains(&self, id: NodeId) -> bool {
        self.graph.borrow().contains(id)
    }

    pub(crate) fn flags(&self, id: NodeId) -> SubscriberFlags {
        self.graph.borrow().flags(id).unwrap_or_default()
    }

    pub(crate) fn subscriber_count(&self, id: NodeId) -> usize {
        self.graph.borrow().subscriber_count(id)
    }

    pub(crate) fn dependency_count(&self, id: NodeId) -> usize {
        self.graph.borrow().dependency_count(id)
    }

    // ------------------------------------------------------------------
    // Tracking
    // ------------------------------------------------------------------

    pub(crate) fn replace_active(&self, subscriber: Option<NodeId>) -> Option<NodeId> {
        self.active.replace(subscriber)
    }

    pub(crate) fn active(&self) -> Option<NodeId> {
        self.active.get()
    }

    pub(crate) fn start_tracking(&self, id: NodeId) {
        self.graph.borrow_mut().start_tracking(id);
    }

    pub(crate) fn end_tracking(&self, id: NodeId) {
        // May run while unwinding out of a graph operation.
        if let Ok(mut graph) = self.graph.try_borrow_mut() {
            graph.end_tracking(id);
        }
    }

    /// Link `dep` to the active subscriber. A read outside any tracking pass
    /// creates no edge.
    pub(crate) fn track(&self, dep: NodeId) {
        if let Some(sub) = self.active.get() {
            self.graph.borrow_mut().link(dep, sub);
        }
    }

    // ------------------------------------------------------------------
    // Push
    // ------------------------------------------------------------------

    /// A dependency's value changed: propagate, then flush unless batching.
    pub(crate) fn notify_changed(&self, dep: NodeId) {
        let subs = self.graph.borrow().subs(dep);
        if let Some(subs) = subs {
            let mut graph = self.graph.borrow_mut();
            let mut queue = self.queue.borrow_mut();
            graph.propagate(subs, &mut queue);
            tracing::trace!(%dep, queued = queue.len(), "change propagated");
        }
        let batching = self.queue.borrow().is_batching();
        if !batching {
            self.flush();
        }
    }

    fn shallow_propagate(&self, dep: NodeId) {
        let subs = self.graph.borrow().subs(dep);
        if let Some(subs) = subs {
            let mut graph = self.graph.borrow_mut();
            let mut queue = self.queue.borrow_mut();
            graph.shallow_propagate(subs, &mut queue);
        }
    }

    // ------------------------------------------------------------------
    // Pull
    // ------------------------------------------------------------------

    /// Bring a computed up to date before it is read.
    pub(crate) fn refresh_computed(&self, id: NodeId, node: &dyn DerivedNode) {
        let flags = self.flags(id);
        if !flags.intersects(SubscriberFlags::PROPAGATED) {
            return;
        }
        let stale = flags.contains(SubscriberFlags::DIRTY) || self.update_dirty_flag(id);
        if stale && node.recompute() {
            self.shallow_propagate(id);
        }
    }

    /// Resolve a pending subscriber: it becomes `DIRTY` only if an upstream
    /// value actually changed, otherwise its pending mark is dropped.
    fn update_dirty_flag(&self, id: NodeId) -> bool {
        let deps = self.graph.borrow().deps(id);
        let dirty = self.check_dirty(deps);
        let mut graph = self.graph.borrow_mut();
        if dirty {
            graph.insert_flags(id, SubscriberFlags::DIRTY);
        } else {
            graph.remove_flags(id, SubscriberFlags::PENDING_COMPUTED);
        }
        dirty
    }

    /// Walk a dependency list, depth-first resolving computed dependencies.
    /// Returns `true` as soon as one of them produced a new value.
    fn check_dirty(&self, mut cursor: Option<LinkId>) -> bool {
        while let Some(link) = cursor {
            let (dep, kind, flags) = {
                let graph = self.graph.borrow();
                let Some(dep) = graph.link_dep(link) else {
                    return false;
                };
                (dep, graph.kind(dep), graph.flags(dep).unwrap_or_default())
            };

            if let Some(NodeKind::Computed(computed)) = kind {
                if flags.contains(SubscriberFlags::DIRTY) {
                    if recompute(&computed) {
                        self.shallow_propagate(dep);
                        return true;
                    }
                } else if flags.contains(SubscriberFlags::PENDING_COMPUTED) {
                    let deps = self.graph.borrow().deps(dep);
                    if self.check_dirty(deps) {
                        if recompute(&computed) {
                            self.shallow_propagate(dep);
                            return true;
                        }
                    } else {
                        self.graph
                            .borrow_mut()
                            .remove_flags(dep, SubscriberFlags::PENDING_COMPUTED);
                    }
                }
            }

            cursor = self.graph.borrow().next_dep(link);
        }
        false
    }

    // ------------------------------------------------------------------
    // Effects
    // ------------------------------------------------------------------

    /// Rerun an effect if it is dirty, or pending and confirmed dirty.
    pub(crate) fn notify_effect(&self, id: NodeId) {
        let (flags, kind) = {
            let graph = self.graph.borrow();
            (graph.flags(id), graph.kind(id))
        };
        let (Some(flags), Some(NodeKind::Effect(effect))) = (flags, kind) else {
            return;
        };

        if flags.contains(SubscriberFlags::DIRTY)
            || (flags.contains(SubscriberFlags::PENDING_COMPUTED) && self.update_dirty_flag(id))
        {
            effect.run();
        }
        self.graph
            .borrow_mut()
            .remove_flags(id, SubscriberFlags::NOTIFIED);
    }

    /// Drain the effect queue in FIFO order.
    pub(crate) fn flush(&self) {
        let mut notified = 0usize;
        loop {
            let next = self.queue.borrow_mut().pop();
            let Some(id) = next else {
                break;
            };
            self.notify_effect(id);
            notified += 1;
        }
        if notified > 0 {
            tracing::trace!(notified, "effect queue drained");
        }
    }

    pub(crate) fn start_batch(&self) {
        self.queue.borrow_mut().start_batch();
    }

    pub(crate) fn end_batch(&self) {
        let outermost = self.queue.borrow_mut().end_batch();
        if outermost {
            tracing::debug!(pending = self.queue.borrow().len(), "batch closed");
            self.flush();
        }
    }

    /// Drop one batch level, leaving queued effects for the next flush.
    pub(crate) fn close_batch_without_flush(&self) {
        if let Ok(mut queue) = self.queue.try_borrow_mut() {
            queue.end_batch();
        }
    }
}

fn recompute(computed: &Weak<dyn DerivedNode>) -> bool {
    computed
        .upgrade()
        .map(|node| node.recompute())
        .unwrap_or(false)
}
