//! Graph Storage and Propagation
//!
//! [`Graph`] owns every node and link in two arenas and implements the
//! callback-free half of the reactive core:
//!
//! - `link`: record that a subscriber read a dependency in this pass
//! - `propagate`: push dirty/pending marks downstream after a write
//! - `shallow_propagate`: confirm pending direct subscribers as dirty
//! - `start_tracking` / `end_tracking`: bracket a pass and prune stale edges
//!
//! The pull half (`check_dirty`) recomputes user closures and therefore lives
//! in the runtime, which only borrows the graph between those calls.

use smallvec::SmallVec;

use super::link::{Link, LinkId};
use super::node::{Node, NodeId, NodeKind, SubscriberFlags};
use super::scheduler::EffectQueue;

/// A slot in the node arena.
#[derive(Debug)]
struct NodeSlot {
    generation: u32,
    node: Option<Node>,
}

/// Arena-backed dependency graph.
#[derive(Debug, Default)]
pub(crate) struct Graph {
    nodes: Vec<NodeSlot>,
    free_nodes: Vec<u32>,
    links: Vec<Option<Link>>,
    free_links: Vec<u32>,
}

impl Graph {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    // ------------------------------------------------------------------
    // Nodes
    // ------------------------------------------------------------------

    pub(crate) fn insert(&mut self, kind: NodeKind) -> NodeId {
        self.insert_with(|_| kind)
    }

    /// Insert a node whose kind needs to know its own identifier.
    ///
    /// `make` must not touch the graph.
    pub(crate) fn insert_with(&mut self, make: impl FnOnce(NodeId) -> NodeKind) -> NodeId {
        let id = match self.free_nodes.pop() {
            Some(index) => NodeId::new(index, self.nodes[index as usize].generation),
            None => {
                self.nodes.push(NodeSlot {
                    generation: 0,
                    node: None,
                });
                NodeId::new((self.nodes.len() - 1) as u32, 0)
            }
        };
        let kind = make(id);
        self.nodes[id.index()].node = Some(Node::new(kind));
        tracing::trace!(node = %id, "graph node inserted");
        id
    }

    /// Remove a node, unlinking it from both directions.
    ///
    /// The removed node is returned so the caller can drop it (and whatever
    /// user closures it keeps alive) after releasing its borrow of the graph.
    pub(crate) fn remove(&mut self, id: NodeId) -> Option<Node> {
        let slot = self
            .nodes
            .get_mut(id.index())
            .filter(|slot| slot.generation == id.generation())?;
        let node = slot.node.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free_nodes.push(id.index() as u32);

        if let Some(deps) = node.deps {
            self.release_deps(deps);
        }

        let mut cursor = node.subs;
        while let Some(current) = cursor {
            cursor = self.edge(current).next_sub;
            self.unlink_from_sub(current);
            self.free_link(current);
        }

        tracing::trace!(node = %id, kind = ?node.kind, "graph node removed");
        Some(node)
    }

    pub(crate) fn contains(&self, id: NodeId) -> bool {
        self.node(id).is_some()
    }

    pub(crate) fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes
            .get(id.index())
            .filter(|slot| slot.generation == id.generation())
            .and_then(|slot| slot.node.as_ref())
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes
            .get_mut(id.index())
            .filter(|slot| slot.generation == id.generation())
            .and_then(|slot| slot.node.as_mut())
    }

    pub(crate) fn kind(&self, id: NodeId) -> Option<NodeKind> {
        self.node(id).map(|node| node.kind.clone())
    }

    pub(crate) fn flags(&self, id: NodeId) -> Option<SubscriberFlags> {
        self.node(id).map(|node| node.flags)
    }

    pub(crate) fn insert_flags(&mut self, id: NodeId, flags: SubscriberFlags) {
        if let Some(node) = self.node_mut(id) {
            node.flags.insert(flags);
        }
    }

    pub(crate) fn remove_flags(&mut self, id: NodeId, flags: SubscriberFlags) {
        if let Some(node) = self.node_mut(id) {
            node.flags.remove(flags);
        }
    }

    pub(crate) fn deps(&self, id: NodeId) -> Option<LinkId> {
        self.node(id).and_then(|node| node.deps)
    }

    pub(crate) fn subs(&self, id: NodeId) -> Option<LinkId> {
        self.node(id).and_then(|node| node.subs)
    }

    /// Dependency endpoint of a link, or `None` if the link was freed.
    pub(crate) fn link_dep(&self, link: LinkId) -> Option<NodeId> {
        self.links
            .get(link.index())
            .and_then(|slot| slot.as_ref())
            .map(|link| link.dep)
    }

    /// Next link in the owning subscriber's dependency list.
    pub(crate) fn next_dep(&self, link: LinkId) -> Option<LinkId> {
        self.links
            .get(link.index())
            .and_then(|slot| slot.as_ref())
            .and_then(|link| link.next_dep)
    }

    pub(crate) fn subscriber_count(&self, id: NodeId) -> usize {
        let mut count = 0;
        let mut cursor = self.subs(id);
        while let Some(current) = cursor {
            count += 1;
            cursor = self.edge(current).next_sub;
        }
        count
    }

    pub(crate) fn dependency_count(&self, id: NodeId) -> usize {
        let mut count = 0;
        let mut cursor = self.deps(id);
        while let Some(current) = cursor {
            count += 1;
            cursor = self.edge(current).next_dep;
        }
        count
    }

    pub(crate) fn node_count(&self) -> usize {
        self.nodes.iter().filter(|slot| slot.node.is_some()).count()
    }

    pub(crate) fn link_count(&self) -> usize {
        self.links.iter().filter(|slot| slot.is_some()).count()
    }

    // ------------------------------------------------------------------
    // Tracking
    // ------------------------------------------------------------------

    /// Record that `sub` read `dep` during its current tracking pass.
    ///
    /// Returns `true` if a new link was created. Reads that match the next
    /// link left over from the previous pass reuse it in place, and a second
    /// read of the same dependency within one pass is ignored.
    pub(crate) fn link(&mut self, dep: NodeId, sub: NodeId) -> bool {
        if !self.contains(dep) {
            return false;
        }
        let Some(node) = self.node(sub) else {
            return false;
        };
        let (deps, tail) = (node.deps, node.deps_tail);

        if let Some(tail) = tail {
            if self.edge(tail).dep == dep {
                return false;
            }
        }

        let next = match tail {
            Some(tail) => self.edge(tail).next_dep,
            None => deps,
        };
        if let Some(next) = next {
            if self.edge(next).dep == dep {
                if let Some(node) = self.node_mut(sub) {
                    node.deps_tail = Some(next);
                }
                return false;
            }
        }

        if self.is_tracked(dep, sub) {
            return false;
        }

        self.insert_link(dep, sub, tail, next);
        true
    }

    /// Check whether `dep` is already among the links `sub` confirmed in the
    /// current pass (the prefix of its list up to `deps_tail`).
    fn is_tracked(&self, dep: NodeId, sub: NodeId) -> bool {
        let Some(node) = self.node(sub) else {
            return false;
        };
        let Some(tail) = node.deps_tail else {
            return false;
        };
        let mut cursor = node.deps;
        while let Some(current) = cursor {
            let link = self.edge(current);
            if link.dep == dep {
                return true;
            }
            if current == tail {
                break;
            }
            cursor = link.next_dep;
        }
        false
    }

    fn insert_link(
        &mut self,
        dep: NodeId,
        sub: NodeId,
        prev_dep: Option<LinkId>,
        next_dep: Option<LinkId>,
    ) -> LinkId {
        let prev_sub = self.node(dep).and_then(|node| node.subs_tail);
        let id = self.alloc_link(Link {
            prev_sub,
            prev_dep,
            next_dep,
            ..Link::new(dep, sub)
        });

        match prev_dep {
            Some(prev) => self.edge_mut(prev).next_dep = Some(id),
            None => {
                if let Some(node) = self.node_mut(sub) {
                    node.deps = Some(id);
                }
            }
        }
        if let Some(next) = next_dep {
            self.edge_mut(next).prev_dep = Some(id);
        }
        match prev_sub {
            Some(prev) => self.edge_mut(prev).next_sub = Some(id),
            None => {
                if let Some(node) = self.node_mut(dep) {
                    node.subs = Some(id);
                }
            }
        }
        if let Some(node) = self.node_mut(dep) {
            node.subs_tail = Some(id);
        }
        if let Some(node) = self.node_mut(sub) {
            node.deps_tail = Some(id);
        }

        tracing::trace!(%dep, %sub, "link created");
        id
    }

    /// Begin a tracking pass: the dependency list is about to be rebuilt.
    pub(crate) fn start_tracking(&mut self, sub: NodeId) {
        if let Some(node) = self.node_mut(sub) {
            node.deps_tail = None;
            node.flags.remove(SubscriberFlags::NOTIFIED | SubscriberFlags::PROPAGATED);
            node.flags.insert(SubscriberFlags::TRACKING);
        }
    }

    /// End a tracking pass, pruning every link the pass did not confirm.
    pub(crate) fn end_tracking(&mut self, sub: NodeId) {
        let Some(node) = self.node_mut(sub) else {
            return;
        };
        node.flags.remove(SubscriberFlags::TRACKING);
        let tail = node.deps_tail;
        let stale = match tail {
            Some(tail) => self.edge_mut(tail).next_dep.take(),
            None => self.node_mut(sub).and_then(|node| node.deps.take()),
        };
        if let Some(stale) = stale {
            self.release_deps(stale);
        }
    }

    /// Unlink and free `start` and every dependency link after it.
    ///
    /// A computed that loses its last subscriber this way releases its own
    /// dependencies and is marked dirty, so it no longer keeps producers
    /// subscribed and recomputes on the next read.
    fn release_deps(&mut self, start: LinkId) {
        let mut work: SmallVec<[LinkId; 8]> = SmallVec::new();
        work.push(start);

        while let Some(first) = work.pop() {
            let mut cursor = Some(first);
            while let Some(current) = cursor {
                let Link { dep, next_dep, .. } = *self.edge(current);
                cursor = next_dep;
                self.unlink_from_dep(current);
                self.free_link(current);

                let Some(node) = self.node_mut(dep) else {
                    continue;
                };
                if node.subs.is_none() && node.kind.is_computed() {
                    node.flags.insert(SubscriberFlags::DIRTY);
                    node.deps_tail = None;
                    if let Some(deps) = node.deps.take() {
                        work.push(deps);
                    }
                }
            }
        }
    }

    // ------------------------------------------------------------------
    // Propagation
    // ------------------------------------------------------------------

    /// Mark everything reachable from a dependency's subscriber list.
    ///
    /// Direct subscribers become `DIRTY`; subscribers reached through a
    /// computed become `PENDING_COMPUTED`, to be confirmed on pull. Effects
    /// are queued in the order they are first reached. A node that already
    /// carries a mark is not descended into again.
    pub(crate) fn propagate(&mut self, start: LinkId, queue: &mut EffectQueue) {
        let mut branches: SmallVec<[(Option<LinkId>, SubscriberFlags); 8]> = SmallVec::new();
        let mut cursor = Some(start);
        let mut target = SubscriberFlags::DIRTY;

        loop {
            let Some(current) = cursor else {
                match branches.pop() {
                    Some((resume, flag)) => {
                        cursor = resume;
                        target = flag;
                        continue;
                    }
                    None => break,
                }
            };
            let Link { sub, next_sub, .. } = *self.edge(current);
            cursor = next_sub;

            let Some(node) = self.node_mut(sub) else {
                continue;
            };
            let flags = node.flags;
            if flags.contains(SubscriberFlags::TRACKING) {
                continue;
            }
            if flags.intersects(SubscriberFlags::PROPAGATED) {
                if target == SubscriberFlags::DIRTY {
                    node.flags.insert(SubscriberFlags::DIRTY);
                }
                continue;
            }

            node.flags.insert(target | SubscriberFlags::NOTIFIED);
            match node.kind {
                NodeKind::Computed(_) => {
                    if let Some(subs) = node.subs {
                        branches.push((cursor, target));
                        cursor = Some(subs);
                        target = SubscriberFlags::PENDING_COMPUTED;
                    }
                }
                NodeKind::Effect(_) => queue.push(sub),
                NodeKind::Signal => {}
            }
        }
    }

    /// Upgrade pending direct subscribers to dirty after a computed's value
    /// was confirmed to have changed.
    pub(crate) fn shallow_propagate(&mut self, start: LinkId, queue: &mut EffectQueue) {
        let mut cursor = Some(start);
        while let Some(current) = cursor {
            let Link { sub, next_sub, .. } = *self.edge(current);
            cursor = next_sub;

            let Some(node) = self.node_mut(sub) else {
                continue;
            };
            let flags = node.flags;
            let marks = flags & (SubscriberFlags::PENDING_COMPUTED | SubscriberFlags::DIRTY);
            if marks == SubscriberFlags::PENDING_COMPUTED {
                node.flags.insert(SubscriberFlags::DIRTY | SubscriberFlags::NOTIFIED);
                if node.kind.is_effect() && !flags.contains(SubscriberFlags::NOTIFIED) {
                    queue.push(sub);
                }
            }
        }
    }

    // ------------------------------------------------------------------
    // Link arena
    // ------------------------------------------------------------------

    fn edge(&self, id: LinkId) -> &Link {
        self.links[id.index()].as_ref().expect("dangling link id")
    }

    fn edge_mut(&mut self, id: LinkId) -> &mut Link {
        self.links[id.index()].as_mut().expect("dangling link id")
    }

    fn alloc_link(&mut self, link: Link) -> LinkId {
        match self.free_links.pop() {
            Some(index) => {
                self.links[index as usize] = Some(link);
                LinkId(index)
            }
            None => {
                self.links.push(Some(link));
                LinkId((self.links.len() - 1) as u32)
            }
        }
    }

    fn free_link(&mut self, id: LinkId) {
        self.links[id.index()] = None;
        self.free_links.push(id.0);
    }

    /// Splice a link out of its dependency's subscriber list.
    fn unlink_from_dep(&mut self, id: LinkId) {
        let Link {
            dep,
            prev_sub,
            next_sub,
            ..
        } = *self.edge(id);
        match prev_sub {
            Some(prev) => self.edge_mut(prev).next_sub = next_sub,
            None => {
                if let Some(node) = self.node_mut(dep) {
                    node.subs = next_sub;
                }
            }
        }
        match next_sub {
            Some(next) => self.edge_mut(next).prev_sub = prev_sub,
            None => {
                if let Some(node) = self.node_mut(dep) {
                    node.subs_tail = prev_sub;
                }
            }
        }
    }

    /// Splice a link out of its subscriber's dependency list.
    fn unlink_from_sub(&mut self, id: LinkId) {
        let Link {
            sub,
            prev_dep,
            next_dep,
            ..
        } = *self.edge(id);
        match prev_dep {
            Some(prev) => self.edge_mut(prev).next_dep = next_dep,
            None => {
                if let Some(node) = self.node_mut(sub) {
                    node.deps = next_dep;
                }
            }
        }
        if let Some(next) = next_dep {
            self.edge_mut(next).prev_dep = prev_dep;
        }
        if let Some(node) = self.node_mut(sub) {
            if node.deps_tail == Some(id) {
                node.deps_tail = prev_dep;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::rc::{Rc, Weak};

    use super::*;
    use crate::graph::node::{DerivedNode, EffectNode};

    struct Inert;

    impl DerivedNode for Inert {
        fn recompute(&self) -> bool {
            false
        }
    }

    impl EffectNode for Inert {
        fn run(&self) {}
    }

    fn computed_kind() -> NodeKind {
        NodeKind::Computed(Weak::<Inert>::new())
    }

    fn effect_kind() -> NodeKind {
        NodeKind::Effect(Rc::new(Inert))
    }

    /// Run one tracking pass of `sub` that reads `deps` in order.
    fn track(graph: &mut Graph, sub: NodeId, deps: &[NodeId]) {
        graph.start_tracking(sub);
        for &dep in deps {
            graph.link(dep, sub);
        }
        graph.end_tracking(sub);
    }

    fn dep_order(graph: &Graph, sub: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut cursor = graph.deps(sub);
        while let Some(link) = cursor {
            out.push(graph.link_dep(link).unwrap());
            cursor = graph.next_dep(link);
        }
        out
    }

    #[test]
    fn link_registers_both_directions() {
        let mut graph = Graph::new();
        let signal = graph.insert(NodeKind::Signal);
        let effect = graph.insert(effect_kind());

        track(&mut graph, effect, &[signal]);

        assert_eq!(graph.subscriber_count(signal), 1);
        assert_eq!(graph.dependency_count(effect), 1);
        assert_eq!(graph.link_count(), 1);
    }

    #[test]
    fn repeated_reads_create_one_link() {
        let mut graph = Graph::new();
        let a = graph.insert(NodeKind::Signal);
        let b = graph.insert(NodeKind::Signal);
        let effect = graph.insert(effect_kind());

        track(&mut graph, effect, &[a, a, b, a, b]);

        assert_eq!(dep_order(&graph, effect), vec![a, b]);
        assert_eq!(graph.link_count(), 2);
    }

    #[test]
    fn unchanged_pass_reuses_links() {
        let mut graph = Graph::new();
        let a = graph.insert(NodeKind::Signal);
        let b = graph.insert(NodeKind::Signal);
        let effect = graph.insert(effect_kind());

        track(&mut graph, effect, &[a, b]);
        let first = graph.deps(effect);

        track(&mut graph, effect, &[a, b]);
        assert_eq!(graph.deps(effect), first);
        assert_eq!(graph.link_count(), 2);
    }

    #[test]
    fn end_tracking_prunes_untouched_dependencies() {
        let mut graph = Graph::new();
        let a = graph.insert(NodeKind::Signal);
        let b = graph.insert(NodeKind::Signal);
        let c = graph.insert(NodeKind::Signal);
        let effect = graph.insert(effect_kind());

        track(&mut graph, effect, &[a, b, c]);
        track(&mut graph, effect, &[c]);

        assert_eq!(dep_order(&graph, effect), vec![c]);
        assert_eq!(graph.subscriber_count(a), 0);
        assert_eq!(graph.subscriber_count(b), 0);
        assert_eq!(graph.link_count(), 1);
    }

    #[test]
    fn reordered_reads_keep_every_dependency() {
        let mut graph = Graph::new();
        let a = graph.insert(NodeKind::Signal);
        let b = graph.insert(NodeKind::Signal);
        let effect = graph.insert(effect_kind());

        track(&mut graph, effect, &[a, b]);
        track(&mut graph, effect, &[b, a]);

        assert_eq!(dep_order(&graph, effect), vec![b, a]);
        assert_eq!(graph.link_count(), 2);
    }

    #[test]
    fn empty_pass_detaches_everything() {
        let mut graph = Graph::new();
        let a = graph.insert(NodeKind::Signal);
        let effect = graph.insert(effect_kind());

        track(&mut graph, effect, &[a]);
        track(&mut graph, effect, &[]);

        assert_eq!(graph.dependency_count(effect), 0);
        assert_eq!(graph.subscriber_count(a), 0);
        assert_eq!(graph.link_count(), 0);
    }

    #[test]
    fn unobserved_computed_releases_its_dependencies() {
        let mut graph = Graph::new();
        let signal = graph.insert(NodeKind::Signal);
        let computed = graph.insert(computed_kind());
        let effect = graph.insert(effect_kind());

        track(&mut graph, computed, &[signal]);
        track(&mut graph, effect, &[computed]);
        assert_eq!(graph.subscriber_count(signal), 1);

        track(&mut graph, effect, &[]);

        assert_eq!(graph.subscriber_count(signal), 0);
        assert_eq!(graph.dependency_count(computed), 0);
        assert!(graph.flags(computed).unwrap().contains(SubscriberFlags::DIRTY));
    }

    #[test]
    fn propagate_marks_direct_dirty_and_transitive_pending() {
        let mut graph = Graph::new();
        let signal = graph.insert(NodeKind::Signal);
        let computed = graph.insert(computed_kind());
        let effect = graph.insert(effect_kind());

        track(&mut graph, computed, &[signal]);
        track(&mut graph, effect, &[computed]);

        let mut queue = EffectQueue::new();
        graph.propagate(graph.subs(signal).unwrap(), &mut queue);

        let computed_flags = graph.flags(computed).unwrap();
        let effect_flags = graph.flags(effect).unwrap();
        assert!(computed_flags.contains(SubscriberFlags::DIRTY));
        assert!(effect_flags.contains(SubscriberFlags::PENDING_COMPUTED));
        assert!(!effect_flags.contains(SubscriberFlags::DIRTY));
        assert_eq!(queue.pop(), Some(effect));
        assert!(queue.is_empty());
    }

    #[test]
    fn propagate_through_diamond_queues_effect_once() {
        let mut graph = Graph::new();
        let signal = graph.insert(NodeKind::Signal);
        let left = graph.insert(computed_kind());
        let right = graph.insert(computed_kind());
        let effect = graph.insert(effect_kind());

        track(&mut graph, left, &[signal]);
        track(&mut graph, right, &[signal]);
        track(&mut graph, effect, &[left, right]);

        let mut queue = EffectQueue::new();
        graph.propagate(graph.subs(signal).unwrap(), &mut queue);

        assert_eq!(queue.len(), 1);
        assert_eq!(queue.pop(), Some(effect));
    }

    #[test]
    fn propagate_queues_effects_in_subscription_order() {
        let mut graph = Graph::new();
        let signal = graph.insert(NodeKind::Signal);
        let first = graph.insert(effect_kind());
        let second = graph.insert(effect_kind());
        let third = graph.insert(effect_kind());

        for effect in [first, second, third] {
            track(&mut graph, effect, &[signal]);
        }

        let mut queue = EffectQueue::new();
        graph.propagate(graph.subs(signal).unwrap(), &mut queue);

        assert_eq!(queue.pop(), Some(first));
        assert_eq!(queue.pop(), Some(second));
        assert_eq!(queue.pop(), Some(third));
    }

    #[test]
    fn shallow_propagate_confirms_pending_subscribers() {
        let mut graph = Graph::new();
        let signal = graph.insert(NodeKind::Signal);
        let computed = graph.insert(computed_kind());
        let effect = graph.insert(effect_kind());

        track(&mut graph, computed, &[signal]);
        track(&mut graph, effect, &[computed]);
        graph.insert_flags(effect, SubscriberFlags::PENDING_COMPUTED);

        let mut queue = EffectQueue::new();
        graph.shallow_propagate(graph.subs(computed).unwrap(), &mut queue);

        assert!(graph.flags(effect).unwrap().contains(SubscriberFlags::DIRTY));
        assert_eq!(queue.pop(), Some(effect));
    }

    #[test]
    fn tracking_subscriber_is_skipped() {
        let mut graph = Graph::new();
        let signal = graph.insert(NodeKind::Signal);
        let effect = graph.insert(effect_kind());

        graph.start_tracking(effect);
        graph.link(signal, effect);

        let mut queue = EffectQueue::new();
        graph.propagate(graph.subs(signal).unwrap(), &mut queue);
        graph.end_tracking(effect);

        assert!(queue.is_empty());
        assert!(!graph.flags(effect).unwrap().intersects(SubscriberFlags::PROPAGATED));
    }

    #[test]
    fn removing_a_node_unlinks_both_sides() {
        let mut graph = Graph::new();
        let signal = graph.insert(NodeKind::Signal);
        let computed = graph.insert(computed_kind());
        let effect = graph.insert(effect_kind());

        track(&mut graph, computed, &[signal]);
        track(&mut graph, effect, &[computed, signal]);

        assert!(graph.remove(computed).is_some());

        assert!(!graph.contains(computed));
        assert_eq!(dep_order(&graph, effect), vec![signal]);
        assert_eq!(graph.subscriber_count(signal), 1);
        assert_eq!(graph.link_count(), 1);
    }

    #[test]
    fn stale_ids_do_not_resolve_after_reuse() {
        let mut graph = Graph::new();
        let first = graph.insert(NodeKind::Signal);
        graph.remove(first);

        let second = graph.insert(NodeKind::Signal);
        assert_eq!(first.index(), second.index());
        assert_ne!(first, second);
        assert!(!graph.contains(first));
        assert!(graph.contains(second));
        assert!(graph.remove(first).is_none());
        assert_eq!(graph.node_count(), 1);
    }
}
