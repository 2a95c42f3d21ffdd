//! Graph Nodes
//!
//! This module defines the node types that live in the dependency graph.
//!
//! A node plays up to two roles. As a *dependency* it owns the head and tail
//! of its subscriber-link list; as a *subscriber* it owns the head and tail of
//! its dependency-link list plus a set of [`SubscriberFlags`]. Signals only
//! use the dependency half, effects only the subscriber half, and computeds
//! use both.

use std::fmt;
use std::rc::{Rc, Weak};

use bitflags::bitflags;

use super::link::LinkId;

/// Unique identifier for a node in the dependency graph.
///
/// Identifiers are generational arena indices: once a node is disposed its
/// slot may be reused, but the old identifier will no longer resolve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId {
    index: u32,
    generation: u32,
}

impl NodeId {
    pub(crate) fn new(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }

    /// Get the arena slot index.
    pub fn index(&self) -> usize {
        self.index as usize
    }

    /// Get the slot generation this identifier was issued for.
    pub fn generation(&self) -> u32 {
        self.generation
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "n{}v{}", self.index, self.generation)
    }
}

bitflags! {
    /// Propagation state of a subscriber.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct SubscriberFlags: u8 {
        /// The subscriber is inside a tracking pass.
        const TRACKING = 1 << 0;
        /// The subscriber was queued (effects) or visited in the current
        /// propagation pass.
        const NOTIFIED = 1 << 1;
        /// The subscriber must recompute or rerun.
        const DIRTY = 1 << 2;
        /// A transitive dependency changed but this node is unconfirmed.
        const PENDING_COMPUTED = 1 << 3;

        /// Either propagation mark.
        const PROPAGATED = Self::DIRTY.bits() | Self::PENDING_COMPUTED.bits();
    }
}

/// Capability of a derived node: re-evaluate and report whether the cached
/// value changed.
pub(crate) trait DerivedNode {
    fn recompute(&self) -> bool;
}

/// Capability of an effect node: rerun the side-effecting body.
pub(crate) trait EffectNode {
    fn run(&self);
}

/// What kind of node this is.
///
/// Computeds are held weakly so dropping the last [`Computed`] handle frees
/// them. Effects are held strongly: an effect lives until it is stopped.
///
/// [`Computed`]: crate::reactive::Computed
#[derive(Clone)]
pub(crate) enum NodeKind {
    /// A mutable leaf producer.
    Signal,
    /// A derived value, both dependency and subscriber.
    Computed(Weak<dyn DerivedNode>),
    /// A side-effecting subscriber.
    Effect(Rc<dyn EffectNode>),
}

impl NodeKind {
    pub(crate) fn is_computed(&self) -> bool {
        matches!(self, NodeKind::Computed(_))
    }

    pub(crate) fn is_effect(&self) -> bool {
        matches!(self, NodeKind::Effect(_))
    }

    fn name(&self) -> &'static str {
        match self {
            NodeKind::Signal => "Signal",
            NodeKind::Computed(_) => "Computed",
            NodeKind::Effect(_) => "Effect",
        }
    }
}

impl fmt::Debug for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A node in the dependency graph.
#[derive(Debug)]
pub(crate) struct Node {
    pub(crate) kind: NodeKind,
    pub(crate) flags: SubscriberFlags,

    /// First link in this node's dependency list.
    pub(crate) deps: Option<LinkId>,
    /// Last dependency confirmed in the current tracking pass. Links after
    /// it are pruned when the pass ends.
    pub(crate) deps_tail: Option<LinkId>,

    /// First link in this node's subscriber list.
    pub(crate) subs: Option<LinkId>,
    /// Last link in this node's subscriber list, for O(1) append.
    pub(crate) subs_tail: Option<LinkId>,
}

impl Node {
    pub(crate) fn new(kind: NodeKind) -> Self {
        let flags = match kind {
            // Start dirty so the first read computes.
            NodeKind::Computed(_) => SubscriberFlags::DIRTY,
            NodeKind::Signal | NodeKind::Effect(_) => SubscriberFlags::empty(),
        };
        Self {
            kind,
            flags,
            deps: None,
            deps_tail: None,
            subs: None,
            subs_tail: None,
        }
    }
}
