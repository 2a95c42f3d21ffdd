//! Dependency Graph
//!
//! This module implements the push-pull dependency graph that connects
//! signals, computeds and effects.
//!
//! # Overview
//!
//! - Nodes represent producers (signals), derived values (computeds) or
//!   consumers (effects).
//! - Links represent a single "subscriber reads dependency" edge and live in
//!   two intrusive lists at once.
//!
//! When a signal changes, propagation pushes `DIRTY` to direct
//! subscribers and `PENDING_COMPUTED` to everything further downstream. Pulls
//! happen later: a pending subscriber walks its own dependencies and only
//! becomes dirty if some upstream computed really produced a new value.
//!
//! # Design Decisions
//!
//! 1. Nodes and links live in arenas and refer to each other by index. A
//!    computed is both a dependency and a subscriber, so owning pointers would
//!    form cycles; indices do not.
//!
//! 2. Propagation marks are stored on the nodes themselves. No visited set is
//!    allocated: a node already carrying a mark is not descended into again,
//!    which also makes diamond-shaped graphs terminate.
//!
//! 3. Graph algorithms here never call user code. Recomputing a computed or
//!    running an effect is the runtime's job, which keeps every `RefCell`
//!    borrow of the graph short.

mod link;
mod node;
mod scheduler;
mod system;

pub use link::LinkId;
pub use node::{NodeId, SubscriberFlags};
pub use scheduler::EffectQueue;
pub(crate) use node::{DerivedNode, EffectNode, NodeKind};
pub(crate) use system::Graph;
