//! Graph Links
//!
//! A link is the edge record between one dependency and one subscriber. It
//! sits in two intrusive doubly-linked lists at once: the dependency's
//! subscriber list (`prev_sub`/`next_sub`) and the subscriber's dependency
//! list (`prev_dep`/`next_dep`). Links are stored in an arena and referenced
//! by [`LinkId`], so neither endpoint owns the other.

use super::node::NodeId;

/// Arena index of a link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LinkId(pub(crate) u32);

impl LinkId {
    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

/// An edge from a dependency to a subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Link {
    /// The producer endpoint.
    pub(crate) dep: NodeId,
    /// The consumer endpoint.
    pub(crate) sub: NodeId,

    pub(crate) prev_sub: Option<LinkId>,
    pub(crate) next_sub: Option<LinkId>,

    pub(crate) prev_dep: Option<LinkId>,
    pub(crate) next_dep: Option<LinkId>,
}

impl Link {
    pub(crate) fn new(dep: NodeId, sub: NodeId) -> Self {
        Self {
            dep,
            sub,
            prev_sub: None,
            next_sub: None,
            prev_dep: None,
            next_dep: None,
        }
    }
}
