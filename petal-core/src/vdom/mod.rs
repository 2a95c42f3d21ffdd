//! Virtual Tree Reconciliation
//!
//! A component renders a [`VNode`] tree on every reactive update. The first
//! tree is [`mount`]ed into a live [`RetainedTree`]; every later tree is
//! [`patch`]ed against the previous one, mutating the live tree in place.
//!
//! # Modules
//!
//! - `vnode`: the immutable description (tags, props, children)
//! - `tree`: the live-tree capability trait, events and dispatch
//! - `memory`: an in-memory live tree with a mutation log
//! - `mount`: VNode to fresh live node
//! - `patch`: old VNode + new VNode + live node to minimal mutations

mod memory;
mod mount;
mod patch;
mod tree;
mod vnode;

pub use memory::{LiveId, MemoryTree, Mutation, Snapshot};
pub use mount::{
    event_name, is_event_key, is_svg_tag, is_valid_tag_name, mount, namespace_for, UNKNOWN_ELEMENT,
    UNKNOWN_TAG_ATTRIBUTE,
};
pub use patch::{patch, patch_children, patch_props};
pub use tree::{dispatch_event, Event, EventInit, Namespace, RetainedTree};
pub use vnode::{h, Child, Handler, PropValue, Props, Tag, VNode};
