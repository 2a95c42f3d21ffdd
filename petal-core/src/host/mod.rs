//! Component Hosting
//!
//! Binds a component definition to a host element in a [`RetainedTree`]:
//!
//! - [`ComponentDefinition`]: observed attributes, styles, setup function
//! - [`SetupContext`]: props, lifecycle hooks and the event [`Emitter`]
//!   available during setup
//! - [`ComponentHost`]: a live instance and its lifecycle
//! - [`Registry`]: tag name to definition
//!
//! [`RetainedTree`]: crate::vdom::RetainedTree

mod component;
mod context;
mod definition;
mod registry;

pub use component::{ComponentHost, HostState};
pub use context::{Emitter, SetupContext};
pub use definition::{ComponentDefinition, Converter, RenderFn};
pub use registry::Registry;
