//! Petal Core
//!
//! This crate provides the core runtime for the Petal reactive UI framework.
//! It implements:
//!
//! - Reactive primitives (signals, computed values, effects, batching)
//! - Push-pull propagation over an arena dependency graph
//! - Virtual tree mounting and patching against a retained tree
//! - Component hosting with lifecycle hooks and custom events
//!
//! # Architecture
//!
//! - `graph`: node arena, dependency links, propagation and the effect queue
//! - `reactive`: user-facing handles over the graph
//! - `vdom`: VNode description, the retained-tree trait and the reconciler
//! - `host`: component definitions, instances and the registry
//!
//! # Example
//!
//! ```rust
//! use std::cell::RefCell;
//! use std::rc::Rc;
//!
//! use petal_core::reactive::{Computed, Effect, Signal};
//!
//! let count = Signal::new(1);
//!
//! let source = count.clone();
//! let doubled = Computed::new(move || source.get() * 2);
//!
//! let log = Rc::new(RefCell::new(Vec::new()));
//! let sink = log.clone();
//! let reader = doubled.clone();
//! let _effect = Effect::new(move || sink.borrow_mut().push(reader.get()));
//!
//! count.set(5);
//! assert_eq!(*log.borrow(), [2, 10]);
//! ```

pub mod config;
pub mod error;
pub mod graph;
pub mod host;
pub mod reactive;
pub mod vdom;

pub use config::{DisconnectPolicy, HostConfig};
pub use error::{Error, Result};
