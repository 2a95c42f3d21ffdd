//! Reactive Primitives
//!
//! This module implements the reactive system: signals, computeds and
//! effects. These primitives form the foundation of Petal's fine-grained
//! reactivity.
//!
//! # Concepts
//!
//! ## Signals
//!
//! A Signal is a container for mutable state. When a signal's value is read
//! within a tracking context (a computed or effect), the signal is linked to
//! that context. When the signal's value changes, everything downstream is
//! marked and the effects among them are re-run.
//!
//! ## Computeds
//!
//! A Computed is a derived value that caches its result. It re-evaluates only
//! when read after one of its dependencies really changed.
//!
//! ## Effects
//!
//! An Effect is a side-effecting computation that runs whenever its
//! dependencies change. Effects synchronize reactive state with the outside
//! world, such as a retained view tree.
//!
//! # Implementation Notes
//!
//! Dependencies are edges in the [`graph`](crate::graph) arena. Propagation
//! is push-pull: a write pushes `DIRTY` / `PENDING_COMPUTED` marks, and a
//! pending subscriber pulls on its dependencies to find out whether anything
//! it read actually changed. Effects behind a computed whose value did not
//! change are never re-run.

mod batch;
mod computed;
mod context;
mod effect;
mod runtime;
mod scope;
mod signal;

pub use batch::{batch, end_batch, start_batch, BatchGuard};
pub use computed::{Computed, ComputedState};
pub use context::{untrack, ReactiveContext};
pub use effect::Effect;
pub use runtime::Runtime;
pub use scope::EffectScope;
pub use signal::Signal;
