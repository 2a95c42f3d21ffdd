//! Reactive Context
//!
//! The reactive context tracks which computation is currently running.
//! This enables automatic dependency tracking: when a signal is read,
//! we can register the current computation as a dependent.
//!
//! # Implementation
//!
//! The active subscriber is a single thread-local slot. Entering a context
//! saves the previous occupant and starts a tracking pass; dropping the guard
//! ends the pass (pruning stale links) and restores the previous occupant.
//! Because this happens in `Drop`, it also runs when the computation panics,
//! so a failing getter or effect body never leaves tracking state corrupted.
//!
//! Nested contexts (a computed read from inside an effect, an effect that
//! synchronously triggers another effect) nest through the same save/restore.

use crate::graph::NodeId;

use super::runtime::Runtime;

/// Guard that keeps a subscriber active until dropped.
pub struct ReactiveContext {
    /// The subscriber this guard is tracking, or `None` for an untracked
    /// region.
    subscriber: Option<NodeId>,
    /// Whatever was active before this guard was created.
    previous: Option<NodeId>,
}

impl ReactiveContext {
    /// Make `subscriber` active and begin its tracking pass.
    pub(crate) fn enter(subscriber: NodeId) -> Self {
        Runtime::with(|rt| {
            let previous = rt.replace_active(Some(subscriber));
            rt.start_tracking(subscriber);
            Self {
                subscriber: Some(subscriber),
                previous,
            }
        })
    }

    /// Suspend tracking until the guard is dropped.
    pub fn untracked() -> Self {
        let previous = Runtime::with(|rt| rt.replace_active(None));
        Self {
            subscriber: None,
            previous,
        }
    }

    /// Check if there is an active reactive context.
    pub fn is_active() -> bool {
        Runtime::is_tracking()
    }

    /// Get the current subscriber ID, if any.
    pub fn current_subscriber() -> Option<NodeId> {
        Runtime::current_subscriber()
    }
}

impl Drop for ReactiveContext {
    fn drop(&mut self) {
        let subscriber = self.subscriber;
        let previous = self.previous;
        Runtime::try_with(|rt| {
            if !std::thread::panicking() {
                debug_assert_eq!(
                    rt.active(),
                    subscriber,
                    "ReactiveContext mismatch: expected {:?}, got {:?}",
                    subscriber,
                    rt.active()
                );
            }
            if let Some(id) = subscriber {
                rt.end_tracking(id);
            }
            rt.replace_active(previous);
        });
    }
}

/// Run `f` without tracking any reads it performs.
pub fn untrack<R>(f: impl FnOnce() -> R) -> R {
    let _ctx = ReactiveContext::untracked();
    f()
}
