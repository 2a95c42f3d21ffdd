//! Effect Implementation
//!
//! An Effect is a side-effecting computation that runs whenever its
//! dependencies change.
//!
//! # How Effects Work
//!
//! 1. When created, the effect runs its function immediately to establish
//!    initial dependencies.
//!
//! 2. When any dependency changes, the effect is queued. It re-runs when the
//!    queue is flushed: right away, or when the outermost batch closes.
//!
//! 3. Every run is a tracking pass. Dependencies the body no longer reads
//!    are pruned when the run ends.
//!
//! # Differences from Computed
//!
//! - Computeds return a value; effects do not.
//! - Computeds are lazy (compute on access); effects are eager (run when deps change).
//! - Computeds cache results; effects just run their side effect.
//!
//! # Lifetime
//!
//! The graph keeps an effect alive until [`Effect::stop`] is called, so
//! dropping the handle does not silence it. Effects created inside an
//! [`EffectScope`](super::EffectScope) are stopped together with the scope.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use crate::graph::{EffectNode, NodeId, NodeKind};

use super::context::ReactiveContext;
use super::runtime::Runtime;
use super::scope;

struct EffectInner {
    id: NodeId,
    body: RefCell<Box<dyn FnMut()>>,
    run_count: Cell<usize>,
    stopped: Cell<bool>,
}

impl EffectNode for EffectInner {
    fn run(&self) {
        if self.stopped.get() {
            return;
        }
        let Ok(mut body) = self.body.try_borrow_mut() else {
            tracing::warn!(effect = %self.id, "effect re-entered its own run, skipped");
            return;
        };
        let _ctx = ReactiveContext::enter(self.id);
        self.run_count.set(self.run_count.get() + 1);
        (body)();
    }
}

/// A side-effecting computation that runs when dependencies change.
///
/// # Example
///
/// ```rust
/// use std::cell::Cell;
/// use std::rc::Rc;
///
/// use petal_core::reactive::{Effect, Signal};
///
/// let count = Signal::new(0);
/// let seen = Rc::new(Cell::new(-1));
///
/// let source = count.clone();
/// let sink = seen.clone();
/// let effect = Effect::new(move || sink.set(source.get()));
/// assert_eq!(seen.get(), 0);
///
/// count.set(5);
/// assert_eq!(seen.get(), 5);
///
/// effect.stop();
/// count.set(6);
/// assert_eq!(seen.get(), 5);
/// ```
#[derive(Clone)]
pub struct Effect {
    inner: Rc<EffectInner>,
}

impl Effect {
    /// Create a new effect with the given function.
    ///
    /// The function runs immediately to establish initial dependencies.
    pub fn new(body: impl FnMut() + 'static) -> Self {
        let mut created = None;
        Runtime::with(|rt| {
            rt.insert_with(|id| {
                let inner = Rc::new(EffectInner {
                    id,
                    body: RefCell::new(Box::new(body)),
                    run_count: Cell::new(0),
                    stopped: Cell::new(false),
                });
                created = Some(Rc::clone(&inner));
                NodeKind::Effect(inner)
            })
        });
        let effect = Self {
            inner: created.expect("graph did not construct the effect node"),
        };

        scope::register(&effect);
        effect.inner.run();
        effect
    }

    /// Get the effect's graph node.
    pub fn id(&self) -> NodeId {
        self.inner.id
    }

    /// Run the body now, regardless of dirty state.
    pub fn run(&self) {
        self.inner.run();
    }

    /// Re-run the body if a dependency changed since the last run.
    pub fn notify(&self) {
        Runtime::with(|rt| rt.notify_effect(self.inner.id));
    }

    /// Detach from every dependency and never run again.
    ///
    /// Calling this more than once, or from inside the body, is fine. A run
    /// that is already in progress completes.
    pub fn stop(&self) {
        if self.inner.stopped.replace(true) {
            return;
        }
        tracing::trace!(effect = %self.inner.id, "effect stopped");
        Runtime::try_with(|rt| rt.dispose(self.inner.id));
    }

    /// Check whether the effect has been stopped.
    pub fn is_stopped(&self) -> bool {
        self.inner.stopped.get()
    }

    /// Get the number of times the body has run.
    pub fn run_count(&self) -> usize {
        self.inner.run_count.get()
    }

    /// Get the number of dependencies recorded by the last run.
    pub fn dependency_count(&self) -> usize {
        Runtime::with(|rt| rt.dependency_count(self.inner.id))
    }
}

impl fmt::Debug for Effect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Effect")
            .field("id", &self.inner.id)
            .field("run_count", &self.run_count())
            .field("stopped", &self.is_stopped())
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reactive::{Computed, Signal};

    #[test]
    fn effect_runs_immediately() {
        let ran = Rc::new(Cell::new(false));
        let flag = ran.clone();

        let effect = Effect::new(move || flag.set(true));

        assert!(ran.get());
        assert_eq!(effect.run_count(), 1);
    }

    #[test]
    fn effect_reruns_on_dependency_change() {
        let signal = Signal::new(1);
        let source = signal.clone();
        let effect = Effect::new(move || {
            source.get();
        });

        signal.set(2);
        signal.set(3);
        assert_eq!(effect.run_count(), 3);
        assert_eq!(effect.dependency_count(), 1);
    }

    #[test]
    fn stop_detaches_and_is_idempotent() {
        let signal = Signal::new(0);
        let source = signal.clone();
        let effect = Effect::new(move || {
            source.get();
        });
        assert_eq!(signal.subscriber_count(), 1);

        effect.stop();
        effect.stop();

        assert!(effect.is_stopped());
        assert_eq!(signal.subscriber_count(), 0);

        signal.set(1);
        effect.run();
        assert_eq!(effect.run_count(), 1);
    }

    #[test]
    fn effect_can_stop_itself() {
        let signal = Signal::new(0);
        let handle: Rc<RefCell<Option<Effect>>> = Rc::new(RefCell::new(None));

        let source = signal.clone();
        let slot = handle.clone();
        let effect = Effect::new(move || {
            if source.get() > 0 {
                if let Some(me) = slot.borrow().as_ref() {
                    me.stop();
                }
            }
        });
        *handle.borrow_mut() = Some(effect.clone());

        signal.set(1);
        assert!(effect.is_stopped());
        assert_eq!(effect.run_count(), 2);

        signal.set(2);
        assert_eq!(effect.run_count(), 2);
    }

    #[test]
    fn dropping_the_handle_keeps_the_effect_alive() {
        let signal = Signal::new(0);
        let seen = Rc::new(Cell::new(0));

        let source = signal.clone();
        let sink = seen.clone();
        drop(Effect::new(move || sink.set(source.get())));

        signal.set(9);
        assert_eq!(seen.get(), 9);
    }

    #[test]
    fn notify_is_a_no_op_when_clean() {
        let signal = Signal::new(0);
        let source = signal.clone();
        let effect = Effect::new(move || {
            source.get();
        });

        effect.notify();
        assert_eq!(effect.run_count(), 1);
    }

    #[test]
    fn pending_effect_skips_run_when_computed_value_is_unchanged() {
        let signal = Signal::new(1);
        let source = signal.clone();
        let positive = Computed::new(move || source.get() > 0);

        let reader = positive.clone();
        let effect = Effect::new(move || {
            reader.get();
        });

        signal.set(2);
        assert_eq!(effect.run_count(), 1);

        signal.set(-1);
        assert_eq!(effect.run_count(), 2);
    }

    #[test]
    fn writing_a_dependency_from_the_body_does_not_loop() {
        let signal = Signal::new(0);
        let source = signal.clone();
        let effect = Effect::new(move || {
            let value = source.get();
            if value < 3 {
                source.set(value + 1);
            }
        });

        assert_eq!(effect.run_count(), 1);
        assert_eq!(signal.get(), 1);
    }
}
