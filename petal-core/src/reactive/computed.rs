//! Computed Implementation
//!
//! A Computed is a cached derived value that re-evaluates only when its
//! dependencies change.
//!
//! # How Computeds Work
//!
//! 1. On first access, the computed runs its getter and caches the result.
//!
//! 2. When accessed again, if no dependencies have changed, returns cached value.
//!
//! 3. When a dependency changes, the computed is marked dirty (direct
//!    dependency) or pending (something further upstream changed).
//!
//! 4. On next access, a pending computed re-checks whether any upstream value
//!    actually changed, recomputing only if so.
//!
//! 5. If the recomputed value equals the cached one, downstream subscribers
//!    are not disturbed. This is what keeps diamond-shaped graphs glitch-free.
//!
//! # Why This Matters
//!
//! This "lazy" approach avoids unnecessary recomputation:
//!
//! - A signal changes
//! - 10 computeds depend on it
//! - Only the computeds actually accessed will recompute
//! - Computeds that are never read stay dirty (no wasted work)

use std::cell::RefCell;
use std::fmt::{self, Debug};
use std::rc::{Rc, Weak};

use crate::graph::{DerivedNode, NodeId, NodeKind, SubscriberFlags};

use super::context::ReactiveContext;
use super::runtime::Runtime;

const NO_VALUE: &str = "computed has no value: its first evaluation panicked or read the computed itself";

/// Dirty state for a computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComputedState {
    /// The cached value is up-to-date.
    Clean,

    /// A transitive dependency might have changed. Need to check.
    Pending,

    /// The computed definitely needs to recompute.
    Dirty,
}

struct ComputedInner<T> {
    id: NodeId,
    getter: Box<dyn Fn() -> T>,
    value: RefCell<Option<T>>,
}

impl<T: PartialEq + 'static> DerivedNode for ComputedInner<T> {
    fn recompute(&self) -> bool {
        let next = {
            let _ctx = ReactiveContext::enter(self.id);
            (self.getter)()
        };
        let mut value = self.value.borrow_mut();
        if value.as_ref() == Some(&next) {
            return false;
        }
        *value = Some(next);
        true
    }
}

impl<T> Drop for ComputedInner<T> {
    fn drop(&mut self) {
        Runtime::try_with(|rt| rt.dispose(self.id));
    }
}

/// A cached derived value that recomputes only when dependencies change.
///
/// # Type Parameters
///
/// - `T`: The type of the computed value.
///
/// The PartialEq bound is needed to detect when the computed value actually
/// changed (some computeds return the same value even if inputs changed).
pub struct Computed<T: PartialEq + 'static> {
    inner: Rc<ComputedInner<T>>,
}

impl<T: PartialEq + 'static> Computed<T> {
    /// Create a new computed with the given getter.
    ///
    /// The getter is not run immediately. It runs on first access.
    pub fn new(getter: impl Fn() -> T + 'static) -> Self {
        let inner = Rc::new_cyclic(|weak: &Weak<ComputedInner<T>>| {
            let derived: Weak<dyn DerivedNode> = weak.clone();
            ComputedInner {
                id: Runtime::with(|rt| rt.insert(NodeKind::Computed(derived))),
                getter: Box::new(getter),
                value: RefCell::new(None),
            }
        });
        Self { inner }
    }

    /// Get the computed's graph node.
    pub fn id(&self) -> NodeId {
        self.inner.id
    }

    /// Get the current value, recomputing if necessary.
    pub fn get(&self) -> T
    where
        T: Clone,
    {
        self.with(T::clone)
    }

    /// Borrow the current value, recomputing if necessary.
    ///
    /// # Panics
    ///
    /// Panics if no evaluation has completed yet: the first one panicked
    /// and nothing it read has changed since, or it read this computed.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        self.refresh();
        Runtime::with(|rt| rt.track(self.inner.id));
        let value = self.inner.value.borrow();
        f(value
            .as_ref()
            .expect(NO_VALUE))
    }

    /// Get the current value without linking it to the active subscriber.
    pub fn get_untracked(&self) -> T
    where
        T: Clone,
    {
        self.refresh();
        self.inner
            .value
            .borrow()
            .clone()
            .expect(NO_VALUE)
    }

    /// Force re-evaluation of the getter.
    ///
    /// Returns whether the cached value changed.
    pub fn update(&self) -> bool {
        self.inner.recompute()
    }

    fn refresh(&self) {
        Runtime::with(|rt| rt.refresh_computed(self.inner.id, &*self.inner));
    }

    /// Get the current dirty state.
    pub fn state(&self) -> ComputedState {
        let flags = Runtime::with(|rt| rt.flags(self.inner.id));
        if flags.contains(SubscriberFlags::DIRTY) {
            ComputedState::Dirty
        } else if flags.contains(SubscriberFlags::PENDING_COMPUTED) {
            ComputedState::Pending
        } else {
            ComputedState::Clean
        }
    }

    /// Check if the computed has a cached value.
    pub fn has_value(&self) -> bool {
        self.inner.value.borrow().is_some()
    }

    /// Get the number of subscribers.
    pub fn subscriber_count(&self) -> usize {
        Runtime::with(|rt| rt.subscriber_count(self.inner.id))
    }

    /// Get the number of dependencies recorded by the last evaluation.
    pub fn dependency_count(&self) -> usize {
        Runtime::with(|rt| rt.dependency_count(self.inner.id))
    }
}

impl<T: PartialEq + 'static> Clone for Computed<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: PartialEq + Debug + 'static> Debug for Computed<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Computed")
            .field("id", &self.inner.id)
            .field("state", &self.state())
            .field("value", &self.inner.value.borrow())
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
