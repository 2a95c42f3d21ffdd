//! Effect Scopes
//!
//! An [`EffectScope`] collects the effects created while it is active so
//! they can be stopped together. Component hosts use one scope per instance:
//! everything created during setup, plus the render effect, belongs to it.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use super::effect::Effect;

thread_local! {
    static CURRENT_SCOPE: RefCell<Option<Rc<ScopeInner>>> = const { RefCell::new(None) };
}

#[derive(Default)]
struct ScopeInner {
    effects: RefCell<Vec<Effect>>,
}

/// A group of effects that can be stopped at once.
///
/// Stopping a scope does not close it: effects created by a later
/// [`EffectScope::run`] are collected again.
#[derive(Clone, Default)]
pub struct EffectScope {
    inner: Rc<ScopeInner>,
}

impl EffectScope {
    /// Create an empty scope.
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `f` with this scope active. Effects created by `f` (and not
    /// inside a nested scope) join this scope.
    pub fn run<R>(&self, f: impl FnOnce() -> R) -> R {
        let previous = CURRENT_SCOPE.with(|slot| slot.replace(Some(Rc::clone(&self.inner))));
        let _restore = RestoreScope(previous);
        f()
    }

    /// Stop every effect owned by the scope.
    pub fn stop(&self) {
        let effects = std::mem::take(&mut *self.inner.effects.borrow_mut());
        tracing::trace!(count = effects.len(), "effect scope stopped");
        for effect in effects {
            effect.stop();
        }
    }

    /// Number of effects currently owned.
    pub fn len(&self) -> usize {
        self.inner.effects.borrow().len()
    }

    /// Check whether the scope owns no effects.
    pub fn is_empty(&self) -> bool {
        self.inner.effects.borrow().is_empty()
    }
}

impl fmt::Debug for EffectScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EffectScope")
            .field("effects", &self.len())
            .finish()
    }
}

struct RestoreScope(Option<Rc<ScopeInner>>);

impl Drop for RestoreScope {
    fn drop(&mut self) {
        let previous = self.0.take();
        let _ = CURRENT_SCOPE.try_with(|slot| *slot.borrow_mut() = previous);
    }
}

/// Hand a freshly created effect to the active scope, if any.
pub(crate) fn register(effect: &Effect) {
    let _ = CURRENT_SCOPE.try_with(|slot| {
        if let Some(scope) = slot.borrow().as_ref() {
            scope.effects.borrow_mut().push(effect.clone());
        }
    });
}
