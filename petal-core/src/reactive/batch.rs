//! Batching
//!
//! A batch defers effect notification. While at least one batch is open,
//! signal writes still propagate dirtiness through the graph immediately,
//! but the effects they reach are only queued. When the outermost batch
//! closes, the queue is drained in the order effects were first notified.
//!
//! Batches nest: only the outermost boundary flushes.

use super::runtime::Runtime;

/// Open a batch.
///
/// Every call must be paired with [`end_batch`]. Prefer [`batch`] or
/// [`BatchGuard`], which cannot be left open.
pub fn start_batch() {
    Runtime::with(|rt| rt.start_batch());
}

/// Close a batch, flushing queued effects if it was the outermost one.
pub fn end_batch() {
    Runtime::with(|rt| rt.end_batch());
}

/// Run `f` inside a batch.
///
/// # Example
///
/// ```rust
/// use petal_core::reactive::{batch, Effect, Signal};
///
/// let first = Signal::new(1);
/// let second = Signal::new(2);
///
/// let (a, b) = (first.clone(), second.clone());
/// let effect = Effect::new(move || {
///     a.get();
///     b.get();
/// });
///
/// batch(|| {
///     first.set(10);
///     second.set(20);
/// });
/// assert_eq!(effect.run_count(), 2);
/// ```
pub fn batch<R>(f: impl FnOnce() -> R) -> R {
    let _guard = BatchGuard::new();
    f()
}

/// Keeps a batch open until dropped.
#[must_use = "the batch closes as soon as the guard is dropped"]
pub struct BatchGuard {
    _private: (),
}

impl BatchGuard {
    /// Open a batch.
    pub fn new() -> Self {
        start_batch();
        Self { _private: () }
    }
}

impl Default for BatchGuard {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for BatchGuard {
    fn drop(&mut self) {
        // No effects run while unwinding; they stay queued for the next flush.
        if std::thread::panicking() {
            Runtime::try_with(|rt| rt.close_batch_without_flush());
        } else {
            Runtime::try_with(|rt| rt.end_batch());
        }
    }
}
