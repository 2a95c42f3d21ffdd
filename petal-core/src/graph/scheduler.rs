//! Effect Scheduler
//!
//! The scheduler decides *when* notified effects run. Propagation pushes every
//! effect it reaches onto a FIFO queue; the queue is drained immediately after
//! a write unless a batch is open.
//!
//! # Algorithm
//!
//! 1. A signal write propagates dirtiness and enqueues reachable effects in
//!    the order they were first marked (an effect is only queued once per
//!    pass, guarded by its `NOTIFIED` flag).
//! 2. If the batch depth is zero, the runtime drains the queue.
//! 3. Otherwise the queue is left alone until the outermost batch closes.
//!
//! Batches are a plain reentrant counter: nested batches are transparent and
//! only the transition from depth 1 to depth 0 flushes.

use std::collections::VecDeque;

use super::node::NodeId;

/// Pending effect notifications plus the batch depth that gates them.
#[derive(Debug, Default)]
pub struct EffectQueue {
    /// Number of currently open batches.
    batch_depth: u32,

    /// Effects waiting to be notified, oldest first.
    pending: VecDeque<NodeId>,
}

impl EffectQueue {
    /// Create an empty queue with no open batch.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an effect to the back of the queue.
    pub fn push(&mut self, effect: NodeId) {
        self.pending.push_back(effect);
    }

    /// Take the oldest queued effect.
    pub fn pop(&mut self) -> Option<NodeId> {
        self.pending.pop_front()
    }

    /// Open a batch.
    pub fn start_batch(&mut self) {
        self.batch_depth += 1;
    }

    /// Close a batch.
    ///
    /// Returns `true` when this closed the outermost batch, meaning the
    /// caller should flush.
    pub fn end_batch(&mut self) -> bool {
        match self.batch_depth {
            0 => {
                tracing::warn!("end_batch called without a matching start_batch");
                false
            }
            depth => {
                self.batch_depth = depth - 1;
                self.batch_depth == 0
            }
        }
    }

    /// Check if a batch is currently open.
    pub fn is_batching(&self) -> bool {
        self.batch_depth > 0
    }

    /// Get the current batch depth.
    pub fn depth(&self) -> u32 {
        self.batch_depth
    }

    /// Get the number of queued notifications.
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Check if nothing is queued.
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}
