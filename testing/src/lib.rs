//! # Coalesce Testing
//!
//! Testing utilities for the Coalesce batched state container.
//!
//! This crate provides:
//! - [`ManualScheduler`]: a hand-pumped implementation of the runtime's
//!   scheduling seam, so refresh cycles run exactly when a test says so
//! - [`Probe`]: a shared recorder for observing values captured inside
//!   subscription, callback, and effect closures
//! - [`settle`]: yields to the tokio local task queue until deferred
//!   refreshes have had a chance to run
//!
//! ## Example
//!
//! ```
//! use std::rc::Rc;
//! use coalesce_testing::ManualScheduler;
//!
//! let scheduler = Rc::new(ManualScheduler::new());
//! // ... hand the scheduler to Store::with_scheduler, dispatch a few
//! // actions, then drive the deferred refresh deterministically:
//! assert_eq!(scheduler.run_pending(), 0);
//! ```

use std::cell::RefCell;
use std::collections::VecDeque;
use std::fmt;
use std::rc::Rc;

use coalesce_core::schedule::{Schedule, Task};

/// Deterministic scheduler for tests.
///
/// Deferred tasks queue up until the test pumps them with [`step`] or
/// [`run_pending`]. This makes the store's batching observable: any number
/// of dispatches produce exactly one queued task, and nothing refreshes
/// until the test asks.
///
/// [`step`]: ManualScheduler::step
/// [`run_pending`]: ManualScheduler::run_pending
#[derive(Default)]
pub struct ManualScheduler {
    queue: RefCell<VecDeque<Task>>,
}

impl ManualScheduler {
    /// Create an empty scheduler.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of deferred tasks waiting to run.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.queue.borrow().len()
    }

    /// Whether no deferred work is waiting.
    #[must_use]
    pub fn is_idle(&self) -> bool {
        self.queue.borrow().is_empty()
    }

    /// Run the oldest deferred task, if any. Returns whether one ran.
    pub fn step(&self) -> bool {
        let task = self.queue.borrow_mut().pop_front();
        match task {
            Some(task) => {
                task();
                true
            }
            None => false,
        }
    }

    /// Run deferred tasks until the queue is empty, including tasks the
    /// tasks themselves defer. Returns how many ran.
    ///
    /// A subscription that unconditionally dispatches on every cycle will
    /// keep this loop alive forever; such tests should use [`step`]
    /// instead.
    ///
    /// [`step`]: ManualScheduler::step
    pub fn run_pending(&self) -> usize {
        let mut ran = 0;
        while self.step() {
            ran += 1;
        }
        ran
    }
}

impl Schedule for ManualScheduler {
    fn defer(&self, task: Task) {
        self.queue.borrow_mut().push_back(task);
    }
}

impl fmt::Debug for ManualScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ManualScheduler").field("pending", &self.pending()).finish()
    }
}

/// Shared recorder for values observed inside store closures.
///
/// Clones share the same backing vector, so a test can keep one handle and
/// move another into a subscription or callback.
///
/// # Example
///
/// ```
/// use coalesce_testing::Probe;
///
/// let probe = Probe::new();
/// let recorder = probe.clone();
/// (move || recorder.push(7))();
/// assert_eq!(probe.take(), vec![7]);
/// ```
pub struct Probe<T> {
    values: Rc<RefCell<Vec<T>>>,
}

impl<T> Probe<T> {
    /// Create an empty probe.
    #[must_use]
    pub fn new() -> Self {
        Self { values: Rc::new(RefCell::new(Vec::new())) }
    }

    /// Record a value.
    pub fn push(&self, value: T) {
        self.values.borrow_mut().push(value);
    }

    /// Number of recorded values.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.borrow().len()
    }

    /// Whether nothing has been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.borrow().is_empty()
    }

    /// Take all recorded values, leaving the probe empty.
    #[must_use]
    pub fn take(&self) -> Vec<T> {
        std::mem::take(&mut *self.values.borrow_mut())
    }
}

impl<T: Clone> Probe<T> {
    /// Copy of the recorded values.
    #[must_use]
    pub fn snapshot(&self) -> Vec<T> {
        self.values.borrow().clone()
    }
}

impl<T> Clone for Probe<T> {
    fn clone(&self) -> Self {
        Self { values: Rc::clone(&self.values) }
    }
}

impl<T> Default for Probe<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: fmt::Debug> fmt::Debug for Probe<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Probe").field("values", &*self.values.borrow()).finish()
    }
}

/// Yield to the tokio local task queue until deferred refreshes have run.
///
/// A store on the default [`TokioScheduler`] refreshes on a `spawn_local`
/// task; awaiting this after dispatching gives that task (and any follow-up
/// refreshes it schedules) a chance to complete. Must be awaited inside a
/// `tokio::task::LocalSet`.
///
/// [`TokioScheduler`]: https://docs.rs/coalesce-runtime
pub async fn settle() {
    for _ in 0..8 {
        tokio::task::yield_now().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn manual_scheduler_runs_in_fifo_order() {
        let scheduler = ManualScheduler::new();
        let probe: Probe<u8> = Probe::new();
        for tag in [1, 2, 3] {
            let probe = probe.clone();
            scheduler.defer(Box::new(move || probe.push(tag)));
        }
        assert_eq!(scheduler.pending(), 3);
        assert_eq!(scheduler.run_pending(), 3);
        assert_eq!(probe.take(), vec![1, 2, 3]);
        assert!(scheduler.is_idle());
    }

    #[test]
    fn run_pending_follows_cascades() {
        let scheduler = Rc::new(ManualScheduler::new());
        let ran = Rc::new(Cell::new(0));
        let inner_scheduler = scheduler.clone();
        let inner_ran = ran.clone();
        scheduler.defer(Box::new(move || {
            inner_ran.set(inner_ran.get() + 1);
            let ran = inner_ran.clone();
            inner_scheduler.defer(Box::new(move || ran.set(ran.get() + 1)));
        }));
        assert_eq!(scheduler.run_pending(), 2);
        assert_eq!(ran.get(), 2);
    }
}
