//! Default deferred-task scheduler.

use coalesce_core::{Schedule, Task};

/// Scheduler that posts deferred refreshes onto the tokio local task queue.
///
/// This is the production implementation of the [`Schedule`] seam: a
/// zero-delay continuation on the cooperative executor, so a refresh never
/// runs inside the `dispatch` call that scheduled it.
///
/// # Context requirements
///
/// `tokio::task::spawn_local` requires the calling task to run inside a
/// [`tokio::task::LocalSet`] (or a current-thread `LocalRuntime`). Drive the
/// store from `LocalSet::run_until`, or inject a custom [`Schedule`]
/// implementation instead; tests typically use the hand-pumped scheduler
/// from `coalesce-testing`.
///
/// # Example
///
/// ```no_run
/// use coalesce_core::StoreOptions;
/// use coalesce_core::state::StoreState;
/// use coalesce_runtime::Store;
///
/// #[tokio::main(flavor = "current_thread")]
/// async fn main() {
///     let local = tokio::task::LocalSet::new();
///     local
///         .run_until(async {
///             let store = Store::new(StoreState::new(), StoreOptions::default());
///             // dispatches made here coalesce into refreshes on the local queue
///             drop(store);
///         })
///         .await;
/// }
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioScheduler;

impl TokioScheduler {
    /// Create a tokio-backed scheduler.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Schedule for TokioScheduler {
    fn defer(&self, task: Task) {
        tokio::task::spawn_local(async move { task() });
    }
}
