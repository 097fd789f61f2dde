//! # Counter Demo
//!
//! A counter with a mount/unmount switch, demonstrating the Coalesce
//! batched state container.
//!
//! This demo showcases:
//! - Slice declaration with `use_reducer` from inside a subscription
//! - Dispatch batching (several synchronous dispatches, one refresh)
//! - Effect lifecycle: the counter "component" mounts a logging effect
//!   while it is shown and cleans it up when the app unmounts it
//!
//! ## Example
//!
//! ```
//! use std::rc::Rc;
//! use coalesce_core::reducer::Reducer;
//! use counter::{CounterAction, CounterReducer, CounterState};
//!
//! let reducer = CounterReducer;
//! let next = reducer
//!     .reduce(CounterAction::Add(5), Rc::new(CounterState::default()))
//!     .unwrap();
//! assert_eq!(next.value, 5);
//! ```

use std::rc::Rc;

use coalesce_core::reducer::{Reducer, ReducerResult};

/// Counter state: just the running value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CounterState {
    /// Current count.
    pub value: i64,
}

/// Actions the counter slice understands.
#[derive(Debug, Clone, Copy)]
pub enum CounterAction {
    /// Increment by 1.
    Increment,
    /// Decrement by 1.
    Decrement,
    /// Add an arbitrary amount (may be negative).
    Add(i64),
    /// Return to zero. A no-op when the counter is already there.
    Reset,
}

/// Pure transition function for the counter slice.
#[derive(Debug, Clone, Copy)]
pub struct CounterReducer;

impl Reducer for CounterReducer {
    type Action = CounterAction;
    type State = CounterState;

    fn reduce(
        &self,
        action: CounterAction,
        prior: Rc<CounterState>,
    ) -> ReducerResult<CounterState> {
        let value = match action {
            CounterAction::Increment => prior.value + 1,
            CounterAction::Decrement => prior.value - 1,
            CounterAction::Add(amount) => prior.value + amount,
            CounterAction::Reset => {
                if prior.value == 0 {
                    return Ok(prior);
                }
                0
            }
        };
        Ok(Rc::new(CounterState { value }))
    }
}

/// App state: whether the counter "component" is shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AppState {
    /// Whether the counter is mounted into the render pass.
    pub counter_mounted: bool,
}

impl Default for AppState {
    fn default() -> Self {
        Self { counter_mounted: true }
    }
}

/// Actions the app slice understands.
#[derive(Debug, Clone, Copy)]
pub enum AppAction {
    /// Show the counter.
    MountCounter,
    /// Hide the counter.
    UnmountCounter,
}

/// Transition function for the app slice.
#[derive(Debug, Clone, Copy)]
pub struct AppReducer;

impl Reducer for AppReducer {
    type Action = AppAction;
    type State = AppState;

    fn reduce(&self, action: AppAction, prior: Rc<AppState>) -> ReducerResult<AppState> {
        let counter_mounted = match action {
            AppAction::MountCounter => true,
            AppAction::UnmountCounter => false,
        };
        if counter_mounted == prior.counter_mounted {
            return Ok(prior);
        }
        Ok(Rc::new(AppState { counter_mounted }))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn reset_on_zero_is_a_noop() {
        let prior = Rc::new(CounterState { value: 0 });
        let next = CounterReducer.reduce(CounterAction::Reset, prior.clone()).unwrap();
        assert!(Rc::ptr_eq(&prior, &next));
    }

    #[test]
    fn add_accumulates() {
        let next = CounterReducer
            .reduce(CounterAction::Add(-6), Rc::new(CounterState { value: 13 }))
            .unwrap();
        assert_eq!(next.value, 7);
    }

    #[test]
    fn remount_is_a_noop_while_mounted() {
        let prior = Rc::new(AppState { counter_mounted: true });
        let next = AppReducer.reduce(AppAction::MountCounter, prior.clone()).unwrap();
        assert!(Rc::ptr_eq(&prior, &next));
    }
}
