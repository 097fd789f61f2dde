//! # Coalesce Core
//!
//! Core traits and types for the Coalesce batched state container.
//!
//! This crate provides the fundamental abstractions shared by the store
//! runtime and by application code:
//!
//! - **Slice**: one named region of store state, identified by a [`SliceKey`]
//! - **Reducer**: pure transition function `(action, prior) → next`
//! - **State**: the heterogeneous [`StoreState`] mapping, slice values are
//!   reference-counted and compared by address
//! - **Effect**: cleanup closures and mount options for declared side-effects
//! - **Schedule**: the seam through which the runtime defers refresh work
//!   onto the host's cooperative task queue
//!
//! ## Architecture Principles
//!
//! - Single-threaded, cooperative execution (store handles are `!Send`)
//! - Copy-on-write slice values: reducers return a fresh handle, never
//!   mutate in place; returning the prior handle marks a no-op
//! - Injected scheduling via the [`schedule::Schedule`] trait so tests can
//!   drive refresh cycles deterministically
//!
//! ## Example
//!
//! ```
//! use std::rc::Rc;
//! use coalesce_core::reducer::{Reducer, ReducerResult};
//!
//! #[derive(Debug)]
//! struct Counter {
//!     value: i64,
//! }
//!
//! enum CounterAction {
//!     Increment,
//!     Decrement,
//! }
//!
//! struct CounterReducer;
//!
//! impl Reducer for CounterReducer {
//!     type Action = CounterAction;
//!     type State = Counter;
//!
//!     fn reduce(&self, action: CounterAction, prior: Rc<Counter>) -> ReducerResult<Counter> {
//!         let value = match action {
//!             CounterAction::Increment => prior.value + 1,
//!             CounterAction::Decrement => prior.value - 1,
//!         };
//!         Ok(Rc::new(Counter { value }))
//!     }
//! }
//! ```

pub mod effect;
pub mod key;
pub mod options;
pub mod reducer;
pub mod schedule;
pub mod state;

// Re-export commonly used types
pub use effect::{Cleanup, EffectOptions, cleanup};
pub use key::SliceKey;
pub use options::{LogLevel, StoreOptions};
pub use reducer::{FnReducer, Reducer, ReducerResult, from_fn};
pub use schedule::{Schedule, Task};
pub use state::{SliceValue, StoreState, same_value};

// Reducers and observer hooks report failures as `anyhow::Error`
pub use anyhow;
