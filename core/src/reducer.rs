//! Reducer trait - the core abstraction for slice transitions.
//!
//! Reducers are pure functions: `(action, prior) → next`. They contain all
//! per-slice business logic, are registered once per slice key, and must not
//! mutate the prior value: they either build a fresh one or hand the prior
//! handle back to signal a no-op.

use std::marker::PhantomData;
use std::rc::Rc;

/// Result of one reducer invocation.
///
/// `Err` is the contained-failure path: the runtime logs it and leaves the
/// slice's pending value untouched for that dispatch.
pub type ReducerResult<S> = anyhow::Result<Rc<S>>;

/// Pure transition function for one slice.
///
/// # Type Parameters
///
/// - `Action`: the action type this reducer processes
/// - `State`: the slice state type this reducer owns
///
/// # No-op contract
///
/// Returning the `prior` handle unchanged (same allocation) tells the
/// runtime nothing happened; such a dispatch never schedules a refresh on
/// its own.
///
/// # Example
///
/// ```
/// use std::rc::Rc;
/// use coalesce_core::reducer::{Reducer, ReducerResult};
///
/// struct Toggle;
///
/// impl Reducer for Toggle {
///     type Action = ();
///     type State = bool;
///
///     fn reduce(&self, (): (), prior: Rc<bool>) -> ReducerResult<bool> {
///         Ok(Rc::new(!*prior))
///     }
/// }
/// ```
pub trait Reducer {
    /// The action type this reducer processes.
    type Action: 'static;

    /// The slice state type this reducer owns.
    type State: 'static;

    /// Reduce an action into the slice's next value.
    ///
    /// # Errors
    ///
    /// Any failure is contained by the runtime: it is logged and the
    /// dispatch is abandoned with the pending value unchanged.
    fn reduce(&self, action: Self::Action, prior: Rc<Self::State>) -> ReducerResult<Self::State>;
}

/// Adapter that lets a plain closure act as a [`Reducer`].
///
/// Built with [`from_fn`].
pub struct FnReducer<A, S, F> {
    reduce: F,
    _types: PhantomData<fn(A) -> S>,
}

/// Wrap a closure as a [`Reducer`].
///
/// # Example
///
/// ```
/// use std::rc::Rc;
/// use coalesce_core::reducer::{Reducer, ReducerResult, from_fn};
///
/// let double = from_fn(|(): (), prior: Rc<i64>| -> ReducerResult<i64> {
///     Ok(Rc::new(*prior * 2))
/// });
/// assert_eq!(*double.reduce((), Rc::new(21)).unwrap(), 42);
/// ```
pub fn from_fn<A, S, F>(reduce: F) -> FnReducer<A, S, F>
where
    A: 'static,
    S: 'static,
    F: Fn(A, Rc<S>) -> ReducerResult<S>,
{
    FnReducer { reduce, _types: PhantomData }
}

impl<A, S, F> Reducer for FnReducer<A, S, F>
where
    A: 'static,
    S: 'static,
    F: Fn(A, Rc<S>) -> ReducerResult<S>,
{
    type Action = A;
    type State = S;

    fn reduce(&self, action: A, prior: Rc<S>) -> ReducerResult<S> {
        (self.reduce)(action, prior)
    }
}
