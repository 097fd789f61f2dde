//! Bound dispatchers.

use std::fmt;
use std::marker::PhantomData;
use std::rc::Rc;

use coalesce_core::SliceKey;

use crate::Store;

/// A dispatch function bound to one slice.
///
/// Returned by [`Store::use_reducer`] and [`Store::bind`]. Carries the
/// slice's action and state types, so actions are checked at compile time
/// and callbacks receive an already-downcast value.
///
/// # Type Parameters
///
/// - `A`: the bound slice's action type
/// - `S`: the bound slice's state type (delivered to callbacks)
pub struct Dispatch<A, S> {
    store: Store,
    key: SliceKey,
    _types: PhantomData<fn(A) -> S>,
}

impl<A, S> Dispatch<A, S>
where
    A: 'static,
    S: 'static,
{
    pub(crate) fn new(store: Store, key: SliceKey) -> Self {
        Self { store, key, _types: PhantomData }
    }

    /// The slice this dispatcher is bound to.
    #[must_use]
    pub fn key(&self) -> &SliceKey {
        &self.key
    }

    /// Dispatch `action` to the bound slice.
    pub fn send(&self, action: A) {
        self.store.dispatch(action, self.key.clone());
    }

    /// Dispatch `action` to `key` instead of the bound slice.
    pub fn send_to(&self, action: A, key: impl Into<SliceKey>) {
        self.store.dispatch(action, key);
    }

    /// Dispatch `action` to the bound slice with a completion callback.
    ///
    /// The callback fires at the end of the refresh cycle that drains it,
    /// with the slice's value as published by that cycle.
    pub fn send_with<F>(&self, action: A, callback: F)
    where
        F: FnOnce(Option<Rc<S>>) -> anyhow::Result<()> + 'static,
    {
        self.store.dispatch_with(action, self.key.clone(), callback);
    }

    /// Dispatch to `key` instead of the bound slice, with a completion
    /// callback.
    pub fn send_to_with<F>(&self, action: A, key: impl Into<SliceKey>, callback: F)
    where
        F: FnOnce(Option<Rc<S>>) -> anyhow::Result<()> + 'static,
    {
        self.store.dispatch_with(action, key, callback);
    }
}

impl<A, S> Clone for Dispatch<A, S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            key: self.key.clone(),
            _types: PhantomData,
        }
    }
}

impl<A, S> fmt::Debug for Dispatch<A, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatch").field("key", &self.key).finish()
    }
}
