//! Store state snapshots.
//!
//! [`StoreState`] is a heterogeneous map from [`SliceKey`] to an opaque,
//! reference-counted slice value. The runtime keeps two live instances per
//! store: the published `current` snapshot and the `pending` one being
//! accumulated. Publishing is a pointer promotion: the maps end up
//! aliasing the same `Rc` values, never deep-copying them.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use crate::key::SliceKey;

/// An opaque, reference-counted slice value.
pub type SliceValue = Rc<dyn Any>;

/// Reference equality for slice values.
///
/// Slices are never structurally diffed; a reducer signals "no change" by
/// handing back the same allocation it was given. Only the allocation
/// address is compared, so values of different concrete types are simply
/// unequal.
#[must_use]
pub fn same_value(a: &SliceValue, b: &SliceValue) -> bool {
    std::ptr::addr_eq(Rc::as_ptr(a), Rc::as_ptr(b))
}

/// A snapshot of the whole store: slice key → slice value.
///
/// Cloning is shallow (it copies pointers, not slice contents), which is
/// what makes the per-refresh `current = pending` promotion cheap.
///
/// # Example
///
/// ```
/// use coalesce_core::StoreState;
///
/// let state = StoreState::new().with_slice("counter", 41_i64);
/// assert_eq!(state.get::<i64>("counter").as_deref(), Some(&41));
/// assert!(state.get::<String>("counter").is_none());
/// ```
#[derive(Clone, Default)]
pub struct StoreState {
    slices: HashMap<SliceKey, SliceValue>,
}

impl StoreState {
    /// Create an empty snapshot.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert, for assembling initial state.
    #[must_use]
    pub fn with_slice<T: 'static>(mut self, key: impl Into<SliceKey>, value: T) -> Self {
        self.insert(key, value);
        self
    }

    /// Insert a typed slice value, returning the previous value if any.
    pub fn insert<T: 'static>(
        &mut self,
        key: impl Into<SliceKey>,
        value: T,
    ) -> Option<SliceValue> {
        self.slices.insert(key.into(), Rc::new(value))
    }

    /// Insert an already-erased slice value.
    pub fn insert_value(&mut self, key: SliceKey, value: SliceValue) -> Option<SliceValue> {
        self.slices.insert(key, value)
    }

    /// Fetch a slice and downcast it to its concrete type.
    ///
    /// Returns `None` when the key is absent or holds a different type.
    #[must_use]
    pub fn get<T: 'static>(&self, key: &str) -> Option<Rc<T>> {
        self.slices.get(key).and_then(|value| value.clone().downcast::<T>().ok())
    }

    /// Fetch the erased slice value.
    #[must_use]
    pub fn get_value(&self, key: &str) -> Option<&SliceValue> {
        self.slices.get(key)
    }

    /// Whether a slice exists under `key`.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.slices.contains_key(key)
    }

    /// Number of registered slices.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slices.len()
    }

    /// Whether the snapshot holds no slices.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slices.is_empty()
    }

    /// Iterate over the slice keys, in no particular order.
    pub fn keys(&self) -> impl Iterator<Item = &SliceKey> {
        self.slices.keys()
    }
}

// Slice values are opaque, so Debug only shows the key set (sorted for
// stable output).
impl fmt::Debug for StoreState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut keys: Vec<&SliceKey> = self.slices.keys().collect();
        keys.sort();
        f.debug_struct("StoreState").field("slices", &keys).finish()
    }
}
