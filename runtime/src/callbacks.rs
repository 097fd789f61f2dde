//! One-shot completion callbacks.
//!
//! Each `dispatch` call may attach a callback; deferred effects queue
//! zero-key entries here as well. Entries are consumed exactly once, in
//! FIFO order, at the end of the refresh cycle that drains them.

use std::cell::RefCell;

use coalesce_core::{SliceKey, SliceValue};
use smallvec::SmallVec;

/// Type-erased completion callback. Receives the drained slice's freshly
/// published value, or `None` for zero-key entries and unknown slices.
pub(crate) type ErasedCallback = Box<dyn FnOnce(Option<SliceValue>) -> anyhow::Result<()>>;

pub(crate) struct Entry {
    pub(crate) key: Option<SliceKey>,
    pub(crate) callback: ErasedCallback,
}

type Entries = SmallVec<[Entry; 4]>;

/// FIFO queue of pending completion callbacks.
#[derive(Default)]
pub(crate) struct CallbackQueue {
    entries: RefCell<Entries>,
}

impl CallbackQueue {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push(&self, key: Option<SliceKey>, callback: ErasedCallback) {
        self.entries.borrow_mut().push(Entry { key, callback });
    }

    /// Take the queued entries, leaving the queue empty.
    ///
    /// Entries pushed while the returned batch is being processed land in
    /// the fresh queue and belong to the next refresh cycle.
    pub(crate) fn drain(&self) -> Entries {
        std::mem::take(&mut *self.entries.borrow_mut())
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.borrow().len()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn drains_in_fifo_order() {
        let queue = CallbackQueue::new();
        let order = Rc::new(RefCell::new(Vec::new()));
        for tag in ["first", "second", "third"] {
            let order = order.clone();
            queue.push(
                None,
                Box::new(move |_| {
                    order.borrow_mut().push(tag);
                    Ok(())
                }),
            );
        }
        for entry in queue.drain() {
            (entry.callback)(None).unwrap();
        }
        assert_eq!(*order.borrow(), ["first", "second", "third"]);
        assert_eq!(queue.len(), 0);
    }

    #[test]
    fn pushes_during_drain_stay_queued() {
        let queue = Rc::new(CallbackQueue::new());
        let inner = queue.clone();
        queue.push(
            None,
            Box::new(move |_| {
                inner.push(None, Box::new(|_| Ok(())));
                Ok(())
            }),
        );
        let drained = queue.drain();
        assert_eq!(drained.len(), 1);
        for entry in drained {
            (entry.callback)(None).unwrap();
        }
        assert_eq!(queue.len(), 1);
    }
}
