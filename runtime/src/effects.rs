//! Mark-and-sweep registry for named effects.
//!
//! Registrations live from the refresh cycle in which their name is first
//! declared until the first subsequent cycle in which it is not. The store
//! marks names as "touched" while subscriptions run and sweeps untouched
//! registrations once per refresh, after the notification window closes.

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};

use coalesce_core::Cleanup;

struct Registration {
    cleanup: Option<Cleanup>,
}

/// Store-scoped effect registry.
///
/// The manager owns the bookkeeping only; the store invokes setups and
/// cleanups itself so failures are logged with full context. No user code
/// runs while a registry borrow is held.
#[derive(Default)]
pub(crate) struct EffectManager {
    live: RefCell<HashMap<String, Registration>>,
    touched: RefCell<HashSet<String>>,
}

impl EffectManager {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Mark `name` as declared in the current cycle.
    pub(crate) fn touch(&self, name: &str) {
        let mut touched = self.touched.borrow_mut();
        if !touched.contains(name) {
            touched.insert(name.to_owned());
        }
    }

    /// Whether `name` has a live registration (is mounted).
    pub(crate) fn is_live(&self, name: &str) -> bool {
        self.live.borrow().contains_key(name)
    }

    /// Record a live registration for `name`.
    pub(crate) fn mount(&self, name: String, cleanup: Option<Cleanup>) {
        self.live.borrow_mut().insert(name, Registration { cleanup });
    }

    /// Attach the cleanup produced by a deferred setup to an existing
    /// registration. Ignored if the registration is gone.
    pub(crate) fn set_cleanup(&self, name: &str, cleanup: Option<Cleanup>) {
        if let Some(registration) = self.live.borrow_mut().get_mut(name) {
            registration.cleanup = cleanup;
        }
    }

    /// Remove every live registration not touched this cycle and return the
    /// unmounted `(name, cleanup)` pairs. The touched set is cleared
    /// unconditionally.
    pub(crate) fn sweep(&self) -> Vec<(String, Option<Cleanup>)> {
        let touched = std::mem::take(&mut *self.touched.borrow_mut());
        let mut live = self.live.borrow_mut();
        let stale: Vec<String> =
            live.keys().filter(|name| !touched.contains(*name)).cloned().collect();
        stale
            .into_iter()
            .map(|name| {
                let cleanup = live.remove(&name).and_then(|registration| registration.cleanup);
                (name, cleanup)
            })
            .collect()
    }

    pub(crate) fn live_count(&self) -> usize {
        self.live.borrow().len()
    }
}
