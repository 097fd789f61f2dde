//! # Coalesce Runtime
//!
//! Store runtime for the Coalesce batched state container.
//!
//! The [`Store`] owns a set of named state slices, each governed by a pure
//! reducer registered once per key. Any number of synchronous dispatches
//! coalesce into a single deferred refresh cycle, which publishes the
//! accumulated pending state, notifies subscriptions in registration order,
//! sweeps effect registrations, and drains per-dispatch completion
//! callbacks.
//!
//! ## Core Components
//!
//! - **State container**: dual snapshots (`current` published, `pending`
//!   accumulating); publishing is a pointer promotion, not a copy
//! - **Dispatch engine**: applies an action to a slice's pending value with
//!   error containment and a reference-equality no-op short-circuit
//! - **Scheduler**: single-flight guard plus a deferred task posted through
//!   the injected [`Schedule`] seam
//! - **Subscription bus**: ordered observers invoked with the store handle
//!   after every publish, individually fault-isolated
//! - **Effect manager**: mark-and-sweep lifecycle for named side-effects
//!   declared while subscriptions run
//! - **Callback queue**: FIFO completion callbacks drained at refresh end
//!
//! ## Example
//!
//! ```
//! use std::rc::Rc;
//! use coalesce_core::reducer::{ReducerResult, from_fn};
//! use coalesce_core::{StoreOptions, StoreState};
//! use coalesce_runtime::Store;
//! use coalesce_testing::ManualScheduler;
//!
//! let scheduler = Rc::new(ManualScheduler::new());
//! let store = Store::with_scheduler(
//!     StoreState::new(),
//!     StoreOptions::default(),
//!     scheduler.clone(),
//! );
//!
//! let (value, dispatch) = store
//!     .use_reducer(
//!         "counter",
//!         from_fn(|delta: i64, prior: Rc<i64>| -> ReducerResult<i64> {
//!             Ok(Rc::new(*prior + delta))
//!         }),
//!         0_i64,
//!     )
//!     .unwrap();
//! assert_eq!(*value, 0);
//!
//! dispatch.send(-6);
//! dispatch.send(13);
//! scheduler.run_pending(); // one refresh for both dispatches
//! assert_eq!(store.slice::<i64>("counter").as_deref(), Some(&7));
//! ```

use std::any::{Any, type_name};
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

use coalesce_core::{
    Cleanup, EffectOptions, LogLevel, Reducer, Schedule, SliceKey, SliceValue, StoreOptions,
    StoreState, same_value,
};

mod callbacks;
mod diag;
mod dispatch;
mod effects;
mod scheduler;

pub use dispatch::Dispatch;
pub use error::StoreError;
pub use scheduler::TokioScheduler;

use callbacks::{CallbackQueue, ErasedCallback};
use effects::EffectManager;

/// Error types for the Store runtime
pub mod error {
    use thiserror::Error;

    /// Errors surfaced at call time by Store operations.
    ///
    /// Everything else in the runtime is contained: reducer failures,
    /// observer failures, and dispatches to unknown slices are logged and
    /// skipped rather than returned.
    #[derive(Error, Debug)]
    pub enum StoreError {
        /// `use_reducer` named a key whose registered state type differs
        /// from the caller's. Registration is sticky, so the call cannot
        /// hand out a typed view of the existing slice.
        #[error("slice `{key}` is already registered with a different state type (expected {expected})")]
        SliceTypeMismatch {
            /// The contested slice key.
            key: String,
            /// The state type the caller asked for.
            expected: &'static str,
        },
    }
}

/// Phase of the refresh state machine.
///
/// A refresh runs `Notifying → SweepingEffects → DrainingCallbacks` and
/// returns to `Idle`; [`Store::use_effect`] is valid only during
/// `Notifying`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// No refresh in progress.
    Idle,
    /// Subscriptions are being invoked with the freshly published state.
    Notifying,
    /// Untouched effect registrations are being cleaned up.
    SweepingEffects,
    /// Queued completion callbacks are being delivered.
    DrainingCallbacks,
}

/// Handle returned by [`Store::subscribe`].
///
/// There is no unsubscribe today; the identifier reserves that extension
/// point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(usize);

impl SubscriptionId {
    /// Position of the subscription in notification order.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }
}

type SubscriberFn = dyn Fn(&Store) -> anyhow::Result<()>;

/// Type-erased registry entry: downcasts the action and prior value, runs
/// the typed reducer, and re-erases the result.
type ErasedReducer = dyn Fn(Box<dyn Any>, SliceValue) -> Result<SliceValue, ReduceFailure>;

enum ReduceFailure {
    ActionType { expected: &'static str },
    StateType { expected: &'static str },
    Failed(anyhow::Error),
}

struct SliceEntry {
    reduce: Rc<ErasedReducer>,
}

struct Buffers {
    current: StoreState,
    pending: StoreState,
}

struct Inner {
    options: StoreOptions,
    scheduler: Rc<dyn Schedule>,
    buffers: RefCell<Buffers>,
    registry: RefCell<HashMap<SliceKey, SliceEntry>>,
    subscribers: RefCell<Vec<Rc<SubscriberFn>>>,
    callbacks: CallbackQueue,
    effects: EffectManager,
    phase: Cell<Phase>,
    refresh_queued: Cell<bool>,
}

/// The reactive state container.
///
/// A `Store` handle is a cheap clone over shared single-threaded state
/// (deliberately `!Send`); every clone refers to the same slices,
/// subscriptions, and effect registrations.
///
/// # Update flow
///
/// `dispatch` mutates the pending snapshot and arranges for exactly one
/// deferred refresh, no matter how many dispatches arrive before it runs.
/// The refresh promotes pending to current, notifies subscriptions, sweeps
/// effects, and drains completion callbacks. Dispatches made during a
/// refresh belong to the next cycle.
#[derive(Clone)]
pub struct Store {
    inner: Rc<Inner>,
}

impl Store {
    /// Create a store backed by the tokio local task queue.
    ///
    /// Requires a `tokio::task::LocalSet` context when dispatching; see
    /// [`TokioScheduler`]. Use [`Store::with_scheduler`] to inject a
    /// different deferral mechanism.
    #[must_use]
    pub fn new(initial_state: StoreState, options: StoreOptions) -> Self {
        Self::with_scheduler(initial_state, options, Rc::new(TokioScheduler::new()))
    }

    /// Create a store with an explicit scheduler.
    ///
    /// Both snapshots start as shallow copies of `initial_state`, sharing
    /// its slice values.
    #[must_use]
    pub fn with_scheduler(
        initial_state: StoreState,
        options: StoreOptions,
        scheduler: Rc<dyn Schedule>,
    ) -> Self {
        let current = initial_state.clone();
        Self {
            inner: Rc::new(Inner {
                options,
                scheduler,
                buffers: RefCell::new(Buffers { current, pending: initial_state }),
                registry: RefCell::new(HashMap::new()),
                subscribers: RefCell::new(Vec::new()),
                callbacks: CallbackQueue::new(),
                effects: EffectManager::new(),
                phase: Cell::new(Phase::Idle),
                refresh_queued: Cell::new(false),
            }),
        }
    }

    /// The options this store was created with.
    #[must_use]
    pub fn options(&self) -> StoreOptions {
        self.inner.options
    }

    /// The current refresh phase.
    #[must_use]
    pub fn phase(&self) -> Phase {
        self.inner.phase.get()
    }

    /// Shallow snapshot of the published state.
    #[must_use]
    pub fn state(&self) -> StoreState {
        self.inner.buffers.borrow().current.clone()
    }

    /// Shallow snapshot of the pending (not yet published) state.
    #[must_use]
    pub fn pending_state(&self) -> StoreState {
        self.inner.buffers.borrow().pending.clone()
    }

    /// Typed view of one published slice.
    #[must_use]
    pub fn slice<S: 'static>(&self, key: &str) -> Option<Rc<S>> {
        self.inner.buffers.borrow().current.get::<S>(key)
    }

    /// Typed view of one pending slice.
    #[must_use]
    pub fn pending_slice<S: 'static>(&self, key: &str) -> Option<Rc<S>> {
        self.inner.buffers.borrow().pending.get::<S>(key)
    }

    /// Register an observer invoked after every publish.
    ///
    /// Subscriptions run in registration order, each individually
    /// fault-isolated: an `Err` is logged and the remaining subscriptions
    /// still run. The store owns the subscription for its whole lifetime.
    pub fn subscribe<F>(&self, subscriber: F) -> SubscriptionId
    where
        F: Fn(&Store) -> anyhow::Result<()> + 'static,
    {
        let mut subscribers = self.inner.subscribers.borrow_mut();
        subscribers.push(Rc::new(subscriber));
        SubscriptionId(subscribers.len() - 1)
    }

    /// Register a slice: its reducer plus the initial value written into
    /// both the published and pending snapshots.
    ///
    /// Re-registering an existing key warns and is a no-op, so slices can
    /// be declared from code that runs every cycle without resetting state.
    pub fn register<R>(&self, key: impl Into<SliceKey>, reducer: R, initial_state: R::State)
    where
        R: Reducer + 'static,
    {
        let key = key.into();
        if self.is_registered(&key) {
            self.log(
                LogLevel::Warn,
                &format!("redundant register call for slice `{key}` was ignored"),
            );
            return;
        }
        self.install(key, reducer, Rc::new(initial_state));
    }

    /// Declare a slice and get its current value plus a bound dispatcher.
    ///
    /// If `key` is new, registers `reducer`/`initial_state` and returns the
    /// initial value. If `key` already exists, the supplied reducer and
    /// initial value are ignored (registration is sticky) and the
    /// existing current value is returned. Safe to call from a
    /// subscription on every cycle.
    ///
    /// # Errors
    ///
    /// [`StoreError::SliceTypeMismatch`] if the key is registered with a
    /// different state type than `R::State`.
    pub fn use_reducer<R>(
        &self,
        key: impl Into<SliceKey>,
        reducer: R,
        initial_state: R::State,
    ) -> Result<(Rc<R::State>, Dispatch<R::Action, R::State>), StoreError>
    where
        R: Reducer + 'static,
    {
        let key = key.into();
        if self.is_registered(&key) {
            let current = self.slice::<R::State>(key.as_str()).ok_or_else(|| {
                StoreError::SliceTypeMismatch {
                    key: key.to_string(),
                    expected: type_name::<R::State>(),
                }
            })?;
            return Ok((current, Dispatch::new(self.clone(), key)));
        }
        let initial = Rc::new(initial_state);
        self.install(key.clone(), reducer, initial.clone());
        Ok((initial, Dispatch::new(self.clone(), key)))
    }

    /// Build a dispatcher bound to `key` without touching registration.
    ///
    /// The types are trusted: a mismatched `A` surfaces later as a
    /// contained dispatch failure, a mismatched `S` as `None` in callbacks.
    #[must_use]
    pub fn bind<A, S>(&self, key: impl Into<SliceKey>) -> Dispatch<A, S>
    where
        A: 'static,
        S: 'static,
    {
        Dispatch::new(self.clone(), key.into())
    }

    /// Dispatch `action` to the slice at `key`.
    ///
    /// The action is applied to the slice's pending value immediately; the
    /// publish-and-notify pass is deferred and shared with every other
    /// dispatch that arrives before it runs. Failures (unknown slice,
    /// mismatched action type, reducer error) are logged and leave the
    /// pending value unchanged.
    pub fn dispatch<A: 'static>(&self, action: A, key: impl Into<SliceKey>) {
        self.dispatch_erased(key.into(), Box::new(action), None);
    }

    /// Dispatch with a one-shot completion callback.
    ///
    /// The callback fires at the end of the refresh cycle that drains it,
    /// receiving the slice's value as published by that cycle: the prior
    /// value if this dispatch's reducer failed, `None` if the slice does
    /// not exist or holds a different type. A callback is never dropped: a
    /// dispatch that fails or short-circuits leaves it queued for a future
    /// cycle.
    pub fn dispatch_with<A, S, F>(&self, action: A, key: impl Into<SliceKey>, callback: F)
    where
        A: 'static,
        S: 'static,
        F: FnOnce(Option<Rc<S>>) -> anyhow::Result<()> + 'static,
    {
        let erased: ErasedCallback = Box::new(move |value: Option<SliceValue>| {
            callback(value.and_then(|value| value.downcast::<S>().ok()))
        });
        self.dispatch_erased(key.into(), Box::new(action), Some(erased));
    }

    /// Declare a named effect from inside a subscription.
    ///
    /// Valid only while subscriptions are being notified; elsewhere the
    /// call warns and does nothing. The name is marked as declared for
    /// this cycle either way. The first cycle a name is declared, `setup`
    /// runs and its returned cleanup is retained; while the name keeps
    /// being declared nothing re-runs; the first cycle it goes undeclared,
    /// the cleanup runs exactly once and the registration is dropped, after
    /// which the name may mount afresh.
    pub fn use_effect<F>(&self, name: impl Into<String>, setup: F)
    where
        F: FnOnce() -> anyhow::Result<Option<Cleanup>> + 'static,
    {
        self.use_effect_with(name, EffectOptions::immediate(), setup);
    }

    /// [`Store::use_effect`] with explicit options.
    ///
    /// With [`EffectOptions::deferred`], the registration becomes live
    /// immediately but `setup` is queued as a zero-key callback, so it runs
    /// after this cycle's notification window and callback drain.
    pub fn use_effect_with<F>(&self, name: impl Into<String>, options: EffectOptions, setup: F)
    where
        F: FnOnce() -> anyhow::Result<Option<Cleanup>> + 'static,
    {
        let name = name.into();
        let inner = &self.inner;
        if inner.phase.get() != Phase::Notifying {
            self.log(
                LogLevel::Warn,
                &format!("use_effect(`{name}`) called outside a subscription; ignored"),
            );
            return;
        }
        inner.effects.touch(&name);
        if inner.effects.is_live(&name) {
            return;
        }

        if options.delay {
            // Live from the declaration on, so repeated declarations stay
            // idempotent even though the setup has not run yet.
            inner.effects.mount(name.clone(), None);
            let store = self.clone();
            inner.callbacks.push(
                None,
                Box::new(move |_| {
                    store.run_deferred_setup(&name, setup);
                    Ok(())
                }),
            );
        } else {
            self.run_setup(&name, setup);
        }
    }

    /// Force an immediate, synchronous publish, bypassing the scheduler.
    ///
    /// Runs a full refresh cycle on the caller's stack. Typically used
    /// once at startup to trigger the first notification pass. Ignored
    /// with a warning if a refresh is already running.
    pub fn refresh(&self) {
        if self.inner.phase.get() != Phase::Idle {
            self.log(
                LogLevel::Warn,
                "refresh requested while a refresh is already running; ignored",
            );
            return;
        }
        self.run_refresh();
    }

    fn is_registered(&self, key: &SliceKey) -> bool {
        self.inner.registry.borrow().contains_key(key)
    }

    fn install<R>(&self, key: SliceKey, reducer: R, initial: Rc<R::State>)
    where
        R: Reducer + 'static,
    {
        let erased: Rc<ErasedReducer> =
            Rc::new(move |action: Box<dyn Any>, prior: SliceValue| {
                let action = action.downcast::<R::Action>().map_err(|_| {
                    ReduceFailure::ActionType { expected: type_name::<R::Action>() }
                })?;
                let prior = prior.downcast::<R::State>().map_err(|_| {
                    ReduceFailure::StateType { expected: type_name::<R::State>() }
                })?;
                let next = reducer.reduce(*action, prior).map_err(ReduceFailure::Failed)?;
                let next: SliceValue = next;
                Ok(next)
            });
        self.inner.registry.borrow_mut().insert(key.clone(), SliceEntry { reduce: erased });

        let current_value: SliceValue = initial.clone();
        let pending_value: SliceValue = initial;
        let mut buffers = self.inner.buffers.borrow_mut();
        buffers.current.insert_value(key.clone(), current_value);
        buffers.pending.insert_value(key, pending_value);
    }

    fn dispatch_erased(
        &self,
        key: SliceKey,
        action: Box<dyn Any>,
        callback: Option<ErasedCallback>,
    ) {
        let inner = &self.inner;
        metrics::counter!("store.dispatches.total").increment(1);
        let has_callback = callback.is_some();
        if inner.options.development() {
            self.log(
                LogLevel::Debug,
                &format!(
                    "dispatch on slice `{key}` {}",
                    if has_callback { "with callback" } else { "without callback" }
                ),
            );
        }
        // The callback is queued before anything can fail, so it is
        // delivered by a later refresh even when this dispatch goes wrong.
        if let Some(callback) = callback {
            inner.callbacks.push(Some(key.clone()), callback);
        }

        let mut error_while_dispatching = false;

        let entry = inner.registry.borrow().get(&key).map(|entry| Rc::clone(&entry.reduce));
        if let Some(reduce) = entry {
            let prior = inner.buffers.borrow().pending.get_value(key.as_str()).cloned();
            if let Some(prior) = prior {
                match reduce(action, prior.clone()) {
                    Ok(next) => {
                        if same_value(&prior, &next) {
                            // No-op: nothing changed, so no refresh is
                            // scheduled; a queued callback waits for a
                            // future cycle.
                            return;
                        }
                        inner.buffers.borrow_mut().pending.insert_value(key.clone(), next);
                    }
                    Err(failure) => {
                        error_while_dispatching = true;
                        metrics::counter!("store.dispatches.errors").increment(1);
                        self.log_reduce_failure(&key, &failure);
                    }
                }
            } else {
                error_while_dispatching = true;
                metrics::counter!("store.dispatches.errors").increment(1);
                self.log(
                    LogLevel::Warn,
                    &format!("slice `{key}` has no pending value; dispatch ignored"),
                );
            }
        } else {
            error_while_dispatching = true;
            metrics::counter!("store.dispatches.errors").increment(1);
            self.log(
                LogLevel::Warn,
                &format!("ignored dispatch to unregistered slice `{key}`"),
            );
        }

        // A failed fire-and-forget dispatch changed nothing and nobody is
        // waiting, so it must not force a notification pass. A supplied
        // callback still needs a refresh to be drained.
        if inner.refresh_queued.get() || (error_while_dispatching && !has_callback) {
            return;
        }
        inner.refresh_queued.set(true);
        let store = self.clone();
        inner.scheduler.defer(Box::new(move || {
            // Cleared before the body runs: dispatches made during the
            // refresh must schedule the next one, not merge into this one.
            store.inner.refresh_queued.set(false);
            store.run_refresh();
        }));
    }

    fn run_refresh(&self) {
        let inner = &self.inner;
        metrics::counter!("store.refreshes.total").increment(1);
        if inner.options.development() {
            self.log(LogLevel::Debug, "refresh cycle starting");
        }

        // 1. Promote: shallow map copy, slice values promoted by pointer.
        {
            let mut buffers = inner.buffers.borrow_mut();
            let published = buffers.pending.clone();
            buffers.current = published;
        }

        // 2-4. Notification window.
        inner.phase.set(Phase::Notifying);
        let subscribers: Vec<Rc<SubscriberFn>> = inner.subscribers.borrow().clone();
        for subscriber in subscribers {
            if let Err(error) = subscriber(self) {
                metrics::counter!("store.subscriptions.errors").increment(1);
                self.log(LogLevel::Warn, "ignored error while notifying a subscription");
                if inner.options.development() {
                    self.log(LogLevel::Debug, &format!("subscription failure: {error:#}"));
                }
            }
        }

        // 5. Effect sweep.
        inner.phase.set(Phase::SweepingEffects);
        for (name, cleanup) in inner.effects.sweep() {
            metrics::counter!("store.effects.unmounted").increment(1);
            if inner.options.development() {
                self.log(LogLevel::Debug, &format!("unmounting effect `{name}`"));
            }
            if let Some(cleanup) = cleanup {
                if let Err(error) = cleanup() {
                    self.log(
                        LogLevel::Warn,
                        &format!("ignored error while cleaning up effect `{name}`"),
                    );
                    if inner.options.development() {
                        self.log(LogLevel::Debug, &format!("cleanup failure: {error:#}"));
                    }
                }
            }
        }

        // 6. Drain the callbacks queued up to this point; entries queued
        //    during the drain belong to the next refresh.
        inner.phase.set(Phase::DrainingCallbacks);
        let drained = inner.callbacks.drain();
        metrics::counter!("store.callbacks.drained").increment(drained.len() as u64);
        for entry in drained {
            let value = entry.key.as_ref().and_then(|key| {
                inner.buffers.borrow().current.get_value(key.as_str()).cloned()
            });
            if let Err(error) = (entry.callback)(value) {
                self.log(LogLevel::Warn, "ignored error while executing a dispatch callback");
                if inner.options.development() {
                    self.log(LogLevel::Debug, &format!("callback failure: {error:#}"));
                }
            }
        }

        inner.phase.set(Phase::Idle);
    }

    fn run_setup<F>(&self, name: &str, setup: F)
    where
        F: FnOnce() -> anyhow::Result<Option<Cleanup>>,
    {
        metrics::counter!("store.effects.mounted").increment(1);
        if self.inner.options.development() {
            self.log(LogLevel::Debug, &format!("mounting effect `{name}`"));
        }
        match setup() {
            Ok(cleanup) => self.inner.effects.mount(name.to_owned(), cleanup),
            Err(error) => {
                self.log(
                    LogLevel::Warn,
                    &format!("ignored error while mounting effect `{name}`"),
                );
                if self.inner.options.development() {
                    self.log(LogLevel::Debug, &format!("effect setup failure: {error:#}"));
                }
            }
        }
    }

    fn run_deferred_setup<F>(&self, name: &str, setup: F)
    where
        F: FnOnce() -> anyhow::Result<Option<Cleanup>>,
    {
        metrics::counter!("store.effects.mounted").increment(1);
        if self.inner.options.development() {
            self.log(LogLevel::Debug, &format!("mounting deferred effect `{name}`"));
        }
        match setup() {
            // The placeholder registration went live when the effect was
            // declared; only the cleanup is still missing.
            Ok(cleanup) => self.inner.effects.set_cleanup(name, cleanup),
            Err(error) => {
                self.log(
                    LogLevel::Warn,
                    &format!("ignored error while mounting effect `{name}`"),
                );
                if self.inner.options.development() {
                    self.log(LogLevel::Debug, &format!("effect setup failure: {error:#}"));
                }
            }
        }
    }

    fn log_reduce_failure(&self, key: &SliceKey, failure: &ReduceFailure) {
        match failure {
            ReduceFailure::ActionType { expected } => self.log(
                LogLevel::Warn,
                &format!("ignored dispatch to slice `{key}`: action is not a `{expected}`"),
            ),
            ReduceFailure::StateType { expected } => self.log(
                LogLevel::Warn,
                &format!("ignored dispatch to slice `{key}`: state is not a `{expected}`"),
            ),
            ReduceFailure::Failed(error) => {
                self.log(LogLevel::Warn, &format!("ignored error while dispatching to slice `{key}`"));
                if self.inner.options.development() {
                    self.log(LogLevel::Debug, &format!("reducer failure for slice `{key}`: {error:#}"));
                }
            }
        }
    }

    fn log(&self, level: LogLevel, message: &str) {
        diag::emit(&self.inner.options, level, message);
    }
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store")
            .field("phase", &self.inner.phase.get())
            .field("refresh_queued", &self.inner.refresh_queued.get())
            .field("slices", &self.inner.buffers.borrow().pending.len())
            .field("subscriptions", &self.inner.subscribers.borrow().len())
            .field("live_effects", &self.inner.effects.live_count())
            .field("queued_callbacks", &self.inner.callbacks.len())
            .finish()
    }
}
