//! Integration tests for the effect mark-and-sweep lifecycle.
//!
//! Effects are declared from inside subscriptions; they mount once, stay
//! mounted while re-declared every cycle, and clean up exactly once in the
//! first cycle they go undeclared.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)] // Test code can use unwrap/expect/panic

use std::rc::Rc;

use coalesce_core::effect::{EffectOptions, cleanup};
use coalesce_core::reducer::{ReducerResult, from_fn};
use coalesce_core::{StoreOptions, StoreState};
use coalesce_runtime::Store;
use coalesce_testing::{ManualScheduler, Probe};

// ============================================================================
// Test Fixtures
// ============================================================================

#[derive(Debug)]
struct App {
    counter_mounted: bool,
}

#[derive(Debug, Clone, Copy)]
enum AppAction {
    Mount,
    Unmount,
}

fn app_reducer(action: AppAction, prior: Rc<App>) -> ReducerResult<App> {
    let counter_mounted = match action {
        AppAction::Mount => true,
        AppAction::Unmount => false,
    };
    if counter_mounted == prior.counter_mounted {
        return Ok(prior);
    }
    Ok(Rc::new(App { counter_mounted }))
}

fn manual_store() -> (Store, Rc<ManualScheduler>) {
    let scheduler = Rc::new(ManualScheduler::new());
    let store =
        Store::with_scheduler(StoreState::new(), StoreOptions::default(), scheduler.clone());
    (store, scheduler)
}

/// Subscribe a render pass that declares the `"counter"` effect while the
/// app slice says it is mounted, recording setups and cleanups.
fn render_with_effect(store: &Store, mounts: &Probe<()>, cleanups: &Probe<()>) {
    let mounts = mounts.clone();
    let cleanups = cleanups.clone();
    store.subscribe(move |store| {
        let (app, _) =
            store.use_reducer("app", from_fn(app_reducer), App { counter_mounted: true })?;
        if app.counter_mounted {
            let mounts = mounts.clone();
            let cleanups = cleanups.clone();
            store.use_effect("counter", move || {
                mounts.push(());
                Ok(Some(cleanup(move || {
                    cleanups.push(());
                    Ok(())
                })))
            });
        }
        Ok(())
    });
}

// ============================================================================
// Tests
// ============================================================================

/// An effect declared in cycles 1..=3 and dropped in cycle 4 runs its setup
/// once (cycle 1) and its cleanup once (cycle 4), and may mount afresh
/// afterwards.
#[test]
fn effect_mounts_once_and_cleans_up_once() {
    let (store, scheduler) = manual_store();
    let mounts = Probe::new();
    let cleanups = Probe::new();
    render_with_effect(&store, &mounts, &cleanups);

    store.refresh(); // cycle 1: mounts
    store.refresh(); // cycle 2: still declared, nothing re-runs
    store.refresh(); // cycle 3
    assert_eq!(mounts.len(), 1);
    assert!(cleanups.is_empty());

    store.dispatch(AppAction::Unmount, "app");
    scheduler.run_pending(); // cycle 4: undeclared, cleanup runs
    assert_eq!(mounts.len(), 1);
    assert_eq!(cleanups.len(), 1);

    store.dispatch(AppAction::Mount, "app");
    scheduler.run_pending(); // cycle 5: fresh mount
    assert_eq!(mounts.len(), 2);
    assert_eq!(cleanups.len(), 1);
}

/// Declaring an effect outside the notification window warns and does
/// nothing.
#[test]
fn effect_outside_notification_window_is_rejected() {
    let (store, _) = manual_store();
    let mounts: Probe<()> = Probe::new();
    {
        let mounts = mounts.clone();
        store.use_effect("stray", move || {
            mounts.push(());
            Ok(None)
        });
    }
    assert!(mounts.is_empty());

    // Nothing was registered, so nothing unmounts later either.
    store.refresh();
    assert!(mounts.is_empty());
}

/// A deferred effect's setup runs after the cycle's notification window and
/// after the callbacks that were already queued, and still mounts only
/// once.
#[test]
fn deferred_effect_mounts_after_the_callback_drain() {
    let (store, scheduler) = manual_store();
    let order: Probe<&'static str> = Probe::new();
    {
        let order = order.clone();
        store.subscribe(move |store| {
            order.push("notify");
            let order = order.clone();
            store.use_effect_with("deferred", EffectOptions::deferred(), move || {
                order.push("setup");
                Ok(None)
            });
            Ok(())
        });
    }
    let (_, dispatch) = store
        .use_reducer(
            "tick",
            from_fn(|amount: i64, prior: Rc<i64>| -> ReducerResult<i64> {
                Ok(Rc::new(*prior + amount))
            }),
            0_i64,
        )
        .unwrap();

    {
        let order = order.clone();
        dispatch.send_with(1, move |_: Option<Rc<i64>>| {
            order.push("callback");
            Ok(())
        });
    }
    scheduler.run_pending();
    assert_eq!(order.take(), vec!["notify", "callback", "setup"]);

    // Re-declared next cycle: already live, the setup does not run again.
    store.refresh();
    assert_eq!(order.take(), vec!["notify"]);
}

/// Two subscriptions declaring the same effect name share one mount.
#[test]
fn effect_shared_by_two_subscriptions_mounts_once() {
    let (store, _) = manual_store();
    let mounts: Probe<()> = Probe::new();
    for _ in 0..2 {
        let mounts = mounts.clone();
        store.subscribe(move |store| {
            let mounts = mounts.clone();
            store.use_effect("shared", move || {
                mounts.push(());
                Ok(None)
            });
            Ok(())
        });
    }

    store.refresh();
    assert_eq!(mounts.len(), 1);
}

/// A failing cleanup is contained; other unmounts in the same sweep still
/// run and the store stays usable.
#[test]
fn cleanup_failure_does_not_stop_other_unmounts() {
    let (store, scheduler) = manual_store();
    let cleanups: Probe<&'static str> = Probe::new();
    {
        let cleanups = cleanups.clone();
        store.subscribe(move |store| {
            let (app, _) =
                store.use_reducer("app", from_fn(app_reducer), App { counter_mounted: true })?;
            if app.counter_mounted {
                store.use_effect("bad", || {
                    Ok(Some(cleanup(|| Err(anyhow::anyhow!("teardown failed")))))
                });
                let cleanups = cleanups.clone();
                store.use_effect("good", move || {
                    let cleanups = cleanups.clone();
                    Ok(Some(cleanup(move || {
                        cleanups.push("good");
                        Ok(())
                    })))
                });
            }
            Ok(())
        });
    }

    store.refresh();
    store.dispatch(AppAction::Unmount, "app");
    scheduler.run_pending();
    assert_eq!(cleanups.take(), vec!["good"]);

    // Store still publishes after the failed teardown.
    store.dispatch(AppAction::Mount, "app");
    scheduler.run_pending();
    assert!(store.slice::<App>("app").unwrap().counter_mounted);
}

/// A setup that fails leaves no registration behind, so the next cycle
/// retries it.
#[test]
fn failed_setup_is_retried_next_cycle() {
    let (store, _) = manual_store();
    let attempts: Probe<()> = Probe::new();
    {
        let attempts = attempts.clone();
        store.subscribe(move |store| {
            let attempts = attempts.clone();
            store.use_effect("flaky", move || {
                attempts.push(());
                if attempts.len() == 1 {
                    Err(anyhow::anyhow!("first mount fails"))
                } else {
                    Ok(None)
                }
            });
            Ok(())
        });
    }

    store.refresh();
    assert_eq!(attempts.len(), 1);
    store.refresh();
    assert_eq!(attempts.len(), 2);
    // Mounted now; further cycles leave it alone.
    store.refresh();
    assert_eq!(attempts.len(), 2);
}
