//! End-to-end flow for the counter demo: render subscription, batched
//! dispatches, callback delivery, and the effect mount/unmount round-trip.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)] // Test code can use unwrap/expect/panic

use std::rc::Rc;

use coalesce_core::effect::cleanup;
use coalesce_core::{StoreOptions, StoreState};
use coalesce_runtime::Store;
use coalesce_testing::{ManualScheduler, Probe};
use counter::{AppAction, AppReducer, AppState, CounterAction, CounterReducer, CounterState};

fn demo_store() -> (Store, Rc<ManualScheduler>, Probe<&'static str>) {
    let scheduler = Rc::new(ManualScheduler::new());
    let store =
        Store::with_scheduler(StoreState::new(), StoreOptions::default(), scheduler.clone());
    let events: Probe<&'static str> = Probe::new();
    {
        let events = events.clone();
        store.subscribe(move |store| {
            let (app, _) = store.use_reducer("app", AppReducer, AppState::default())?;
            if app.counter_mounted {
                let (_, _) = store.use_reducer("counter", CounterReducer, CounterState::default())?;
                let events = events.clone();
                store.use_effect("counter-logger", move || {
                    events.push("mounted");
                    let events = events.clone();
                    Ok(Some(cleanup(move || {
                        events.push("unmounted");
                        Ok(())
                    })))
                });
            }
            Ok(())
        });
    }
    (store, scheduler, events)
}

#[test]
fn batched_dispatches_publish_the_accumulated_value() {
    let (store, scheduler, _) = demo_store();
    store.refresh();

    let dispatch = store.bind::<CounterAction, CounterState>("counter");
    dispatch.send(CounterAction::Add(-6));
    dispatch.send(CounterAction::Add(13));
    assert_eq!(scheduler.run_pending(), 1);
    assert_eq!(store.slice::<CounterState>("counter").unwrap().value, 7);
}

#[test]
fn callback_reports_the_published_counter() {
    let (store, scheduler, _) = demo_store();
    store.refresh();

    let delivered = Probe::new();
    let dispatch = store.bind::<CounterAction, CounterState>("counter");
    {
        let delivered = delivered.clone();
        dispatch.send_with(CounterAction::Increment, move |value: Option<Rc<CounterState>>| {
            delivered.push(value.unwrap().value);
            Ok(())
        });
    }
    scheduler.run_pending();
    assert_eq!(delivered.take(), vec![1]);
}

#[test]
fn unmounting_the_counter_tears_the_effect_down_once() {
    let (store, scheduler, events) = demo_store();
    store.refresh();
    store.refresh();
    assert_eq!(events.snapshot(), vec!["mounted"]);

    store.dispatch(AppAction::UnmountCounter, "app");
    scheduler.run_pending();
    assert_eq!(events.snapshot(), vec!["mounted", "unmounted"]);

    // State survives the unmount; remounting sets the effect up afresh.
    store.dispatch(CounterAction::Add(3), "counter");
    store.dispatch(AppAction::MountCounter, "app");
    scheduler.run_pending();
    assert_eq!(events.take(), vec!["mounted", "unmounted", "mounted"]);
    assert_eq!(store.slice::<CounterState>("counter").unwrap().value, 3);
}
