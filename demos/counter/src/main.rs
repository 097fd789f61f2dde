//! Counter demo binary
//!
//! Drives a store through dispatch batching and an effect mount/unmount
//! round-trip, printing what a UI layer would render.

use std::rc::Rc;

use coalesce_core::effect::cleanup;
use coalesce_core::{LogLevel, StoreOptions, StoreState};
use coalesce_runtime::Store;
use counter::{AppAction, AppReducer, AppState, CounterAction, CounterReducer, CounterState};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// The "render pass": declares both slices, prints the view, and keeps the
/// counter's logging effect mounted while the counter is shown.
fn render(store: &Store) -> anyhow::Result<()> {
    let (app, _) = store.use_reducer("app", AppReducer, AppState::default())?;
    if app.counter_mounted {
        let (counter, _) = store.use_reducer("counter", CounterReducer, CounterState::default())?;
        println!("  [view] counter = {}", counter.value);
        store.use_effect("counter-logger", || {
            println!("  [effect] counter mounted");
            Ok(Some(cleanup(|| {
                println!("  [effect] counter unmounted");
                Ok(())
            })))
        });
    } else {
        println!("  [view] counter hidden");
    }
    Ok(())
}

async fn run() {
    let options = StoreOptions::new().with_development(true).with_log_level(LogLevel::Debug);
    let store = Store::new(StoreState::new(), options);
    store.subscribe(render);

    println!("=== Coalesce Counter Demo ===\n");

    println!(">>> Initial render");
    store.refresh();

    println!("\n>>> Dispatching Add(-6) and Add(13) in one batch");
    let dispatch = store.bind::<CounterAction, CounterState>("counter");
    dispatch.send(CounterAction::Add(-6));
    dispatch.send(CounterAction::Add(13));
    yield_to_refresh().await;

    println!("\n>>> Dispatching Increment with a completion callback");
    dispatch.send_with(CounterAction::Increment, |value: Option<Rc<CounterState>>| {
        if let Some(value) = value {
            println!("  [callback] counter now {}", value.value);
        }
        Ok(())
    });
    yield_to_refresh().await;

    println!("\n>>> Unmounting the counter (effect cleanup runs once)");
    store.dispatch(AppAction::UnmountCounter, "app");
    yield_to_refresh().await;

    println!("\n>>> Mounting it again (effect sets up afresh, state kept)");
    store.dispatch(AppAction::MountCounter, "app");
    yield_to_refresh().await;

    let published = store.slice::<CounterState>("counter").map_or(0, |counter| counter.value);
    println!("\nFinal published counter: {published}");
    tracing::info!(counter = published, "demo finished");
}

/// Let the deferred refresh task run on the local queue.
async fn yield_to_refresh() {
    for _ in 0..4 {
        tokio::task::yield_now().await;
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "counter=info,coalesce=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let local = tokio::task::LocalSet::new();
    local.run_until(run()).await;
}
