//! Integration tests for the polling engine.
//!
//! These tests drive the engine on a paused Tokio clock and verify:
//! - The initial value and the immediate first fetch
//! - Success propagation and cadence
//! - Default and custom failure handling
//! - Stale results after restarts and deactivation
//! - Teardown stopping the loop


use api_polling::{PollingEngine, PollingOptions, Setter};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use test_helpers::{advance, data, options, Data, FetchError, ScriptedFetcher, DELAY};

#[tokio::test(start_paused = true)]
async fn test_returns_initial_state_before_first_settlement() {
    let fetcher = Arc::new(ScriptedFetcher::resolving("default").with_latency(Duration::from_millis(30)));
    let engine = PollingEngine::new(options(&fetcher));

    assert_eq!(engine.read(), data("initial"));

    engine.activate().unwrap();
    assert_eq!(engine.read(), data("initial"));

    advance(10).await;
    assert_eq!(engine.read(), data("initial"));
    assert_eq!(engine.version(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_fetches_on_activate_without_waiting_for_delay() {
    let fetcher = Arc::new(ScriptedFetcher::resolving("default"));
    let engine = PollingEngine::new(options(&fetcher));

    engine.activate().unwrap();
    advance(1).await;

    assert_eq!(fetcher.calls(), 1);
}

/// Scenario: updated on the first call, default thereafter
#[tokio::test(start_paused = true)]
async fn test_publishes_each_successful_result() {
    let fetcher = Arc::new(ScriptedFetcher::resolving("default").then_ok("updated"));
    let engine = PollingEngine::new(options(&fetcher));

    engine.activate().unwrap();
    assert_eq!(engine.read(), data("initial"));

    advance(50).await;
    assert_eq!(engine.read(), data("updated"));

    advance(100).await;
    assert_eq!(engine.read(), data("default"));
    assert_eq!(fetcher.calls(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_fetches_every_delay_after_settlement() {
    let fetcher = Arc::new(
        ScriptedFetcher::resolving("default")
            .then_ok("updated")
            .then_ok("updated2")
            .then_ok("updated3"),
    );
    let engine = PollingEngine::new(options(&fetcher));

    engine.activate().unwrap();
    advance(250).await;

    assert_eq!(fetcher.calls(), 3);
    assert_eq!(engine.read(), data("updated3"));
}

#[tokio::test(start_paused = true)]
async fn test_cadence_is_measured_from_settlement() {
    let latency = Duration::from_millis(30);
    let fetcher = Arc::new(ScriptedFetcher::resolving("default").with_latency(latency));
    let engine = PollingEngine::new(options(&fetcher));

    engine.activate().unwrap();
    advance(600).await;
    engine.deactivate();

    let issued = fetcher.issued_at();
    assert!(issued.len() >= 4, "expected at least 4 calls, got {}", issued.len());

    for pair in issued.windows(2) {
        let gap = pair[1] - pair[0];
        assert!(gap >= latency + DELAY, "gap {:?} shorter than latency + delay", gap);
        assert!(gap < latency + DELAY + Duration::from_millis(5), "gap {:?} too long", gap);
    }
}

/// Scenario: one success, then one failure, no handler
#[tokio::test(start_paused = true)]
async fn test_failure_resets_to_initial_state_by_default() {
    let fetcher = Arc::new(ScriptedFetcher::resolving("default").then_ok("updated").then_err("rejected"));
    let engine = PollingEngine::new(options(&fetcher));

    engine.activate().unwrap();

    advance(50).await;
    assert_eq!(engine.read(), data("updated"));

    advance(100).await;
    assert_eq!(engine.read(), data("initial"));

    // The loop keeps going after a failure
    advance(100).await;
    assert_eq!(engine.read(), data("default"));
    assert_eq!(fetcher.calls(), 3);
}

/// Scenario: always rejects, handler writes a sentinel value
#[tokio::test(start_paused = true)]
async fn test_failure_handler_decides_value() {
    let fetcher = Arc::new(ScriptedFetcher::rejecting("rejected"));
    let errors: Arc<Mutex<Vec<FetchError>>> = Arc::new(Mutex::new(Vec::new()));
    let seen = Arc::clone(&errors);

    let engine = PollingEngine::new(options(&fetcher).on_error(move |e, set: Setter<Data>| {
        seen.lock().push(e);
        set.set(data("handled"));
    }));

    engine.activate().unwrap();

    advance(50).await;
    assert_eq!(engine.read(), data("handled"));
    assert_eq!(errors.lock().len(), 1);
    assert_eq!(errors.lock()[0], FetchError("rejected".to_string()));

    advance(200).await;
    assert_eq!(engine.read(), data("handled"));
    assert_eq!(errors.lock().len(), 3);
    assert_eq!(fetcher.calls(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_noop_failure_handler_keeps_value_and_cadence() {
    let fetcher = Arc::new(ScriptedFetcher::rejecting("rejected").then_ok("updated"));
    let handled = Arc::new(AtomicUsize::new(0));
    let count = Arc::clone(&handled);

    let engine = PollingEngine::new(options(&fetcher).on_error(move |_e, _set| {
        count.fetch_add(1, Ordering::SeqCst);
    }));

    engine.activate().unwrap();
    advance(350).await;

    assert_eq!(engine.read(), data("updated"));
    assert_eq!(handled.load(Ordering::SeqCst), 3);
    assert_eq!(fetcher.calls(), 4);
}

/// Scenario: slow fetch A superseded by fast fetch B on a trigger change
#[tokio::test(start_paused = true)]
async fn test_trigger_change_discards_superseded_result() {
    let slow = Arc::new(
        ScriptedFetcher::resolving("stale").with_latency(Duration::from_millis(500)),
    );
    let fast = Arc::new(ScriptedFetcher::resolving("fresh").with_latency(Duration::from_millis(10)));

    let engine = PollingEngine::new(options(&slow).with_trigger("foo"));
    engine.activate().unwrap();

    advance(50).await;
    assert!(engine.reconcile(options(&fast).with_trigger("bar")).unwrap());

    advance(11).await;
    assert_eq!(engine.read(), data("fresh"));

    // The slow attempt settles at t=500 and must not land
    advance(540).await;
    assert_eq!(engine.read(), data("fresh"));

    let stats = engine.stats();
    assert_eq!(stats.stale_discarded, 1);
    assert_eq!(slow.calls(), 1);
    assert_eq!(stats.epochs, 2);
}

#[tokio::test(start_paused = true)]
async fn test_trigger_change_issues_exactly_one_new_fetch() {
    let old = Arc::new(ScriptedFetcher::resolving("default").then_ok("one").then_ok("two"));
    let new = Arc::new(ScriptedFetcher::resolving("default").then_ok("three").then_ok("four"));

    let engine = PollingEngine::new(options(&old).with_trigger("foo"));
    engine.activate().unwrap();

    advance(50).await;
    assert_eq!(engine.read(), data("one"));
    advance(100).await;
    assert_eq!(engine.read(), data("two"));

    let before = engine.current_token();
    assert!(engine.reconcile(options(&new).with_trigger("bar")).unwrap());
    assert_ne!(engine.current_token(), before);

    advance(1).await;
    assert_eq!(new.calls(), 1);
    assert_eq!(old.calls(), 2);

    advance(10).await;
    assert_eq!(engine.read(), data("three"));
    advance(100).await;
    assert_eq!(engine.read(), data("four"));
    assert_eq!(old.calls(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_unchanged_trigger_keeps_running_epoch() {
    let fetcher = Arc::new(ScriptedFetcher::resolving("default"));
    let other = Arc::new(ScriptedFetcher::resolving("other"));

    let engine = PollingEngine::new(options(&fetcher).with_trigger(7u32));
    engine.activate().unwrap();
    advance(50).await;

    assert!(!engine.reconcile(options(&other).with_trigger(7u32)).unwrap());
    advance(200).await;

    assert_eq!(other.calls(), 0);
    assert_eq!(engine.read(), data("default"));
}

#[tokio::test(start_paused = true)]
async fn test_failure_after_restart_is_not_reported() {
    let failing = Arc::new(ScriptedFetcher::rejecting("late").with_latency(Duration::from_millis(300)));
    let healthy = Arc::new(ScriptedFetcher::resolving("fresh"));
    let handled = Arc::new(AtomicUsize::new(0));

    let counting = |fetcher: &Arc<ScriptedFetcher>, trigger: &'static str| {
        let count = Arc::clone(&handled);
        options(fetcher)
            .on_error(move |_e, set: Setter<Data>| {
                count.fetch_add(1, Ordering::SeqCst);
                set.set(data("handled"));
            })
            .with_trigger(trigger)
    };

    let engine = PollingEngine::new(counting(&failing, "a"));
    engine.activate().unwrap();

    advance(50).await;
    engine.reconcile(counting(&healthy, "b")).unwrap();

    advance(400).await;
    assert_eq!(engine.read(), data("fresh"));
    assert_eq!(handled.load(Ordering::SeqCst), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_slow_handler_of_superseded_attempt_cannot_overwrite() {
    let failing = Arc::new(ScriptedFetcher::rejecting("down"));
    let healthy = Arc::new(ScriptedFetcher::resolving("fresh"));

    let (entered_tx, mut entered_rx) = tokio::sync::mpsc::unbounded_channel();
    let (written_tx, mut written_rx) = tokio::sync::mpsc::unbounded_channel();
    let (go_tx, go_rx) = std::sync::mpsc::channel::<()>();
    let go_rx = Mutex::new(go_rx);

    let slow_handler = options(&failing)
        .with_delay(Duration::from_secs(10))
        .on_error(move |_e, set: Setter<Data>| {
            let _ = entered_tx.send(());
            let _ = go_rx.lock().recv();
            let _ = written_tx.send(set.try_set(data("handled")));
        })
        .with_trigger("a");

    let engine = PollingEngine::new(slow_handler);
    engine.activate().unwrap();
    entered_rx.recv().await.unwrap();

    assert!(engine
        .reconcile(
            options(&healthy)
                .with_delay(Duration::from_secs(10))
                .with_trigger("b")
        )
        .unwrap());

    while engine.read() != data("fresh") {
        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    go_tx.send(()).unwrap();
    let written = written_rx.recv().await.unwrap();

    assert!(!written);
    assert_eq!(engine.read(), data("fresh"));
    assert_eq!(engine.stats().stale_discarded, 1);
}

#[tokio::test(start_paused = true)]
async fn test_handler_write_lands_while_attempt_is_current() {
    let fetcher = Arc::new(ScriptedFetcher::rejecting("down"));
    let written = Arc::new(Mutex::new(Vec::new()));
    let log = Arc::clone(&written);

    let engine = PollingEngine::new(options(&fetcher).on_error(move |e, set: Setter<Data>| {
        log.lock().push(set.try_set(data(&e.0)));
    }));

    engine.activate().unwrap();
    advance(1).await;

    assert_eq!(engine.read(), data("down"));
    assert_eq!(*written.lock(), vec![true]);
    assert_eq!(engine.stats().stale_discarded, 0);
}

/// Scenario: deactivate before the first fetch settles
#[tokio::test(start_paused = true)]
async fn test_deactivate_before_first_settlement() {
    let fetcher = Arc::new(ScriptedFetcher::resolving("updated").with_latency(Duration::from_millis(20)));
    let engine = PollingEngine::new(options(&fetcher));

    engine.activate().unwrap();
    engine.deactivate();

    advance(1_000).await;

    assert_eq!(engine.read(), data("initial"));
    assert!(fetcher.calls() <= 1);
    assert_eq!(engine.version(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_deactivate_stops_fetching() {
    let fetcher = Arc::new(ScriptedFetcher::resolving("default").then_ok("updated"));
    let engine = PollingEngine::new(options(&fetcher));

    engine.activate().unwrap();
    advance(150).await;
    assert_eq!(fetcher.calls(), 2);

    engine.deactivate();
    advance(5 * 100 + 50).await;

    assert_eq!(fetcher.calls(), 2);
    assert!(!engine.has_pending_timer());
}

#[tokio::test(start_paused = true)]
async fn test_deactivate_during_fetch_discards_result() {
    let fetcher = Arc::new(
        ScriptedFetcher::resolving("default")
            .then_ok("first")
            .then_ok("late")
            .with_latency(Duration::from_millis(40)),
    );
    let engine = PollingEngine::new(options(&fetcher));

    engine.activate().unwrap();
    advance(60).await;
    assert_eq!(engine.read(), data("first"));

    // Second fetch issued at t=140, settles at t=180
    advance(100).await;
    engine.deactivate();
    advance(500).await;

    assert_eq!(engine.read(), data("first"));
    assert_eq!(fetcher.calls(), 2);
    assert_eq!(engine.stats().stale_discarded, 1);
}

#[tokio::test(start_paused = true)]
async fn test_dropping_engine_stops_fetching() {
    let fetcher = Arc::new(ScriptedFetcher::resolving("default"));
    let engine = PollingEngine::new(options(&fetcher));

    engine.activate().unwrap();
    advance(50).await;
    drop(engine);

    advance(1_000).await;
    assert_eq!(fetcher.calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_watcher_notified_on_every_accepted_write() {
    let fetcher = Arc::new(ScriptedFetcher::resolving("same"));
    let engine = PollingEngine::new(options(&fetcher));
    let mut watcher = engine.watch();

    engine.activate().unwrap();

    assert_eq!(watcher.changed().await, Some(data("same")));
    assert_eq!(watcher.changed().await, Some(data("same")));
    assert_eq!(watcher.version(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_closure_fetcher() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);

    let engine: PollingEngine<usize, String> = PollingEngine::new(
        PollingOptions::new(
            move || {
                let n = counter.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n % 2 == 0 {
                        Ok(n)
                    } else {
                        Err(format!("odd call {}", n))
                    }
                }
            },
            usize::MAX,
        )
        .with_delay(DELAY),
    );

    engine.activate().unwrap();
    advance(50).await;
    assert_eq!(engine.read(), 0);

    advance(100).await;
    assert_eq!(engine.read(), usize::MAX);

    advance(100).await;
    assert_eq!(engine.read(), 2);
}
