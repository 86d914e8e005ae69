//! Integration tests for the background refresh loop
//!
//! These tests verify the timer cadence, listener dispatch exclusivity, the
//! stop lifecycle, and that the background path shares dedup state with
//! on-demand callers.

use cache_cell::{Error, RefreshListener, RefreshingCache};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::{sleep, timeout};

/// Surface the refresh loop's debug logging in test output via RUST_LOG.
fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Records every callback so tests can assert on dispatch behavior.
#[derive(Default)]
struct Recorded {
    values: Mutex<Vec<String>>,
    errors: Mutex<Vec<String>>,
    notify: tokio::sync::Notify,
}

#[derive(Clone, Default)]
struct RecordingListener {
    recorded: Arc<Recorded>,
}

impl RecordingListener {
    fn total(&self) -> usize {
        self.recorded.values.lock().expect("values lock poisoned").len()
            + self.recorded.errors.lock().expect("errors lock poisoned").len()
    }
}

impl RefreshListener<String> for RecordingListener {
    fn on_value(&self, value: String) {
        self.recorded
            .values
            .lock()
            .expect("values lock poisoned")
            .push(value);
        self.recorded.notify.notify_waiters();
    }

    fn on_error(&self, error: Error) {
        self.recorded
            .errors
            .lock()
            .expect("errors lock poisoned")
            .push(error.to_string());
        self.recorded.notify.notify_waiters();
    }
}

/// Test 1: Cadence
///
/// With duration D, the loop delivers a callback within about D/2 of start,
/// and stop halts further callbacks for at least two would-be ticks.
#[tokio::test]
async fn test_cadence_and_stop() {
    init_logging();
    let listener = RecordingListener::default();
    let cache = RefreshingCache::new(
        || async { Ok("warm".to_string()) },
        Duration::from_millis(100),
        listener.clone(),
    )
    .expect("Failed to build cache");

    cache.start();

    // First callback arrives around one tick (50ms); 1s is a generous bound.
    timeout(Duration::from_secs(1), listener.recorded.notify.notified())
        .await
        .expect("Listener should be notified within a tick");
    assert!(listener.total() >= 1);

    cache.stop();
    // Let an in-progress tick settle before snapshotting.
    sleep(Duration::from_millis(60)).await;
    let after_stop = listener.total();

    // Two further tick periods pass without a single callback.
    sleep(Duration::from_millis(120)).await;
    assert_eq!(listener.total(), after_stop);
}

/// Test 2: Callback exclusivity
///
/// For every completed tick exactly one callback fires, matching the
/// producer's actual outcome: alternating success/failure produces only
/// matching on_value/on_error calls and their counts add up.
#[tokio::test]
async fn test_exactly_one_callback_per_tick_matching_outcome() {
    init_logging();
    let invocations = Arc::new(AtomicUsize::new(0));
    let producer_invocations = Arc::clone(&invocations);
    let listener = RecordingListener::default();
    let cache = RefreshingCache::new(
        move || {
            let invocations = Arc::clone(&producer_invocations);
            async move {
                let n = invocations.fetch_add(1, Ordering::SeqCst);
                if n % 2 == 0 {
                    Ok(format!("tick {}", n))
                } else {
                    Err(Error::from(format!("outage at tick {}", n)))
                }
            }
        },
        Duration::from_millis(40),
        listener.clone(),
    )
    .expect("Failed to build cache");

    cache.start();
    while listener.total() < 6 {
        timeout(Duration::from_secs(1), listener.recorded.notify.notified())
            .await
            .expect("Listener should keep being notified");
    }
    cache.stop();
    sleep(Duration::from_millis(40)).await;

    let values = listener.recorded.values.lock().expect("values lock poisoned");
    let errors = listener.recorded.errors.lock().expect("errors lock poisoned");

    // One callback per completed refresh, success and failure both present.
    assert_eq!(
        values.len() + errors.len(),
        invocations.load(Ordering::SeqCst)
    );
    assert!(!values.is_empty());
    assert!(!errors.is_empty());

    for value in values.iter() {
        assert!(value.starts_with("tick "));
    }
    for error in errors.iter() {
        assert!(error.starts_with("outage at tick "));
    }
}

/// Test 3: The background loop and on-demand callers share one slot
///
/// A `get` issued while a background tick's refresh is in flight joins that
/// refresh instead of running the producer again.
#[tokio::test]
async fn test_on_demand_get_joins_background_refresh() {
    init_logging();
    let invocations = Arc::new(AtomicUsize::new(0));
    let producer_invocations = Arc::clone(&invocations);
    let cache = Arc::new(
        RefreshingCache::unmonitored(
            move || {
                let invocations = Arc::clone(&producer_invocations);
                async move {
                    invocations.fetch_add(1, Ordering::SeqCst);
                    sleep(Duration::from_millis(80)).await;
                    Ok("joined".to_string())
                }
            },
            Duration::from_millis(100),
        )
        .expect("Failed to build cache"),
    );

    cache.start();
    // Land inside the first tick's 80ms producer run (tick at ~50ms).
    sleep(Duration::from_millis(60)).await;

    let value = cache.get().await.expect("Get should succeed");
    assert_eq!(value, "joined");
    assert_eq!(invocations.load(Ordering::SeqCst), 1);

    cache.stop();
}

/// Test 4: Errors never stop the loop
///
/// A permanently failing producer keeps ticking; each tick is independent.
#[tokio::test]
async fn test_failing_producer_keeps_ticking() {
    init_logging();
    let invocations = Arc::new(AtomicUsize::new(0));
    let producer_invocations = Arc::clone(&invocations);
    let cache = RefreshingCache::unmonitored(
        move || {
            let invocations = Arc::clone(&producer_invocations);
            async move {
                invocations.fetch_add(1, Ordering::SeqCst);
                Err::<String, _>(Error::from("permanent outage"))
            }
        },
        Duration::from_millis(20),
    )
    .expect("Failed to build cache");

    cache.start();
    sleep(Duration::from_millis(150)).await;
    cache.stop();

    assert!(invocations.load(Ordering::SeqCst) >= 3);
}

/// Test 5: Zero duration rejected at the refreshing layer too
#[tokio::test]
async fn test_zero_duration_config_error() {
    init_logging();
    let result =
        RefreshingCache::unmonitored(|| async { Ok("never".to_string()) }, Duration::ZERO);
    assert!(matches!(result, Err(Error::Config(_))));
}
