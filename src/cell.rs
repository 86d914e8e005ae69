//! Single-slot memoizing cache with request coalescing.
//!
//! [`CacheCell`] wraps one expensive, fallible producer and holds its most
//! recent outcome for a configured freshness duration. Any number of callers
//! may hit the cell concurrently; the producer runs at most once per window.
//!
//! # How coalescing works
//!
//! The cell keeps two fields behind one mutex: the current value (if any) and
//! the in-flight computation (if any). On the slow path every caller performs
//! a single check-then-act under that mutex:
//!
//! - An in-flight computation exists: subscribe to its completion channel and
//!   wait. The channel payload is that exact computation's outcome, so a
//!   waiter can never observe a result from a later, overlapping call.
//! - No computation in flight: install one and become the leader. The leader
//!   runs the producer with no lock held, stamps the expiry, publishes the
//!   result and clears the in-flight slot in one lock acquisition, then
//!   broadcasts to every waiter.
//!
//! Completion is signalled over a `tokio::sync::watch` channel. `watch` is
//! level-triggered: a caller that subscribes after the broadcast still
//! observes the published outcome, so there is no missed-wakeup window.
//!
//! The fast path takes the same mutex for a few instructions to clone out the
//! current value. The producer never runs under the lock, so a slow producer
//! never stalls fresh-value reads.
//!
//! # Failure semantics
//!
//! Producer errors are cached exactly like values, with their own expiry.
//! Every caller inside the freshness window sees the same error; one new
//! attempt is made after it expires. The cell never retries faster than the
//! freshness window and never rewrites the producer's error.

use crate::error::{Error, Result};
use crate::producer::Producer;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};
use tokio::sync::watch;

/// Read/recompute interface shared by [`CacheCell`] and
/// [`RefreshingCache`](crate::RefreshingCache).
///
/// **IMPORTANT:** All methods use `&self`; implementations use interior
/// mutability and are safe to share across tasks behind an `Arc`.
#[allow(async_fn_in_trait)]
pub trait Cache<T>: Send + Sync {
    /// Return the cached value, recomputing it first if missing or expired.
    async fn get(&self) -> Result<T>;

    /// Force a recomputation, joining one already in flight.
    async fn refresh(&self) -> Result<T>;
}

/// One completed producer invocation and its validity deadline.
///
/// Immutable once built. `expires_at` is stamped exactly once, at completion
/// time, and never recomputed.
struct CachedValue<T> {
    result: Result<T>,
    expires_at: Instant,
}

impl<T> CachedValue<T> {
    fn is_expired(&self) -> bool {
        Instant::now() >= self.expires_at
    }
}

/// A producer invocation currently executing.
///
/// The `watch` sender doubles as the broadcast-once completion signal and the
/// carrier of this call's outcome. Exactly one `InFlight` exists per cell at
/// any time.
struct InFlight<T> {
    outcome: watch::Sender<Option<Result<T>>>,
}

impl<T> InFlight<T> {
    fn new() -> Self {
        let (outcome, _rx) = watch::channel(None);
        InFlight { outcome }
    }
}

struct State<T> {
    current: Option<Arc<CachedValue<T>>>,
    in_flight: Option<Arc<InFlight<T>>>,
}

/// What a slow-path caller decided to do, under a single lock acquisition.
enum Role<T> {
    Lead(Arc<InFlight<T>>),
    Join(watch::Receiver<Option<Result<T>>>),
}

/// Clears the in-flight slot if the leading future is dropped before it
/// publishes. Without this, a cancelled leader would leave waiters joined to
/// a computation that can no longer complete and block all future refreshes.
struct AbandonGuard<'a, T> {
    state: &'a Mutex<State<T>>,
    call: &'a Arc<InFlight<T>>,
    armed: bool,
}

impl<T> Drop for AbandonGuard<'_, T> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let mut state = lock_state(self.state);
        if let Some(in_flight) = &state.in_flight {
            if Arc::ptr_eq(in_flight, self.call) {
                warn!("CacheCell leader dropped mid-flight; clearing in-flight slot");
                state.in_flight = None;
            }
        }
    }
}

fn lock_state<T>(state: &Mutex<State<T>>) -> MutexGuard<'_, State<T>> {
    // A panic while holding this lock means a bug in this module, not in the
    // producer (which never runs under the lock).
    state.lock().expect("cache state mutex poisoned")
}

/// A single-value memoizing cache.
///
/// Constructed from a [`Producer`] and a freshness duration. See the module
/// docs for the coalescing and failure semantics.
///
/// # Example
///
/// ```
/// use cache_cell::{CacheCell, Result};
/// use std::time::Duration;
///
/// # async fn demo() -> Result<()> {
/// let cache = CacheCell::new(
///     || async { Ok("Hello, World!".to_string()) },
///     Duration::from_secs(10),
/// )?;
///
/// // First call runs the producer; later calls inside the window do not.
/// let first = cache.get().await?;
/// let second = cache.get().await?;
/// assert_eq!(first, second);
/// # Ok(())
/// # }
/// ```
pub struct CacheCell<T, P> {
    producer: P,
    duration: Duration,
    state: Mutex<State<T>>,
}

impl<T, P> CacheCell<T, P>
where
    T: Clone,
    P: Producer<T>,
{
    /// Create a cell around `producer` with the given freshness duration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if `duration` is zero. A zero window would
    /// make every `get` recompute, which is never what a cache caller wants;
    /// it is rejected up front rather than silently degrading.
    pub fn new(producer: P, duration: Duration) -> Result<Self> {
        if duration.is_zero() {
            return Err(Error::Config(
                "freshness duration must be non-zero".to_string(),
            ));
        }

        Ok(CacheCell {
            producer,
            duration,
            state: Mutex::new(State {
                current: None,
                in_flight: None,
            }),
        })
    }

    /// The configured freshness duration.
    pub fn duration(&self) -> Duration {
        self.duration
    }

    /// Return the cached value, recomputing it first if missing or expired.
    ///
    /// Callers arriving while a computation is in flight wait for it and
    /// receive its outcome — even if that outcome is already stale by the
    /// time it lands. Staleness is re-evaluated on the next `get`, never
    /// retroactively.
    pub async fn get(&self) -> Result<T> {
        {
            let state = lock_state(&self.state);
            if let Some(current) = &state.current {
                if !current.is_expired() {
                    debug!("✓ CacheCell GET -> HIT");
                    return current.result.clone();
                }
            }
        }

        debug!("✓ CacheCell GET -> MISS");
        self.refresh().await
    }

    /// Force a recomputation and return its outcome.
    ///
    /// If a computation is already in flight this joins it instead of
    /// starting a duplicate; this is the only way a non-expired value gets
    /// replaced, and it is what the background refresher calls on each tick.
    pub async fn refresh(&self) -> Result<T> {
        // Check-then-act in one lock acquisition: two concurrent slow-path
        // callers can never both decide to lead.
        let role = {
            let mut state = lock_state(&self.state);
            match &state.in_flight {
                Some(existing) => Role::Join(existing.outcome.subscribe()),
                None => {
                    let call = Arc::new(InFlight::new());
                    state.in_flight = Some(Arc::clone(&call));
                    Role::Lead(call)
                }
            }
        };

        match role {
            Role::Join(rx) => {
                debug!("CacheCell REFRESH -> joining in-flight computation");
                Self::wait_for(rx).await
            }
            Role::Lead(call) => self.lead(call).await,
        }
    }

    /// Run the producer as the leader of `call`, publish, and broadcast.
    async fn lead(&self, call: Arc<InFlight<T>>) -> Result<T> {
        let mut guard = AbandonGuard {
            state: &self.state,
            call: &call,
            armed: true,
        };

        // No lock is held here: producer latency never blocks fast-path
        // reads of the current value.
        let result = self.producer.produce().await;
        let expires_at = Instant::now() + self.duration;

        {
            let mut state = lock_state(&self.state);
            state.current = Some(Arc::new(CachedValue {
                result: result.clone(),
                expires_at,
            }));
            state.in_flight = None;
        }
        guard.armed = false;

        match &result {
            Ok(_) => debug!("✓ CacheCell REFRESH published (TTL: {:?})", self.duration),
            Err(err) => debug!(
                "✓ CacheCell REFRESH published error (TTL: {:?}): {}",
                self.duration, err
            ),
        }

        // Waiters read the broadcast payload, never the (possibly already
        // superseded) current slot.
        let _ = call.outcome.send(Some(result.clone()));
        result
    }

    async fn wait_for(mut rx: watch::Receiver<Option<Result<T>>>) -> Result<T> {
        loop {
            if let Some(outcome) = rx.borrow_and_update().clone() {
                return outcome;
            }
            if rx.changed().await.is_err() {
                // Sender gone without a broadcast: the leader was dropped.
                return Err(Error::Abandoned);
            }
        }
    }
}

impl<T, P> Cache<T> for CacheCell<T, P>
where
    T: Clone + Send + Sync,
    P: Producer<T>,
{
    async fn get(&self) -> Result<T> {
        CacheCell::get(self).await
    }

    async fn refresh(&self) -> Result<T> {
        CacheCell::refresh(self).await
    }
}
