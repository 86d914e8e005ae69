//! Timer-driven background refresh over a [`CacheCell`].
//!
//! [`RefreshingCache`] composes a [`CacheCell`] with one background task that
//! calls [`CacheCell::refresh`] on a fixed cadence and reports each outcome
//! to a [`RefreshListener`]. On-demand `get`/`refresh` calls pass through to
//! the same cell, so the background loop and on-demand callers share one
//! value slot and one in-flight computation — the two paths can never run the
//! producer twice concurrently.
//!
//! The tick period is half the freshness duration: refreshing at half the
//! TTL keeps the value perpetually fresh for readers and bounds worst-case
//! staleness to half the configured window.
//!
//! # Example
//!
//! ```no_run
//! use cache_cell::{LogListener, RefreshingCache, Result};
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let cache = RefreshingCache::new(
//!         || async { Ok("Hello, World!".to_string()) },
//!         Duration::from_secs(10),
//!         LogListener,
//!     )?;
//!
//!     cache.start();
//!     // Readers see a perpetually warm value from here on.
//!     let value = cache.get().await?;
//!     println!("{}", value);
//!     cache.stop();
//!     Ok(())
//! }
//! ```

use crate::cell::{Cache, CacheCell};
use crate::error::Result;
use crate::observability::RefreshListener;
use crate::producer::Producer;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::sleep;

/// A [`CacheCell`] kept perpetually warm by a background refresh loop.
///
/// `start` spawns the loop on the ambient tokio runtime; `stop` signals it to
/// exit. Both take `&self`, so the cache can be shared behind an `Arc` and
/// driven from anywhere. Dropping the cache also stops the loop.
pub struct RefreshingCache<T, P> {
    cell: Arc<CacheCell<T, P>>,
    period: Duration,
    listener: Option<Arc<dyn RefreshListener<T>>>,
    stop: watch::Sender<bool>,
    loop_handle: Mutex<Option<JoinHandle<()>>>,
}

impl<T, P> RefreshingCache<T, P>
where
    T: Clone + Send + Sync + 'static,
    P: Producer<T> + 'static,
{
    /// Create a refreshing cache reporting each background outcome to
    /// `listener`.
    ///
    /// The tick period is `duration / 2`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`](crate::Error::Config) if `duration` is zero,
    /// as [`CacheCell::new`] does.
    pub fn new<L>(producer: P, duration: Duration, listener: L) -> Result<Self>
    where
        L: RefreshListener<T> + 'static,
    {
        Self::build(producer, duration, Some(Arc::new(listener)))
    }

    /// Create a refreshing cache with no listener.
    ///
    /// Background refreshes still run; their outcomes are simply not
    /// reported.
    pub fn unmonitored(producer: P, duration: Duration) -> Result<Self> {
        Self::build(producer, duration, None)
    }

    fn build(
        producer: P,
        duration: Duration,
        listener: Option<Arc<dyn RefreshListener<T>>>,
    ) -> Result<Self> {
        let cell = Arc::new(CacheCell::new(producer, duration)?);
        let (stop, _rx) = watch::channel(false);
        let period = cell.duration() / 2;

        Ok(RefreshingCache {
            cell,
            period,
            listener,
            stop,
            loop_handle: Mutex::new(None),
        })
    }

    /// Start the background refresh loop.
    ///
    /// Must be called from within a tokio runtime. Each tick forces one
    /// refresh on the shared cell and dispatches the outcome to exactly one
    /// of the listener's callbacks. A failed refresh never stops the loop;
    /// the next tick retries independently.
    ///
    /// Calling `start` on an already-started cache is a logged no-op: the
    /// loop is never doubled.
    pub fn start(&self) {
        let mut handle = self
            .loop_handle
            .lock()
            .expect("refresh loop handle mutex poisoned");
        if handle.is_some() {
            warn!("⚠ RefreshingCache already started; ignoring");
            return;
        }

        let cell = Arc::clone(&self.cell);
        let listener = self.listener.clone();
        let period = self.period;
        let mut stop = self.stop.subscribe();

        debug!("✓ RefreshingCache starting (tick every {:?})", period);
        *handle = Some(tokio::spawn(async move {
            if *stop.borrow_and_update() {
                return;
            }
            loop {
                tokio::select! {
                    // Also fires when the cache itself is dropped.
                    _ = stop.changed() => break,
                    _ = sleep(period) => {
                        match cell.refresh().await {
                            Ok(value) => {
                                if let Some(listener) = &listener {
                                    listener.on_value(value);
                                }
                            }
                            Err(err) => {
                                warn!("⚠ Background refresh failed: {}", err);
                                if let Some(listener) = &listener {
                                    listener.on_error(err);
                                }
                            }
                        }
                    }
                }
            }
            debug!("✓ RefreshingCache loop stopped");
        }));
    }

    /// Stop the background refresh loop.
    ///
    /// Safe to call any number of times, before or after `start`. A tick
    /// already in progress may still complete and notify the listener; no
    /// further ticks are scheduled after the signal is observed. A producer
    /// call already underway is not cancelled.
    ///
    /// Stopping is permanent for this instance: a later `start` will not
    /// restart the loop.
    pub fn stop(&self) {
        // Send never fails while the loop holds a receiver; if the loop is
        // already gone there is nothing to stop.
        let _ = self.stop.send(true);
    }

    /// Read the cached value through the underlying cell.
    ///
    /// Identical guarantees to [`CacheCell::get`]; on-demand callers share
    /// the cell's value and in-flight state with the background loop.
    pub async fn get(&self) -> Result<T> {
        self.cell.get().await
    }

    /// Force a refresh through the underlying cell.
    pub async fn refresh(&self) -> Result<T> {
        self.cell.refresh().await
    }
}

impl<T, P> Cache<T> for RefreshingCache<T, P>
where
    T: Clone + Send + Sync + 'static,
    P: Producer<T> + 'static,
{
    async fn get(&self) -> Result<T> {
        RefreshingCache::get(self).await
    }

    async fn refresh(&self) -> Result<T> {
        RefreshingCache::refresh(self).await
    }
}
