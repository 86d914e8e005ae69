//! Refresh outcome reporting.
//!
//! A [`RefreshingCache`](crate::RefreshingCache) reports every timer-driven
//! refresh to a [`RefreshListener`]: exactly one of `on_value` / `on_error`
//! fires per completed tick, matching the producer's actual outcome. What the
//! listener does with that — logging, metrics counters, health gauges — is
//! entirely up to the caller.
//!
//! ```ignore
//! use cache_cell::RefreshListener;
//! use cache_cell::Error;
//!
//! struct PrometheusListener;
//!
//! impl RefreshListener<String> for PrometheusListener {
//!     fn on_value(&self, _value: String) {
//!         // counter!("cache_refresh_ok").inc();
//!     }
//!     fn on_error(&self, _error: Error) {
//!         // counter!("cache_refresh_failed").inc();
//!     }
//! }
//! ```
//!
//! [`LogListener`] is a ready-made implementation that reports through the
//! `log` crate, useful when refresh visibility in logs is all you need.

use crate::error::Error;
use std::fmt::Debug;

/// Observer of background refresh outcomes.
///
/// Callbacks run on the task driving the refresh loop, so implementations
/// must be `Send + Sync` and should return quickly: a slow callback delays
/// the next tick.
pub trait RefreshListener<T>: Send + Sync {
    /// A background refresh completed successfully with `value`.
    fn on_value(&self, value: T);

    /// A background refresh failed with `error`.
    fn on_error(&self, error: Error);
}

/// Listener that reports refresh outcomes via the `log` crate.
///
/// Successful refreshes log at `debug`, failures at `warn`.
#[derive(Clone, Copy, Default)]
pub struct LogListener;

impl<T: Debug> RefreshListener<T> for LogListener {
    fn on_value(&self, value: T) {
        debug!("✓ Background refresh OK: {:?}", value);
    }

    fn on_error(&self, error: Error) {
        warn!("⚠ Background refresh failed: {}", error);
    }
}
