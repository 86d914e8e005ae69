//! The producer seam: the expensive computation a cache wraps.

use crate::error::Result;
use std::future::Future;

/// An expensive, fallible computation whose latest result is worth caching.
///
/// The producer takes no input and is entirely opaque to the cache: arbitrary
/// latency, arbitrary failure behavior. The cache only invokes it and captures
/// the outcome. The single-flight guarantee ensures a producer is never
/// invoked concurrently with itself from the same cache instance.
///
/// Any `Fn() -> Future<Output = Result<T>>` closure implements this trait, so
/// most callers never implement it by hand:
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
/// let greeting = cache.get().await?;
/// # Ok(())
/// # }
/// ```
///
/// Implement the trait directly when the computation needs its own state,
/// e.g. a database pool or an HTTP client.
pub trait Producer<T>: Send + Sync {
    /// Run the computation once and return its outcome.
    ///
    /// The returned future must be `Send` so the background refresh loop can
    /// drive it from a spawned task.
    fn produce(&self) -> impl Future<Output = Result<T>> + Send;
}

impl<T, F, Fut> Producer<T> for F
where
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = Result<T>> + Send,
{
    fn produce(&self) -> impl Future<Output = Result<T>> + Send {
        self()
    }
}
