//! # cache-cell
//!
//! A single-value memoizing cache with request coalescing and timer-driven
//! background refresh.
//!
//! ## Features
//!
//! - **Single-Flight:** Any number of concurrent callers share one producer
//!   invocation; the producer runs at most once per freshness window
//! - **Fully Generic:** Cache any `T: Clone` from any async producer
//! - **Error Caching:** Producer failures are cached like values and passed
//!   through verbatim, bounding retry rate to the freshness window
//! - **Background Refresh:** Optional timer loop at half the TTL keeps the
//!   value perpetually warm and reports each outcome to a listener
//! - **Framework Independent:** No web framework, no storage backend — one
//!   in-process value slot
//!
//! ## Quick Start
//!
//! ### On-demand caching
//!
//! Use [`CacheCell`] when callers should pay for recomputation lazily:
//!
//! ```
//! use cache_cell::{CacheCell, Result};
//! use std::time::Duration;
//!
//! # async fn demo() -> Result<()> {
//! let cache = CacheCell::new(
//!     || async {
//!         // Expensive: database query, upstream HTTP call, ...
//!         Ok("Hello, World!".to_string())
//!     },
//!     Duration::from_secs(10),
//! )?;
//!
//! // Runs the producer once; concurrent and later calls inside the
//! // window share that one result.
//! let value = cache.get().await?;
//! # Ok(())
//! # }
//! ```
//!
//! ### Perpetually warm caching
//!
//! Use [`RefreshingCache`] to refresh proactively in the background:
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
//!     let value = cache.get().await?;
//!     cache.stop();
//!     Ok(())
//! }
//! ```

#[macro_use]
extern crate log;

pub mod cell;
pub mod error;
pub mod observability;
pub mod producer;
pub mod refresh;

// Re-exports for convenience
pub use cell::{Cache, CacheCell};
pub use error::{Error, Result};
pub use observability::{LogListener, RefreshListener};
pub use producer::Producer;
pub use refresh::RefreshingCache;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
