//! Error types for the cache.

use std::fmt;
use std::sync::Arc;

/// Result type for cache operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for cache operations.
///
/// The cache itself introduces no failure modes of its own on the `get` /
/// `refresh` path: whatever the producer returns is what callers see. `Error`
/// is `Clone` because a single producer outcome fans out to every caller
/// joined to the same computation.
#[derive(Debug, Clone)]
pub enum Error {
    /// The producer failed.
    ///
    /// The original error is carried untouched and shared between waiters.
    /// Use [`std::error::Error::source`] to reach it, or `Display`, which
    /// passes the producer's own message through verbatim.
    ///
    /// Producer errors are cached exactly like values: every caller inside
    /// the freshness window receives this same error, and one new attempt is
    /// made after it expires.
    Producer(Arc<dyn std::error::Error + Send + Sync>),

    /// Invalid construction-time configuration.
    ///
    /// Raised when creating a cache with a zero freshness duration. Never
    /// returned by `get` or `refresh`.
    Config(String),

    /// The in-flight computation was dropped before completing.
    ///
    /// Only possible when the future driving the producer is cancelled
    /// mid-flight. Waiters joined to that computation receive this error;
    /// the next `get` or `refresh` starts a fresh computation.
    Abandoned,
}

impl Error {
    /// Wrap a producer failure.
    pub fn producer<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Error::Producer(Arc::new(err))
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Producer(err) => write!(f, "{}", err),
            Error::Config(msg) => write!(f, "Config error: {}", msg),
            Error::Abandoned => write!(f, "In-flight computation was abandoned"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Producer(err) => Some(err.as_ref()),
            _ => None,
        }
    }
}

// ============================================================================
// Conversions from other error types
// ============================================================================

/// Plain-text producer failure, for producers that report errors as strings.
#[derive(Debug)]
struct Message(String);

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for Message {}

impl From<String> for Error {
    fn from(msg: String) -> Self {
        Error::Producer(Arc::new(Message(msg)))
    }
}

impl From<&str> for Error {
    fn from(msg: &str) -> Self {
        Error::Producer(Arc::new(Message(msg.to_string())))
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::producer(e)
    }
}
