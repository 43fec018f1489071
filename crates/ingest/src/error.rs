//! Queue transport error types.

use thiserror::Error;

/// Errors reported by a message source, producer or dead-letter sink.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SourceError {
    /// The other side of the queue is gone; no more messages will arrive.
    #[error("Queue closed")]
    Closed,

    /// A read, commit or publish failed but the queue is still usable.
    #[error("Transport error: {0}")]
    Transport(String),
}

/// Convenience type alias for queue results.
pub type Result<T> = std::result::Result<T, SourceError>;
