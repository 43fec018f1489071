//! Dead-letter sink trait and in-memory implementation.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::{Result, SourceError};
use crate::source::Message;

/// A message that could not be processed, with the reason.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeadLetter {
    pub message: Message,
    /// Error label, e.g. `malformed_payload`.
    pub kind: &'static str,
    /// Human-readable failure description.
    pub reason: String,
}

/// Trait for destinations of failed messages.
#[async_trait]
pub trait DeadLetterSink: Send + Sync {
    /// Stores a failed message for later inspection or replay.
    async fn publish(&self, letter: DeadLetter) -> Result<()>;
}

/// In-memory dead-letter sink.
///
/// Keeps every letter for the process lifetime. Used for tests and for
/// running the service without an external dead-letter topic.
#[derive(Debug, Clone, Default)]
pub struct InMemoryDeadLetterSink {
    letters: Arc<RwLock<Vec<DeadLetter>>>,
    fail_on_publish: Arc<AtomicBool>,
}

impl InMemoryDeadLetterSink {
    /// Creates a new empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configures the sink to reject every subsequent letter.
    pub fn set_fail_on_publish(&self, fail: bool) {
        self.fail_on_publish.store(fail, Ordering::SeqCst);
    }

    /// Returns a copy of every stored letter in arrival order.
    pub async fn letters(&self) -> Vec<DeadLetter> {
        self.letters.read().await.clone()
    }

    /// Returns the number of stored letters.
    pub async fn len(&self) -> usize {
        self.letters.read().await.len()
    }

    /// Returns true if no letter has been stored.
    pub async fn is_empty(&self) -> bool {
        self.letters.read().await.is_empty()
    }
}

#[async_trait]
impl DeadLetterSink for InMemoryDeadLetterSink {
    async fn publish(&self, letter: DeadLetter) -> Result<()> {
        if self.fail_on_publish.load(Ordering::SeqCst) {
            return Err(SourceError::Transport(
                "dead-letter sink unavailable".to_string(),
            ));
        }
        self.letters.write().await.push(letter);
        Ok(())
    }
}
