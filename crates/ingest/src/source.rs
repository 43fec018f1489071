//! Message source abstraction.

use std::time::Duration;

use async_trait::async_trait;

use crate::error::Result;

/// A message delivered by the queue transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    /// Opaque payload, normally a JSON-encoded order.
    pub payload: Vec<u8>,
    /// Optional partitioning key.
    pub key: Option<Vec<u8>>,
    pub partition: i32,
    /// Position within the partition. Increases with delivery order.
    pub offset: i64,
}

impl Message {
    /// Creates an unkeyed message on partition 0.
    pub fn new(offset: i64, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            payload: payload.into(),
            key: None,
            partition: 0,
            offset,
        }
    }
}

/// Trait for subscriptions that deliver messages in order per partition.
#[async_trait]
pub trait MessageSource: Send + Sync {
    /// Waits up to `timeout` for the next message.
    ///
    /// Returns `Ok(None)` when the wait times out. Returns
    /// `Err(SourceError::Closed)` once no further messages can arrive.
    async fn next_message(&mut self, timeout: Duration) -> Result<Option<Message>>;

    /// Acknowledges a message so the transport does not redeliver it.
    async fn commit(&mut self, message: &Message) -> Result<()>;

    /// Releases the subscription. Called once while draining.
    async fn close(&mut self);
}
