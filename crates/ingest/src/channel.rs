//! In-process queue built on a bounded tokio mpsc channel.
//!
//! [`QueueProducer`] assigns each published message the next offset of a
//! single partition; [`ChannelSource`] delivers them in that order. Commits are
//! recorded in a [`CommitTracker`] that outlives the source, so callers can
//! observe consumer progress after the consumer task has finished.

use std::sync::Arc;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{Mutex, mpsc};

use crate::error::{Result, SourceError};
use crate::source::{Message, MessageSource};

const NO_COMMIT: i64 = -1;

/// Creates a connected producer/source pair holding at most `capacity`
/// undelivered messages.
pub fn channel(capacity: usize) -> (QueueProducer, ChannelSource) {
    let (sender, receiver) = mpsc::channel(capacity.max(1));
    let producer = QueueProducer {
        sender,
        partition: 0,
        next_offset: Arc::new(Mutex::new(0)),
    };
    let source = ChannelSource {
        receiver,
        commits: CommitTracker::default(),
    };
    (producer, source)
}

/// Publishing half of the in-process queue. Cheap to clone.
#[derive(Debug, Clone)]
pub struct QueueProducer {
    sender: mpsc::Sender<Message>,
    partition: i32,
    next_offset: Arc<Mutex<i64>>,
}

impl QueueProducer {
    /// Publishes an unkeyed payload and returns its offset.
    pub async fn publish(&self, payload: Vec<u8>) -> Result<i64> {
        self.publish_keyed(None, payload).await
    }

    /// Publishes a payload with an optional key and returns its offset.
    ///
    /// Waits for capacity when the queue is full. Fails with
    /// `SourceError::Closed` once the source has been closed or dropped.
    pub async fn publish_keyed(&self, key: Option<Vec<u8>>, payload: Vec<u8>) -> Result<i64> {
        // Offset assignment and enqueue happen under one lock so offsets
        // reach the source in increasing order.
        let mut next_offset = self.next_offset.lock().await;
        let permit = self
            .sender
            .reserve()
            .await
            .map_err(|_| SourceError::Closed)?;

        let offset = *next_offset;
        permit.send(Message {
            payload,
            key,
            partition: self.partition,
            offset,
        });
        *next_offset += 1;

        tracing::debug!(offset, "message published");
        Ok(offset)
    }

    /// Partition this producer writes to.
    pub fn partition(&self) -> i32 {
        self.partition
    }

    /// Returns true once the source side is gone.
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }
}

/// Consuming half of the in-process queue.
#[derive(Debug)]
pub struct ChannelSource {
    receiver: mpsc::Receiver<Message>,
    commits: CommitTracker,
}

impl ChannelSource {
    /// Returns a handle observing this source's commits.
    pub fn commit_tracker(&self) -> CommitTracker {
        self.commits.clone()
    }
}

#[async_trait]
impl MessageSource for ChannelSource {
    async fn next_message(&mut self, timeout: Duration) -> Result<Option<Message>> {
        match tokio::time::timeout(timeout, self.receiver.recv()).await {
            Ok(Some(message)) => Ok(Some(message)),
            Ok(None) => Err(SourceError::Closed),
            Err(_elapsed) => Ok(None),
        }
    }

    async fn commit(&mut self, message: &Message) -> Result<()> {
        self.commits.record(message.offset);
        Ok(())
    }

    async fn close(&mut self) {
        self.receiver.close();
    }
}

/// Shared record of the offsets committed by a [`ChannelSource`].
#[derive(Debug, Clone)]
pub struct CommitTracker {
    last: Arc<AtomicI64>,
    count: Arc<AtomicU64>,
}

impl Default for CommitTracker {
    fn default() -> Self {
        Self {
            last: Arc::new(AtomicI64::new(NO_COMMIT)),
            count: Arc::new(AtomicU64::new(0)),
        }
    }
}

impl CommitTracker {
    fn record(&self, offset: i64) {
        self.last.fetch_max(offset, Ordering::SeqCst);
        self.count.fetch_add(1, Ordering::SeqCst);
    }

    /// Highest committed offset, if any.
    pub fn last_committed(&self) -> Option<i64> {
        match self.last.load(Ordering::SeqCst) {
            NO_COMMIT => None,
            offset => Some(offset),
        }
    }

    /// Number of commits made.
    pub fn commits(&self) -> u64 {
        self.count.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WAIT: Duration = Duration::from_millis(100);

    #[tokio::test]
    async fn offsets_increase_in_delivery_order() {
        let (producer, mut source) = channel(8);

        for n in 0..3 {
            let offset = producer.publish(format!("m{n}").into_bytes()).await.unwrap();
            assert_eq!(offset, n);
        }

        for n in 0..3 {
            let message = source.next_message(WAIT).await.unwrap().unwrap();
            assert_eq!(message.offset, n);
            assert_eq!(message.payload, format!("m{n}").into_bytes());
            assert_eq!(message.partition, 0);
        }
    }

    #[tokio::test]
    async fn keyed_messages_keep_their_key() {
        let (producer, mut source) = channel(1);

        producer
            .publish_keyed(Some(b"order-1".to_vec()), b"{}".to_vec())
            .await
            .unwrap();

        let message = source.next_message(WAIT).await.unwrap().unwrap();
        assert_eq!(message.key.as_deref(), Some(&b"order-1"[..]));
    }

    #[tokio::test]
    async fn empty_queue_times_out_with_none() {
        let (_producer, mut source) = channel(1);

        let result = source.next_message(Duration::from_millis(10)).await;
        assert_eq!(result, Ok(None));
    }

    #[tokio::test]
    async fn dropped_producers_close_the_source_after_backlog() {
        let (producer, mut source) = channel(4);
        producer.publish(b"last".to_vec()).await.unwrap();
        drop(producer);

        assert!(source.next_message(WAIT).await.unwrap().is_some());
        assert_eq!(source.next_message(WAIT).await, Err(SourceError::Closed));
    }

    #[tokio::test]
    async fn publish_after_close_fails() {
        let (producer, mut source) = channel(4);
        source.close().await;

        assert!(producer.is_closed());
        assert_eq!(
            producer.publish(b"late".to_vec()).await,
            Err(SourceError::Closed)
        );
    }

    #[tokio::test]
    async fn commits_are_tracked() {
        let (producer, mut source) = channel(4);
        let tracker = source.commit_tracker();
        assert_eq!(tracker.last_committed(), None);

        producer.publish(b"a".to_vec()).await.unwrap();
        producer.publish(b"b".to_vec()).await.unwrap();
        for _ in 0..2 {
            let message = source.next_message(WAIT).await.unwrap().unwrap();
            source.commit(&message).await.unwrap();
        }

        assert_eq!(tracker.last_committed(), Some(1));
        assert_eq!(tracker.commits(), 2);
    }
}
