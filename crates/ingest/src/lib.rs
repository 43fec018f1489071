//! Queue consumption for order ingestion.
//!
//! A [`QueueConsumer`] pulls one message at a time from a [`MessageSource`]
//! and hands its payload to a [`MessageHandler`] (normally the order service).
//! Processing failures never stop the stream: the configured
//! [`FailurePolicy`] decides whether a failed message is dropped, retried or
//! sent to a [`DeadLetterSink`], and the message is committed either way.
//!
//! The consumer state machine:
//! ```text
//! Idle ──► Running ──► Draining ──► Stopped
//! ```

pub mod channel;
pub mod consumer;
pub mod dead_letter;
pub mod error;
pub mod handler;
pub mod policy;
pub mod source;
pub mod state;

pub use channel::{ChannelSource, CommitTracker, QueueProducer, channel};
pub use consumer::{ConsumerSnapshot, ConsumerStats, QueueConsumer};
pub use dead_letter::{DeadLetter, DeadLetterSink, InMemoryDeadLetterSink};
pub use error::{Result, SourceError};
pub use handler::MessageHandler;
pub use policy::FailurePolicy;
pub use source::{Message, MessageSource};
pub use state::ConsumerState;
