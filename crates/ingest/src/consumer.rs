//! Queue consumer loop.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use domain::ServiceError;
use tokio::sync::watch;

use crate::dead_letter::{DeadLetter, DeadLetterSink};
use crate::error::SourceError;
use crate::handler::MessageHandler;
use crate::policy::FailurePolicy;
use crate::source::{Message, MessageSource};
use crate::state::ConsumerState;

/// Default upper bound on a single wait for the next message.
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(1);

/// Counters for consumer activity since startup.
#[derive(Debug, Default)]
pub struct ConsumerStats {
    /// Messages read from the source
    pub received: AtomicU64,

    /// Messages the handler accepted
    pub processed: AtomicU64,

    /// Messages whose processing finally failed
    pub failed: AtomicU64,

    /// Extra attempts made under the retry policy
    pub retried: AtomicU64,

    /// Failed messages accepted by the dead-letter sink
    pub dead_lettered: AtomicU64,

    /// Source reads that returned a transport error
    pub read_errors: AtomicU64,
}

impl ConsumerStats {
    /// Get current snapshot of all counters.
    pub fn snapshot(&self) -> ConsumerSnapshot {
        ConsumerSnapshot {
            received: self.received.load(Ordering::Relaxed),
            processed: self.processed.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            retried: self.retried.load(Ordering::Relaxed),
            dead_lettered: self.dead_lettered.load(Ordering::Relaxed),
            read_errors: self.read_errors.load(Ordering::Relaxed),
        }
    }
}

/// Snapshot of consumer counters at a point in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ConsumerSnapshot {
    pub received: u64,
    pub processed: u64,
    pub failed: u64,
    pub retried: u64,
    pub dead_lettered: u64,
    pub read_errors: u64,
}

/// Pulls messages from a source and feeds them to a handler, one at a time.
///
/// Every message read is committed after its failure policy has run, whether
/// processing succeeded or not. Shutdown is cooperative: the signal is checked
/// once per iteration, so an in-flight read or handler call finishes first.
pub struct QueueConsumer<S, H>
where
    S: MessageSource,
    H: MessageHandler,
{
    source: S,
    handler: H,
    policy: FailurePolicy,
    read_timeout: Duration,
    dead_letters: Option<Arc<dyn DeadLetterSink>>,
    state: ConsumerState,
    stats: Arc<ConsumerStats>,
}

impl<S, H> QueueConsumer<S, H>
where
    S: MessageSource,
    H: MessageHandler,
{
    /// Creates an idle consumer with the drop policy.
    pub fn new(source: S, handler: H) -> Self {
        Self {
            source,
            handler,
            policy: FailurePolicy::default(),
            read_timeout: DEFAULT_READ_TIMEOUT,
            dead_letters: None,
            state: ConsumerState::Idle,
            stats: Arc::new(ConsumerStats::default()),
        }
    }

    /// Sets the failure policy.
    pub fn with_policy(mut self, policy: FailurePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Sets the upper bound on a single wait for the next message.
    pub fn with_read_timeout(mut self, read_timeout: Duration) -> Self {
        self.read_timeout = read_timeout;
        self
    }

    /// Sets the sink used by [`FailurePolicy::DeadLetter`].
    pub fn with_dead_letter_sink(mut self, sink: Arc<dyn DeadLetterSink>) -> Self {
        self.dead_letters = Some(sink);
        self
    }

    pub fn state(&self) -> ConsumerState {
        self.state
    }

    pub fn policy(&self) -> FailurePolicy {
        self.policy
    }

    /// Returns a handle to the live counters.
    pub fn stats(&self) -> Arc<ConsumerStats> {
        Arc::clone(&self.stats)
    }

    /// Returns a reference to the underlying source.
    pub fn source(&self) -> &S {
        &self.source
    }

    /// Runs until `shutdown` turns true or the source closes.
    ///
    /// Returns the final counters. A consumer runs at most once; calling
    /// `run` again returns immediately.
    pub async fn run(&mut self, shutdown: watch::Receiver<bool>) -> ConsumerSnapshot {
        if !self.state.can_run() {
            tracing::warn!(state = %self.state, "queue consumer already ran");
            return self.stats.snapshot();
        }

        self.state = ConsumerState::Running;
        tracing::info!(
            policy = %self.policy,
            read_timeout_ms = self.read_timeout.as_millis() as u64,
            "queue consumer started"
        );

        loop {
            if *shutdown.borrow() {
                tracing::info!("queue consumer shutting down");
                break;
            }

            match self.source.next_message(self.read_timeout).await {
                Ok(Some(message)) => self.handle_message(message).await,
                Ok(None) => {}
                Err(SourceError::Closed) => {
                    tracing::info!("message source closed");
                    break;
                }
                Err(err) => {
                    self.stats.read_errors.fetch_add(1, Ordering::Relaxed);
                    tracing::error!(error = %err, "failed to read message");
                }
            }
        }

        self.state = ConsumerState::Draining;
        self.source.close().await;
        self.state = ConsumerState::Stopped;

        let snapshot = self.stats.snapshot();
        tracing::info!(
            received = snapshot.received,
            processed = snapshot.processed,
            failed = snapshot.failed,
            retried = snapshot.retried,
            dead_lettered = snapshot.dead_lettered,
            read_errors = snapshot.read_errors,
            "queue consumer stopped"
        );
        snapshot
    }

    #[tracing::instrument(
        skip_all,
        fields(partition = message.partition, offset = message.offset)
    )]
    async fn handle_message(&mut self, message: Message) {
        let started = Instant::now();
        self.stats.received.fetch_add(1, Ordering::Relaxed);

        match self.process(&message).await {
            Ok(()) => {
                self.stats.processed.fetch_add(1, Ordering::Relaxed);
            }
            Err(err) => {
                self.stats.failed.fetch_add(1, Ordering::Relaxed);
                self.on_failure(&message, err).await;
            }
        }

        if let Err(err) = self.source.commit(&message).await {
            tracing::warn!(error = %err, "failed to commit message");
        }

        metrics::histogram!("ingest_message_duration_seconds")
            .record(started.elapsed().as_secs_f64());
    }

    async fn process(&self, message: &Message) -> Result<(), ServiceError> {
        let mut attempt = 0;
        loop {
            match self.handler.handle(&message.payload).await {
                Ok(()) => return Ok(()),
                Err(err) => {
                    if let FailurePolicy::Retry {
                        max_retries,
                        backoff,
                    } = self.policy
                        && err.is_transient()
                        && attempt < max_retries
                    {
                        attempt += 1;
                        self.stats.retried.fetch_add(1, Ordering::Relaxed);
                        metrics::counter!("ingest_retries_total").increment(1);
                        tracing::warn!(attempt, max_retries, error = %err, "retrying message");
                        tokio::time::sleep(backoff).await;
                        continue;
                    }
                    return Err(err);
                }
            }
        }
    }

    async fn on_failure(&self, message: &Message, err: ServiceError) {
        if self.policy != FailurePolicy::DeadLetter {
            tracing::warn!(kind = err.kind(), error = %err, "message dropped");
            return;
        }

        let Some(sink) = &self.dead_letters else {
            tracing::error!(
                kind = err.kind(),
                error = %err,
                "no dead-letter sink configured, message dropped"
            );
            return;
        };

        let letter = DeadLetter {
            message: message.clone(),
            kind: err.kind(),
            reason: err.to_string(),
        };
        match sink.publish(letter).await {
            Ok(()) => {
                self.stats.dead_lettered.fetch_add(1, Ordering::Relaxed);
                metrics::counter!("ingest_messages_dead_lettered_total").increment(1);
                tracing::warn!(kind = err.kind(), error = %err, "message dead-lettered");
            }
            Err(sink_err) => {
                tracing::error!(
                    kind = err.kind(),
                    error = %err,
                    sink_error = %sink_err,
                    "failed to dead-letter message, message dropped"
                );
            }
        }
    }
}
