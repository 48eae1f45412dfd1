// Rust guideline compliant 2026-08-24

//! Producer component -- publishes transaction events to a `QueueTransport`
//! with a stable deduplication key and an ordering group.
//!
//! Entry points: [`Producer::send`]. Construction via [`Producer::new`] for
//! the default single-group ordering, or [`Producer::with_grouping`] for a
//! caller-supplied grouping function (e.g. per-account ordering).

use domain::{CodecError, QueueTransport, TransactionEvent, TransportError};
use std::sync::Arc;

/// Default ordering group: all transaction events share one group, so the
/// transport preserves global publish order. Parallelism comes downstream
/// from the worker pool, not from the transport.
pub const DEFAULT_GROUP: &str = "transaction-group";

// ---------------------------------------------------------------------------
// ProducerError
// ---------------------------------------------------------------------------

/// Errors that can occur when publishing an event.
#[derive(Debug, thiserror::Error)]
pub enum ProducerError {
    /// The event could not be serialized.
    #[error("encoding error: {0}")]
    Encoding(#[from] CodecError),
    /// The transport rejected the publish. No internal retry: publish is
    /// idempotent via the dedup key, so retrying is the caller's call.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),
}

// ---------------------------------------------------------------------------
// Producer
// ---------------------------------------------------------------------------

type GroupFn = Box<dyn Fn(&TransactionEvent) -> String + Send + Sync>;

/// Publishes events to the queue.
///
/// The deduplication key is always the event's `transaction_id` -- stable
/// and caller-controlled, so re-sending the identical event is naturally
/// suppressed by the transport within its dedup window.
pub struct Producer {
    transport: Arc<dyn QueueTransport>,
    group_fn: GroupFn,
}

impl std::fmt::Debug for Producer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Producer").finish_non_exhaustive()
    }
}

impl Producer {
    /// Create a producer with the default constant ordering group.
    #[must_use]
    pub fn new(transport: Arc<dyn QueueTransport>) -> Self {
        Self {
            transport,
            group_fn: Box::new(|_| DEFAULT_GROUP.to_owned()),
        }
    }

    /// Create a producer with a caller-supplied grouping function.
    ///
    /// Events mapped to the same group keep their relative publish order on
    /// a FIFO transport; distinct groups may interleave.
    #[must_use]
    pub fn with_grouping<F>(transport: Arc<dyn QueueTransport>, group_fn: F) -> Self
    where
        F: Fn(&TransactionEvent) -> String + Send + Sync + 'static,
    {
        Self { transport, group_fn: Box::new(group_fn) }
    }

    /// Serialize `event` and publish it; returns the transport message id.
    ///
    /// # Errors
    ///
    /// Returns [`ProducerError::Encoding`] when serialization fails, or
    /// [`ProducerError::Transport`] when the transport rejects the send.
    pub async fn send(&self, event: &TransactionEvent) -> Result<String, ProducerError> {
        let body = codec::encode(event)?;
        let group_id = (self.group_fn)(event);
        let message_id = self
            .transport
            .send(body, &group_id, &event.transaction_id)
            .await?;
        log::debug!(
            "producer.sent: tx={} group={group_id} message_id={message_id}",
            event.transaction_id
        );
        Ok(message_id)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
