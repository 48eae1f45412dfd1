// Rust guideline compliant 2026-08-24

//! In-memory adapter for the `QueueTransport` port.
//!
//! Models the managed-queue semantics the pipeline relies on: at-least-once
//! delivery via a visibility timeout, per-delivery receipt handles, and --
//! for FIFO queues (URL ending in `.fifo`) -- publish-order delivery,
//! sequence numbers, and deduplication by the caller-supplied key.
//! Used by the demo binary and as the fake transport in tests.

use domain::{QueueMessage, QueueTransport, TransportError};
use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
struct StoredMessage {
    id: String,
    body: String,
    group_id: Option<String>,
    sequence_number: Option<u64>,
    /// Internal arrival order; drives redelivery placement for all queues.
    arrival: u64,
}

#[derive(Debug)]
struct InFlight {
    message: StoredMessage,
    visible_at: Instant,
}

#[derive(Debug, Default)]
struct Inner {
    queue: VecDeque<StoredMessage>,
    /// Keyed by receipt handle; one entry per undelivered acknowledgment.
    in_flight: HashMap<String, InFlight>,
    /// FIFO only: dedup key -> message id of the original publish.
    dedup_index: HashMap<String, String>,
    next_arrival: u64,
}

/// `QueueTransport` adapter backed by process memory.
///
/// FIFO-ness is derived from the queue URL suffix, matching the managed
/// queue convention. The dedup window is unbounded here; a real transport
/// expires dedup entries after a few minutes.
#[derive(Debug)]
pub struct InMemoryQueue {
    queue_url: String,
    is_fifo: bool,
    visibility_timeout: Duration,
    inner: Mutex<Inner>,
}

impl InMemoryQueue {
    /// Create an empty queue. `is_fifo` is true iff `queue_url` ends in `.fifo`.
    #[must_use]
    pub fn new(queue_url: &str, visibility_timeout: Duration) -> Self {
        let is_fifo = queue_url.ends_with(".fifo");
        log::info!(
            "queue.init: url={queue_url} type={}",
            if is_fifo { "fifo" } else { "standard" }
        );
        Self {
            queue_url: queue_url.to_owned(),
            is_fifo,
            visibility_timeout,
            inner: Mutex::new(Inner::default()),
        }
    }

    /// The configured queue URL.
    #[must_use]
    pub fn queue_url(&self) -> &str {
        &self.queue_url
    }

    /// Whether this queue preserves publish order and deduplicates.
    #[must_use]
    pub fn is_fifo(&self) -> bool {
        self.is_fifo
    }

    /// Number of messages currently visible (not claimed by a receive).
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().queue.len()
    }

    /// True when no message is visible.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().queue.is_empty()
    }

    /// Number of delivered-but-unacknowledged messages.
    #[must_use]
    pub fn in_flight_len(&self) -> usize {
        self.lock().in_flight.len()
    }

    // Inner holds only owned data, so a panic while locked cannot leave it
    // torn; recover the guard instead of propagating the poison.
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Move expired in-flight messages back to the visible queue, keeping
    /// arrival order.
    fn reclaim_expired(inner: &mut Inner, now: Instant) {
        let expired: Vec<String> = inner
            .in_flight
            .iter()
            .filter(|(_, f)| f.visible_at <= now)
            .map(|(handle, _)| handle.clone())
            .collect();
        if expired.is_empty() {
            return;
        }
        let mut reclaimed: Vec<StoredMessage> = expired
            .iter()
            .filter_map(|handle| inner.in_flight.remove(handle))
            .map(|f| f.message)
            .collect();
        reclaimed.sort_by_key(|m| m.arrival);
        for message in reclaimed.into_iter().rev() {
            log::debug!("queue.redeliver: message_id={}", message.id);
            inner.queue.push_front(message);
        }
    }
}

#[async_trait::async_trait]
impl QueueTransport for InMemoryQueue {
    /// Enqueue `body`; on a FIFO queue a repeated `dedup_id` is suppressed
    /// and the original message id returned.
    async fn send(
        &self,
        body: String,
        group_id: &str,
        dedup_id: &str,
    ) -> Result<String, TransportError> {
        let mut inner = self.lock();
        if self.is_fifo
            && let Some(existing) = inner.dedup_index.get(dedup_id)
        {
            log::debug!("queue.dedup: dedup_id={dedup_id} message_id={existing}");
            return Ok(existing.clone());
        }

        let id = uuid::Uuid::new_v4().to_string();
        let arrival = inner.next_arrival;
        inner.next_arrival += 1;
        let message = StoredMessage {
            id: id.clone(),
            body,
            group_id: self.is_fifo.then(|| group_id.to_owned()),
            sequence_number: self.is_fifo.then_some(arrival),
            arrival,
        };
        inner.queue.push_back(message);
        if self.is_fifo {
            inner.dedup_index.insert(dedup_id.to_owned(), id.clone());
        }
        Ok(id)
    }

    /// Deliver up to `max_messages` from the front, long-polling up to `wait`
    /// when empty. Delivered messages become invisible for the configured
    /// visibility timeout and reappear if not deleted.
    async fn receive(
        &self,
        max_messages: usize,
        wait: Duration,
    ) -> Result<Vec<QueueMessage>, TransportError> {
        let deadline = Instant::now() + wait;
        loop {
            {
                let mut inner = self.lock();
                let now = Instant::now();
                Self::reclaim_expired(&mut inner, now);
                if !inner.queue.is_empty() {
                    let count = max_messages.min(inner.queue.len());
                    let mut delivered = Vec::with_capacity(count);
                    for _ in 0..count {
                        let Some(message) = inner.queue.pop_front() else { break };
                        let receipt_handle = uuid::Uuid::new_v4().to_string();
                        delivered.push(QueueMessage {
                            id: message.id.clone(),
                            body: message.body.clone(),
                            receipt_handle: receipt_handle.clone(),
                            group_id: message.group_id.clone(),
                            sequence_number: message.sequence_number,
                        });
                        inner.in_flight.insert(
                            receipt_handle,
                            InFlight { message, visible_at: now + self.visibility_timeout },
                        );
                    }
                    return Ok(delivered);
                }
            } // lock released before sleeping

            if Instant::now() >= deadline {
                return Ok(vec![]);
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }

    /// Acknowledge one delivery. A handle from an expired (redelivered)
    /// claim is stale and rejected.
    async fn delete(&self, receipt_handle: &str) -> Result<(), TransportError> {
        let mut inner = self.lock();
        match inner.in_flight.remove(receipt_handle) {
            Some(_) => Ok(()),
            None => Err(TransportError::Delete {
                reason: "unknown or expired receipt handle".to_owned(),
            }),
        }
    }

    /// Administrative: drop everything, including in-flight deliveries and
    /// the dedup index.
    async fn purge(&self) -> Result<(), TransportError> {
        let mut inner = self.lock();
        inner.queue.clear();
        inner.in_flight.clear();
        inner.dedup_index.clear();
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::InMemoryQueue;
    use domain::{QueueTransport as _, TransportError};
    use std::time::Duration;

    const FIFO_URL: &str = "local://transactions.fifo";

    fn fifo_queue() -> InMemoryQueue {
        InMemoryQueue::new(FIFO_URL, Duration::from_secs(30))
    }

    #[test]
    fn fifo_derived_from_url_suffix() {
        assert!(fifo_queue().is_fifo());
        assert!(!InMemoryQueue::new("local://transactions", Duration::ZERO).is_fifo());
    }

    #[tokio::test]
    async fn send_receive_delete_roundtrip() {
        let queue = fifo_queue();
        let id = queue.send("body-1".to_owned(), "g", "d-1").await.unwrap();

        let messages = queue.receive(10, Duration::ZERO).await.unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].id, id);
        assert_eq!(messages[0].body, "body-1");
        assert_eq!(messages[0].group_id.as_deref(), Some("g"));
        assert_eq!(queue.len(), 0);
        assert_eq!(queue.in_flight_len(), 1);

        queue.delete(&messages[0].receipt_handle).await.unwrap();
        assert_eq!(queue.in_flight_len(), 0);
    }

    #[tokio::test]
    async fn delivery_preserves_publish_order() {
        let queue = fifo_queue();
        for i in 0..5 {
            queue
                .send(format!("body-{i}"), "g", &format!("d-{i}"))
                .await
                .unwrap();
        }
        let messages = queue.receive(10, Duration::ZERO).await.unwrap();
        let bodies: Vec<&str> = messages.iter().map(|m| m.body.as_str()).collect();
        assert_eq!(bodies, ["body-0", "body-1", "body-2", "body-3", "body-4"]);
        // Sequence numbers are strictly increasing.
        let seqs: Vec<u64> = messages.iter().filter_map(|m| m.sequence_number).collect();
        assert!(seqs.windows(2).all(|w| w[0] < w[1]));
    }

    #[tokio::test]
    async fn duplicate_dedup_id_is_suppressed() {
        let queue = fifo_queue();
        let first = queue.send("body-a".to_owned(), "g", "tx-1").await.unwrap();
        let second = queue.send("body-b".to_owned(), "g", "tx-1").await.unwrap();

        assert_eq!(first, second, "duplicate publish must return the original id");
        assert_eq!(queue.len(), 1, "duplicate publish must not enqueue");
    }

    #[tokio::test]
    async fn standard_queue_does_not_deduplicate() {
        let queue = InMemoryQueue::new("local://transactions", Duration::from_secs(30));
        queue.send("body-a".to_owned(), "g", "tx-1").await.unwrap();
        queue.send("body-b".to_owned(), "g", "tx-1").await.unwrap();
        assert_eq!(queue.len(), 2);
        // Standard queues carry no group or sequence metadata.
        let messages = queue.receive(10, Duration::ZERO).await.unwrap();
        assert!(messages[0].group_id.is_none());
        assert!(messages[0].sequence_number.is_none());
    }

    #[tokio::test]
    async fn receive_caps_at_max_messages() {
        let queue = fifo_queue();
        for i in 0..7 {
            queue
                .send(format!("b-{i}"), "g", &format!("d-{i}"))
                .await
                .unwrap();
        }
        let messages = queue.receive(3, Duration::ZERO).await.unwrap();
        assert_eq!(messages.len(), 3);
        assert_eq!(queue.len(), 4);
    }

    #[tokio::test]
    async fn empty_queue_returns_empty_after_wait() {
        let queue = fifo_queue();
        let messages = queue.receive(10, Duration::from_millis(20)).await.unwrap();
        assert!(messages.is_empty());
    }

    #[tokio::test]
    async fn long_poll_picks_up_concurrent_send() {
        let queue = std::sync::Arc::new(fifo_queue());
        let sender = {
            let queue = std::sync::Arc::clone(&queue);
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(20)).await;
                queue.send("late".to_owned(), "g", "d-late").await.unwrap();
            })
        };
        let messages = queue.receive(10, Duration::from_secs(2)).await.unwrap();
        sender.await.unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].body, "late");
    }

    #[tokio::test]
    async fn unacknowledged_message_is_redelivered_after_visibility_timeout() {
        let queue = InMemoryQueue::new(FIFO_URL, Duration::from_millis(20));
        queue.send("body".to_owned(), "g", "d-1").await.unwrap();

        let first = queue.receive(10, Duration::ZERO).await.unwrap();
        assert_eq!(first.len(), 1);
        // Not deleted; wait past the visibility timeout.
        tokio::time::sleep(Duration::from_millis(30)).await;

        let second = queue.receive(10, Duration::ZERO).await.unwrap();
        assert_eq!(second.len(), 1, "message must reappear");
        assert_eq!(second[0].id, first[0].id);
        assert_ne!(
            second[0].receipt_handle, first[0].receipt_handle,
            "each delivery gets a fresh receipt handle"
        );

        // The stale handle from the first delivery no longer acknowledges.
        let result = queue.delete(&first[0].receipt_handle).await;
        assert!(matches!(result, Err(TransportError::Delete { .. })));
        queue.delete(&second[0].receipt_handle).await.unwrap();
    }

    #[tokio::test]
    async fn deleted_message_is_not_redelivered() {
        let queue = InMemoryQueue::new(FIFO_URL, Duration::from_millis(10));
        queue.send("body".to_owned(), "g", "d-1").await.unwrap();
        let messages = queue.receive(10, Duration::ZERO).await.unwrap();
        queue.delete(&messages[0].receipt_handle).await.unwrap();

        tokio::time::sleep(Duration::from_millis(20)).await;
        let again = queue.receive(10, Duration::ZERO).await.unwrap();
        assert!(again.is_empty(), "acknowledged message must stay gone");
    }

    #[tokio::test]
    async fn redelivered_message_keeps_queue_position() {
        let queue = InMemoryQueue::new(FIFO_URL, Duration::from_millis(20));
        queue.send("first".to_owned(), "g", "d-1").await.unwrap();
        queue.send("second".to_owned(), "g", "d-2").await.unwrap();

        // Claim only the first, let it expire.
        let claimed = queue.receive(1, Duration::ZERO).await.unwrap();
        assert_eq!(claimed[0].body, "first");
        tokio::time::sleep(Duration::from_millis(30)).await;

        let messages = queue.receive(10, Duration::ZERO).await.unwrap();
        let bodies: Vec<&str> = messages.iter().map(|m| m.body.as_str()).collect();
        assert_eq!(bodies, ["first", "second"], "redelivery must restore arrival order");
    }

    #[tokio::test]
    async fn purge_drops_everything() {
        let queue = fifo_queue();
        queue.send("a".to_owned(), "g", "d-1").await.unwrap();
        queue.send("b".to_owned(), "g", "d-2").await.unwrap();
        let _claimed = queue.receive(1, Duration::ZERO).await.unwrap();

        queue.purge().await.unwrap();

        assert_eq!(queue.len(), 0);
        assert_eq!(queue.in_flight_len(), 0);
        // Dedup index is cleared too: the same key enqueues again.
        queue.send("a2".to_owned(), "g", "d-1").await.unwrap();
        assert_eq!(queue.len(), 1);
    }
}
