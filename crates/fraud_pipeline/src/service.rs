// Rust guideline compliant 2026-08-24

//! Synchronous application service over the ports.
//!
//! [`FraudDetectionService::submit`] is the direct path: evaluate one event
//! and persist the record in the caller's task, bypassing the queue. Used
//! for synchronous API-style checks and as the reference behavior the
//! asynchronous pipeline must converge to. [`FraudDetectionService::enqueue`]
//! hands the event to the producer for the asynchronous path.

use domain::{
    DecisionEngine, PolicyError, RecordStore, StoreError, TransactionEvent, TransactionRecord,
    Verdict,
};
use producer::{Producer, ProducerError};
use std::sync::Arc;

/// Errors from the synchronous submit path.
#[derive(Debug, thiserror::Error)]
pub enum SubmitError {
    /// The decision engine rejected the event.
    #[error("policy error: {0}")]
    Policy(#[from] PolicyError),
    /// The record could not be persisted; the verdict is discarded and the
    /// caller should retry the whole submit.
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

/// Facade combining the decision engine, the record store, and the producer.
pub struct FraudDetectionService {
    engine: Arc<dyn DecisionEngine>,
    store: Arc<dyn RecordStore>,
    producer: Producer,
}

impl std::fmt::Debug for FraudDetectionService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FraudDetectionService").finish_non_exhaustive()
    }
}

impl FraudDetectionService {
    /// Assemble the service from its ports.
    #[must_use]
    pub fn new(
        engine: Arc<dyn DecisionEngine>,
        store: Arc<dyn RecordStore>,
        producer: Producer,
    ) -> Self {
        Self { engine, store, producer }
    }

    /// Evaluate `event` now and persist the record; returns the verdict.
    ///
    /// Same decide-then-save sequence the queue workers run, so a
    /// transaction submitted here and one arriving through the queue end up
    /// in the identical stored shape.
    ///
    /// # Errors
    ///
    /// Returns [`SubmitError::Policy`] for malformed input and
    /// [`SubmitError::Store`] when the write fails.
    pub async fn submit(&self, event: TransactionEvent) -> Result<Verdict, SubmitError> {
        let verdict = self.engine.decide(&event)?;
        let record = TransactionRecord::from_parts(event, &verdict);
        self.store.save(record).await?;
        log::info!(
            "service.submit: tx={} fraudulent={}",
            verdict.transaction_id,
            verdict.fraudulent
        );
        Ok(verdict)
    }

    /// Publish `event` to the queue for asynchronous evaluation; returns
    /// the transport message id.
    ///
    /// # Errors
    ///
    /// Returns [`ProducerError`] when encoding or the publish fails.
    pub async fn enqueue(&self, event: &TransactionEvent) -> Result<String, ProducerError> {
        self.producer.send(event).await
    }

    /// Look up a stored record by transaction id.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Query`] when the read fails.
    pub async fn find_by_transaction_id(
        &self,
        transaction_id: &str,
    ) -> Result<Option<TransactionRecord>, StoreError> {
        self.store.find_by_transaction_id(transaction_id).await
    }

    /// All stored records flagged fraudulent.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Query`] when the read fails.
    pub async fn find_fraudulent(&self) -> Result<Vec<TransactionRecord>, StoreError> {
        self.store.find_fraudulent().await
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::{FraudDetectionService, SubmitError};
    use crate::adapters::in_memory_queue::InMemoryQueue;
    use crate::adapters::memory_store::MemoryStore;
    use chrono::{Duration as ChronoDuration, Utc};
    use consumer::{ConsumerConfig, Dispatcher, ProcessorContext, WorkerPool};
    use domain::{DecisionEngine, PolicyError, RecordStore, TransactionEvent};
    use engine::{REASON_ACCOUNT_AGE, REASON_AMOUNT, REASON_COUNTRY, RuleConfig, RuleEngine};
    use producer::Producer;
    use rust_decimal::Decimal;
    use std::str::FromStr as _;
    use std::sync::Arc;
    use std::time::Duration;

    // ------------------------------------------------------------------
    // Test helpers
    // ------------------------------------------------------------------

    fn make_engine() -> RuleEngine {
        let config = RuleConfig::builder(Decimal::from_str("10000").unwrap())
            .suspicious_countries(["CN", "RU", "NG"])
            .min_account_age_days(30)
            .build()
            .unwrap();
        RuleEngine::new(config)
    }

    fn make_event(id: &str, amount: &str, source_country: &str, age_days: Option<i64>) -> TransactionEvent {
        TransactionEvent {
            transaction_id: id.to_owned(),
            account_id: "acc-1".to_owned(),
            amount: Decimal::from_str(amount).unwrap(),
            currency: "USD".to_owned(),
            source_country: source_country.to_owned(),
            destination_country: "GB".to_owned(),
            timestamp: Utc::now(),
            account_creation_date: age_days.map(|d| Utc::now() - ChronoDuration::days(d)),
            ip_address: "10.0.0.1".to_owned(),
            device_id: "dev-1".to_owned(),
            request_id: None,
        }
    }

    fn make_service(
        engine: Arc<dyn DecisionEngine>,
        store: Arc<MemoryStore>,
        queue: Arc<InMemoryQueue>,
    ) -> FraudDetectionService {
        FraudDetectionService::new(engine, store as _, Producer::new(queue as _))
    }

    // ------------------------------------------------------------------
    // Synchronous submit path
    // ------------------------------------------------------------------

    #[tokio::test]
    async fn submit_persists_record_and_returns_verdict() {
        let store = Arc::new(MemoryStore::new());
        let queue = Arc::new(InMemoryQueue::new("local://q.fifo", Duration::from_secs(30)));
        let service = make_service(Arc::new(make_engine()), Arc::clone(&store), queue);

        let verdict = service
            .submit(make_event("tx-1", "20000", "US", Some(365)))
            .await
            .unwrap();

        assert!(verdict.fraudulent);
        assert_eq!(verdict.fraud_reason.as_deref(), Some(REASON_AMOUNT));
        let record = store.find_by_transaction_id("tx-1").await.unwrap().unwrap();
        assert!(record.fraudulent);
    }

    #[tokio::test]
    async fn submit_rejects_malformed_event_without_persisting() {
        let store = Arc::new(MemoryStore::new());
        let queue = Arc::new(InMemoryQueue::new("local://q.fifo", Duration::from_secs(30)));
        let service = make_service(Arc::new(make_engine()), Arc::clone(&store), queue);

        let result = service
            .submit(make_event("tx-1", "-5.00", "US", Some(365)))
            .await;

        assert!(matches!(result, Err(SubmitError::Policy(PolicyError::Invalid { .. }))));
        assert!(store.is_empty(), "rejected event must not be persisted");
    }

    #[tokio::test]
    async fn submit_surfaces_store_failure() {
        let store = Arc::new(MemoryStore::new());
        store.set_fail_writes(true);
        let queue = Arc::new(InMemoryQueue::new("local://q.fifo", Duration::from_secs(30)));
        let service = make_service(Arc::new(make_engine()), store, queue);

        let result = service.submit(make_event("tx-1", "100", "US", Some(365))).await;
        assert!(matches!(result, Err(SubmitError::Store(_))));
    }

    #[tokio::test]
    async fn enqueue_publishes_to_queue() {
        let store = Arc::new(MemoryStore::new());
        let queue = Arc::new(InMemoryQueue::new("local://q.fifo", Duration::from_secs(30)));
        let service = make_service(Arc::new(make_engine()), store, Arc::clone(&queue));

        service
            .enqueue(&make_event("tx-1", "100", "US", Some(365)))
            .await
            .unwrap();
        assert_eq!(queue.len(), 1);
    }

    // ------------------------------------------------------------------
    // End-to-end asynchronous pipeline
    // ------------------------------------------------------------------

    /// Full path: producer -> FIFO queue -> dispatcher -> worker pool ->
    /// engine -> store, with a duplicate publish suppressed by the
    /// transport's dedup window and every message acknowledged.
    #[tokio::test]
    async fn pipeline_processes_published_events_end_to_end() {
        let queue = Arc::new(InMemoryQueue::new(
            "local://fraud-transactions.fifo",
            Duration::from_secs(30),
        ));
        let store = Arc::new(MemoryStore::new());
        let engine: Arc<dyn DecisionEngine> = Arc::new(make_engine());
        let producer = Producer::new(Arc::clone(&queue) as _);

        // One event per rule plus one legitimate, plus a duplicate publish.
        let events = [
            make_event("tx-amount", "20000", "US", Some(365)),
            make_event("tx-country", "100", "CN", Some(365)),
            make_event("tx-age", "100", "US", Some(10)),
            make_event("tx-clean", "100", "US", Some(365)),
        ];
        for event in &events {
            producer.send(event).await.unwrap();
        }
        let dup = producer.send(&events[0]).await.unwrap();
        let first = producer.send(&events[0]).await.unwrap();
        assert_eq!(dup, first, "duplicate publish must be suppressed");

        let config = ConsumerConfig::builder()
            .poll_batch_size(10)
            .poll_wait(Duration::from_millis(50))
            .poll_period(Duration::from_millis(20))
            .workers(3)
            .queue_capacity(10)
            .build()
            .unwrap();
        let ctx = Arc::new(ProcessorContext::new(
            Arc::clone(&queue) as _,
            Arc::clone(&engine),
            Arc::clone(&store) as _,
        ));
        let pool = Arc::new(WorkerPool::start(config.workers, config.queue_capacity, ctx));
        let dispatcher = Arc::new(Dispatcher::new(config, Arc::clone(&queue) as _));

        let runner = {
            let dispatcher = Arc::clone(&dispatcher);
            let pool = Arc::clone(&pool);
            tokio::spawn(async move { dispatcher.run(&pool).await })
        };

        // Wait until every distinct event is persisted.
        for _ in 0..200 {
            if store.len() == events.len() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        dispatcher.stop();
        runner.await.unwrap();
        pool.shutdown().await;

        assert_eq!(store.len(), events.len(), "duplicate must not add a record");
        assert_eq!(queue.len(), 0, "queue must be drained");
        assert_eq!(queue.in_flight_len(), 0, "every message must be acknowledged");

        let expect = [
            ("tx-amount", Some(REASON_AMOUNT)),
            ("tx-country", Some(REASON_COUNTRY)),
            ("tx-age", Some(REASON_ACCOUNT_AGE)),
            ("tx-clean", None),
        ];
        for (id, reason) in expect {
            let record = store.find_by_transaction_id(id).await.unwrap().unwrap();
            assert_eq!(record.fraudulent, reason.is_some(), "verdict for {id}");
            assert_eq!(record.fraud_reason.as_deref(), reason, "reason for {id}");
        }
        let fraudulent = store.find_fraudulent().await.unwrap();
        assert_eq!(fraudulent.len(), 3);
    }
}
