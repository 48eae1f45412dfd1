// Rust guideline compliant 2026-08-24

//! Fraud-detection pipeline entry point.
//!
//! Wires the components (Producer, Dispatcher, WorkerPool, RuleEngine) to
//! the in-memory FIFO queue and the SQLite record store, publishes a batch
//! of sample transactions, and runs the asynchronous pipeline until the
//! queue drains or CTRL+C.
//!
//! # Usage
//!
//! ```text
//! RUST_LOG=info cargo run
//!
//! # Also show per-message debug output
//! RUST_LOG=debug cargo run
//! ```

mod adapters;
mod service;

use adapters::in_memory_queue::InMemoryQueue;
use adapters::sqlite_store::SqliteStore;
use anyhow::Context as _;
use chrono::{Duration as ChronoDuration, Utc};
use consumer::{ConsumerConfig, Dispatcher, ProcessorContext, WorkerPool};
use domain::{DecisionEngine, TransactionEvent};
use engine::{RuleConfig, RuleEngine};
use producer::Producer;
use rust_decimal::Decimal;
use service::FraudDetectionService;
use std::str::FromStr as _;
use std::sync::Arc;
use std::time::Duration;

/// Sample traffic: one event per fraud rule plus legitimate ones.
fn sample_events() -> Vec<TransactionEvent> {
    let now = Utc::now();
    let event = |id: &str, account: &str, amount: &str, country: &str, age_days: Option<i64>| {
        TransactionEvent {
            transaction_id: id.to_owned(),
            account_id: account.to_owned(),
            amount: Decimal::from_str(amount).unwrap_or_default(),
            currency: "USD".to_owned(),
            source_country: country.to_owned(),
            destination_country: "GB".to_owned(),
            timestamp: now,
            account_creation_date: age_days.map(|d| now - ChronoDuration::days(d)),
            ip_address: "203.0.113.10".to_owned(),
            device_id: "device-1".to_owned(),
            request_id: Some(uuid::Uuid::new_v4().to_string()),
        }
    };
    vec![
        event("tx-0001", "acc-100", "150.00", "US", Some(720)),
        event("tx-0002", "acc-101", "20000.00", "US", Some(720)),
        event("tx-0003", "acc-102", "89.99", "CN", Some(400)),
        event("tx-0004", "acc-103", "42.50", "FR", Some(12)),
        event("tx-0005", "acc-104", "310.00", "DE", None),
        event("tx-0006", "acc-100", "75.25", "US", Some(720)),
    ]
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize the log facade before any async work.
    env_logger::init();

    // -- Ports: in-memory FIFO queue + SQLite store + rule engine --
    let queue = Arc::new(InMemoryQueue::new(
        "local://fraud-transactions.fifo",
        Duration::from_secs(30),
    ));
    let store = Arc::new(
        SqliteStore::new("sqlite::memory:")
            .await
            .context("failed to open record store")?,
    );
    let rule_config = RuleConfig::builder(Decimal::from(10_000))
        .suspicious_countries(["CN", "RU", "NG"])
        .min_account_age_days(30)
        .build()
        .context("failed to build rule config")?;
    let engine: Arc<dyn DecisionEngine> = Arc::new(RuleEngine::new(rule_config));

    // -- Producer: publish the sample batch, duplicates included --
    let service = FraudDetectionService::new(
        Arc::clone(&engine),
        Arc::clone(&store) as _,
        Producer::new(Arc::clone(&queue) as _),
    );
    let events = sample_events();
    for event in &events {
        let message_id = service
            .enqueue(event)
            .await
            .with_context(|| format!("failed to publish {}", event.transaction_id))?;
        log::info!("main.published: tx={} message_id={message_id}", event.transaction_id);
    }
    // Re-publishing an already-sent event is suppressed by the FIFO dedup
    // window; the pipeline must still end with one record per transaction.
    service
        .enqueue(&events[0])
        .await
        .context("failed to publish duplicate")?;

    // -- Consumer: dispatcher polling loop + bounded worker pool --
    let consumer_config = ConsumerConfig::builder()
        .poll_batch_size(10)
        // Short waits keep the demo responsive; production values would be
        // the defaults (10 s long poll, 1 s period).
        .poll_wait(Duration::from_millis(200))
        .poll_period(Duration::from_millis(100))
        .workers(5)
        .queue_capacity(100)
        .build()
        .context("failed to build consumer config")?;
    let ctx = Arc::new(ProcessorContext::new(
        Arc::clone(&queue) as _,
        Arc::clone(&engine),
        Arc::clone(&store) as _,
    ));
    let pool = Arc::new(WorkerPool::start(
        consumer_config.workers,
        consumer_config.queue_capacity,
        ctx,
    ));
    let dispatcher = Arc::new(Dispatcher::new(consumer_config, Arc::clone(&queue) as _));

    let runner = {
        let dispatcher = Arc::clone(&dispatcher);
        let pool = Arc::clone(&pool);
        tokio::spawn(async move { dispatcher.run(&pool).await })
    };

    // Run until the queue drains (visible + in-flight) or CTRL+C.
    let drained = {
        let queue = Arc::clone(&queue);
        async move {
            loop {
                if queue.is_empty() && queue.in_flight_len() == 0 {
                    return;
                }
                tokio::time::sleep(Duration::from_millis(100)).await;
            }
        }
    };
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            log::info!("main.shutdown: ctrl_c received, stopping dispatcher");
        }
        () = drained => {
            log::info!("main.drained: all messages processed and acknowledged");
        }
    }

    dispatcher.stop();
    runner.await.context("dispatcher task failed")?;
    pool.shutdown().await;

    let fraudulent = service
        .find_fraudulent()
        .await
        .context("failed to query fraudulent records")?;
    log::info!("main.done: fraudulent={} of {}", fraudulent.len(), events.len());
    for record in &fraudulent {
        log::info!(
            "main.flagged: tx={} reason={}",
            record.transaction_id(),
            record.fraud_reason.as_deref().unwrap_or("-")
        );
    }

    Ok(())
}
