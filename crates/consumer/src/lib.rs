// Rust guideline compliant 2026-08-24

//! Consumer side of the ingestion pipeline -- polls the queue transport and
//! processes messages under bounded concurrency.
//!
//! Entry points: [`Dispatcher::run`], [`Dispatcher::poll_once`],
//! [`WorkerPool::start`], [`process_message`]. Configuration via
//! [`ConsumerConfig::builder`].
//!
//! Failure discipline: nothing inside a worker task may crash the pool or
//! the dispatcher. Decode, policy, and persistence failures leave the source
//! message un-deleted so the transport's visibility timeout redelivers it;
//! a failed delete is logged only, because the record is already durable and
//! re-processing is idempotent by `transaction_id`.

use domain::{
    CodecError, DecisionEngine, PolicyError, QueueMessage, QueueTransport, RecordStore,
    StoreError, TransactionRecord, Verdict,
};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

// ---------------------------------------------------------------------------
// ConsumerError
// ---------------------------------------------------------------------------

/// Errors that can occur when configuring the consumer side.
#[derive(Debug, thiserror::Error)]
pub enum ConsumerError {
    /// The supplied configuration is invalid.
    #[error("invalid consumer configuration: {reason}")]
    InvalidConfig {
        /// Human-readable description of the problem.
        reason: String,
    },
}

// ---------------------------------------------------------------------------
// ProcessError
// ---------------------------------------------------------------------------

/// Failure of one message-processing task.
///
/// Every variant leaves the source message un-acknowledged; redelivery is
/// the retry mechanism. There is no max-retry ceiling here -- a message that
/// always fails relies on the transport's own redelivery limit.
#[derive(Debug, thiserror::Error)]
pub enum ProcessError {
    /// The message body could not be decoded.
    #[error("decode error: {0}")]
    Decode(#[from] CodecError),
    /// The decision engine rejected the event.
    #[error("policy error: {0}")]
    Policy(#[from] PolicyError),
    /// The record store write failed.
    #[error("persistence error: {0}")]
    Persist(#[from] StoreError),
}

// ---------------------------------------------------------------------------
// ConsumerConfig + builder
// ---------------------------------------------------------------------------

/// Runtime configuration for the [`Dispatcher`] and [`WorkerPool`].
///
/// Construct via [`ConsumerConfig::builder`].
#[derive(Debug, Clone)]
pub struct ConsumerConfig {
    /// Whether the dispatcher polls at all. Disabled = zero transport calls.
    pub enabled: bool,
    /// Maximum messages per receive call (range `[1, 10]`).
    pub poll_batch_size: usize,
    /// Long-poll wait bound per receive call.
    pub poll_wait: Duration,
    /// Delay between successive polling ticks.
    pub poll_period: Duration,
    /// Number of parallel workers.
    pub workers: usize,
    /// Capacity of the bounded task queue feeding the workers.
    pub queue_capacity: usize,
}

/// Builder for [`ConsumerConfig`].
///
/// Obtain via [`ConsumerConfig::builder`]; finalize with [`build`](Self::build).
#[derive(Debug)]
pub struct ConsumerConfigBuilder {
    enabled: bool,
    poll_batch_size: usize,
    poll_wait: Duration,
    poll_period: Duration,
    workers: usize,
    queue_capacity: usize,
}

impl ConsumerConfig {
    /// Create a builder.
    ///
    /// Default values: enabled, batch size 10, wait 10 s, period 1 s,
    /// 5 workers, queue capacity 100.
    #[must_use]
    pub fn builder() -> ConsumerConfigBuilder {
        ConsumerConfigBuilder {
            enabled: true,
            poll_batch_size: 10,
            poll_wait: Duration::from_secs(10),
            poll_period: Duration::from_secs(1),
            workers: 5,
            queue_capacity: 100,
        }
    }
}

impl ConsumerConfigBuilder {
    /// Enable or disable polling entirely.
    #[must_use]
    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Override the per-poll message cap.
    #[must_use]
    pub fn poll_batch_size(mut self, n: usize) -> Self {
        self.poll_batch_size = n;
        self
    }

    /// Override the long-poll wait bound.
    #[must_use]
    pub fn poll_wait(mut self, wait: Duration) -> Self {
        self.poll_wait = wait;
        self
    }

    /// Override the delay between polling ticks.
    #[must_use]
    pub fn poll_period(mut self, period: Duration) -> Self {
        self.poll_period = period;
        self
    }

    /// Override the worker count.
    #[must_use]
    pub fn workers(mut self, n: usize) -> Self {
        self.workers = n;
        self
    }

    /// Override the bounded task-queue capacity.
    #[must_use]
    pub fn queue_capacity(mut self, n: usize) -> Self {
        self.queue_capacity = n;
        self
    }

    /// Validate and build the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConsumerError::InvalidConfig`] when the batch size is
    /// outside `[1, 10]`, or workers / queue capacity is zero.
    #[must_use = "the Result must be checked; use ? or unwrap"]
    pub fn build(self) -> Result<ConsumerConfig, ConsumerError> {
        if self.poll_batch_size == 0 || self.poll_batch_size > 10 {
            return Err(ConsumerError::InvalidConfig {
                reason: "poll_batch_size must be in [1, 10]".to_owned(),
            });
        }
        if self.workers == 0 {
            return Err(ConsumerError::InvalidConfig {
                reason: "workers must be >= 1".to_owned(),
            });
        }
        if self.queue_capacity == 0 {
            return Err(ConsumerError::InvalidConfig {
                reason: "queue_capacity must be >= 1".to_owned(),
            });
        }
        Ok(ConsumerConfig {
            enabled: self.enabled,
            poll_batch_size: self.poll_batch_size,
            poll_wait: self.poll_wait,
            poll_period: self.poll_period,
            workers: self.workers,
            queue_capacity: self.queue_capacity,
        })
    }
}

// ---------------------------------------------------------------------------
// ProcessorContext + process_message
// ---------------------------------------------------------------------------

/// Shared collaborators for message processing.
///
/// One instance is shared by every worker and by the dispatcher's inline
/// fallback path.
pub struct ProcessorContext {
    /// Queue transport; used for acknowledgment.
    pub transport: Arc<dyn QueueTransport>,
    /// Fraud decision policy.
    pub engine: Arc<dyn DecisionEngine>,
    /// Durable record store.
    pub store: Arc<dyn RecordStore>,
}

impl std::fmt::Debug for ProcessorContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProcessorContext").finish_non_exhaustive()
    }
}

impl ProcessorContext {
    /// Bundle the three collaborators.
    #[must_use]
    pub fn new(
        transport: Arc<dyn QueueTransport>,
        engine: Arc<dyn DecisionEngine>,
        store: Arc<dyn RecordStore>,
    ) -> Self {
        Self { transport, engine, store }
    }
}

/// Process one message: decode, decide, persist, acknowledge.
///
/// On `Ok` the record is durable. The acknowledgment (delete) may still
/// have failed -- that is logged, not returned, because the message will be
/// redelivered and re-processing is idempotent.
///
/// # Errors
///
/// Returns [`ProcessError`] for decode, policy, or persistence failures;
/// in every error case the message is left un-deleted for redelivery.
pub async fn process_message(
    ctx: &ProcessorContext,
    message: &QueueMessage,
) -> Result<Verdict, ProcessError> {
    let event = codec::decode(&message.body)?;
    let verdict = ctx.engine.decide(&event)?;
    let record = TransactionRecord::from_parts(event, &verdict);
    ctx.store.save(record).await?;

    if let Err(e) = ctx.transport.delete(&message.receipt_handle).await {
        // Record is durable; the redelivered copy will hit the idempotent
        // save and be acknowledged on the next attempt.
        log::warn!("worker.ack.failed: message_id={} error={e}", message.id);
    }
    Ok(verdict)
}

/// Task boundary: run [`process_message`] and convert any failure into a
/// log line, leaving the message to redelivery.
async fn run_task(ctx: &ProcessorContext, message: QueueMessage) {
    match process_message(ctx, &message).await {
        Ok(verdict) => {
            log::info!(
                "worker.processed: tx={} fraudulent={} time_ms={}",
                verdict.transaction_id,
                verdict.fraudulent,
                verdict.processing_time_ms
            );
        }
        Err(e) => {
            log::error!(
                "worker.failed: message_id={} error={e} (left for redelivery)",
                message.id
            );
        }
    }
}

// ---------------------------------------------------------------------------
// WorkerPool
// ---------------------------------------------------------------------------

/// Fixed-size pool of workers over a bounded task queue.
///
/// Saturation policy: when the queue is full, [`submit`](Self::submit) runs
/// the task inline on the submitting task (caller-runs) so no message is
/// silently dropped; the dispatcher's polling loop stalls for that one task
/// instead.
pub struct WorkerPool {
    ctx: Arc<ProcessorContext>,
    /// `None` after shutdown; closing the channel stops the workers.
    tx: tokio::sync::Mutex<Option<mpsc::Sender<QueueMessage>>>,
    handles: tokio::sync::Mutex<Vec<JoinHandle<()>>>,
}

impl std::fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerPool").finish_non_exhaustive()
    }
}

impl WorkerPool {
    /// Spawn `workers` tasks consuming from a bounded queue of `capacity`.
    #[must_use]
    pub fn start(workers: usize, capacity: usize, ctx: Arc<ProcessorContext>) -> Self {
        let (tx, rx) = mpsc::channel::<QueueMessage>(capacity);
        let rx = Arc::new(tokio::sync::Mutex::new(rx));

        let handles = (0..workers)
            .map(|worker| {
                let rx = Arc::clone(&rx);
                let ctx = Arc::clone(&ctx);
                tokio::spawn(async move {
                    loop {
                        // Receive under the lock, process outside it, so only
                        // the dequeue is serialized across workers.
                        let message = { rx.lock().await.recv().await };
                        match message {
                            Some(message) => run_task(&ctx, message).await,
                            None => break,
                        }
                    }
                    log::debug!("worker.stopped: worker={worker}");
                })
            })
            .collect();

        Self {
            ctx,
            tx: tokio::sync::Mutex::new(Some(tx)),
            handles: tokio::sync::Mutex::new(handles),
        }
    }

    /// Submit one message for processing.
    ///
    /// Non-blocking towards the workers: if the bounded queue has room this
    /// returns immediately; if it is full (or the pool is shut down) the
    /// task runs inline on the caller before returning.
    pub async fn submit(&self, message: QueueMessage) {
        let sender = self.tx.lock().await.clone();
        let Some(sender) = sender else {
            log::warn!("pool.closed: running task inline");
            run_task(&self.ctx, message).await;
            return;
        };
        match sender.try_send(message) {
            Ok(()) => {}
            Err(TrySendError::Full(message) | TrySendError::Closed(message)) => {
                log::warn!("pool.saturated: running task inline on submitter");
                run_task(&self.ctx, message).await;
            }
        }
    }

    /// Close the task queue and wait for every worker to drain and exit.
    ///
    /// Already-queued messages are processed before the workers stop.
    pub async fn shutdown(&self) {
        drop(self.tx.lock().await.take());
        let mut handles = self.handles.lock().await;
        for handle in handles.drain(..) {
            if let Err(e) = handle.await {
                log::error!("worker.join.failed: {e}");
            }
        }
        log::info!("pool.stopped");
    }
}

// ---------------------------------------------------------------------------
// Dispatcher
// ---------------------------------------------------------------------------

/// Polling loop: `Stopped -> Running -> Stopped`.
///
/// Each tick issues one long-poll receive and submits every delivered
/// message to the worker pool. Transport errors on receive are logged and
/// the tick yields zero tasks; the next tick retries. A saturated pool
/// stalls the loop for one inline task -- acceptable, because dispatch of
/// already-claimed work is otherwise non-blocking.
pub struct Dispatcher {
    config: ConsumerConfig,
    transport: Arc<dyn QueueTransport>,
    running: AtomicBool,
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("config", &self.config)
            .field("running", &self.running)
            .finish_non_exhaustive()
    }
}

impl Dispatcher {
    /// Create a stopped dispatcher.
    #[must_use]
    pub fn new(config: ConsumerConfig, transport: Arc<dyn QueueTransport>) -> Self {
        Self { config, transport, running: AtomicBool::new(false) }
    }

    /// Whether the polling loop is currently running.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Flip the running flag; the loop exits at its next flag check and no
    /// new polls are issued. In-flight worker tasks run to completion.
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
        log::info!("dispatcher.stop: requested");
    }

    /// Issue one receive and submit every delivered message to `pool`.
    ///
    /// Returns the number of messages submitted. A transport error is
    /// logged and yields zero -- never fatal to the loop.
    pub async fn poll_once(&self, pool: &WorkerPool) -> usize {
        match self
            .transport
            .receive(self.config.poll_batch_size, self.config.poll_wait)
            .await
        {
            Ok(messages) => {
                if !messages.is_empty() {
                    log::info!("dispatcher.received: count={}", messages.len());
                }
                let count = messages.len();
                for message in messages {
                    if let (Some(group), Some(seq)) =
                        (&message.group_id, message.sequence_number)
                    {
                        log::debug!(
                            "dispatcher.fifo: message_id={} group={group} seq={seq}",
                            message.id
                        );
                    }
                    pool.submit(message).await;
                }
                count
            }
            Err(e) => {
                log::error!("dispatcher.poll.failed: {e}");
                0
            }
        }
    }

    /// Run the polling loop until [`stop`](Self::stop).
    ///
    /// Returns immediately, issuing zero transport calls, when the
    /// configuration is disabled.
    pub async fn run(&self, pool: &WorkerPool) {
        if !self.config.enabled {
            log::info!("dispatcher.disabled: no polling");
            return;
        }
        self.running.store(true, Ordering::SeqCst);
        log::info!(
            "dispatcher.started: batch={} wait={:?} period={:?}",
            self.config.poll_batch_size,
            self.config.poll_wait,
            self.config.poll_period
        );

        let mut interval = tokio::time::interval(self.config.poll_period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        while self.running.load(Ordering::SeqCst) {
            interval.tick().await;
            // Re-check after the tick so stop() during the wait issues no poll.
            if !self.running.load(Ordering::SeqCst) {
                break;
            }
            self.poll_once(pool).await;
        }
        log::info!("dispatcher.stopped");
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
