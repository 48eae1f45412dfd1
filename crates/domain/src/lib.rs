// Rust guideline compliant 2026-08-24

//! Shared domain types for the fraud-detection ingestion pipeline.
//!
//! Defines `TransactionEvent`, `Verdict`, `TransactionRecord`, the error
//! taxonomy, and the hexagonal port traits: `QueueTransport`, `RecordStore`,
//! and `DecisionEngine`. All pipeline components depend on this crate; no
//! other workspace crate is imported here.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::time::Duration;

// ---------------------------------------------------------------------------
// TransactionEvent
// ---------------------------------------------------------------------------

/// A single financial transaction to be evaluated for fraud.
///
/// `transaction_id` is immutable once assigned and is the sole identity used
/// for transport deduplication, record lookup, and idempotent re-processing.
/// Wire field names are camelCase (see the codec crate for the full format).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionEvent {
    /// Globally unique business key; doubles as the transport dedup key.
    pub transaction_id: String,
    /// Account initiating the transaction.
    pub account_id: String,
    /// Transaction amount; non-negative. Serialized as a decimal string.
    pub amount: Decimal,
    /// ISO currency code (e.g. `"USD"`).
    pub currency: String,
    /// ISO country code of the transaction origin.
    pub source_country: String,
    /// ISO country code of the transaction destination.
    pub destination_country: String,
    /// Event time.
    pub timestamp: DateTime<Utc>,
    /// Account creation time; `None` means account age is unknown.
    #[serde(default)]
    pub account_creation_date: Option<DateTime<Utc>>,
    /// Originating IP address.
    pub ip_address: String,
    /// Originating device identifier.
    pub device_id: String,
    /// Cross-component trace id; no business meaning.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
}

// ---------------------------------------------------------------------------
// Verdict
// ---------------------------------------------------------------------------

/// Output of the decision engine for one event.
///
/// Exactly one reason is reported even when several rules would fire; the
/// first matching rule wins.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Verdict {
    /// The evaluated transaction's id.
    pub transaction_id: String,
    /// `true` when any rule fired.
    pub fraudulent: bool,
    /// Populated iff `fraudulent`.
    pub fraud_reason: Option<String>,
    /// Wall-clock duration of the decision call only.
    pub processing_time_ms: u64,
}

// ---------------------------------------------------------------------------
// TransactionRecord
// ---------------------------------------------------------------------------

/// Durable union of event + verdict, one row per `transaction_id`.
///
/// Created exactly once per successfully processed event (first successful
/// write wins under redelivery); never mutated or deleted by the pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct TransactionRecord {
    /// Original event (composition).
    pub event: TransactionEvent,
    /// Verdict outcome.
    pub fraudulent: bool,
    /// Verdict reason; populated iff `fraudulent`.
    pub fraud_reason: Option<String>,
}

impl TransactionRecord {
    /// Combine an event with its verdict into the persisted form.
    #[must_use]
    pub fn from_parts(event: TransactionEvent, verdict: &Verdict) -> Self {
        Self {
            event,
            fraudulent: verdict.fraudulent,
            fraud_reason: verdict.fraud_reason.clone(),
        }
    }

    /// Return the transaction id, delegating to the wrapped event.
    #[must_use]
    pub fn transaction_id(&self) -> &str {
        &self.event.transaction_id
    }
}

// ---------------------------------------------------------------------------
// QueueMessage
// ---------------------------------------------------------------------------

/// One message as delivered by the queue transport.
#[derive(Debug, Clone, PartialEq)]
pub struct QueueMessage {
    /// Transport-assigned message id.
    pub id: String,
    /// Raw message body (JSON-encoded `TransactionEvent`).
    pub body: String,
    /// Per-delivery handle used to acknowledge (delete) the message.
    pub receipt_handle: String,
    /// Ordering group, when the queue is FIFO.
    pub group_id: Option<String>,
    /// FIFO sequence number, when the queue is FIFO.
    pub sequence_number: Option<u64>,
}

// ---------------------------------------------------------------------------
// Error taxonomy
// ---------------------------------------------------------------------------

/// Errors from serializing or deserializing a wire message body.
///
/// Non-retryable by the pipeline itself; disposal of a permanently bad
/// message relies on the transport's redelivery limit / dead-letter queue.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CodecError {
    /// Event could not be serialized.
    #[error("encode failed: {reason}")]
    Encode {
        /// Human-readable description.
        reason: String,
    },
    /// Message body could not be deserialized or failed wire validation.
    #[error("decode failed: {reason}")]
    Decode {
        /// Human-readable description.
        reason: String,
    },
}

/// Errors from the queue transport port.
///
/// Send errors propagate to the producer's caller; receive and delete
/// errors are swallowed at the component boundary and surfaced via logs.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TransportError {
    /// A send call failed.
    #[error("queue send failed: {reason}")]
    Send {
        /// Human-readable description.
        reason: String,
    },
    /// A receive call failed.
    #[error("queue receive failed: {reason}")]
    Receive {
        /// Human-readable description.
        reason: String,
    },
    /// A delete (acknowledge) call failed.
    #[error("queue delete failed: {reason}")]
    Delete {
        /// Human-readable description.
        reason: String,
    },
    /// A purge call failed.
    #[error("queue purge failed: {reason}")]
    Purge {
        /// Human-readable description.
        reason: String,
    },
}

/// Errors from the decision engine for malformed input.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PolicyError {
    /// The event violates a precondition of the rule set.
    #[error("invalid event: {reason}")]
    Invalid {
        /// Human-readable description.
        reason: String,
    },
}

/// Errors from the record store port.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum StoreError {
    /// The store could not be reached or the write failed.
    #[error("record store unavailable")]
    Unavailable,
    /// A read query failed.
    #[error("record store query failed: {reason}")]
    Query {
        /// Human-readable description.
        reason: String,
    },
}

// ---------------------------------------------------------------------------
// Ports
// ---------------------------------------------------------------------------

/// Hexagonal port: the external FIFO-capable message queue.
///
/// Object-safe so adapters can be shared across spawned worker tasks as
/// `Arc<dyn QueueTransport>`. Implementations must provide at-least-once
/// delivery; FIFO queues additionally preserve per-group publish order and
/// deduplicate by the caller-supplied `dedup_id` within their window.
#[async_trait::async_trait]
pub trait QueueTransport: Send + Sync {
    /// Publish `body` and return the transport-assigned message id.
    ///
    /// `group_id` and `dedup_id` are honored only by FIFO queues.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Send`] when the publish fails.
    async fn send(
        &self,
        body: String,
        group_id: &str,
        dedup_id: &str,
    ) -> Result<String, TransportError>;

    /// Long-poll for up to `max_messages`, waiting at most `wait`.
    ///
    /// Returns an empty vector when the queue stays empty for the whole wait.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Receive`] when the poll fails.
    async fn receive(
        &self,
        max_messages: usize,
        wait: Duration,
    ) -> Result<Vec<QueueMessage>, TransportError>;

    /// Acknowledge a delivered message, removing it from the queue.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Delete`] when the handle is unknown, stale,
    /// or the call fails.
    async fn delete(&self, receipt_handle: &str) -> Result<(), TransportError>;

    /// Administrative: drop every message, delivered or not.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Purge`] when the call fails.
    async fn purge(&self) -> Result<(), TransportError>;
}

/// Hexagonal port: durable table of transactions keyed by transaction id.
///
/// `save` must be idempotent: re-saving an already-recorded id must not
/// create a duplicate row (first successful write wins).
#[async_trait::async_trait]
pub trait RecordStore: Send + Sync {
    /// Persist `record`; a duplicate `transaction_id` is a silent no-op.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Unavailable`] when the write fails.
    async fn save(&self, record: TransactionRecord) -> Result<(), StoreError>;

    /// Look up one record by transaction id.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Query`] when the read fails.
    async fn find_by_transaction_id(
        &self,
        transaction_id: &str,
    ) -> Result<Option<TransactionRecord>, StoreError>;

    /// All records for one account.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Query`] when the read fails.
    async fn find_by_account(
        &self,
        account_id: &str,
    ) -> Result<Vec<TransactionRecord>, StoreError>;

    /// All records flagged fraudulent.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Query`] when the read fails.
    async fn find_fraudulent(&self) -> Result<Vec<TransactionRecord>, StoreError>;
}

/// Hexagonal port: pure fraud decision, `Event -> Verdict`.
///
/// No I/O, no persistence; deterministic given its configuration and a
/// point in time. Persistence is the caller's responsibility.
pub trait DecisionEngine: Send + Sync {
    /// Evaluate `event` and return a verdict.
    ///
    /// # Errors
    ///
    /// Returns [`PolicyError::Invalid`] for malformed input.
    fn decide(&self, event: &TransactionEvent) -> Result<Verdict, PolicyError>;
}
