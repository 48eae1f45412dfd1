// Rust guideline compliant 2026-08-24

//! SQLite adapter for the `RecordStore` port.
//!
//! Persists `TransactionRecord` rows to a SQLite database via `sqlx`.
//! Proves that the hexagonal `RecordStore` port is truly swappable without
//! touching domain or pipeline crates.
//!
//! # `ON CONFLICT DO NOTHING` semantics
//!
//! `save` must be idempotent under queue redelivery: the first successful
//! write for a transaction id wins and a later save of the same id is a
//! silent no-op. Plain `INSERT ... ON CONFLICT(transaction_id) DO NOTHING`
//! gives exactly that, so redelivered messages can be re-evaluated and
//! re-saved without ever producing a second row.
//!
//! # Column mapping
//!
//! `amount` is stored as its canonical decimal string (TEXT) to avoid
//! binary-float drift; timestamps are RFC 3339 TEXT; `fraudulent` maps
//! `bool` to INTEGER 0/1; `account_creation_date`, `request_id`, and
//! `fraud_reason` are nullable TEXT.

use chrono::{DateTime, Utc};
use domain::{RecordStore, StoreError, TransactionEvent, TransactionRecord};
use rust_decimal::Decimal;
use sqlx::Row as _;
use sqlx::sqlite::SqliteRow;
use std::str::FromStr as _;

/// `RecordStore` adapter backed by a SQLite database via `sqlx`.
///
/// Connects to (or creates) a SQLite database and ensures the
/// `transactions` table exists. Duplicate transaction ids are silently
/// ignored (first write wins -- see module-level note).
#[derive(Debug, Clone)]
pub struct SqliteStore {
    pool: sqlx::SqlitePool,
}

impl SqliteStore {
    /// Open or create a SQLite database and initialize the schema.
    ///
    /// Passes `create_if_missing(true)` so a file database is created on
    /// first run without manual setup. The `transactions` table is created
    /// via `CREATE TABLE IF NOT EXISTS`, making repeated calls safe.
    ///
    /// # Errors
    ///
    /// Returns `sqlx::Error` when the connection or schema creation fails.
    pub async fn new(db_url: &str) -> Result<Self, sqlx::Error> {
        // create_if_missing: sqlx 0.8 defaults to false for file databases;
        // enable explicitly so the demo works out of the box on first run.
        let opts = db_url
            .parse::<sqlx::sqlite::SqliteConnectOptions>()?
            .create_if_missing(true);
        let pool = sqlx::SqlitePool::connect_with(opts).await?;
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS transactions (
                transaction_id        TEXT    PRIMARY KEY,
                account_id            TEXT    NOT NULL,
                amount                TEXT    NOT NULL,
                currency              TEXT    NOT NULL,
                source_country        TEXT    NOT NULL,
                destination_country   TEXT    NOT NULL,
                timestamp             TEXT    NOT NULL,
                account_creation_date TEXT,
                ip_address            TEXT    NOT NULL,
                device_id             TEXT    NOT NULL,
                request_id            TEXT,
                fraudulent            INTEGER NOT NULL,
                fraud_reason          TEXT
            )",
        )
        .execute(&pool)
        .await?;
        Ok(Self { pool })
    }
}

/// Map one row back to a `TransactionRecord`.
///
/// A row that fails to parse (corrupted amount or timestamp) surfaces as
/// `StoreError::Query` rather than panicking inside the pool.
fn map_row(row: &SqliteRow) -> Result<TransactionRecord, StoreError> {
    let amount_text: String = row.get("amount");
    let amount = Decimal::from_str(&amount_text).map_err(|e| StoreError::Query {
        reason: format!("bad amount column: {e}"),
    })?;
    let timestamp = parse_rfc3339(&row.get::<String, _>("timestamp"))?;
    let account_creation_date = row
        .get::<Option<String>, _>("account_creation_date")
        .map(|s| parse_rfc3339(&s))
        .transpose()?;
    let fraudulent: i64 = row.get("fraudulent");

    Ok(TransactionRecord {
        event: TransactionEvent {
            transaction_id: row.get("transaction_id"),
            account_id: row.get("account_id"),
            amount,
            currency: row.get("currency"),
            source_country: row.get("source_country"),
            destination_country: row.get("destination_country"),
            timestamp,
            account_creation_date,
            ip_address: row.get("ip_address"),
            device_id: row.get("device_id"),
            request_id: row.get("request_id"),
        },
        fraudulent: fraudulent != 0,
        fraud_reason: row.get("fraud_reason"),
    })
}

fn parse_rfc3339(text: &str) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(text)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| StoreError::Query {
            reason: format!("bad timestamp column: {e}"),
        })
}

#[async_trait::async_trait]
impl RecordStore for SqliteStore {
    /// Persist `record`; a duplicate transaction id is a silent no-op
    /// (`ON CONFLICT DO NOTHING` -- see module-level note).
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Unavailable` on any `sqlx` error (connection
    /// failure, disk full, etc.). The underlying error is logged at `error`
    /// level before mapping.
    async fn save(&self, record: TransactionRecord) -> Result<(), StoreError> {
        let event = &record.event;
        sqlx::query(
            "INSERT INTO transactions
             (transaction_id, account_id, amount, currency, source_country,
              destination_country, timestamp, account_creation_date,
              ip_address, device_id, request_id, fraudulent, fraud_reason)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(transaction_id) DO NOTHING",
        )
        .bind(&event.transaction_id)
        .bind(&event.account_id)
        .bind(event.amount.to_string())
        .bind(&event.currency)
        .bind(&event.source_country)
        .bind(&event.destination_country)
        .bind(event.timestamp.to_rfc3339())
        .bind(event.account_creation_date.map(|dt| dt.to_rfc3339()))
        .bind(&event.ip_address)
        .bind(&event.device_id)
        .bind(&event.request_id)
        .bind(i64::from(record.fraudulent))
        .bind(&record.fraud_reason)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            log::error!("sqlite.save: {e}");
            StoreError::Unavailable
        })?;
        Ok(())
    }

    async fn find_by_transaction_id(
        &self,
        transaction_id: &str,
    ) -> Result<Option<TransactionRecord>, StoreError> {
        let row = sqlx::query("SELECT * FROM transactions WHERE transaction_id = ?")
            .bind(transaction_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StoreError::Query { reason: e.to_string() })?;
        row.as_ref().map(map_row).transpose()
    }

    async fn find_by_account(
        &self,
        account_id: &str,
    ) -> Result<Vec<TransactionRecord>, StoreError> {
        let rows = sqlx::query(
            "SELECT * FROM transactions WHERE account_id = ? ORDER BY timestamp",
        )
        .bind(account_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StoreError::Query { reason: e.to_string() })?;
        rows.iter().map(map_row).collect()
    }

    async fn find_fraudulent(&self) -> Result<Vec<TransactionRecord>, StoreError> {
        let rows = sqlx::query(
            "SELECT * FROM transactions WHERE fraudulent = 1 ORDER BY timestamp",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StoreError::Query { reason: e.to_string() })?;
        rows.iter().map(map_row).collect()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
