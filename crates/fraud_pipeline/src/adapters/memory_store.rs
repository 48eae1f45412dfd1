// Rust guideline compliant 2026-08-24

//! In-memory adapter for the `RecordStore` port.
//!
//! HashMap keyed by transaction id; the first successful write for an id
//! wins and later saves for the same id are silent no-ops, matching the
//! idempotence contract the workers rely on under redelivery.

use domain::{RecordStore, StoreError, TransactionRecord};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// `RecordStore` adapter backed by process memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: Mutex<HashMap<String, TransactionRecord>>,
    fail_writes: AtomicBool,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// True when no record is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Make subsequent `save` calls fail with `StoreError::Unavailable`.
    /// Test hook for exercising the redelivery path.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, TransactionRecord>> {
        self.records.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait::async_trait]
impl RecordStore for MemoryStore {
    async fn save(&self, record: TransactionRecord) -> Result<(), StoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable);
        }
        let mut records = self.lock();
        records
            .entry(record.transaction_id().to_owned())
            .or_insert(record);
        Ok(())
    }

    async fn find_by_transaction_id(
        &self,
        transaction_id: &str,
    ) -> Result<Option<TransactionRecord>, StoreError> {
        Ok(self.lock().get(transaction_id).cloned())
    }

    async fn find_by_account(
        &self,
        account_id: &str,
    ) -> Result<Vec<TransactionRecord>, StoreError> {
        Ok(self
            .lock()
            .values()
            .filter(|r| r.event.account_id == account_id)
            .cloned()
            .collect())
    }

    async fn find_fraudulent(&self) -> Result<Vec<TransactionRecord>, StoreError> {
        Ok(self
            .lock()
            .values()
            .filter(|r| r.fraudulent)
            .cloned()
            .collect())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
