//! In-memory idempotency record store.

use idempotent_rust_core::record::Record;
use idempotent_rust_core::store::{Store, StoreError};

use crate::database::MemoryTransaction;

/// Table holding idempotency records.
pub const IDEMPOTENCY_TABLE: &str = "idempotency_records";

/// A [`Store`] over a [`MemoryTransaction`].
///
/// Records are bincode-encoded rows in [`IDEMPOTENCY_TABLE`]. Writes are
/// insert-only: a second save for the same key is reported as a backend
/// error rather than overwriting the existing record.
#[derive(Debug, Clone)]
pub struct MemoryStore {
    transaction: MemoryTransaction,
}

impl MemoryStore {
    /// Creates a store scoped to the given transaction.
    #[must_use]
    pub const fn new(transaction: MemoryTransaction) -> Self {
        Self { transaction }
    }
}

impl Store for MemoryStore {
    fn get(&self, key: &str) -> Result<Record, StoreError> {
        let Some(bytes) = self.transaction.get(IDEMPOTENCY_TABLE, key) else {
            return Err(StoreError::NotFound);
        };
        bincode::deserialize(&bytes)
            .map_err(|err| StoreError::Backend(format!("stored record does not decode: {err}")))
    }

    fn save(&self, record: Record) -> Result<(), StoreError> {
        let bytes = bincode::serialize(&record)
            .map_err(|err| StoreError::Backend(format!("record does not encode: {err}")))?;
        if !self
            .transaction
            .insert(IDEMPOTENCY_TABLE, record.key(), bytes)
        {
            return Err(StoreError::Backend(format!(
                "record already exists for key {}",
                record.key()
            )));
        }
        Ok(())
    }
}
