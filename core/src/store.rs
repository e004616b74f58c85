//! Storage contract for idempotency records.
//!
//! The core never talks to a database directly: it receives a
//! transaction-scoped [`Store`] from the caller's repository bundle and
//! performs all record reads and writes through it. Any backend works as
//! long as it preserves the [`Record`] layout exactly and makes `save` an
//! insert-only write that is atomic within the ambient transaction.

use thiserror::Error;

use crate::record::Record;

/// Errors reported by a [`Store`] implementation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// No record exists for the requested key.
    ///
    /// This is the distinguished absent-record condition: the
    /// [`Manager`](crate::manager::Manager) translates it to "not yet
    /// processed" rather than treating it as a failure.
    #[error("idempotency record not found")]
    NotFound,

    /// Any other storage failure (connection loss, write conflict,
    /// insert-only violation). Treated as an infrastructure failure and
    /// never cached.
    #[error("idempotency store backend error: {0}")]
    Backend(String),
}

/// Transaction-scoped persistence of idempotency records.
///
/// # Contract
///
/// - `get` returns [`StoreError::NotFound`] when no record exists for the
///   key; every other error is an infrastructure failure.
/// - `save` is insert-only: the calling protocol guarantees it is invoked
///   at most once per key, and a backend must never overwrite an existing
///   record. The write must be atomic within the transaction the store is
///   scoped to, so that it commits or rolls back together with the
///   action's own side effects.
pub trait Store {
    /// Retrieves the record for `key`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] when absent, or
    /// [`StoreError::Backend`] on any storage failure.
    fn get(&self, key: &str) -> Result<Record, StoreError>;

    /// Persists a new record.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Backend`] when the record cannot be written,
    /// including when a record for the key already exists.
    fn save(&self, record: Record) -> Result<(), StoreError>;
}
