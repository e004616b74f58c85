//! Snapshot-based in-memory database.
//!
//! [`MemoryDatabase`] holds named tables of raw bytes. A transaction takes
//! a full snapshot of the tables; all reads and writes go against the
//! snapshot, and the unit of work either writes it back (commit) or drops
//! it (rollback). Transactions serialize on the database lock, so two
//! concurrent units of work never interleave; the second one always
//! observes the first one's committed state.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Named tables of `key → bytes`.
pub(crate) type Tables = HashMap<String, BTreeMap<String, Vec<u8>>>;

/// A shared in-memory database.
///
/// Cloning is cheap and yields a handle to the same underlying tables.
#[derive(Debug, Clone, Default)]
pub struct MemoryDatabase {
    tables: Arc<Mutex<Tables>>,
}

impl MemoryDatabase {
    /// Creates an empty database.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Locks the live tables for the duration of a transaction.
    ///
    /// A poisoned lock is recovered: the tables themselves are always in a
    /// consistent state because mutations only happen on commit, under the
    /// lock, by whole-snapshot replacement.
    pub(crate) fn lock_tables(&self) -> MutexGuard<'_, Tables> {
        self.tables.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// A transaction-scoped view of the database.
///
/// Cloning is cheap and yields a handle to the same working snapshot, so a
/// repository bundle can hand one to each of its repositories.
#[derive(Debug, Clone)]
pub struct MemoryTransaction {
    working: Arc<Mutex<Tables>>,
}

impl MemoryTransaction {
    /// Begins a transaction over a snapshot of the current tables.
    pub(crate) fn begin(snapshot: Tables) -> Self {
        Self {
            working: Arc::new(Mutex::new(snapshot)),
        }
    }

    /// The working state, for commit.
    pub(crate) fn snapshot(&self) -> Tables {
        self.lock_working().clone()
    }

    fn lock_working(&self) -> MutexGuard<'_, Tables> {
        self.working.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Reads a value.
    #[must_use]
    pub fn get(&self, table: &str, key: &str) -> Option<Vec<u8>> {
        self.lock_working()
            .get(table)
            .and_then(|rows| rows.get(key))
            .cloned()
    }

    /// Inserts a value only if the key is absent.
    ///
    /// Returns `true` when the value was inserted, `false` when a row
    /// already existed (the existing row is left untouched).
    pub fn insert(&self, table: &str, key: &str, value: Vec<u8>) -> bool {
        let mut working = self.lock_working();
        let rows = working.entry(table.to_string()).or_default();
        if rows.contains_key(key) {
            return false;
        }
        rows.insert(key.to_string(), value);
        true
    }

    /// Inserts or replaces a value.
    pub fn put(&self, table: &str, key: &str, value: Vec<u8>) {
        self.lock_working()
            .entry(table.to_string())
            .or_default()
            .insert(key.to_string(), value);
    }

    /// Removes a row, returning whether it existed.
    pub fn remove(&self, table: &str, key: &str) -> bool {
        self.lock_working()
            .get_mut(table)
            .is_some_and(|rows| rows.remove(key).is_some())
    }
}
