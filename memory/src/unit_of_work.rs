//! In-memory unit of work.

use std::sync::Arc;

use idempotent_rust_core::unit_of_work::{Repositories, UnitOfWork};

use crate::database::{MemoryDatabase, MemoryTransaction};

/// Builds the repository bundle for one transaction.
///
/// Invoked once per transaction with the transaction-scoped handle; the
/// bundle must clone the handle into every repository it contains so that
/// they all share the same working snapshot.
pub type RepositoryFactory<R> = Arc<dyn Fn(MemoryTransaction) -> R + Send + Sync>;

/// A [`UnitOfWork`] over a [`MemoryDatabase`].
///
/// Each `execute` takes the database lock, snapshots the tables, runs the
/// transaction function against the snapshot, and writes the snapshot back
/// iff the function returned `Ok`. Holding the lock for the whole
/// transaction serializes concurrent units of work, which is what lets two
/// racing invocations of the same idempotency key resolve safely: one runs,
/// the other replays its committed record.
pub struct MemoryUnitOfWork<R> {
    database: MemoryDatabase,
    factory: RepositoryFactory<R>,
}

impl<R> MemoryUnitOfWork<R> {
    /// Creates a unit of work over `database` with the given bundle factory.
    pub fn new(
        database: MemoryDatabase,
        factory: impl Fn(MemoryTransaction) -> R + Send + Sync + 'static,
    ) -> Self {
        Self {
            database,
            factory: Arc::new(factory),
        }
    }
}

impl<R> UnitOfWork for MemoryUnitOfWork<R>
where
    R: Repositories,
{
    type Repos = R;

    fn execute<T, E, F>(&self, work: F) -> Result<T, E>
    where
        F: FnOnce(&Self::Repos) -> Result<T, E>,
    {
        let mut tables = self.database.lock_tables();
        let transaction = MemoryTransaction::begin(tables.clone());
        let repos = (self.factory)(transaction.clone());
        match work(&repos) {
            Ok(value) => {
                *tables = transaction.snapshot();
                tracing::debug!("memory transaction committed");
                Ok(value)
            }
            Err(err) => {
                tracing::debug!("memory transaction rolled back");
                Err(err)
            }
        }
    }
}
