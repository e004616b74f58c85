//! Transactional boundary supplied by the caller.
//!
//! The exactly-once guarantee rests on one requirement: the idempotency
//! lookup, the action's side effects, and the outcome write must all happen
//! inside a single atomic transaction. The core does not open transactions
//! itself: it runs everything through a caller-supplied [`UnitOfWork`]
//! whose repository bundle exposes the transaction-scoped
//! [`Store`](crate::store::Store).
//!
//! Concurrency is likewise the collaborator's concern: two concurrent
//! invocations with the same key must either serialize or conflict at the
//! storage layer, so that exactly one of them executes the action and the
//! other observes its committed record.

use crate::store::Store;

/// The repository bundle available inside a transaction.
///
/// Implementations typically also carry the caller's domain repositories;
/// the core only requires access to the idempotency store.
pub trait Repositories {
    /// The store type scoped to the active transaction.
    type Store: Store;

    /// The idempotency store scoped to the active transaction.
    fn idempotency_store(&self) -> &Self::Store;
}

/// A single transactional unit of work.
pub trait UnitOfWork {
    /// The repository bundle handed to the transaction function.
    type Repos: Repositories;

    /// Runs `work` inside one transaction.
    ///
    /// # Contract
    ///
    /// Begin a transaction, build the transaction-scoped bundle, invoke
    /// `work`, commit iff it returned `Ok`, otherwise roll back. The
    /// closure's result is returned unchanged, without wrapping.
    ///
    /// # Errors
    ///
    /// Returns the error produced by `work` when the transaction rolled
    /// back.
    fn execute<T, E, F>(&self, work: F) -> Result<T, E>
    where
        F: FnOnce(&Self::Repos) -> Result<T, E>;
}
