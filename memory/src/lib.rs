//! # Idempotent Rust Memory
//!
//! In-memory transactional backend for the idempotency core: a
//! snapshot-based [`MemoryDatabase`], a transaction-scoped
//! [`MemoryStore`] implementing the core `Store` contract, and a
//! [`MemoryUnitOfWork`] implementing the core `UnitOfWork` contract.
//!
//! Intended for tests, demos, and single-process services. Transactions
//! serialize on the database lock; commit replaces the live tables with the
//! transaction's working snapshot, rollback drops the snapshot.
//!
//! ## Example
//!
//! ```
//! use idempotent_rust_core::unit_of_work::{Repositories, UnitOfWork};
//! use idempotent_rust_memory::{MemoryDatabase, MemoryStore, MemoryUnitOfWork};
//!
//! struct Bundle {
//!     store: MemoryStore,
//! }
//!
//! impl Repositories for Bundle {
//!     type Store = MemoryStore;
//!
//!     fn idempotency_store(&self) -> &MemoryStore {
//!         &self.store
//!     }
//! }
//!
//! let database = MemoryDatabase::new();
//! let unit_of_work = MemoryUnitOfWork::new(database, |transaction| Bundle {
//!     store: MemoryStore::new(transaction),
//! });
//! let result: Result<(), String> = unit_of_work.execute(|_repos| Ok(()));
//! assert!(result.is_ok());
//! ```

pub mod database;
pub mod store;
pub mod unit_of_work;

pub use database::{MemoryDatabase, MemoryTransaction};
pub use store::{IDEMPOTENCY_TABLE, MemoryStore};
pub use unit_of_work::{MemoryUnitOfWork, RepositoryFactory};
