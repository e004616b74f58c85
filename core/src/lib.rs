//! # Idempotent Rust Core
//!
//! An exactly-once execution guarantee for otherwise side-effecting
//! operations, keyed by a caller-supplied idempotency key.
//!
//! Request-handling code (APIs, message consumers) may see the same logical
//! request more than once through retries and at-least-once delivery. The
//! underlying side effect (say, a funds transfer) must still be applied
//! exactly once, and every caller must get a consistent answer. This crate
//! provides the decision engine for that guarantee:
//!
//! - **[`Record`]**: the persisted outcome of one execution.
//! - **[`Store`](store::Store)**: the storage contract, scoped to a
//!   caller-managed transaction.
//! - **[`Serializer`](serializer::Serializer)**: payload codec contract,
//!   with a JSON backend in [`serializer::json`].
//! - **[`Fingerprint`](fingerprint::Fingerprint)**: deterministic input
//!   digests that detect idempotency-key misuse.
//! - **[`UnitOfWork`](unit_of_work::UnitOfWork)**: the transactional
//!   boundary that makes check-then-act atomic.
//! - **[`Manager`](manager::Manager)**: lookup, fingerprint verification,
//!   and outcome persistence.
//! - **[`Wrapper`](wrapper::Wrapper)**: the public entry point.
//!
//! ## Guarantees
//!
//! Given a transactional store, for every key/input pair the wrapped action
//! runs at most once; replays return the recorded outcome, either the
//! success output or the original business error reconstructed from
//! storage. An
//! outcome that cannot be recorded rolls the whole attempt back, side
//! effects included, so a retry starts from a clean slate.
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use idempotent_rust_core::serializer::json::JsonSerializer;
//! use idempotent_rust_core::wrapper::{Config, Wrapper};
//!
//! let wrapper = Wrapper::new(Config {
//!     unit_of_work,
//!     success_serializer: Arc::new(JsonSerializer::<Receipt>::new()),
//!     failure_serializer: Arc::new(JsonSerializer::<TransferFailure>::new()),
//!     error_to_failure: Arc::new(|err: &TransferError| match err {
//!         TransferError::InsufficientFunds => Some(TransferFailure::from(err)),
//!         _ => None,
//!     }),
//!     failure_to_error: Arc::new(TransferError::from),
//! });
//!
//! let receipt = wrapper.execute("transfer-123", input, |repos, _key, input| {
//!     transfer(repos.accounts(), input)
//! })?;
//! ```
//!
//! ## Non-goals
//!
//! No distributed locking, no persistence engine of its own, no
//! retry/backoff policies, no transport-level delivery guarantees. Those
//! belong to the collaborators this crate is parameterized over.

pub mod error;
pub mod fingerprint;
pub mod manager;
pub mod record;
pub mod serializer;
pub mod store;
pub mod unit_of_work;
pub mod wrapper;

pub use error::{CheckError, IdempotencyError, SaveError};
pub use fingerprint::{Fingerprint, FingerprintError};
pub use manager::{Manager, Replay};
pub use record::Record;
pub use serializer::{CodecError, Serializer};
pub use store::{Store, StoreError};
pub use unit_of_work::{Repositories, UnitOfWork};
pub use wrapper::{Config, Wrapper};
