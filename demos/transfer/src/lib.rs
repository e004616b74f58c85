//! Account transfer demo for the idempotency core.
//!
//! A small money-transfer domain wired through the idempotency wrapper and
//! the in-memory transactional backend. The integration tests in
//! `tests/transfer.rs` exercise the end-to-end guarantees: one execution
//! per key, cached success replay, recorded business failures, and
//! untouched balances on every replay path.

pub mod domain;
pub mod service;

pub use domain::{Account, Accounts, TransferError, apply_transfer};
pub use service::{TransferFailure, TransferInput, TransferReceipt, TransferService};
