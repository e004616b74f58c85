//! Idempotent transfer service.
//!
//! Wires the account domain through the idempotency wrapper: every transfer
//! carries a caller-chosen idempotency key, retries with the same key and
//! input replay the recorded outcome, and only
//! [`TransferError::InsufficientFunds`] is recorded as a replayable
//! business failure.

use std::sync::Arc;

use idempotent_rust_core::error::IdempotencyError;
use idempotent_rust_core::fingerprint::{Fingerprint, FingerprintError};
use idempotent_rust_core::serializer::json::JsonSerializer;
use idempotent_rust_core::unit_of_work::{Repositories, UnitOfWork};
use idempotent_rust_core::wrapper::{Config, Wrapper};
use idempotent_rust_memory::{MemoryDatabase, MemoryStore, MemoryTransaction, MemoryUnitOfWork};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{Account, Accounts, TransferError, apply_transfer};

/// A transfer request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferInput {
    /// Source account id.
    pub from_account: String,
    /// Destination account id.
    pub to_account: String,
    /// Amount in minor units.
    pub amount: i64,
}

impl Fingerprint for TransferInput {
    fn fingerprint(&self) -> Result<String, FingerprintError> {
        Ok(format!(
            "{}:{}:{}",
            self.from_account, self.to_account, self.amount
        ))
    }
}

/// The success output of a transfer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferReceipt {
    /// Identifier of the applied transaction; stable across replays.
    pub transaction_id: Uuid,
}

/// The storable failure output of a transfer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferFailure {
    /// Human-readable failure reason.
    pub reason: String,
}

/// Repository bundle for one transfer transaction.
pub struct TransferRepos {
    /// Account rows, scoped to the active transaction.
    pub accounts: Accounts,
    store: MemoryStore,
}

impl Repositories for TransferRepos {
    type Store = MemoryStore;

    fn idempotency_store(&self) -> &MemoryStore {
        &self.store
    }
}

fn make_repos(transaction: MemoryTransaction) -> TransferRepos {
    TransferRepos {
        accounts: Accounts::new(transaction.clone()),
        store: MemoryStore::new(transaction),
    }
}

type TransferWrapper =
    Wrapper<MemoryUnitOfWork<TransferRepos>, TransferReceipt, TransferFailure, TransferError>;

/// Executes money transfers exactly once per idempotency key.
pub struct TransferService {
    wrapper: TransferWrapper,
    admin: MemoryUnitOfWork<TransferRepos>,
}

impl TransferService {
    /// Creates a service over the given database.
    #[must_use]
    pub fn new(database: MemoryDatabase) -> Self {
        let unit_of_work = MemoryUnitOfWork::new(database.clone(), make_repos);
        let wrapper = Wrapper::new(Config {
            unit_of_work,
            success_serializer: Arc::new(JsonSerializer::<TransferReceipt>::new()),
            failure_serializer: Arc::new(JsonSerializer::<TransferFailure>::new()),
            error_to_failure: Arc::new(|err: &TransferError| match err {
                TransferError::InsufficientFunds => Some(TransferFailure {
                    reason: err.to_string(),
                }),
                // Everything else is infrastructure: never cached, a retry
                // re-executes the transfer.
                TransferError::UnknownAccount(_) | TransferError::Storage(_) => None,
            }),
            failure_to_error: Arc::new(|_failure: TransferFailure| {
                TransferError::InsufficientFunds
            }),
        });
        Self {
            wrapper,
            admin: MemoryUnitOfWork::new(database, make_repos),
        }
    }

    /// Opens an account with an initial balance.
    ///
    /// # Errors
    ///
    /// Returns [`TransferError::Storage`] when the account already exists
    /// or cannot be encoded.
    pub fn open_account(&self, account: Account) -> Result<(), TransferError> {
        self.admin
            .execute(|repos: &TransferRepos| repos.accounts.add(&account))
    }

    /// Reads an account balance.
    ///
    /// # Errors
    ///
    /// Returns [`TransferError::UnknownAccount`] when the account does not
    /// exist.
    pub fn balance(&self, id: &str) -> Result<i64, TransferError> {
        self.admin
            .execute(|repos: &TransferRepos| repos.accounts.get(id))
            .map(|account| account.balance)
    }

    /// Executes a transfer exactly once for `idempotency_key`.
    ///
    /// Replays with the same key and input return the recorded receipt (or
    /// the recorded insufficient-funds error) without touching balances.
    ///
    /// # Errors
    ///
    /// Returns the transfer's own error wrapped in
    /// [`IdempotencyError::Action`], or one of the wrapper's errors for key
    /// misuse and persistence failures.
    pub fn transfer(
        &self,
        idempotency_key: &str,
        input: TransferInput,
    ) -> Result<TransferReceipt, IdempotencyError<TransferError>> {
        tracing::debug!(idempotency_key, "transfer requested");
        self.wrapper
            .execute(idempotency_key, input, Self::apply_transfer_action)
    }

    fn apply_transfer_action(
        repos: &TransferRepos,
        _idempotency_key: &str,
        input: &TransferInput,
    ) -> Result<TransferReceipt, TransferError> {
        let mut from = repos.accounts.get(&input.from_account)?;
        let mut to = repos.accounts.get(&input.to_account)?;
        apply_transfer(&mut from, &mut to, input.amount)?;
        repos.accounts.update(&from)?;
        repos.accounts.update(&to)?;
        Ok(TransferReceipt {
            transaction_id: Uuid::new_v4(),
        })
    }
}
