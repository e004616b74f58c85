//! Account domain: balances, the transfer rule, and the repository.

use idempotent_rust_memory::MemoryTransaction;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Table holding account rows.
pub const ACCOUNTS_TABLE: &str = "accounts";

/// A money account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    /// Account identifier.
    pub id: String,
    /// Current balance in minor units.
    pub balance: i64,
}

/// Transfer failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransferError {
    /// The source account does not cover the requested amount.
    ///
    /// The one business failure of this domain: it is recorded by the
    /// idempotency wrapper and replayed to retries.
    #[error("insufficient funds")]
    InsufficientFunds,

    /// No account exists with the given id. Treated as an infrastructure
    /// fault (bad wiring or missing seed data), not recorded.
    #[error("unknown account: {0}")]
    UnknownAccount(String),

    /// The account rows could not be encoded or decoded.
    #[error("account storage error: {0}")]
    Storage(String),
}

/// Moves `amount` between two accounts, in memory.
///
/// # Errors
///
/// Returns [`TransferError::InsufficientFunds`] when `from` cannot cover
/// `amount`; neither account is modified in that case.
pub fn apply_transfer(
    from: &mut Account,
    to: &mut Account,
    amount: i64,
) -> Result<(), TransferError> {
    if from.balance < amount {
        return Err(TransferError::InsufficientFunds);
    }
    from.balance -= amount;
    to.balance += amount;
    Ok(())
}

/// Transaction-scoped account repository over the in-memory database.
#[derive(Debug, Clone)]
pub struct Accounts {
    transaction: MemoryTransaction,
}

impl Accounts {
    /// Creates a repository scoped to the given transaction.
    #[must_use]
    pub const fn new(transaction: MemoryTransaction) -> Self {
        Self { transaction }
    }

    /// Adds a new account.
    ///
    /// # Errors
    ///
    /// Returns [`TransferError::Storage`] when the account does not encode
    /// or an account with the same id already exists.
    pub fn add(&self, account: &Account) -> Result<(), TransferError> {
        let bytes = encode(account)?;
        if !self.transaction.insert(ACCOUNTS_TABLE, &account.id, bytes) {
            return Err(TransferError::Storage(format!(
                "account {} already exists",
                account.id
            )));
        }
        Ok(())
    }

    /// Loads an account by id.
    ///
    /// # Errors
    ///
    /// Returns [`TransferError::UnknownAccount`] when absent, or
    /// [`TransferError::Storage`] when the stored row does not decode.
    pub fn get(&self, id: &str) -> Result<Account, TransferError> {
        let Some(bytes) = self.transaction.get(ACCOUNTS_TABLE, id) else {
            return Err(TransferError::UnknownAccount(id.to_string()));
        };
        serde_json::from_slice(&bytes).map_err(|err| TransferError::Storage(err.to_string()))
    }

    /// Writes back a modified account.
    ///
    /// # Errors
    ///
    /// Returns [`TransferError::Storage`] when the account does not encode.
    pub fn update(&self, account: &Account) -> Result<(), TransferError> {
        let bytes = encode(account)?;
        self.transaction.put(ACCOUNTS_TABLE, &account.id, bytes);
        Ok(())
    }
}

fn encode(account: &Account) -> Result<Vec<u8>, TransferError> {
    serde_json::to_vec(account).map_err(|err| TransferError::Storage(err.to_string()))
}
