//! Error taxonomy for idempotent execution.
//!
//! The taxonomy separates four very different situations:
//!
//! - **Caller misuse**: [`IdempotencyError::FingerprintMismatch`], an
//!   idempotency key reused with different input. Not retryable.
//! - **Unreadable state**: [`CheckError`], a record that exists but cannot
//!   be read back. Requires operator attention; never caused by the caller.
//! - **Lost guarantee**: [`IdempotencyError::SuccessRecord`] and
//!   [`IdempotencyError::FailureRecord`], raised when the action completed
//!   but its outcome could not be persisted. These are the only errors the
//!   core wraps in dedicated types, so callers can detect and alert on them
//!   specifically; they always force a rollback of the action's effects.
//! - **The action's own error**: [`IdempotencyError::Action`], surfaced
//!   unmodified, whether it was recorded as a business failure or treated
//!   as a transient infrastructure fault.

use thiserror::Error;

use crate::fingerprint::FingerprintError;
use crate::serializer::CodecError;
use crate::store::StoreError;

/// A failure while reading back a stored outcome.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CheckError {
    /// The key was already used with different input data.
    #[error("idempotency key already used with different input data")]
    FingerprintMismatch,

    /// A stored success output exists but does not deserialize.
    #[error("success output unmarshal error: {0}")]
    SuccessUnmarshal(#[source] CodecError),

    /// A stored failure output exists but does not deserialize.
    #[error("failure output unmarshal error: {0}")]
    FailureUnmarshal(#[source] CodecError),

    /// The store itself failed during lookup.
    #[error("idempotency store error: {0}")]
    Store(#[source] StoreError),
}

/// A failure while recording an outcome.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SaveError {
    /// The outcome could not be serialized; nothing was written.
    #[error("output marshal error: {0}")]
    Marshal(#[source] CodecError),

    /// The store rejected the insert.
    #[error("idempotency store error: {0}")]
    Store(#[source] StoreError),
}

/// The error returned by [`Wrapper::execute`](crate::wrapper::Wrapper::execute).
///
/// Generic over the caller's action error type `E`, which is carried
/// through unmodified in the [`Action`](IdempotencyError::Action) variant.
#[derive(Debug, Error)]
pub enum IdempotencyError<E> {
    /// The input fingerprint could not be computed. Terminal: no
    /// transaction was opened and the action never ran.
    #[error("failed to compute input fingerprint: {0}")]
    Fingerprint(#[source] FingerprintError),

    /// The key was already used with different input data. A client usage
    /// error; nothing was written and the action never ran.
    #[error("idempotency key already used with different input data")]
    FingerprintMismatch,

    /// A recorded outcome exists but could not be read back, or the lookup
    /// itself failed. The attempt rolled back without running the action.
    #[error("failed to read recorded outcome: {0}")]
    Check(#[source] CheckError),

    /// The action succeeded but its outcome could not be recorded. The
    /// whole attempt, including the action's side effects, rolled back.
    #[error("failed to record success output: {0}")]
    SuccessRecord(#[source] SaveError),

    /// The action failed with a recordable business failure, but the
    /// failure record could not be written. The attempt rolled back;
    /// carries both the persistence error and the action's original error
    /// for diagnostics.
    #[error("failed to record failure output: {source} (original error: {action_error})")]
    FailureRecord {
        /// The persistence failure.
        #[source]
        source: SaveError,
        /// The action error that was being recorded.
        action_error: E,
    },

    /// The action's own error, surfaced unmodified.
    ///
    /// Either a business failure (durably recorded, so replays return this
    /// same error) or a non-business failure (not recorded, so a retry
    /// re-executes the action).
    #[error("{0}")]
    Action(E),
}

impl<E> From<CheckError> for IdempotencyError<E> {
    fn from(err: CheckError) -> Self {
        // FingerprintMismatch is a caller-facing condition of its own, not
        // a lookup infrastructure failure.
        match err {
            CheckError::FingerprintMismatch => Self::FingerprintMismatch,
            other => Self::Check(other),
        }
    }
}

impl<E> IdempotencyError<E> {
    /// Returns the action's own error, if that is what this is.
    pub fn into_action_error(self) -> Option<E> {
        match self {
            Self::Action(err) => Some(err),
            _ => None,
        }
    }

    /// Whether the exactly-once guarantee could not be persisted for a
    /// completed action.
    ///
    /// These are the cases worth alerting on: the action ran, its effects
    /// were rolled back, and a retry will run it again.
    #[must_use]
    pub const fn is_lost_guarantee(&self) -> bool {
        matches!(self, Self::SuccessRecord(_) | Self::FailureRecord { .. })
    }
}
