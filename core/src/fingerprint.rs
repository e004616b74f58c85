//! Input fingerprinting capability.

use thiserror::Error;

/// A fingerprint computation failure.
///
/// Must only occur on genuine encoding problems, never on business state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct FingerprintError(String);

impl FingerprintError {
    /// Creates a fingerprint error with the given message.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Produces a deterministic digest of an action input.
///
/// The [`Wrapper`](crate::wrapper::Wrapper) stores the digest alongside the
/// outcome and compares it on replay: a request that reuses an idempotency
/// key with a different input is rejected with
/// [`IdempotencyError::FingerprintMismatch`](crate::error::IdempotencyError::FingerprintMismatch)
/// instead of returning an outcome that belongs to other data.
///
/// # Contract
///
/// Equal inputs must produce equal digests. The digest is compared for
/// equality only, never used as a lookup key, so any stable encoding of the
/// relevant fields is acceptable.
pub trait Fingerprint {
    /// Computes the digest of this input.
    ///
    /// # Errors
    ///
    /// Returns a [`FingerprintError`] when the input cannot be encoded.
    fn fingerprint(&self) -> Result<String, FingerprintError>;
}
