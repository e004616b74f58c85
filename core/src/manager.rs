//! Record lookup and persistence.
//!
//! The [`Manager`] mediates every read and write of idempotency state. It
//! owns the serialization policy for both outcome types and the
//! reconstruction of a stored failure back into the caller's error type.
//! It never opens transactions: the store it operates on is handed in by
//! the [`Wrapper`](crate::wrapper::Wrapper) from inside the active unit of
//! work.

use std::sync::Arc;

use crate::error::{CheckError, SaveError};
use crate::record::Record;
use crate::serializer::Serializer;
use crate::store::{Store, StoreError};

/// A previously recorded outcome, reconstructed for replay.
#[derive(Debug)]
pub enum Replay<S, E> {
    /// The original execution succeeded with this output.
    Success(S),
    /// The original execution failed with this (reconstructed) error.
    Failure(E),
}

/// Mediates reads and writes of idempotency records.
///
/// `S` is the success output type, `F` the storable failure output type,
/// `E` the caller's error type that failures are reconstructed into.
pub struct Manager<S, F, E> {
    success_serializer: Arc<dyn Serializer<S>>,
    failure_serializer: Arc<dyn Serializer<F>>,
    failure_to_error: Arc<dyn Fn(F) -> E + Send + Sync>,
}

impl<S, F, E> Manager<S, F, E> {
    /// Creates a manager from the two outcome serializers and the
    /// failure-reconstruction strategy.
    ///
    /// `failure_to_error` must be pure and deterministic: it runs inside
    /// the caller's transaction on every replay of a recorded failure.
    #[must_use]
    pub fn new(
        success_serializer: Arc<dyn Serializer<S>>,
        failure_serializer: Arc<dyn Serializer<F>>,
        failure_to_error: Arc<dyn Fn(F) -> E + Send + Sync>,
    ) -> Self {
        Self {
            success_serializer,
            failure_serializer,
            failure_to_error,
        }
    }

    /// Looks up the recorded outcome for `key`, if any.
    ///
    /// Returns `Ok(None)` when no record exists; absence is not an error
    /// at this level. When a record is found, its stored fingerprint must
    /// match `fingerprint`, and its payload is deserialized into either the
    /// success output or the failure output, the latter being converted
    /// back into the caller's error type.
    ///
    /// # Errors
    ///
    /// - [`CheckError::FingerprintMismatch`] when the key was already used
    ///   with different input.
    /// - [`CheckError::SuccessUnmarshal`] / [`CheckError::FailureUnmarshal`]
    ///   when the stored payload is unreadable.
    /// - [`CheckError::Store`] when the lookup itself fails.
    pub fn check_processed<St>(
        &self,
        key: &str,
        fingerprint: &str,
        store: &St,
    ) -> Result<Option<Replay<S, E>>, CheckError>
    where
        St: Store + ?Sized,
    {
        let record = match store.get(key) {
            Ok(record) => record,
            Err(StoreError::NotFound) => return Ok(None),
            Err(err) => return Err(CheckError::Store(err)),
        };
        if record.input_fingerprint() != fingerprint {
            return Err(CheckError::FingerprintMismatch);
        }
        if record.is_success() {
            let output = self
                .success_serializer
                .unmarshal(record.payload())
                .map_err(CheckError::SuccessUnmarshal)?;
            tracing::debug!(key, "replaying recorded success output");
            return Ok(Some(Replay::Success(output)));
        }
        let failure = self
            .failure_serializer
            .unmarshal(record.payload())
            .map_err(CheckError::FailureUnmarshal)?;
        tracing::debug!(key, "replaying recorded failure output");
        Ok(Some(Replay::Failure((self.failure_to_error)(failure))))
    }

    /// Serializes and persists a success outcome.
    ///
    /// # Errors
    ///
    /// Returns [`SaveError::Marshal`] when the output cannot be serialized
    /// (nothing is written) or [`SaveError::Store`] when the insert fails.
    pub fn save_success<St>(
        &self,
        key: &str,
        fingerprint: &str,
        output: &S,
        store: &St,
    ) -> Result<(), SaveError>
    where
        St: Store + ?Sized,
    {
        let payload = self
            .success_serializer
            .marshal(output)
            .map_err(SaveError::Marshal)?;
        store
            .save(Record::success(key, fingerprint, payload))
            .map_err(SaveError::Store)
    }

    /// Serializes and persists a failure outcome.
    ///
    /// # Errors
    ///
    /// Returns [`SaveError::Marshal`] when the failure output cannot be
    /// serialized (nothing is written) or [`SaveError::Store`] when the
    /// insert fails.
    pub fn save_failure<St>(
        &self,
        key: &str,
        fingerprint: &str,
        failure: &F,
        store: &St,
    ) -> Result<(), SaveError>
    where
        St: Store + ?Sized,
    {
        let payload = self
            .failure_serializer
            .marshal(failure)
            .map_err(SaveError::Marshal)?;
        store
            .save(Record::failure(key, fingerprint, payload))
            .map_err(SaveError::Store)
    }
}
