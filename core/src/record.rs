//! The persisted representation of one action outcome.
//!
//! A [`Record`] is written exactly once per idempotency key, after the
//! protected action has fully completed with either a success output or a
//! recordable business failure. It is never updated and never written
//! speculatively; retention and expiry are storage-backend policies.

use serde::{Deserialize, Serialize};

/// The durable outcome of one idempotent execution.
///
/// The four fields below are the only durable schema contract between the
/// core and any storage backend: a backend must round-trip them exactly.
/// The payload bytes are opaque to the core beyond the configured
/// [`Serializer`](crate::serializer::Serializer); the `success` flag decides
/// whether they decode as the success output or the failure output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    key: String,
    input_fingerprint: String,
    success: bool,
    payload: Vec<u8>,
}

impl Record {
    /// Creates a record for a successfully completed action.
    #[must_use]
    pub fn success(
        key: impl Into<String>,
        input_fingerprint: impl Into<String>,
        payload: Vec<u8>,
    ) -> Self {
        Self {
            key: key.into(),
            input_fingerprint: input_fingerprint.into(),
            success: true,
            payload,
        }
    }

    /// Creates a record for an action that completed with a recordable
    /// business failure.
    #[must_use]
    pub fn failure(
        key: impl Into<String>,
        input_fingerprint: impl Into<String>,
        payload: Vec<u8>,
    ) -> Self {
        Self {
            key: key.into(),
            input_fingerprint: input_fingerprint.into(),
            success: false,
            payload,
        }
    }

    /// The idempotency key this record belongs to.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// The fingerprint of the input the action originally ran with.
    ///
    /// Used only for equality comparison against the fingerprint of a
    /// replayed request, never for lookup.
    #[must_use]
    pub fn input_fingerprint(&self) -> &str {
        &self.input_fingerprint
    }

    /// Whether the payload holds a success output or a failure output.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.success
    }

    /// The serialized outcome bytes.
    #[must_use]
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }
}
