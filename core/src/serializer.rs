//! Payload serialization contract and the JSON backend.
//!
//! Success and failure outputs are caller-defined types; the core only ever
//! sees them as bytes inside a [`Record`](crate::record::Record). A
//! [`Serializer`] converts between the two. The [`json`] submodule provides
//! the serde_json-backed implementation used by most callers.

use thiserror::Error;

/// A serialization failure, with the underlying codec's message.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct CodecError(String);

impl CodecError {
    /// Creates a codec error from the underlying codec's message.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Converts a typed payload to and from bytes for persistence.
///
/// # Contract
///
/// Round-trip correctness: `unmarshal(marshal(v)) == v` for every valid
/// `v`. A stored record that fails to unmarshal is a system-level fault
/// (corrupted or incompatible data), not a cache miss.
pub trait Serializer<T>: Send + Sync {
    /// Serializes a value to bytes.
    ///
    /// # Errors
    ///
    /// Returns a [`CodecError`] when the value cannot be encoded.
    fn marshal(&self, value: &T) -> Result<Vec<u8>, CodecError>;

    /// Deserializes a value from bytes.
    ///
    /// # Errors
    ///
    /// Returns a [`CodecError`] when the bytes do not decode as `T`.
    fn unmarshal(&self, bytes: &[u8]) -> Result<T, CodecError>;
}

/// JSON serialization backend.
pub mod json {
    use std::marker::PhantomData;

    use serde::Serialize;
    use serde::de::DeserializeOwned;

    use super::{CodecError, Serializer};

    /// A [`Serializer`] that encodes payloads as JSON via serde_json.
    #[derive(Debug)]
    pub struct JsonSerializer<T>(PhantomData<fn() -> T>);

    impl<T> JsonSerializer<T> {
        /// Creates a JSON serializer for `T`.
        #[must_use]
        pub const fn new() -> Self {
            Self(PhantomData)
        }
    }

    impl<T> Default for JsonSerializer<T> {
        fn default() -> Self {
            Self::new()
        }
    }

    impl<T> Clone for JsonSerializer<T> {
        fn clone(&self) -> Self {
            Self::new()
        }
    }

    impl<T> Serializer<T> for JsonSerializer<T>
    where
        T: Serialize + DeserializeOwned,
    {
        fn marshal(&self, value: &T) -> Result<Vec<u8>, CodecError> {
            serde_json::to_vec(value).map_err(|err| CodecError::new(err.to_string()))
        }

        fn unmarshal(&self, bytes: &[u8]) -> Result<T, CodecError> {
            serde_json::from_slice(bytes).map_err(|err| CodecError::new(err.to_string()))
        }
    }
}
