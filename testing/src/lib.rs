//! # Idempotent Rust Testing
//!
//! Mock collaborators and helpers for testing code built on the
//! idempotency core:
//!
//! - [`mocks::FailingStore`]: wraps any store and fails get and/or save on
//!   demand, for driving the lost-guarantee error paths.
//! - [`mocks::FailingSerializer`]: fails marshal and/or unmarshal on
//!   demand, for driving the codec error paths.
//! - [`mocks::InvocationCounter`]: thread-safe counter for at-most-once
//!   assertions on wrapped actions.
//! - [`init_test_tracing`]: opt-in tracing output for debugging a test.

use std::sync::OnceLock;

/// Mock implementations of core collaborator traits.
pub mod mocks {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    use idempotent_rust_core::record::Record;
    use idempotent_rust_core::serializer::{CodecError, Serializer};
    use idempotent_rust_core::store::{Store, StoreError};

    /// A store wrapper whose operations can be made to fail at runtime.
    ///
    /// # Example
    ///
    /// ```
    /// use idempotent_rust_core::record::Record;
    /// use idempotent_rust_core::store::{Store, StoreError};
    /// use idempotent_rust_testing::mocks::{FailingStore, MapStore};
    ///
    /// let store = FailingStore::new(MapStore::default());
    /// store.fail_saves(true);
    /// let err = store.save(Record::success("k", "fp", vec![])).unwrap_err();
    /// assert!(matches!(err, StoreError::Backend(_)));
    /// ```
    #[derive(Debug)]
    pub struct FailingStore<S> {
        inner: S,
        fail_get: AtomicBool,
        fail_save: AtomicBool,
    }

    impl<S> FailingStore<S> {
        /// Wraps `inner`; both operations pass through until toggled.
        pub const fn new(inner: S) -> Self {
            Self {
                inner,
                fail_get: AtomicBool::new(false),
                fail_save: AtomicBool::new(false),
            }
        }

        /// Makes subsequent `get` calls fail with a backend error.
        pub fn fail_gets(&self, fail: bool) {
            self.fail_get.store(fail, Ordering::SeqCst);
        }

        /// Makes subsequent `save` calls fail with a backend error.
        pub fn fail_saves(&self, fail: bool) {
            self.fail_save.store(fail, Ordering::SeqCst);
        }

        /// The wrapped store.
        pub const fn inner(&self) -> &S {
            &self.inner
        }
    }

    impl<S: Store> Store for FailingStore<S> {
        fn get(&self, key: &str) -> Result<Record, StoreError> {
            if self.fail_get.load(Ordering::SeqCst) {
                return Err(StoreError::Backend("injected get failure".to_string()));
            }
            self.inner.get(key)
        }

        fn save(&self, record: Record) -> Result<(), StoreError> {
            if self.fail_save.load(Ordering::SeqCst) {
                return Err(StoreError::Backend("injected save failure".to_string()));
            }
            self.inner.save(record)
        }
    }

    /// A minimal thread-safe map-backed store, insert-only like any
    /// conforming backend.
    #[derive(Debug, Default)]
    pub struct MapStore {
        records: std::sync::Mutex<std::collections::HashMap<String, Record>>,
    }

    impl Store for MapStore {
        fn get(&self, key: &str) -> Result<Record, StoreError> {
            self.records
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner)
                .get(key)
                .cloned()
                .ok_or(StoreError::NotFound)
        }

        fn save(&self, record: Record) -> Result<(), StoreError> {
            let mut records = self
                .records
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner);
            if records.contains_key(record.key()) {
                return Err(StoreError::Backend(format!(
                    "record already exists for key {}",
                    record.key()
                )));
            }
            records.insert(record.key().to_string(), record);
            Ok(())
        }
    }

    /// A serializer whose operations can be made to fail at runtime.
    ///
    /// Wraps an inner serializer so that the happy path still round-trips.
    pub struct FailingSerializer<T> {
        inner: Arc<dyn Serializer<T>>,
        fail_marshal: AtomicBool,
        fail_unmarshal: AtomicBool,
    }

    impl<T> FailingSerializer<T> {
        /// Wraps `inner`; both operations pass through until toggled.
        pub fn new(inner: Arc<dyn Serializer<T>>) -> Self {
            Self {
                inner,
                fail_marshal: AtomicBool::new(false),
                fail_unmarshal: AtomicBool::new(false),
            }
        }

        /// Makes subsequent `marshal` calls fail.
        pub fn fail_marshals(&self, fail: bool) {
            self.fail_marshal.store(fail, Ordering::SeqCst);
        }

        /// Makes subsequent `unmarshal` calls fail.
        pub fn fail_unmarshals(&self, fail: bool) {
            self.fail_unmarshal.store(fail, Ordering::SeqCst);
        }
    }

    impl<T> Serializer<T> for FailingSerializer<T> {
        fn marshal(&self, value: &T) -> Result<Vec<u8>, CodecError> {
            if self.fail_marshal.load(Ordering::SeqCst) {
                return Err(CodecError::new("injected marshal failure"));
            }
            self.inner.marshal(value)
        }

        fn unmarshal(&self, bytes: &[u8]) -> Result<T, CodecError> {
            if self.fail_unmarshal.load(Ordering::SeqCst) {
                return Err(CodecError::new("injected unmarshal failure"));
            }
            self.inner.unmarshal(bytes)
        }
    }

    /// Thread-safe invocation counter for at-most-once assertions.
    ///
    /// # Example
    ///
    /// ```
    /// use idempotent_rust_testing::mocks::InvocationCounter;
    ///
    /// let counter = InvocationCounter::new();
    /// let clone = counter.clone();
    /// clone.record();
    /// assert_eq!(counter.count(), 1);
    /// ```
    #[derive(Debug, Clone, Default)]
    pub struct InvocationCounter {
        count: Arc<AtomicUsize>,
    }

    impl InvocationCounter {
        /// Creates a counter at zero.
        #[must_use]
        pub fn new() -> Self {
            Self::default()
        }

        /// Records one invocation.
        pub fn record(&self) {
            self.count.fetch_add(1, Ordering::SeqCst);
        }

        /// The number of invocations recorded so far.
        #[must_use]
        pub fn count(&self) -> usize {
            self.count.load(Ordering::SeqCst)
        }
    }
}

/// Initializes a compact tracing subscriber once per test binary.
///
/// Respects `RUST_LOG`; does nothing on repeated calls.
pub fn init_test_tracing() {
    static INIT: OnceLock<()> = OnceLock::new();
    INIT.get_or_init(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .compact()
            .try_init();
    });
}

// Re-export commonly used items
pub use mocks::{FailingSerializer, FailingStore, InvocationCounter, MapStore};
