//! The public entry point for idempotent execution.
//!
//! A [`Wrapper`] turns a side-effecting action into an exactly-once
//! operation. Per invocation it moves through a fixed sequence: fingerprint
//! the input, open the unit of work, look up a recorded outcome, and either
//! replay it or run the action and record what happened.
//!
//! The commit decision is driven by whether the idempotency record was
//! durably written, not by whether the action "succeeded": a business
//! failure whose record was saved still commits (so replays short-circuit),
//! while any failure to record an outcome rolls back the whole attempt,
//! action side effects included. A silent, un-recorded side effect is worse
//! than a safely retryable no-op.

use std::sync::Arc;

use crate::error::IdempotencyError;
use crate::fingerprint::Fingerprint;
use crate::manager::{Manager, Replay};
use crate::serializer::Serializer;
use crate::unit_of_work::{Repositories, UnitOfWork};

/// Dependencies and conversion strategies for a [`Wrapper`].
pub struct Config<U, S, F, E> {
    /// The transactional boundary for lookup, action, and record write.
    pub unit_of_work: U,
    /// Serializes success outputs for storage.
    pub success_serializer: Arc<dyn Serializer<S>>,
    /// Serializes failure outputs for storage.
    pub failure_serializer: Arc<dyn Serializer<F>>,
    /// Classifies an action error: `Some` for a recordable business
    /// failure, `None` for an infrastructure failure that must not be
    /// cached. Must be pure and deterministic.
    pub error_to_failure: Arc<dyn Fn(&E) -> Option<F> + Send + Sync>,
    /// Converts a stored failure output back into the caller's error.
    /// Must be pure and deterministic.
    pub failure_to_error: Arc<dyn Fn(F) -> E + Send + Sync>,
}

/// How an attempt came out of the transaction.
///
/// `RecordedFailure` commits, since the failure record must survive, but
/// the wrapper still surfaces the original action error to the caller.
enum Completion<S, E> {
    Success(S),
    RecordedFailure(E),
}

/// Executes caller-supplied actions exactly once per idempotency key.
///
/// `U` is the unit-of-work type, `S` the success output, `F` the storable
/// failure output, `E` the caller's action error type.
pub struct Wrapper<U, S, F, E> {
    unit_of_work: U,
    manager: Manager<S, F, E>,
    error_to_failure: Arc<dyn Fn(&E) -> Option<F> + Send + Sync>,
}

impl<U, S, F, E> Wrapper<U, S, F, E>
where
    U: UnitOfWork,
{
    /// Creates a wrapper from its configuration.
    #[must_use]
    pub fn new(config: Config<U, S, F, E>) -> Self {
        let manager = Manager::new(
            config.success_serializer,
            config.failure_serializer,
            config.failure_to_error,
        );
        Self {
            unit_of_work: config.unit_of_work,
            manager,
            error_to_failure: config.error_to_failure,
        }
    }

    /// Runs `action` exactly once for `key` and this `input`.
    ///
    /// On the first call the action runs inside the unit of work and its
    /// outcome is recorded atomically with its side effects. Replays with
    /// the same key and an identical input return the recorded outcome
    /// without invoking the action; replays with different input are
    /// rejected.
    ///
    /// # Errors
    ///
    /// - [`IdempotencyError::Fingerprint`]: the input digest could not be
    ///   computed; nothing ran.
    /// - [`IdempotencyError::FingerprintMismatch`]: the key was reused
    ///   with different input; nothing ran.
    /// - [`IdempotencyError::Check`]: a recorded outcome exists but could
    ///   not be read back.
    /// - [`IdempotencyError::SuccessRecord`] /
    ///   [`IdempotencyError::FailureRecord`]: the action completed but its
    ///   outcome could not be recorded; all of its effects rolled back.
    /// - [`IdempotencyError::Action`]: the action's own error, whether
    ///   freshly raised, durably recorded, or replayed from the store.
    pub fn execute<I, A>(&self, key: &str, input: I, action: A) -> Result<S, IdempotencyError<E>>
    where
        I: Fingerprint,
        A: FnOnce(&U::Repos, &str, &I) -> Result<S, E>,
    {
        let fingerprint = input
            .fingerprint()
            .map_err(IdempotencyError::Fingerprint)?;
        let completion = self.unit_of_work.execute(|repos| {
            let store = repos.idempotency_store();
            if let Some(replay) = self.manager.check_processed(key, &fingerprint, store)? {
                return Ok(match replay {
                    Replay::Success(output) => Completion::Success(output),
                    Replay::Failure(err) => Completion::RecordedFailure(err),
                });
            }
            match action(repos, key, &input) {
                Ok(output) => {
                    if let Err(save_err) =
                        self.manager.save_success(key, &fingerprint, &output, store)
                    {
                        tracing::warn!(key, error = %save_err,
                            "success output could not be recorded, rolling back");
                        return Err(IdempotencyError::SuccessRecord(save_err));
                    }
                    Ok(Completion::Success(output))
                }
                Err(action_err) => match (self.error_to_failure)(&action_err) {
                    Some(failure) => {
                        match self.manager.save_failure(key, &fingerprint, &failure, store) {
                            Ok(()) => {
                                tracing::debug!(key, "recorded business failure");
                                Ok(Completion::RecordedFailure(action_err))
                            }
                            Err(save_err) => {
                                tracing::warn!(key, error = %save_err,
                                    "failure output could not be recorded, rolling back");
                                Err(IdempotencyError::FailureRecord {
                                    source: save_err,
                                    action_error: action_err,
                                })
                            }
                        }
                    }
                    // Infrastructure failures are never cached: the
                    // transaction rolls back and a retry re-executes.
                    None => Err(IdempotencyError::Action(action_err)),
                },
            }
        })?;
        match completion {
            Completion::Success(output) => Ok(output),
            Completion::RecordedFailure(err) => Err(IdempotencyError::Action(err)),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use std::cell::{Cell, RefCell};
    use std::collections::HashMap;
    use std::rc::Rc;

    use proptest::prelude::*;
    use serde::{Deserialize, Serialize};

    use super::*;
    use crate::error::SaveError;
    use crate::fingerprint::FingerprintError;
    use crate::record::Record;
    use crate::serializer::CodecError;
    use crate::serializer::json::JsonSerializer;
    use crate::store::{Store, StoreError};

    #[derive(Debug, Clone, PartialEq, Eq)]
    enum TestError {
        Business(String),
        Infra(String),
    }

    impl std::fmt::Display for TestError {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            match self {
                Self::Business(reason) => write!(f, "business failure: {reason}"),
                Self::Infra(reason) => write!(f, "infra failure: {reason}"),
            }
        }
    }

    #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
    struct TestFailure {
        reason: String,
    }

    struct TestInput {
        digest: String,
    }

    impl TestInput {
        fn new(digest: &str) -> Self {
            Self {
                digest: digest.to_string(),
            }
        }
    }

    impl Fingerprint for TestInput {
        fn fingerprint(&self) -> Result<String, FingerprintError> {
            Ok(self.digest.clone())
        }
    }

    /// Input whose fingerprint computation always fails.
    struct UnhashableInput;

    impl Fingerprint for UnhashableInput {
        fn fingerprint(&self) -> Result<String, FingerprintError> {
            Err(FingerprintError::new("unencodable input"))
        }
    }

    /// Transaction-scoped store over a working copy of the database map.
    struct FakeStore {
        working: RefCell<HashMap<String, Record>>,
        fail_save: bool,
    }

    impl Store for FakeStore {
        fn get(&self, key: &str) -> Result<Record, StoreError> {
            self.working
                .borrow()
                .get(key)
                .cloned()
                .ok_or(StoreError::NotFound)
        }

        fn save(&self, record: Record) -> Result<(), StoreError> {
            if self.fail_save {
                return Err(StoreError::Backend("save disabled".to_string()));
            }
            let mut working = self.working.borrow_mut();
            if working.contains_key(record.key()) {
                return Err(StoreError::Backend(format!(
                    "record already exists for key {}",
                    record.key()
                )));
            }
            working.insert(record.key().to_string(), record);
            Ok(())
        }
    }

    struct FakeRepos {
        store: FakeStore,
    }

    impl Repositories for FakeRepos {
        type Store = FakeStore;

        fn idempotency_store(&self) -> &FakeStore {
            &self.store
        }
    }

    /// Snapshot-per-transaction unit of work that counts commits and
    /// rollbacks, so tests can assert on atomicity.
    #[derive(Default)]
    struct FakeDb {
        records: RefCell<HashMap<String, Record>>,
        commits: Cell<usize>,
        rollbacks: Cell<usize>,
        fail_save: Cell<bool>,
    }

    struct FakeUnitOfWork {
        db: Rc<FakeDb>,
    }

    impl UnitOfWork for FakeUnitOfWork {
        type Repos = FakeRepos;

        fn execute<T, E, F>(&self, work: F) -> Result<T, E>
        where
            F: FnOnce(&Self::Repos) -> Result<T, E>,
        {
            let repos = FakeRepos {
                store: FakeStore {
                    working: RefCell::new(self.db.records.borrow().clone()),
                    fail_save: self.db.fail_save.get(),
                },
            };
            match work(&repos) {
                Ok(value) => {
                    *self.db.records.borrow_mut() = repos.store.working.into_inner();
                    self.db.commits.set(self.db.commits.get() + 1);
                    Ok(value)
                }
                Err(err) => {
                    self.db.rollbacks.set(self.db.rollbacks.get() + 1);
                    Err(err)
                }
            }
        }
    }

    type TestWrapper = Wrapper<FakeUnitOfWork, i64, TestFailure, TestError>;

    fn wrapper(db: &Rc<FakeDb>) -> TestWrapper {
        Wrapper::new(Config {
            unit_of_work: FakeUnitOfWork { db: Rc::clone(db) },
            success_serializer: Arc::new(JsonSerializer::<i64>::new()),
            failure_serializer: Arc::new(JsonSerializer::<TestFailure>::new()),
            error_to_failure: Arc::new(|err: &TestError| match err {
                TestError::Business(reason) => Some(TestFailure {
                    reason: reason.clone(),
                }),
                TestError::Infra(_) => None,
            }),
            failure_to_error: Arc::new(|failure: TestFailure| TestError::Business(failure.reason)),
        })
    }

    /// Action returning `result` that counts its invocations.
    fn counted_action(
        counter: &Rc<Cell<usize>>,
        result: Result<i64, TestError>,
    ) -> impl FnOnce(&FakeRepos, &str, &TestInput) -> Result<i64, TestError> {
        let counter = Rc::clone(counter);
        move |_repos, _key, _input| {
            counter.set(counter.get() + 1);
            result
        }
    }

    #[test]
    fn test_success_runs_action_and_records_outcome() {
        let db = Rc::new(FakeDb::default());
        let wrapper = wrapper(&db);
        let calls = Rc::new(Cell::new(0));

        let output = wrapper
            .execute("k-1", TestInput::new("fp"), counted_action(&calls, Ok(42)))
            .unwrap();

        assert_eq!(output, 42);
        assert_eq!(calls.get(), 1);
        assert_eq!(db.commits.get(), 1);
        assert_eq!(db.rollbacks.get(), 0);
        assert!(db.records.borrow().contains_key("k-1"));
    }

    #[test]
    fn test_replay_returns_recorded_success_without_rerunning() {
        let db = Rc::new(FakeDb::default());
        let wrapper = wrapper(&db);
        let calls = Rc::new(Cell::new(0));

        let first = wrapper
            .execute("k-1", TestInput::new("fp"), counted_action(&calls, Ok(42)))
            .unwrap();
        let second = wrapper
            .execute("k-1", TestInput::new("fp"), counted_action(&calls, Ok(99)))
            .unwrap();

        assert_eq!(first, 42);
        assert_eq!(second, 42); // Recorded output, not the second action's
        assert_eq!(calls.get(), 1);
        assert_eq!(db.commits.get(), 2); // Replay commits read-only
    }

    #[test]
    fn test_key_reuse_with_different_input_is_rejected() {
        let db = Rc::new(FakeDb::default());
        let wrapper = wrapper(&db);
        let calls = Rc::new(Cell::new(0));

        wrapper
            .execute("k-1", TestInput::new("fp-a"), counted_action(&calls, Ok(1)))
            .unwrap();
        let err = wrapper
            .execute("k-1", TestInput::new("fp-b"), counted_action(&calls, Ok(2)))
            .unwrap_err();

        assert!(matches!(err, IdempotencyError::FingerprintMismatch));
        assert_eq!(calls.get(), 1); // Second action never invoked
    }

    #[test]
    fn test_business_failure_is_recorded_and_replayed() {
        let db = Rc::new(FakeDb::default());
        let wrapper = wrapper(&db);
        let calls = Rc::new(Cell::new(0));
        let failure = TestError::Business("insufficient funds".to_string());

        let first = wrapper
            .execute(
                "k-1",
                TestInput::new("fp"),
                counted_action(&calls, Err(failure.clone())),
            )
            .unwrap_err();
        let second = wrapper
            .execute("k-1", TestInput::new("fp"), counted_action(&calls, Ok(7)))
            .unwrap_err();

        assert_eq!(first.into_action_error(), Some(failure.clone()));
        assert_eq!(second.into_action_error(), Some(failure));
        assert_eq!(calls.get(), 1);
        assert_eq!(db.commits.get(), 2); // Failure record committed, then replayed
        assert!(db.records.borrow().contains_key("k-1"));
    }

    #[test]
    fn test_infra_failure_is_not_cached() {
        let db = Rc::new(FakeDb::default());
        let wrapper = wrapper(&db);
        let calls = Rc::new(Cell::new(0));
        let outage = TestError::Infra("connection reset".to_string());

        let first = wrapper
            .execute(
                "k-1",
                TestInput::new("fp"),
                counted_action(&calls, Err(outage.clone())),
            )
            .unwrap_err();

        assert_eq!(first.into_action_error(), Some(outage));
        assert_eq!(db.rollbacks.get(), 1);
        assert!(db.records.borrow().is_empty());

        // A retry with the same key re-executes and can succeed.
        let retried = wrapper
            .execute("k-1", TestInput::new("fp"), counted_action(&calls, Ok(7)))
            .unwrap();

        assert_eq!(retried, 7);
        assert_eq!(calls.get(), 2);
    }

    #[test]
    fn test_unrecordable_success_rolls_back_everything() {
        let db = Rc::new(FakeDb::default());
        db.fail_save.set(true);
        let wrapper = wrapper(&db);
        let calls = Rc::new(Cell::new(0));

        let err = wrapper
            .execute("k-1", TestInput::new("fp"), counted_action(&calls, Ok(42)))
            .unwrap_err();

        assert!(matches!(err, IdempotencyError::SuccessRecord(_)));
        assert!(err.is_lost_guarantee());
        assert_eq!(db.rollbacks.get(), 1);
        assert_eq!(db.commits.get(), 0);
        assert!(db.records.borrow().is_empty()); // As if the action never ran
    }

    #[test]
    fn test_unrecordable_failure_carries_both_errors() {
        let db = Rc::new(FakeDb::default());
        db.fail_save.set(true);
        let wrapper = wrapper(&db);
        let calls = Rc::new(Cell::new(0));
        let failure = TestError::Business("insufficient funds".to_string());

        let err = wrapper
            .execute(
                "k-1",
                TestInput::new("fp"),
                counted_action(&calls, Err(failure.clone())),
            )
            .unwrap_err();

        match err {
            IdempotencyError::FailureRecord {
                source: SaveError::Store(_),
                action_error,
            } => assert_eq!(action_error, failure),
            other => panic!("expected FailureRecord, got {other:?}"),
        }
        assert_eq!(db.rollbacks.get(), 1);
        assert!(db.records.borrow().is_empty());
    }

    #[test]
    fn test_fingerprint_failure_is_terminal_before_the_transaction() {
        let db = Rc::new(FakeDb::default());
        let wrapper = wrapper(&db);
        let calls = Rc::new(Cell::new(0));
        let calls_in_action = Rc::clone(&calls);

        let err = wrapper
            .execute("k-1", UnhashableInput, move |_repos, _key, _input| {
                calls_in_action.set(calls_in_action.get() + 1);
                Ok(1)
            })
            .unwrap_err();

        assert!(matches!(err, IdempotencyError::Fingerprint(_)));
        assert_eq!(calls.get(), 0);
        assert_eq!(db.commits.get(), 0);
        assert_eq!(db.rollbacks.get(), 0); // Unit of work never entered
    }

    #[test]
    fn test_unserializable_success_output_rolls_back() {
        struct RejectingSerializer;

        impl Serializer<i64> for RejectingSerializer {
            fn marshal(&self, _value: &i64) -> Result<Vec<u8>, CodecError> {
                Err(CodecError::new("refused"))
            }

            fn unmarshal(&self, _bytes: &[u8]) -> Result<i64, CodecError> {
                Err(CodecError::new("refused"))
            }
        }

        let db = Rc::new(FakeDb::default());
        let wrapper: TestWrapper = Wrapper::new(Config {
            unit_of_work: FakeUnitOfWork { db: Rc::clone(&db) },
            success_serializer: Arc::new(RejectingSerializer),
            failure_serializer: Arc::new(JsonSerializer::<TestFailure>::new()),
            error_to_failure: Arc::new(|_err: &TestError| None),
            failure_to_error: Arc::new(|failure: TestFailure| TestError::Business(failure.reason)),
        });

        let err = wrapper
            .execute("k-1", TestInput::new("fp"), |_repos, _key, _input| Ok(42))
            .unwrap_err();

        assert!(matches!(
            err,
            IdempotencyError::SuccessRecord(SaveError::Marshal(_))
        ));
        assert_eq!(db.rollbacks.get(), 1);
        assert!(db.records.borrow().is_empty());
    }

    proptest! {
        /// Replaying any key/input pair returns the first call's output and
        /// never re-invokes the action.
        #[test]
        fn prop_replay_is_idempotent(
            key in "[a-z]{1,8}",
            digest in "[a-z0-9]{1,16}",
            output in any::<i64>(),
            replays in 1_usize..4,
        ) {
            let db = Rc::new(FakeDb::default());
            let wrapper = wrapper(&db);
            let calls = Rc::new(Cell::new(0));

            let first = wrapper
                .execute(&key, TestInput::new(&digest), counted_action(&calls, Ok(output)))
                .unwrap();
            prop_assert_eq!(first, output);

            for _ in 0..replays {
                let replayed = wrapper
                    .execute(
                        &key,
                        TestInput::new(&digest),
                        counted_action(&calls, Ok(output.wrapping_add(1))),
                    )
                    .unwrap();
                prop_assert_eq!(replayed, output);
            }
            prop_assert_eq!(calls.get(), 1);
        }
    }
}
