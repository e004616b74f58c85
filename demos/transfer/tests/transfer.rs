//! End-to-end idempotency guarantees over the transfer domain.

#![allow(clippy::unwrap_used, clippy::panic)]

use std::sync::Arc;

use idempotent_rust_core::error::IdempotencyError;
use idempotent_rust_memory::MemoryDatabase;
use idempotent_rust_testing::init_test_tracing;
use transfer::{Account, TransferError, TransferInput, TransferService};
use uuid::Uuid;

fn service() -> TransferService {
    init_test_tracing();
    let service = TransferService::new(MemoryDatabase::new());
    for id in ["A", "B"] {
        service
            .open_account(Account {
                id: id.to_string(),
                balance: 1000,
            })
            .unwrap();
    }
    service
}

fn input(from: &str, to: &str, amount: i64) -> TransferInput {
    TransferInput {
        from_account: from.to_string(),
        to_account: to.to_string(),
        amount,
    }
}

#[test]
fn test_transfer_succeeds_and_moves_funds() {
    let service = service();

    let receipt = service.transfer("t-1", input("A", "B", 500)).unwrap();

    assert_ne!(receipt.transaction_id, Uuid::nil());
    assert_eq!(service.balance("A").unwrap(), 500);
    assert_eq!(service.balance("B").unwrap(), 1500);
}

#[test]
fn test_replay_returns_same_receipt_without_reapplying() {
    let service = service();

    let first = service.transfer("t-1", input("A", "B", 500)).unwrap();
    let second = service.transfer("t-1", input("A", "B", 500)).unwrap();

    // A fresh execution would mint a fresh transaction id.
    assert_eq!(second.transaction_id, first.transaction_id);
    assert_eq!(service.balance("A").unwrap(), 500);
    assert_eq!(service.balance("B").unwrap(), 1500);
}

#[test]
fn test_insufficient_funds_is_recorded_and_replayed() {
    let service = service();
    service.transfer("t-1", input("A", "B", 500)).unwrap();

    // A now holds 500; a 1000 transfer must fail and leave balances alone.
    let first = service.transfer("t-2", input("A", "B", 1000)).unwrap_err();
    let replay = service.transfer("t-2", input("A", "B", 1000)).unwrap_err();

    for err in [first, replay] {
        match err {
            IdempotencyError::Action(action_err) => {
                assert_eq!(action_err, TransferError::InsufficientFunds);
            }
            other => panic!("expected the transfer's own error, got {other:?}"),
        }
    }
    assert_eq!(service.balance("A").unwrap(), 500);
    assert_eq!(service.balance("B").unwrap(), 1500);
}

#[test]
fn test_funds_move_back_under_a_new_key() {
    let service = service();
    service.transfer("t-1", input("A", "B", 500)).unwrap();

    service.transfer("t-3", input("B", "A", 500)).unwrap();

    assert_eq!(service.balance("A").unwrap(), 1000);
    assert_eq!(service.balance("B").unwrap(), 1000);
}

#[test]
fn test_key_reuse_with_different_input_is_rejected() {
    let service = service();
    service.transfer("t-1", input("A", "B", 500)).unwrap();

    let err = service.transfer("t-1", input("A", "B", 501)).unwrap_err();

    assert!(matches!(err, IdempotencyError::FingerprintMismatch));
    assert_eq!(service.balance("A").unwrap(), 500); // Untouched
}

#[test]
fn test_unknown_account_failure_is_not_cached() {
    let service = service();

    let err = service.transfer("t-9", input("A", "C", 100)).unwrap_err();
    match err {
        IdempotencyError::Action(TransferError::UnknownAccount(id)) => assert_eq!(id, "C"),
        other => panic!("expected unknown account, got {other:?}"),
    }

    // Fix the precondition and retry the same key: the action re-executes.
    service
        .open_account(Account {
            id: "C".to_string(),
            balance: 0,
        })
        .unwrap();
    service.transfer("t-9", input("A", "C", 100)).unwrap();

    assert_eq!(service.balance("A").unwrap(), 900);
    assert_eq!(service.balance("C").unwrap(), 100);
}

#[test]
fn test_concurrent_same_key_transfers_apply_once() {
    let service = Arc::new(service());

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let service = Arc::clone(&service);
            std::thread::spawn(move || service.transfer("t-1", input("A", "B", 500)))
        })
        .collect();
    let receipts: Vec<_> = handles
        .into_iter()
        .map(|handle| handle.join().unwrap().unwrap())
        .collect();

    // Exactly one execution happened: every caller saw the same receipt
    // and the balances moved once.
    for receipt in &receipts {
        assert_eq!(receipt.transaction_id, receipts[0].transaction_id);
    }
    assert_eq!(service.balance("A").unwrap(), 500);
    assert_eq!(service.balance("B").unwrap(), 1500);
}
