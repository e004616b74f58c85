//! Runs the transfer scenario end to end and prints each outcome.

use idempotent_rust_memory::MemoryDatabase;
use transfer::{Account, TransferError, TransferInput, TransferService};

fn main() -> Result<(), TransferError> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .compact()
        .init();

    let service = TransferService::new(MemoryDatabase::new());
    service.open_account(Account {
        id: "A".to_string(),
        balance: 1000,
    })?;
    service.open_account(Account {
        id: "B".to_string(),
        balance: 1000,
    })?;

    let input = TransferInput {
        from_account: "A".to_string(),
        to_account: "B".to_string(),
        amount: 500,
    };
    run("first execution of t-1", &service, "t-1", input.clone());
    run("replay of t-1 (cached receipt)", &service, "t-1", input);

    let overdraft = TransferInput {
        from_account: "A".to_string(),
        to_account: "B".to_string(),
        amount: 1000,
    };
    run(
        "first execution of t-2 (overdraft)",
        &service,
        "t-2",
        overdraft.clone(),
    );
    run("replay of t-2 (cached failure)", &service, "t-2", overdraft);

    println!(
        "final balances: A={} B={}",
        service.balance("A")?,
        service.balance("B")?
    );
    Ok(())
}

fn run(label: &str, service: &TransferService, key: &str, input: TransferInput) {
    match service.transfer(key, input) {
        Ok(receipt) => println!("{label}: transaction {}", receipt.transaction_id),
        Err(err) => println!("{label}: {err}"),
    }
}
