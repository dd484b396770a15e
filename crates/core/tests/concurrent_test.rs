//! Concurrent access tests against the in-memory ledger store.
//!
//! These tests verify that:
//! - Concurrent cash-outs for one client never overdraw it
//! - Concurrent requests sharing an idempotency token create one entry
//! - Different clients do not block each other

#![allow(clippy::uninlined_format_args)]

use std::sync::Arc;

use futures::future::join_all;
use payhub_core::ledger::{Client, Merchant};
use payhub_core::{
    BalanceLedger, CashOutInput, CashOutProcessor, DepositInput, DepositProcessor,
    InMemoryLedgerStore, LedgerError, LedgerStore, PaymentInput, PaymentProcessor,
};
use payhub_shared::LedgerConfig;
use payhub_shared::types::ClientId;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tokio::sync::Barrier;

async fn seeded_client(store: &InMemoryLedgerStore, name: &str) -> ClientId {
    let client = Client::new(name, format!("key-{name}"));
    let id = client.id;
    store.add_client(client).await;
    id
}

async fn fund(store: Arc<dyn LedgerStore>, client_id: ClientId, amount: Decimal) {
    DepositProcessor::new(store, &LedgerConfig::default())
        .process_deposit(DepositInput {
            amount,
            client_id,
            reference: "INITIAL".into(),
            idempotency_key: String::new(),
            store_name: None,
            external_id: None,
        })
        .await
        .unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_cash_outs_never_overdraw() {
    const NUM_REQUESTS: usize = 20;

    let memory = InMemoryLedgerStore::new();
    let client_id = seeded_client(&memory, "centro").await;
    let store: Arc<dyn LedgerStore> = Arc::new(memory.clone());
    fund(store.clone(), client_id, dec!(1000)).await;

    let processor = CashOutProcessor::new(store.clone(), &LedgerConfig::default());
    let barrier = Arc::new(Barrier::new(NUM_REQUESTS));

    let mut handles = Vec::with_capacity(NUM_REQUESTS);
    for i in 0..NUM_REQUESTS {
        let processor = processor.clone();
        let barrier = barrier.clone();
        handles.push(tokio::spawn(async move {
            barrier.wait().await;
            processor
                .process_cash_out(CashOutInput {
                    amount: dec!(150),
                    client_id,
                    reference: format!("ATM-{i}"),
                    idempotency_key: String::new(),
                    store_name: None,
                    external_id: None,
                })
                .await
        }));
    }

    let results: Vec<_> = join_all(handles)
        .await
        .into_iter()
        .map(|joined| joined.unwrap())
        .collect();

    let succeeded = results.iter().filter(|r| r.is_ok()).count();
    let rejected = results
        .iter()
        .filter(|r| matches!(r, Err(LedgerError::InsufficientFunds { .. })))
        .count();

    // floor(1000 / 150) = 6
    assert_eq!(succeeded, 6, "results: {:?}", results);
    assert_eq!(rejected, NUM_REQUESTS - 6);

    let balance = BalanceLedger::new(store, LedgerConfig::default().store_timeout())
        .balance(client_id)
        .await
        .unwrap();
    assert_eq!(balance, dec!(100));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_same_token_concurrently_creates_one_entry() {
    const NUM_REQUESTS: usize = 10;

    let memory = InMemoryLedgerStore::new();
    let client_id = seeded_client(&memory, "norte").await;
    let merchant = Merchant::new("Telmex", "TELEPHONE");
    let merchant_id = merchant.id;
    memory.add_merchant(merchant).await;
    let store: Arc<dyn LedgerStore> = Arc::new(memory.clone());

    let processor = PaymentProcessor::new(store, &LedgerConfig::default());
    let barrier = Arc::new(Barrier::new(NUM_REQUESTS));

    let handles: Vec<_> = (0..NUM_REQUESTS)
        .map(|i| {
            let processor = processor.clone();
            let barrier = barrier.clone();
            tokio::spawn(async move {
                barrier.wait().await;
                processor
                    .process_payment(PaymentInput {
                        // Retries may carry a different body; the first one wins.
                        amount: Decimal::from(100 + i),
                        merchant_id,
                        client_id,
                        reference: "LINE-5551234".into(),
                        idempotency_key: "pay-telmex-0001".into(),
                    })
                    .await
                    .unwrap()
            })
        })
        .collect();

    let entries: Vec<_> = join_all(handles)
        .await
        .into_iter()
        .map(|joined| joined.unwrap())
        .collect();

    let first = serde_json::to_string(&entries[0]).unwrap();
    for entry in &entries {
        assert_eq!(serde_json::to_string(entry).unwrap(), first);
    }
    assert_eq!(memory.entries().await.len(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_clients_are_serialized_independently() {
    const NUM_CLIENTS: usize = 8;
    const DEPOSITS_PER_CLIENT: usize = 25;

    let memory = InMemoryLedgerStore::new();
    let mut clients = Vec::with_capacity(NUM_CLIENTS);
    for i in 0..NUM_CLIENTS {
        clients.push(seeded_client(&memory, &format!("client-{i}")).await);
    }
    let store: Arc<dyn LedgerStore> = Arc::new(memory.clone());
    let processor = DepositProcessor::new(store.clone(), &LedgerConfig::default());
    let barrier = Arc::new(Barrier::new(NUM_CLIENTS * DEPOSITS_PER_CLIENT));

    let mut handles = Vec::new();
    for client_id in &clients {
        for n in 0..DEPOSITS_PER_CLIENT {
            let processor = processor.clone();
            let barrier = barrier.clone();
            let client_id = *client_id;
            handles.push(tokio::spawn(async move {
                barrier.wait().await;
                processor
                    .process_deposit(DepositInput {
                        amount: dec!(10.10),
                        client_id,
                        reference: format!("DEP-{n}"),
                        idempotency_key: format!("{client_id}-{n}"),
                        store_name: None,
                        external_id: None,
                    })
                    .await
            }));
        }
    }

    for joined in join_all(handles).await {
        joined.unwrap().unwrap();
    }

    let balances = BalanceLedger::new(store, LedgerConfig::default().store_timeout());
    for client_id in clients {
        assert_eq!(balances.balance(client_id).await.unwrap(), dec!(252.50));
    }
    assert_eq!(memory.entries().await.len(), NUM_CLIENTS * DEPOSITS_PER_CLIENT);
}
