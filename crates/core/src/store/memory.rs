//! In-memory ledger store.
//!
//! Backs the processors in tests and local runs. Committed state sits behind
//! one `RwLock`; token and client locks are per-key async mutexes kept in
//! `DashMap` registries, so units touching different keys never contend.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use payhub_shared::types::{ClientId, MerchantId};
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};

use super::{LedgerStore, LedgerUnit, StoreError, StoreResult};
use crate::idempotency::IdempotencyRecord;
use crate::ledger::{Client, LedgerEntry, Merchant};

/// A failure to inject into store calls.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Fault {
    /// Calls behave normally.
    #[default]
    None,
    /// Every call fails with [`StoreError::Unavailable`].
    Unavailable,
    /// Every call sleeps for the given time before running.
    Stall(Duration),
    /// Calls to the named operation fail with [`StoreError::Backend`].
    FailOperation(&'static str),
}

#[derive(Debug, Default)]
struct MemoryState {
    clients: HashMap<ClientId, Client>,
    merchants: HashMap<MerchantId, Merchant>,
    entries: Vec<LedgerEntry>,
    idempotency: HashMap<String, IdempotencyRecord>,
}

type LockRegistry<K> = Arc<DashMap<K, Arc<Mutex<()>>>>;

/// [`LedgerStore`] kept entirely in memory.
///
/// Clones share the same data.
#[derive(Debug, Clone, Default)]
pub struct InMemoryLedgerStore {
    state: Arc<RwLock<MemoryState>>,
    key_locks: LockRegistry<String>,
    client_locks: LockRegistry<ClientId>,
    fault: Arc<RwLock<Fault>>,
}

impl InMemoryLedgerStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a client.
    pub async fn add_client(&self, client: Client) {
        self.state.write().await.clients.insert(client.id, client);
    }

    /// Registers a merchant.
    pub async fn add_merchant(&self, merchant: Merchant) {
        self.state.write().await.merchants.insert(merchant.id, merchant);
    }

    /// Writes an idempotency record directly, replacing any existing one.
    pub async fn put_idempotency_record(&self, record: IdempotencyRecord) {
        self.state
            .write()
            .await
            .idempotency
            .insert(record.key.clone(), record);
    }

    /// Returns every committed entry, in commit order.
    pub async fn entries(&self) -> Vec<LedgerEntry> {
        self.state.read().await.entries.clone()
    }

    /// Sets the failure injected into subsequent calls.
    pub async fn inject(&self, fault: Fault) {
        *self.fault.write().await = fault;
    }

    async fn check(&self, operation: &'static str) -> StoreResult<()> {
        check_fault(&self.fault, operation).await
    }
}

async fn check_fault(fault: &RwLock<Fault>, operation: &'static str) -> StoreResult<()> {
    let fault = fault.read().await.clone();
    match fault {
        Fault::None => Ok(()),
        Fault::Unavailable => Err(StoreError::Unavailable("connection refused".to_string())),
        Fault::Stall(delay) => {
            tokio::time::sleep(delay).await;
            Ok(())
        }
        Fault::FailOperation(name) if name == operation => {
            Err(StoreError::Backend(format!("{operation} failed")))
        }
        Fault::FailOperation(_) => Ok(()),
    }
}

#[async_trait]
impl LedgerStore for InMemoryLedgerStore {
    async fn find_client_by_api_key(&self, api_key: &str) -> StoreResult<Option<Client>> {
        self.check("find_client_by_api_key").await?;
        let state = self.state.read().await;
        Ok(state
            .clients
            .values()
            .find(|client| client.api_key == api_key)
            .cloned())
    }

    async fn find_merchant(&self, merchant_id: MerchantId) -> StoreResult<Option<Merchant>> {
        self.check("find_merchant").await?;
        Ok(self.state.read().await.merchants.get(&merchant_id).cloned())
    }

    async fn find_idempotency_record(&self, key: &str) -> StoreResult<Option<IdempotencyRecord>> {
        self.check("find_idempotency_record").await?;
        Ok(self.state.read().await.idempotency.get(key).cloned())
    }

    async fn client_entries(&self, client_id: ClientId) -> StoreResult<Vec<LedgerEntry>> {
        self.check("client_entries").await?;
        let state = self.state.read().await;
        Ok(state
            .entries
            .iter()
            .filter(|entry| entry.client_id == client_id)
            .cloned()
            .collect())
    }

    async fn begin(&self) -> StoreResult<Box<dyn LedgerUnit>> {
        self.check("begin").await?;
        Ok(Box::new(MemoryUnit {
            store: self.clone(),
            held: Vec::new(),
            entries: Vec::new(),
            records: Vec::new(),
        }))
    }
}

/// Buffered writes plus the locks taken so far.
///
/// The lock guards release when the unit is dropped.
struct MemoryUnit {
    store: InMemoryLedgerStore,
    held: Vec<OwnedMutexGuard<()>>,
    entries: Vec<LedgerEntry>,
    records: Vec<IdempotencyRecord>,
}

impl MemoryUnit {
    async fn check(&self, operation: &'static str) -> StoreResult<()> {
        check_fault(&self.store.fault, operation).await
    }
}

#[async_trait]
impl LedgerUnit for MemoryUnit {
    async fn lock_idempotency_key(&mut self, key: &str) -> StoreResult<()> {
        self.check("lock_idempotency_key").await?;
        let lock = self
            .store
            .key_locks
            .entry(key.to_string())
            .or_default()
            .clone();
        self.held.push(lock.lock_owned().await);
        Ok(())
    }

    async fn lock_client(&mut self, client_id: ClientId) -> StoreResult<bool> {
        self.check("lock_client").await?;
        if !self.store.state.read().await.clients.contains_key(&client_id) {
            return Ok(false);
        }
        let lock = self.store.client_locks.entry(client_id).or_default().clone();
        self.held.push(lock.lock_owned().await);
        Ok(true)
    }

    async fn find_idempotency_record(
        &mut self,
        key: &str,
    ) -> StoreResult<Option<IdempotencyRecord>> {
        self.check("find_idempotency_record").await?;
        if let Some(pending) = self.records.iter().find(|record| record.key == key) {
            return Ok(Some(pending.clone()));
        }
        Ok(self.store.state.read().await.idempotency.get(key).cloned())
    }

    async fn client_entries(&mut self, client_id: ClientId) -> StoreResult<Vec<LedgerEntry>> {
        self.check("client_entries").await?;
        let state = self.store.state.read().await;
        Ok(state
            .entries
            .iter()
            .chain(self.entries.iter())
            .filter(|entry| entry.client_id == client_id)
            .cloned()
            .collect())
    }

    async fn insert_entry(&mut self, entry: &LedgerEntry) -> StoreResult<()> {
        self.check("insert_entry").await?;
        self.entries.push(entry.clone());
        Ok(())
    }

    async fn insert_idempotency_record(&mut self, record: &IdempotencyRecord) -> StoreResult<()> {
        self.check("insert_idempotency_record").await?;
        let committed = self
            .store
            .state
            .read()
            .await
            .idempotency
            .contains_key(&record.key);
        if committed || self.records.iter().any(|r| r.key == record.key) {
            return Err(StoreError::Conflict(format!(
                "idempotency key '{}' already exists",
                record.key
            )));
        }
        self.records.push(record.clone());
        Ok(())
    }

    async fn commit(self: Box<Self>) -> StoreResult<()> {
        self.check("commit").await?;
        let MemoryUnit {
            store,
            held,
            entries,
            records,
        } = *self;
        {
            let mut state = store.state.write().await;
            if let Some(taken) = records
                .iter()
                .find(|record| state.idempotency.contains_key(&record.key))
            {
                return Err(StoreError::Conflict(format!(
                    "idempotency key '{}' already exists",
                    taken.key
                )));
            }
            state.entries.extend(entries);
            for record in records {
                state.idempotency.insert(record.key.clone(), record);
            }
        }
        drop(held);
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> StoreResult<()> {
        Ok(())
    }
}
