//! Ledger store port.
//!
//! The processors talk to persistence only through these traits. A
//! [`LedgerStore`] answers reads and opens [`LedgerUnit`]s; a unit is one
//! atomic batch of locks and writes that becomes visible on
//! [`LedgerUnit::commit`] and vanishes otherwise.
//!
//! Lock order inside a unit is always idempotency key first, client second.
//! Every caller follows it, so two units can never wait on each other.

mod memory;

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use payhub_shared::types::{ClientId, MerchantId};
use thiserror::Error;

use crate::idempotency::IdempotencyRecord;
use crate::ledger::{Client, LedgerEntry, LedgerError, Merchant};

pub use memory::{Fault, InMemoryLedgerStore};

/// Failure reported by a store implementation.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    /// The store could not be reached.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// A uniqueness constraint rejected a write.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Any other backend failure.
    #[error("backend error: {0}")]
    Backend(String),
}

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Read side of the store plus the entry point for atomic units.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Finds a client by credential, active or not.
    async fn find_client_by_api_key(&self, api_key: &str) -> StoreResult<Option<Client>>;

    /// Finds a merchant by id.
    async fn find_merchant(&self, merchant_id: MerchantId) -> StoreResult<Option<Merchant>>;

    /// Finds the committed record for an idempotency key.
    async fn find_idempotency_record(&self, key: &str) -> StoreResult<Option<IdempotencyRecord>>;

    /// Returns every committed entry of a client, oldest first.
    async fn client_entries(&self, client_id: ClientId) -> StoreResult<Vec<LedgerEntry>>;

    /// Opens a new unit of work.
    async fn begin(&self) -> StoreResult<Box<dyn LedgerUnit>>;
}

/// One atomic batch of locks and writes.
///
/// Dropping a unit without committing discards its writes and releases its
/// locks.
#[async_trait]
pub trait LedgerUnit: Send {
    /// Blocks until no other unit holds `key`, then holds it until the unit ends.
    async fn lock_idempotency_key(&mut self, key: &str) -> StoreResult<()>;

    /// Blocks until no other unit holds `client_id`, then holds it until the unit ends.
    ///
    /// Returns `false`, taking no lock, if the client does not exist.
    async fn lock_client(&mut self, client_id: ClientId) -> StoreResult<bool>;

    /// Finds the record for `key` as seen from inside this unit.
    async fn find_idempotency_record(&mut self, key: &str)
    -> StoreResult<Option<IdempotencyRecord>>;

    /// Returns the client's committed entries plus those written by this unit.
    async fn client_entries(&mut self, client_id: ClientId) -> StoreResult<Vec<LedgerEntry>>;

    /// Appends an entry.
    async fn insert_entry(&mut self, entry: &LedgerEntry) -> StoreResult<()>;

    /// Writes an idempotency record.
    ///
    /// Fails with [`StoreError::Conflict`] if the key is already recorded.
    async fn insert_idempotency_record(&mut self, record: &IdempotencyRecord) -> StoreResult<()>;

    /// Makes every write of this unit visible and releases its locks.
    async fn commit(self: Box<Self>) -> StoreResult<()>;

    /// Discards every write of this unit and releases its locks.
    async fn rollback(self: Box<Self>) -> StoreResult<()>;
}

/// Awaits a store call, giving up after `timeout`.
///
/// An expired deadline is reported as [`LedgerError::StorageUnavailable`];
/// store errors are converted as usual.
pub async fn bounded<T, F>(timeout: Duration, operation: &str, call: F) -> Result<T, LedgerError>
where
    F: Future<Output = StoreResult<T>>,
{
    match tokio::time::timeout(timeout, call).await {
        Ok(result) => result.map_err(LedgerError::from),
        Err(_) => {
            tracing::warn!(operation, ?timeout, "Store call timed out");
            Err(LedgerError::StorageUnavailable(format!(
                "{operation} timed out after {}ms",
                timeout.as_millis()
            )))
        }
    }
}
