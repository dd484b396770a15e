use std::time::Duration;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, error};

use super::record::IdempotencyRecord;
use crate::ledger::LedgerError;
use crate::store::{LedgerStore, LedgerUnit, StoreError, bounded};

/// Resolves idempotency tokens to recorded responses.
///
/// An empty token means the request did not opt in: lookups miss and
/// recording is a no-op.
#[derive(Debug, Clone, Copy)]
pub struct IdempotencyGuard {
    timeout: Duration,
}

impl IdempotencyGuard {
    /// Creates a guard whose store calls give up after `timeout`.
    #[must_use]
    pub const fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    /// Returns the recorded response for `key`, if any.
    ///
    /// Storage failures are errors, never a miss.
    pub async fn lookup<T: DeserializeOwned>(
        &self,
        store: &dyn LedgerStore,
        key: &str,
    ) -> Result<Option<T>, LedgerError> {
        if key.is_empty() {
            return Ok(None);
        }
        let record = bounded(
            self.timeout,
            "find_idempotency_record",
            store.find_idempotency_record(key),
        )
        .await?;
        Self::replay(key, record)
    }

    /// Takes the token lock inside `unit`, then looks again.
    ///
    /// A hit here means a concurrent request with the same token committed
    /// while this one was waiting; its response is returned and the caller
    /// must not write anything.
    pub async fn reserve<T: DeserializeOwned>(
        &self,
        unit: &mut dyn LedgerUnit,
        key: &str,
    ) -> Result<Option<T>, LedgerError> {
        if key.is_empty() {
            return Ok(None);
        }
        bounded(self.timeout, "lock_idempotency_key", unit.lock_idempotency_key(key)).await?;
        let record = bounded(
            self.timeout,
            "find_idempotency_record",
            unit.find_idempotency_record(key),
        )
        .await?;
        Self::replay(key, record)
    }

    /// Writes the response for `key` inside `unit`.
    ///
    /// Tokens are write-once: an existing record is reported as
    /// [`LedgerError::IdempotencyConflict`] and left untouched.
    pub async fn record<T: Serialize>(
        &self,
        unit: &mut dyn LedgerUnit,
        key: &str,
        response: &T,
        status_code: u16,
    ) -> Result<(), LedgerError> {
        if key.is_empty() {
            return Ok(());
        }
        let record = IdempotencyRecord::capture(key, response, status_code)?;
        let result = tokio::time::timeout(self.timeout, unit.insert_idempotency_record(&record)).await;
        match result {
            Ok(Ok(())) => Ok(()),
            Ok(Err(StoreError::Conflict(msg))) => {
                error!(idempotency_key = key, %msg, "Idempotency key already recorded");
                Err(LedgerError::IdempotencyConflict(key.to_string()))
            }
            Ok(Err(e)) => Err(e.into()),
            Err(_) => Err(LedgerError::StorageUnavailable(format!(
                "insert_idempotency_record timed out after {}ms",
                self.timeout.as_millis()
            ))),
        }
    }

    fn replay<T: DeserializeOwned>(
        key: &str,
        record: Option<IdempotencyRecord>,
    ) -> Result<Option<T>, LedgerError> {
        let Some(record) = record else {
            return Ok(None);
        };
        match record.decode() {
            Ok(response) => {
                debug!(idempotency_key = key, "Replaying recorded response");
                Ok(Some(response))
            }
            Err(e) => {
                error!(idempotency_key = key, error = %e, "Recorded response is unreadable");
                Err(e)
            }
        }
    }
}
