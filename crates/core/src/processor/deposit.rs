use std::sync::Arc;

use payhub_shared::LedgerConfig;
use payhub_shared::types::ClientId;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{EntryRequest, Pipeline};
use crate::ledger::{EntryKind, EntryRules, LedgerEntry, LedgerError};
use crate::store::LedgerStore;

/// Cash handed in by a client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DepositInput {
    /// Amount deposited. Positive and at most the configured ceiling.
    pub amount: Decimal,
    /// Client depositing.
    pub client_id: ClientId,
    /// Caller reference.
    pub reference: String,
    /// Idempotency token; empty to opt out.
    #[serde(default)]
    pub idempotency_key: String,
    /// Point of sale where the cash was deposited.
    #[serde(default)]
    pub store_name: Option<String>,
    /// Correspondent's id for the operation.
    #[serde(default)]
    pub external_id: Option<String>,
}

/// Records cash deposits.
#[derive(Clone)]
pub struct DepositProcessor {
    pipeline: Pipeline,
    rules: EntryRules,
}

impl DepositProcessor {
    /// Creates a processor writing to `store` with the configured ceiling.
    #[must_use]
    pub fn new(store: Arc<dyn LedgerStore>, config: &LedgerConfig) -> Self {
        Self {
            pipeline: Pipeline::new(store, config),
            rules: EntryRules::deposit(config.deposit_ceiling),
        }
    }

    /// Processes a deposit and returns the created (or replayed) entry.
    pub async fn process_deposit(&self, input: DepositInput) -> Result<LedgerEntry, LedgerError> {
        let request = EntryRequest {
            kind: EntryKind::Deposit,
            amount: input.amount,
            client_id: input.client_id,
            reference: input.reference,
            idempotency_key: input.idempotency_key,
            store_name: input.store_name,
            external_id: input.external_id,
        };
        self.pipeline.execute(request, self.rules).await
    }
}
