use std::sync::Arc;

use payhub_shared::LedgerConfig;
use payhub_shared::types::ClientId;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{EntryRequest, Pipeline};
use crate::ledger::{EntryKind, EntryRules, LedgerEntry, LedgerError};
use crate::store::LedgerStore;

/// Cash withdrawn by a client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CashOutInput {
    /// Amount withdrawn. Positive and covered by the balance.
    pub amount: Decimal,
    /// Client withdrawing.
    pub client_id: ClientId,
    /// Caller reference.
    pub reference: String,
    /// Idempotency token; empty to opt out.
    #[serde(default)]
    pub idempotency_key: String,
    /// Point of sale where the cash was withdrawn.
    #[serde(default)]
    pub store_name: Option<String>,
    /// Correspondent's id for the operation.
    #[serde(default)]
    pub external_id: Option<String>,
}

/// Records cash withdrawals.
///
/// The balance check and the insert happen under the client lock, so
/// concurrent withdrawals for one client never overdraw it.
#[derive(Clone)]
pub struct CashOutProcessor {
    pipeline: Pipeline,
}

impl CashOutProcessor {
    /// Creates a processor writing to `store`.
    #[must_use]
    pub fn new(store: Arc<dyn LedgerStore>, config: &LedgerConfig) -> Self {
        Self {
            pipeline: Pipeline::new(store, config),
        }
    }

    /// Processes a withdrawal and returns the created (or replayed) entry.
    pub async fn process_cash_out(&self, input: CashOutInput) -> Result<LedgerEntry, LedgerError> {
        let request = EntryRequest {
            kind: EntryKind::CashOut,
            amount: input.amount,
            client_id: input.client_id,
            reference: input.reference,
            idempotency_key: input.idempotency_key,
            store_name: input.store_name,
            external_id: input.external_id,
        };
        self.pipeline.execute(request, EntryRules::cash_out()).await
    }
}
