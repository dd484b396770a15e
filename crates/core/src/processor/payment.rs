use std::sync::Arc;

use payhub_shared::LedgerConfig;
use payhub_shared::types::{ClientId, MerchantId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{EntryRequest, Pipeline};
use crate::ledger::{EntryKind, EntryRules, LedgerEntry, LedgerError};
use crate::store::LedgerStore;

/// Payment of a service to a merchant on behalf of a client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentInput {
    /// Amount to charge. Must be positive.
    pub amount: Decimal,
    /// Merchant being paid. Must exist.
    pub merchant_id: MerchantId,
    /// Client paying.
    pub client_id: ClientId,
    /// Caller reference, e.g. the service account number.
    pub reference: String,
    /// Idempotency token; empty to opt out.
    #[serde(default)]
    pub idempotency_key: String,
}

/// Records charges against merchants.
///
/// Charges do not check the client's balance.
#[derive(Clone)]
pub struct PaymentProcessor {
    pipeline: Pipeline,
}

impl PaymentProcessor {
    /// Creates a processor writing to `store`.
    #[must_use]
    pub fn new(store: Arc<dyn LedgerStore>, config: &LedgerConfig) -> Self {
        Self {
            pipeline: Pipeline::new(store, config),
        }
    }

    /// Processes a payment and returns the created (or replayed) charge.
    pub async fn process_payment(&self, input: PaymentInput) -> Result<LedgerEntry, LedgerError> {
        let request = EntryRequest {
            kind: EntryKind::Charge {
                merchant_id: input.merchant_id,
            },
            amount: input.amount,
            client_id: input.client_id,
            reference: input.reference,
            idempotency_key: input.idempotency_key,
            store_name: None,
            external_id: None,
        };
        self.pipeline.execute(request, EntryRules::charge()).await
    }
}
