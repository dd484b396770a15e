//! Transaction processors.
//!
//! Payments, deposits and cash-outs run through one pipeline and differ only
//! in their [`EntryRules`] and whether a merchant is involved:
//!
//! 1. replay a recorded response for the idempotency token, if any
//! 2. validate the amount
//! 3. payments: the merchant must exist
//! 4. open a unit, lock the token and re-check it, lock the client
//! 5. cash-outs: the balance seen under the client lock must cover the amount
//! 6. the balance after the entry must still be representable
//! 7. create the entry, record the token, commit both together

mod cash_out;
mod deposit;
mod payment;


use std::sync::Arc;
use std::time::Duration;

use payhub_shared::LedgerConfig;
use payhub_shared::types::{ClientId, Currency};
use rust_decimal::Decimal;
use tracing::{info, warn};

use crate::idempotency::{CREATED, IdempotencyGuard};
use crate::ledger::{ClientBalance, EntryKind, EntryRules, LedgerEntry, LedgerError, NewEntry};
use crate::store::{LedgerStore, bounded};

pub use cash_out::{CashOutInput, CashOutProcessor};
pub use deposit::{DepositInput, DepositProcessor};
pub use payment::{PaymentInput, PaymentProcessor};

/// A processing request after variant-specific decoding.
#[derive(Debug, Clone)]
struct EntryRequest {
    kind: EntryKind,
    amount: Decimal,
    client_id: ClientId,
    reference: String,
    idempotency_key: String,
    store_name: Option<String>,
    external_id: Option<String>,
}

/// Shared state of every processor. Holds no data between calls.
#[derive(Clone)]
struct Pipeline {
    store: Arc<dyn LedgerStore>,
    guard: IdempotencyGuard,
    currency: Currency,
    timeout: Duration,
}

impl Pipeline {
    fn new(store: Arc<dyn LedgerStore>, config: &LedgerConfig) -> Self {
        let timeout = config.store_timeout();
        Self {
            store,
            guard: IdempotencyGuard::new(timeout),
            currency: config.currency,
            timeout,
        }
    }

    async fn execute(
        &self,
        request: EntryRequest,
        rules: EntryRules,
    ) -> Result<LedgerEntry, LedgerError> {
        let key = request.idempotency_key.as_str();

        if let Some(recorded) = self.guard.lookup::<LedgerEntry>(self.store.as_ref(), key).await? {
            return Ok(recorded);
        }

        rules.validate_amount(request.amount).inspect_err(|e| {
            warn!(
                kind = %request.kind,
                client_id = %request.client_id,
                amount = %request.amount,
                error = %e,
                "Entry rejected"
            );
        })?;

        if let Some(merchant_id) = request.kind.merchant_id() {
            let merchant = bounded(
                self.timeout,
                "find_merchant",
                self.store.find_merchant(merchant_id),
            )
            .await?;
            if merchant.is_none() {
                warn!(merchant_id = %merchant_id, client_id = %request.client_id, "Merchant not found");
                return Err(LedgerError::MerchantNotFound(merchant_id));
            }
        }

        let mut unit = bounded(self.timeout, "begin", self.store.begin()).await?;

        let replay = self.guard.reserve::<LedgerEntry>(unit.as_mut(), key).await?;
        if let Some(recorded) = replay {
            if let Err(e) = bounded(self.timeout, "rollback", unit.rollback()).await {
                warn!(idempotency_key = key, error = %e, "Rollback after replay failed");
            }
            return Ok(recorded);
        }

        let client_exists = bounded(
            self.timeout,
            "lock_client",
            unit.lock_client(request.client_id),
        )
        .await?;
        if !client_exists {
            warn!(client_id = %request.client_id, "Client not found");
            return Err(LedgerError::ClientNotFound(request.client_id));
        }

        let entries = bounded(
            self.timeout,
            "client_entries",
            unit.client_entries(request.client_id),
        )
        .await?;
        let mut balance = ClientBalance::from_entries(request.client_id, &entries)?;

        if rules.requires_funds && !rules.check_funds(request.amount, balance.available) {
            warn!(
                client_id = %request.client_id,
                available = %balance.available,
                requested = %request.amount,
                "Insufficient funds"
            );
            return Err(LedgerError::InsufficientFunds {
                client_id: request.client_id,
                available: balance.available,
                requested: request.amount,
            });
        }

        let entry = LedgerEntry::create(NewEntry {
            kind: request.kind,
            amount: request.amount,
            currency: self.currency,
            client_id: request.client_id,
            reference: request.reference,
            idempotency_key: request.idempotency_key.clone(),
            store_name: request.store_name,
            external_id: request.external_id,
        });

        if balance.apply(&entry).is_err() {
            warn!(
                client_id = %request.client_id,
                amount = %request.amount,
                "Entry would overflow the balance"
            );
            return Err(LedgerError::AmountOutOfRange {
                client_id: request.client_id,
                amount: request.amount,
            });
        }

        bounded(self.timeout, "insert_entry", unit.insert_entry(&entry)).await?;
        self.guard.record(unit.as_mut(), key, &entry, CREATED).await?;
        bounded(self.timeout, "commit", unit.commit()).await?;

        info!(
            entry_id = %entry.id,
            kind = %entry.kind,
            client_id = %entry.client_id,
            amount = %entry.amount,
            "Ledger entry created"
        );
        Ok(entry)
    }
}
