//! Client balance derived from ledger history.
//!
//! There is no stored running balance. Every query re-aggregates the client's
//! completed entries:
//!
//! `available = deposits - charges - cash_outs`

use std::sync::Arc;
use std::time::Duration;

use payhub_shared::types::ClientId;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::entry::{EntryKind, LedgerEntry};
use super::error::LedgerError;
use crate::store::{LedgerStore, bounded};

/// Breakdown of a client's completed ledger entries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientBalance {
    /// The client.
    pub client_id: ClientId,
    /// Sum of completed deposits.
    pub deposits: Decimal,
    /// Sum of completed charges.
    pub charges: Decimal,
    /// Sum of completed cash-outs.
    pub cash_outs: Decimal,
    /// Net balance. Not clamped.
    pub available: Decimal,
}

impl ClientBalance {
    /// Creates an empty balance.
    #[must_use]
    pub const fn new(client_id: ClientId) -> Self {
        Self {
            client_id,
            deposits: Decimal::ZERO,
            charges: Decimal::ZERO,
            cash_outs: Decimal::ZERO,
            available: Decimal::ZERO,
        }
    }

    /// Aggregates the entries belonging to `client_id`.
    ///
    /// Entries of other clients and entries not `COMPLETED` are ignored.
    /// Fails with [`LedgerError::BalanceOverflow`] if a total leaves the
    /// range of [`Decimal`].
    pub fn from_entries(
        client_id: ClientId,
        entries: &[LedgerEntry],
    ) -> Result<Self, LedgerError> {
        let mut balance = Self::new(client_id);
        for entry in entries {
            if entry.client_id == client_id {
                balance.apply(entry)?;
            }
        }
        Ok(balance)
    }

    /// Adds one entry if it is completed.
    ///
    /// On overflow the balance is left unchanged.
    pub fn apply(&mut self, entry: &LedgerEntry) -> Result<(), LedgerError> {
        if !entry.is_completed() {
            return Ok(());
        }
        let client_id = self.client_id;
        let overflow = || LedgerError::BalanceOverflow(client_id);

        let total = match entry.kind {
            EntryKind::Deposit => &mut self.deposits,
            EntryKind::Charge { .. } => &mut self.charges,
            EntryKind::CashOut => &mut self.cash_outs,
        };
        let next_total = total.checked_add(entry.amount).ok_or_else(overflow)?;
        let next_available = self
            .available
            .checked_add(entry.signed_amount())
            .ok_or_else(overflow)?;

        *total = next_total;
        self.available = next_available;
        Ok(())
    }
}

/// Computes client balances from the ledger store.
#[derive(Clone)]
pub struct BalanceLedger {
    store: Arc<dyn LedgerStore>,
    timeout: Duration,
}

impl BalanceLedger {
    /// Creates a balance ledger reading from `store`.
    #[must_use]
    pub fn new(store: Arc<dyn LedgerStore>, timeout: Duration) -> Self {
        Self { store, timeout }
    }

    /// Returns the client's current available balance.
    pub async fn balance(&self, client_id: ClientId) -> Result<Decimal, LedgerError> {
        Ok(self.summary(client_id).await?.available)
    }

    /// Returns the full breakdown of the client's balance.
    pub async fn summary(&self, client_id: ClientId) -> Result<ClientBalance, LedgerError> {
        let entries = bounded(
            self.timeout,
            "client_entries",
            self.store.client_entries(client_id),
        )
        .await?;
        ClientBalance::from_entries(client_id, &entries)
    }
}
