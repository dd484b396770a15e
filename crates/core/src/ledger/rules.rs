//! Per-variant amount rules.
//!
//! Charges, deposits and cash-outs share the entry shape; what differs is the
//! set of checks their amount must pass before anything is written.

use rust_decimal::Decimal;

use super::error::LedgerError;

/// Rules applied to the amount of a new entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntryRules {
    /// Inclusive upper bound for a single entry, if any.
    pub ceiling: Option<Decimal>,
    /// Whether the client's balance must cover the amount.
    pub requires_funds: bool,
}

impl EntryRules {
    /// Rules for a charge against a merchant.
    #[must_use]
    pub const fn charge() -> Self {
        Self {
            ceiling: None,
            requires_funds: false,
        }
    }

    /// Rules for a cash deposit capped at `ceiling`.
    #[must_use]
    pub const fn deposit(ceiling: Decimal) -> Self {
        Self {
            ceiling: Some(ceiling),
            requires_funds: false,
        }
    }

    /// Rules for a cash withdrawal.
    #[must_use]
    pub const fn cash_out() -> Self {
        Self {
            ceiling: None,
            requires_funds: true,
        }
    }

    /// Checks the amount alone; the funds check needs the balance and is
    /// done by [`EntryRules::check_funds`].
    pub fn validate_amount(&self, amount: Decimal) -> Result<(), LedgerError> {
        if amount <= Decimal::ZERO {
            return Err(LedgerError::NonPositiveAmount(amount));
        }
        if let Some(ceiling) = self.ceiling
            && amount > ceiling
        {
            return Err(LedgerError::DepositCeilingExceeded { amount, ceiling });
        }
        Ok(())
    }

    /// Returns `true` if `amount` may be taken from `available`.
    #[must_use]
    pub fn check_funds(&self, amount: Decimal, available: Decimal) -> bool {
        !self.requires_funds || amount <= available
    }
}
