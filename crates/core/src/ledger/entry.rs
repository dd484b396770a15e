//! Ledger entry domain types.

use chrono::{DateTime, SubsecRound, Utc};
use payhub_shared::types::{ClientId, Currency, EntryId, MerchantId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// The money movement an entry records.
///
/// All variants share the same record shape; only a charge references a merchant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EntryKind {
    /// Payment of a service against a merchant. Debits the client.
    Charge {
        /// Merchant being paid.
        merchant_id: MerchantId,
    },
    /// Cash deposited by the client. Credits the client.
    Deposit,
    /// Cash withdrawn by the client. Debits the client.
    CashOut,
}

impl EntryKind {
    /// Short name used in logs and persisted rows.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Charge { .. } => "charge",
            Self::Deposit => "deposit",
            Self::CashOut => "cash_out",
        }
    }

    /// Returns the merchant for charges.
    #[must_use]
    pub const fn merchant_id(&self) -> Option<MerchantId> {
        match self {
            Self::Charge { merchant_id } => Some(*merchant_id),
            Self::Deposit | Self::CashOut => None,
        }
    }

    /// Returns true if the entry increases the client's balance.
    #[must_use]
    pub const fn is_credit(&self) -> bool {
        matches!(self, Self::Deposit)
    }
}

impl std::fmt::Display for EntryKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Settlement status of an entry.
///
/// Processing settles synchronously, so new entries are always `Completed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntryStatus {
    /// Awaiting settlement.
    Pending,
    /// Settled; counts towards the balance.
    Completed,
    /// Settlement failed.
    Failed,
}

impl EntryStatus {
    /// Returns the persisted representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Completed => "COMPLETED",
            Self::Failed => "FAILED",
        }
    }
}

impl std::str::FromStr for EntryStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(Self::Pending),
            "COMPLETED" => Ok(Self::Completed),
            "FAILED" => Ok(Self::Failed),
            _ => Err(format!("Unknown entry status: {s}")),
        }
    }
}

/// An immutable record of one money movement for a client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    /// Unique identifier, generated by [`LedgerEntry::create`].
    pub id: EntryId,
    /// What kind of movement this is.
    pub kind: EntryKind,
    /// Amount moved. Always positive.
    pub amount: Decimal,
    /// Currency of `amount`.
    pub currency: Currency,
    /// Settlement status.
    pub status: EntryStatus,
    /// Caller-supplied reference (receipt number, store ticket, ...).
    pub reference: String,
    /// Client owning the entry.
    pub client_id: ClientId,
    /// When the entry was created.
    pub created_at: DateTime<Utc>,
    /// Idempotency key of the request that produced it; empty if none.
    pub idempotency_key: String,
    /// Name of the point of sale that handled the cash, if reported.
    pub store_name: Option<String>,
    /// Identifier the correspondent assigned to the operation, if reported.
    pub external_id: Option<String>,
}

/// Everything a processor decides before an entry exists.
#[derive(Debug, Clone)]
pub struct NewEntry {
    /// Kind of movement.
    pub kind: EntryKind,
    /// Validated, positive amount.
    pub amount: Decimal,
    /// Currency.
    pub currency: Currency,
    /// Owning client.
    pub client_id: ClientId,
    /// Caller reference.
    pub reference: String,
    /// Idempotency key, empty if the request carried none.
    pub idempotency_key: String,
    /// Point of sale, for cash movements.
    pub store_name: Option<String>,
    /// Correspondent's operation id, for cash movements.
    pub external_id: Option<String>,
}

impl LedgerEntry {
    /// Builds a completed entry with a fresh identifier and timestamp.
    ///
    /// The timestamp is truncated to microseconds, the resolution the
    /// database keeps, so a replayed response matches the stored row.
    #[must_use]
    pub fn create(new: NewEntry) -> Self {
        Self {
            id: EntryId::new(),
            kind: new.kind,
            amount: new.amount,
            currency: new.currency,
            status: EntryStatus::Completed,
            reference: new.reference,
            client_id: new.client_id,
            created_at: Utc::now().trunc_subsecs(6),
            idempotency_key: new.idempotency_key,
            store_name: new.store_name,
            external_id: new.external_id,
        }
    }

    /// Returns true if the entry contributes to the balance.
    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.status == EntryStatus::Completed
    }

    /// Returns the amount signed from the client's perspective.
    #[must_use]
    pub fn signed_amount(&self) -> Decimal {
        if self.kind.is_credit() {
            self.amount
        } else {
            -self.amount
        }
    }
}
