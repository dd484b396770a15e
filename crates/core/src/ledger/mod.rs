//! Ledger domain.
//!
//! - Ledger entries (charges, deposits, cash-outs)
//! - Clients and merchants
//! - Per-variant amount rules
//! - Balance derivation
//! - Error types for ledger operations

pub mod balance;
pub mod entry;
pub mod error;
pub mod party;
pub mod rules;

#[cfg(test)]
mod balance_props;

pub use balance::{BalanceLedger, ClientBalance};
pub use entry::{EntryKind, EntryStatus, LedgerEntry, NewEntry};
pub use error::{ErrorCategory, LedgerError};
pub use party::{Client, Merchant};
pub use rules::EntryRules;
