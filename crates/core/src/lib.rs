//! Core transaction processing for PayHub.
//!
//! This crate contains the ledger rules with ZERO web or database dependencies.
//! Persistence is reached only through the [`store`] port.
//!
//! # Modules
//!
//! - `ledger` - Entries, clients, merchants, amount rules and balances
//! - `idempotency` - Idempotency tokens and recorded responses
//! - `processor` - Payment, deposit and cash-out processors
//! - `store` - Ledger store port and the in-memory implementation
//! - `auth` - Client credential resolution

pub mod auth;
pub mod idempotency;
pub mod ledger;
pub mod processor;
pub mod store;

pub use auth::authenticate_client;
pub use idempotency::{IdempotencyGuard, IdempotencyRecord};
pub use ledger::{BalanceLedger, ClientBalance, LedgerEntry, LedgerError};
pub use processor::{
    CashOutInput, CashOutProcessor, DepositInput, DepositProcessor, PaymentInput, PaymentProcessor,
};
pub use store::{InMemoryLedgerStore, LedgerStore, LedgerUnit, StoreError};
