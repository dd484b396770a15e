//! Repository implementations.
//!
//! Repositories hide the `SeaORM` details behind the store port defined in
//! `payhub-core`.

pub mod ledger_store;

pub use ledger_store::{PgLedgerStore, PgLedgerUnit};
