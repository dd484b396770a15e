//! `SeaORM` entity definitions.

pub mod clients;
pub mod idempotency_keys;
pub mod ledger_entries;
pub mod merchants;
