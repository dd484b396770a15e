//! Shared types, errors, and configuration for PayHub.
//!
//! This crate provides common types used across all other crates:
//! - Typed IDs for clients, merchants and ledger entries
//! - Currency codes
//! - Transport-facing error classification
//! - Configuration management

pub mod config;
pub mod error;
pub mod types;

pub use config::{AppConfig, DatabaseConfig, LedgerConfig};
pub use error::{AppError, AppResult};
