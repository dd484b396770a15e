//! Ledger error types for validation, rejection and storage failures.
//!
//! Every failure of a processing operation is an ordinary `Err` value carrying
//! an explicit reason. The variants fall into four categories which the
//! transport layer maps to status codes:
//!
//! - validation: the request itself is malformed (never retried)
//! - rejection: a definitive business "no" for this request
//! - storage: the store could not answer; the request is safe to retry
//! - integrity: persisted state contradicts an invariant; needs a human

use payhub_shared::AppError;
use payhub_shared::types::{ClientId, MerchantId};
use rust_decimal::Decimal;
use thiserror::Error;

use crate::store::StoreError;

/// Coarse classification of a [`LedgerError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Malformed request.
    Validation,
    /// Business-rule rejection.
    Rejection,
    /// Storage unreachable or failing.
    Storage,
    /// Persisted state is inconsistent.
    Integrity,
}

/// Errors that can occur while processing ledger operations.
#[derive(Debug, Error)]
pub enum LedgerError {
    // ========== Validation Errors ==========
    /// Amount is zero or negative.
    #[error("Amount must be greater than zero, got {0}")]
    NonPositiveAmount(Decimal),

    /// Deposit is above the per-transaction ceiling.
    #[error("Deposit of {amount} exceeds the per-transaction ceiling of {ceiling}")]
    DepositCeilingExceeded {
        /// Requested deposit amount.
        amount: Decimal,
        /// Configured ceiling.
        ceiling: Decimal,
    },

    // ========== Business Rejections ==========
    /// Referenced merchant does not exist.
    #[error("Merchant not found: {0}")]
    MerchantNotFound(MerchantId),

    /// Withdrawal is larger than the client's balance.
    #[error("Insufficient funds for client {client_id}: available {available}, requested {requested}")]
    InsufficientFunds {
        /// Client attempting the withdrawal.
        client_id: ClientId,
        /// Balance at the time of the check.
        available: Decimal,
        /// Requested amount.
        requested: Decimal,
    },

    /// Referenced client does not exist.
    #[error("Client not found: {0}")]
    ClientNotFound(ClientId),

    /// Applying the amount would push a balance total out of range.
    #[error("Amount {amount} would take the balance of client {client_id} out of range")]
    AmountOutOfRange {
        /// Client owning the balance.
        client_id: ClientId,
        /// Requested amount.
        amount: Decimal,
    },

    /// No client matches the presented credential.
    #[error("Invalid client credential")]
    InvalidCredential,

    /// Client exists but has been deactivated.
    #[error("Client {0} is inactive")]
    ClientInactive(ClientId),

    // ========== Storage Errors ==========
    /// Store unreachable or a call exceeded its deadline.
    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),

    /// Store reported a failure.
    #[error("Storage error: {0}")]
    Storage(String),

    // ========== Integrity Errors ==========
    /// A client's committed history sums beyond the representable range.
    #[error("Balance of client {0} cannot be represented")]
    BalanceOverflow(ClientId),

    /// A response could not be encoded for recording.
    #[error("Response for idempotency key '{key}' cannot be encoded: {reason}")]
    ResponseEncoding {
        /// Idempotency key.
        key: String,
        /// Encoder message.
        reason: String,
    },

    /// A second record was written for an idempotency key.
    #[error("Idempotency key '{0}' already has a recorded response")]
    IdempotencyConflict(String),

    /// A recorded response could not be decoded.
    #[error("Recorded response for idempotency key '{key}' is unreadable: {reason}")]
    CorruptIdempotencyRecord {
        /// Idempotency key.
        key: String,
        /// Decoder message.
        reason: String,
    },
}

impl LedgerError {
    /// Returns the category of this error.
    #[must_use]
    pub const fn category(&self) -> ErrorCategory {
        match self {
            Self::NonPositiveAmount(_) | Self::DepositCeilingExceeded { .. } => {
                ErrorCategory::Validation
            }
            Self::MerchantNotFound(_)
            | Self::ClientNotFound(_)
            | Self::AmountOutOfRange { .. }
            | Self::InsufficientFunds { .. }
            | Self::InvalidCredential
            | Self::ClientInactive(_) => ErrorCategory::Rejection,
            Self::StorageUnavailable(_) | Self::Storage(_) => ErrorCategory::Storage,
            Self::BalanceOverflow(_)
            | Self::ResponseEncoding { .. }
            | Self::IdempotencyConflict(_)
            | Self::CorruptIdempotencyRecord { .. } => ErrorCategory::Integrity,
        }
    }

    /// Returns the error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::NonPositiveAmount(_) => "NON_POSITIVE_AMOUNT",
            Self::DepositCeilingExceeded { .. } => "DEPOSIT_CEILING_EXCEEDED",
            Self::MerchantNotFound(_) => "MERCHANT_NOT_FOUND",
            Self::ClientNotFound(_) => "CLIENT_NOT_FOUND",
            Self::AmountOutOfRange { .. } => "AMOUNT_OUT_OF_RANGE",
            Self::InsufficientFunds { .. } => "INSUFFICIENT_FUNDS",
            Self::InvalidCredential => "INVALID_CREDENTIAL",
            Self::ClientInactive(_) => "CLIENT_INACTIVE",
            Self::StorageUnavailable(_) => "STORAGE_UNAVAILABLE",
            Self::Storage(_) => "STORAGE_ERROR",
            Self::BalanceOverflow(_) => "BALANCE_OVERFLOW",
            Self::ResponseEncoding { .. } => "RESPONSE_ENCODING",
            Self::IdempotencyConflict(_) => "IDEMPOTENCY_CONFLICT",
            Self::CorruptIdempotencyRecord { .. } => "CORRUPT_IDEMPOTENCY_RECORD",
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn http_status_code(&self) -> u16 {
        match self {
            // 400 Bad Request - validation errors
            Self::NonPositiveAmount(_) | Self::DepositCeilingExceeded { .. } => 400,

            // 401/403 - credential errors
            Self::InvalidCredential => 401,
            Self::ClientInactive(_) => 403,

            // 404 Not Found - unknown client
            Self::ClientNotFound(_) => 404,

            // 422 Unprocessable - business rejections
            Self::MerchantNotFound(_)
            | Self::AmountOutOfRange { .. }
            | Self::InsufficientFunds { .. } => 422,

            // 503 Service Unavailable - retry later
            Self::StorageUnavailable(_) => 503,

            // 500 Internal Server Error
            Self::Storage(_)
            | Self::BalanceOverflow(_)
            | Self::ResponseEncoding { .. }
            | Self::IdempotencyConflict(_)
            | Self::CorruptIdempotencyRecord { .. } => 500,
        }
    }

    /// Returns true if the same request may be retried.
    ///
    /// Storage failures leave no partial effect behind, so a retry is safe.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self.category(), ErrorCategory::Storage)
    }
}

impl From<StoreError> for LedgerError {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::Unavailable(msg) => Self::StorageUnavailable(msg),
            StoreError::Conflict(msg) | StoreError::Backend(msg) => Self::Storage(msg),
        }
    }
}

impl From<LedgerError> for AppError {
    fn from(error: LedgerError) -> Self {
        let message = error.to_string();
        match error {
            LedgerError::NonPositiveAmount(_) | LedgerError::DepositCeilingExceeded { .. } => {
                Self::Validation(message)
            }
            LedgerError::MerchantNotFound(_)
            | LedgerError::AmountOutOfRange { .. }
            | LedgerError::InsufficientFunds { .. } => Self::BusinessRule(message),
            LedgerError::ClientNotFound(_) => Self::NotFound(message),
            LedgerError::InvalidCredential => Self::Unauthorized(message),
            LedgerError::ClientInactive(_) => Self::Forbidden(message),
            LedgerError::StorageUnavailable(_) => Self::ServiceUnavailable(message),
            LedgerError::Storage(_) => Self::Database(message),
            LedgerError::BalanceOverflow(_)
            | LedgerError::ResponseEncoding { .. }
            | LedgerError::IdempotencyConflict(_)
            | LedgerError::CorruptIdempotencyRecord { .. } => Self::Internal(message),
        }
    }
}
