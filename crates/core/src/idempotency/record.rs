//! Persisted idempotency record.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::ledger::LedgerError;

/// Logical status code recorded for a newly created entry.
pub const CREATED: u16 = 201;

/// The response produced the first time a token was used.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdempotencyRecord {
    /// Client-supplied token. Unique.
    pub key: String,
    /// JSON snapshot of the response.
    pub response_body: String,
    /// Logical status code of the response.
    pub status_code: u16,
    /// When the record was written.
    pub created_at: DateTime<Utc>,
}

impl IdempotencyRecord {
    /// Snapshots `response` under `key`.
    ///
    /// A response that cannot be encoded is an integrity failure; retrying
    /// would fail the same way.
    pub fn capture<T: Serialize>(
        key: &str,
        response: &T,
        status_code: u16,
    ) -> Result<Self, LedgerError> {
        let response_body =
            serde_json::to_string(response).map_err(|e| LedgerError::ResponseEncoding {
                key: key.to_string(),
                reason: e.to_string(),
            })?;
        Ok(Self {
            key: key.to_string(),
            response_body,
            status_code,
            created_at: Utc::now(),
        })
    }

    /// Decodes the recorded response.
    ///
    /// An unreadable body is an integrity failure; the caller must not fall
    /// back to executing the operation again.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, LedgerError> {
        serde_json::from_str(&self.response_body).map_err(|e| {
            LedgerError::CorruptIdempotencyRecord {
                key: self.key.clone(),
                reason: e.to_string(),
            }
        })
    }
}
