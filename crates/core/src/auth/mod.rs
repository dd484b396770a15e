//! Client authentication.
//!
//! Clients present an opaque API key on every request. Resolving it to an
//! active [`Client`] is the only authentication the ledger needs; the
//! middleware that extracts the key lives in the transport layer.

use std::time::Duration;

use tracing::warn;

use crate::ledger::{Client, LedgerError};
use crate::store::{LedgerStore, bounded};

/// Resolves `api_key` to an active client.
///
/// An unknown key yields [`LedgerError::InvalidCredential`]; a known but
/// deactivated client yields [`LedgerError::ClientInactive`].
pub async fn authenticate_client(
    store: &dyn LedgerStore,
    api_key: &str,
    timeout: Duration,
) -> Result<Client, LedgerError> {
    if api_key.is_empty() {
        return Err(LedgerError::InvalidCredential);
    }
    let client = bounded(timeout, "find_client_by_api_key", store.find_client_by_api_key(api_key))
        .await?
        .ok_or(LedgerError::InvalidCredential)?;
    if !client.is_active {
        warn!(client_id = %client.id, "Inactive client attempted a request");
        return Err(LedgerError::ClientInactive(client.id));
    }
    Ok(client)
}
