//! Reference data owned by onboarding: clients and merchants.

use chrono::{DateTime, Utc};
use payhub_shared::types::{ClientId, MerchantId};
use serde::{Deserialize, Serialize};

/// A client of the aggregation service (a store chain, a kiosk operator).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Client {
    /// Client identifier.
    pub id: ClientId,
    /// Display name, e.g. "Oxxo Sucursal Centro".
    pub name: String,
    /// Opaque credential presented on every request.
    #[serde(skip_serializing, default)]
    pub api_key: String,
    /// Inactive clients are refused by authentication.
    pub is_active: bool,
    /// When the client was onboarded.
    pub created_at: DateTime<Utc>,
}

/// A service provider that charges can be paid to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Merchant {
    /// Merchant identifier.
    pub id: MerchantId,
    /// Display name, e.g. "CFE".
    pub name: String,
    /// Service category, e.g. "ELECTRICITY".
    pub service_type: String,
    /// Endpoint used to notify the merchant, if integrated.
    pub integration_url: Option<String>,
    /// When the merchant was registered.
    pub created_at: DateTime<Utc>,
}

impl Client {
    /// Creates an active client with a fresh identifier.
    #[must_use]
    pub fn new(name: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            id: ClientId::new(),
            name: name.into(),
            api_key: api_key.into(),
            is_active: true,
            created_at: Utc::now(),
        }
    }
}

impl Merchant {
    /// Creates a merchant with a fresh identifier and no integration endpoint.
    #[must_use]
    pub fn new(name: impl Into<String>, service_type: impl Into<String>) -> Self {
        Self {
            id: MerchantId::new(),
            name: name.into(),
            service_type: service_type.into(),
            integration_url: None,
            created_at: Utc::now(),
        }
    }
}
