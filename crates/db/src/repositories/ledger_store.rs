//! PostgreSQL implementation of the ledger store port.
//!
//! Each [`PgLedgerUnit`] wraps one database transaction:
//! - idempotency tokens are locked with `pg_advisory_xact_lock(hashtext(key))`
//! - clients are locked with `SELECT ... FOR UPDATE` on their row
//! - the `idempotency_keys` primary key rejects a second record for a token
//!
//! All locks are released when the transaction commits or rolls back.

use async_trait::async_trait;
use chrono::Utc;
use payhub_core::idempotency::IdempotencyRecord;
use payhub_core::ledger::{Client, EntryKind, EntryStatus, LedgerEntry, Merchant};
use payhub_core::store::{LedgerStore, LedgerUnit, StoreError, StoreResult};
use payhub_shared::types::{ClientId, EntryId, MerchantId};
use sea_orm::{
    ColumnTrait, ConnectionTrait, DatabaseConnection, DatabaseTransaction, DbBackend, DbErr,
    EntityTrait, QueryFilter, QueryOrder, QuerySelect, SqlErr, Statement, TransactionTrait,
};
use tracing::debug;

use crate::entities::{clients, idempotency_keys, ledger_entries, merchants};

/// Ledger store backed by PostgreSQL.
#[derive(Debug, Clone)]
pub struct PgLedgerStore {
    db: DatabaseConnection,
}

impl PgLedgerStore {
    /// Creates a store on an existing connection pool.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Returns the underlying connection pool.
    #[must_use]
    pub const fn connection(&self) -> &DatabaseConnection {
        &self.db
    }
}

#[async_trait]
impl LedgerStore for PgLedgerStore {
    async fn find_client_by_api_key(&self, api_key: &str) -> StoreResult<Option<Client>> {
        let model = clients::Entity::find()
            .filter(clients::Column::ApiKey.eq(api_key))
            .one(&self.db)
            .await
            .map_err(store_error)?;
        Ok(model.map(client_from_model))
    }

    async fn find_merchant(&self, merchant_id: MerchantId) -> StoreResult<Option<Merchant>> {
        let model = merchants::Entity::find_by_id(merchant_id.into_inner())
            .one(&self.db)
            .await
            .map_err(store_error)?;
        Ok(model.map(merchant_from_model))
    }

    async fn find_idempotency_record(&self, key: &str) -> StoreResult<Option<IdempotencyRecord>> {
        find_record(&self.db, key).await
    }

    async fn client_entries(&self, client_id: ClientId) -> StoreResult<Vec<LedgerEntry>> {
        find_entries(&self.db, client_id).await
    }

    async fn begin(&self) -> StoreResult<Box<dyn LedgerUnit>> {
        let txn = self.db.begin().await.map_err(store_error)?;
        Ok(Box::new(PgLedgerUnit { txn }))
    }
}

/// One database transaction used as a ledger unit of work.
///
/// Dropping it without committing rolls the transaction back.
pub struct PgLedgerUnit {
    txn: DatabaseTransaction,
}

#[async_trait]
impl LedgerUnit for PgLedgerUnit {
    async fn lock_idempotency_key(&mut self, key: &str) -> StoreResult<()> {
        self.txn
            .execute(Statement::from_sql_and_values(
                DbBackend::Postgres,
                "SELECT pg_advisory_xact_lock(hashtext($1))",
                [key.into()],
            ))
            .await
            .map_err(store_error)?;
        debug!(idempotency_key = key, "Advisory lock acquired");
        Ok(())
    }

    async fn lock_client(&mut self, client_id: ClientId) -> StoreResult<bool> {
        let locked = clients::Entity::find_by_id(client_id.into_inner())
            .lock_exclusive()
            .one(&self.txn)
            .await
            .map_err(store_error)?;
        Ok(locked.is_some())
    }

    async fn find_idempotency_record(
        &mut self,
        key: &str,
    ) -> StoreResult<Option<IdempotencyRecord>> {
        find_record(&self.txn, key).await
    }

    async fn client_entries(&mut self, client_id: ClientId) -> StoreResult<Vec<LedgerEntry>> {
        find_entries(&self.txn, client_id).await
    }

    async fn insert_entry(&mut self, entry: &LedgerEntry) -> StoreResult<()> {
        ledger_entries::Entity::insert(ledger_entries::ActiveModel::from(entry_to_model(entry)))
            .exec_without_returning(&self.txn)
            .await
            .map_err(store_error)?;
        Ok(())
    }

    async fn insert_idempotency_record(&mut self, record: &IdempotencyRecord) -> StoreResult<()> {
        idempotency_keys::Entity::insert(idempotency_keys::ActiveModel::from(record_to_model(
            record,
        )))
        .exec_without_returning(&self.txn)
        .await
        .map_err(store_error)?;
        Ok(())
    }

    async fn commit(self: Box<Self>) -> StoreResult<()> {
        self.txn.commit().await.map_err(store_error)
    }

    async fn rollback(self: Box<Self>) -> StoreResult<()> {
        self.txn.rollback().await.map_err(store_error)
    }
}

async fn find_record<C: ConnectionTrait>(
    conn: &C,
    key: &str,
) -> StoreResult<Option<IdempotencyRecord>> {
    let model = idempotency_keys::Entity::find_by_id(key.to_string())
        .one(conn)
        .await
        .map_err(store_error)?;
    model.map(record_from_model).transpose()
}

async fn find_entries<C: ConnectionTrait>(
    conn: &C,
    client_id: ClientId,
) -> StoreResult<Vec<LedgerEntry>> {
    ledger_entries::Entity::find()
        .filter(ledger_entries::Column::ClientId.eq(client_id.into_inner()))
        .order_by_asc(ledger_entries::Column::CreatedAt)
        .order_by_asc(ledger_entries::Column::Id)
        .all(conn)
        .await
        .map_err(store_error)?
        .into_iter()
        .map(entry_from_model)
        .collect()
}

/// Classifies a database error for the core.
///
/// Unique violations are conflicts; pool and connection failures mean the
/// store is unavailable.
pub(crate) fn store_error(err: DbErr) -> StoreError {
    if let Some(SqlErr::UniqueConstraintViolation(msg)) = err.sql_err() {
        return StoreError::Conflict(msg);
    }
    match &err {
        DbErr::ConnectionAcquire(_) | DbErr::Conn(_) => StoreError::Unavailable(err.to_string()),
        _ => StoreError::Backend(err.to_string()),
    }
}

fn client_from_model(model: clients::Model) -> Client {
    Client {
        id: ClientId::from_uuid(model.id),
        name: model.name,
        api_key: model.api_key,
        is_active: model.is_active,
        created_at: model.created_at.with_timezone(&Utc),
    }
}

fn merchant_from_model(model: merchants::Model) -> Merchant {
    Merchant {
        id: MerchantId::from_uuid(model.id),
        name: model.name,
        service_type: model.service_type,
        integration_url: model.integration_url,
        created_at: model.created_at.with_timezone(&Utc),
    }
}

fn entry_to_model(entry: &LedgerEntry) -> ledger_entries::Model {
    ledger_entries::Model {
        id: entry.id.into_inner(),
        kind: entry.kind.as_str().to_string(),
        merchant_id: entry.kind.merchant_id().map(MerchantId::into_inner),
        client_id: entry.client_id.into_inner(),
        amount: entry.amount,
        currency: entry.currency.code().to_string(),
        status: entry.status.as_str().to_string(),
        reference: entry.reference.clone(),
        idempotency_key: entry.idempotency_key.clone(),
        store_name: entry.store_name.clone(),
        external_id: entry.external_id.clone(),
        created_at: entry.created_at.fixed_offset(),
    }
}

fn entry_from_model(model: ledger_entries::Model) -> StoreResult<LedgerEntry> {
    let corrupt = |what: String| StoreError::Backend(format!("ledger entry {}: {what}", model.id));

    let kind = match (model.kind.as_str(), model.merchant_id) {
        ("charge", Some(merchant_id)) => EntryKind::Charge {
            merchant_id: MerchantId::from_uuid(merchant_id),
        },
        ("deposit", None) => EntryKind::Deposit,
        ("cash_out", None) => EntryKind::CashOut,
        (kind, merchant_id) => {
            return Err(corrupt(format!(
                "invalid kind '{kind}' with merchant {merchant_id:?}"
            )));
        }
    };
    let currency = model.currency.parse().map_err(corrupt)?;
    let status: EntryStatus = model.status.parse().map_err(corrupt)?;

    Ok(LedgerEntry {
        id: EntryId::from_uuid(model.id),
        kind,
        amount: model.amount,
        currency,
        status,
        reference: model.reference,
        client_id: ClientId::from_uuid(model.client_id),
        created_at: model.created_at.with_timezone(&Utc),
        idempotency_key: model.idempotency_key,
        store_name: model.store_name,
        external_id: model.external_id,
    })
}

fn record_to_model(record: &IdempotencyRecord) -> idempotency_keys::Model {
    idempotency_keys::Model {
        key: record.key.clone(),
        response_json: record.response_body.clone(),
        status_code: i32::from(record.status_code),
        created_at: record.created_at.fixed_offset(),
    }
}

fn record_from_model(model: idempotency_keys::Model) -> StoreResult<IdempotencyRecord> {
    let status_code = u16::try_from(model.status_code).map_err(|_| {
        StoreError::Backend(format!(
            "idempotency key '{}': invalid status code {}",
            model.key, model.status_code
        ))
    })?;
    Ok(IdempotencyRecord {
        key: model.key,
        response_body: model.response_json,
        status_code,
        created_at: model.created_at.with_timezone(&Utc),
    })
}
