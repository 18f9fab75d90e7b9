// [libs/infra/db/src/client.rs]
/*!
 * =================================================================
 * APARATO: DATABASE CONNECTION CLIENT (ESTRATO L3)
 * RESPONSABILIDAD: GESTION DE ENLACES Y PERSISTENCIA ACID
 *
 * In-memory URLs (tests) need a single anchor connection kept alive for
 * the lifetime of the client, or SQLite reclaims the schema between
 * connections; disk/remote URLs bootstrap the schema once and let every
 * subsequent connection ride the driver's own pool.
 * =================================================================
 */

use crate::errors::DbError;
use crate::schema::apply_full_schema;
use libsql::{Builder, Connection, Database, Transaction};
use std::sync::Arc;
use tracing::{error, info, instrument};

#[derive(Clone)]
pub struct LedgerClient {
    driver: Arc<Database>,
    _memory_anchor: Option<Arc<Connection>>,
}

impl LedgerClient {
    #[instrument(skip(access_token))]
    pub async fn connect(connection_url: &str, access_token: Option<String>) -> Result<Self, DbError> {
        if connection_url.is_empty() {
            return Err(DbError::ConnectionError("DATABASE_URL_UNDEFINED".into()));
        }

        info!("connecting to ledger at {}", connection_url);

        let is_remote =
            connection_url.starts_with("libsql://") || connection_url.starts_with("https://");
        let is_memory = connection_url.contains(":memory:") || connection_url.contains("mode=memory");

        let driver = if is_remote {
            let token = access_token
                .ok_or_else(|| DbError::ConnectionError("remote access denied: token missing".into()))?;
            Builder::new_remote(connection_url.to_string(), token).build().await
        } else {
            Builder::new_local(connection_url).build().await
        }
        .map_err(|e| DbError::ConnectionError(format!("driver ignition failure: {e}")))?;

        let driver = Arc::new(driver);
        let mut anchor = None;

        if is_memory {
            let anchor_conn = driver
                .connect()
                .map_err(|e| DbError::ConnectionError(format!("anchor connection failed: {e}")))?;
            apply_full_schema(&anchor_conn)
                .await
                .map_err(|e| DbError::ConnectionError(format!("schema sync failed: {e}")))?;
            anchor = Some(Arc::new(anchor_conn));
            info!("memory ledger anchored and schema applied");
        } else {
            let bootstrap_conn = driver
                .connect()
                .map_err(|e| DbError::ConnectionError(format!("bootstrap connection failed: {e}")))?;
            apply_full_schema(&bootstrap_conn)
                .await
                .map_err(|e| DbError::ConnectionError(format!("schema sync failed: {e}")))?;
        }

        Ok(Self {
            driver,
            _memory_anchor: anchor,
        })
    }

    pub fn get_connection(&self) -> Result<Connection, DbError> {
        self.driver.connect().map_err(|e| {
            error!("connection allocation failed: {e}");
            DbError::ConnectionError(e.to_string())
        })
    }

    /// Opens a connection and starts a transaction on it in one step, for
    /// callers that must commit more than one repository mutation
    /// atomically (the Evaluator's unit-status write alongside its
    /// alert-status mutation).
    pub async fn begin_transaction(&self) -> Result<Transaction, DbError> {
        let connection = self.get_connection()?;
        connection.transaction().await.map_err(|e| {
            error!("transaction start failed: {e}");
            DbError::TransactionError(e.to_string())
        })
    }
}
