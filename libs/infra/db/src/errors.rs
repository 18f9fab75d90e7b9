// [libs/infra/db/src/errors.rs]
/*!
 * =================================================================
 * APARATO: DATABASE ERROR CATALOG (ESTRATO L3)
 * RESPONSABILIDAD: CATALOGACION SEMANTICA DE FALLOS DE PERSISTENCIA
 * =================================================================
 */

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("[L3_DB_NET_FAULT]: DATABASE_UPLINK_SEVERED -> {0}")]
    ConnectionError(String),

    #[error("[L3_DB_CONFIG_FAULT]: STRATEGIC_ENV_VOID -> {0}")]
    ConfigurationError(String),

    #[error("[L3_DB_QUERY_FAULT]: SQL_QUERY_REJECTED -> {0}")]
    QueryError(#[from] libsql::Error),

    #[error("[L3_DB_MAPPING_FAULT]: DATA_MAPPING_VIOLATION -> {0}")]
    MappingError(String),

    // --- THRESHOLD RESOLUTION ---
    #[error("[L3_THRESHOLD_FAULT]: UNIT_NOT_FOUND")]
    UnitNotFound,

    #[error("[L3_THRESHOLD_FAULT]: NO_THRESHOLDS_RESOLVED")]
    NoThresholds,

    // --- TENANCY GUARD ---
    #[error("[L3_TENANCY_FAULT]: CROSS_TENANT_ACCESS_REJECTED")]
    TenantMismatch,

    // --- ALERT STORE ---
    #[error("[L3_ALERT_FAULT]: ALERT_NOT_FOUND")]
    AlertNotFound,

    #[error("[L3_DB_FAULT]: TRANSACTION_COLLAPSE -> {0}")]
    TransactionError(String),
}

impl DbError {
    pub fn mapping(context: impl Into<String>) -> Self {
        Self::MappingError(context.into())
    }
}
