// [apps/gateway/src/errors.rs]
//! Error kinds surfaced by the core (§7): `NotFound`, `InvalidInput`,
//! `Forbidden`, `Conflict`, `NoThresholds`, `Transient`, `Fatal`. Only the
//! handful of HTTP-facing handlers this core owns (reading ingestion, alert
//! query/ack/resolve) ever turn a `CoreError` into a response; everything
//! else (ingestion post-processing, the escalation sweep) logs it and moves
//! on per the best-effort propagation policy.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use frostwatch_domain_telemetry::ThresholdError;
use serde::Serialize;

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("not found")]
    NotFound,

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("forbidden")]
    Forbidden,

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("no thresholds resolved for this unit")]
    NoThresholds,

    #[error("transient failure, retry: {0}")]
    Transient(String),

    #[error("fatal: {0}")]
    Fatal(String),
}

impl From<frostwatch_infra_db::DbError> for CoreError {
    fn from(error: frostwatch_infra_db::DbError) -> Self {
        use frostwatch_infra_db::DbError;
        match error {
            DbError::UnitNotFound | DbError::AlertNotFound => CoreError::NotFound,
            DbError::TenantMismatch => CoreError::NotFound,
            DbError::NoThresholds => CoreError::NoThresholds,
            DbError::ConnectionError(e) | DbError::ConfigurationError(e) => CoreError::Fatal(e),
            DbError::QueryError(e) => CoreError::Transient(e.to_string()),
            DbError::MappingError(e) | DbError::TransactionError(e) => CoreError::Fatal(e),
        }
    }
}

impl From<ThresholdError> for CoreError {
    fn from(error: ThresholdError) -> Self {
        match error {
            ThresholdError::NotFound => CoreError::NotFound,
            ThresholdError::NoThresholds => CoreError::NoThresholds,
        }
    }
}

impl From<frostwatch_infra_sms::ClientError> for CoreError {
    fn from(error: frostwatch_infra_sms::ClientError) -> Self {
        CoreError::Transient(error.to_string())
    }
}

#[derive(Serialize)]
struct ErrorBody {
    code: &'static str,
    message: String,
}

impl IntoResponse for CoreError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            CoreError::NotFound => (StatusCode::NOT_FOUND, "not_found"),
            CoreError::InvalidInput(_) => (StatusCode::BAD_REQUEST, "invalid_input"),
            CoreError::Forbidden => (StatusCode::FORBIDDEN, "forbidden"),
            CoreError::Conflict(_) => (StatusCode::CONFLICT, "conflict"),
            // No thresholds resolved is not a client mistake; surfaced as
            // 404-shaped so the UI can render "not configured" rather than
            // leaking the internal resolution failure as a 500.
            CoreError::NoThresholds => (StatusCode::NOT_FOUND, "no_thresholds"),
            CoreError::Transient(_) => (StatusCode::INTERNAL_SERVER_ERROR, "transient"),
            CoreError::Fatal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal"),
        };

        // Internal failures never leak stack detail to the client, per §7.
        let message = match &self {
            CoreError::Transient(_) | CoreError::Fatal(_) => "internal error".to_string(),
            other => other.to_string(),
        };

        (status, Json(ErrorBody { code, message })).into_response()
    }
}
