// [apps/gateway/src/handlers/health.rs]
//! GET /healthz — liveness only. No dependency on the ledger connection;
//! a degraded database is surfaced by the per-request errors it causes,
//! not by failing the process's own health probe.

use axum::Json;
use serde::Serialize;

#[derive(Serialize)]
pub struct HealthBody {
    status: &'static str,
}

pub async fn health() -> Json<HealthBody> {
    Json(HealthBody { status: "ok" })
}
