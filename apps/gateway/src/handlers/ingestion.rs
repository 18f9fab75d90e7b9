// [apps/gateway/src/handlers/ingestion.rs]
//! POST /api/v1/readings — the one write path into the telemetry core.
//! Delegates the entire six-step pipeline to the ingestion orchestrator
//! (§4.4); this handler's only job is pulling the tenant identity and
//! batch out of the request and shaping the response.

use axum::extract::State;
use axum::Json;
use frostwatch_domain_telemetry::ReadingInput;
use serde::Deserialize;
use tracing::instrument;

use crate::errors::CoreError;
use crate::services::ingestion_orchestrator::{ingest_batch, IngestResult};
use crate::state::AppState;
use crate::tenant::TenantId;

const MAX_BATCH_SIZE: usize = 5_000;

#[derive(Debug, Deserialize)]
pub struct IngestRequest {
    pub readings: Vec<ReadingInput>,
}

#[instrument(skip(state, body), fields(tenant_id = %tenant.0, batch_size = body.readings.len()))]
pub async fn ingest_readings(
    State(state): State<AppState>,
    tenant: TenantId,
    Json(body): Json<IngestRequest>,
) -> Result<Json<IngestResult>, CoreError> {
    if body.readings.is_empty() {
        return Err(CoreError::InvalidInput("readings must not be empty".to_string()));
    }
    if body.readings.len() > MAX_BATCH_SIZE {
        return Err(CoreError::InvalidInput(format!(
            "batch of {} exceeds the {} reading soft cap",
            body.readings.len(),
            MAX_BATCH_SIZE
        )));
    }

    let result = ingest_batch(&state.ingestion, &tenant.0, body.readings, &state.shutdown)
        .await
        .map_err(|error| match error {
            crate::services::ingestion_orchestrator::IngestError::Db(db_error) => CoreError::from(db_error),
            crate::services::ingestion_orchestrator::IngestError::Cancelled => {
                CoreError::Transient("server is shutting down".to_string())
            }
        })?;

    Ok(Json(result))
}
