// [apps/gateway/src/services/ingestion_orchestrator.rs]
//! ## 4.4 Ingestion Orchestrator
//!
//! **Input.** A batch of readings and an asserting tenant identity.
//!
//! **Steps.** (1) Resolve the distinct unit identities in the batch and
//! verify each belongs to the tenant via the hierarchy join; drop readings
//! referring to others (silent filter). (2) Insert valid readings in chunks
//! bounded by the database parameter limit (≤ 500 rows per statement). (3)
//! Compute per-unit latest reading and write `lastReadingAt` +
//! `lastTemperature` once per unit. (4) For each affected hour-bucket, call
//! the Aggregator's upsert (§4.5). (5) For each unique unit, take its latest
//! reading and call the Evaluator (§4.2). (6) For each inserted reading,
//! push to the Stream Buffer (§4.7). Steps (2)–(3) are one transaction;
//! (4)–(6) run outside the transaction and must tolerate partial failure by
//! logging and continuing.
//!
//! **Result.** `{inserted, readingIds, alertsTriggered, metricsUpdated,
//! anomaliesDetected}`.
//!
//! **Backpressure.** Callers may pass batches up to a soft cap; oversized
//! batches are chunked by the Orchestrator, not rejected.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use frostwatch_domain_alerting::AlertAction;
use frostwatch_domain_metrics::{Granularity, IncomingGroup};
use frostwatch_domain_telemetry::{Reading, ReadingInput};
use frostwatch_infra_db::{MetricsRepository, ReadingRepository, TenancyRepository, ThresholdRepository};
use serde::Serialize;
use serde_json::json;
use tokio_util::sync::CancellationToken;
use tracing::{instrument, warn};

use super::evaluator::{evaluate_unit_reading, EvaluatorServices};
use super::stream_buffer::StreamBuffer;

#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error(transparent)]
    Db(#[from] frostwatch_infra_db::DbError),

    #[error("ingestion cancelled before completing")]
    Cancelled,
}

#[derive(Debug, Clone, Serialize)]
pub struct IngestResult {
    pub inserted: usize,
    pub reading_ids: Vec<String>,
    pub alerts_triggered: u32,
    pub metrics_updated: u32,
    pub anomalies_detected: u32,
}

pub struct IngestionServices {
    pub tenancy: Arc<TenancyRepository>,
    pub thresholds: Arc<ThresholdRepository>,
    pub readings: Arc<ReadingRepository>,
    pub metrics: Arc<MetricsRepository>,
    pub stream_buffer: Arc<StreamBuffer>,
    pub evaluator: EvaluatorServices,
}

/// Runs one ingestion batch through all six orchestrator steps. `cancellation`
/// is checked before each per-unit/per-group round trip in steps (4)-(6), per
/// the cancellation propagation policy (§5.1); a cancellation mid-batch still
/// returns the rows already committed in steps (2)-(3), since that
/// transaction has already landed.
#[instrument(skip(services, inputs, cancellation))]
pub async fn ingest_batch(
    services: &IngestionServices,
    tenant_id: &str,
    inputs: Vec<ReadingInput>,
    cancellation: &CancellationToken,
) -> Result<IngestResult, IngestError> {
    if cancellation.is_cancelled() {
        return Err(IngestError::Cancelled);
    }

    // Step (1): silent tenant filter.
    let candidate_unit_ids: Vec<String> = {
        let mut seen = HashMap::new();
        for input in &inputs {
            seen.entry(input.unit_id.clone()).or_insert(());
        }
        seen.into_keys().collect()
    };
    let owned_unit_ids = services.tenancy.filter_units_owned_by_tenant(tenant_id, &candidate_unit_ids).await?;
    let owned: std::collections::HashSet<&str> = owned_unit_ids.iter().map(String::as_str).collect();
    let accepted: Vec<ReadingInput> = inputs.into_iter().filter(|r| owned.contains(r.unit_id.as_str())).collect();

    if accepted.is_empty() {
        return Ok(IngestResult {
            inserted: 0,
            reading_ids: Vec::new(),
            alerts_triggered: 0,
            metrics_updated: 0,
            anomalies_detected: 0,
        });
    }

    // Steps (2)-(3): one transaction for the insert, then per-unit
    // last-seen update (also transactional at the repository level).
    let reading_ids = services.readings.insert_batch(tenant_id, &accepted).await?;

    let mut latest_per_unit: HashMap<String, &ReadingInput> = HashMap::new();
    for input in &accepted {
        latest_per_unit
            .entry(input.unit_id.clone())
            .and_modify(|existing| {
                if input.recorded_at > existing.recorded_at {
                    *existing = input;
                }
            })
            .or_insert(input);
    }

    for (unit_id, input) in &latest_per_unit {
        services.tenancy.update_last_reading(unit_id, input.recorded_at, input.temperature_tenths).await?;
    }

    // Steps (4)-(6) run best-effort: log and continue on a per-unit or
    // per-group failure rather than failing the whole batch.
    let now = Utc::now();
    let (metrics_updated, anomalies_detected) = run_metrics_step(services, tenant_id, &accepted, cancellation).await;
    let alerts_triggered = run_evaluation_step(services, tenant_id, &latest_per_unit, now, cancellation).await;
    push_to_stream_buffer(services, tenant_id, &accepted, &reading_ids).await;

    Ok(IngestResult {
        inserted: reading_ids.len(),
        reading_ids,
        alerts_triggered,
        metrics_updated,
        anomalies_detected,
    })
}

/// Step (4): groups the batch by `(unitId, floor(recordedAt, hour))` and
/// calls the Aggregator's upsert once per group, per §4.5.
async fn run_metrics_step(
    services: &IngestionServices,
    tenant_id: &str,
    accepted: &[ReadingInput],
    cancellation: &CancellationToken,
) -> (u32, u32) {
    let mut groups: HashMap<(String, chrono::DateTime<Utc>), Vec<&ReadingInput>> = HashMap::new();
    for input in accepted {
        let bucket_start = Granularity::Hourly.floor(input.recorded_at);
        groups.entry((input.unit_id.clone(), bucket_start)).or_default().push(input);
    }

    let mut updated = 0u32;
    let mut anomalies = 0u32;
    for ((unit_id, period_start), members) in groups {
        if cancellation.is_cancelled() {
            warn!("metrics aggregation cancelled mid-batch, remaining groups skipped");
            break;
        }

        let group = match reduce_to_incoming_group(services, tenant_id, &unit_id, &members).await {
            Ok(group) => group,
            Err(error) => {
                warn!(unit_id = %unit_id, %error, "threshold resolution failed for anomaly count, defaulting to zero");
                reduce_to_incoming_group_without_anomalies(&members)
            }
        };
        anomalies += group.anomaly_count as u32;

        match services.metrics.upsert_bucket(&unit_id, period_start, "hourly", &group).await {
            Ok(()) => {
                updated += 1;
                let payload = json!({"unitId": unit_id, "periodStart": period_start, "granularity": "hourly"});
                services.evaluator.hub.emit_metrics_updated(tenant_id, &unit_id, payload).await;
            }
            Err(error) => {
                warn!(unit_id = %unit_id, %error, "metrics upsert failed, continuing with remaining groups");
            }
        }
    }
    (updated, anomalies)
}

async fn reduce_to_incoming_group(
    services: &IngestionServices,
    tenant_id: &str,
    unit_id: &str,
    members: &[&ReadingInput],
) -> Result<IncomingGroup, frostwatch_infra_db::DbError> {
    let Some(unit) = services.tenancy.get_unit_scoped(tenant_id, unit_id).await? else {
        return Ok(reduce_to_incoming_group_without_anomalies(members));
    };

    let thresholds = services
        .thresholds
        .resolve(tenant_id, &unit.site_id, unit_id, unit.min_temp_tenths, unit.max_temp_tenths)
        .await
        .ok();

    let mut group = reduce_to_incoming_group_without_anomalies(members);
    if let Some(thresholds) = thresholds {
        group.anomaly_count = members.iter().filter(|m| thresholds.is_out_of_band(m.temperature_tenths)).count() as i64;
    }
    Ok(group)
}

fn reduce_to_incoming_group_without_anomalies(members: &[&ReadingInput]) -> IncomingGroup {
    let min_temp_tenths = members.iter().map(|m| m.temperature_tenths).min().unwrap_or(0);
    let max_temp_tenths = members.iter().map(|m| m.temperature_tenths).max().unwrap_or(0);
    let sum_temp_tenths: i64 = members.iter().map(|m| m.temperature_tenths as i64).sum();
    let min_humidity_tenths = members.iter().filter_map(|m| m.humidity_tenths).min();
    let max_humidity_tenths = members.iter().filter_map(|m| m.humidity_tenths).max();

    IncomingGroup {
        min_temp_tenths,
        max_temp_tenths,
        sum_temp_tenths,
        count: members.len() as i64,
        min_humidity_tenths,
        max_humidity_tenths,
        anomaly_count: 0,
    }
}

/// Step (5): one Evaluator call per unique affected unit, using that unit's
/// latest reading in the batch.
async fn run_evaluation_step(
    services: &IngestionServices,
    tenant_id: &str,
    latest_per_unit: &HashMap<String, &ReadingInput>,
    now: chrono::DateTime<Utc>,
    cancellation: &CancellationToken,
) -> u32 {
    let mut triggered = 0u32;

    for (unit_id, input) in latest_per_unit {
        if cancellation.is_cancelled() {
            warn!("evaluation step cancelled mid-batch, remaining units skipped");
            break;
        }

        let unit = match services.evaluator.tenancy.get_unit_scoped(tenant_id, unit_id).await {
            Ok(Some(unit)) => unit,
            Ok(None) => continue,
            Err(error) => {
                warn!(unit_id = %unit_id, %error, "unit lookup failed during evaluation step, skipping");
                continue;
            }
        };

        match evaluate_unit_reading(&services.evaluator, &unit, input.temperature_tenths, input.recorded_at, now).await {
            Ok(Some(result)) if !matches!(result.alert_action, AlertAction::None) => {
                triggered += 1;
            }
            Ok(_) => {}
            Err(error) => {
                warn!(unit_id = %unit_id, %error, "evaluation failed for unit, continuing batch");
            }
        }
    }

    triggered
}

/// Step (6): one stream-buffer push per inserted reading.
async fn push_to_stream_buffer(
    services: &IngestionServices,
    tenant_id: &str,
    accepted: &[ReadingInput],
    reading_ids: &[String],
) {
    for (input, id) in accepted.iter().zip(reading_ids.iter()) {
        let reading = Reading {
            id: id.clone(),
            unit_id: input.unit_id.clone(),
            tenant_id: tenant_id.to_string(),
            device_id: input.device_id.clone(),
            temperature_tenths: input.temperature_tenths,
            humidity_tenths: input.humidity_tenths,
            battery_percent: input.battery_percent,
            signal_strength: input.signal_strength,
            recorded_at: input.recorded_at,
            received_at: Utc::now(),
            source: input.source.clone(),
            raw_payload: input.raw_payload.clone(),
        };
        services.stream_buffer.push(reading).await;
    }
}
