// [libs/infra/db/src/repositories/reading_repository.rs]
/*!
 * Append-only insert path. Chunks by the database parameter limit so one
 * oversized batch never exceeds libSQL's bound-parameter ceiling; the
 * Orchestrator decides the overall batch shape, this repository only
 * protects the single-statement limit.
 */

use crate::client::LedgerClient;
use crate::errors::DbError;
use frostwatch_domain_telemetry::{Reading, ReadingInput};
use libsql::params;
use tracing::instrument;
use uuid::Uuid;

/// Each row binds 11 parameters; kept comfortably under libSQL's default
/// 999-variable statement ceiling even for the widest supported chunk.
const MAX_ROWS_PER_STATEMENT: usize = 500;

pub struct ReadingRepository {
    client: LedgerClient,
}

impl ReadingRepository {
    pub fn new(client: LedgerClient) -> Self {
        Self { client }
    }

    /// Inserts already-tenant-validated readings, chunked to
    /// `MAX_ROWS_PER_STATEMENT` rows per transaction. Returns the assigned
    /// ids in input order.
    #[instrument(skip(self, inputs))]
    pub async fn insert_batch(&self, tenant_id: &str, inputs: &[ReadingInput]) -> Result<Vec<String>, DbError> {
        if inputs.is_empty() {
            return Ok(Vec::new());
        }

        let connection = self.client.get_connection()?;
        let mut ids = Vec::with_capacity(inputs.len());

        for chunk in inputs.chunks(MAX_ROWS_PER_STATEMENT) {
            let transaction = connection.transaction().await?;
            for input in chunk {
                let id = Uuid::new_v4().to_string();
                transaction
                    .execute(
                        r#"
                        INSERT INTO readings (
                            id, unit_id, tenant_id, device_id, temperature_tenths,
                            humidity_tenths, battery_percent, signal_strength,
                            recorded_at, source, raw_payload
                        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
                        "#,
                        params![
                            id.clone(),
                            input.unit_id.clone(),
                            tenant_id.to_string(),
                            input.device_id.clone(),
                            input.temperature_tenths as i64,
                            input.humidity_tenths.map(|v| v as i64),
                            input.battery_percent.map(|v| v as i64),
                            input.signal_strength.map(|v| v as i64),
                            input.recorded_at.to_rfc3339(),
                            input.source.clone(),
                            input.raw_payload.as_ref().map(|v| v.to_string()),
                        ],
                    )
                    .await?;
                ids.push(id);
            }
            transaction.commit().await?;
        }

        Ok(ids)
    }

    /// Latest reading per unit within `unit_ids`, used by the Orchestrator
    /// to drive one Evaluator call per affected unit.
    #[instrument(skip(self, unit_ids))]
    pub async fn latest_by_unit(&self, unit_ids: &[String]) -> Result<Vec<Reading>, DbError> {
        if unit_ids.is_empty() {
            return Ok(Vec::new());
        }
        let connection = self.client.get_connection()?;
        let mut latest = Vec::with_capacity(unit_ids.len());

        for unit_id in unit_ids {
            let mut rows = connection
                .query(
                    r#"
                    SELECT id, unit_id, tenant_id, device_id, temperature_tenths,
                           humidity_tenths, battery_percent, signal_strength,
                           recorded_at, received_at, source, raw_payload
                    FROM readings
                    WHERE unit_id = ?1
                    ORDER BY recorded_at DESC
                    LIMIT 1
                    "#,
                    params![unit_id.clone()],
                )
                .await?;

            if let Some(row) = rows.next().await? {
                latest.push(Reading {
                    id: row.get::<String>(0)?,
                    unit_id: row.get::<String>(1)?,
                    tenant_id: row.get::<String>(2)?,
                    device_id: row.get::<Option<String>>(3)?,
                    temperature_tenths: row.get::<i64>(4)? as i32,
                    humidity_tenths: row.get::<Option<i64>>(5)?.map(|v| v as i32),
                    battery_percent: row.get::<Option<i64>>(6)?.map(|v| v as i32),
                    signal_strength: row.get::<Option<i64>>(7)?.map(|v| v as i32),
                    recorded_at: chrono::DateTime::parse_from_rfc3339(&row.get::<String>(8)?)
                        .map_err(|e| DbError::mapping(e.to_string()))?
                        .with_timezone(&chrono::Utc),
                    received_at: chrono::DateTime::parse_from_rfc3339(&row.get::<String>(9)?)
                        .map_err(|e| DbError::mapping(e.to_string()))?
                        .with_timezone(&chrono::Utc),
                    source: row.get::<String>(10)?,
                    raw_payload: row
                        .get::<Option<String>>(11)?
                        .and_then(|s| serde_json::from_str(&s).ok()),
                });
            }
        }

        Ok(latest)
    }
}
