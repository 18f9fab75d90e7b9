// [libs/infra/db/src/repositories/tenancy_repository.rs]
/*!
 * Hierarchy reads and the unit status/counter writes the Evaluator and the
 * offline sweep perform. Every leaf lookup here validates the full
 * tenant -> site -> area -> unit chain; cross-tenant access resolves to an
 * empty result, never an error, per the tenancy invariant.
 */

use crate::client::LedgerClient;
use crate::errors::DbError;
use chrono::{DateTime, Utc};
use frostwatch_domain_telemetry::{TemperatureUnit, Unit, UnitStatus};
use libsql::params;
use tracing::instrument;

pub struct TenancyRepository {
    client: LedgerClient,
}

fn parse_unit_status(raw: &str) -> UnitStatus {
    match raw {
        "excursion" => UnitStatus::Excursion,
        "alarm_active" => UnitStatus::AlarmActive,
        "restoring" => UnitStatus::Restoring,
        "manual_required" => UnitStatus::ManualRequired,
        "monitoring_interrupted" => UnitStatus::MonitoringInterrupted,
        "offline" => UnitStatus::Offline,
        _ => UnitStatus::Ok,
    }
}

pub fn unit_status_as_str(status: UnitStatus) -> &'static str {
    match status {
        UnitStatus::Ok => "ok",
        UnitStatus::Excursion => "excursion",
        UnitStatus::AlarmActive => "alarm_active",
        UnitStatus::Restoring => "restoring",
        UnitStatus::ManualRequired => "manual_required",
        UnitStatus::MonitoringInterrupted => "monitoring_interrupted",
        UnitStatus::Offline => "offline",
    }
}

fn parse_temperature_unit(raw: &str) -> TemperatureUnit {
    if raw.eq_ignore_ascii_case("c") {
        TemperatureUnit::C
    } else {
        TemperatureUnit::F
    }
}

impl TenancyRepository {
    pub fn new(client: LedgerClient) -> Self {
        Self { client }
    }

    /// Loads a unit, scoped to the asserting tenant. Returns `Ok(None)`
    /// (not an error) when the unit does not exist or belongs to another
    /// tenant, matching the "cross-tenant reads return empty" invariant.
    #[instrument(skip(self))]
    pub async fn get_unit_scoped(&self, tenant_id: &str, unit_id: &str) -> Result<Option<Unit>, DbError> {
        let connection = self.client.get_connection()?;
        let mut rows = connection
            .query(
                r#"
                SELECT id, area_id, site_id, tenant_id, display_name,
                       min_temp_tenths, max_temp_tenths, temperature_unit, status,
                       last_reading_at, last_temperature_tenths, status_changed_at,
                       consecutive_in_band_readings, active
                FROM units
                WHERE id = ?1 AND tenant_id = ?2 AND active = 1
                "#,
                params![unit_id, tenant_id],
            )
            .await?;

        let Some(row) = rows.next().await? else {
            return Ok(None);
        };

        Ok(Some(Unit {
            id: row.get::<String>(0)?,
            area_id: row.get::<String>(1)?,
            site_id: row.get::<String>(2)?,
            tenant_id: row.get::<String>(3)?,
            display_name: row.get::<String>(4)?,
            min_temp_tenths: row.get::<Option<i64>>(5)?.map(|v| v as i32),
            max_temp_tenths: row.get::<Option<i64>>(6)?.map(|v| v as i32),
            temperature_unit: parse_temperature_unit(&row.get::<String>(7)?),
            status: parse_unit_status(&row.get::<String>(8)?),
            last_reading_at: row
                .get::<Option<String>>(9)?
                .and_then(|s| DateTime::parse_from_rfc3339(&s).ok())
                .map(|d| d.with_timezone(&Utc)),
            last_temperature_tenths: row.get::<Option<i64>>(10)?.map(|v| v as i32),
            status_changed_at: DateTime::parse_from_rfc3339(&row.get::<String>(11)?)
                .map_err(|e| DbError::mapping(e.to_string()))?
                .with_timezone(&Utc),
            consecutive_in_band_readings: row.get::<i64>(12)? as u32,
            active: row.get::<i64>(13)? != 0,
        }))
    }

    /// Silent filter: of `candidate_unit_ids`, returns only those owned by
    /// `tenant_id`. Never errors on a foreign id; it is simply dropped.
    #[instrument(skip(self, candidate_unit_ids))]
    pub async fn filter_units_owned_by_tenant(
        &self,
        tenant_id: &str,
        candidate_unit_ids: &[String],
    ) -> Result<Vec<String>, DbError> {
        if candidate_unit_ids.is_empty() {
            return Ok(Vec::new());
        }
        let connection = self.client.get_connection()?;
        let placeholders: Vec<String> = (1..=candidate_unit_ids.len()).map(|i| format!("?{}", i + 1)).collect();
        let sql = format!(
            "SELECT id FROM units WHERE tenant_id = ?1 AND active = 1 AND id IN ({})",
            placeholders.join(", ")
        );

        let mut query_params: Vec<libsql::Value> = vec![libsql::Value::from(tenant_id.to_string())];
        query_params.extend(
            candidate_unit_ids
                .iter()
                .map(|id| libsql::Value::from(id.clone())),
        );

        let mut rows = connection.query(&sql, query_params).await?;
        let mut owned = Vec::new();
        while let Some(row) = rows.next().await? {
            owned.push(row.get::<String>(0)?);
        }
        Ok(owned)
    }

    #[instrument(skip(self))]
    pub async fn update_last_reading(
        &self,
        unit_id: &str,
        recorded_at: DateTime<Utc>,
        temperature_tenths: i32,
    ) -> Result<(), DbError> {
        let connection = self.client.get_connection()?;
        connection
            .execute(
                "UPDATE units SET last_reading_at = ?1, last_temperature_tenths = ?2 WHERE id = ?3",
                params![recorded_at.to_rfc3339(), temperature_tenths as i64, unit_id],
            )
            .await?;
        Ok(())
    }

    /// Persists the outcome of one Evaluator transition: the new status,
    /// the trailing in-band counter, and the status-change timestamp
    /// (bumped only when `status` actually changed, by convention of the
    /// caller passing the pre-transition value when it is a no-op).
    #[instrument(skip(self))]
    pub async fn write_unit_transition(
        &self,
        unit_id: &str,
        new_status: UnitStatus,
        status_changed_at: DateTime<Utc>,
        consecutive_in_band_readings: u32,
    ) -> Result<(), DbError> {
        let connection = self.client.get_connection()?;
        connection
            .execute(
                r#"
                UPDATE units
                SET status = ?1, status_changed_at = ?2, consecutive_in_band_readings = ?3
                WHERE id = ?4
                "#,
                params![
                    unit_status_as_str(new_status),
                    status_changed_at.to_rfc3339(),
                    consecutive_in_band_readings as i64,
                    unit_id
                ],
            )
            .await?;
        Ok(())
    }

    /// Transaction-scoped variant of [`Self::write_unit_transition`]. The
    /// Evaluator runs this against the same transaction as its alert-store
    /// mutation so the two commit atomically.
    #[instrument(skip(self, transaction))]
    pub async fn write_unit_transition_tx(
        &self,
        transaction: &libsql::Transaction,
        unit_id: &str,
        new_status: UnitStatus,
        status_changed_at: DateTime<Utc>,
        consecutive_in_band_readings: u32,
    ) -> Result<(), DbError> {
        transaction
            .execute(
                r#"
                UPDATE units
                SET status = ?1, status_changed_at = ?2, consecutive_in_band_readings = ?3
                WHERE id = ?4
                "#,
                params![
                    unit_status_as_str(new_status),
                    status_changed_at.to_rfc3339(),
                    consecutive_in_band_readings as i64,
                    unit_id
                ],
            )
            .await?;
        Ok(())
    }

    /// Active tenant ids, for daemons (the escalation sweep) that need to
    /// iterate every tenant rather than one scoped to a single request.
    #[instrument(skip(self))]
    pub async fn list_active_tenant_ids(&self) -> Result<Vec<String>, DbError> {
        let connection = self.client.get_connection()?;
        let mut rows = connection.query("SELECT id FROM tenants WHERE active = 1", ()).await?;
        let mut ids = Vec::new();
        while let Some(row) = rows.next().await? {
            ids.push(row.get::<String>(0)?);
        }
        Ok(ids)
    }

    /// Offline sweep: flips units past `offline_timeout` since their last
    /// reading to `offline`, skipping units already in a manual/offline
    /// state. Returns `(unit_id, tenant_id)` pairs for the ids flipped, so
    /// the cache/event layer can react without a second per-unit lookup.
    #[instrument(skip(self))]
    pub async fn sweep_offline_units(&self, offline_timeout_seconds: i64) -> Result<Vec<(String, String)>, DbError> {
        let connection = self.client.get_connection()?;
        let mut rows = connection
            .query(
                r#"
                SELECT id, tenant_id FROM units
                WHERE active = 1
                  AND status NOT IN ('offline', 'manual_required')
                  AND last_reading_at IS NOT NULL
                  AND (julianday('now') - julianday(last_reading_at)) * 86400.0 > ?1
                "#,
                params![offline_timeout_seconds as f64],
            )
            .await?;

        let mut flipped = Vec::new();
        while let Some(row) = rows.next().await? {
            flipped.push((row.get::<String>(0)?, row.get::<String>(1)?));
        }

        for (id, _tenant_id) in &flipped {
            connection
                .execute(
                    "UPDATE units SET status = 'offline', status_changed_at = datetime('now') WHERE id = ?1",
                    params![id.clone()],
                )
                .await?;
        }

        Ok(flipped)
    }
}
