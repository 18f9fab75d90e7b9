// [libs/infra/db/src/repositories/alert_repository.rs]
/*!
 * Alert Store: `createIfNoOpenAlert`, `transitionSeverity`, `acknowledge`,
 * `resolve`, `listByTenant`, `getByIdScoped`. Every mutation takes the
 * tenant id and filters on it; the open-alert-per-(unit,type) invariant is
 * enforced by checking before insert inside the same connection's logical
 * step the caller's transaction wraps.
 */

use crate::client::LedgerClient;
use crate::errors::DbError;
use chrono::{DateTime, Utc};
use frostwatch_domain_alerting::{Alert, AlertSeverity, AlertStatus, AlertType, TriggeringBound};
use libsql::params;
use tracing::instrument;
use uuid::Uuid;

pub struct AlertRepository {
    client: LedgerClient,
}

fn severity_as_str(severity: AlertSeverity) -> &'static str {
    match severity {
        AlertSeverity::Info => "info",
        AlertSeverity::Warning => "warning",
        AlertSeverity::Critical => "critical",
    }
}

fn parse_severity(raw: &str) -> AlertSeverity {
    match raw {
        "critical" => AlertSeverity::Critical,
        "warning" => AlertSeverity::Warning,
        _ => AlertSeverity::Info,
    }
}

fn status_as_str(status: AlertStatus) -> &'static str {
    match status {
        AlertStatus::Active => "active",
        AlertStatus::Acknowledged => "acknowledged",
        AlertStatus::Escalated => "escalated",
        AlertStatus::Resolved => "resolved",
    }
}

fn parse_status(raw: &str) -> AlertStatus {
    match raw {
        "acknowledged" => AlertStatus::Acknowledged,
        "escalated" => AlertStatus::Escalated,
        "resolved" => AlertStatus::Resolved,
        _ => AlertStatus::Active,
    }
}

fn bound_as_str(bound: TriggeringBound) -> &'static str {
    match bound {
        TriggeringBound::Min => "min",
        TriggeringBound::Max => "max",
    }
}

fn parse_bound(raw: &str) -> TriggeringBound {
    if raw == "min" {
        TriggeringBound::Min
    } else {
        TriggeringBound::Max
    }
}

fn alert_type_as_str(_alert_type: AlertType) -> &'static str {
    "temperature_excursion"
}

fn row_to_alert(row: &libsql::Row) -> Result<Alert, DbError> {
    Ok(Alert {
        id: row.get::<String>(0)?,
        tenant_id: row.get::<String>(1)?,
        unit_id: row.get::<String>(2)?,
        alert_type: AlertType::TemperatureExcursion,
        severity: parse_severity(&row.get::<String>(4)?),
        status: parse_status(&row.get::<String>(5)?),
        trigger_temperature_tenths: row.get::<i64>(6)? as i32,
        triggering_bound: parse_bound(&row.get::<String>(7)?),
        triggered_at: DateTime::parse_from_rfc3339(&row.get::<String>(8)?)
            .map_err(|e| DbError::mapping(e.to_string()))?
            .with_timezone(&Utc),
        acknowledged_at: row
            .get::<Option<String>>(9)?
            .and_then(|s| DateTime::parse_from_rfc3339(&s).ok())
            .map(|d| d.with_timezone(&Utc)),
        acknowledged_by: row.get::<Option<String>>(10)?,
        resolved_at: row
            .get::<Option<String>>(11)?
            .and_then(|s| DateTime::parse_from_rfc3339(&s).ok())
            .map(|d| d.with_timezone(&Utc)),
        resolved_by: row.get::<Option<String>>(12)?,
        resolution_text: row.get::<Option<String>>(13)?,
        corrective_action: row.get::<Option<String>>(14)?,
        escalation_level: row.get::<i64>(15)? as u32,
        last_escalated_at: row
            .get::<Option<String>>(16)?
            .and_then(|s| DateTime::parse_from_rfc3339(&s).ok())
            .map(|d| d.with_timezone(&Utc)),
        metadata: row
            .get::<Option<String>>(17)?
            .and_then(|s| serde_json::from_str(&s).ok()),
    })
}

const SELECT_COLUMNS: &str = r#"
    id, tenant_id, unit_id, alert_type, severity, status,
    trigger_temperature_tenths, triggering_bound, triggered_at,
    acknowledged_at, acknowledged_by, resolved_at, resolved_by,
    resolution_text, corrective_action, escalation_level,
    last_escalated_at, metadata
"#;

impl AlertRepository {
    pub fn new(client: LedgerClient) -> Self {
        Self { client }
    }

    /// Open statuses per the glossary: any of active/acknowledged/escalated.
    #[instrument(skip(self))]
    pub async fn get_open_alert(
        &self,
        unit_id: &str,
        alert_type: AlertType,
    ) -> Result<Option<Alert>, DbError> {
        let connection = self.client.get_connection()?;
        let sql = format!(
            "SELECT {SELECT_COLUMNS} FROM alerts WHERE unit_id = ?1 AND alert_type = ?2 AND status IN ('active', 'acknowledged', 'escalated') LIMIT 1"
        );
        let mut rows = connection
            .query(&sql, params![unit_id, alert_type_as_str(alert_type)])
            .await?;
        match rows.next().await? {
            Some(row) => Ok(Some(row_to_alert(&row)?)),
            None => Ok(None),
        }
    }

    /// Idempotent create: returns the existing open alert if one exists,
    /// otherwise inserts a new one at `warning` severity. Caller is
    /// expected to run this inside the same transaction as the unit
    /// status write so the check-then-insert is atomic with the FSM
    /// transition it accompanies.
    #[instrument(skip(self))]
    pub async fn create_if_no_open_alert(
        &self,
        tenant_id: &str,
        unit_id: &str,
        alert_type: AlertType,
        trigger_temperature_tenths: i32,
        triggering_bound: TriggeringBound,
        triggered_at: DateTime<Utc>,
    ) -> Result<Alert, DbError> {
        if let Some(existing) = self.get_open_alert(unit_id, alert_type).await? {
            return Ok(existing);
        }

        let connection = self.client.get_connection()?;
        let id = Uuid::new_v4().to_string();
        connection
            .execute(
                r#"
                INSERT INTO alerts (
                    id, tenant_id, unit_id, alert_type, severity, status,
                    trigger_temperature_tenths, triggering_bound, triggered_at,
                    escalation_level
                ) VALUES (?1, ?2, ?3, ?4, 'warning', 'active', ?5, ?6, ?7, 0)
                "#,
                params![
                    id.clone(),
                    tenant_id,
                    unit_id,
                    alert_type_as_str(alert_type),
                    trigger_temperature_tenths as i64,
                    bound_as_str(triggering_bound),
                    triggered_at.to_rfc3339(),
                ],
            )
            .await?;

        self.get_by_id_scoped(tenant_id, &id)
            .await?
            .ok_or(DbError::AlertNotFound)
    }

    /// Transaction-scoped variant of [`Self::get_open_alert`].
    #[instrument(skip(self, transaction))]
    pub async fn get_open_alert_tx(
        &self,
        transaction: &libsql::Transaction,
        unit_id: &str,
        alert_type: AlertType,
    ) -> Result<Option<Alert>, DbError> {
        let sql = format!(
            "SELECT {SELECT_COLUMNS} FROM alerts WHERE unit_id = ?1 AND alert_type = ?2 AND status IN ('active', 'acknowledged', 'escalated') LIMIT 1"
        );
        let mut rows = transaction
            .query(&sql, params![unit_id, alert_type_as_str(alert_type)])
            .await?;
        match rows.next().await? {
            Some(row) => Ok(Some(row_to_alert(&row)?)),
            None => Ok(None),
        }
    }

    /// Transaction-scoped variant of [`Self::create_if_no_open_alert`]; this
    /// is the one the Evaluator actually calls, so the open-alert check, the
    /// insert, and the caller's unit-status write all commit as one unit.
    #[instrument(skip(self, transaction))]
    pub async fn create_if_no_open_alert_tx(
        &self,
        transaction: &libsql::Transaction,
        tenant_id: &str,
        unit_id: &str,
        alert_type: AlertType,
        trigger_temperature_tenths: i32,
        triggering_bound: TriggeringBound,
        triggered_at: DateTime<Utc>,
    ) -> Result<Alert, DbError> {
        if let Some(existing) = self.get_open_alert_tx(transaction, unit_id, alert_type).await? {
            return Ok(existing);
        }

        let id = Uuid::new_v4().to_string();
        transaction
            .execute(
                r#"
                INSERT INTO alerts (
                    id, tenant_id, unit_id, alert_type, severity, status,
                    trigger_temperature_tenths, triggering_bound, triggered_at,
                    escalation_level
                ) VALUES (?1, ?2, ?3, ?4, 'warning', 'active', ?5, ?6, ?7, 0)
                "#,
                params![
                    id.clone(),
                    tenant_id,
                    unit_id,
                    alert_type_as_str(alert_type),
                    trigger_temperature_tenths as i64,
                    bound_as_str(triggering_bound),
                    triggered_at.to_rfc3339(),
                ],
            )
            .await?;

        self.get_by_id_scoped_tx(transaction, tenant_id, &id)
            .await?
            .ok_or(DbError::AlertNotFound)
    }

    /// Escalates the currently open alert for `unit_id` to `critical`,
    /// `escalationLevel=1`, `escalatedAt=now`. Used only by the
    /// `excursion -> alarmActive` transition; the Escalation Engine's own
    /// level bumps go through [`Self::bump_escalation_level`] instead.
    #[instrument(skip(self))]
    pub async fn transition_to_critical(&self, alert_id: &str, now: DateTime<Utc>) -> Result<(), DbError> {
        let connection = self.client.get_connection()?;
        connection
            .execute(
                r#"
                UPDATE alerts
                SET severity = 'critical', escalation_level = 1, last_escalated_at = ?1
                WHERE id = ?2
                "#,
                params![now.to_rfc3339(), alert_id],
            )
            .await?;
        Ok(())
    }

    /// Transaction-scoped variant of [`Self::transition_to_critical`].
    #[instrument(skip(self, transaction))]
    pub async fn transition_to_critical_tx(
        &self,
        transaction: &libsql::Transaction,
        alert_id: &str,
        now: DateTime<Utc>,
    ) -> Result<(), DbError> {
        transaction
            .execute(
                r#"
                UPDATE alerts
                SET severity = 'critical', escalation_level = 1, last_escalated_at = ?1
                WHERE id = ?2
                "#,
                params![now.to_rfc3339(), alert_id],
            )
            .await?;
        Ok(())
    }

    /// `resolve`: permitted from any non-resolved state; sets
    /// `status=resolved`, `resolvedAt=now`.
    #[instrument(skip(self))]
    pub async fn resolve(
        &self,
        tenant_id: &str,
        alert_id: &str,
        resolved_by: Option<&str>,
        resolution_text: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<(), DbError> {
        let connection = self.client.get_connection()?;
        let changed = connection
            .execute(
                r#"
                UPDATE alerts
                SET status = 'resolved', resolved_at = ?1, resolved_by = ?2, resolution_text = ?3
                WHERE id = ?4 AND tenant_id = ?5 AND status != 'resolved'
                "#,
                params![
                    now.to_rfc3339(),
                    resolved_by.map(|s| s.to_string()),
                    resolution_text.map(|s| s.to_string()),
                    alert_id,
                    tenant_id,
                ],
            )
            .await?;
        if changed == 0 {
            return Err(DbError::AlertNotFound);
        }
        Ok(())
    }

    /// Transaction-scoped variant of [`Self::resolve`].
    #[instrument(skip(self, transaction))]
    pub async fn resolve_tx(
        &self,
        transaction: &libsql::Transaction,
        tenant_id: &str,
        alert_id: &str,
        resolved_by: Option<&str>,
        resolution_text: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<(), DbError> {
        let changed = transaction
            .execute(
                r#"
                UPDATE alerts
                SET status = 'resolved', resolved_at = ?1, resolved_by = ?2, resolution_text = ?3
                WHERE id = ?4 AND tenant_id = ?5 AND status != 'resolved'
                "#,
                params![
                    now.to_rfc3339(),
                    resolved_by.map(|s| s.to_string()),
                    resolution_text.map(|s| s.to_string()),
                    alert_id,
                    tenant_id,
                ],
            )
            .await?;
        if changed == 0 {
            return Err(DbError::AlertNotFound);
        }
        Ok(())
    }

    /// No-op if already acknowledged.
    #[instrument(skip(self))]
    pub async fn acknowledge(
        &self,
        tenant_id: &str,
        alert_id: &str,
        acknowledged_by: &str,
        now: DateTime<Utc>,
    ) -> Result<(), DbError> {
        let connection = self.client.get_connection()?;
        connection
            .execute(
                r#"
                UPDATE alerts
                SET status = 'acknowledged', acknowledged_at = ?1, acknowledged_by = ?2
                WHERE id = ?3 AND tenant_id = ?4 AND status = 'active'
                "#,
                params![now.to_rfc3339(), acknowledged_by, alert_id, tenant_id],
            )
            .await?;
        Ok(())
    }

    /// Escalation Engine's level bump: sets `escalationLevel`, `status`
    /// (per [`frostwatch_domain_escalation::status_after_level_bump`]),
    /// and `lastEscalatedAt`.
    #[instrument(skip(self))]
    pub async fn bump_escalation_level(
        &self,
        alert_id: &str,
        new_level: u32,
        new_status: AlertStatus,
        now: DateTime<Utc>,
    ) -> Result<(), DbError> {
        let connection = self.client.get_connection()?;
        connection
            .execute(
                r#"
                UPDATE alerts
                SET escalation_level = ?1, status = ?2, last_escalated_at = ?3
                WHERE id = ?4
                "#,
                params![
                    new_level as i64,
                    status_as_str(new_status),
                    now.to_rfc3339(),
                    alert_id,
                ],
            )
            .await?;
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn get_by_id_scoped(&self, tenant_id: &str, alert_id: &str) -> Result<Option<Alert>, DbError> {
        let connection = self.client.get_connection()?;
        let sql = format!("SELECT {SELECT_COLUMNS} FROM alerts WHERE id = ?1 AND tenant_id = ?2");
        let mut rows = connection.query(&sql, params![alert_id, tenant_id]).await?;
        match rows.next().await? {
            Some(row) => Ok(Some(row_to_alert(&row)?)),
            None => Ok(None),
        }
    }

    /// Transaction-scoped variant of [`Self::get_by_id_scoped`].
    #[instrument(skip(self, transaction))]
    pub async fn get_by_id_scoped_tx(
        &self,
        transaction: &libsql::Transaction,
        tenant_id: &str,
        alert_id: &str,
    ) -> Result<Option<Alert>, DbError> {
        let sql = format!("SELECT {SELECT_COLUMNS} FROM alerts WHERE id = ?1 AND tenant_id = ?2");
        let mut rows = transaction.query(&sql, params![alert_id, tenant_id]).await?;
        match rows.next().await? {
            Some(row) => Ok(Some(row_to_alert(&row)?)),
            None => Ok(None),
        }
    }

    /// Candidates for the Escalation Engine's periodic sweep: alerts in
    /// `active`/`acknowledged` whose escalation level is below a rule's
    /// `maxLevel`. The time-since-last-escalation (fallback:
    /// time-since-trigger) filter and the rule join are applied by the
    /// caller, which already has the rule table loaded per tenant.
    #[instrument(skip(self))]
    pub async fn list_open_for_sweep(&self, tenant_id: &str) -> Result<Vec<Alert>, DbError> {
        let connection = self.client.get_connection()?;
        let sql = format!(
            "SELECT {SELECT_COLUMNS} FROM alerts WHERE tenant_id = ?1 AND status IN ('active', 'acknowledged')"
        );
        let mut rows = connection.query(&sql, params![tenant_id]).await?;
        let mut alerts = Vec::new();
        while let Some(row) = rows.next().await? {
            alerts.push(row_to_alert(&row)?);
        }
        Ok(alerts)
    }

    /// `listByTenant(filters, pagination)`: scoped to the tenant, further
    /// narrowed by whichever of `unitId`, `siteId`, `status`, `severity`,
    /// and `[since, until)` the caller supplies. `siteId` is resolved
    /// through a join against `units` since alerts only carry `unit_id`
    /// directly.
    #[instrument(skip(self))]
    pub async fn list_by_tenant(
        &self,
        tenant_id: &str,
        filters: &AlertQueryFilters,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Alert>, DbError> {
        let connection = self.client.get_connection()?;

        let columns: String = SELECT_COLUMNS
            .split(',')
            .map(|c| format!("a.{}", c.trim()))
            .collect::<Vec<_>>()
            .join(", ");

        let mut sql = format!(
            "SELECT {columns} FROM alerts a JOIN units u ON u.id = a.unit_id WHERE a.tenant_id = ?1"
        );
        let mut bound: Vec<libsql::Value> = vec![libsql::Value::from(tenant_id.to_string())];

        if let Some(unit_id) = &filters.unit_id {
            bound.push(libsql::Value::from(unit_id.clone()));
            sql.push_str(&format!(" AND a.unit_id = ?{}", bound.len()));
        }
        if let Some(site_id) = &filters.site_id {
            bound.push(libsql::Value::from(site_id.clone()));
            sql.push_str(&format!(" AND u.site_id = ?{}", bound.len()));
        }
        if let Some(status) = filters.status {
            bound.push(libsql::Value::from(status_as_str(status).to_string()));
            sql.push_str(&format!(" AND a.status = ?{}", bound.len()));
        }
        if let Some(severity) = filters.severity {
            bound.push(libsql::Value::from(severity_as_str(severity).to_string()));
            sql.push_str(&format!(" AND a.severity = ?{}", bound.len()));
        }
        if let Some(since) = filters.since {
            bound.push(libsql::Value::from(since.to_rfc3339()));
            sql.push_str(&format!(" AND a.triggered_at >= ?{}", bound.len()));
        }
        if let Some(until) = filters.until {
            bound.push(libsql::Value::from(until.to_rfc3339()));
            sql.push_str(&format!(" AND a.triggered_at < ?{}", bound.len()));
        }

        bound.push(libsql::Value::from(limit));
        sql.push_str(&format!(" ORDER BY a.triggered_at DESC LIMIT ?{}", bound.len()));
        bound.push(libsql::Value::from(offset));
        sql.push_str(&format!(" OFFSET ?{}", bound.len()));

        let mut rows = connection.query(&sql, bound).await?;
        let mut out = Vec::new();
        while let Some(row) = rows.next().await? {
            out.push(row_to_alert(&row)?);
        }
        Ok(out)
    }
}

/// Filter set for [`AlertRepository::list_by_tenant`]; every field is
/// optional and narrows the tenant-scoped query further. `since`/`until`
/// bound `triggered_at` as a half-open `[since, until)` range.
#[derive(Debug, Clone, Default)]
pub struct AlertQueryFilters {
    pub unit_id: Option<String>,
    pub site_id: Option<String>,
    pub status: Option<AlertStatus>,
    pub severity: Option<AlertSeverity>,
    pub since: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
}
