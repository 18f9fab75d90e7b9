// [apps/gateway/src/handlers/alerts.rs]
//! GET /api/v1/alerts, POST /api/v1/alerts/:id/acknowledge,
//! POST /api/v1/alerts/:id/resolve, POST /api/v1/alerts/:id/escalate.
//! Query/ack/resolve are the three alert-facing operations this core
//! owns an HTTP surface for (§7); escalate exposes the manual trigger
//! path the escalation engine already implements (§4.6).

use axum::extract::{Path, Query, State};
use axum::Json;
use chrono::{DateTime, Utc};
use frostwatch_domain_alerting::{Alert, AlertSeverity, AlertStatus};
use frostwatch_domain_escalation::EscalateOutcome;
use frostwatch_infra_db::AlertQueryFilters;
use serde::Deserialize;
use tracing::instrument;

use crate::errors::CoreError;
use crate::services::{alert_service, escalation_engine};
use crate::state::AppState;
use crate::tenant::TenantId;

#[derive(Debug, Deserialize)]
pub struct AlertListQuery {
    pub unit_id: Option<String>,
    pub site_id: Option<String>,
    pub status: Option<String>,
    pub severity: Option<String>,
    pub since: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

fn parse_status(raw: &str) -> Result<AlertStatus, CoreError> {
    match raw {
        "active" => Ok(AlertStatus::Active),
        "acknowledged" => Ok(AlertStatus::Acknowledged),
        "escalated" => Ok(AlertStatus::Escalated),
        "resolved" => Ok(AlertStatus::Resolved),
        other => Err(CoreError::InvalidInput(format!("unknown alert status '{other}'"))),
    }
}

fn parse_severity(raw: &str) -> Result<AlertSeverity, CoreError> {
    match raw {
        "info" => Ok(AlertSeverity::Info),
        "warning" => Ok(AlertSeverity::Warning),
        "critical" => Ok(AlertSeverity::Critical),
        other => Err(CoreError::InvalidInput(format!("unknown alert severity '{other}'"))),
    }
}

const DEFAULT_PAGE_SIZE: i64 = 50;
const MAX_PAGE_SIZE: i64 = 500;

#[instrument(skip(state, query), fields(tenant_id = %tenant.0))]
pub async fn list_alerts(
    State(state): State<AppState>,
    tenant: TenantId,
    Query(query): Query<AlertListQuery>,
) -> Result<Json<Vec<Alert>>, CoreError> {
    let filters = AlertQueryFilters {
        unit_id: query.unit_id,
        site_id: query.site_id,
        status: query.status.as_deref().map(parse_status).transpose()?,
        severity: query.severity.as_deref().map(parse_severity).transpose()?,
        since: query.since,
        until: query.until,
    };

    let limit = query.limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);
    let offset = query.offset.unwrap_or(0).max(0);

    let alerts = state.alerts.list_by_tenant(&tenant.0, &filters, limit, offset).await?;
    Ok(Json(alerts))
}

#[derive(Debug, Deserialize)]
pub struct AcknowledgeRequest {
    pub acknowledged_by: String,
}

#[instrument(skip(state, body), fields(tenant_id = %tenant.0, alert_id = %alert_id))]
pub async fn acknowledge_alert(
    State(state): State<AppState>,
    tenant: TenantId,
    Path(alert_id): Path<String>,
    Json(body): Json<AcknowledgeRequest>,
) -> Result<Json<Alert>, CoreError> {
    let alert = alert_service::acknowledge(&state.alert_services, &tenant.0, &alert_id, &body.acknowledged_by, Utc::now()).await?;
    Ok(Json(alert))
}

#[derive(Debug, Default, Deserialize)]
pub struct ResolveRequest {
    pub resolved_by: Option<String>,
    pub resolution_text: Option<String>,
}

#[instrument(skip(state, body), fields(tenant_id = %tenant.0, alert_id = %alert_id))]
pub async fn resolve_alert(
    State(state): State<AppState>,
    tenant: TenantId,
    Path(alert_id): Path<String>,
    Json(body): Json<ResolveRequest>,
) -> Result<Json<Alert>, CoreError> {
    let alert = alert_service::resolve(
        &state.alert_services,
        &tenant.0,
        &alert_id,
        body.resolved_by.as_deref(),
        body.resolution_text.as_deref(),
        Utc::now(),
    )
    .await?;
    Ok(Json(alert))
}

#[instrument(skip(state), fields(tenant_id = %tenant.0, alert_id = %alert_id))]
pub async fn escalate_alert(
    State(state): State<AppState>,
    tenant: TenantId,
    Path(alert_id): Path<String>,
) -> Result<Json<EscalateOutcome>, CoreError> {
    let outcome = escalation_engine::manual_escalate(&state.escalation_services, &tenant.0, &alert_id, Utc::now()).await?;
    Ok(Json(outcome))
}
