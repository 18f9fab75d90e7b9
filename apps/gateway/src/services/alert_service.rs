// [apps/gateway/src/services/alert_service.rs]
//! Manual/API alert lifecycle: acknowledge and resolve. The Evaluator
//! (§4.2) already flips a unit back to `ok` when it resolves an alert
//! automatically as part of a `Restoring -> Ok` transition; this service
//! covers the other path, an operator resolving an alert directly through
//! the API while the unit is still mid-excursion, which must flip the
//! unit's FSM status too rather than leaving it stuck reporting a status
//! whose alert no longer exists.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use frostwatch_domain_alerting::Alert;
use frostwatch_domain_telemetry::UnitStatus;
use frostwatch_infra_db::{AlertRepository, DbError, TenancyRepository};
use serde_json::json;
use tracing::instrument;

use super::subscription_hub::SubscriptionHub;
use super::unit_state_cache::UnitStateCache;

pub struct AlertServices {
    pub alerts: Arc<AlertRepository>,
    pub tenancy: Arc<TenancyRepository>,
    pub unit_state_cache: Arc<UnitStateCache>,
    pub hub: Arc<SubscriptionHub>,
}

#[instrument(skip(services))]
pub async fn acknowledge(
    services: &AlertServices,
    tenant_id: &str,
    alert_id: &str,
    acknowledged_by: &str,
    now: DateTime<Utc>,
) -> Result<Alert, DbError> {
    services.alerts.acknowledge(tenant_id, alert_id, acknowledged_by, now).await?;
    services.alerts.get_by_id_scoped(tenant_id, alert_id).await?.ok_or(DbError::AlertNotFound)
}

/// Resolves the alert, then, if the owning unit is still reporting a
/// status that presumes an open alert (`excursion`/`alarm_active`/
/// `restoring`), flips it back to `ok` and refreshes the unit-state cache
/// so the dashboard doesn't keep showing a warning/critical state for an
/// alert that was just closed out from under it.
#[instrument(skip(services))]
pub async fn resolve(
    services: &AlertServices,
    tenant_id: &str,
    alert_id: &str,
    resolved_by: Option<&str>,
    resolution_text: Option<&str>,
    now: DateTime<Utc>,
) -> Result<Alert, DbError> {
    services.alerts.resolve(tenant_id, alert_id, resolved_by, resolution_text, now).await?;
    let alert = services.alerts.get_by_id_scoped(tenant_id, alert_id).await?.ok_or(DbError::AlertNotFound)?;

    if let Some(unit) = services.tenancy.get_unit_scoped(tenant_id, &alert.unit_id).await? {
        if matches!(unit.status, UnitStatus::Excursion | UnitStatus::AlarmActive | UnitStatus::Restoring) {
            services.tenancy.write_unit_transition(&unit.id, UnitStatus::Ok, now, 0).await?;
            services
                .unit_state_cache
                .refresh(tenant_id, &unit.id, UnitStatus::Ok, unit.last_reading_at, unit.last_temperature_tenths, "alert_manually_resolved")
                .await;
        }
    }

    services
        .hub
        .emit_alert_resolved(tenant_id, &alert.unit_id, json!({"alertId": alert.id, "resolvedBy": resolved_by}))
        .await;

    Ok(alert)
}
