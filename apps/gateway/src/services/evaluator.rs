// [apps/gateway/src/services/evaluator.rs]
//! Wraps the pure `frostwatch_domain_alerting::evaluate` transition grammar
//! with the repository-driven orchestration section 4.2 describes: load the
//! unit, resolve its effective thresholds, evaluate the latest reading,
//! persist the transition, and carry out the alert-store side effect the
//! transition implies.

use chrono::{DateTime, Utc};
use frostwatch_domain_alerting::{evaluate, Alert, AlertAction, AlertType, EvaluationResult};
use frostwatch_domain_telemetry::{Unit, UnitStatus};
use frostwatch_infra_db::{AlertRepository, DbError, LedgerClient, TenancyRepository, ThresholdRepository};
use tracing::{debug, warn};

use super::subscription_hub::SubscriptionHub;
use super::unit_state_cache::UnitStateCache;
use serde_json::json;
use std::sync::Arc;

pub struct EvaluatorServices {
    pub ledger: LedgerClient,
    pub tenancy: Arc<TenancyRepository>,
    pub thresholds: Arc<ThresholdRepository>,
    pub alerts: Arc<AlertRepository>,
    pub hub: Arc<SubscriptionHub>,
    pub unit_state_cache: Arc<UnitStateCache>,
}

/// Which alert-store side effect [`apply_alert_action`] carried out, so the
/// caller can fire the matching stream event only once the transaction that
/// wrote it has actually committed.
enum AlertSideEffect {
    None,
    Triggered(Box<Alert>),
    Escalated { alert_id: String },
    Resolved { alert_id: String },
}

/// Runs one reading through the Evaluator for `unit`, persisting whatever
/// transition results and firing the alert-store side effect and stream
/// events it implies. A unit in a non-evaluable status (`manualRequired`,
/// `monitoringInterrupted`, `offline`) is skipped without error, per
/// `UnitStatus::is_ok_equivalent` governing which statuses the Evaluator
/// drives transitions from.
pub async fn evaluate_unit_reading(
    services: &EvaluatorServices,
    unit: &Unit,
    temperature_tenths: i32,
    recorded_at: DateTime<Utc>,
    now: DateTime<Utc>,
) -> Result<Option<EvaluationResult>, frostwatch_infra_db::DbError> {
    if !matches!(
        unit.status,
        UnitStatus::Ok | UnitStatus::Excursion | UnitStatus::AlarmActive | UnitStatus::Restoring
    ) {
        debug!(unit_id = %unit.id, status = ?unit.status, "unit status is not evaluable, skipping");
        return Ok(None);
    }

    let thresholds = match services
        .thresholds
        .resolve(&unit.tenant_id, &unit.site_id, &unit.id, unit.min_temp_tenths, unit.max_temp_tenths)
        .await
    {
        Ok(thresholds) => thresholds,
        Err(_) => {
            warn!(unit_id = %unit.id, "no thresholds resolved, skipping evaluation for this unit");
            return Ok(None);
        }
    };

    let result = match evaluate(
        unit.status,
        unit.consecutive_in_band_readings,
        temperature_tenths,
        &thresholds,
        unit.status_changed_at,
        now,
    ) {
        Ok(result) => result,
        Err(error) => {
            warn!(unit_id = %unit.id, %error, "evaluator rejected unit status");
            return Ok(None);
        }
    };

    let status_changed_at = if result.new_status == result.previous_status {
        unit.status_changed_at
    } else {
        now
    };

    // The unit-status write and the alert-status mutation it implies must
    // commit together: a crash between the two would otherwise leave a unit
    // flagged `excursion` with no corresponding alert, or an open alert
    // against a unit that reports `ok`.
    let transaction = services.ledger.begin_transaction().await?;

    services
        .tenancy
        .write_unit_transition_tx(&transaction, &unit.id, result.new_status, status_changed_at, result.consecutive_in_band_readings)
        .await?;

    let side_effect = apply_alert_action(&transaction, services, unit, &result, temperature_tenths, recorded_at, now).await?;

    transaction.commit().await.map_err(|e| DbError::TransactionError(e.to_string()))?;

    match side_effect {
        AlertSideEffect::None => {}
        AlertSideEffect::Triggered(alert) => {
            services
                .hub
                .emit_alert_triggered(&unit.tenant_id, &unit.id, json!({"alert": alert, "unitId": unit.id}))
                .await;
        }
        AlertSideEffect::Escalated { alert_id } => {
            services
                .hub
                .emit_alert_escalated(
                    &unit.tenant_id,
                    &unit.id,
                    json!({"alertId": alert_id, "unitId": unit.id, "severity": "critical"}),
                )
                .await;
        }
        AlertSideEffect::Resolved { alert_id } => {
            services
                .hub
                .emit_alert_resolved(&unit.tenant_id, &unit.id, json!({"alertId": alert_id, "unitId": unit.id}))
                .await;
        }
    }

    services
        .unit_state_cache
        .refresh(
            &unit.tenant_id,
            &unit.id,
            result.new_status,
            Some(recorded_at),
            Some(temperature_tenths),
            "reading_evaluated",
        )
        .await;

    Ok(Some(result))
}

async fn apply_alert_action(
    transaction: &libsql::Transaction,
    services: &EvaluatorServices,
    unit: &Unit,
    result: &EvaluationResult,
    temperature_tenths: i32,
    triggered_at: DateTime<Utc>,
    now: DateTime<Utc>,
) -> Result<AlertSideEffect, DbError> {
    match result.alert_action {
        AlertAction::None => Ok(AlertSideEffect::None),
        AlertAction::OpenWarning { triggering_bound } => {
            let alert = services
                .alerts
                .create_if_no_open_alert_tx(
                    transaction,
                    &unit.tenant_id,
                    &unit.id,
                    AlertType::TemperatureExcursion,
                    temperature_tenths,
                    triggering_bound,
                    triggered_at,
                )
                .await?;
            Ok(AlertSideEffect::Triggered(Box::new(alert)))
        }
        AlertAction::EscalateToCritical => {
            if let Some(alert) = services.alerts.get_open_alert_tx(transaction, &unit.id, AlertType::TemperatureExcursion).await? {
                services.alerts.transition_to_critical_tx(transaction, &alert.id, now).await?;
                Ok(AlertSideEffect::Escalated { alert_id: alert.id })
            } else {
                Ok(AlertSideEffect::None)
            }
        }
        AlertAction::Resolve => {
            if let Some(alert) = services.alerts.get_open_alert_tx(transaction, &unit.id, AlertType::TemperatureExcursion).await? {
                services.alerts.resolve_tx(transaction, &unit.tenant_id, &alert.id, None, None, now).await?;
                Ok(AlertSideEffect::Resolved { alert_id: alert.id })
            } else {
                Ok(AlertSideEffect::None)
            }
        }
    }
}
