// [apps/gateway/src/services/escalation_engine.rs]
//! Wires `frostwatch_domain_escalation::engine`'s pure decision grammar to
//! the `EscalationRepository`/`AlertRepository` round trips section 4.6
//! describes: the periodic sweep, the ordered `escalate` checks, and the
//! per-recipient dispatch that enqueues an SMS job per accepted contact. A
//! failed escalation on one alert never aborts the sweep of the others —
//! every per-alert branch logs and continues.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{DateTime, Utc};
use frostwatch_domain_alerting::{Alert, AlertStatus};
use frostwatch_domain_escalation::{
    escalation_cadence_elapsed, evaluate_escalation, resolve_recipients, status_after_level_bump, CooldownConfig,
    EscalateOutcome, EscalateSkipReason, EscalateTrigger, EscalationContact, RecipientDecision,
};
use frostwatch_infra_db::{AlertRepository, EscalationRepository};
use serde_json::json;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument, warn};

use super::job_queue::{JobQueue, SmsJobPayload, SMS_JOB_KIND};
use super::subscription_hub::SubscriptionHub;

const SWEEP_INTERVAL: StdDuration = StdDuration::from_secs(60);

pub struct EscalationServices {
    pub alerts: Arc<AlertRepository>,
    pub escalation: Arc<EscalationRepository>,
    pub jobs: Arc<dyn JobQueue>,
    pub hub: Arc<SubscriptionHub>,
    pub cooldowns: CooldownConfig,
}

/// One `escalate(alertId, tenantId)` call: the ordered checks of §4.6,
/// followed by the recipient tier resolution and per-recipient dispatch.
#[instrument(skip(services), fields(alert_id = %alert.id))]
pub async fn escalate(
    services: &EscalationServices,
    alert: &Alert,
    trigger: EscalateTrigger,
    now: DateTime<Utc>,
) -> Result<EscalateOutcome, frostwatch_infra_db::DbError> {
    let rule = services.escalation.find_rule_for_severity(&alert.tenant_id, alert.severity).await?;
    let cadence_elapsed = rule.as_ref().is_some_and(|r| escalation_cadence_elapsed(alert, r, now));
    let alert_in_cooldown = services.escalation.alert_in_cooldown(&alert.id, services.cooldowns.per_alert_minutes, now).await?;
    let tenant_attempts = services
        .escalation
        .tenant_attempt_count_in_window(&alert.tenant_id, services.cooldowns.org_window_minutes, now)
        .await?;
    let tenant_rate_limited = tenant_attempts >= services.cooldowns.max_sms_per_org_window;

    let target_level = match evaluate_escalation(alert, trigger, cadence_elapsed, alert_in_cooldown, tenant_rate_limited, rule.as_ref()) {
        Ok(level) => level,
        Err(outcome) => {
            debug!(skip_reason = ?outcome.skip_reason, "escalation skipped");
            return Ok(outcome);
        }
    };
    // `rule` is `Some` whenever `evaluate_escalation` returns `Ok`.
    let rule = rule.expect("evaluate_escalation succeeded without a rule");

    services.alerts.bump_escalation_level(&alert.id, target_level, status_after_level_bump(target_level), now).await?;
    services
        .hub
        .emit_alert_escalated(&alert.tenant_id, &alert.unit_id, json!({"alertId": alert.id, "newLevel": target_level}))
        .await;

    let priority_threshold = rule.priority_threshold_for(target_level).unwrap_or(i32::MAX);
    let candidates = services.escalation.list_eligible_contacts(&alert.tenant_id, priority_threshold).await?;

    let mut user_cooldowns = std::collections::HashMap::new();
    for contact in &candidates {
        if let Some(user_id) = &contact.linked_user_id {
            let in_cooldown = services.escalation.user_in_cooldown(user_id, services.cooldowns.per_user_minutes, now).await?;
            user_cooldowns.insert(user_id.clone(), in_cooldown);
        }
    }

    let decisions = resolve_recipients(&candidates, priority_threshold, |c| {
        c.linked_user_id.as_ref().map(|u| user_cooldowns.get(u).copied().unwrap_or(false)).unwrap_or(false)
    });

    let mut sms_queued = 0u32;
    let mut recipients_skipped = Vec::new();

    for decision in decisions {
        match decision {
            RecipientDecision::Skip(_, reason) => recipients_skipped.push(reason),
            RecipientDecision::Dispatch(contact) => {
                match dispatch_one_recipient(services, alert, contact, target_level, now).await {
                    Ok(()) => sms_queued += 1,
                    Err(error) => warn!(contact_id = %contact.id, %error, "failed to enqueue escalation SMS, continuing"),
                }
            }
        }
    }

    Ok(EscalateOutcome {
        success: true,
        new_level: target_level,
        sms_queued,
        skip_reason: None,
        recipients_skipped,
    })
}

async fn dispatch_one_recipient(
    services: &EscalationServices,
    alert: &Alert,
    contact: &EscalationContact,
    level: u32,
    now: DateTime<Utc>,
) -> Result<(), frostwatch_infra_db::DbError> {
    let delivery = services.escalation.insert_pending_delivery(&alert.tenant_id, &alert.id, contact, level, now).await?;

    let payload = SmsJobPayload {
        tenant_id: alert.tenant_id.clone(),
        phone: contact.phone.clone(),
        message: format!(
            "FROSTWATCH alert {} on unit {} (level {}): out-of-range temperature detected.",
            alert.id, alert.unit_id, level
        ),
        alert_id: alert.id.clone(),
        delivery_id: delivery.id.clone(),
        user_id: contact.linked_user_id.clone(),
        alert_type: "temperature_excursion".to_string(),
    };

    let job_id = services
        .jobs
        .enqueue(SMS_JOB_KIND, &serde_json::to_value(payload).expect("SmsJobPayload always serializes"), now)
        .await?;
    debug!(job_id, delivery_id = %delivery.id, "enqueued sms dispatch job");
    Ok(())
}

/// Manual escalate: same ordered checks, but bypasses the scheduler's
/// time-based candidate filter by being invoked directly rather than
/// through [`run_sweep_once`].
pub async fn manual_escalate(
    services: &EscalationServices,
    tenant_id: &str,
    alert_id: &str,
    now: DateTime<Utc>,
) -> Result<EscalateOutcome, frostwatch_infra_db::DbError> {
    let Some(alert) = services.alerts.get_by_id_scoped(tenant_id, alert_id).await? else {
        return Ok(EscalateOutcome::skipped(EscalateSkipReason::NoRuleForSeverity, 0));
    };
    escalate(services, &alert, EscalateTrigger::Manual, now).await
}

/// One sweep pass: candidates are open alerts whose escalation still has
/// headroom; the per-alert cooldown and rate limit decide the rest inside
/// `escalate` itself, so the sweep's own candidate filter only needs to be
/// a coarse "still open" query (`AlertRepository::list_open_for_sweep`)
/// rather than re-deriving the cooldown windows twice.
#[instrument(skip(services, tenant_ids))]
async fn run_sweep_once(services: &EscalationServices, tenant_ids: &[String]) {
    let now = Utc::now();
    for tenant_id in tenant_ids {
        let candidates = match services.alerts.list_open_for_sweep(tenant_id).await {
            Ok(alerts) => alerts,
            Err(error) => {
                warn!(tenant_id, %error, "failed to list alerts for escalation sweep, skipping tenant this tick");
                continue;
            }
        };

        for alert in candidates {
            if matches!(alert.status, AlertStatus::Resolved) {
                continue;
            }
            if let Err(error) = escalate(services, &alert, EscalateTrigger::Automatic, now).await {
                warn!(alert_id = %alert.id, %error, "escalation sweep failed for alert, continuing sweep");
            }
        }
    }
}

/// Async source of the tenant ids a sweep tick should cover, re-invoked
/// every tick so a newly onboarded tenant is picked up without a process
/// restart.
pub type TenantIdsSource = Box<dyn Fn() -> Pin<Box<dyn Future<Output = Vec<String>> + Send>> + Send + Sync>;

/// Daemon loop: ticks every [`SWEEP_INTERVAL`] until `cancellation` fires.
pub async fn run_sweep_loop(
    services: Arc<EscalationServices>,
    tenant_ids: TenantIdsSource,
    cancellation: CancellationToken,
) {
    let mut ticker = tokio::time::interval(SWEEP_INTERVAL);
    loop {
        tokio::select! {
            _ = ticker.tick() => run_sweep_once(&services, &tenant_ids().await).await,
            _ = cancellation.cancelled() => {
                debug!("escalation sweep loop shutting down");
                break;
            }
        }
    }
}
