// [libs/domain/escalation/src/engine.rs]
//! Pure decision grammar for one `escalate` call. Every input the ordered
//! checks need (cooldown windows already evaluated against the clock, the
//! rule row, the candidate recipient list) is handed in by the caller; this
//! module owns only the ordering and the level/threshold arithmetic. Loading
//! rows, running the recency queries, and writing the `NotificationDelivery`
//! rows is the gateway's `services::escalation_engine` concern.

use chrono::{DateTime, Utc};
use frostwatch_domain_alerting::{Alert, AlertStatus};

use crate::config::SeverityEscalationRule;
use crate::contact::EscalationContact;
use crate::outcome::{EscalateOutcome, EscalateSkipReason, RecipientSkipReason};

/// Whether `manual` bypasses the per-alert cooldown check (the only
/// cooldown a manual escalate is explicitly permitted to override).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EscalateTrigger {
    Automatic,
    Manual,
}

/// Time-based candidate filter for the automatic sweep: an alert is not
/// due for another escalation pass until `rule.escalate_after_minutes` have
/// elapsed since its last escalation, or since it triggered if it has never
/// escalated. Manual escalate bypasses this filter entirely rather than
/// consulting it, so it is not exposed as a cooldown check on `trigger`.
pub fn escalation_cadence_elapsed(alert: &Alert, rule: &SeverityEscalationRule, now: DateTime<Utc>) -> bool {
    let since = alert.last_escalated_at.unwrap_or(alert.triggered_at);
    now.signed_duration_since(since).num_minutes() >= rule.escalate_after_minutes
}

/// Evaluates the ordered checks (1)-(4) of `escalate`: escalation cadence,
/// per-alert cooldown, tenant rate limit, rule lookup, level bump. Steps
/// (5)-(6) (recipient tier + per-recipient dispatch) are
/// [`resolve_recipients`], kept separate because they need the winning
/// level this function computes.
pub fn evaluate_escalation(
    alert: &Alert,
    trigger: EscalateTrigger,
    cadence_elapsed: bool,
    alert_in_cooldown: bool,
    tenant_rate_limited: bool,
    rule: Option<&SeverityEscalationRule>,
) -> Result<u32, EscalateOutcome> {
    if trigger == EscalateTrigger::Automatic && !cadence_elapsed {
        return Err(EscalateOutcome::skipped(
            EscalateSkipReason::EscalationCadenceNotElapsed,
            alert.escalation_level,
        ));
    }

    if trigger == EscalateTrigger::Automatic && alert_in_cooldown {
        return Err(EscalateOutcome::skipped(
            EscalateSkipReason::AlertInCooldown,
            alert.escalation_level,
        ));
    }

    if tenant_rate_limited {
        return Err(EscalateOutcome::skipped(
            EscalateSkipReason::TenantRateLimited,
            alert.escalation_level,
        ));
    }

    let rule = rule.ok_or_else(|| {
        EscalateOutcome::skipped(EscalateSkipReason::NoRuleForSeverity, alert.escalation_level)
    })?;

    if alert.escalation_level >= rule.max_level {
        return Err(EscalateOutcome::skipped(
            EscalateSkipReason::AlreadyAtMaxLevel,
            alert.escalation_level,
        ));
    }

    let target_level = match trigger {
        EscalateTrigger::Automatic => alert.escalation_level + 1,
        // Clamped to [current+1, rule.maxLevel].
        EscalateTrigger::Manual => (alert.escalation_level + 1).min(rule.max_level),
    };

    Ok(target_level)
}

/// Whether a level bump should also flip `status -> escalated`: only when
/// the new level is greater than zero, matching "only when level > 0".
pub fn status_after_level_bump(new_level: u32) -> AlertStatus {
    if new_level > 0 {
        AlertStatus::Escalated
    } else {
        AlertStatus::Active
    }
}

/// One candidate recipient's dispatch decision: either accepted (with the
/// contact to dispatch to) or skipped (with the reason, never fatal to the
/// batch).
#[derive(Debug, Clone)]
pub enum RecipientDecision<'a> {
    Dispatch(&'a EscalationContact),
    Skip(&'a EscalationContact, RecipientSkipReason),
}

/// Applies the recipient tier filter (`priority <= threshold`, ascending
/// priority order assumed already applied by the caller's query) and the
/// per-recipient checks: E.164 phone validity and per-user cooldown.
/// `user_in_cooldown` is a closure so the caller can batch the recency
/// lookups however is cheapest against its store.
pub fn resolve_recipients<'a>(
    candidates: &'a [EscalationContact],
    priority_threshold: i32,
    mut user_in_cooldown: impl FnMut(&EscalationContact) -> bool,
) -> Vec<RecipientDecision<'a>> {
    candidates
        .iter()
        .filter(|c| c.active && c.priority <= priority_threshold)
        .map(|c| {
            if !c.has_valid_e164_phone() {
                RecipientDecision::Skip(c, RecipientSkipReason::InvalidPhone)
            } else if user_in_cooldown(c) {
                RecipientDecision::Skip(c, RecipientSkipReason::UserInCooldown)
            } else {
                RecipientDecision::Dispatch(c)
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use frostwatch_domain_alerting::{AlertSeverity, AlertType, TriggeringBound};

    fn alert(level: u32) -> Alert {
        Alert {
            id: "a1".into(),
            tenant_id: "t1".into(),
            unit_id: "u1".into(),
            alert_type: AlertType::TemperatureExcursion,
            severity: AlertSeverity::Critical,
            status: AlertStatus::Active,
            trigger_temperature_tenths: 410,
            triggering_bound: TriggeringBound::Max,
            triggered_at: Utc::now(),
            acknowledged_at: None,
            acknowledged_by: None,
            resolved_at: None,
            resolved_by: None,
            resolution_text: None,
            corrective_action: None,
            escalation_level: level,
            last_escalated_at: None,
            metadata: None,
        }
    }

    fn rule() -> SeverityEscalationRule {
        SeverityEscalationRule {
            id: "r1".into(),
            tenant_id: "t1".into(),
            severity: AlertSeverity::Critical,
            escalate_after_minutes: 15,
            max_level: 3,
            priority_thresholds: vec![10, 20, 30],
        }
    }

    #[test]
    fn escalation_cadence_blocks_automatic_but_not_manual() {
        let a = alert(1);
        let auto = evaluate_escalation(&a, EscalateTrigger::Automatic, false, false, false, Some(&rule()));
        assert_eq!(
            auto.unwrap_err().skip_reason,
            Some(EscalateSkipReason::EscalationCadenceNotElapsed)
        );

        let manual =
            evaluate_escalation(&a, EscalateTrigger::Manual, false, false, false, Some(&rule())).unwrap();
        assert_eq!(manual, 2);
    }

    #[test]
    fn escalation_cadence_elapsed_reads_from_last_escalated_at_with_trigger_fallback() {
        let mut a = alert(1);
        let rule = rule();

        // Never escalated: falls back to triggered_at.
        assert!(!escalation_cadence_elapsed(&a, &rule, a.triggered_at));
        assert!(escalation_cadence_elapsed(&a, &rule, a.triggered_at + chrono::Duration::minutes(15)));

        // Escalated recently: the fallback no longer applies.
        a.last_escalated_at = Some(a.triggered_at + chrono::Duration::minutes(10));
        assert!(!escalation_cadence_elapsed(&a, &rule, a.triggered_at + chrono::Duration::minutes(20)));
        assert!(escalation_cadence_elapsed(&a, &rule, a.triggered_at + chrono::Duration::minutes(25)));
    }

    #[test]
    fn alert_cooldown_blocks_automatic_but_not_manual() {
        let a = alert(1);
        let auto = evaluate_escalation(&a, EscalateTrigger::Automatic, true, true, false, Some(&rule()));
        assert!(auto.is_err());

        let manual =
            evaluate_escalation(&a, EscalateTrigger::Manual, true, true, false, Some(&rule())).unwrap();
        assert_eq!(manual, 2);
    }

    #[test]
    fn tenant_rate_limit_blocks_both_triggers() {
        let a = alert(1);
        let result =
            evaluate_escalation(&a, EscalateTrigger::Manual, true, false, true, Some(&rule()));
        assert_eq!(
            result.unwrap_err().skip_reason,
            Some(EscalateSkipReason::TenantRateLimited)
        );
    }

    #[test]
    fn already_at_max_level_is_skipped() {
        let a = alert(3);
        let result = evaluate_escalation(&a, EscalateTrigger::Automatic, true, false, false, Some(&rule()));
        assert_eq!(
            result.unwrap_err().skip_reason,
            Some(EscalateSkipReason::AlreadyAtMaxLevel)
        );
    }

    #[test]
    fn manual_escalate_is_clamped_to_max_level() {
        let a = alert(3);
        // Already at max for automatic purposes, but manual still clamps
        // rather than erroring when level+1 would exceed max -- here it's
        // already at max so this still skips (can't clamp past itself).
        let result = evaluate_escalation(&a, EscalateTrigger::Manual, true, false, false, Some(&rule()));
        assert!(result.is_err());
    }

    #[test]
    fn level_bump_above_zero_flips_status_to_escalated() {
        assert_eq!(status_after_level_bump(1), AlertStatus::Escalated);
        assert_eq!(status_after_level_bump(0), AlertStatus::Active);
    }

    #[test]
    fn recipient_resolution_filters_by_threshold_and_validity() {
        let contacts = vec![
            EscalationContact {
                id: "c1".into(),
                tenant_id: "t1".into(),
                display_name: "On-call".into(),
                phone: "+15551234567".into(),
                priority: 5,
                active: true,
                linked_user_id: Some("u1".into()),
            },
            EscalationContact {
                id: "c2".into(),
                tenant_id: "t1".into(),
                display_name: "Manager".into(),
                phone: "5551234567".into(),
                priority: 20,
                active: true,
                linked_user_id: None,
            },
            EscalationContact {
                id: "c3".into(),
                tenant_id: "t1".into(),
                display_name: "Regional".into(),
                phone: "+15559876543".into(),
                priority: 25,
                active: true,
                linked_user_id: Some("u2".into()),
            },
        ];

        let decisions = resolve_recipients(&contacts, 20, |c| c.id == "c3");
        assert_eq!(decisions.len(), 2);
        assert!(matches!(decisions[0], RecipientDecision::Dispatch(c) if c.id == "c1"));
        assert!(matches!(
            decisions[1],
            RecipientDecision::Skip(c, RecipientSkipReason::InvalidPhone) if c.id == "c2"
        ));
    }
}
