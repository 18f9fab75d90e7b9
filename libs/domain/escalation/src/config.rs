// [libs/domain/escalation/src/config.rs]
//! Per-severity escalation rule and the three cooldown windows the engine
//! enforces. Both are configuration rows, not time-series data; the engine
//! reads them once per `escalate` call and never mutates them.

use frostwatch_domain_alerting::AlertSeverity;
use serde::{Deserialize, Serialize};
use typeshare::typeshare;

/// Escalation policy for one severity tier. `priority_thresholds[i]` is the
/// maximum contact `priority` eligible to receive a notification once the
/// alert reaches escalation level `i + 1` (level 0 has no notification
/// tier — it is the freshly-triggered, not-yet-escalated state). A level
/// beyond the configured thresholds reuses the last entry, so a rule with
/// fewer threshold entries than `max_level` still has a defined (widest)
/// tier for its highest levels.
#[typeshare]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeverityEscalationRule {
    pub id: String,
    pub tenant_id: String,
    pub severity: AlertSeverity,
    pub escalate_after_minutes: i64,
    pub max_level: u32,
    pub priority_thresholds: Vec<i32>,
}

impl SeverityEscalationRule {
    /// `level` is 1-based (the level the alert is escalating *to*). Returns
    /// `None` if `level` is 0 or the rule has no threshold entries at all.
    pub fn priority_threshold_for(&self, level: u32) -> Option<i32> {
        if level == 0 {
            return None;
        }
        let idx = (level - 1) as usize;
        self.priority_thresholds
            .get(idx)
            .copied()
            .or_else(|| self.priority_thresholds.last().copied())
    }
}

/// The three cooldown windows from the cooldown taxonomy: per-alert,
/// per-user (per linked-contact phone), and per-tenant ("org") rate limit.
#[typeshare]
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CooldownConfig {
    pub per_alert_minutes: i64,
    pub per_user_minutes: i64,
    pub org_window_minutes: i64,
    pub max_sms_per_org_window: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule() -> SeverityEscalationRule {
        SeverityEscalationRule {
            id: "r1".into(),
            tenant_id: "t1".into(),
            severity: AlertSeverity::Critical,
            escalate_after_minutes: 15,
            max_level: 3,
            priority_thresholds: vec![10, 20],
        }
    }

    #[test]
    fn level_beyond_configured_thresholds_reuses_the_last_entry() {
        let rule = rule();
        assert_eq!(rule.priority_threshold_for(1), Some(10));
        assert_eq!(rule.priority_threshold_for(2), Some(20));
        assert_eq!(rule.priority_threshold_for(3), Some(20));
    }

    #[test]
    fn level_zero_has_no_threshold() {
        assert_eq!(rule().priority_threshold_for(0), None);
    }
}
