// [libs/domain/escalation/src/outcome.rs]
use serde::{Deserialize, Serialize};
use typeshare::typeshare;

/// Why a whole `escalate` call was skipped. Distinct from
/// [`RecipientSkipReason`], which is per-contact and never aborts the
/// overall escalation.
#[typeshare]
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case", tag = "reason")]
pub enum EscalateSkipReason {
    /// Fewer than `rule.escalateAfterMinutes` have passed since the alert's
    /// last escalation (or since it triggered, if never escalated). Never
    /// returned for a manual escalate, which bypasses this scheduling gate
    /// entirely rather than waiting out the cadence.
    EscalationCadenceNotElapsed,
    /// The alert was escalated within the last `perAlertMinutes`. Never
    /// returned for a manual escalate, which is explicitly permitted to
    /// override this one cooldown.
    AlertInCooldown,
    /// The tenant has reached `maxSmsPerOrgWindow` outbound attempts in the
    /// last `orgWindowMinutes`.
    TenantRateLimited,
    /// No `SeverityEscalationRule` exists for the alert's severity.
    NoRuleForSeverity,
    /// `escalationLevel` is already at `rule.maxLevel`.
    AlreadyAtMaxLevel,
}

/// Per-recipient reason a candidate contact did not receive a dispatch.
/// Logged alongside the overall outcome but never escalates to an
/// [`EscalateSkipReason`] — one bad contact never blocks the others.
#[typeshare]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case", tag = "reason")]
pub enum RecipientSkipReason {
    /// Phone is not E.164 (`+`-prefixed).
    InvalidPhone,
    /// The linked user has a recent attempt within `perUserMinutes`.
    UserInCooldown,
}

/// The `{success, newLevel, smsQueued, skipReason?}` result of one
/// `escalate` call, automatic or manual.
#[typeshare]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EscalateOutcome {
    pub success: bool,
    pub new_level: u32,
    pub sms_queued: u32,
    pub skip_reason: Option<EscalateSkipReason>,
    pub recipients_skipped: Vec<RecipientSkipReason>,
}

impl EscalateOutcome {
    pub fn skipped(reason: EscalateSkipReason, current_level: u32) -> Self {
        Self {
            success: false,
            new_level: current_level,
            sms_queued: 0,
            skip_reason: Some(reason),
            recipients_skipped: Vec::new(),
        }
    }
}
