// [libs/domain/alerting/src/alert.rs]
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json;
use typeshare::typeshare;

/// Only one alert type is in scope for this core (temperature excursion);
/// the enum is kept open so a rewrite can add humidity/battery/signal
/// alert types without reshaping the FSM or the store.
#[typeshare]
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum AlertType {
    TemperatureExcursion,
}

#[typeshare]
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum AlertSeverity {
    Info,
    Warning,
    Critical,
}

#[typeshare]
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AlertStatus {
    Active,
    Acknowledged,
    Escalated,
    Resolved,
}

impl AlertStatus {
    /// An "open" alert per the glossary: any status in
    /// {active, acknowledged, escalated}.
    pub fn is_open(self) -> bool {
        !matches!(self, AlertStatus::Resolved)
    }
}

#[typeshare]
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TriggeringBound {
    Min,
    Max,
}

#[typeshare]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alert {
    pub id: String,
    pub tenant_id: String,
    pub unit_id: String,
    pub alert_type: AlertType,
    pub severity: AlertSeverity,
    pub status: AlertStatus,
    pub trigger_temperature_tenths: i32,
    pub triggering_bound: TriggeringBound,
    pub triggered_at: DateTime<Utc>,
    pub acknowledged_at: Option<DateTime<Utc>>,
    pub acknowledged_by: Option<String>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub resolved_by: Option<String>,
    pub resolution_text: Option<String>,
    pub corrective_action: Option<String>,
    /// Monotonically non-decreasing; bounded by the configured rule's
    /// `maxLevel` for this alert's severity.
    pub escalation_level: u32,
    pub last_escalated_at: Option<DateTime<Utc>>,
    pub metadata: Option<serde_json::Value>,
}

impl Alert {
    /// `resolvedAt` set iff status == resolved.
    pub fn resolved_at_is_coherent(&self) -> bool {
        matches!(self.status, AlertStatus::Resolved) == self.resolved_at.is_some()
    }
}
