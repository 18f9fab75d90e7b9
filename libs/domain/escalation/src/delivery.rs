// [libs/domain/escalation/src/delivery.rs]
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use typeshare::typeshare;

#[typeshare]
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryChannel {
    Sms,
}

#[typeshare]
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryStatus {
    Pending,
    Sent,
    Delivered,
    Failed,
}

impl DeliveryStatus {
    /// The set used everywhere a cooldown window needs "a recent attempt
    /// that isn't a known failure" — the tenant SMS rate limit, and (per the
    /// resolved per-user policy) the per-user cooldown as well.
    pub fn counts_as_recent_attempt(self) -> bool {
        matches!(
            self,
            DeliveryStatus::Pending | DeliveryStatus::Sent | DeliveryStatus::Delivered
        )
    }
}

/// One outbound SMS attempt for one recipient at one alert-escalation-level.
/// A new row is written per attempt per recipient per alert level; the
/// engine never updates a delivery's recipient or alert binding in place.
#[typeshare]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationDelivery {
    pub id: String,
    pub alert_id: String,
    pub tenant_id: String,
    pub contact_id: Option<String>,
    pub recipient_phone: String,
    pub recipient_user_id: Option<String>,
    pub channel: DeliveryChannel,
    pub status: DeliveryStatus,
    pub escalation_level: u32,
    pub provider_message_id: Option<String>,
    pub scheduled_at: DateTime<Utc>,
    pub sent_at: Option<DateTime<Utc>>,
    pub delivered_at: Option<DateTime<Utc>>,
    pub failed_at: Option<DateTime<Utc>>,
    pub error_text: Option<String>,
}
