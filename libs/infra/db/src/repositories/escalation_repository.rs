// [libs/infra/db/src/repositories/escalation_repository.rs]
/*!
 * Rule lookup, the three cooldown recency queries, contact loading, and
 * `NotificationDelivery` writes. The pure ordering/arithmetic of
 * `escalate` lives in `frostwatch_domain_escalation::engine`; this
 * repository only answers the yes/no recency questions that engine needs
 * and persists its decisions.
 */

use crate::client::LedgerClient;
use crate::errors::DbError;
use chrono::{DateTime, Utc};
use frostwatch_domain_alerting::AlertSeverity;
use frostwatch_domain_escalation::{DeliveryChannel, DeliveryStatus, EscalationContact, NotificationDelivery, SeverityEscalationRule};
use libsql::params;
use tracing::instrument;
use uuid::Uuid;

pub struct EscalationRepository {
    client: LedgerClient,
}

fn severity_as_str(severity: AlertSeverity) -> &'static str {
    match severity {
        AlertSeverity::Info => "info",
        AlertSeverity::Warning => "warning",
        AlertSeverity::Critical => "critical",
    }
}

fn status_as_str(status: DeliveryStatus) -> &'static str {
    match status {
        DeliveryStatus::Pending => "pending",
        DeliveryStatus::Sent => "sent",
        DeliveryStatus::Delivered => "delivered",
        DeliveryStatus::Failed => "failed",
    }
}

fn parse_status(raw: &str) -> DeliveryStatus {
    match raw {
        "sent" => DeliveryStatus::Sent,
        "delivered" => DeliveryStatus::Delivered,
        "failed" => DeliveryStatus::Failed,
        _ => DeliveryStatus::Pending,
    }
}

impl EscalationRepository {
    pub fn new(client: LedgerClient) -> Self {
        Self { client }
    }

    #[instrument(skip(self))]
    pub async fn find_rule_for_severity(
        &self,
        tenant_id: &str,
        severity: AlertSeverity,
    ) -> Result<Option<SeverityEscalationRule>, DbError> {
        let connection = self.client.get_connection()?;
        let mut rows = connection
            .query(
                "SELECT id, tenant_id, severity, escalate_after_minutes, max_level, priority_thresholds \
                 FROM escalation_rules WHERE tenant_id = ?1 AND severity = ?2 LIMIT 1",
                params![tenant_id, severity_as_str(severity)],
            )
            .await?;

        let Some(row) = rows.next().await? else {
            return Ok(None);
        };

        let thresholds_json = row.get::<String>(5)?;
        let priority_thresholds: Vec<i32> = serde_json::from_str(&thresholds_json)
            .map_err(|e| DbError::mapping(format!("priority_thresholds: {e}")))?;

        Ok(Some(SeverityEscalationRule {
            id: row.get::<String>(0)?,
            tenant_id: row.get::<String>(1)?,
            severity,
            escalate_after_minutes: row.get::<i64>(3)?,
            max_level: row.get::<i64>(4)? as u32,
            priority_thresholds,
        }))
    }

    /// True iff `alert_id` was escalated within `minutes` of `now`
    /// (`lastEscalatedAt`, falling back to `triggeredAt` when the alert
    /// has never escalated).
    #[instrument(skip(self))]
    pub async fn alert_in_cooldown(&self, alert_id: &str, minutes: i64, now: DateTime<Utc>) -> Result<bool, DbError> {
        let connection = self.client.get_connection()?;
        let mut rows = connection
            .query(
                "SELECT COALESCE(last_escalated_at, triggered_at) FROM alerts WHERE id = ?1",
                params![alert_id],
            )
            .await?;
        let Some(row) = rows.next().await? else {
            return Ok(false);
        };
        let reference: String = row.get(0)?;
        let reference = DateTime::parse_from_rfc3339(&reference)
            .map_err(|e| DbError::mapping(e.to_string()))?
            .with_timezone(&Utc);
        Ok(now.signed_duration_since(reference).num_minutes() < minutes)
    }

    /// Tenant SMS rate limit: count of outbound attempts with
    /// `status IN (pending, sent, delivered)` in the last `window_minutes`.
    #[instrument(skip(self))]
    pub async fn tenant_attempt_count_in_window(
        &self,
        tenant_id: &str,
        window_minutes: i64,
        now: DateTime<Utc>,
    ) -> Result<u32, DbError> {
        let since = now - chrono::Duration::minutes(window_minutes);
        let connection = self.client.get_connection()?;
        let mut rows = connection
            .query(
                "SELECT COUNT(*) FROM notification_deliveries \
                 WHERE tenant_id = ?1 AND status IN ('pending', 'sent', 'delivered') AND scheduled_at >= ?2",
                params![tenant_id, since.to_rfc3339()],
            )
            .await?;
        let row = rows.next().await?.ok_or(DbError::mapping("missing count row"))?;
        Ok(row.get::<i64>(0)? as u32)
    }

    /// Per-user cooldown: any attempt (`pending`/`sent`/`delivered`) for
    /// this linked user within `minutes` of `now`. `failed` deliveries do
    /// not count, per the resolved cooldown semantics.
    #[instrument(skip(self))]
    pub async fn user_in_cooldown(
        &self,
        user_id: &str,
        minutes: i64,
        now: DateTime<Utc>,
    ) -> Result<bool, DbError> {
        let since = now - chrono::Duration::minutes(minutes);
        let connection = self.client.get_connection()?;
        let mut rows = connection
            .query(
                "SELECT COUNT(*) FROM notification_deliveries \
                 WHERE recipient_user_id = ?1 AND status IN ('pending', 'sent', 'delivered') AND scheduled_at >= ?2",
                params![user_id, since.to_rfc3339()],
            )
            .await?;
        let row = rows.next().await?.ok_or(DbError::mapping("missing count row"))?;
        Ok(row.get::<i64>(0)? > 0)
    }

    /// Active contacts at or below `priority_threshold`, ascending
    /// priority (earliest tier first).
    #[instrument(skip(self))]
    pub async fn list_eligible_contacts(
        &self,
        tenant_id: &str,
        priority_threshold: i32,
    ) -> Result<Vec<EscalationContact>, DbError> {
        let connection = self.client.get_connection()?;
        let mut rows = connection
            .query(
                "SELECT id, tenant_id, display_name, phone, priority, active, linked_user_id \
                 FROM escalation_contacts \
                 WHERE tenant_id = ?1 AND active = 1 AND priority <= ?2 \
                 ORDER BY priority ASC",
                params![tenant_id, priority_threshold as i64],
            )
            .await?;

        let mut contacts = Vec::new();
        while let Some(row) = rows.next().await? {
            contacts.push(EscalationContact {
                id: row.get::<String>(0)?,
                tenant_id: row.get::<String>(1)?,
                display_name: row.get::<String>(2)?,
                phone: row.get::<String>(3)?,
                priority: row.get::<i64>(4)? as i32,
                active: row.get::<i64>(5)? != 0,
                linked_user_id: row.get::<Option<String>>(6)?,
            });
        }
        Ok(contacts)
    }

    #[instrument(skip(self))]
    pub async fn insert_pending_delivery(
        &self,
        tenant_id: &str,
        alert_id: &str,
        contact: &EscalationContact,
        escalation_level: u32,
        scheduled_at: DateTime<Utc>,
    ) -> Result<NotificationDelivery, DbError> {
        let connection = self.client.get_connection()?;
        let id = Uuid::new_v4().to_string();
        connection
            .execute(
                r#"
                INSERT INTO notification_deliveries (
                    id, alert_id, tenant_id, contact_id, recipient_phone,
                    recipient_user_id, channel, status, escalation_level, scheduled_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, 'sms', 'pending', ?7, ?8)
                "#,
                params![
                    id.clone(),
                    alert_id,
                    tenant_id,
                    contact.id.clone(),
                    contact.phone.clone(),
                    contact.linked_user_id.clone(),
                    escalation_level as i64,
                    scheduled_at.to_rfc3339(),
                ],
            )
            .await?;

        Ok(NotificationDelivery {
            id,
            alert_id: alert_id.to_string(),
            tenant_id: tenant_id.to_string(),
            contact_id: Some(contact.id.clone()),
            recipient_phone: contact.phone.clone(),
            recipient_user_id: contact.linked_user_id.clone(),
            channel: DeliveryChannel::Sms,
            status: DeliveryStatus::Pending,
            escalation_level,
            provider_message_id: None,
            scheduled_at,
            sent_at: None,
            delivered_at: None,
            failed_at: None,
            error_text: None,
        })
    }

    /// Applied when the SMS job actually runs (`sent`/`failed`) or when a
    /// provider webhook reports a later status (`sent`/`delivered`/`failed`
    /// by `provider_message_id`). `delivered_at` is set only by the
    /// `Delivered` branch and, once set, is never overwritten by a repeat
    /// webhook delivery — `COALESCE` keeps the first-seen timestamp so a
    /// duplicate `message.delivered` callback is a no-op on the value,
    /// matching the delivered-twice idempotence property.
    #[instrument(skip(self))]
    pub async fn mark_delivery_outcome(
        &self,
        delivery_id: &str,
        status: DeliveryStatus,
        provider_message_id: Option<&str>,
        error_text: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<(), DbError> {
        let connection = self.client.get_connection()?;
        let (sent_at, delivered_at, failed_at) = match status {
            DeliveryStatus::Sent => (Some(now.to_rfc3339()), None, None),
            DeliveryStatus::Delivered => (None, Some(now.to_rfc3339()), None),
            DeliveryStatus::Failed => (None, None, Some(now.to_rfc3339())),
            DeliveryStatus::Pending => (None, None, None),
        };
        connection
            .execute(
                r#"
                UPDATE notification_deliveries
                SET status = ?1, provider_message_id = ?2, error_text = ?3,
                    sent_at = COALESCE(sent_at, ?4),
                    delivered_at = COALESCE(delivered_at, ?5),
                    failed_at = COALESCE(failed_at, ?6)
                WHERE id = ?7
                "#,
                params![
                    status_as_str(status),
                    provider_message_id.map(|s| s.to_string()),
                    error_text.map(|s| s.to_string()),
                    sent_at,
                    delivered_at,
                    failed_at,
                    delivery_id,
                ],
            )
            .await?;
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn get_delivery(&self, delivery_id: &str) -> Result<Option<NotificationDelivery>, DbError> {
        let connection = self.client.get_connection()?;
        let mut rows = connection
            .query(
                "SELECT id, alert_id, tenant_id, contact_id, recipient_phone, recipient_user_id, \
                 channel, status, escalation_level, provider_message_id, scheduled_at, sent_at, \
                 delivered_at, failed_at, error_text \
                 FROM notification_deliveries WHERE id = ?1",
                params![delivery_id],
            )
            .await?;
        let Some(row) = rows.next().await? else {
            return Ok(None);
        };
        row_to_delivery(&row)
    }

    /// Looked up by the webhook handler, which only knows the provider's
    /// message id, not our internal delivery id.
    #[instrument(skip(self))]
    pub async fn find_by_provider_message_id(
        &self,
        provider_message_id: &str,
    ) -> Result<Option<NotificationDelivery>, DbError> {
        let connection = self.client.get_connection()?;
        let mut rows = connection
            .query(
                "SELECT id, alert_id, tenant_id, contact_id, recipient_phone, recipient_user_id, \
                 channel, status, escalation_level, provider_message_id, scheduled_at, sent_at, \
                 delivered_at, failed_at, error_text \
                 FROM notification_deliveries WHERE provider_message_id = ?1",
                params![provider_message_id],
            )
            .await?;
        let Some(row) = rows.next().await? else {
            return Ok(None);
        };
        row_to_delivery(&row)
    }
}

fn row_to_delivery(row: &libsql::Row) -> Result<Option<NotificationDelivery>, DbError> {
    let parse_ts = |s: Option<String>| {
        s.and_then(|s| DateTime::parse_from_rfc3339(&s).ok())
            .map(|d| d.with_timezone(&Utc))
    };

    Ok(Some(NotificationDelivery {
        id: row.get::<String>(0)?,
        alert_id: row.get::<String>(1)?,
        tenant_id: row.get::<String>(2)?,
        contact_id: row.get::<Option<String>>(3)?,
        recipient_phone: row.get::<String>(4)?,
        recipient_user_id: row.get::<Option<String>>(5)?,
        channel: DeliveryChannel::Sms,
        status: parse_status(&row.get::<String>(7)?),
        escalation_level: row.get::<i64>(8)? as u32,
        provider_message_id: row.get::<Option<String>>(9)?,
        scheduled_at: DateTime::parse_from_rfc3339(&row.get::<String>(10)?)
            .map_err(|e| DbError::mapping(e.to_string()))?
            .with_timezone(&Utc),
        sent_at: parse_ts(row.get::<Option<String>>(11)?),
        delivered_at: parse_ts(row.get::<Option<String>>(12)?),
        failed_at: parse_ts(row.get::<Option<String>>(13)?),
        error_text: row.get::<Option<String>>(14)?,
    }))
}
