// [libs/infra/sms/src/webhook.rs]
/*!
 * Inbound delivery status callbacks from the messaging provider. Parsed
 * here and handed to `EscalationRepository::mark_delivery_outcome` by the
 * gateway's `sms_dispatcher` service — this crate only knows how to read
 * the provider's wire shape, never how the delivery row is updated.
 */

use chrono::{DateTime, Utc};
use serde::Deserialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WebhookEventKind {
    Sent,
    Delivered,
    Failed,
}

#[derive(Debug, Clone)]
pub struct DeliveryWebhookEvent {
    pub provider_message_id: String,
    pub kind: WebhookEventKind,
    pub occurred_at: DateTime<Utc>,
    pub error_text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawWebhookPayload {
    event: String,
    #[serde(rename = "messageId")]
    message_id: String,
    #[serde(rename = "occurredAt")]
    occurred_at: DateTime<Utc>,
    errors: Option<Vec<RawWebhookError>>,
}

#[derive(Debug, Deserialize)]
struct RawWebhookError {
    detail: String,
}

#[derive(Debug, thiserror::Error)]
pub enum WebhookParseError {
    #[error("[L3_SMS_WEBHOOK_DECODE] malformed webhook body: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("[L3_SMS_WEBHOOK_EVENT] unrecognized event kind: {0}")]
    UnknownEvent(String),
}

/// Accepts the provider's three event kinds; anything else is rejected so a
/// webhook schema change surfaces immediately instead of being silently
/// mapped to `Failed`.
pub fn parse_webhook_event(body: &[u8]) -> Result<DeliveryWebhookEvent, WebhookParseError> {
    let raw: RawWebhookPayload = serde_json::from_slice(body)?;

    let kind = match raw.event.as_str() {
        "message.sent" => WebhookEventKind::Sent,
        "message.delivered" => WebhookEventKind::Delivered,
        "message.failed" => WebhookEventKind::Failed,
        other => return Err(WebhookParseError::UnknownEvent(other.to_string())),
    };

    let error_text = raw
        .errors
        .and_then(|errors| errors.into_iter().map(|e| e.detail).reduce(|a, b| format!("{a}; {b}")));

    Ok(DeliveryWebhookEvent {
        provider_message_id: raw.message_id,
        kind,
        occurred_at: raw.occurred_at,
        error_text,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_delivered_event() {
        let body = br#"{"event":"message.delivered","messageId":"msg_1","occurredAt":"2026-01-01T00:00:00Z"}"#;
        let event = parse_webhook_event(body).unwrap();
        assert_eq!(event.kind, WebhookEventKind::Delivered);
        assert_eq!(event.provider_message_id, "msg_1");
        assert!(event.error_text.is_none());
    }

    #[test]
    fn parses_a_failed_event_with_errors() {
        let body = br#"{"event":"message.failed","messageId":"msg_2","occurredAt":"2026-01-01T00:00:00Z","errors":[{"detail":"invalid destination"}]}"#;
        let event = parse_webhook_event(body).unwrap();
        assert_eq!(event.kind, WebhookEventKind::Failed);
        assert_eq!(event.error_text.as_deref(), Some("invalid destination"));
    }

    #[test]
    fn rejects_an_unknown_event_kind() {
        let body = br#"{"event":"message.queued","messageId":"msg_3","occurredAt":"2026-01-01T00:00:00Z"}"#;
        assert!(matches!(
            parse_webhook_event(body),
            Err(WebhookParseError::UnknownEvent(_))
        ));
    }
}
