// [apps/gateway/src/handlers/sms_webhook.rs]
//! POST /api/v1/webhooks/sms — the provider's delivery status callback
//! (`message.sent`/`message.delivered`/`message.failed`). This handler
//! only looks the delivery up by the provider's own message id and
//! writes the resulting outcome; it never 500s on a webhook it can't
//! match to a delivery, since the provider will simply retry a 4xx/5xx
//! and no amount of retrying manufactures a delivery row that isn't
//! there.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use chrono::Utc;
use frostwatch_domain_escalation::DeliveryStatus;
use frostwatch_infra_sms::{parse_webhook_event, WebhookEventKind};
use tracing::{instrument, warn};

use crate::state::AppState;

fn delivery_status_for(kind: WebhookEventKind) -> DeliveryStatus {
    match kind {
        WebhookEventKind::Sent => DeliveryStatus::Sent,
        WebhookEventKind::Delivered => DeliveryStatus::Delivered,
        WebhookEventKind::Failed => DeliveryStatus::Failed,
    }
}

#[instrument(skip(state, body))]
pub async fn receive_sms_webhook(State(state): State<AppState>, body: Bytes) -> StatusCode {
    let event = match parse_webhook_event(&body) {
        Ok(event) => event,
        Err(error) => {
            warn!(%error, "sms webhook body did not parse, acknowledging without action");
            return StatusCode::OK;
        }
    };

    let delivery = match state.escalation.find_by_provider_message_id(&event.provider_message_id).await {
        Ok(Some(delivery)) => delivery,
        Ok(None) => {
            warn!(provider_message_id = %event.provider_message_id, "no delivery matches webhook message id");
            return StatusCode::OK;
        }
        Err(error) => {
            warn!(%error, "delivery lookup failed for sms webhook");
            return StatusCode::INTERNAL_SERVER_ERROR;
        }
    };

    let status = delivery_status_for(event.kind);
    if let Err(error) = state
        .escalation
        .mark_delivery_outcome(&delivery.id, status, Some(&event.provider_message_id), event.error_text.as_deref(), Utc::now())
        .await
    {
        warn!(%error, delivery_id = %delivery.id, "failed to record sms webhook outcome");
        return StatusCode::INTERNAL_SERVER_ERROR;
    }

    StatusCode::OK
}
