// [apps/gateway/src/services/subscription_hub.rs]
//! Room-filtered broadcast hub (section 4.7.1), generalizing the teacher's
//! `EventBus`: one process-wide `broadcast::Sender<RoomEvent>`, every event
//! tagged with the room name(s) it belongs to, and each socket filters the
//! stream against its own subscribed-room set before forwarding to the
//! client. Keeps the teacher's lock-free single-channel fan-out shape while
//! adding the tenant/site/unit room semantics the spec requires.
//!
//! Room namespaces: `tenant:{T}`, `tenant:{T}:site:{S}`, `tenant:{T}:unit:{U}`.

use serde_json::Value;
use tokio::sync::broadcast;
use tracing::trace;

use super::cross_instance::CrossInstancePublisher;
use std::sync::Arc;

const HUB_CHANNEL_CAPACITY: usize = 4096;

pub fn tenant_room(tenant_id: &str) -> String {
    format!("tenant:{tenant_id}")
}

pub fn site_room(tenant_id: &str, site_id: &str) -> String {
    format!("tenant:{tenant_id}:site:{site_id}")
}

pub fn unit_room(tenant_id: &str, unit_id: &str) -> String {
    format!("tenant:{tenant_id}:unit:{unit_id}")
}

#[derive(Debug, Clone)]
pub struct RoomEvent {
    pub rooms: Vec<String>,
    pub event: &'static str,
    pub payload: Value,
}

pub struct SubscriptionHub {
    sender: broadcast::Sender<RoomEvent>,
    cross_instance: Arc<dyn CrossInstancePublisher>,
}

impl SubscriptionHub {
    pub fn new(cross_instance: Arc<dyn CrossInstancePublisher>) -> Self {
        let (sender, _) = broadcast::channel(HUB_CHANNEL_CAPACITY);
        Self { sender, cross_instance }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<RoomEvent> {
        self.sender.subscribe()
    }

    async fn dispatch(&self, rooms: Vec<String>, event: &'static str, payload: Value) {
        let room_event = RoomEvent { rooms, event, payload };

        match self.sender.send(room_event.clone()) {
            Ok(subscriber_count) => trace!(event, subscriber_count, "dispatched room event"),
            Err(_) => trace!(event, "dispatched room event with no active subscribers"),
        }

        self.cross_instance.publish(&room_event).await;
    }

    /// `sensor:readings:batch{unitId, readings[], count}` to the tenant-wide
    /// room and the unit-scoped room, per the Stream Buffer's flush step.
    pub async fn emit_readings_batch(&self, tenant_id: &str, unit_id: &str, payload: Value) {
        self.dispatch(
            vec![tenant_room(tenant_id), unit_room(tenant_id, unit_id)],
            "sensor:readings:batch",
            payload,
        )
        .await;
    }

    pub async fn emit_alert_triggered(&self, tenant_id: &str, unit_id: &str, payload: Value) {
        self.dispatch(
            vec![tenant_room(tenant_id), unit_room(tenant_id, unit_id)],
            "alert:triggered",
            payload,
        )
        .await;
    }

    pub async fn emit_alert_escalated(&self, tenant_id: &str, unit_id: &str, payload: Value) {
        self.dispatch(
            vec![tenant_room(tenant_id), unit_room(tenant_id, unit_id)],
            "alert:escalated",
            payload,
        )
        .await;
    }

    pub async fn emit_alert_resolved(&self, tenant_id: &str, unit_id: &str, payload: Value) {
        self.dispatch(
            vec![tenant_room(tenant_id), unit_room(tenant_id, unit_id)],
            "alert:resolved",
            payload,
        )
        .await;
    }

    /// `{previousState, newState, reason, timestamp}`, section 4.8.
    pub async fn emit_unit_state_changed(&self, tenant_id: &str, unit_id: &str, payload: Value) {
        self.dispatch(
            vec![tenant_room(tenant_id), unit_room(tenant_id, unit_id)],
            "unit:state:changed",
            payload,
        )
        .await;
    }

    pub async fn emit_metrics_updated(&self, tenant_id: &str, unit_id: &str, payload: Value) {
        self.dispatch(
            vec![tenant_room(tenant_id), unit_room(tenant_id, unit_id)],
            "metrics:updated",
            payload,
        )
        .await;
    }
}
