// [apps/gateway/src/services/cross_instance.rs]
//! `CrossInstancePublisher` seam (section 4.7, section 6.1): optional pub/sub
//! adapter so events emitted on one instance reach sockets on another. The
//! default `NullCrossInstancePublisher` is in-process only; a real adapter
//! (Redis, NATS) can be swapped in at `AppState::new` without the
//! `SubscriptionHub` changing at all.

use async_trait::async_trait;

use super::subscription_hub::RoomEvent;

#[async_trait]
pub trait CrossInstancePublisher: Send + Sync {
    async fn publish(&self, event: &RoomEvent);
}

pub struct NullCrossInstancePublisher;

#[async_trait]
impl CrossInstancePublisher for NullCrossInstancePublisher {
    async fn publish(&self, _event: &RoomEvent) {
        // Single-instance deployment: nothing to fan out to.
    }
}
