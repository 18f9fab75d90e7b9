// [apps/gateway/src/services/stream_buffer.rs]
//! Stream Buffer (section 4.7 "Buffer"/"Flush"): readings land here first and
//! are fanned out to the `SubscriptionHub` on a fixed tick rather than one at
//! a time, so a noisy unit can't starve the broadcast channel. Per-unit FIFO
//! capped at `BUFFER_CAPACITY_PER_UNIT`; oldest entries drop silently once a
//! unit exceeds it, since the dashboard only ever renders the recent tail.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use frostwatch_domain_telemetry::Reading;
use serde_json::json;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::subscription_hub::SubscriptionHub;

const BUFFER_CAPACITY_PER_UNIT: usize = 1024;
const FLUSH_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Default)]
struct BufferState {
    by_unit: HashMap<String, VecDeque<Reading>>,
}

pub struct StreamBuffer {
    state: Mutex<BufferState>,
    hub: Arc<SubscriptionHub>,
}

impl StreamBuffer {
    pub fn new(hub: Arc<SubscriptionHub>) -> Self {
        Self { state: Mutex::new(BufferState::default()), hub }
    }

    pub async fn push(&self, reading: Reading) {
        let mut state = self.state.lock().await;
        let queue = state.by_unit.entry(reading.unit_id.clone()).or_default();

        if queue.len() == BUFFER_CAPACITY_PER_UNIT {
            queue.pop_front();
        }

        queue.push_back(reading);
    }

    async fn flush_once(&self) {
        let drained: Vec<(String, VecDeque<Reading>)> = {
            let mut state = self.state.lock().await;
            state.by_unit.drain().collect()
        };

        for (unit_id, readings) in drained {
            if readings.is_empty() {
                continue;
            }

            let tenant_id = readings[0].tenant_id.clone();
            let payload = json!({
                "unitId": unit_id,
                "count": readings.len(),
                "readings": readings.iter().collect::<Vec<_>>(),
            });

            self.hub.emit_readings_batch(&tenant_id, &unit_id, payload).await;
        }
    }

    /// Runs until `cancellation` fires; intended to be spawned as a daemon
    /// task from the kernel alongside the escalation scheduler and the
    /// unit-state-cache sweep.
    pub async fn run_flush_loop(self: Arc<Self>, cancellation: CancellationToken) {
        let mut ticker = tokio::time::interval(FLUSH_INTERVAL);

        loop {
            tokio::select! {
                _ = ticker.tick() => self.flush_once().await,
                _ = cancellation.cancelled() => {
                    debug!("stream buffer flush loop shutting down");
                    break;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use frostwatch_domain_telemetry::Reading;

    fn sample_reading(unit_id: &str) -> Reading {
        Reading {
            id: "r1".into(),
            unit_id: unit_id.into(),
            tenant_id: "tenant-a".into(),
            device_id: Some("dev1".into()),
            temperature_tenths: -180,
            humidity_tenths: None,
            battery_percent: None,
            signal_strength: None,
            recorded_at: Utc::now(),
            received_at: Utc::now(),
            source: "sensor".into(),
            raw_payload: None,
        }
    }

    #[tokio::test]
    async fn push_then_flush_emits_one_batch_per_unit() {
        let hub = Arc::new(SubscriptionHub::new(Arc::new(
            super::super::cross_instance::NullCrossInstancePublisher,
        )));
        let mut subscriber = hub.subscribe();
        let buffer = StreamBuffer::new(hub);

        buffer.push(sample_reading("unit-1")).await;
        buffer.push(sample_reading("unit-1")).await;
        buffer.flush_once().await;

        let event = subscriber.recv().await.expect("event");
        assert_eq!(event.event, "sensor:readings:batch");
        assert_eq!(event.payload["count"], 2);
    }

    #[tokio::test]
    async fn per_unit_buffer_drops_oldest_past_capacity() {
        let hub = Arc::new(SubscriptionHub::new(Arc::new(
            super::super::cross_instance::NullCrossInstancePublisher,
        )));
        let buffer = StreamBuffer::new(hub);

        for _ in 0..(BUFFER_CAPACITY_PER_UNIT + 10) {
            buffer.push(sample_reading("unit-1")).await;
        }

        let state = buffer.state.lock().await;
        assert_eq!(state.by_unit["unit-1"].len(), BUFFER_CAPACITY_PER_UNIT);
    }
}
