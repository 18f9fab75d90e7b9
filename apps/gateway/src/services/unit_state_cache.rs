// [apps/gateway/src/services/unit_state_cache.rs]
//! Unit-State Cache (section 4.8): a small in-process map from `unitId` to the
//! coarse `dashboardState` the UI actually renders (`normal`/`warning`/
//! `critical`/`offline`), TTL'd so a crashed instance doesn't serve stale
//! state forever and size-capped so an unbounded tenant can't grow it
//! without limit. Not a source of truth — `TenancyRepository` is — this is
//! purely a read-path accelerator plus the staleness-to-offline sweep.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use frostwatch_domain_telemetry::UnitStatus;
use serde_json::json;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::subscription_hub::SubscriptionHub;

const ENTRY_TTL: ChronoDuration = ChronoDuration::seconds(30);
const MAX_ENTRIES: usize = 50_000;
const SWEEP_INTERVAL: Duration = Duration::from_secs(10);
const STALE_READING_THRESHOLD: ChronoDuration = ChronoDuration::seconds(30);

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DashboardState {
    Normal,
    Warning,
    Critical,
    Offline,
}

/// Maps a unit's FSM status plus reading staleness to the coarse state the
/// dashboard renders. A status-derived state is overridden to `Offline` the
/// moment the last reading ages past `STALE_READING_THRESHOLD`, independent
/// of what the FSM itself currently says.
pub fn derive_dashboard_state(status: UnitStatus, last_reading_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> DashboardState {
    let is_stale = match last_reading_at {
        Some(at) => now - at > STALE_READING_THRESHOLD,
        None => true,
    };

    if is_stale {
        return DashboardState::Offline;
    }

    match status {
        UnitStatus::Ok | UnitStatus::Restoring => DashboardState::Normal,
        UnitStatus::Excursion | UnitStatus::ManualRequired => DashboardState::Warning,
        UnitStatus::AlarmActive => DashboardState::Critical,
        UnitStatus::MonitoringInterrupted | UnitStatus::Offline => DashboardState::Offline,
    }
}

#[derive(Clone)]
struct CacheEntry {
    tenant_id: String,
    dashboard_state: DashboardState,
    last_reading_at: Option<DateTime<Utc>>,
    last_temperature_tenths: Option<i32>,
    expires_at: DateTime<Utc>,
}

pub struct UnitStateCache {
    entries: RwLock<HashMap<String, CacheEntry>>,
    hub: Arc<SubscriptionHub>,
}

impl UnitStateCache {
    pub fn new(hub: Arc<SubscriptionHub>) -> Self {
        Self { entries: RwLock::new(HashMap::new()), hub }
    }

    pub async fn get(&self, unit_id: &str) -> Option<DashboardState> {
        let entries = self.entries.read().await;
        entries.get(unit_id).filter(|entry| entry.expires_at > Utc::now()).map(|entry| entry.dashboard_state)
    }

    /// Recomputes and stores the cached state for a unit, emitting
    /// `unit:state:changed` on the subscription hub when it differs from
    /// what was cached before (section 4.8 "event emission").
    pub async fn refresh(
        &self,
        tenant_id: &str,
        unit_id: &str,
        status: UnitStatus,
        last_reading_at: Option<DateTime<Utc>>,
        last_temperature_tenths: Option<i32>,
        reason: &str,
    ) {
        let now = Utc::now();
        let new_state = derive_dashboard_state(status, last_reading_at, now);

        let previous_state = {
            let mut entries = self.entries.write().await;

            if entries.len() >= MAX_ENTRIES && !entries.contains_key(unit_id) {
                evict_one_expired(&mut entries, now);
            }

            let previous = entries.get(unit_id).map(|entry| entry.dashboard_state);

            entries.insert(
                unit_id.to_string(),
                CacheEntry {
                    tenant_id: tenant_id.to_string(),
                    dashboard_state: new_state,
                    last_reading_at,
                    last_temperature_tenths,
                    expires_at: now + ENTRY_TTL,
                },
            );

            previous
        };

        if previous_state != Some(new_state) {
            let payload = json!({
                "previousState": previous_state,
                "newState": new_state,
                "reason": reason,
                "timestamp": now,
            });

            self.hub.emit_unit_state_changed(tenant_id, unit_id, payload).await;
        }
    }

    /// Flips any entry whose reading has gone stale to `Offline` without
    /// waiting for a fresh reading or evaluation pass to notice.
    async fn sweep_once(&self) {
        let now = Utc::now();
        let mut transitions = Vec::new();

        {
            let mut entries = self.entries.write().await;
            entries.retain(|_, entry| entry.expires_at > now);

            for (unit_id, entry) in entries.iter_mut() {
                let should_be_offline = match entry.last_reading_at {
                    Some(at) => now - at > STALE_READING_THRESHOLD,
                    None => true,
                };

                if should_be_offline && entry.dashboard_state != DashboardState::Offline {
                    let previous = entry.dashboard_state;
                    entry.dashboard_state = DashboardState::Offline;
                    transitions.push((entry.tenant_id.clone(), unit_id.clone(), previous));
                }
            }
        }

        for (tenant_id, unit_id, previous_state) in transitions {
            let payload = json!({
                "previousState": previous_state,
                "newState": DashboardState::Offline,
                "reason": "stale_reading_sweep",
                "timestamp": now,
            });

            self.hub.emit_unit_state_changed(&tenant_id, &unit_id, payload).await;
        }
    }

    pub async fn run_sweep_loop(self: Arc<Self>, cancellation: CancellationToken) {
        let mut ticker = tokio::time::interval(SWEEP_INTERVAL);

        loop {
            tokio::select! {
                _ = ticker.tick() => self.sweep_once().await,
                _ = cancellation.cancelled() => {
                    debug!("unit state cache sweep loop shutting down");
                    break;
                }
            }
        }
    }
}

fn evict_one_expired(entries: &mut HashMap<String, CacheEntry>, now: DateTime<Utc>) {
    if let Some(expired_key) = entries.iter().find(|(_, entry)| entry.expires_at <= now).map(|(key, _)| key.clone()) {
        entries.remove(&expired_key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_ok_is_normal() {
        let now = Utc::now();
        let state = derive_dashboard_state(UnitStatus::Ok, Some(now), now);
        assert_eq!(state, DashboardState::Normal);
    }

    #[test]
    fn stale_reading_overrides_ok_to_offline() {
        let now = Utc::now();
        let last_reading_at = now - ChronoDuration::seconds(60);
        let state = derive_dashboard_state(UnitStatus::Ok, Some(last_reading_at), now);
        assert_eq!(state, DashboardState::Offline);
    }

    #[test]
    fn alarm_active_is_critical() {
        let now = Utc::now();
        let state = derive_dashboard_state(UnitStatus::AlarmActive, Some(now), now);
        assert_eq!(state, DashboardState::Critical);
    }

    #[test]
    fn no_reading_at_all_is_offline() {
        let now = Utc::now();
        let state = derive_dashboard_state(UnitStatus::Ok, None, now);
        assert_eq!(state, DashboardState::Offline);
    }

    #[tokio::test]
    async fn refresh_emits_change_event_only_on_transition() {
        let hub = Arc::new(SubscriptionHub::new(Arc::new(
            super::super::cross_instance::NullCrossInstancePublisher,
        )));
        let mut subscriber = hub.subscribe();
        let cache = UnitStateCache::new(hub);

        cache.refresh("tenant-a", "unit-1", UnitStatus::Ok, Some(Utc::now()), Some(-180), "reading_evaluated").await;
        let first = subscriber.recv().await.expect("first transition event");
        assert_eq!(first.event, "unit:state:changed");

        cache.refresh("tenant-a", "unit-1", UnitStatus::Ok, Some(Utc::now()), Some(-181), "reading_evaluated").await;
        assert!(subscriber.try_recv().is_err(), "no event expected when dashboard state is unchanged");
    }
}
