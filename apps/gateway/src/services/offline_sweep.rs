// [apps/gateway/src/services/offline_sweep.rs]
//! Daemon that flips units whose last reading has gone stale past the
//! configured offline timeout to `offline`, independent of the Evaluator
//! (which only reacts to readings that actually arrive). Mirrors the
//! `UnitStateCache`'s own staleness sweep (§4.8) but acts on the
//! authoritative `units.status` column rather than the read-path cache.

use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::Utc;
use frostwatch_domain_telemetry::UnitStatus;
use frostwatch_infra_db::TenancyRepository;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::unit_state_cache::UnitStateCache;

const SWEEP_INTERVAL: StdDuration = StdDuration::from_secs(30);

pub struct OfflineSweepServices {
    pub tenancy: Arc<TenancyRepository>,
    pub unit_state_cache: Arc<UnitStateCache>,
    pub offline_timeout_seconds: i64,
}

async fn run_sweep_once(services: &OfflineSweepServices) {
    let flipped = match services.tenancy.sweep_offline_units(services.offline_timeout_seconds).await {
        Ok(flipped) => flipped,
        Err(error) => {
            warn!(%error, "offline sweep query failed, skipping this tick");
            return;
        }
    };

    for (unit_id, tenant_id) in flipped {
        services.unit_state_cache.refresh(&tenant_id, &unit_id, UnitStatus::Offline, None, None, "offline_sweep").await;
    }
}

pub async fn run_sweep_loop(services: Arc<OfflineSweepServices>, cancellation: CancellationToken) {
    let mut ticker = tokio::time::interval(SWEEP_INTERVAL);
    loop {
        tokio::select! {
            _ = ticker.tick() => run_sweep_once(&services).await,
            _ = cancellation.cancelled() => {
                debug!("offline sweep loop shutting down");
                break;
            }
        }
    }
}
