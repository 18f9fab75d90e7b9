// [apps/gateway/src/state.rs]
//! Composition root (§6.1): connects the ledger once, builds every
//! repository wrapped in `Arc`, constructs the external-collaborator
//! adapters (`SmsProvider`, `JobQueue`, `CrossInstancePublisher`) behind
//! their trait seams, and bundles all of it into the per-subsystem
//! `*Services` structs the services layer already defines. Mirrors the
//! teacher's `AppState::new` shape — one constructor, no ambient
//! singletons, everything handed in as a concrete dependency.

use std::sync::Arc;

use frostwatch_infra_db::{
    AlertRepository, EscalationRepository, LedgerClient, MetricsRepository, QueueRepository,
    ReadingRepository, TenancyRepository, ThresholdRepository,
};
use frostwatch_infra_sms::{HttpSmsProvider, SmsProvider};
use tokio_util::sync::CancellationToken;

use crate::config::AppConfig;
use crate::services::alert_service::AlertServices;
use crate::services::cross_instance::NullCrossInstancePublisher;
use crate::services::escalation_engine::EscalationServices;
use crate::services::evaluator::EvaluatorServices;
use crate::services::ingestion_orchestrator::IngestionServices;
use crate::services::job_queue::{JobQueue, SqliteJobQueue};
use crate::services::offline_sweep::OfflineSweepServices;
use crate::services::sms_dispatcher::SmsDispatcherServices;
use crate::services::stream_buffer::StreamBuffer;
use crate::services::subscription_hub::SubscriptionHub;
use crate::services::unit_state_cache::UnitStateCache;

/// Shared, cheaply-clonable application state handed to every Axum
/// handler via `State<AppState>`. Every field is an `Arc`-wrapped
/// repository or service; the `*Services` bundles are plain structs of
/// `Arc`s, so cloning `AppState` is O(1) regardless of which handler
/// needs which subset.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    /// Fires once on graceful shutdown; handlers pass this into request-scoped
    /// calls that accept a `CancellationToken` (the ingestion orchestrator) so
    /// an in-flight batch can cut its losses cleanly rather than racing the
    /// socket being torn out from under it.
    pub shutdown: CancellationToken,
    pub tenancy: Arc<TenancyRepository>,
    pub alerts: Arc<AlertRepository>,
    pub escalation: Arc<EscalationRepository>,
    pub hub: Arc<SubscriptionHub>,
    pub unit_state_cache: Arc<UnitStateCache>,
    pub stream_buffer: Arc<StreamBuffer>,
    pub jobs: Arc<dyn JobQueue>,

    pub ingestion: Arc<IngestionServices>,
    pub evaluator: Arc<EvaluatorServices>,
    pub escalation_services: Arc<EscalationServices>,
    pub alert_services: Arc<AlertServices>,
    pub offline_sweep: Arc<OfflineSweepServices>,
    pub sms_dispatcher: Arc<SmsDispatcherServices>,
}

impl AppState {
    pub async fn new(config: AppConfig, shutdown: CancellationToken) -> Result<Self, frostwatch_infra_db::DbError> {
        let client = LedgerClient::connect(&config.database_url, config.database_auth_token.clone()).await?;

        let tenancy = Arc::new(TenancyRepository::new(client.clone()));
        let thresholds = Arc::new(ThresholdRepository::new(client.clone()));
        let readings = Arc::new(ReadingRepository::new(client.clone()));
        let metrics = Arc::new(MetricsRepository::new(client.clone()));
        let alerts = Arc::new(AlertRepository::new(client.clone()));
        let escalation = Arc::new(EscalationRepository::new(client.clone()));
        let queue_repository = QueueRepository::new(client.clone());

        let cross_instance = Arc::new(NullCrossInstancePublisher);
        let hub = Arc::new(SubscriptionHub::new(cross_instance));
        let unit_state_cache = Arc::new(UnitStateCache::new(hub.clone()));
        let stream_buffer = Arc::new(StreamBuffer::new(hub.clone()));
        let jobs: Arc<dyn JobQueue> = Arc::new(SqliteJobQueue::new(queue_repository));

        let sms_provider: Arc<dyn SmsProvider> = Arc::new(HttpSmsProvider::new(
            config.sms_provider_base_url.clone(),
            config.sms_provider_api_key.clone(),
        ));

        let evaluator = Arc::new(EvaluatorServices {
            ledger: client.clone(),
            tenancy: tenancy.clone(),
            thresholds: thresholds.clone(),
            alerts: alerts.clone(),
            hub: hub.clone(),
            unit_state_cache: unit_state_cache.clone(),
        });

        let ingestion = Arc::new(IngestionServices {
            tenancy: tenancy.clone(),
            thresholds: thresholds.clone(),
            readings: readings.clone(),
            metrics: metrics.clone(),
            stream_buffer: stream_buffer.clone(),
            evaluator: EvaluatorServices {
                ledger: client.clone(),
                tenancy: tenancy.clone(),
                thresholds: thresholds.clone(),
                alerts: alerts.clone(),
                hub: hub.clone(),
                unit_state_cache: unit_state_cache.clone(),
            },
        });

        let escalation_services = Arc::new(EscalationServices {
            alerts: alerts.clone(),
            escalation: escalation.clone(),
            jobs: jobs.clone(),
            hub: hub.clone(),
            cooldowns: config.cooldowns,
        });

        let alert_services = Arc::new(AlertServices {
            alerts: alerts.clone(),
            tenancy: tenancy.clone(),
            unit_state_cache: unit_state_cache.clone(),
            hub: hub.clone(),
        });

        let offline_sweep = Arc::new(OfflineSweepServices {
            tenancy: tenancy.clone(),
            unit_state_cache: unit_state_cache.clone(),
            offline_timeout_seconds: config.offline_timeout_seconds,
        });

        let sms_dispatcher = Arc::new(SmsDispatcherServices {
            jobs: jobs.clone(),
            escalation: escalation.clone(),
            provider: sms_provider,
        });

        Ok(Self {
            config: Arc::new(config),
            shutdown,
            tenancy,
            alerts,
            escalation,
            hub,
            unit_state_cache,
            stream_buffer,
            jobs,
            ingestion,
            evaluator,
            escalation_services,
            alert_services,
            offline_sweep,
            sms_dispatcher,
        })
    }
}
