// [apps/gateway/src/main.rs]
//! Entry point for the Frostwatch ingestion/alerting/stream gateway.
//! Boots config, connects the ledger (which applies the schema on first
//! connect, see `frostwatch_infra_db::client`), builds `AppState`, spawns
//! the daemon loops the spec's stateful components own (stream buffer
//! flush, escalation sweep, offline sweep, sms dispatch), and serves the
//! Axum router until a shutdown signal fires.

mod config;
mod errors;
mod handlers;
mod routes;
mod services;
mod state;
mod tenant;

use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use config::AppConfig;
use state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    frostwatch_shared_tracing::init_tracing("frostwatch_gateway");

    let config = AppConfig::from_env();
    let listen_port = config.listen_port;
    let shutdown = CancellationToken::new();

    let state = AppState::new(config, shutdown.clone()).await.map_err(|error| {
        error!(%error, "failed to initialize application state");
        anyhow::anyhow!(error)
    })?;

    spawn_daemons(&state, shutdown.clone());

    let router = routes::create_router(state);
    let listener = tokio::net::TcpListener::bind(("0.0.0.0", listen_port)).await?;
    info!(port = listen_port, "frostwatch gateway listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(wait_for_shutdown_signal(shutdown))
        .await?;

    info!("frostwatch gateway shut down cleanly");
    Ok(())
}

/// Spawns the long-lived daemon loops described in §4.6-4.8: the stream
/// buffer flush ticker, the escalation sweep, the offline sweep, and the
/// SMS dispatch consumer. Each owns its own cancellation-aware loop and
/// is independent of the request-handling path.
fn spawn_daemons(state: &AppState, shutdown: CancellationToken) {
    let stream_buffer = state.stream_buffer.clone();
    tokio::spawn(stream_buffer.run_flush_loop(shutdown.clone()));

    let unit_state_cache = state.unit_state_cache.clone();
    tokio::spawn(unit_state_cache.run_sweep_loop(shutdown.clone()));

    let offline_sweep = state.offline_sweep.clone();
    tokio::spawn(services::offline_sweep::run_sweep_loop(offline_sweep, shutdown.clone()));

    let sms_dispatcher = state.sms_dispatcher.clone();
    tokio::spawn(services::sms_dispatcher::run_dispatch_loop(sms_dispatcher, shutdown.clone()));

    let escalation_services = state.escalation_services.clone();
    let tenancy = state.tenancy.clone();
    let tenant_ids_source: services::escalation_engine::TenantIdsSource = Box::new(move || {
        let tenancy = tenancy.clone();
        Box::pin(async move { tenancy.list_active_tenant_ids().await.unwrap_or_default() })
    });
    tokio::spawn(services::escalation_engine::run_sweep_loop(
        escalation_services,
        tenant_ids_source,
        shutdown,
    ));
}

async fn wait_for_shutdown_signal(shutdown: CancellationToken) {
    let ctrl_c = async {
        signal::ctrl_c().await.expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("received ctrl-c, shutting down"),
        _ = terminate => info!("received sigterm, shutting down"),
    }

    shutdown.cancel();
}

