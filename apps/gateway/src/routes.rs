// [apps/gateway/src/routes.rs]
//! Router composition (§7), grounded in the teacher's
//! `create_sovereign_router`: a CORS layer, a versioned API namespace,
//! and a `with_state` at the very end. Authentication/role checks are
//! out of scope for this core (SPEC_FULL.md §1, Non-goals) — no
//! `auth_guard` middleware layer here, only the per-handler `TenantId`
//! extractor.

use std::time::Duration;

use axum::http::{header, Method};
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::handlers::{alerts, health, ingestion, sms_webhook, stream};
use crate::state::AppState;

pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE, "x-tenant-id".parse().unwrap()])
        .max_age(Duration::from_secs(3600));

    let api_v1 = Router::new()
        .route("/readings", post(ingestion::ingest_readings))
        .route("/alerts", get(alerts::list_alerts))
        .route("/alerts/:id/acknowledge", post(alerts::acknowledge_alert))
        .route("/alerts/:id/resolve", post(alerts::resolve_alert))
        .route("/alerts/:id/escalate", post(alerts::escalate_alert))
        .route("/stream", get(stream::establish_stream))
        .route("/webhooks/sms", post(sms_webhook::receive_sms_webhook));

    Router::new()
        .route("/healthz", get(health::health))
        .nest("/api/v1", api_v1)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
