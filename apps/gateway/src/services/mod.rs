// [apps/gateway/src/services/mod.rs]
//! The stateful orchestration layer (section 4): every module here composes
//! one or more infra repositories with the pure domain grammar and is where
//! a database write, a stream event, or a job-queue enqueue actually
//! happens. Nothing upstream of this layer (the domain crates) knows a
//! database exists; nothing downstream (the infra repositories) knows why a
//! row is being written.

pub mod alert_service;
pub mod cross_instance;
pub mod escalation_engine;
pub mod evaluator;
pub mod ingestion_orchestrator;
pub mod job_queue;
pub mod offline_sweep;
pub mod sms_dispatcher;
pub mod stream_buffer;
pub mod subscription_hub;
pub mod unit_state_cache;
