// [apps/gateway/src/services/job_queue.rs]
//! `JobQueue` seam (section 6.1): durable work queue carrying SMS dispatch
//! jobs and scheduler ticks. `SqliteJobQueue` is the concrete adapter over
//! `frostwatch_infra_db::QueueRepository`; tests can stand in a fake
//! implementing this trait directly without a database.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use frostwatch_infra_db::{DbError, QueueRepository, QueuedJob};

#[async_trait]
pub trait JobQueue: Send + Sync {
    async fn enqueue(&self, kind: &str, payload: &serde_json::Value, run_after: DateTime<Utc>) -> Result<String, DbError>;
    async fn claim_due(&self, limit: i64, now: DateTime<Utc>) -> Result<Vec<QueuedJob>, DbError>;
    async fn complete(&self, job_id: &str) -> Result<(), DbError>;
    async fn fail_with_backoff(&self, job: &QueuedJob, error_text: &str, now: DateTime<Utc>) -> Result<(), DbError>;
}

pub struct SqliteJobQueue {
    repository: QueueRepository,
}

impl SqliteJobQueue {
    pub fn new(repository: QueueRepository) -> Self {
        Self { repository }
    }
}

#[async_trait]
impl JobQueue for SqliteJobQueue {
    async fn enqueue(&self, kind: &str, payload: &serde_json::Value, run_after: DateTime<Utc>) -> Result<String, DbError> {
        self.repository.enqueue(kind, payload, run_after).await
    }

    async fn claim_due(&self, limit: i64, now: DateTime<Utc>) -> Result<Vec<QueuedJob>, DbError> {
        self.repository.claim_due(limit, now).await
    }

    async fn complete(&self, job_id: &str) -> Result<(), DbError> {
        self.repository.complete(job_id).await
    }

    async fn fail_with_backoff(&self, job: &QueuedJob, error_text: &str, now: DateTime<Utc>) -> Result<(), DbError> {
        self.repository.fail_with_backoff(job, error_text, now).await
    }
}

/// Payload shape enqueued for the SMS dispatcher (section 6): `{tenantId,
/// phone, message, alertId, deliveryId, userId?, alertType}`.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct SmsJobPayload {
    pub tenant_id: String,
    pub phone: String,
    pub message: String,
    pub alert_id: String,
    pub delivery_id: String,
    pub user_id: Option<String>,
    pub alert_type: String,
}

pub const SMS_JOB_KIND: &str = "sms_dispatch";
