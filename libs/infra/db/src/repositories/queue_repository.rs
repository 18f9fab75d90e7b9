// [libs/infra/db/src/repositories/queue_repository.rs]
/*!
 * Durable job queue backing the `JobQueue` trait
 * (`frostwatch_gateway::services::job_queue`). Carries SMS dispatch jobs
 * and scheduler ticks with BullMQ-style exponential backoff: a failed job
 * is re-queued with `run_after` pushed out by `2^attempts` seconds, up to
 * `max_attempts`, after which it is left `failed` for operator triage.
 */

use crate::client::LedgerClient;
use crate::errors::DbError;
use chrono::{DateTime, Utc};
use libsql::params;
use serde::{Deserialize, Serialize};
use tracing::{instrument, warn};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueuedJob {
    pub id: String,
    pub kind: String,
    pub payload: serde_json::Value,
    pub attempts: u32,
    pub max_attempts: u32,
}

pub struct QueueRepository {
    client: LedgerClient,
}

impl QueueRepository {
    pub fn new(client: LedgerClient) -> Self {
        Self { client }
    }

    #[instrument(skip(self, payload))]
    pub async fn enqueue(&self, kind: &str, payload: &serde_json::Value, run_after: DateTime<Utc>) -> Result<String, DbError> {
        let connection = self.client.get_connection()?;
        let id = Uuid::new_v4().to_string();
        connection
            .execute(
                r#"
                INSERT INTO jobs (id, kind, payload, status, run_after)
                VALUES (?1, ?2, ?3, 'queued', ?4)
                "#,
                params![id.clone(), kind, payload.to_string(), run_after.to_rfc3339()],
            )
            .await?;
        Ok(id)
    }

    /// Claims up to `limit` due jobs atomically: selects then flips them
    /// to `running` within one transaction so two concurrent workers never
    /// claim the same job.
    #[instrument(skip(self))]
    pub async fn claim_due(&self, limit: i64, now: DateTime<Utc>) -> Result<Vec<QueuedJob>, DbError> {
        let connection = self.client.get_connection()?;
        let transaction = connection.transaction().await?;

        let mut rows = transaction
            .query(
                "SELECT id, kind, payload, attempts, max_attempts FROM jobs \
                 WHERE status = 'queued' AND run_after <= ?1 ORDER BY run_after ASC LIMIT ?2",
                params![now.to_rfc3339(), limit],
            )
            .await?;

        let mut claimed = Vec::new();
        while let Some(row) = rows.next().await? {
            let payload_raw: String = row.get(2)?;
            claimed.push(QueuedJob {
                id: row.get::<String>(0)?,
                kind: row.get::<String>(1)?,
                payload: serde_json::from_str(&payload_raw)
                    .map_err(|e| DbError::mapping(format!("job payload: {e}")))?,
                attempts: row.get::<i64>(3)? as u32,
                max_attempts: row.get::<i64>(4)? as u32,
            });
        }

        for job in &claimed {
            transaction
                .execute(
                    "UPDATE jobs SET status = 'running', updated_at = ?1 WHERE id = ?2",
                    params![now.to_rfc3339(), job.id.clone()],
                )
                .await?;
        }

        transaction.commit().await?;
        Ok(claimed)
    }

    #[instrument(skip(self))]
    pub async fn complete(&self, job_id: &str) -> Result<(), DbError> {
        let connection = self.client.get_connection()?;
        connection
            .execute(
                "UPDATE jobs SET status = 'completed', updated_at = datetime('now') WHERE id = ?1",
                params![job_id],
            )
            .await?;
        Ok(())
    }

    /// Exponential backoff: `run_after <- now + 2^attempts` seconds,
    /// capped by `max_attempts`; beyond that the job is left `failed`.
    #[instrument(skip(self, error_text))]
    pub async fn fail_with_backoff(&self, job: &QueuedJob, error_text: &str, now: DateTime<Utc>) -> Result<(), DbError> {
        let connection = self.client.get_connection()?;
        let attempts = job.attempts + 1;

        if attempts >= job.max_attempts {
            warn!(job_id = %job.id, kind = %job.kind, "job exhausted retry budget");
            connection
                .execute(
                    "UPDATE jobs SET status = 'failed', attempts = ?1, last_error = ?2, updated_at = ?3 WHERE id = ?4",
                    params![attempts as i64, error_text, now.to_rfc3339(), job.id.clone()],
                )
                .await?;
            return Ok(());
        }

        let backoff_seconds = 2i64.saturating_pow(attempts.min(20));
        let run_after = now + chrono::Duration::seconds(backoff_seconds);
        connection
            .execute(
                r#"
                UPDATE jobs
                SET status = 'queued', attempts = ?1, last_error = ?2, run_after = ?3, updated_at = ?4
                WHERE id = ?5
                "#,
                params![
                    attempts as i64,
                    error_text,
                    run_after.to_rfc3339(),
                    now.to_rfc3339(),
                    job.id.clone(),
                ],
            )
            .await?;
        Ok(())
    }
}
