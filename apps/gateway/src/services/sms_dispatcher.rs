// [apps/gateway/src/services/sms_dispatcher.rs]
//! Job-queue consumer for `sms_dispatch` jobs (§4.6 "Failure semantics").
//! This worker never retries on its own — a failed send marks the
//! delivery `failed` and hands the job back to `JobQueue::fail_with_backoff`,
//! which owns the retry schedule (`2^attempts` seconds, capped, up to
//! `max_attempts`). A send failure never rolls back the escalation level
//! bump that queued the job; it only ever touches the delivery row and the
//! job itself.

use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::Utc;
use frostwatch_domain_escalation::DeliveryStatus;
use frostwatch_infra_db::{EscalationRepository, QueuedJob};
use frostwatch_infra_sms::{ClientError, SendSmsRequest, SmsProvider};
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument, warn};

use super::job_queue::{JobQueue, SmsJobPayload, SMS_JOB_KIND};

const POLL_INTERVAL: StdDuration = StdDuration::from_secs(2);
const CLAIM_BATCH_SIZE: i64 = 20;

pub struct SmsDispatcherServices {
    pub jobs: Arc<dyn JobQueue>,
    pub escalation: Arc<EscalationRepository>,
    pub provider: Arc<dyn SmsProvider>,
}

/// Processes one claimed job end to end. Errors are swallowed after being
/// logged and reflected into `fail_with_backoff`; the sweep loop always
/// moves on to the next job.
#[instrument(skip(services, job), fields(job_id = %job.id))]
async fn process_job(services: &SmsDispatcherServices, job: &QueuedJob) {
    let now = Utc::now();

    let payload: SmsJobPayload = match serde_json::from_value(job.payload.clone()) {
        Ok(payload) => payload,
        Err(error) => {
            warn!(%error, "sms job payload did not deserialize, marking failed without retry value");
            if let Err(error) = services.jobs.fail_with_backoff(job, &error.to_string(), now).await {
                warn!(%error, "failed to record backoff for undeserializable job");
            }
            return;
        }
    };

    let request = SendSmsRequest {
        to: payload.phone.clone(),
        message: payload.message.clone(),
        messaging_profile_id: None,
    };

    match services.provider.send(request).await {
        Ok(response) => {
            if let Err(error) = services
                .escalation
                .mark_delivery_outcome(&payload.delivery_id, DeliveryStatus::Sent, Some(&response.provider_message_id), None, now)
                .await
            {
                warn!(%error, delivery_id = %payload.delivery_id, "failed to record sent delivery outcome");
            }
            if let Err(error) = services.jobs.complete(&job.id).await {
                warn!(%error, job_id = %job.id, "failed to mark sms job complete");
            }
        }
        Err(error) => {
            let error_text = describe_client_error(&error);
            if let Err(db_error) = services
                .escalation
                .mark_delivery_outcome(&payload.delivery_id, DeliveryStatus::Failed, None, Some(&error_text), now)
                .await
            {
                warn!(%db_error, delivery_id = %payload.delivery_id, "failed to record failed delivery outcome");
            }
            if let Err(db_error) = services.jobs.fail_with_backoff(job, &error_text, now).await {
                warn!(%db_error, job_id = %job.id, "failed to schedule sms job retry backoff");
            }
        }
    }
}

fn describe_client_error(error: &ClientError) -> String {
    error.to_string()
}

/// Claims up to [`CLAIM_BATCH_SIZE`] due `sms_dispatch` jobs every tick and
/// dispatches each sequentially; concurrency is bounded by the provider's
/// own connection pool rather than fanned out further here.
async fn run_poll_once(services: &SmsDispatcherServices) {
    let now = Utc::now();
    let jobs = match services.jobs.claim_due(CLAIM_BATCH_SIZE, now).await {
        Ok(jobs) => jobs,
        Err(error) => {
            warn!(%error, "failed to claim due sms jobs this tick");
            return;
        }
    };

    for job in jobs {
        if job.kind != SMS_JOB_KIND {
            continue;
        }
        process_job(services, &job).await;
    }
}

pub async fn run_dispatch_loop(services: Arc<SmsDispatcherServices>, cancellation: CancellationToken) {
    let mut ticker = tokio::time::interval(POLL_INTERVAL);
    loop {
        tokio::select! {
            _ = ticker.tick() => run_poll_once(&services).await,
            _ = cancellation.cancelled() => {
                debug!("sms dispatch loop shutting down");
                break;
            }
        }
    }
}
