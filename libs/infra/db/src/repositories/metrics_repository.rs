// [libs/infra/db/src/repositories/metrics_repository.rs]
/*!
 * Metrics Aggregator upsert. The conflict-aware merge arithmetic mirrors
 * `frostwatch_domain_metrics::merge_bucket` exactly — `min <- LEAST`,
 * `max <- GREATEST`, `sum`/`count`/`anomalies` additive — executed as a
 * single `ON CONFLICT` statement so there is no read-then-write race
 * window between concurrent batches touching the same bucket.
 */

use crate::client::LedgerClient;
use crate::errors::DbError;
use chrono::{DateTime, Utc};
use frostwatch_domain_metrics::IncomingGroup;
use libsql::params;
use tracing::instrument;

pub struct MetricsRepository {
    client: LedgerClient,
}

impl MetricsRepository {
    pub fn new(client: LedgerClient) -> Self {
        Self { client }
    }

    /// One round trip per `(unit, hour)` group; `granularity` is always
    /// `"hourly"` in scope but threaded through rather than hardcoded so
    /// extending granularity is additive, not a signature break.
    #[instrument(skip(self, group))]
    pub async fn upsert_bucket(
        &self,
        unit_id: &str,
        period_start: DateTime<Utc>,
        granularity: &str,
        group: &IncomingGroup,
    ) -> Result<(), DbError> {
        let connection = self.client.get_connection()?;
        connection
            .execute(
                r#"
                INSERT INTO metric_buckets (
                    unit_id, period_start, granularity,
                    min_temp_tenths, max_temp_tenths, sum_temp_tenths, count,
                    min_humidity_tenths, max_humidity_tenths, anomaly_count
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
                ON CONFLICT(unit_id, period_start, granularity) DO UPDATE SET
                    min_temp_tenths = MIN(min_temp_tenths, excluded.min_temp_tenths),
                    max_temp_tenths = MAX(max_temp_tenths, excluded.max_temp_tenths),
                    sum_temp_tenths = sum_temp_tenths + excluded.sum_temp_tenths,
                    count = count + excluded.count,
                    min_humidity_tenths = CASE
                        WHEN excluded.min_humidity_tenths IS NULL THEN min_humidity_tenths
                        WHEN min_humidity_tenths IS NULL THEN excluded.min_humidity_tenths
                        ELSE MIN(min_humidity_tenths, excluded.min_humidity_tenths)
                    END,
                    max_humidity_tenths = CASE
                        WHEN excluded.max_humidity_tenths IS NULL THEN max_humidity_tenths
                        WHEN max_humidity_tenths IS NULL THEN excluded.max_humidity_tenths
                        ELSE MAX(max_humidity_tenths, excluded.max_humidity_tenths)
                    END,
                    anomaly_count = anomaly_count + excluded.anomaly_count
                "#,
                params![
                    unit_id,
                    period_start.to_rfc3339(),
                    granularity,
                    group.min_temp_tenths as i64,
                    group.max_temp_tenths as i64,
                    group.sum_temp_tenths,
                    group.count,
                    group.min_humidity_tenths.map(|v| v as i64),
                    group.max_humidity_tenths.map(|v| v as i64),
                    group.anomaly_count,
                ],
            )
            .await?;
        Ok(())
    }
}
