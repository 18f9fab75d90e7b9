// [libs/domain/metrics/src/merge.rs]
//! Conflict-aware upsert arithmetic. One call merges one incoming group into
//! one existing bucket (or creates it, when `existing` is `None`) — the
//! caller issues exactly one round trip per group; this module only does
//! the arithmetic the SQL `ON CONFLICT` clause mirrors, so the property
//! tests here and the SQL text can be checked against each other by eye.

use crate::bucket::{Granularity, MetricBucket};

/// One group of readings for a single `(unit, hour)`, already reduced to
/// local min/max/sum/count before the merge call — the Aggregator computes
/// this per group from the batch, never from a second query.
#[derive(Debug, Clone, Copy)]
pub struct IncomingGroup {
    pub min_temp_tenths: i32,
    pub max_temp_tenths: i32,
    pub sum_temp_tenths: i64,
    pub count: i64,
    pub min_humidity_tenths: Option<i32>,
    pub max_humidity_tenths: Option<i32>,
    pub anomaly_count: i64,
}

fn merge_optional_min(existing: Option<i32>, incoming: Option<i32>) -> Option<i32> {
    match (existing, incoming) {
        (Some(e), Some(i)) => Some(e.min(i)),
        (Some(e), None) => Some(e),
        (None, Some(i)) => Some(i),
        (None, None) => None,
    }
}

fn merge_optional_max(existing: Option<i32>, incoming: Option<i32>) -> Option<i32> {
    match (existing, incoming) {
        (Some(e), Some(i)) => Some(e.max(i)),
        (Some(e), None) => Some(e),
        (None, Some(i)) => Some(i),
        (None, None) => None,
    }
}

/// Produces the bucket row to write: a fresh insert when `existing` is
/// `None`, otherwise the merged row per the upsert contract (`min <-
/// LEAST`, `max <- GREATEST`, `sum`/`count`/`anomalies` additive). Humidity
/// bounds propagate only when one side actually has a humidity reading,
/// per the "propagate only when the incoming group contains humidity" rule.
pub fn merge_bucket(
    unit_id: &str,
    period_start: chrono::DateTime<chrono::Utc>,
    granularity: Granularity,
    existing: Option<&MetricBucket>,
    incoming: &IncomingGroup,
) -> MetricBucket {
    match existing {
        None => MetricBucket {
            unit_id: unit_id.to_string(),
            period_start,
            granularity,
            min_temp_tenths: incoming.min_temp_tenths,
            max_temp_tenths: incoming.max_temp_tenths,
            sum_temp_tenths: incoming.sum_temp_tenths,
            count: incoming.count,
            min_humidity_tenths: incoming.min_humidity_tenths,
            max_humidity_tenths: incoming.max_humidity_tenths,
            anomaly_count: incoming.anomaly_count,
        },
        Some(existing) => MetricBucket {
            unit_id: unit_id.to_string(),
            period_start,
            granularity,
            min_temp_tenths: existing.min_temp_tenths.min(incoming.min_temp_tenths),
            max_temp_tenths: existing.max_temp_tenths.max(incoming.max_temp_tenths),
            sum_temp_tenths: existing.sum_temp_tenths + incoming.sum_temp_tenths,
            count: existing.count + incoming.count,
            min_humidity_tenths: merge_optional_min(
                existing.min_humidity_tenths,
                incoming.min_humidity_tenths,
            ),
            max_humidity_tenths: merge_optional_max(
                existing.max_humidity_tenths,
                incoming.max_humidity_tenths,
            ),
            anomaly_count: existing.anomaly_count + incoming.anomaly_count,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn hour() -> chrono::DateTime<chrono::Utc> {
        chrono::Utc.with_ymd_and_hms(2026, 1, 1, 9, 0, 0).unwrap()
    }

    #[test]
    fn first_merge_into_empty_bucket_is_a_plain_insert() {
        let incoming = IncomingGroup {
            min_temp_tenths: 300,
            max_temp_tenths: 350,
            sum_temp_tenths: 1300,
            count: 4,
            min_humidity_tenths: None,
            max_humidity_tenths: None,
            anomaly_count: 0,
        };
        let bucket = merge_bucket("u1", hour(), Granularity::Hourly, None, &incoming);
        assert_eq!(bucket.min_temp_tenths, 300);
        assert_eq!(bucket.max_temp_tenths, 350);
        assert_eq!(bucket.sum_temp_tenths, 1300);
        assert_eq!(bucket.count, 4);
    }

    #[test]
    fn second_merge_matches_the_worked_scenario() {
        let first = IncomingGroup {
            min_temp_tenths: 300,
            max_temp_tenths: 350,
            sum_temp_tenths: 1300,
            count: 4,
            min_humidity_tenths: None,
            max_humidity_tenths: None,
            anomaly_count: 0,
        };
        let existing = merge_bucket("u1", hour(), Granularity::Hourly, None, &first);

        let second = IncomingGroup {
            min_temp_tenths: 290,
            max_temp_tenths: 360,
            sum_temp_tenths: 680,
            count: 2,
            min_humidity_tenths: None,
            max_humidity_tenths: None,
            anomaly_count: 0,
        };
        let merged = merge_bucket("u1", hour(), Granularity::Hourly, Some(&existing), &second);

        assert_eq!(merged.min_temp_tenths, 290);
        assert_eq!(merged.max_temp_tenths, 360);
        assert_eq!(merged.sum_temp_tenths, 1980);
        assert_eq!(merged.count, 6);
        assert_eq!(merged.avg_temp_tenths(), 330);
    }

    #[test]
    fn humidity_bounds_propagate_only_when_present() {
        let no_humidity = IncomingGroup {
            min_temp_tenths: 300,
            max_temp_tenths: 350,
            sum_temp_tenths: 1300,
            count: 4,
            min_humidity_tenths: None,
            max_humidity_tenths: None,
            anomaly_count: 0,
        };
        let existing = merge_bucket("u1", hour(), Granularity::Hourly, None, &no_humidity);
        assert_eq!(existing.min_humidity_tenths, None);

        let with_humidity = IncomingGroup {
            min_temp_tenths: 290,
            max_temp_tenths: 360,
            sum_temp_tenths: 680,
            count: 2,
            min_humidity_tenths: Some(400),
            max_humidity_tenths: Some(450),
            anomaly_count: 0,
        };
        let merged = merge_bucket("u1", hour(), Granularity::Hourly, Some(&existing), &with_humidity);
        assert_eq!(merged.min_humidity_tenths, Some(400));
        assert_eq!(merged.max_humidity_tenths, Some(450));
    }

    proptest::proptest! {
        #[test]
        fn merged_bucket_bounds_contain_both_inputs(
            e_min in -500i32..500, e_span in 0i32..200,
            i_min in -500i32..500, i_span in 0i32..200,
            e_count in 1i64..100, i_count in 1i64..100,
        ) {
            let existing = MetricBucket {
                unit_id: "u1".into(),
                period_start: hour(),
                granularity: Granularity::Hourly,
                min_temp_tenths: e_min,
                max_temp_tenths: e_min + e_span,
                sum_temp_tenths: e_min as i64 * e_count,
                count: e_count,
                min_humidity_tenths: None,
                max_humidity_tenths: None,
                anomaly_count: 0,
            };
            let incoming = IncomingGroup {
                min_temp_tenths: i_min,
                max_temp_tenths: i_min + i_span,
                sum_temp_tenths: i_min as i64 * i_count,
                count: i_count,
                min_humidity_tenths: None,
                max_humidity_tenths: None,
                anomaly_count: 0,
            };
            let merged = merge_bucket("u1", hour(), Granularity::Hourly, Some(&existing), &incoming);

            prop_assert!(merged.min_temp_tenths <= existing.min_temp_tenths);
            prop_assert!(merged.min_temp_tenths <= incoming.min_temp_tenths);
            prop_assert!(merged.max_temp_tenths >= existing.max_temp_tenths);
            prop_assert!(merged.max_temp_tenths >= incoming.max_temp_tenths);
            prop_assert_eq!(merged.count, existing.count + incoming.count);
            prop_assert!(merged.min_temp_tenths <= merged.avg_temp_tenths() as i32);
            prop_assert!(merged.avg_temp_tenths() as i32 <= merged.max_temp_tenths);
        }
    }
}
