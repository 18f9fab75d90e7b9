// [libs/domain/metrics/src/bucket.rs]
use chrono::{DateTime, Timelike, Utc};
use serde::{Deserialize, Serialize};
use typeshare::typeshare;

/// Only `hourly` is in scope; extending granularity is additive (new
/// variant plus a new `floor` arm), never a breaking change to this one.
#[typeshare]
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Granularity {
    Hourly,
}

impl Granularity {
    /// Floors `at` to the start of its bucket period.
    pub fn floor(self, at: DateTime<Utc>) -> DateTime<Utc> {
        match self {
            Granularity::Hourly => at
                .with_minute(0)
                .and_then(|d| d.with_second(0))
                .and_then(|d| d.with_nanosecond(0))
                .unwrap_or(at),
        }
    }
}

/// Per `(unitId, periodStart, granularity)`, unique-constrained and
/// mutated only via [`crate::merge::merge_bucket`]'s conflict-aware upsert
/// arithmetic — never a plain overwrite.
#[typeshare]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MetricBucket {
    pub unit_id: String,
    pub period_start: DateTime<Utc>,
    pub granularity: Granularity,
    pub min_temp_tenths: i32,
    pub max_temp_tenths: i32,
    pub sum_temp_tenths: i64,
    pub count: i64,
    pub min_humidity_tenths: Option<i32>,
    pub max_humidity_tenths: Option<i32>,
    pub anomaly_count: i64,
}

impl MetricBucket {
    /// `avg x count == sum` up to integer truncation of the division;
    /// exposed so tests (and any caller re-deriving `avg` from storage) use
    /// the same rounding the merge arithmetic assumes.
    pub fn avg_temp_tenths(&self) -> i64 {
        if self.count == 0 {
            0
        } else {
            self.sum_temp_tenths / self.count
        }
    }
}
