// [libs/domain/telemetry/src/reading.rs]
//! Immutable time-series row. Append-only; retention and partition
//! lifecycle are external collaborators (see SPEC_FULL.md §1, out of scope).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use typeshare::typeshare;

#[typeshare]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reading {
    pub id: String,
    pub unit_id: String,
    pub tenant_id: String,
    pub device_id: Option<String>,
    /// Fixed-point: real-world temperature * 10.
    pub temperature_tenths: i32,
    pub humidity_tenths: Option<i32>,
    pub battery_percent: Option<i32>,
    pub signal_strength: Option<i32>,
    /// Producer-assigned time the sample was taken.
    pub recorded_at: DateTime<Utc>,
    /// Server receipt time.
    pub received_at: DateTime<Utc>,
    pub source: String,
    pub raw_payload: Option<serde_json::Value>,
}

/// What the caller submits for ingestion, before a server identifier and
/// receipt timestamp are assigned.
#[typeshare]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadingInput {
    pub unit_id: String,
    pub device_id: Option<String>,
    pub temperature_tenths: i32,
    pub humidity_tenths: Option<i32>,
    pub battery_percent: Option<i32>,
    pub signal_strength: Option<i32>,
    pub recorded_at: DateTime<Utc>,
    pub source: String,
    pub raw_payload: Option<serde_json::Value>,
}
