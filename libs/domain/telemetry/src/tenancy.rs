// [libs/domain/telemetry/src/tenancy.rs]
/*!
 * Location hierarchy: Tenant -> Site -> Area -> Unit.
 *
 * Every read path for a leaf (Unit) validates the full chain against the
 * asserting tenant before any mutation is allowed; the `active` flag on
 * each level is the soft-delete marker checked by every query. None of
 * that validation lives here — this module only carries the shapes.
 */

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use typeshare::typeshare;

#[typeshare]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tenant {
    pub id: String,
    pub name: String,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

#[typeshare]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Site {
    pub id: String,
    pub tenant_id: String,
    pub name: String,
    pub active: bool,
}

#[typeshare]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Area {
    pub id: String,
    pub site_id: String,
    pub tenant_id: String,
    pub name: String,
    pub active: bool,
}

/// Degrees Fahrenheit or Celsius; bounds and readings are always stored in
/// tenths of a degree in this unit, never converted implicitly.
#[typeshare]
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum TemperatureUnit {
    F,
    C,
}

/// Finite set of FSM states for a unit. `ManualRequired`, `MonitoringInterrupted`
/// and `Offline` are set by paths outside the Evaluator (manual override, the
/// offline sweep) and are treated as `Ok`-equivalent by the Evaluator unless a
/// reading explicitly drives a transition out of them.
#[typeshare]
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum UnitStatus {
    Ok,
    Excursion,
    AlarmActive,
    Restoring,
    ManualRequired,
    MonitoringInterrupted,
    Offline,
}

impl UnitStatus {
    /// Whether the Evaluator should treat this status as equivalent to `Ok`
    /// for the purpose of the `ok -> excursion` transition predicate.
    pub fn is_ok_equivalent(self) -> bool {
        matches!(
            self,
            UnitStatus::Ok | UnitStatus::ManualRequired | UnitStatus::MonitoringInterrupted | UnitStatus::Offline
        )
    }
}

#[typeshare]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Unit {
    pub id: String,
    pub area_id: String,
    pub site_id: String,
    pub tenant_id: String,
    pub display_name: String,
    pub min_temp_tenths: Option<i32>,
    pub max_temp_tenths: Option<i32>,
    pub temperature_unit: TemperatureUnit,
    pub status: UnitStatus,
    pub last_reading_at: Option<DateTime<Utc>>,
    pub last_temperature_tenths: Option<i32>,
    pub status_changed_at: DateTime<Utc>,
    /// Count of consecutive in-band readings while `status == Restoring`; see
    /// the restoration policy documented on `EffectiveThresholds`.
    pub consecutive_in_band_readings: u32,
    pub active: bool,
}

impl Unit {
    /// `minTemp < maxTemp` when both set; enforced at every write path, not
    /// just at construction, so this is exposed as a reusable check.
    pub fn bounds_are_coherent(&self) -> bool {
        match (self.min_temp_tenths, self.max_temp_tenths) {
            (Some(min), Some(max)) => min < max,
            _ => true,
        }
    }
}
