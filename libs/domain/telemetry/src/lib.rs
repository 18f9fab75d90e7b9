// [libs/domain/telemetry/src/lib.rs]
/*!
 * =================================================================
 * APARATO: COLD CHAIN TELEMETRY CONTRACT (ESTRATO L2)
 * RESPONSABILIDAD: ENTIDADES DE LA JERARQUIA TENANT -> SITE -> AREA -> UNIT
 *
 * Single source of truth for the location hierarchy, the immutable
 * reading stream, and the threshold-resolution value types. Nothing in
 * this crate touches a database connection or a network socket; it is
 * pure domain grammar shared by the infra and app strata.
 * =================================================================
 */

pub mod reading;
pub mod tenancy;
pub mod threshold;

pub use reading::{Reading, ReadingInput};
pub use tenancy::{Area, Site, Tenant, TemperatureUnit, Unit, UnitStatus};
pub use threshold::{
    select_most_specific, AlertRuleScope, CandidateRule, EffectiveThresholds, ThresholdError,
    HYSTERESIS_TENTHS,
};
