// [libs/domain/alerting/src/evaluation.rs]
//! Pure transition grammar for the state machine evaluator. This module
//! knows nothing about transactions, repositories, or clocks beyond the
//! `now`/`status_changed_at` instants it is handed; the stateful orchestration
//! (loading the unit row, opening a transaction, persisting the result) is
//! the gateway's `services::evaluator` concern.

use chrono::{DateTime, Utc};
use frostwatch_domain_telemetry::{EffectiveThresholds, UnitStatus};
use thiserror::Error;

use crate::alert::TriggeringBound;

/// Trailing in-band reading count required to confirm `restoring -> ok`.
pub const RESTORE_CONFIRM_READINGS: u32 = 3;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EvaluationError {
    #[error("unit status {0:?} is not a state the evaluator drives transitions from")]
    NonEvaluableStatus(UnitStatus),
}

/// The side effect the evaluator must ask the Alert Store to perform, if any.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertAction {
    /// No alert-store mutation this reading.
    None,
    /// Open a new alert (idempotent: no-op if one is already open for this
    /// unit/type) at `warning` severity.
    OpenWarning { triggering_bound: TriggeringBound },
    /// Escalate the currently open alert to `critical`, level 1.
    EscalateToCritical,
    /// Resolve the currently open alert; unit is re-entering the band.
    Resolve,
}

/// A single evaluated transition of a unit's status, plus the alert-store
/// side effect it implies. `consecutive_in_band_readings` is the counter
/// value the caller should persist on the unit row after this evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EvaluationResult {
    pub previous_status: UnitStatus,
    pub new_status: UnitStatus,
    pub transition: Transition,
    pub alert_action: AlertAction,
    pub consecutive_in_band_readings: u32,
}

impl EvaluationResult {
    fn no_change(status: UnitStatus, consecutive_in_band_readings: u32) -> Self {
        Self {
            previous_status: status,
            new_status: status,
            transition: Transition::NoChange,
            alert_action: AlertAction::None,
            consecutive_in_band_readings,
        }
    }
}

/// The kind of transition a reading produced, independent of the concrete
/// alert-store action. Useful for logging and for the stream buffer's
/// `dashboardState` derivation, which cares whether anything changed at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    NoChange,
    OkToExcursion,
    ExcursionToAlarmActive,
    ExcursionToRestoring,
    AlarmActiveToRestoring,
    RestoringToOk,
    RestoringReoccurredToExcursion,
    RestoringReoccurredToAlarmActive,
}

/// Evaluates one reading against the unit's current status and its
/// effective thresholds, per the transition table: `ok -> excursion`,
/// `excursion -> alarmActive` (confirmation-delay gated),
/// `excursion | alarmActive -> restoring` (hysteresis re-entry), and
/// `restoring -> ok` (trailing in-band reading count).
///
/// `status` must be one of `Ok`, `Excursion`, `AlarmActive`, or `Restoring`;
/// the `*-equivalent` statuses (`ManualRequired`, `MonitoringInterrupted`,
/// `Offline`) are not driven by this function and are rejected.
pub fn evaluate(
    status: UnitStatus,
    consecutive_in_band_readings: u32,
    temperature_tenths: i32,
    thresholds: &EffectiveThresholds,
    status_changed_at: DateTime<Utc>,
    now: DateTime<Utc>,
) -> Result<EvaluationResult, EvaluationError> {
    match status {
        UnitStatus::Ok => Ok(evaluate_from_ok(temperature_tenths, thresholds)),
        UnitStatus::Excursion => Ok(evaluate_from_excursion(
            temperature_tenths,
            thresholds,
            status_changed_at,
            now,
        )),
        UnitStatus::AlarmActive => Ok(evaluate_from_alarm_active(temperature_tenths, thresholds)),
        UnitStatus::Restoring => Ok(evaluate_from_restoring(
            temperature_tenths,
            thresholds,
            consecutive_in_band_readings,
        )),
        other => Err(EvaluationError::NonEvaluableStatus(other)),
    }
}

fn evaluate_from_ok(temperature_tenths: i32, thresholds: &EffectiveThresholds) -> EvaluationResult {
    if !thresholds.is_out_of_band(temperature_tenths) {
        return EvaluationResult::no_change(UnitStatus::Ok, 0);
    }
    let triggering_bound = if temperature_tenths < thresholds.min_temp_tenths {
        TriggeringBound::Min
    } else {
        TriggeringBound::Max
    };
    EvaluationResult {
        previous_status: UnitStatus::Ok,
        new_status: UnitStatus::Excursion,
        transition: Transition::OkToExcursion,
        alert_action: AlertAction::OpenWarning { triggering_bound },
        consecutive_in_band_readings: 0,
    }
}

fn evaluate_from_excursion(
    temperature_tenths: i32,
    thresholds: &EffectiveThresholds,
    status_changed_at: DateTime<Utc>,
    now: DateTime<Utc>,
) -> EvaluationResult {
    if thresholds.is_within_hysteresis_band(temperature_tenths) {
        return EvaluationResult {
            previous_status: UnitStatus::Excursion,
            new_status: UnitStatus::Restoring,
            transition: Transition::ExcursionToRestoring,
            alert_action: AlertAction::Resolve,
            consecutive_in_band_readings: 1,
        };
    }

    if thresholds.is_out_of_band(temperature_tenths) {
        let elapsed = now.signed_duration_since(status_changed_at).num_seconds();
        if elapsed >= thresholds.confirm_seconds {
            return EvaluationResult {
                previous_status: UnitStatus::Excursion,
                new_status: UnitStatus::AlarmActive,
                transition: Transition::ExcursionToAlarmActive,
                alert_action: AlertAction::EscalateToCritical,
                consecutive_in_band_readings: 0,
            };
        }
    }

    EvaluationResult::no_change(UnitStatus::Excursion, 0)
}

fn evaluate_from_alarm_active(
    temperature_tenths: i32,
    thresholds: &EffectiveThresholds,
) -> EvaluationResult {
    if thresholds.is_within_hysteresis_band(temperature_tenths) {
        return EvaluationResult {
            previous_status: UnitStatus::AlarmActive,
            new_status: UnitStatus::Restoring,
            transition: Transition::AlarmActiveToRestoring,
            alert_action: AlertAction::Resolve,
            consecutive_in_band_readings: 1,
        };
    }
    EvaluationResult::no_change(UnitStatus::AlarmActive, 0)
}

fn evaluate_from_restoring(
    temperature_tenths: i32,
    thresholds: &EffectiveThresholds,
    consecutive_in_band_readings: u32,
) -> EvaluationResult {
    if thresholds.is_within_hysteresis_band(temperature_tenths) {
        let count = consecutive_in_band_readings + 1;
        if count >= RESTORE_CONFIRM_READINGS {
            return EvaluationResult {
                previous_status: UnitStatus::Restoring,
                new_status: UnitStatus::Ok,
                transition: Transition::RestoringToOk,
                alert_action: AlertAction::None,
                consecutive_in_band_readings: 0,
            };
        }
        return EvaluationResult::no_change(UnitStatus::Restoring, count);
    }

    if thresholds.is_out_of_band(temperature_tenths) {
        let triggering_bound = if temperature_tenths < thresholds.min_temp_tenths {
            TriggeringBound::Min
        } else {
            TriggeringBound::Max
        };
        return EvaluationResult {
            previous_status: UnitStatus::Restoring,
            new_status: UnitStatus::Excursion,
            transition: Transition::RestoringReoccurredToExcursion,
            alert_action: AlertAction::OpenWarning { triggering_bound },
            consecutive_in_band_readings: 0,
        };
    }

    // In [min, max] but not yet within the hysteresis band: no-op, counter
    // does not advance (not yet a qualifying reading) nor reset (still in
    // range, not a re-excursion either).
    EvaluationResult::no_change(UnitStatus::Restoring, consecutive_in_band_readings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn thresholds() -> EffectiveThresholds {
        EffectiveThresholds {
            min_temp_tenths: 320,
            max_temp_tenths: 400,
            hysteresis_tenths: 5,
            confirm_seconds: 300,
        }
    }

    #[test]
    fn ok_to_excursion_opens_a_warning_on_high_side() {
        let result = evaluate_from_ok(410, &thresholds());
        assert_eq!(result.new_status, UnitStatus::Excursion);
        assert_eq!(
            result.alert_action,
            AlertAction::OpenWarning {
                triggering_bound: TriggeringBound::Max
            }
        );
    }

    #[test]
    fn ok_stays_ok_inside_band() {
        let result = evaluate_from_ok(360, &thresholds());
        assert_eq!(result.transition, Transition::NoChange);
    }

    #[test]
    fn excursion_escalates_only_after_confirm_delay_elapses() {
        let now = Utc::now();
        let changed_at = now - Duration::seconds(60);
        let result = evaluate_from_excursion(410, &thresholds(), changed_at, now);
        assert_eq!(result.transition, Transition::NoChange);

        let changed_at_long_ago = now - Duration::seconds(300);
        let result = evaluate_from_excursion(410, &thresholds(), changed_at_long_ago, now);
        assert_eq!(result.transition, Transition::ExcursionToAlarmActive);
        assert_eq!(result.alert_action, AlertAction::EscalateToCritical);
    }

    #[test]
    fn excursion_resolves_to_restoring_once_within_hysteresis_band() {
        let now = Utc::now();
        let result = evaluate_from_excursion(394, &thresholds(), now, now);
        assert_eq!(result.transition, Transition::ExcursionToRestoring);
        assert_eq!(result.alert_action, AlertAction::Resolve);
        assert_eq!(result.consecutive_in_band_readings, 1);
    }

    #[test]
    fn restoring_confirms_ok_on_third_consecutive_in_band_reading() {
        let t = thresholds();
        let r1 = evaluate_from_restoring(360, &t, 0);
        assert_eq!(r1.transition, Transition::NoChange);
        assert_eq!(r1.consecutive_in_band_readings, 1);

        let r2 = evaluate_from_restoring(360, &t, r1.consecutive_in_band_readings);
        assert_eq!(r2.consecutive_in_band_readings, 2);

        let r3 = evaluate_from_restoring(360, &t, r2.consecutive_in_band_readings);
        assert_eq!(r3.new_status, UnitStatus::Ok);
        assert_eq!(r3.transition, Transition::RestoringToOk);
        assert_eq!(r3.consecutive_in_band_readings, 0);
    }

    #[test]
    fn restoring_reoccurrence_resets_counter_and_reopens_alert() {
        let result = evaluate_from_restoring(410, &thresholds(), 2);
        assert_eq!(result.new_status, UnitStatus::Excursion);
        assert_eq!(result.transition, Transition::RestoringReoccurredToExcursion);
        assert_eq!(result.consecutive_in_band_readings, 0);
    }

    #[test]
    fn restoring_in_band_but_not_yet_past_hysteresis_does_not_advance_counter() {
        // 398 is inside [320, 400] but not within [325, 395].
        let result = evaluate_from_restoring(398, &thresholds(), 1);
        assert_eq!(result.transition, Transition::NoChange);
        assert_eq!(result.consecutive_in_band_readings, 1);
    }

    #[test]
    fn manual_required_is_rejected_as_non_evaluable() {
        let now = Utc::now();
        let err = evaluate(
            UnitStatus::ManualRequired,
            0,
            360,
            &thresholds(),
            now,
            now,
        )
        .unwrap_err();
        assert_eq!(err, EvaluationError::NonEvaluableStatus(UnitStatus::ManualRequired));
    }
}
