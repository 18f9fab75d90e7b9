// [libs/domain/telemetry/src/threshold.rs]
/*!
 * Effective threshold resolution grammar.
 *
 * `EffectiveThresholds` is derived, never persisted: it is the per-evaluation
 * tuple combining a unit's own bounds, the most specific enabled `AlertRule`,
 * and the static hysteresis constant. The specificity ordering and the
 * override-merge live here as pure functions so both the infra repository
 * (which fetches candidate rows) and the gateway's resolver service (which
 * picks the winner) share one definition of "most specific".
 */

use serde::{Deserialize, Serialize};
use thiserror::Error;
use typeshare::typeshare;

/// Half-width hysteresis band, fixed-point tenths of a degree (0.5 degree).
pub const HYSTERESIS_TENTHS: i32 = 5;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ThresholdError {
    #[error("unit not found")]
    NotFound,
    #[error("no threshold bounds resolved for this unit")]
    NoThresholds,
}

#[typeshare]
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
pub enum AlertRuleScope {
    /// `site_id IS NULL AND unit_id IS NULL` — weakest match.
    Tenant,
    /// `site_id = unit.site AND unit_id IS NULL`.
    Site,
    /// `unit_id = unit`- strongest match.
    Unit,
}

/// A single enabled rule row as loaded from storage, reduced to the fields
/// the resolver needs to rank and apply it. `id` is the tie-break key for
/// two enabled rules that would otherwise match at the same scope (resolves
/// the precedence Open Question in SPEC_FULL.md §3.1): lower id wins.
#[derive(Debug, Clone)]
pub struct CandidateRule {
    pub id: i64,
    pub scope: AlertRuleScope,
    pub min_temp_tenths: Option<i32>,
    pub max_temp_tenths: Option<i32>,
    pub confirm_minutes: Option<i32>,
}

/// Picks the most specific rule: `Unit` > `Site` > `Tenant`, ties broken by
/// ascending `id` (earliest-created wins). Returns `None` if `candidates` is
/// empty.
pub fn select_most_specific(candidates: &[CandidateRule]) -> Option<&CandidateRule> {
    candidates
        .iter()
        .max_by(|a, b| a.scope.cmp(&b.scope).then(b.id.cmp(&a.id)))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EffectiveThresholds {
    pub min_temp_tenths: i32,
    pub max_temp_tenths: i32,
    pub hysteresis_tenths: i32,
    pub confirm_seconds: i64,
}

impl EffectiveThresholds {
    /// Combines the unit's own bounds with an optional winning rule
    /// override. Either side of the rule's bounds may be null, in which
    /// case the unit's own value is kept. `confirm_seconds` defaults to `0`
    /// (immediate confirmation) when no rule supplies a delay.
    pub fn resolve(
        unit_min_tenths: Option<i32>,
        unit_max_tenths: Option<i32>,
        winning_rule: Option<&CandidateRule>,
    ) -> Result<Self, ThresholdError> {
        let min_temp_tenths = winning_rule
            .and_then(|rule| rule.min_temp_tenths)
            .or(unit_min_tenths);
        let max_temp_tenths = winning_rule
            .and_then(|rule| rule.max_temp_tenths)
            .or(unit_max_tenths);

        let (min_temp_tenths, max_temp_tenths) = match (min_temp_tenths, max_temp_tenths) {
            (Some(min), Some(max)) => (min, max),
            _ => return Err(ThresholdError::NoThresholds),
        };

        let confirm_seconds = winning_rule
            .and_then(|rule| rule.confirm_minutes)
            .map(|minutes| i64::from(minutes) * 60)
            .unwrap_or(0);

        Ok(Self {
            min_temp_tenths,
            max_temp_tenths,
            hysteresis_tenths: HYSTERESIS_TENTHS,
            confirm_seconds,
        })
    }

    pub fn is_out_of_band(&self, temperature_tenths: i32) -> bool {
        temperature_tenths < self.min_temp_tenths || temperature_tenths > self.max_temp_tenths
    }

    /// Restoration requires re-entering the band by at least the hysteresis
    /// on both sides, preventing flap near a bound.
    pub fn is_within_hysteresis_band(&self, temperature_tenths: i32) -> bool {
        temperature_tenths >= self.min_temp_tenths + self.hysteresis_tenths
            && temperature_tenths <= self.max_temp_tenths - self.hysteresis_tenths
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule(id: i64, scope: AlertRuleScope) -> CandidateRule {
        CandidateRule { id, scope, min_temp_tenths: None, max_temp_tenths: None, confirm_minutes: None }
    }

    #[test]
    fn unit_scope_beats_site_and_tenant() {
        let candidates = vec![rule(1, AlertRuleScope::Tenant), rule(2, AlertRuleScope::Site), rule(3, AlertRuleScope::Unit)];
        let winner = select_most_specific(&candidates).unwrap();
        assert_eq!(winner.id, 3);
    }

    #[test]
    fn tie_at_same_scope_breaks_to_earliest_id() {
        let candidates = vec![rule(7, AlertRuleScope::Site), rule(4, AlertRuleScope::Site)];
        let winner = select_most_specific(&candidates).unwrap();
        assert_eq!(winner.id, 4);
    }

    #[test]
    fn missing_bounds_on_both_sides_is_no_thresholds() {
        let result = EffectiveThresholds::resolve(None, None, None);
        assert_eq!(result.unwrap_err(), ThresholdError::NoThresholds);
    }

    #[test]
    fn rule_overrides_only_the_bound_it_specifies() {
        let mut r = rule(1, AlertRuleScope::Unit);
        r.max_temp_tenths = Some(450);
        let effective = EffectiveThresholds::resolve(Some(300), Some(400), Some(&r)).unwrap();
        assert_eq!(effective.min_temp_tenths, 300);
        assert_eq!(effective.max_temp_tenths, 450);
    }

    #[test]
    fn hysteresis_band_excludes_the_raw_edges() {
        let effective = EffectiveThresholds { min_temp_tenths: 320, max_temp_tenths: 400, hysteresis_tenths: 5, confirm_seconds: 0 };
        assert!(!effective.is_within_hysteresis_band(400));
        assert!(!effective.is_within_hysteresis_band(396));
        assert!(effective.is_within_hysteresis_band(394));
    }
}
