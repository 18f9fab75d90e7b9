// [libs/infra/db/src/repositories/threshold_repository.rs]
/*!
 * Loads the candidate `AlertRule` rows for a unit and hands them to the
 * domain crate's pure `select_most_specific` / `EffectiveThresholds`
 * functions. This repository owns only the SQL shape of "all enabled
 * rules matching the unit, its site, or its tenant".
 */

use crate::client::LedgerClient;
use crate::errors::DbError;
use frostwatch_domain_telemetry::{AlertRuleScope, CandidateRule, EffectiveThresholds, ThresholdError};
use libsql::params;
use tracing::instrument;

pub struct ThresholdRepository {
    client: LedgerClient,
}

impl ThresholdRepository {
    pub fn new(client: LedgerClient) -> Self {
        Self { client }
    }

    /// `tenantId = unit.tenant AND (unitId=unit OR (siteId=unit.site AND
    /// unitId IS NULL) OR (siteId IS NULL AND unitId IS NULL))`.
    #[instrument(skip(self))]
    pub async fn load_candidate_rules(
        &self,
        tenant_id: &str,
        site_id: &str,
        unit_id: &str,
    ) -> Result<Vec<CandidateRule>, DbError> {
        let connection = self.client.get_connection()?;
        let mut rows = connection
            .query(
                r#"
                SELECT id, site_id, unit_id, min_temp_tenths, max_temp_tenths, confirm_minutes
                FROM alert_rules
                WHERE tenant_id = ?1
                  AND enabled = 1
                  AND (
                    unit_id = ?2
                    OR (site_id = ?3 AND unit_id IS NULL)
                    OR (site_id IS NULL AND unit_id IS NULL)
                  )
                "#,
                params![tenant_id, site_id, unit_id],
            )
            .await?;

        let mut candidates = Vec::new();
        while let Some(row) = rows.next().await? {
            let row_site_id = row.get::<Option<String>>(1)?;
            let row_unit_id = row.get::<Option<String>>(2)?;

            let scope = if row_unit_id.is_some() {
                AlertRuleScope::Unit
            } else if row_site_id.is_some() {
                AlertRuleScope::Site
            } else {
                AlertRuleScope::Tenant
            };

            candidates.push(CandidateRule {
                id: row.get::<i64>(0)?,
                scope,
                min_temp_tenths: row.get::<Option<i64>>(3)?.map(|v| v as i32),
                max_temp_tenths: row.get::<Option<i64>>(4)?.map(|v| v as i32),
                confirm_minutes: row.get::<Option<i64>>(5)?.map(|v| v as i32),
            });
        }

        Ok(candidates)
    }

    /// Full resolution: load candidates, pick the winner, merge with the
    /// unit's own bounds. `NotFound` is the caller's responsibility (a
    /// missing unit never reaches this repository, since resolution takes
    /// the unit's own bounds as parameters rather than a fresh lookup).
    #[instrument(skip(self))]
    pub async fn resolve(
        &self,
        tenant_id: &str,
        site_id: &str,
        unit_id: &str,
        unit_min_tenths: Option<i32>,
        unit_max_tenths: Option<i32>,
    ) -> Result<EffectiveThresholds, ThresholdError> {
        let candidates = self.load_candidate_rules(tenant_id, site_id, unit_id).await.map_err(|e| {
            tracing::warn!(error = %e, "candidate rule lookup failed, resolving as no-thresholds");
            ThresholdError::NoThresholds
        })?;

        let winner = frostwatch_domain_telemetry::select_most_specific(&candidates);
        EffectiveThresholds::resolve(unit_min_tenths, unit_max_tenths, winner)
    }
}
