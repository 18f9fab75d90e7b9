// [libs/infra/db/src/schema.rs]
/*!
 * =================================================================
 * APARATO: FROSTWATCH LEDGER SCHEMA (ESTRATO L3)
 * RESPONSABILIDAD: GOBERNANZA ESTRUCTURAL E IDEMPOTENCIA TOTAL
 *
 * Three strata: base tables (CREATE TABLE IF NOT EXISTS, safe to rerun),
 * evolutionary ALTERs (each independently tolerant of "duplicate column
 * name" so a fresh table and an old one converge to the same shape), and
 * indexes. Every migration in this module must be safe to run against a
 * database that already has some or all of this schema applied.
 * =================================================================
 */

use anyhow::{Context, Result};
use libsql::Connection;
use tracing::{debug, info, instrument, warn};

const BASE_TABLES: &[(&str, &str)] = &[
    ("TABLE_TENANTS", r#"
        CREATE TABLE IF NOT EXISTS tenants (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            active INTEGER NOT NULL DEFAULT 1,
            created_at TEXT NOT NULL DEFAULT (datetime('now'))
        );
    "#),
    ("TABLE_SITES", r#"
        CREATE TABLE IF NOT EXISTS sites (
            id TEXT PRIMARY KEY,
            tenant_id TEXT NOT NULL REFERENCES tenants(id),
            name TEXT NOT NULL,
            active INTEGER NOT NULL DEFAULT 1
        );
    "#),
    ("TABLE_AREAS", r#"
        CREATE TABLE IF NOT EXISTS areas (
            id TEXT PRIMARY KEY,
            site_id TEXT NOT NULL REFERENCES sites(id),
            tenant_id TEXT NOT NULL REFERENCES tenants(id),
            name TEXT NOT NULL,
            active INTEGER NOT NULL DEFAULT 1
        );
    "#),
    ("TABLE_UNITS", r#"
        CREATE TABLE IF NOT EXISTS units (
            id TEXT PRIMARY KEY,
            area_id TEXT NOT NULL REFERENCES areas(id),
            site_id TEXT NOT NULL REFERENCES sites(id),
            tenant_id TEXT NOT NULL REFERENCES tenants(id),
            display_name TEXT NOT NULL,
            min_temp_tenths INTEGER,
            max_temp_tenths INTEGER,
            temperature_unit TEXT NOT NULL DEFAULT 'f',
            status TEXT NOT NULL DEFAULT 'ok',
            last_reading_at TEXT,
            last_temperature_tenths INTEGER,
            status_changed_at TEXT NOT NULL DEFAULT (datetime('now')),
            consecutive_in_band_readings INTEGER NOT NULL DEFAULT 0,
            active INTEGER NOT NULL DEFAULT 1
        );
    "#),
    ("TABLE_READINGS", r#"
        CREATE TABLE IF NOT EXISTS readings (
            id TEXT PRIMARY KEY,
            unit_id TEXT NOT NULL REFERENCES units(id),
            tenant_id TEXT NOT NULL REFERENCES tenants(id),
            device_id TEXT,
            temperature_tenths INTEGER NOT NULL,
            humidity_tenths INTEGER,
            battery_percent INTEGER,
            signal_strength INTEGER,
            recorded_at TEXT NOT NULL,
            received_at TEXT NOT NULL DEFAULT (datetime('now')),
            source TEXT NOT NULL,
            raw_payload TEXT
        );
    "#),
    ("TABLE_ALERT_RULES", r#"
        CREATE TABLE IF NOT EXISTS alert_rules (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            tenant_id TEXT NOT NULL REFERENCES tenants(id),
            site_id TEXT,
            unit_id TEXT,
            alert_type TEXT NOT NULL DEFAULT 'temperature_excursion',
            enabled INTEGER NOT NULL DEFAULT 1,
            min_temp_tenths INTEGER,
            max_temp_tenths INTEGER,
            confirm_minutes INTEGER,
            created_at TEXT NOT NULL DEFAULT (datetime('now')),
            updated_at TEXT NOT NULL DEFAULT (datetime('now'))
        );
    "#),
    ("TABLE_ALERTS", r#"
        CREATE TABLE IF NOT EXISTS alerts (
            id TEXT PRIMARY KEY,
            tenant_id TEXT NOT NULL REFERENCES tenants(id),
            unit_id TEXT NOT NULL REFERENCES units(id),
            alert_type TEXT NOT NULL DEFAULT 'temperature_excursion',
            severity TEXT NOT NULL,
            status TEXT NOT NULL,
            trigger_temperature_tenths INTEGER NOT NULL,
            triggering_bound TEXT NOT NULL,
            triggered_at TEXT NOT NULL,
            acknowledged_at TEXT,
            acknowledged_by TEXT,
            resolved_at TEXT,
            resolved_by TEXT,
            resolution_text TEXT,
            corrective_action TEXT,
            escalation_level INTEGER NOT NULL DEFAULT 0,
            last_escalated_at TEXT,
            metadata TEXT
        );
    "#),
    ("TABLE_ESCALATION_CONTACTS", r#"
        CREATE TABLE IF NOT EXISTS escalation_contacts (
            id TEXT PRIMARY KEY,
            tenant_id TEXT NOT NULL REFERENCES tenants(id),
            display_name TEXT NOT NULL,
            phone TEXT NOT NULL,
            priority INTEGER NOT NULL,
            active INTEGER NOT NULL DEFAULT 1,
            linked_user_id TEXT
        );
    "#),
    ("TABLE_ESCALATION_RULES", r#"
        CREATE TABLE IF NOT EXISTS escalation_rules (
            id TEXT PRIMARY KEY,
            tenant_id TEXT NOT NULL REFERENCES tenants(id),
            severity TEXT NOT NULL,
            escalate_after_minutes INTEGER NOT NULL,
            max_level INTEGER NOT NULL,
            priority_thresholds TEXT NOT NULL DEFAULT '[]'
        );
    "#),
    ("TABLE_NOTIFICATION_DELIVERIES", r#"
        CREATE TABLE IF NOT EXISTS notification_deliveries (
            id TEXT PRIMARY KEY,
            alert_id TEXT NOT NULL REFERENCES alerts(id),
            tenant_id TEXT NOT NULL REFERENCES tenants(id),
            contact_id TEXT,
            recipient_phone TEXT NOT NULL,
            recipient_user_id TEXT,
            channel TEXT NOT NULL DEFAULT 'sms',
            status TEXT NOT NULL DEFAULT 'pending',
            escalation_level INTEGER NOT NULL DEFAULT 0,
            provider_message_id TEXT,
            scheduled_at TEXT NOT NULL DEFAULT (datetime('now')),
            sent_at TEXT,
            delivered_at TEXT,
            failed_at TEXT,
            error_text TEXT
        );
    "#),
    ("TABLE_METRIC_BUCKETS", r#"
        CREATE TABLE IF NOT EXISTS metric_buckets (
            unit_id TEXT NOT NULL REFERENCES units(id),
            period_start TEXT NOT NULL,
            granularity TEXT NOT NULL DEFAULT 'hourly',
            min_temp_tenths INTEGER NOT NULL,
            max_temp_tenths INTEGER NOT NULL,
            sum_temp_tenths INTEGER NOT NULL,
            count INTEGER NOT NULL,
            min_humidity_tenths INTEGER,
            max_humidity_tenths INTEGER,
            anomaly_count INTEGER NOT NULL DEFAULT 0,
            PRIMARY KEY (unit_id, period_start, granularity)
        );
    "#),
    ("TABLE_JOBS", r#"
        CREATE TABLE IF NOT EXISTS jobs (
            id TEXT PRIMARY KEY,
            kind TEXT NOT NULL,
            payload TEXT NOT NULL,
            status TEXT NOT NULL DEFAULT 'queued',
            attempts INTEGER NOT NULL DEFAULT 0,
            max_attempts INTEGER NOT NULL DEFAULT 5,
            run_after TEXT NOT NULL DEFAULT (datetime('now')),
            last_error TEXT,
            created_at TEXT NOT NULL DEFAULT (datetime('now')),
            updated_at TEXT NOT NULL DEFAULT (datetime('now'))
        );
    "#),
];

const EVOLUTIONARY_STRATA: &[(&str, &str)] = &[
    ("UNIT_CONSECUTIVE_IN_BAND", "ALTER TABLE units ADD COLUMN consecutive_in_band_readings INTEGER NOT NULL DEFAULT 0"),
    ("ALERT_METADATA", "ALTER TABLE alerts ADD COLUMN metadata TEXT"),
    ("JOB_MAX_ATTEMPTS", "ALTER TABLE jobs ADD COLUMN max_attempts INTEGER NOT NULL DEFAULT 5"),
];

const ACCELERATION_INDEXES: &[(&str, &str)] = &[
    ("IDX_READINGS_UNIT_TIME", "CREATE INDEX IF NOT EXISTS idx_readings_unit_time ON readings(unit_id, recorded_at);"),
    ("IDX_UNITS_TENANT", "CREATE INDEX IF NOT EXISTS idx_units_tenant ON units(tenant_id, active);"),
    ("IDX_ALERT_RULES_LOOKUP", "CREATE INDEX IF NOT EXISTS idx_alert_rules_lookup ON alert_rules(tenant_id, site_id, unit_id, enabled);"),
    ("IDX_ALERTS_OPEN", "CREATE INDEX IF NOT EXISTS idx_alerts_open ON alerts(unit_id, alert_type, status);"),
    ("IDX_ALERTS_TENANT", "CREATE INDEX IF NOT EXISTS idx_alerts_tenant ON alerts(tenant_id, status);"),
    ("IDX_DELIVERIES_ALERT", "CREATE INDEX IF NOT EXISTS idx_deliveries_alert ON notification_deliveries(alert_id, status);"),
    ("IDX_DELIVERIES_USER_WINDOW", "CREATE INDEX IF NOT EXISTS idx_deliveries_user_window ON notification_deliveries(recipient_user_id, scheduled_at);"),
    ("IDX_DELIVERIES_TENANT_WINDOW", "CREATE INDEX IF NOT EXISTS idx_deliveries_tenant_window ON notification_deliveries(tenant_id, scheduled_at);"),
    ("IDX_JOBS_STATUS", "CREATE INDEX IF NOT EXISTS idx_jobs_status ON jobs(status, run_after);"),
];

#[instrument(skip(connection))]
pub async fn apply_full_schema(connection: &Connection) -> Result<()> {
    info!("applying frostwatch ledger schema");

    solidify_base_tables(connection).await?;
    run_evolutionary_repair(connection).await?;
    harden_indexes(connection).await?;

    info!("schema sync complete");
    Ok(())
}

async fn solidify_base_tables(db: &Connection) -> Result<()> {
    for (identifier, sql) in BASE_TABLES {
        debug!("applying {}", identifier);
        db.execute(*sql, ())
            .await
            .with_context(|| format!("failed to apply base table {identifier}"))?;
    }
    Ok(())
}

async fn run_evolutionary_repair(db: &Connection) -> Result<()> {
    for (identifier, sql) in EVOLUTIONARY_STRATA {
        match db.execute(*sql, ()).await {
            Ok(_) => info!("applied evolutionary stratum {}", identifier),
            Err(e) => {
                let message = e.to_string();
                if message.contains("duplicate column name") {
                    debug!("{} already applied", identifier);
                } else {
                    warn!("stratum {} check incomplete: {}", identifier, message);
                }
            }
        }
    }
    Ok(())
}

async fn harden_indexes(db: &Connection) -> Result<()> {
    for (identifier, sql) in ACCELERATION_INDEXES {
        debug!("hardening {}", identifier);
        db.execute(*sql, ())
            .await
            .with_context(|| format!("failed to apply index {identifier}"))?;
    }
    Ok(())
}
