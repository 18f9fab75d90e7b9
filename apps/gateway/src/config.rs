// [apps/gateway/src/config.rs]
//! Typed configuration, parsed once at boot from the process environment
//! (§1.1 "Configuration"). No `config`-crate layering: every field maps to
//! one `env::var` read with a documented default, mirroring the teacher's
//! `main.rs`/`kernel.rs` inline reads of `DATABASE_URL`/`PORT`.

use frostwatch_domain_escalation::CooldownConfig;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub database_auth_token: Option<String>,
    pub listen_port: u16,
    pub sms_provider_base_url: String,
    pub sms_provider_api_key: String,
    /// Seconds since a unit's last reading after which the offline sweep
    /// flips it to `offline` (§4.8).
    pub offline_timeout_seconds: i64,
    pub cooldowns: CooldownConfig,
}

impl AppConfig {
    /// Reads every variable this service needs; panics with a descriptive
    /// message on a missing required value, matching the teacher's
    /// `.expect("CRITICAL_FAULT: ...")` boot-time fail-fast convention.
    pub fn from_env() -> Self {
        Self {
            database_url: std::env::var("DATABASE_URL").expect("DATABASE_URL must be set"),
            database_auth_token: std::env::var("TURSO_AUTH_TOKEN").ok(),
            listen_port: std::env::var("PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(3000),
            sms_provider_base_url: std::env::var("SMS_PROVIDER_BASE_URL")
                .unwrap_or_else(|_| "https://api.sms-provider.invalid".to_string()),
            sms_provider_api_key: std::env::var("SMS_PROVIDER_API_KEY").unwrap_or_default(),
            offline_timeout_seconds: std::env::var("OFFLINE_TIMEOUT_SECONDS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(300),
            cooldowns: CooldownConfig {
                per_alert_minutes: env_i64("ESCALATION_PER_ALERT_COOLDOWN_MINUTES", 15),
                per_user_minutes: env_i64("ESCALATION_PER_USER_COOLDOWN_MINUTES", 30),
                org_window_minutes: env_i64("ESCALATION_ORG_WINDOW_MINUTES", 60),
                max_sms_per_org_window: env_i64("ESCALATION_MAX_SMS_PER_ORG_WINDOW", 50) as u32,
            },
        }
    }
}

fn env_i64(key: &str, default: i64) -> i64 {
    std::env::var(key).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}
