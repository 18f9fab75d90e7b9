// [apps/gateway/src/bin/migrator.rs]
//! Standalone schema-application CLI. `LedgerClient::connect` already
//! applies the full schema on first connect (see `frostwatch_infra_db::client`),
//! so this binary exists purely as an explicit ops entry point for CI/deploy
//! scripts that want to run the schema step before the gateway binary starts
//! accepting traffic, without booting the rest of the application.

use frostwatch_infra_db::LedgerClient;
use tracing::{error, info};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    frostwatch_shared_tracing::init_tracing("frostwatch_migrator");

    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
    let database_auth_token = std::env::var("TURSO_AUTH_TOKEN").ok();

    info!("applying schema to {}", database_url);

    match LedgerClient::connect(&database_url, database_auth_token).await {
        Ok(_) => {
            info!("schema applied successfully");
            Ok(())
        }
        Err(error) => {
            error!(%error, "schema application failed");
            std::process::exit(1);
        }
    }
}
