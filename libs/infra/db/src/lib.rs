// [libs/infra/db/src/lib.rs]
/*!
 * =================================================================
 * APARATO: FROSTWATCH PERSISTENCE ADAPTER (ESTRATO L3)
 * RESPONSABILIDAD: CONEXION LIBSQL, MIGRACIONES Y REPOSITORIOS
 *
 * The only stratum that holds a `libsql::Connection`. Domain crates
 * define the shapes; the gateway's services define the orchestration;
 * this crate is where SQL text lives, isolated behind one repository
 * struct per aggregate.
 * =================================================================
 */

pub mod client;
pub mod errors;
pub mod repositories;
pub mod schema;

pub use client::LedgerClient;
pub use errors::DbError;
pub use repositories::tenancy_repository::unit_status_as_str;
pub use repositories::{
    AlertQueryFilters, AlertRepository, EscalationRepository, MetricsRepository, QueueRepository,
    QueuedJob, ReadingRepository, TenancyRepository, ThresholdRepository,
};
