// [libs/infra/db/src/repositories/mod.rs]
/*!
 * =================================================================
 * APARATO: REPOSITORY ACCESS MATRIX (ESTRATO L3)
 * RESPONSABILIDAD: ORQUESTACION DE SUBSISTEMAS DE PERSISTENCIA
 *
 * One repository per aggregate; each wraps a `LedgerClient` and owns the
 * SQL shape for its table(s). Nothing above this module ever writes a raw
 * query.
 * =================================================================
 */

pub mod alert_repository;
pub mod escalation_repository;
pub mod metrics_repository;
pub mod queue_repository;
pub mod reading_repository;
pub mod tenancy_repository;
pub mod threshold_repository;

pub use alert_repository::{AlertQueryFilters, AlertRepository};
pub use escalation_repository::EscalationRepository;
pub use metrics_repository::MetricsRepository;
pub use queue_repository::{QueueRepository, QueuedJob};
pub use reading_repository::ReadingRepository;
pub use tenancy_repository::TenancyRepository;
pub use threshold_repository::ThresholdRepository;
