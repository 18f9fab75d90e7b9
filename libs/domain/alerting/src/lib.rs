// [libs/domain/alerting/src/lib.rs]
/*!
 * =================================================================
 * APARATO: ALERT STATE MACHINE CONTRACT (ESTRATO L2)
 * RESPONSABILIDAD: ENTIDAD DE ALERTA Y GRAMATICA DE TRANSICIONES
 *
 * An `Alert` materializes an excursion event. At most one alert with
 * status in {active, acknowledged, escalated} ("open") may exist per
 * (unit, alert_type) at any instant — the Alert Store enforces that
 * invariant transactionally; this crate only carries the shapes and the
 * pure transition predicates the Evaluator drives off of.
 * =================================================================
 */

pub mod alert;
pub mod evaluation;

pub use alert::{Alert, AlertSeverity, AlertStatus, AlertType, TriggeringBound};
pub use evaluation::{
    evaluate, AlertAction, EvaluationError, EvaluationResult, Transition,
    RESTORE_CONFIRM_READINGS,
};
