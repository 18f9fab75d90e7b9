// [libs/domain/escalation/src/lib.rs]
/*!
 * =================================================================
 * APARATO: ESCALATION DECISION GRAMMAR (ESTRATO L2)
 * RESPONSABILIDAD: CONTACTOS, ENTREGAS, COOLDOWNS Y REGLAS DE NIVEL
 *
 * Three cooldown layers (per-alert, per-user, per-tenant) and the
 * priority-ordered recipient tier live here as pure decision functions.
 * Everything that needs a clock or a round trip to storage — the recency
 * queries the cooldowns are computed from, the rule lookup by severity —
 * is resolved by the caller and handed in already evaluated.
 * =================================================================
 */

pub mod config;
pub mod contact;
pub mod delivery;
pub mod engine;
pub mod outcome;

pub use config::{CooldownConfig, SeverityEscalationRule};
pub use contact::EscalationContact;
pub use delivery::{DeliveryChannel, DeliveryStatus, NotificationDelivery};
pub use engine::{
    escalation_cadence_elapsed, evaluate_escalation, resolve_recipients, status_after_level_bump, EscalateTrigger,
    RecipientDecision,
};
pub use outcome::{EscalateOutcome, EscalateSkipReason, RecipientSkipReason};
