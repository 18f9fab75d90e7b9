// [libs/domain/escalation/src/contact.rs]
use serde::{Deserialize, Serialize};
use typeshare::typeshare;

/// Per-tenant recipient. Dispatch order is ascending `priority` (lower
/// number, earlier tier); only `active` contacts are loaded by the engine.
#[typeshare]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EscalationContact {
    pub id: String,
    pub tenant_id: String,
    pub display_name: String,
    /// E.164; the engine rejects anything not `+`-prefixed at dispatch time
    /// rather than at the repository boundary, so malformed legacy rows
    /// still surface as a per-recipient skip instead of blocking the batch.
    pub phone: String,
    pub priority: i32,
    pub active: bool,
    pub linked_user_id: Option<String>,
}

impl EscalationContact {
    pub fn has_valid_e164_phone(&self) -> bool {
        self.phone.starts_with('+') && self.phone.len() > 1
    }
}
