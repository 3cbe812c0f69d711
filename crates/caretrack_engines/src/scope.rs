#![forbid(unsafe_code)]

use caretrack_kernel_contracts::directory::{ActorRecord, ActorRole};
use caretrack_kernel_contracts::query::UnitScope;
use caretrack_kernel_contracts::ReasonCodeId;

pub mod reason_codes {
    use caretrack_kernel_contracts::ReasonCodeId;

    // SCOPE reason-code namespace. Values are placeholders until global registry lock.
    pub const SCOPE_UNRESTRICTED: ReasonCodeId = ReasonCodeId(0x5343_0001);
    pub const SCOPE_ONLY_UNIT: ReasonCodeId = ReasonCodeId(0x5343_0002);
    pub const SCOPE_MATCH_NONE: ReasonCodeId = ReasonCodeId(0x5343_0003);
}

/// Rewrites list/report visibility for an actor.
///
/// A member without a unit gets `MatchNone`, a predicate guaranteed to match
/// zero rows, rather than silently running the query unscoped.
pub fn scope_for(actor: &ActorRecord) -> UnitScope {
    match (actor.role, &actor.unit_id) {
        (ActorRole::GlobalOverride, _) => UnitScope::Unrestricted,
        (ActorRole::Member, Some(unit_id)) => UnitScope::OnlyUnit(unit_id.clone()),
        (ActorRole::Member, None) => UnitScope::MatchNone,
    }
}

pub fn reason_code_for(scope: &UnitScope) -> ReasonCodeId {
    match scope {
        UnitScope::Unrestricted => reason_codes::SCOPE_UNRESTRICTED,
        UnitScope::OnlyUnit(_) => reason_codes::SCOPE_ONLY_UNIT,
        UnitScope::MatchNone => reason_codes::SCOPE_MATCH_NONE,
    }
}
