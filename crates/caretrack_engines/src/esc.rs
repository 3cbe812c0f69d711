#![forbid(unsafe_code)]

use std::collections::BTreeSet;

use caretrack_kernel_contracts::access::AccessReason;
use caretrack_kernel_contracts::directory::{ActorRecord, ActorRole, UnitId};
use caretrack_kernel_contracts::resource::EscalationRecord;

use crate::access::{reason_codes, Verdict};

/// The multi-unit visibility set of an escalation: origin unit, destination
/// unit, and the ticket's owning unit, with missing references removed and
/// duplicates collapsed. A precomputed value object with fixed small arity,
/// not a graph traversal.
pub fn visible_units(escalation: &EscalationRecord) -> BTreeSet<UnitId> {
    [
        &escalation.from_unit_id,
        &escalation.to_unit_id,
        &escalation.ticket_unit_id,
    ]
    .into_iter()
    .flatten()
    .cloned()
    .collect()
}

/// Extends the base decision rule to handed-off tickets: a member may see an
/// escalation iff their unit is anywhere in its visibility set. The same
/// fail-closed rules apply; an escalation whose three unit references are all
/// missing is the same integrity fault as a unit-less resource.
pub fn decide_escalation(actor: &ActorRecord, escalation: &EscalationRecord) -> Verdict {
    if actor.role == ActorRole::GlobalOverride {
        return Verdict::allow(AccessReason::Global, reason_codes::ACCESS_ALLOW_GLOBAL);
    }
    let Some(actor_unit) = &actor.unit_id else {
        return Verdict::deny(
            AccessReason::ActorUnscoped,
            reason_codes::ACCESS_DENY_ACTOR_UNSCOPED,
        );
    };
    let visible = visible_units(escalation);
    if visible.is_empty() {
        return Verdict::deny(
            AccessReason::ResourceUnitMissing,
            reason_codes::ACCESS_DENY_RESOURCE_UNIT_MISSING,
        );
    }
    if visible.contains(actor_unit) {
        return Verdict::allow(AccessReason::SameUnit, reason_codes::ACCESS_ALLOW_SAME_UNIT);
    }
    Verdict::deny(AccessReason::CrossUnit, reason_codes::ACCESS_DENY_CROSS_UNIT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use caretrack_kernel_contracts::directory::ActorId;
    use caretrack_kernel_contracts::resource::{EscalationId, ResourceId};

    fn unit(id: &str) -> UnitId {
        UnitId::new(id).unwrap()
    }

    fn member(unit_id: Option<&str>) -> ActorRecord {
        ActorRecord::v1(
            ActorId::new("staff_1").unwrap(),
            unit_id.map(unit),
            ActorRole::Member,
        )
        .unwrap()
    }

    fn escalation(from: Option<&str>, to: Option<&str>, ticket: Option<&str>) -> EscalationRecord {
        EscalationRecord::v1(
            EscalationId::new("esc_1").unwrap(),
            ResourceId::new("tkt_1").unwrap(),
            from.map(unit),
            to.map(unit),
            ticket.map(unit),
        )
        .unwrap()
    }

    #[test]
    fn at_esc_01_visibility_set_drops_nulls_and_duplicates() {
        let e = escalation(Some("unit_a"), Some("unit_b"), Some("unit_a"));
        let visible = visible_units(&e);
        assert_eq!(visible.len(), 2);
        assert!(visible.contains(&unit("unit_a")));
        assert!(visible.contains(&unit("unit_b")));

        let e = escalation(Some("unit_a"), None, None);
        assert_eq!(visible_units(&e).len(), 1);
    }

    #[test]
    fn at_esc_02_destination_unit_member_sees_the_handoff() {
        // from=A, to=B, ticket.unit=C; a member of B is in the visibility set.
        let e = escalation(Some("unit_a"), Some("unit_b"), Some("unit_c"));
        let verdict = decide_escalation(&member(Some("unit_b")), &e);
        assert!(verdict.allow);
        assert_eq!(verdict.reason, AccessReason::SameUnit);
    }

    #[test]
    fn at_esc_03_ticket_owner_unit_member_sees_the_handoff() {
        let e = escalation(Some("unit_a"), Some("unit_b"), Some("unit_c"));
        let verdict = decide_escalation(&member(Some("unit_c")), &e);
        assert!(verdict.allow);
    }

    #[test]
    fn at_esc_04_outside_unit_member_is_denied_cross_unit() {
        let e = escalation(Some("unit_a"), Some("unit_b"), Some("unit_c"));
        let verdict = decide_escalation(&member(Some("unit_d")), &e);
        assert!(!verdict.allow);
        assert_eq!(verdict.reason, AccessReason::CrossUnit);
    }

    #[test]
    fn at_esc_05_unscoped_member_fails_closed() {
        let e = escalation(Some("unit_a"), Some("unit_b"), None);
        let verdict = decide_escalation(&member(None), &e);
        assert!(!verdict.allow);
        assert_eq!(verdict.reason, AccessReason::ActorUnscoped);
    }

    #[test]
    fn at_esc_06_empty_visibility_set_is_an_integrity_fault() {
        let e = escalation(None, None, None);
        let verdict = decide_escalation(&member(Some("unit_a")), &e);
        assert!(!verdict.allow);
        assert_eq!(verdict.reason, AccessReason::ResourceUnitMissing);
    }

    #[test]
    fn at_esc_07_global_override_sees_every_escalation() {
        let overseer = ActorRecord::v1(
            ActorId::new("quality_1").unwrap(),
            None,
            ActorRole::GlobalOverride,
        )
        .unwrap();
        let e = escalation(None, None, None);
        assert!(decide_escalation(&overseer, &e).allow);
    }
}
