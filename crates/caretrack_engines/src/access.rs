#![forbid(unsafe_code)]

use caretrack_kernel_contracts::access::{
    AccessCapabilityId, AccessReason, AccessRefuse, AccessRequest, AccessResponse,
    EscalationDecideOk, QueryScopeOk, ResourceDecideOk,
};
use caretrack_kernel_contracts::directory::{ActorRecord, ActorRole};
use caretrack_kernel_contracts::resource::ResourceRef;
use caretrack_kernel_contracts::{ReasonCodeId, Validate};

use crate::esc;
use crate::scope;

pub mod reason_codes {
    use caretrack_kernel_contracts::ReasonCodeId;

    // ACCESS reason-code namespace. Values are placeholders until global registry lock.
    pub const ACCESS_ALLOW_GLOBAL: ReasonCodeId = ReasonCodeId(0x4143_0001);
    pub const ACCESS_ALLOW_SAME_UNIT: ReasonCodeId = ReasonCodeId(0x4143_0002);
    pub const ACCESS_DENY_ACTOR_UNSCOPED: ReasonCodeId = ReasonCodeId(0x4143_0011);
    pub const ACCESS_DENY_CROSS_UNIT: ReasonCodeId = ReasonCodeId(0x4143_0012);
    pub const ACCESS_DENY_RESOURCE_UNIT_MISSING: ReasonCodeId = ReasonCodeId(0x4143_0013);

    pub const ACCESS_INPUT_SCHEMA_INVALID: ReasonCodeId = ReasonCodeId(0x4143_00F1);
    pub const ACCESS_INTERNAL_PIPELINE_ERROR: ReasonCodeId = ReasonCodeId(0x4143_00F5);
}

/// Outcome of a single pure decision, shared by the resource and escalation
/// paths. The audit side effect lives in the OS layer, not here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Verdict {
    pub allow: bool,
    pub reason: AccessReason,
    pub reason_code: ReasonCodeId,
}

impl Verdict {
    pub(crate) fn allow(reason: AccessReason, reason_code: ReasonCodeId) -> Self {
        Self {
            allow: true,
            reason,
            reason_code,
        }
    }

    pub(crate) fn deny(reason: AccessReason, reason_code: ReasonCodeId) -> Self {
        Self {
            allow: false,
            reason,
            reason_code,
        }
    }
}

/// Pure decision function over an actor and a unit-owned resource.
///
/// Order matters: the global override wins before any unit inspection, an
/// unscoped member fails closed before the resource is looked at, and a
/// resource missing its owning unit is an integrity fault that can never be
/// allowed for a member. Unit comparison is exact identity; there is no
/// hierarchy walk.
pub fn decide(actor: &ActorRecord, resource: &ResourceRef) -> Verdict {
    if actor.role == ActorRole::GlobalOverride {
        return Verdict::allow(AccessReason::Global, reason_codes::ACCESS_ALLOW_GLOBAL);
    }
    let Some(actor_unit) = &actor.unit_id else {
        return Verdict::deny(
            AccessReason::ActorUnscoped,
            reason_codes::ACCESS_DENY_ACTOR_UNSCOPED,
        );
    };
    let Some(resource_unit) = &resource.unit_id else {
        return Verdict::deny(
            AccessReason::ResourceUnitMissing,
            reason_codes::ACCESS_DENY_RESOURCE_UNIT_MISSING,
        );
    };
    if resource_unit == actor_unit {
        return Verdict::allow(AccessReason::SameUnit, reason_codes::ACCESS_ALLOW_SAME_UNIT);
    }
    Verdict::deny(AccessReason::CrossUnit, reason_codes::ACCESS_DENY_CROSS_UNIT)
}

/// Stateless dispatch runtime over the three access capabilities.
#[derive(Debug, Clone, Copy, Default)]
pub struct AccessRuntime;

impl AccessRuntime {
    pub fn new() -> Self {
        Self
    }

    pub fn run(&self, req: &AccessRequest) -> AccessResponse {
        if req.validate().is_err() {
            return self.refuse(
                capability_from_request(req),
                reason_codes::ACCESS_INPUT_SCHEMA_INVALID,
                "access request failed contract validation",
            );
        }

        match req {
            AccessRequest::ResourceDecide(r) => {
                let verdict = decide(&r.actor, &r.resource);
                match ResourceDecideOk::v1(verdict.reason_code, verdict.allow, verdict.reason) {
                    Ok(ok) => AccessResponse::ResourceDecideOk(ok),
                    Err(_) => self.refuse(
                        AccessCapabilityId::ResourceDecide,
                        reason_codes::ACCESS_INTERNAL_PIPELINE_ERROR,
                        "failed to construct resource decide output",
                    ),
                }
            }
            AccessRequest::EscalationDecide(r) => {
                let verdict = esc::decide_escalation(&r.actor, &r.escalation);
                let visible: Vec<_> = esc::visible_units(&r.escalation).into_iter().collect();
                match EscalationDecideOk::v1(
                    verdict.reason_code,
                    verdict.allow,
                    verdict.reason,
                    visible,
                ) {
                    Ok(ok) => AccessResponse::EscalationDecideOk(ok),
                    Err(_) => self.refuse(
                        AccessCapabilityId::EscalationDecide,
                        reason_codes::ACCESS_INTERNAL_PIPELINE_ERROR,
                        "failed to construct escalation decide output",
                    ),
                }
            }
            AccessRequest::QueryScope(r) => {
                let unit_scope = scope::scope_for(&r.actor);
                let reason_code = scope::reason_code_for(&unit_scope);
                match QueryScopeOk::v1(reason_code, unit_scope) {
                    Ok(ok) => AccessResponse::QueryScopeOk(ok),
                    Err(_) => self.refuse(
                        AccessCapabilityId::QueryScope,
                        reason_codes::ACCESS_INTERNAL_PIPELINE_ERROR,
                        "failed to construct query scope output",
                    ),
                }
            }
        }
    }

    fn refuse(
        &self,
        capability_id: AccessCapabilityId,
        reason_code: ReasonCodeId,
        message: &'static str,
    ) -> AccessResponse {
        let out = AccessRefuse::v1(capability_id, reason_code, message.to_string())
            .expect("AccessRefuse::v1 must construct for static messages");
        AccessResponse::Refuse(out)
    }
}

fn capability_from_request(req: &AccessRequest) -> AccessCapabilityId {
    match req {
        AccessRequest::ResourceDecide(_) => AccessCapabilityId::ResourceDecide,
        AccessRequest::EscalationDecide(_) => AccessCapabilityId::EscalationDecide,
        AccessRequest::QueryScope(_) => AccessCapabilityId::QueryScope,
    }
}
