#![forbid(unsafe_code)]

use serde::{Deserialize, Serialize};

use crate::directory::{ActorRecord, UnitId};
use crate::query::UnitScope;
use crate::resource::{EscalationRecord, ResourceRef};
use crate::{ContractViolation, ReasonCodeId, SchemaVersion, Validate};

pub const ACCESS_CONTRACT_VERSION: SchemaVersion = SchemaVersion(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CorrelationId(pub u128);

impl Validate for CorrelationId {
    fn validate(&self) -> Result<(), ContractViolation> {
        if self.0 == 0 {
            return Err(ContractViolation::InvalidValue {
                field: "correlation_id",
                reason: "must be > 0",
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TurnId(pub u64);

impl Validate for TurnId {
    fn validate(&self) -> Result<(), ContractViolation> {
        if self.0 == 0 {
            return Err(ContractViolation::InvalidValue {
                field: "turn_id",
                reason: "must be > 0",
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessRequestEnvelope {
    pub schema_version: SchemaVersion,
    pub correlation_id: CorrelationId,
    pub turn_id: TurnId,
}

impl AccessRequestEnvelope {
    pub fn v1(correlation_id: CorrelationId, turn_id: TurnId) -> Result<Self, ContractViolation> {
        let env = Self {
            schema_version: ACCESS_CONTRACT_VERSION,
            correlation_id,
            turn_id,
        };
        env.validate()?;
        Ok(env)
    }
}

impl Validate for AccessRequestEnvelope {
    fn validate(&self) -> Result<(), ContractViolation> {
        if self.schema_version.0 == 0 {
            return Err(ContractViolation::InvalidValue {
                field: "access_request_envelope.schema_version",
                reason: "must be > 0",
            });
        }
        self.correlation_id.validate()?;
        self.turn_id.validate()?;
        Ok(())
    }
}

/// Decision vocabulary of the access engine. The two allow reasons and the
/// three deny reasons are exhaustive; infra faults are not decisions and
/// never appear here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AccessReason {
    Global,
    SameUnit,
    CrossUnit,
    ActorUnscoped,
    ResourceUnitMissing,
}

impl AccessReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccessReason::Global => "global",
            AccessReason::SameUnit => "same_unit",
            AccessReason::CrossUnit => "cross_unit",
            AccessReason::ActorUnscoped => "actor_unscoped",
            AccessReason::ResourceUnitMissing => "resource_unit_missing",
        }
    }

    pub fn is_allow(&self) -> bool {
        matches!(self, AccessReason::Global | AccessReason::SameUnit)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AccessCapabilityId {
    ResourceDecide,
    EscalationDecide,
    QueryScope,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceDecideRequest {
    pub envelope: AccessRequestEnvelope,
    pub actor: ActorRecord,
    pub resource: ResourceRef,
}

impl ResourceDecideRequest {
    pub fn v1(
        envelope: AccessRequestEnvelope,
        actor: ActorRecord,
        resource: ResourceRef,
    ) -> Result<Self, ContractViolation> {
        let req = Self {
            envelope,
            actor,
            resource,
        };
        req.validate()?;
        Ok(req)
    }
}

impl Validate for ResourceDecideRequest {
    fn validate(&self) -> Result<(), ContractViolation> {
        self.envelope.validate()?;
        self.actor.validate()?;
        self.resource.validate()?;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EscalationDecideRequest {
    pub envelope: AccessRequestEnvelope,
    pub actor: ActorRecord,
    pub escalation: EscalationRecord,
}

impl EscalationDecideRequest {
    pub fn v1(
        envelope: AccessRequestEnvelope,
        actor: ActorRecord,
        escalation: EscalationRecord,
    ) -> Result<Self, ContractViolation> {
        let req = Self {
            envelope,
            actor,
            escalation,
        };
        req.validate()?;
        Ok(req)
    }
}

impl Validate for EscalationDecideRequest {
    fn validate(&self) -> Result<(), ContractViolation> {
        self.envelope.validate()?;
        self.actor.validate()?;
        self.escalation.validate()?;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryScopeRequest {
    pub envelope: AccessRequestEnvelope,
    pub actor: ActorRecord,
}

impl QueryScopeRequest {
    pub fn v1(
        envelope: AccessRequestEnvelope,
        actor: ActorRecord,
    ) -> Result<Self, ContractViolation> {
        let req = Self { envelope, actor };
        req.validate()?;
        Ok(req)
    }
}

impl Validate for QueryScopeRequest {
    fn validate(&self) -> Result<(), ContractViolation> {
        self.envelope.validate()?;
        self.actor.validate()?;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AccessRequest {
    ResourceDecide(ResourceDecideRequest),
    EscalationDecide(EscalationDecideRequest),
    QueryScope(QueryScopeRequest),
}

impl Validate for AccessRequest {
    fn validate(&self) -> Result<(), ContractViolation> {
        match self {
            AccessRequest::ResourceDecide(r) => r.validate(),
            AccessRequest::EscalationDecide(r) => r.validate(),
            AccessRequest::QueryScope(r) => r.validate(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceDecideOk {
    pub schema_version: SchemaVersion,
    pub reason_code: ReasonCodeId,
    pub allow: bool,
    pub reason: AccessReason,
}

impl ResourceDecideOk {
    pub fn v1(
        reason_code: ReasonCodeId,
        allow: bool,
        reason: AccessReason,
    ) -> Result<Self, ContractViolation> {
        let ok = Self {
            schema_version: ACCESS_CONTRACT_VERSION,
            reason_code,
            allow,
            reason,
        };
        ok.validate()?;
        Ok(ok)
    }
}

impl Validate for ResourceDecideOk {
    fn validate(&self) -> Result<(), ContractViolation> {
        if self.allow != self.reason.is_allow() {
            return Err(ContractViolation::InvalidValue {
                field: "resource_decide_ok.reason",
                reason: "must be consistent with allow flag",
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EscalationDecideOk {
    pub schema_version: SchemaVersion,
    pub reason_code: ReasonCodeId,
    pub allow: bool,
    pub reason: AccessReason,
    /// Sorted, deduplicated visibility set the verdict was taken against.
    pub visible_units: Vec<UnitId>,
}

impl EscalationDecideOk {
    pub fn v1(
        reason_code: ReasonCodeId,
        allow: bool,
        reason: AccessReason,
        visible_units: Vec<UnitId>,
    ) -> Result<Self, ContractViolation> {
        let ok = Self {
            schema_version: ACCESS_CONTRACT_VERSION,
            reason_code,
            allow,
            reason,
            visible_units,
        };
        ok.validate()?;
        Ok(ok)
    }
}

impl Validate for EscalationDecideOk {
    fn validate(&self) -> Result<(), ContractViolation> {
        if self.allow != self.reason.is_allow() {
            return Err(ContractViolation::InvalidValue {
                field: "escalation_decide_ok.reason",
                reason: "must be consistent with allow flag",
            });
        }
        if self.visible_units.len() > 3 {
            return Err(ContractViolation::InvalidValue {
                field: "escalation_decide_ok.visible_units",
                reason: "must contain <= 3 units",
            });
        }
        if self.visible_units.windows(2).any(|w| w[0] >= w[1]) {
            return Err(ContractViolation::InvalidValue {
                field: "escalation_decide_ok.visible_units",
                reason: "must be sorted and deduplicated",
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryScopeOk {
    pub schema_version: SchemaVersion,
    pub reason_code: ReasonCodeId,
    pub scope: UnitScope,
}

impl QueryScopeOk {
    pub fn v1(reason_code: ReasonCodeId, scope: UnitScope) -> Result<Self, ContractViolation> {
        let ok = Self {
            schema_version: ACCESS_CONTRACT_VERSION,
            reason_code,
            scope,
        };
        ok.validate()?;
        Ok(ok)
    }
}

impl Validate for QueryScopeOk {
    fn validate(&self) -> Result<(), ContractViolation> {
        self.scope.validate()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessRefuse {
    pub schema_version: SchemaVersion,
    pub capability_id: AccessCapabilityId,
    pub reason_code: ReasonCodeId,
    pub message: String,
}

impl AccessRefuse {
    pub fn v1(
        capability_id: AccessCapabilityId,
        reason_code: ReasonCodeId,
        message: String,
    ) -> Result<Self, ContractViolation> {
        let refuse = Self {
            schema_version: ACCESS_CONTRACT_VERSION,
            capability_id,
            reason_code,
            message,
        };
        refuse.validate()?;
        Ok(refuse)
    }
}

impl Validate for AccessRefuse {
    fn validate(&self) -> Result<(), ContractViolation> {
        if self.message.trim().is_empty() {
            return Err(ContractViolation::InvalidValue {
                field: "access_refuse.message",
                reason: "must not be empty",
            });
        }
        if self.message.len() > 256 {
            return Err(ContractViolation::InvalidValue {
                field: "access_refuse.message",
                reason: "too long",
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AccessResponse {
    ResourceDecideOk(ResourceDecideOk),
    EscalationDecideOk(EscalationDecideOk),
    QueryScopeOk(QueryScopeOk),
    Refuse(AccessRefuse),
}
