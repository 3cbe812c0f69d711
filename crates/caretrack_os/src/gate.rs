#![forbid(unsafe_code)]

use std::collections::BTreeMap;

use caretrack_engines::access::AccessRuntime;
use caretrack_kernel_contracts::access::{
    AccessReason, AccessRequest, AccessRequestEnvelope, AccessResponse, CorrelationId,
    EscalationDecideRequest, QueryScopeRequest, ResourceDecideRequest, TurnId,
};
use caretrack_kernel_contracts::audit::{AuditDecision, AuditEntryInput};
use caretrack_kernel_contracts::directory::{ActorId, ActorRecord, ActorRole};
use caretrack_kernel_contracts::query::{ScopedQuery, UnitScope};
use caretrack_kernel_contracts::resource::{EscalationId, ResourceId, ResourceKind, TicketRecord};
use caretrack_kernel_contracts::{ContractViolation, MonotonicTimeNs, ReasonCodeId};

use crate::data_source::TicketDataSource;
use crate::ports::{ActorDirectory, AuditSink, UnitRegistry};

pub mod reason_codes {
    use caretrack_kernel_contracts::ReasonCodeId;

    // GATE reason-code namespace. Values are placeholders until global registry lock.
    pub const GATE_ACTOR_UNKNOWN: ReasonCodeId = ReasonCodeId(0x4754_0011);
    pub const GATE_RESOURCE_NOT_FOUND: ReasonCodeId = ReasonCodeId(0x4754_0012);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GateConfig {
    /// Opt-in transparency record for privileged global-override access.
    pub record_global_allows: bool,
}

impl GateConfig {
    pub fn mvp_v1(record_global_allows: bool) -> Self {
        Self {
            record_global_allows,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum GateError {
    Validation(ContractViolation),
    RegistryUnavailable { port: &'static str },
}

impl From<ContractViolation> for GateError {
    fn from(v: ContractViolation) -> Self {
        GateError::Validation(v)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GateGrant {
    pub reason: AccessReason,
    pub reason_code: ReasonCodeId,
}

/// Deliberately carries no unit identity and no existence hint: the denied
/// actor learns nothing about the other unit or about whether the resource
/// exists at all. The reason code is for the audit trail, not the response
/// body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GateDenial {
    pub reason_code: ReasonCodeId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateVerdict {
    Allowed(GateGrant),
    Denied(GateDenial),
}

/// What the response boundary presents to the actor. Cross-unit denial and
/// resource-not-found collapse to the same status so resource existence
/// never leaks across units; the audit ledger keeps them distinct.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoundaryStatus {
    Allowed,
    AccessDenied,
    ClientError,
    ServiceUnavailable,
}

pub fn boundary_status(outcome: &Result<GateVerdict, GateError>) -> BoundaryStatus {
    match outcome {
        Ok(GateVerdict::Allowed(_)) => BoundaryStatus::Allowed,
        Ok(GateVerdict::Denied(_)) => BoundaryStatus::AccessDenied,
        Err(GateError::Validation(_)) => BoundaryStatus::ClientError,
        Err(GateError::RegistryUnavailable { .. }) => BoundaryStatus::ServiceUnavailable,
    }
}

/// The single choke point through which every handler touches unit-owned
/// data. Handlers never build their own unit predicates and never call the
/// decision engine directly.
pub struct AccessGate<D, U, S, A> {
    config: GateConfig,
    directory: D,
    registry: U,
    source: S,
    audit: A,
    runtime: AccessRuntime,
}

impl<D, U, S, A> AccessGate<D, U, S, A>
where
    D: ActorDirectory,
    U: UnitRegistry,
    S: TicketDataSource,
    A: AuditSink,
{
    pub fn new(config: GateConfig, directory: D, registry: U, source: S, audit: A) -> Self {
        Self {
            config,
            directory,
            registry,
            source,
            audit,
            runtime: AccessRuntime::new(),
        }
    }

    pub fn check_resource(
        &self,
        actor_id: &ActorId,
        resource_id: &ResourceId,
        kind: ResourceKind,
        correlation_id: CorrelationId,
        turn_id: TurnId,
        now: MonotonicTimeNs,
    ) -> Result<GateVerdict, GateError> {
        let Some(actor) = self.resolve_actor(actor_id, now)? else {
            return Ok(self.deny_unknown_actor(actor_id, correlation_id, turn_id, now));
        };

        let located = self
            .source
            .locate(resource_id, kind, now)
            .map_err(|e| GateError::RegistryUnavailable { port: e.port })?;
        let Some(resource) = located else {
            self.emit_audit(
                now,
                actor_id.clone(),
                Some(resource_id.clone()),
                Some(kind),
                AuditDecision::Deny,
                reason_codes::GATE_RESOURCE_NOT_FOUND,
                "resource_not_found",
                correlation_id,
                turn_id,
            );
            return Ok(GateVerdict::Denied(GateDenial {
                reason_code: reason_codes::GATE_RESOURCE_NOT_FOUND,
            }));
        };

        let envelope = AccessRequestEnvelope::v1(correlation_id, turn_id)?;
        let request = AccessRequest::ResourceDecide(ResourceDecideRequest::v1(
            envelope, actor, resource,
        )?);
        let AccessResponse::ResourceDecideOk(ok) = self.runtime.run(&request) else {
            return Err(GateError::Validation(ContractViolation::InvalidValue {
                field: "access_request",
                reason: "engine refused a pre-validated request",
            }));
        };

        if ok.allow {
            if ok.reason == AccessReason::Global && self.config.record_global_allows {
                self.emit_audit(
                    now,
                    actor_id.clone(),
                    Some(resource_id.clone()),
                    Some(kind),
                    AuditDecision::AllowGlobal,
                    ok.reason_code,
                    ok.reason.as_str(),
                    correlation_id,
                    turn_id,
                );
            }
            return Ok(GateVerdict::Allowed(GateGrant {
                reason: ok.reason,
                reason_code: ok.reason_code,
            }));
        }

        self.emit_audit(
            now,
            actor_id.clone(),
            Some(resource_id.clone()),
            Some(kind),
            AuditDecision::Deny,
            ok.reason_code,
            ok.reason.as_str(),
            correlation_id,
            turn_id,
        );
        Ok(GateVerdict::Denied(GateDenial {
            reason_code: ok.reason_code,
        }))
    }

    pub fn check_escalation(
        &self,
        actor_id: &ActorId,
        escalation_id: &EscalationId,
        correlation_id: CorrelationId,
        turn_id: TurnId,
        now: MonotonicTimeNs,
    ) -> Result<GateVerdict, GateError> {
        let Some(actor) = self.resolve_actor(actor_id, now)? else {
            return Ok(self.deny_unknown_actor(actor_id, correlation_id, turn_id, now));
        };

        let located = self
            .source
            .locate_escalation(escalation_id, now)
            .map_err(|e| GateError::RegistryUnavailable { port: e.port })?;
        let Some(escalation) = located else {
            self.emit_audit(
                now,
                actor_id.clone(),
                None,
                None,
                AuditDecision::Deny,
                reason_codes::GATE_RESOURCE_NOT_FOUND,
                "escalation_not_found",
                correlation_id,
                turn_id,
            );
            return Ok(GateVerdict::Denied(GateDenial {
                reason_code: reason_codes::GATE_RESOURCE_NOT_FOUND,
            }));
        };
        let ticket_id = escalation.ticket_id.clone();

        let envelope = AccessRequestEnvelope::v1(correlation_id, turn_id)?;
        let request = AccessRequest::EscalationDecide(EscalationDecideRequest::v1(
            envelope, actor, escalation,
        )?);
        let AccessResponse::EscalationDecideOk(ok) = self.runtime.run(&request) else {
            return Err(GateError::Validation(ContractViolation::InvalidValue {
                field: "access_request",
                reason: "engine refused a pre-validated request",
            }));
        };

        if ok.allow {
            if ok.reason == AccessReason::Global && self.config.record_global_allows {
                self.emit_audit(
                    now,
                    actor_id.clone(),
                    Some(ticket_id),
                    Some(ResourceKind::Ticket),
                    AuditDecision::AllowGlobal,
                    ok.reason_code,
                    ok.reason.as_str(),
                    correlation_id,
                    turn_id,
                );
            }
            return Ok(GateVerdict::Allowed(GateGrant {
                reason: ok.reason,
                reason_code: ok.reason_code,
            }));
        }

        self.emit_audit(
            now,
            actor_id.clone(),
            Some(ticket_id),
            Some(ResourceKind::Ticket),
            AuditDecision::Deny,
            ok.reason_code,
            ok.reason.as_str(),
            correlation_id,
            turn_id,
        );
        Ok(GateVerdict::Denied(GateDenial {
            reason_code: ok.reason_code,
        }))
    }

    /// Rewrites a list/report query before execution. Never fails open: an
    /// unknown or unscoped actor gets the zero-row scope.
    pub fn scope_query<Q>(
        &self,
        actor_id: &ActorId,
        base: Q,
        correlation_id: CorrelationId,
        turn_id: TurnId,
        now: MonotonicTimeNs,
    ) -> Result<ScopedQuery<Q>, GateError> {
        let Some(actor) = self.resolve_actor(actor_id, now)? else {
            self.deny_unknown_actor(actor_id, correlation_id, turn_id, now);
            return Ok(ScopedQuery {
                base,
                scope: UnitScope::MatchNone,
            });
        };

        let envelope = AccessRequestEnvelope::v1(correlation_id, turn_id)?;
        let request = AccessRequest::QueryScope(QueryScopeRequest::v1(envelope, actor)?);
        let AccessResponse::QueryScopeOk(ok) = self.runtime.run(&request) else {
            return Err(GateError::Validation(ContractViolation::InvalidValue {
                field: "access_request",
                reason: "engine refused a pre-validated request",
            }));
        };
        Ok(ScopedQuery {
            base,
            scope: ok.scope,
        })
    }

    pub fn ticket_rows(&self, now: MonotonicTimeNs) -> Result<Vec<TicketRecord>, GateError> {
        self.source
            .ticket_rows(now)
            .map_err(|e| GateError::RegistryUnavailable { port: e.port })
    }

    /// Resolves the actor and re-checks their unit against the registry.
    /// A missing unit row strips the unit (fail closed as unscoped); a
    /// deactivated unit is left alone, only the flag flipped.
    fn resolve_actor(
        &self,
        actor_id: &ActorId,
        now: MonotonicTimeNs,
    ) -> Result<Option<ActorRecord>, GateError> {
        let actor = self
            .directory
            .get_actor(actor_id, now)
            .map_err(|e| GateError::RegistryUnavailable { port: e.port })?;
        let Some(mut actor) = actor else {
            return Ok(None);
        };
        if actor.role == ActorRole::Member {
            if let Some(unit_id) = actor.unit_id.clone() {
                let unit = self
                    .registry
                    .get_unit(&unit_id, now)
                    .map_err(|e| GateError::RegistryUnavailable { port: e.port })?;
                if unit.is_none() {
                    actor.unit_id = None;
                }
            }
        }
        Ok(Some(actor))
    }

    fn deny_unknown_actor(
        &self,
        actor_id: &ActorId,
        correlation_id: CorrelationId,
        turn_id: TurnId,
        now: MonotonicTimeNs,
    ) -> GateVerdict {
        self.emit_audit(
            now,
            actor_id.clone(),
            None,
            None,
            AuditDecision::Deny,
            reason_codes::GATE_ACTOR_UNKNOWN,
            "actor_unknown",
            correlation_id,
            turn_id,
        );
        GateVerdict::Denied(GateDenial {
            reason_code: reason_codes::GATE_ACTOR_UNKNOWN,
        })
    }

    /// Best-effort emission. A malformed entry is dropped here rather than
    /// surfaced; audit problems never become request errors.
    #[allow(clippy::too_many_arguments)]
    fn emit_audit(
        &self,
        now: MonotonicTimeNs,
        actor_id: ActorId,
        resource_id: Option<ResourceId>,
        resource_kind: Option<ResourceKind>,
        decision: AuditDecision,
        reason_code: ReasonCodeId,
        reason: &str,
        correlation_id: CorrelationId,
        turn_id: TurnId,
    ) {
        let mut payload = BTreeMap::new();
        payload.insert("reason".to_string(), reason.to_string());
        let target = resource_id
            .as_ref()
            .map(|r| r.as_str().to_string())
            .unwrap_or_else(|| "none".to_string());
        let idempotency_key = format!(
            "{}-{}-{}-{}",
            decision.as_str(),
            correlation_id.0,
            turn_id.0,
            target
        );
        if let Ok(input) = AuditEntryInput::v1(
            now,
            actor_id,
            resource_id,
            resource_kind,
            decision,
            reason_code,
            correlation_id,
            payload,
            Some(idempotency_key),
        ) {
            self.audit.record(input);
        }
    }
}
