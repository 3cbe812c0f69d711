#![forbid(unsafe_code)]

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::access::CorrelationId;
use crate::directory::ActorId;
use crate::resource::{ResourceId, ResourceKind};
use crate::{ContractViolation, MonotonicTimeNs, ReasonCodeId, SchemaVersion, Validate};

pub const AUDIT_CONTRACT_VERSION: SchemaVersion = SchemaVersion(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AuditEntryId(pub u64);

impl Validate for AuditEntryId {
    fn validate(&self) -> Result<(), ContractViolation> {
        if self.0 == 0 {
            return Err(ContractViolation::InvalidValue {
                field: "audit_entry_id",
                reason: "must be > 0",
            });
        }
        Ok(())
    }
}

/// Denials are always recorded. `AllowGlobal` covers the opt-in transparency
/// record of a privileged global-override access.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AuditDecision {
    Deny,
    AllowGlobal,
}

impl AuditDecision {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditDecision::Deny => "deny",
            AuditDecision::AllowGlobal => "allow_global",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEntryInput {
    pub schema_version: SchemaVersion,
    pub created_at: MonotonicTimeNs,
    pub actor_id: ActorId,
    pub resource_id: Option<ResourceId>,
    pub resource_kind: Option<ResourceKind>,
    pub decision: AuditDecision,
    pub reason_code: ReasonCodeId,
    pub correlation_id: CorrelationId,
    pub payload_min: BTreeMap<String, String>,
    /// Optional key to detect duplicate emissions deterministically.
    pub idempotency_key: Option<String>,
}

impl AuditEntryInput {
    #[allow(clippy::too_many_arguments)]
    pub fn v1(
        created_at: MonotonicTimeNs,
        actor_id: ActorId,
        resource_id: Option<ResourceId>,
        resource_kind: Option<ResourceKind>,
        decision: AuditDecision,
        reason_code: ReasonCodeId,
        correlation_id: CorrelationId,
        payload_min: BTreeMap<String, String>,
        idempotency_key: Option<String>,
    ) -> Result<Self, ContractViolation> {
        let input = Self {
            schema_version: AUDIT_CONTRACT_VERSION,
            created_at,
            actor_id,
            resource_id,
            resource_kind,
            decision,
            reason_code,
            correlation_id,
            payload_min,
            idempotency_key,
        };
        input.validate()?;
        Ok(input)
    }
}

impl Validate for AuditEntryInput {
    fn validate(&self) -> Result<(), ContractViolation> {
        if self.schema_version.0 == 0 {
            return Err(ContractViolation::InvalidValue {
                field: "audit_entry_input.schema_version",
                reason: "must be > 0",
            });
        }
        if self.created_at.0 == 0 {
            return Err(ContractViolation::InvalidValue {
                field: "audit_entry_input.created_at",
                reason: "must be > 0",
            });
        }
        self.actor_id.validate()?;
        if let Some(resource_id) = &self.resource_id {
            resource_id.validate()?;
        }
        self.correlation_id.validate()?;
        if self.payload_min.len() > 16 {
            return Err(ContractViolation::InvalidValue {
                field: "audit_entry_input.payload_min",
                reason: "must contain <= 16 pairs",
            });
        }
        for (key, value) in &self.payload_min {
            if key.trim().is_empty() || key.len() > 64 {
                return Err(ContractViolation::InvalidValue {
                    field: "audit_entry_input.payload_min",
                    reason: "key must be non-empty and <= 64 chars",
                });
            }
            if value.len() > 256 {
                return Err(ContractViolation::InvalidValue {
                    field: "audit_entry_input.payload_min",
                    reason: "value must be <= 256 chars",
                });
            }
        }
        if let Some(key) = &self.idempotency_key {
            if key.trim().is_empty() || key.len() > 128 {
                return Err(ContractViolation::InvalidValue {
                    field: "audit_entry_input.idempotency_key",
                    reason: "must be non-empty and <= 128 chars when provided",
                });
            }
        }
        Ok(())
    }
}

/// Write-once, read-many ledger row. `chain_hash` is assigned by the ledger
/// and covers the previous row's hash, making any rewrite detectable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub schema_version: SchemaVersion,
    pub entry_id: AuditEntryId,
    pub created_at: MonotonicTimeNs,
    pub actor_id: ActorId,
    pub resource_id: Option<ResourceId>,
    pub resource_kind: Option<ResourceKind>,
    pub decision: AuditDecision,
    pub reason_code: ReasonCodeId,
    pub correlation_id: CorrelationId,
    pub payload_min: BTreeMap<String, String>,
    pub idempotency_key: Option<String>,
    pub chain_hash: String,
}

impl AuditEntry {
    pub fn from_input_v1(
        entry_id: AuditEntryId,
        input: AuditEntryInput,
        chain_hash: String,
    ) -> Result<Self, ContractViolation> {
        let entry = Self {
            schema_version: input.schema_version,
            entry_id,
            created_at: input.created_at,
            actor_id: input.actor_id,
            resource_id: input.resource_id,
            resource_kind: input.resource_kind,
            decision: input.decision,
            reason_code: input.reason_code,
            correlation_id: input.correlation_id,
            payload_min: input.payload_min,
            idempotency_key: input.idempotency_key,
            chain_hash,
        };
        entry.validate()?;
        Ok(entry)
    }
}

impl Validate for AuditEntry {
    fn validate(&self) -> Result<(), ContractViolation> {
        self.entry_id.validate()?;
        if self.chain_hash.len() != 64 || !self.chain_hash.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(ContractViolation::InvalidValue {
                field: "audit_entry.chain_hash",
                reason: "must be 64 hex chars",
            });
        }
        Ok(())
    }
}
