#![forbid(unsafe_code)]

use serde::{Deserialize, Serialize};

use crate::directory::UnitId;
use crate::{ContractViolation, MonotonicTimeNs, SchemaVersion, Validate};

pub const RESOURCE_CONTRACT_VERSION: SchemaVersion = SchemaVersion(1);

fn validate_id(field: &'static str, s: &str, max_len: usize) -> Result<(), ContractViolation> {
    if s.trim().is_empty() {
        return Err(ContractViolation::InvalidValue {
            field,
            reason: "must not be empty",
        });
    }
    if s.len() > max_len {
        return Err(ContractViolation::InvalidValue {
            field,
            reason: "too long",
        });
    }
    if !s.is_ascii() {
        return Err(ContractViolation::InvalidValue {
            field,
            reason: "must be ASCII",
        });
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ResourceId(String);

impl ResourceId {
    pub fn new(id: impl Into<String>) -> Result<Self, ContractViolation> {
        let v = Self(id.into());
        v.validate()?;
        Ok(v)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Validate for ResourceId {
    fn validate(&self) -> Result<(), ContractViolation> {
        validate_id("resource_id", &self.0, 64)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EscalationId(String);

impl EscalationId {
    pub fn new(id: impl Into<String>) -> Result<Self, ContractViolation> {
        let v = Self(id.into());
        v.validate()?;
        Ok(v)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Validate for EscalationId {
    fn validate(&self) -> Result<(), ContractViolation> {
        validate_id("escalation_id", &self.0, 64)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ResourceKind {
    Ticket,
    Survey,
    Attachment,
}

impl ResourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Ticket => "ticket",
            ResourceKind::Survey => "survey",
            ResourceKind::Attachment => "attachment",
        }
    }
}

/// Engine-facing view of a unit-owned entity.
///
/// `unit_id = None` models the data-integrity fault of a resource missing its
/// owning unit. The fault is representable so the decision engine can fail
/// closed on it; it is never a valid access target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceRef {
    pub schema_version: SchemaVersion,
    pub resource_id: ResourceId,
    pub kind: ResourceKind,
    pub unit_id: Option<UnitId>,
}

impl ResourceRef {
    pub fn v1(
        resource_id: ResourceId,
        kind: ResourceKind,
        unit_id: Option<UnitId>,
    ) -> Result<Self, ContractViolation> {
        let r = Self {
            schema_version: RESOURCE_CONTRACT_VERSION,
            resource_id,
            kind,
            unit_id,
        };
        r.validate()?;
        Ok(r)
    }
}

impl Validate for ResourceRef {
    fn validate(&self) -> Result<(), ContractViolation> {
        if self.schema_version.0 == 0 {
            return Err(ContractViolation::InvalidValue {
                field: "resource_ref.schema_version",
                reason: "must be > 0",
            });
        }
        self.resource_id.validate()?;
        if let Some(unit_id) = &self.unit_id {
            unit_id.validate()?;
        }
        Ok(())
    }
}

/// Stored row for a ticket (or similar unit-owned entity).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketRecord {
    pub schema_version: SchemaVersion,
    pub resource_id: ResourceId,
    pub kind: ResourceKind,
    pub unit_id: Option<UnitId>,
    pub created_at: MonotonicTimeNs,
    pub subject: String,
}

impl TicketRecord {
    pub fn v1(
        resource_id: ResourceId,
        kind: ResourceKind,
        unit_id: Option<UnitId>,
        created_at: MonotonicTimeNs,
        subject: String,
    ) -> Result<Self, ContractViolation> {
        let record = Self {
            schema_version: RESOURCE_CONTRACT_VERSION,
            resource_id,
            kind,
            unit_id,
            created_at,
            subject,
        };
        record.validate()?;
        Ok(record)
    }

    pub fn resource_ref(&self) -> ResourceRef {
        ResourceRef {
            schema_version: RESOURCE_CONTRACT_VERSION,
            resource_id: self.resource_id.clone(),
            kind: self.kind,
            unit_id: self.unit_id.clone(),
        }
    }
}

impl Validate for TicketRecord {
    fn validate(&self) -> Result<(), ContractViolation> {
        if self.schema_version.0 == 0 {
            return Err(ContractViolation::InvalidValue {
                field: "ticket_record.schema_version",
                reason: "must be > 0",
            });
        }
        self.resource_id.validate()?;
        if let Some(unit_id) = &self.unit_id {
            unit_id.validate()?;
        }
        if self.subject.trim().is_empty() {
            return Err(ContractViolation::InvalidValue {
                field: "ticket_record.subject",
                reason: "must not be empty",
            });
        }
        if self.subject.len() > 256 {
            return Err(ContractViolation::InvalidValue {
                field: "ticket_record.subject",
                reason: "too long",
            });
        }
        Ok(())
    }
}

/// A unit-to-unit handoff of a ticket. Carries the three unit references
/// that together form its visibility set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EscalationRecord {
    pub schema_version: SchemaVersion,
    pub escalation_id: EscalationId,
    pub ticket_id: ResourceId,
    pub from_unit_id: Option<UnitId>,
    pub to_unit_id: Option<UnitId>,
    pub ticket_unit_id: Option<UnitId>,
}

impl EscalationRecord {
    pub fn v1(
        escalation_id: EscalationId,
        ticket_id: ResourceId,
        from_unit_id: Option<UnitId>,
        to_unit_id: Option<UnitId>,
        ticket_unit_id: Option<UnitId>,
    ) -> Result<Self, ContractViolation> {
        let record = Self {
            schema_version: RESOURCE_CONTRACT_VERSION,
            escalation_id,
            ticket_id,
            from_unit_id,
            to_unit_id,
            ticket_unit_id,
        };
        record.validate()?;
        Ok(record)
    }
}

impl Validate for EscalationRecord {
    fn validate(&self) -> Result<(), ContractViolation> {
        if self.schema_version.0 == 0 {
            return Err(ContractViolation::InvalidValue {
                field: "escalation_record.schema_version",
                reason: "must be > 0",
            });
        }
        self.escalation_id.validate()?;
        self.ticket_id.validate()?;
        for unit in [&self.from_unit_id, &self.to_unit_id, &self.ticket_unit_id]
            .into_iter()
            .flatten()
        {
            unit.validate()?;
        }
        Ok(())
    }
}
