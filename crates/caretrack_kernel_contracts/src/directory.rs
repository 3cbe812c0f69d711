#![forbid(unsafe_code)]

use serde::{Deserialize, Serialize};

use crate::{ContractViolation, SchemaVersion, Validate};

pub const DIRECTORY_CONTRACT_VERSION: SchemaVersion = SchemaVersion(1);

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
pub struct ActorId(String);

impl ActorId {
    pub fn new(id: impl Into<String>) -> Result<Self, ContractViolation> {
        let v = Self(id.into());
        v.validate()?;
        Ok(v)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Validate for ActorId {
    fn validate(&self) -> Result<(), ContractViolation> {
        validate_id("actor_id", &self.0, 64)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct UnitId(String);

impl UnitId {
    pub fn new(id: impl Into<String>) -> Result<Self, ContractViolation> {
        let v = Self(id.into());
        v.validate()?;
        Ok(v)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Validate for UnitId {
    fn validate(&self) -> Result<(), ContractViolation> {
        validate_id("unit_id", &self.0, 64)
    }
}

/// Privilege tier of a staff member. `GlobalOverride` is the small set of
/// roles (quality office, hospital direction) exempt from unit scoping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActorRole {
    Member,
    GlobalOverride,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActorRecord {
    pub schema_version: SchemaVersion,
    pub actor_id: ActorId,
    /// `None` for a member means fail-closed until a unit is assigned.
    pub unit_id: Option<UnitId>,
    pub role: ActorRole,
}

impl ActorRecord {
    pub fn v1(
        actor_id: ActorId,
        unit_id: Option<UnitId>,
        role: ActorRole,
    ) -> Result<Self, ContractViolation> {
        let record = Self {
            schema_version: DIRECTORY_CONTRACT_VERSION,
            actor_id,
            unit_id,
            role,
        };
        record.validate()?;
        Ok(record)
    }
}

impl Validate for ActorRecord {
    fn validate(&self) -> Result<(), ContractViolation> {
        if self.schema_version.0 == 0 {
            return Err(ContractViolation::InvalidValue {
                field: "actor_record.schema_version",
                reason: "must be > 0",
            });
        }
        self.actor_id.validate()?;
        if let Some(unit_id) = &self.unit_id {
            unit_id.validate()?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitRecord {
    pub schema_version: SchemaVersion,
    pub unit_id: UnitId,
    pub active: bool,
    /// Org-chart display only. Access decisions never walk the hierarchy.
    pub parent_id: Option<UnitId>,
}

impl UnitRecord {
    pub fn v1(
        unit_id: UnitId,
        active: bool,
        parent_id: Option<UnitId>,
    ) -> Result<Self, ContractViolation> {
        let record = Self {
            schema_version: DIRECTORY_CONTRACT_VERSION,
            unit_id,
            active,
            parent_id,
        };
        record.validate()?;
        Ok(record)
    }
}

impl Validate for UnitRecord {
    fn validate(&self) -> Result<(), ContractViolation> {
        if self.schema_version.0 == 0 {
            return Err(ContractViolation::InvalidValue {
                field: "unit_record.schema_version",
                reason: "must be > 0",
            });
        }
        self.unit_id.validate()?;
        if let Some(parent_id) = &self.parent_id {
            parent_id.validate()?;
            if parent_id == &self.unit_id {
                return Err(ContractViolation::InvalidValue {
                    field: "unit_record.parent_id",
                    reason: "must differ from unit_id",
                });
            }
        }
        Ok(())
    }
}
