#![forbid(unsafe_code)]

use serde::{Deserialize, Serialize};

use crate::directory::UnitId;
use crate::resource::ResourceKind;
use crate::{ContractViolation, Validate};

/// The unit predicate attached to a list/report query after scoping.
///
/// `MatchNone` is the fail-closed zero-row predicate for a member without an
/// assigned unit: the query runs, returns nothing, and never leaks unscoped
/// rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnitScope {
    Unrestricted,
    OnlyUnit(UnitId),
    MatchNone,
}

impl UnitScope {
    /// The single containment predicate every scoped row must satisfy.
    /// A row with no owning unit is only admitted by `Unrestricted`.
    pub fn admits(&self, row_unit: Option<&UnitId>) -> bool {
        match self {
            UnitScope::Unrestricted => true,
            UnitScope::OnlyUnit(unit_id) => row_unit == Some(unit_id),
            UnitScope::MatchNone => false,
        }
    }
}

impl Validate for UnitScope {
    fn validate(&self) -> Result<(), ContractViolation> {
        if let UnitScope::OnlyUnit(unit_id) = self {
            unit_id.validate()?;
        }
        Ok(())
    }
}

/// Caller-supplied base filter for ticket lists. Scoping is applied on top of
/// whatever the base asks for; it never widens it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketListQuery {
    pub kind: Option<ResourceKind>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScopedQuery<Q> {
    pub base: Q,
    pub scope: UnitScope,
}
