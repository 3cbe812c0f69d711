#![forbid(unsafe_code)]

use caretrack_kernel_contracts::audit::{AuditEntry, AuditEntryId, AuditEntryInput};
use caretrack_kernel_contracts::directory::{ActorId, ActorRecord, UnitId, UnitRecord};
use caretrack_kernel_contracts::resource::{
    EscalationId, EscalationRecord, ResourceId, ResourceRef, TicketRecord,
};
use caretrack_kernel_contracts::MonotonicTimeNs;

use crate::store::{CaretrackStore, StorageError};

/// Typed repository interface for the directory tables (actors, units).
pub trait DirectoryRepo {
    fn insert_actor_row(&mut self, record: ActorRecord) -> Result<(), StorageError>;
    fn insert_unit_row(&mut self, record: UnitRecord) -> Result<(), StorageError>;
    fn get_actor_row(&self, actor_id: &ActorId) -> Option<&ActorRecord>;
    fn get_unit_row(&self, unit_id: &UnitId) -> Option<&UnitRecord>;
    fn reassign_actor_unit(
        &mut self,
        actor_id: &ActorId,
        unit_id: Option<UnitId>,
    ) -> Result<(), StorageError>;
    fn set_unit_active(&mut self, unit_id: &UnitId, active: bool) -> Result<(), StorageError>;
}

/// Typed repository interface for unit-owned resources and handoffs.
pub trait TicketRepo {
    fn insert_ticket_row(&mut self, record: TicketRecord) -> Result<(), StorageError>;
    fn import_legacy_ticket_row(&mut self, record: TicketRecord) -> Result<(), StorageError>;
    fn insert_escalation_row(&mut self, record: EscalationRecord) -> Result<(), StorageError>;
    fn get_ticket_row(&self, resource_id: &ResourceId) -> Option<&TicketRecord>;
    fn get_escalation_row(&self, escalation_id: &EscalationId) -> Option<&EscalationRecord>;
    fn resource_ref(&self, resource_id: &ResourceId) -> Option<ResourceRef>;
    fn ticket_rows(&self) -> Vec<&TicketRecord>;
    fn escalation_rows(&self) -> Vec<&EscalationRecord>;
}

/// Typed repository interface for the append-only audit ledger.
pub trait AuditLedgerRepo {
    fn append_audit_entry(&mut self, input: AuditEntryInput) -> Result<AuditEntryId, StorageError>;
    fn audit_entries(&self) -> &[AuditEntry];
    fn audit_entries_by_actor(&self, actor_id: &ActorId) -> Vec<&AuditEntry>;
    fn audit_entries_by_resource(&self, resource_id: &ResourceId) -> Vec<&AuditEntry>;
    fn audit_entries_in_range(
        &self,
        from: MonotonicTimeNs,
        to: MonotonicTimeNs,
    ) -> Vec<&AuditEntry>;
    fn verify_chain(&self) -> Result<(), StorageError>;
}

impl DirectoryRepo for CaretrackStore {
    fn insert_actor_row(&mut self, record: ActorRecord) -> Result<(), StorageError> {
        CaretrackStore::insert_actor_row(self, record)
    }

    fn insert_unit_row(&mut self, record: UnitRecord) -> Result<(), StorageError> {
        CaretrackStore::insert_unit_row(self, record)
    }

    fn get_actor_row(&self, actor_id: &ActorId) -> Option<&ActorRecord> {
        CaretrackStore::get_actor_row(self, actor_id)
    }

    fn get_unit_row(&self, unit_id: &UnitId) -> Option<&UnitRecord> {
        CaretrackStore::get_unit_row(self, unit_id)
    }

    fn reassign_actor_unit(
        &mut self,
        actor_id: &ActorId,
        unit_id: Option<UnitId>,
    ) -> Result<(), StorageError> {
        CaretrackStore::reassign_actor_unit(self, actor_id, unit_id)
    }

    fn set_unit_active(&mut self, unit_id: &UnitId, active: bool) -> Result<(), StorageError> {
        CaretrackStore::set_unit_active(self, unit_id, active)
    }
}

impl TicketRepo for CaretrackStore {
    fn insert_ticket_row(&mut self, record: TicketRecord) -> Result<(), StorageError> {
        CaretrackStore::insert_ticket_row(self, record)
    }

    fn import_legacy_ticket_row(&mut self, record: TicketRecord) -> Result<(), StorageError> {
        CaretrackStore::import_legacy_ticket_row(self, record)
    }

    fn insert_escalation_row(&mut self, record: EscalationRecord) -> Result<(), StorageError> {
        CaretrackStore::insert_escalation_row(self, record)
    }

    fn get_ticket_row(&self, resource_id: &ResourceId) -> Option<&TicketRecord> {
        CaretrackStore::get_ticket_row(self, resource_id)
    }

    fn get_escalation_row(&self, escalation_id: &EscalationId) -> Option<&EscalationRecord> {
        CaretrackStore::get_escalation_row(self, escalation_id)
    }

    fn resource_ref(&self, resource_id: &ResourceId) -> Option<ResourceRef> {
        CaretrackStore::resource_ref(self, resource_id)
    }

    fn ticket_rows(&self) -> Vec<&TicketRecord> {
        CaretrackStore::ticket_rows(self)
    }

    fn escalation_rows(&self) -> Vec<&EscalationRecord> {
        CaretrackStore::escalation_rows(self)
    }
}

impl AuditLedgerRepo for CaretrackStore {
    fn append_audit_entry(&mut self, input: AuditEntryInput) -> Result<AuditEntryId, StorageError> {
        CaretrackStore::append_audit_entry(self, input)
    }

    fn audit_entries(&self) -> &[AuditEntry] {
        CaretrackStore::audit_entries(self)
    }

    fn audit_entries_by_actor(&self, actor_id: &ActorId) -> Vec<&AuditEntry> {
        CaretrackStore::audit_entries_by_actor(self, actor_id)
    }

    fn audit_entries_by_resource(&self, resource_id: &ResourceId) -> Vec<&AuditEntry> {
        CaretrackStore::audit_entries_by_resource(self, resource_id)
    }

    fn audit_entries_in_range(
        &self,
        from: MonotonicTimeNs,
        to: MonotonicTimeNs,
    ) -> Vec<&AuditEntry> {
        CaretrackStore::audit_entries_in_range(self, from, to)
    }

    fn verify_chain(&self) -> Result<(), StorageError> {
        CaretrackStore::verify_chain(self)
    }
}
