#![forbid(unsafe_code)]

use std::collections::BTreeMap;

use sha2::{Digest, Sha256};

use caretrack_kernel_contracts::audit::{AuditEntry, AuditEntryId, AuditEntryInput};
use caretrack_kernel_contracts::directory::{ActorId, ActorRecord, UnitId, UnitRecord};
use caretrack_kernel_contracts::resource::{
    EscalationId, EscalationRecord, ResourceId, ResourceRef, TicketRecord,
};
use caretrack_kernel_contracts::{ContractViolation, MonotonicTimeNs, Validate};

#[derive(Debug, Clone, PartialEq)]
pub enum StorageError {
    ForeignKeyViolation { table: &'static str, key: String },
    DuplicateKey { table: &'static str, key: String },
    AppendOnlyViolation { table: &'static str },
    ChainMismatch { entry_id: AuditEntryId },
    ContractViolation(ContractViolation),
}

impl From<ContractViolation> for StorageError {
    fn from(v: ContractViolation) -> Self {
        StorageError::ContractViolation(v)
    }
}

const GENESIS_CHAIN_HASH: &str =
    "0000000000000000000000000000000000000000000000000000000000000000";

fn chain_payload(prev_hash: &str, entry_id: AuditEntryId, input: &AuditEntryInput) -> String {
    let mut payload = String::new();
    for (k, v) in &input.payload_min {
        payload.push_str(k);
        payload.push('=');
        payload.push_str(v);
        payload.push(';');
    }
    format!(
        "{prev_hash}|{}|{}|{}|{}|{}|{}|{:08x}|{}|{payload}|{}",
        entry_id.0,
        input.created_at.0,
        input.actor_id.as_str(),
        input
            .resource_id
            .as_ref()
            .map(|r| r.as_str())
            .unwrap_or("-"),
        input.resource_kind.map(|k| k.as_str()).unwrap_or("-"),
        input.decision.as_str(),
        input.reason_code.0,
        input.correlation_id.0,
        input.idempotency_key.as_deref().unwrap_or("-"),
    )
}

fn chain_hash(prev_hash: &str, entry_id: AuditEntryId, input: &AuditEntryInput) -> String {
    let mut hasher = Sha256::new();
    hasher.update(chain_payload(prev_hash, entry_id, input).as_bytes());
    let digest = hasher.finalize();
    let mut out = String::with_capacity(64);
    for byte in digest {
        out.push_str(&format!("{byte:02x}"));
    }
    out
}

fn entry_as_input(entry: &AuditEntry) -> AuditEntryInput {
    AuditEntryInput {
        schema_version: entry.schema_version,
        created_at: entry.created_at,
        actor_id: entry.actor_id.clone(),
        resource_id: entry.resource_id.clone(),
        resource_kind: entry.resource_kind,
        decision: entry.decision,
        reason_code: entry.reason_code,
        correlation_id: entry.correlation_id,
        payload_min: entry.payload_min.clone(),
        idempotency_key: entry.idempotency_key.clone(),
    }
}

/// Recomputes the hash chain over an exported ledger slice. Used by
/// `CaretrackStore::verify_chain` and by forensic review of exported rows.
pub fn verify_entries(entries: &[AuditEntry]) -> Result<(), StorageError> {
    let mut prev = GENESIS_CHAIN_HASH.to_string();
    for entry in entries {
        let expected = chain_hash(&prev, entry.entry_id, &entry_as_input(entry));
        if entry.chain_hash != expected {
            return Err(StorageError::ChainMismatch {
                entry_id: entry.entry_id,
            });
        }
        prev = entry.chain_hash.clone();
    }
    Ok(())
}

/// In-memory relational-style store for the access core: directory tables,
/// ticket/escalation tables, and the append-only audit ledger.
#[derive(Debug, Default)]
pub struct CaretrackStore {
    actors: BTreeMap<ActorId, ActorRecord>,
    units: BTreeMap<UnitId, UnitRecord>,
    tickets: BTreeMap<ResourceId, TicketRecord>,
    escalations: BTreeMap<EscalationId, EscalationRecord>,
    audit_entries: Vec<AuditEntry>,
    audit_idempotency_index: BTreeMap<String, AuditEntryId>,
    next_audit_entry_id: u64,
}

impl CaretrackStore {
    pub fn new() -> Self {
        Self {
            next_audit_entry_id: 1,
            ..Self::default()
        }
    }

    // ------------------------
    // Directory tables (actors, units).
    // ------------------------

    pub fn insert_unit_row(&mut self, record: UnitRecord) -> Result<(), StorageError> {
        record.validate()?;
        if self.units.contains_key(&record.unit_id) {
            return Err(StorageError::DuplicateKey {
                table: "units",
                key: record.unit_id.as_str().to_string(),
            });
        }
        if let Some(parent_id) = &record.parent_id {
            if !self.units.contains_key(parent_id) {
                return Err(StorageError::ForeignKeyViolation {
                    table: "units",
                    key: parent_id.as_str().to_string(),
                });
            }
        }
        self.units.insert(record.unit_id.clone(), record);
        Ok(())
    }

    pub fn insert_actor_row(&mut self, record: ActorRecord) -> Result<(), StorageError> {
        record.validate()?;
        if self.actors.contains_key(&record.actor_id) {
            return Err(StorageError::DuplicateKey {
                table: "actors",
                key: record.actor_id.as_str().to_string(),
            });
        }
        if let Some(unit_id) = &record.unit_id {
            if !self.units.contains_key(unit_id) {
                return Err(StorageError::ForeignKeyViolation {
                    table: "units",
                    key: unit_id.as_str().to_string(),
                });
            }
        }
        self.actors.insert(record.actor_id.clone(), record);
        Ok(())
    }

    /// Lifecycle op: an actor may be moved between units (or unassigned) at
    /// any time. No decision is cached per session, so the very next
    /// evaluation sees the new unit.
    pub fn reassign_actor_unit(
        &mut self,
        actor_id: &ActorId,
        unit_id: Option<UnitId>,
    ) -> Result<(), StorageError> {
        if let Some(unit_id) = &unit_id {
            if !self.units.contains_key(unit_id) {
                return Err(StorageError::ForeignKeyViolation {
                    table: "units",
                    key: unit_id.as_str().to_string(),
                });
            }
        }
        let Some(record) = self.actors.get_mut(actor_id) else {
            return Err(StorageError::ForeignKeyViolation {
                table: "actors",
                key: actor_id.as_str().to_string(),
            });
        };
        record.unit_id = unit_id;
        Ok(())
    }

    /// Flips the active flag only. Deactivation does not retroactively revoke
    /// access to resources already scoped to the unit (confirmed product
    /// decision; changing it requires explicit sign-off).
    pub fn set_unit_active(&mut self, unit_id: &UnitId, active: bool) -> Result<(), StorageError> {
        let Some(record) = self.units.get_mut(unit_id) else {
            return Err(StorageError::ForeignKeyViolation {
                table: "units",
                key: unit_id.as_str().to_string(),
            });
        };
        record.active = active;
        Ok(())
    }

    pub fn get_actor_row(&self, actor_id: &ActorId) -> Option<&ActorRecord> {
        self.actors.get(actor_id)
    }

    pub fn get_unit_row(&self, unit_id: &UnitId) -> Option<&UnitRecord> {
        self.units.get(unit_id)
    }

    // ------------------------
    // Ticket and escalation tables.
    // ------------------------

    /// Creation path. Every resource must carry its owning unit at creation;
    /// a missing unit here is rejected, not stored.
    pub fn insert_ticket_row(&mut self, record: TicketRecord) -> Result<(), StorageError> {
        record.validate()?;
        let Some(unit_id) = &record.unit_id else {
            return Err(StorageError::ContractViolation(
                ContractViolation::InvalidValue {
                    field: "ticket_record.unit_id",
                    reason: "must be present at creation",
                },
            ));
        };
        if !self.units.contains_key(unit_id) {
            return Err(StorageError::ForeignKeyViolation {
                table: "units",
                key: unit_id.as_str().to_string(),
            });
        }
        self.insert_ticket_row_inner(record)
    }

    /// Migration path. Legacy datasets contain tickets whose owning unit was
    /// lost; they stay representable so access on them fails closed instead
    /// of failing open or crashing list screens.
    pub fn import_legacy_ticket_row(&mut self, record: TicketRecord) -> Result<(), StorageError> {
        record.validate()?;
        if let Some(unit_id) = &record.unit_id {
            if !self.units.contains_key(unit_id) {
                return Err(StorageError::ForeignKeyViolation {
                    table: "units",
                    key: unit_id.as_str().to_string(),
                });
            }
        }
        self.insert_ticket_row_inner(record)
    }

    fn insert_ticket_row_inner(&mut self, record: TicketRecord) -> Result<(), StorageError> {
        if self.tickets.contains_key(&record.resource_id) {
            return Err(StorageError::DuplicateKey {
                table: "tickets",
                key: record.resource_id.as_str().to_string(),
            });
        }
        self.tickets.insert(record.resource_id.clone(), record);
        Ok(())
    }

    pub fn insert_escalation_row(&mut self, record: EscalationRecord) -> Result<(), StorageError> {
        record.validate()?;
        if self.escalations.contains_key(&record.escalation_id) {
            return Err(StorageError::DuplicateKey {
                table: "escalations",
                key: record.escalation_id.as_str().to_string(),
            });
        }
        if !self.tickets.contains_key(&record.ticket_id) {
            return Err(StorageError::ForeignKeyViolation {
                table: "tickets",
                key: record.ticket_id.as_str().to_string(),
            });
        }
        for unit_id in [
            &record.from_unit_id,
            &record.to_unit_id,
            &record.ticket_unit_id,
        ]
        .into_iter()
        .flatten()
        {
            if !self.units.contains_key(unit_id) {
                return Err(StorageError::ForeignKeyViolation {
                    table: "units",
                    key: unit_id.as_str().to_string(),
                });
            }
        }
        self.escalations
            .insert(record.escalation_id.clone(), record);
        Ok(())
    }

    pub fn get_ticket_row(&self, resource_id: &ResourceId) -> Option<&TicketRecord> {
        self.tickets.get(resource_id)
    }

    pub fn get_escalation_row(&self, escalation_id: &EscalationId) -> Option<&EscalationRecord> {
        self.escalations.get(escalation_id)
    }

    pub fn resource_ref(&self, resource_id: &ResourceId) -> Option<ResourceRef> {
        self.tickets.get(resource_id).map(TicketRecord::resource_ref)
    }

    pub fn ticket_rows(&self) -> Vec<&TicketRecord> {
        self.tickets.values().collect()
    }

    pub fn escalation_rows(&self) -> Vec<&EscalationRecord> {
        self.escalations.values().collect()
    }

    // ------------------------
    // Audit ledger (append-only, hash-chained).
    // ------------------------

    pub fn append_audit_entry(
        &mut self,
        input: AuditEntryInput,
    ) -> Result<AuditEntryId, StorageError> {
        input.validate()?;

        if let Some(key) = &input.idempotency_key {
            if let Some(existing) = self.audit_idempotency_index.get(key) {
                // Deterministic no-op on retry: return the original entry_id.
                return Ok(*existing);
            }
        }

        let entry_id = AuditEntryId(self.next_audit_entry_id);
        let prev_hash = self
            .audit_entries
            .last()
            .map(|e| e.chain_hash.as_str())
            .unwrap_or(GENESIS_CHAIN_HASH);
        let hash = chain_hash(prev_hash, entry_id, &input);
        let entry = AuditEntry::from_input_v1(entry_id, input, hash)?;

        if let Some(key) = &entry.idempotency_key {
            self.audit_idempotency_index.insert(key.clone(), entry_id);
        }
        self.audit_entries.push(entry);
        self.next_audit_entry_id = self.next_audit_entry_id.saturating_add(1);
        Ok(entry_id)
    }

    pub fn audit_entries(&self) -> &[AuditEntry] {
        &self.audit_entries
    }

    pub fn attempt_overwrite_audit_entry(
        &mut self,
        _entry_id: AuditEntryId,
    ) -> Result<(), StorageError> {
        Err(StorageError::AppendOnlyViolation {
            table: "audit_entries",
        })
    }

    pub fn audit_entries_by_actor(&self, actor_id: &ActorId) -> Vec<&AuditEntry> {
        self.audit_entries
            .iter()
            .filter(|e| &e.actor_id == actor_id)
            .collect()
    }

    pub fn audit_entries_by_resource(&self, resource_id: &ResourceId) -> Vec<&AuditEntry> {
        self.audit_entries
            .iter()
            .filter(|e| e.resource_id.as_ref() == Some(resource_id))
            .collect()
    }

    /// Closed range on both ends.
    pub fn audit_entries_in_range(
        &self,
        from: MonotonicTimeNs,
        to: MonotonicTimeNs,
    ) -> Vec<&AuditEntry> {
        self.audit_entries
            .iter()
            .filter(|e| e.created_at >= from && e.created_at <= to)
            .collect()
    }

    pub fn verify_chain(&self) -> Result<(), StorageError> {
        verify_entries(&self.audit_entries)
    }
}
