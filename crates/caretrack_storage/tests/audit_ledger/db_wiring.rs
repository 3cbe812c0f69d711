#![forbid(unsafe_code)]

use std::collections::BTreeMap;

use caretrack_kernel_contracts::access::CorrelationId;
use caretrack_kernel_contracts::audit::{AuditDecision, AuditEntryId, AuditEntryInput};
use caretrack_kernel_contracts::directory::ActorId;
use caretrack_kernel_contracts::resource::{ResourceId, ResourceKind};
use caretrack_kernel_contracts::{MonotonicTimeNs, ReasonCodeId};
use caretrack_storage::repo::AuditLedgerRepo;
use caretrack_storage::store::verify_entries;
use caretrack_storage::{CaretrackStore, StorageError};

fn actor(id: &str) -> ActorId {
    ActorId::new(id).unwrap()
}

fn resource(id: &str) -> ResourceId {
    ResourceId::new(id).unwrap()
}

fn deny_input(
    now: u64,
    actor_id: &str,
    resource_id: &str,
    idempotency_key: Option<&str>,
) -> AuditEntryInput {
    let mut payload = BTreeMap::new();
    payload.insert("reason".to_string(), "cross_unit".to_string());
    AuditEntryInput::v1(
        MonotonicTimeNs(now),
        actor(actor_id),
        Some(resource(resource_id)),
        Some(ResourceKind::Ticket),
        AuditDecision::Deny,
        ReasonCodeId(0x4143_0012),
        CorrelationId(42),
        payload,
        idempotency_key.map(str::to_string),
    )
    .unwrap()
}

#[test]
fn append_assigns_sequential_ids_and_a_valid_chain() {
    let mut store = CaretrackStore::new();
    let id1 = store
        .append_audit_entry(deny_input(10, "staff_1", "tkt_1", None))
        .unwrap();
    let id2 = store
        .append_audit_entry(deny_input(20, "staff_2", "tkt_2", None))
        .unwrap();
    assert_eq!(id1, AuditEntryId(1));
    assert_eq!(id2, AuditEntryId(2));
    assert_eq!(store.audit_entries().len(), 2);
    assert_ne!(
        store.audit_entries()[0].chain_hash,
        store.audit_entries()[1].chain_hash
    );
    store.verify_chain().unwrap();
}

#[test]
fn idempotent_retry_returns_original_entry_id_without_a_new_row() {
    let mut store = CaretrackStore::new();
    let first = store
        .append_audit_entry(deny_input(10, "staff_1", "tkt_1", Some("deny-42-tkt_1")))
        .unwrap();
    let retry = store
        .append_audit_entry(deny_input(11, "staff_1", "tkt_1", Some("deny-42-tkt_1")))
        .unwrap();
    assert_eq!(first, retry);
    assert_eq!(store.audit_entries().len(), 1);
    store.verify_chain().unwrap();
}

#[test]
fn ledger_rejects_overwrite_attempts() {
    let mut store = CaretrackStore::new();
    let id = store
        .append_audit_entry(deny_input(10, "staff_1", "tkt_1", None))
        .unwrap();
    let err = store.attempt_overwrite_audit_entry(id).unwrap_err();
    assert_eq!(
        err,
        StorageError::AppendOnlyViolation {
            table: "audit_entries"
        }
    );
}

#[test]
fn tampered_row_breaks_chain_verification() {
    let mut store = CaretrackStore::new();
    store
        .append_audit_entry(deny_input(10, "staff_1", "tkt_1", None))
        .unwrap();
    store
        .append_audit_entry(deny_input(20, "staff_2", "tkt_2", None))
        .unwrap();
    store
        .append_audit_entry(deny_input(30, "staff_3", "tkt_3", None))
        .unwrap();
    store.verify_chain().unwrap();

    // Rewrite the middle row of an exported copy: the actor swap must be
    // detected even though the row is otherwise self-consistent.
    let mut exported: Vec<_> = store.audit_entries().to_vec();
    exported[1].actor_id = actor("someone_else");
    let err = verify_entries(&exported).unwrap_err();
    assert_eq!(
        err,
        StorageError::ChainMismatch {
            entry_id: AuditEntryId(2)
        }
    );

    // Truncating the tail is fine (prefix is a valid chain); rewriting any
    // prefix row is not.
    verify_entries(&exported[..1]).unwrap();
}

#[test]
fn forensic_queries_filter_by_actor_resource_and_time_range() {
    let mut store = CaretrackStore::new();
    store
        .append_audit_entry(deny_input(10, "staff_1", "tkt_1", None))
        .unwrap();
    store
        .append_audit_entry(deny_input(20, "staff_2", "tkt_1", None))
        .unwrap();
    store
        .append_audit_entry(deny_input(30, "staff_1", "tkt_2", None))
        .unwrap();

    let by_actor = store.audit_entries_by_actor(&actor("staff_1"));
    assert_eq!(by_actor.len(), 2);

    let by_resource = store.audit_entries_by_resource(&resource("tkt_1"));
    assert_eq!(by_resource.len(), 2);

    let in_range = store.audit_entries_in_range(MonotonicTimeNs(15), MonotonicTimeNs(30));
    assert_eq!(in_range.len(), 2);
    assert!(in_range.iter().all(|e| e.created_at.0 >= 15));
}

#[test]
fn ledger_repo_trait_appends_and_verifies() {
    fn record_denial<R: AuditLedgerRepo>(repo: &mut R) -> Result<AuditEntryId, StorageError> {
        repo.append_audit_entry(deny_input(10, "staff_1", "tkt_1", None))
    }

    let mut store = CaretrackStore::new();
    let id = record_denial(&mut store).unwrap();
    assert_eq!(id, AuditEntryId(1));
    let repo: &dyn AuditLedgerRepo = &store;
    assert_eq!(repo.audit_entries().len(), 1);
    repo.verify_chain().unwrap();
}

#[test]
fn contract_invalid_input_is_rejected_before_the_ledger() {
    let mut store = CaretrackStore::new();
    let mut bad = deny_input(10, "staff_1", "tkt_1", None);
    bad.created_at = MonotonicTimeNs(0);
    assert!(matches!(
        store.append_audit_entry(bad),
        Err(StorageError::ContractViolation(_))
    ));
    assert!(store.audit_entries().is_empty());
}
