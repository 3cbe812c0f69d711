#![forbid(unsafe_code)]

use caretrack_kernel_contracts::directory::{ActorId, ActorRecord, ActorRole, UnitId, UnitRecord};
use caretrack_kernel_contracts::resource::{
    EscalationId, EscalationRecord, ResourceId, ResourceKind, TicketRecord,
};
use caretrack_kernel_contracts::MonotonicTimeNs;
use caretrack_storage::repo::{DirectoryRepo, TicketRepo};
use caretrack_storage::{CaretrackStore, StorageError};

fn unit(id: &str) -> UnitId {
    UnitId::new(id).unwrap()
}

fn seed_units(store: &mut CaretrackStore) {
    for id in ["cardiology", "radiology", "pharmacy"] {
        store
            .insert_unit_row(UnitRecord::v1(unit(id), true, None).unwrap())
            .unwrap();
    }
}

fn ticket(id: &str, unit_id: Option<&str>) -> TicketRecord {
    TicketRecord::v1(
        ResourceId::new(id).unwrap(),
        ResourceKind::Ticket,
        unit_id.map(unit),
        MonotonicTimeNs(1),
        "noise complaint in ward 3".to_string(),
    )
    .unwrap()
}

#[test]
fn actor_insert_enforces_unit_foreign_key() {
    let mut store = CaretrackStore::new();
    seed_units(&mut store);
    let orphan = ActorRecord::v1(
        ActorId::new("staff_1").unwrap(),
        Some(unit("oncology")),
        ActorRole::Member,
    )
    .unwrap();
    assert!(matches!(
        store.insert_actor_row(orphan),
        Err(StorageError::ForeignKeyViolation { table: "units", .. })
    ));

    let ok = ActorRecord::v1(
        ActorId::new("staff_1").unwrap(),
        Some(unit("cardiology")),
        ActorRole::Member,
    )
    .unwrap();
    store.insert_actor_row(ok).unwrap();
    assert!(store
        .get_actor_row(&ActorId::new("staff_1").unwrap())
        .is_some());
}

#[test]
fn ticket_creation_requires_an_owning_unit() {
    let mut store = CaretrackStore::new();
    seed_units(&mut store);
    assert!(matches!(
        store.insert_ticket_row(ticket("tkt_1", None)),
        Err(StorageError::ContractViolation(_))
    ));
    store
        .insert_ticket_row(ticket("tkt_1", Some("cardiology")))
        .unwrap();
}

#[test]
fn legacy_import_keeps_unit_less_fault_rows_representable() {
    let mut store = CaretrackStore::new();
    seed_units(&mut store);
    store
        .import_legacy_ticket_row(ticket("tkt_legacy", None))
        .unwrap();
    let resource_ref = store
        .resource_ref(&ResourceId::new("tkt_legacy").unwrap())
        .unwrap();
    assert!(resource_ref.unit_id.is_none());
}

#[test]
fn duplicate_ticket_ids_are_rejected() {
    let mut store = CaretrackStore::new();
    seed_units(&mut store);
    store
        .insert_ticket_row(ticket("tkt_1", Some("cardiology")))
        .unwrap();
    assert!(matches!(
        store.insert_ticket_row(ticket("tkt_1", Some("radiology"))),
        Err(StorageError::DuplicateKey {
            table: "tickets",
            ..
        })
    ));
}

#[test]
fn escalation_requires_existing_ticket_and_units() {
    let mut store = CaretrackStore::new();
    seed_units(&mut store);
    store
        .insert_ticket_row(ticket("tkt_1", Some("cardiology")))
        .unwrap();

    let dangling = EscalationRecord::v1(
        EscalationId::new("esc_1").unwrap(),
        ResourceId::new("tkt_missing").unwrap(),
        Some(unit("cardiology")),
        Some(unit("radiology")),
        Some(unit("cardiology")),
    )
    .unwrap();
    assert!(matches!(
        store.insert_escalation_row(dangling),
        Err(StorageError::ForeignKeyViolation {
            table: "tickets",
            ..
        })
    ));

    let ok = EscalationRecord::v1(
        EscalationId::new("esc_1").unwrap(),
        ResourceId::new("tkt_1").unwrap(),
        Some(unit("cardiology")),
        Some(unit("radiology")),
        Some(unit("cardiology")),
    )
    .unwrap();
    store.insert_escalation_row(ok).unwrap();
    assert!(store
        .get_escalation_row(&EscalationId::new("esc_1").unwrap())
        .is_some());
}

#[test]
fn reassigning_an_actor_updates_the_directory_row() {
    let mut store = CaretrackStore::new();
    seed_units(&mut store);
    let actor_id = ActorId::new("staff_1").unwrap();
    store
        .insert_actor_row(
            ActorRecord::v1(actor_id.clone(), Some(unit("cardiology")), ActorRole::Member).unwrap(),
        )
        .unwrap();

    store
        .reassign_actor_unit(&actor_id, Some(unit("radiology")))
        .unwrap();
    assert_eq!(
        store.get_actor_row(&actor_id).unwrap().unit_id,
        Some(unit("radiology"))
    );

    // Unassignment is allowed and leaves the actor fail-closed.
    store.reassign_actor_unit(&actor_id, None).unwrap();
    assert!(store.get_actor_row(&actor_id).unwrap().unit_id.is_none());

    assert!(matches!(
        store.reassign_actor_unit(&actor_id, Some(unit("oncology"))),
        Err(StorageError::ForeignKeyViolation { table: "units", .. })
    ));
}

#[test]
fn deactivating_a_unit_flips_the_flag_only() {
    let mut store = CaretrackStore::new();
    seed_units(&mut store);
    store
        .insert_ticket_row(ticket("tkt_1", Some("cardiology")))
        .unwrap();

    store.set_unit_active(&unit("cardiology"), false).unwrap();
    assert!(!store.get_unit_row(&unit("cardiology")).unwrap().active);

    // Resources already scoped to the unit keep their owning unit; nothing
    // is retroactively rewritten or revoked.
    let resource_ref = store
        .resource_ref(&ResourceId::new("tkt_1").unwrap())
        .unwrap();
    assert_eq!(resource_ref.unit_id, Some(unit("cardiology")));
}

// Callers that only see the repo traits get the same wiring guarantees.
fn seed_via_repo<R: DirectoryRepo + TicketRepo>(repo: &mut R) -> Result<(), StorageError> {
    repo.insert_unit_row(UnitRecord::v1(unit("cardiology"), true, None)?)?;
    repo.insert_actor_row(ActorRecord::v1(
        ActorId::new("staff_1").unwrap(),
        Some(unit("cardiology")),
        ActorRole::Member,
    )?)?;
    repo.insert_ticket_row(ticket("tkt_1", Some("cardiology")))?;
    Ok(())
}

#[test]
fn repo_traits_expose_the_same_wiring() {
    let mut store = CaretrackStore::new();
    seed_via_repo(&mut store).unwrap();

    let repo: &dyn TicketRepo = &store;
    assert_eq!(repo.ticket_rows().len(), 1);
    assert!(repo
        .resource_ref(&ResourceId::new("tkt_1").unwrap())
        .is_some());
}
