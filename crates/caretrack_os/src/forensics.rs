#![forbid(unsafe_code)]

use serde::{Deserialize, Serialize};

use caretrack_kernel_contracts::audit::AuditEntry;
use caretrack_kernel_contracts::directory::ActorId;
use caretrack_kernel_contracts::resource::ResourceId;
use caretrack_kernel_contracts::MonotonicTimeNs;
use caretrack_storage::CaretrackStore;

/// Operator-side ledger query. All filters are conjunctive; an empty query
/// matches the whole ledger.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuditQuery {
    pub actor_id: Option<ActorId>,
    pub resource_id: Option<ResourceId>,
    pub from: Option<MonotonicTimeNs>,
    pub to: Option<MonotonicTimeNs>,
}

pub fn query_entries<'a>(store: &'a CaretrackStore, query: &AuditQuery) -> Vec<&'a AuditEntry> {
    store
        .audit_entries()
        .iter()
        .filter(|entry| {
            query
                .actor_id
                .as_ref()
                .map(|a| &entry.actor_id == a)
                .unwrap_or(true)
                && query
                    .resource_id
                    .as_ref()
                    .map(|r| entry.resource_id.as_ref() == Some(r))
                    .unwrap_or(true)
                && query.from.map(|t| entry.created_at >= t).unwrap_or(true)
                && query.to.map(|t| entry.created_at <= t).unwrap_or(true)
        })
        .collect()
}

/// Exports matching entries for offline review. The chain hashes travel with
/// the rows, so `caretrack_storage::verify_entries` can re-check the export
/// for tampering on the reviewer's side.
pub fn export_json(
    store: &CaretrackStore,
    query: &AuditQuery,
) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(&query_entries(store, query))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    use caretrack_kernel_contracts::access::CorrelationId;
    use caretrack_kernel_contracts::audit::{AuditDecision, AuditEntryInput};
    use caretrack_kernel_contracts::resource::ResourceKind;
    use caretrack_kernel_contracts::ReasonCodeId;
    use caretrack_storage::verify_entries;

    fn seeded() -> CaretrackStore {
        let mut store = CaretrackStore::new();
        for (n, actor, resource) in [
            (1u64, "nurse_1", "tkt_1"),
            (2, "nurse_1", "tkt_2"),
            (3, "nurse_2", "tkt_1"),
        ] {
            store
                .append_audit_entry(
                    AuditEntryInput::v1(
                        MonotonicTimeNs(100 * n),
                        ActorId::new(actor).unwrap(),
                        Some(ResourceId::new(resource).unwrap()),
                        Some(ResourceKind::Ticket),
                        AuditDecision::Deny,
                        ReasonCodeId(0x4143_0012),
                        CorrelationId(n as u128),
                        BTreeMap::new(),
                        None,
                    )
                    .unwrap(),
                )
                .unwrap();
        }
        store
    }

    #[test]
    fn at_fx_01_filters_are_conjunctive() {
        let store = seeded();
        assert_eq!(query_entries(&store, &AuditQuery::default()).len(), 3);

        let by_actor = AuditQuery {
            actor_id: Some(ActorId::new("nurse_1").unwrap()),
            ..AuditQuery::default()
        };
        assert_eq!(query_entries(&store, &by_actor).len(), 2);

        let narrowed = AuditQuery {
            actor_id: Some(ActorId::new("nurse_1").unwrap()),
            resource_id: Some(ResourceId::new("tkt_1").unwrap()),
            ..AuditQuery::default()
        };
        assert_eq!(query_entries(&store, &narrowed).len(), 1);

        let windowed = AuditQuery {
            from: Some(MonotonicTimeNs(150)),
            to: Some(MonotonicTimeNs(250)),
            ..AuditQuery::default()
        };
        let hits = query_entries(&store, &windowed);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].created_at, MonotonicTimeNs(200));
    }

    #[test]
    fn at_fx_02_export_round_trips_and_stays_verifiable() {
        let store = seeded();
        let json = export_json(&store, &AuditQuery::default()).unwrap();
        let exported: Vec<caretrack_kernel_contracts::audit::AuditEntry> =
            serde_json::from_str(&json).unwrap();
        assert_eq!(exported.len(), 3);
        verify_entries(&exported).unwrap();
    }
}
