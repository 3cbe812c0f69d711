#![forbid(unsafe_code)]

use std::sync::{Arc, Mutex};

use caretrack_kernel_contracts::resource::{
    EscalationId, EscalationRecord, ResourceId, ResourceKind, ResourceRef, TicketRecord,
};
use caretrack_kernel_contracts::MonotonicTimeNs;
use caretrack_storage::CaretrackStore;

use crate::ports::PortUnavailable;

/// Injected data-source strategy. The gate and the list pipeline only ever
/// talk to this trait; which implementation backs it is a startup decision,
/// not a per-call-site environment check.
pub trait TicketDataSource {
    fn locate(
        &self,
        resource_id: &ResourceId,
        kind: ResourceKind,
        now: MonotonicTimeNs,
    ) -> Result<Option<ResourceRef>, PortUnavailable>;

    fn locate_escalation(
        &self,
        escalation_id: &EscalationId,
        now: MonotonicTimeNs,
    ) -> Result<Option<EscalationRecord>, PortUnavailable>;

    fn ticket_rows(&self, now: MonotonicTimeNs) -> Result<Vec<TicketRecord>, PortUnavailable>;
}

impl<T: TicketDataSource + ?Sized> TicketDataSource for Box<T> {
    fn locate(
        &self,
        resource_id: &ResourceId,
        kind: ResourceKind,
        now: MonotonicTimeNs,
    ) -> Result<Option<ResourceRef>, PortUnavailable> {
        (**self).locate(resource_id, kind, now)
    }

    fn locate_escalation(
        &self,
        escalation_id: &EscalationId,
        now: MonotonicTimeNs,
    ) -> Result<Option<EscalationRecord>, PortUnavailable> {
        (**self).locate_escalation(escalation_id, now)
    }

    fn ticket_rows(&self, now: MonotonicTimeNs) -> Result<Vec<TicketRecord>, PortUnavailable> {
        (**self).ticket_rows(now)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataSourceMode {
    DirectBackend,
    Hosted,
}

/// Direct-backend path: reads hit the store on every call.
#[derive(Debug, Clone)]
pub struct DirectBackendSource {
    store: Arc<Mutex<CaretrackStore>>,
}

impl DirectBackendSource {
    pub fn new(store: Arc<Mutex<CaretrackStore>>) -> Self {
        Self { store }
    }
}

impl TicketDataSource for DirectBackendSource {
    fn locate(
        &self,
        resource_id: &ResourceId,
        kind: ResourceKind,
        _now: MonotonicTimeNs,
    ) -> Result<Option<ResourceRef>, PortUnavailable> {
        let store = self.store.lock().map_err(|_| PortUnavailable {
            port: "direct_backend",
        })?;
        Ok(store
            .resource_ref(resource_id)
            .filter(|resource| resource.kind == kind))
    }

    fn locate_escalation(
        &self,
        escalation_id: &EscalationId,
        _now: MonotonicTimeNs,
    ) -> Result<Option<EscalationRecord>, PortUnavailable> {
        let store = self.store.lock().map_err(|_| PortUnavailable {
            port: "direct_backend",
        })?;
        Ok(store.get_escalation_row(escalation_id).cloned())
    }

    fn ticket_rows(&self, _now: MonotonicTimeNs) -> Result<Vec<TicketRecord>, PortUnavailable> {
        let store = self.store.lock().map_err(|_| PortUnavailable {
            port: "direct_backend",
        })?;
        Ok(store.ticket_rows().into_iter().cloned().collect())
    }
}

#[derive(Debug, Default)]
struct HostedSnapshot {
    taken_at: MonotonicTimeNs,
    tickets: Vec<TicketRecord>,
    escalations: Vec<EscalationRecord>,
}

/// Hosted-deployment path: reads are served from a snapshot refreshed at a
/// bounded interval, mirroring the hosted API tier that cannot hit the
/// backend per request. Staleness is bounded by `refresh_interval_ns`.
#[derive(Debug)]
pub struct HostedSource {
    store: Arc<Mutex<CaretrackStore>>,
    refresh_interval_ns: u64,
    snapshot: Mutex<HostedSnapshot>,
}

impl HostedSource {
    pub fn new(store: Arc<Mutex<CaretrackStore>>, refresh_interval_ns: u64) -> Self {
        Self {
            store,
            refresh_interval_ns,
            snapshot: Mutex::new(HostedSnapshot::default()),
        }
    }

    fn with_fresh_snapshot<T>(
        &self,
        now: MonotonicTimeNs,
        f: impl FnOnce(&HostedSnapshot) -> T,
    ) -> Result<T, PortUnavailable> {
        let mut snapshot = self.snapshot.lock().map_err(|_| PortUnavailable {
            port: "hosted_snapshot",
        })?;
        let stale = snapshot.taken_at.0 == 0
            || now.0.saturating_sub(snapshot.taken_at.0) > self.refresh_interval_ns;
        if stale {
            let store = self.store.lock().map_err(|_| PortUnavailable {
                port: "hosted_backend",
            })?;
            snapshot.tickets = store.ticket_rows().into_iter().cloned().collect();
            snapshot.escalations = store.escalation_rows().into_iter().cloned().collect();
            snapshot.taken_at = now;
        }
        Ok(f(&snapshot))
    }
}

impl TicketDataSource for HostedSource {
    fn locate(
        &self,
        resource_id: &ResourceId,
        kind: ResourceKind,
        now: MonotonicTimeNs,
    ) -> Result<Option<ResourceRef>, PortUnavailable> {
        self.with_fresh_snapshot(now, |snapshot| {
            snapshot
                .tickets
                .iter()
                .find(|t| &t.resource_id == resource_id && t.kind == kind)
                .map(TicketRecord::resource_ref)
        })
    }

    fn locate_escalation(
        &self,
        escalation_id: &EscalationId,
        now: MonotonicTimeNs,
    ) -> Result<Option<EscalationRecord>, PortUnavailable> {
        self.with_fresh_snapshot(now, |snapshot| {
            snapshot
                .escalations
                .iter()
                .find(|e| &e.escalation_id == escalation_id)
                .cloned()
        })
    }

    fn ticket_rows(&self, now: MonotonicTimeNs) -> Result<Vec<TicketRecord>, PortUnavailable> {
        self.with_fresh_snapshot(now, |snapshot| snapshot.tickets.clone())
    }
}

/// Startup-time strategy selection. Call sites hold the trait object and
/// never branch on the deployment mode again.
pub fn data_source_for(
    mode: DataSourceMode,
    store: Arc<Mutex<CaretrackStore>>,
    refresh_interval_ns: u64,
) -> Box<dyn TicketDataSource + Send + Sync> {
    match mode {
        DataSourceMode::DirectBackend => Box::new(DirectBackendSource::new(store)),
        DataSourceMode::Hosted => Box::new(HostedSource::new(store, refresh_interval_ns)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use caretrack_kernel_contracts::directory::{UnitId, UnitRecord};

    fn seeded_store() -> Arc<Mutex<CaretrackStore>> {
        let mut store = CaretrackStore::new();
        store
            .insert_unit_row(
                UnitRecord::v1(UnitId::new("cardiology").unwrap(), true, None).unwrap(),
            )
            .unwrap();
        store
            .insert_ticket_row(
                TicketRecord::v1(
                    ResourceId::new("tkt_1").unwrap(),
                    ResourceKind::Ticket,
                    Some(UnitId::new("cardiology").unwrap()),
                    MonotonicTimeNs(1),
                    "broken bed rail".to_string(),
                )
                .unwrap(),
            )
            .unwrap();
        Arc::new(Mutex::new(store))
    }

    #[test]
    fn at_ds_01_both_strategies_locate_the_same_resource() {
        let store = seeded_store();
        let direct = DirectBackendSource::new(store.clone());
        let hosted = HostedSource::new(store, 1_000_000_000);
        let id = ResourceId::new("tkt_1").unwrap();
        let now = MonotonicTimeNs(5);
        assert_eq!(
            direct.locate(&id, ResourceKind::Ticket, now).unwrap(),
            hosted.locate(&id, ResourceKind::Ticket, now).unwrap()
        );
    }

    #[test]
    fn at_ds_02_kind_mismatch_is_not_found() {
        let store = seeded_store();
        let direct = DirectBackendSource::new(store);
        let id = ResourceId::new("tkt_1").unwrap();
        let found = direct
            .locate(&id, ResourceKind::Survey, MonotonicTimeNs(5))
            .unwrap();
        assert!(found.is_none());
    }

    #[test]
    fn at_ds_03_hosted_snapshot_refreshes_after_interval() {
        let store = seeded_store();
        let hosted = HostedSource::new(store.clone(), 100);
        let now = MonotonicTimeNs(10);
        assert_eq!(hosted.ticket_rows(now).unwrap().len(), 1);

        store
            .lock()
            .unwrap()
            .insert_ticket_row(
                TicketRecord::v1(
                    ResourceId::new("tkt_2").unwrap(),
                    ResourceKind::Ticket,
                    Some(UnitId::new("cardiology").unwrap()),
                    MonotonicTimeNs(11),
                    "cold meals on night shift".to_string(),
                )
                .unwrap(),
            )
            .unwrap();

        // Within the interval the stale snapshot is served.
        assert_eq!(hosted.ticket_rows(MonotonicTimeNs(60)).unwrap().len(), 1);
        // Past the interval the snapshot is rebuilt.
        assert_eq!(hosted.ticket_rows(MonotonicTimeNs(200)).unwrap().len(), 2);
    }

    #[test]
    fn at_ds_04_factory_selects_a_usable_strategy_per_mode() {
        let store = seeded_store();
        let id = ResourceId::new("tkt_1").unwrap();
        for mode in [DataSourceMode::DirectBackend, DataSourceMode::Hosted] {
            let source = data_source_for(mode, store.clone(), 1_000);
            let found = source
                .locate(&id, ResourceKind::Ticket, MonotonicTimeNs(5))
                .unwrap();
            assert!(found.is_some());
        }
    }
}
