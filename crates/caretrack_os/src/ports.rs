#![forbid(unsafe_code)]

use std::sync::{Arc, Mutex};

use caretrack_kernel_contracts::audit::AuditEntryInput;
use caretrack_kernel_contracts::directory::{ActorId, ActorRecord, UnitId, UnitRecord};
use caretrack_kernel_contracts::MonotonicTimeNs;
use caretrack_storage::CaretrackStore;

/// A lookup backend (actor directory or unit registry) failed to answer.
/// The gate treats this as an infrastructure fault and fails closed; it is
/// never conflated with an authorization denial.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PortUnavailable {
    pub port: &'static str,
}

pub trait ActorDirectory {
    fn get_actor(
        &self,
        actor_id: &ActorId,
        now: MonotonicTimeNs,
    ) -> Result<Option<ActorRecord>, PortUnavailable>;
}

pub trait UnitRegistry {
    fn get_unit(
        &self,
        unit_id: &UnitId,
        now: MonotonicTimeNs,
    ) -> Result<Option<UnitRecord>, PortUnavailable>;
}

/// Fire-and-forget audit emission. Implementations must never block the
/// caller and must never surface a failure; they count failures internally.
pub trait AuditSink {
    fn record(&self, input: AuditEntryInput);
}

impl<T: AuditSink + ?Sized> AuditSink for &T {
    fn record(&self, input: AuditEntryInput) {
        (**self).record(input)
    }
}

/// Directory/registry adapter over the shared store.
#[derive(Debug, Clone)]
pub struct StoreDirectory {
    store: Arc<Mutex<CaretrackStore>>,
}

impl StoreDirectory {
    pub fn new(store: Arc<Mutex<CaretrackStore>>) -> Self {
        Self { store }
    }
}

impl ActorDirectory for StoreDirectory {
    fn get_actor(
        &self,
        actor_id: &ActorId,
        _now: MonotonicTimeNs,
    ) -> Result<Option<ActorRecord>, PortUnavailable> {
        let store = self.store.lock().map_err(|_| PortUnavailable {
            port: "actor_directory",
        })?;
        Ok(store.get_actor_row(actor_id).cloned())
    }
}

impl UnitRegistry for StoreDirectory {
    fn get_unit(
        &self,
        unit_id: &UnitId,
        _now: MonotonicTimeNs,
    ) -> Result<Option<UnitRecord>, PortUnavailable> {
        let store = self.store.lock().map_err(|_| PortUnavailable {
            port: "unit_registry",
        })?;
        Ok(store.get_unit_row(unit_id).cloned())
    }
}
