#![forbid(unsafe_code)]

use std::collections::BTreeMap;
use std::sync::Mutex;

use caretrack_kernel_contracts::directory::{ActorId, ActorRecord, UnitId, UnitRecord};
use caretrack_kernel_contracts::MonotonicTimeNs;

use crate::ports::{ActorDirectory, PortUnavailable, UnitRegistry};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DirectoryCacheConfig {
    pub ttl_ns: u64,
}

impl DirectoryCacheConfig {
    pub fn mvp_v1() -> Self {
        Self {
            ttl_ns: 5_000_000_000,
        }
    }
}

#[derive(Debug, Clone)]
struct CacheSlot<T> {
    fetched_at: MonotonicTimeNs,
    value: T,
}

/// Read-through cache in front of the actor directory and unit registry.
/// Entries (including negative lookups) are served until the TTL elapses,
/// which bounds how stale a scoping decision can be after a reassignment.
/// An expired entry is never served on backend failure; the failure
/// propagates so the gate fails closed.
#[derive(Debug)]
pub struct CachedDirectory<D, U> {
    config: DirectoryCacheConfig,
    directory: D,
    registry: U,
    actors: Mutex<BTreeMap<ActorId, CacheSlot<Option<ActorRecord>>>>,
    units: Mutex<BTreeMap<UnitId, CacheSlot<Option<UnitRecord>>>>,
}

impl<D, U> CachedDirectory<D, U> {
    pub fn new(config: DirectoryCacheConfig, directory: D, registry: U) -> Self {
        Self {
            config,
            directory,
            registry,
            actors: Mutex::new(BTreeMap::new()),
            units: Mutex::new(BTreeMap::new()),
        }
    }

    fn fresh(&self, fetched_at: MonotonicTimeNs, now: MonotonicTimeNs) -> bool {
        now.0.saturating_sub(fetched_at.0) <= self.config.ttl_ns
    }
}

impl<D: ActorDirectory, U> ActorDirectory for CachedDirectory<D, U> {
    fn get_actor(
        &self,
        actor_id: &ActorId,
        now: MonotonicTimeNs,
    ) -> Result<Option<ActorRecord>, PortUnavailable> {
        let mut actors = self.actors.lock().map_err(|_| PortUnavailable {
            port: "actor_directory_cache",
        })?;
        if let Some(slot) = actors.get(actor_id) {
            if self.fresh(slot.fetched_at, now) {
                return Ok(slot.value.clone());
            }
        }
        let value = self.directory.get_actor(actor_id, now)?;
        actors.insert(
            actor_id.clone(),
            CacheSlot {
                fetched_at: now,
                value: value.clone(),
            },
        );
        Ok(value)
    }
}

impl<D, U: UnitRegistry> UnitRegistry for CachedDirectory<D, U> {
    fn get_unit(
        &self,
        unit_id: &UnitId,
        now: MonotonicTimeNs,
    ) -> Result<Option<UnitRecord>, PortUnavailable> {
        let mut units = self.units.lock().map_err(|_| PortUnavailable {
            port: "unit_registry_cache",
        })?;
        if let Some(slot) = units.get(unit_id) {
            if self.fresh(slot.fetched_at, now) {
                return Ok(slot.value.clone());
            }
        }
        let value = self.registry.get_unit(unit_id, now)?;
        units.insert(
            unit_id.clone(),
            CacheSlot {
                fetched_at: now,
                value: value.clone(),
            },
        );
        Ok(value)
    }
}
