#![forbid(unsafe_code)]

use caretrack_kernel_contracts::access::{CorrelationId, TurnId};
use caretrack_kernel_contracts::directory::ActorId;
use caretrack_kernel_contracts::query::TicketListQuery;
use caretrack_kernel_contracts::resource::TicketRecord;
use caretrack_kernel_contracts::MonotonicTimeNs;

use crate::data_source::TicketDataSource;
use crate::gate::{AccessGate, GateError};
use crate::ports::{ActorDirectory, AuditSink, UnitRegistry};

/// List pipeline: the scope is attached to the query before any row is
/// read, so no handler ever sees rows it would then have to filter itself.
pub fn fetch_scoped_rows<D, U, S, A>(
    gate: &AccessGate<D, U, S, A>,
    actor_id: &ActorId,
    base: TicketListQuery,
    correlation_id: CorrelationId,
    turn_id: TurnId,
    now: MonotonicTimeNs,
) -> Result<Vec<TicketRecord>, GateError>
where
    D: ActorDirectory,
    U: UnitRegistry,
    S: TicketDataSource,
    A: AuditSink,
{
    let scoped = gate.scope_query(actor_id, base, correlation_id, turn_id, now)?;
    let rows = gate.ticket_rows(now)?;
    Ok(rows
        .into_iter()
        .filter(|row| {
            scoped
                .base
                .kind
                .map(|kind| row.kind == kind)
                .unwrap_or(true)
                && scoped.scope.admits(row.unit_id.as_ref())
        })
        .collect())
}
