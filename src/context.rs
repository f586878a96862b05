// 9.0 context.rs: what one atomic ledger call runs against. the clock reading, the
// settings snapshot, and the shared mutable collaborators (token factory, master vault,
// event log). built by the orchestrator, borrowed by the components for a single call.

use crate::config::{NetworkSettings, ProtocolParams};
use crate::custody::AssetVault;
use crate::events::{EventId, EventLog, EventPayload};
use crate::token::PoolTokenFactory;
use crate::types::Clock;

pub struct Context<'a> {
    pub clock: Clock,
    pub settings: &'a NetworkSettings,
    pub params: &'a ProtocolParams,
    pub tokens: &'a mut PoolTokenFactory,
    pub master_vault: &'a mut AssetVault,
    pub events: &'a mut EventLog,
}

impl<'a> Context<'a> {
    pub fn emit(&mut self, payload: EventPayload) -> EventId {
        self.events.record(self.clock, payload)
    }
}
