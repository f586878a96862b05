// 0.2 capability.rs: authorization by capability object. a component accepts a call only
// when the presented capability was issued by the network instance it belongs to.
// capabilities are only minted inside the crate; holders can present them, not forge them.

use crate::errors::LedgerError;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_NETWORK_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NetworkId(u64);

impl NetworkId {
    pub(crate) fn next() -> Self {
        Self(NEXT_NETWORK_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn value(&self) -> u64 {
        self.0
    }
}

pub trait Capability {
    fn network(&self) -> NetworkId;
}

/// Fails with `AccessDenied` unless `cap` belongs to `expected`.
pub fn authorize(cap: &impl Capability, expected: NetworkId) -> Result<(), LedgerError> {
    if cap.network() == expected {
        Ok(())
    } else {
        Err(LedgerError::AccessDenied)
    }
}

/// Pool parameters, whitelist, funding limits, trading switches.
#[derive(Debug, Clone)]
pub struct AdminCapability {
    network: NetworkId,
}

/// Held by a pool collection; lets it request and renounce reserve funding.
#[derive(Debug, Clone)]
pub struct FundingManagerCapability {
    network: NetworkId,
}

/// Held by the orchestrator; gates every user-facing ledger operation.
#[derive(Debug, Clone)]
pub struct NetworkCapability {
    network: NetworkId,
}

impl AdminCapability {
    pub(crate) fn issue(network: NetworkId) -> Self {
        Self { network }
    }
}

impl FundingManagerCapability {
    pub(crate) fn issue(network: NetworkId) -> Self {
        Self { network }
    }
}

impl NetworkCapability {
    pub(crate) fn issue(network: NetworkId) -> Self {
        Self { network }
    }
}

impl Capability for AdminCapability {
    fn network(&self) -> NetworkId {
        self.network
    }
}

impl Capability for FundingManagerCapability {
    fn network(&self) -> NetworkId {
        self.network
    }
}

impl Capability for NetworkCapability {
    fn network(&self) -> NetworkId {
        self.network
    }
}
