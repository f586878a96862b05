// 13.1 network/core.rs: ledger state, construction, atomic calls, queries.

use crate::capability::{AdminCapability, FundingManagerCapability, NetworkCapability, NetworkId};
use crate::config::{LedgerConfig, NetworkSettings, ProtocolParams};
use crate::context::Context;
use crate::custody::{AssetVault, Vault, Wallets};
use crate::errors::LedgerError;
use crate::events::{EventId, EventLog, EventPayload};
use crate::funding_pool::FundingPool;
use crate::pending_withdrawals::{PendingWithdrawals, WithdrawalRequest, WithdrawalStatus};
use crate::pool_collection::PoolCollection;
use crate::token::PoolTokenFactory;
use crate::types::{AccountId, Amount, AssetId, Clock, PoolTokenId, Timestamp, WithdrawalRequestId};
use tracing::{info, warn};

/** 13.1: everything a call may touch. cloned before the call (event log aside), restored if it fails */
#[derive(Debug, Clone)]
pub(crate) struct LedgerState {
    pub(super) clock: Clock,
    pub(super) settings: NetworkSettings,
    pub(super) params: ProtocolParams,
    pub(super) tokens: PoolTokenFactory,
    pub(super) master_vault: AssetVault,
    pub(super) protection_vault: AssetVault,
    pub(super) network_fee_vault: AssetVault,
    pub(super) wallets: Wallets,
    pub(super) events: EventLog,
    pub(super) funding_pool: FundingPool,
    pub(super) pool_collection: PoolCollection,
    pub(super) pending_withdrawals: PendingWithdrawals,
}

/// Disjoint borrows of the state for one call.
pub(super) struct Parts<'a> {
    pub ctx: Context<'a>,
    pub funding_pool: &'a mut FundingPool,
    pub pool_collection: &'a mut PoolCollection,
    pub pending_withdrawals: &'a mut PendingWithdrawals,
    pub protection_vault: &'a mut AssetVault,
    pub network_fee_vault: &'a mut AssetVault,
    pub wallets: &'a mut Wallets,
}

impl LedgerState {
    pub(super) fn parts(&mut self) -> Parts<'_> {
        let LedgerState {
            clock,
            settings,
            params,
            tokens,
            master_vault,
            protection_vault,
            network_fee_vault,
            wallets,
            events,
            funding_pool,
            pool_collection,
            pending_withdrawals,
        } = self;
        Parts {
            ctx: Context {
                clock: *clock,
                settings,
                params,
                tokens,
                master_vault,
                events,
            },
            funding_pool,
            pool_collection,
            pending_withdrawals,
            protection_vault,
            network_fee_vault,
            wallets,
        }
    }

    pub(super) fn record(&mut self, payload: EventPayload) -> EventId {
        self.events.record(self.clock, payload)
    }
}

/** 13.0: one deployed ledger. owns every component and all custody */
#[derive(Debug)]
pub struct Network {
    pub(super) id: NetworkId,
    pub(super) reserve_asset: AssetId,
    pub(super) capability: NetworkCapability,
    pub(super) state: LedgerState,
}

impl Network {
    /// Validates `config` and deploys an empty ledger. The returned capability is the only
    /// admin handle for this instance.
    pub fn new(config: LedgerConfig, genesis: Timestamp) -> Result<(Self, AdminCapability), LedgerError> {
        config.validate()?;
        let LedgerConfig {
            reserve_asset,
            settings,
            params,
        } = config;

        let id = NetworkId::next();
        let mut tokens = PoolTokenFactory::new();
        let funding_pool = FundingPool::new(id, reserve_asset, &mut tokens);
        let pool_collection = PoolCollection::new(id, reserve_asset, FundingManagerCapability::issue(id), 1);
        let pending_withdrawals = PendingWithdrawals::new(id, params.lock_duration_secs);
        let events = EventLog::new(params.max_events);

        let state = LedgerState {
            clock: Clock::genesis(genesis),
            settings,
            params,
            tokens,
            master_vault: AssetVault::new("master"),
            protection_vault: AssetVault::new("protection"),
            network_fee_vault: AssetVault::new("network-fee"),
            wallets: Wallets::new(),
            events,
            funding_pool,
            pool_collection,
            pending_withdrawals,
        };

        info!(network = id.value(), %reserve_asset, "network deployed");
        let network = Self {
            id,
            reserve_asset,
            capability: NetworkCapability::issue(id),
            state,
        };
        Ok((network, AdminCapability::issue(id)))
    }

    /// Runs `op` against the live state. Any error restores the state as it was before
    /// the call, events included. The event log is not cloned; it is truncated back to
    /// its mark instead.
    pub(super) fn transact<T>(
        &mut self,
        name: &'static str,
        op: impl FnOnce(&NetworkCapability, &mut LedgerState) -> Result<T, LedgerError>,
    ) -> Result<T, LedgerError> {
        let events = std::mem::take(&mut self.state.events);
        let checkpoint = self.state.clone();
        self.state.events = events;
        let mark = self.state.events.begin();

        let result = op(&self.capability, &mut self.state);
        match &result {
            Ok(_) => self.state.events.commit(),
            Err(err) => {
                warn!(call = name, error = %err, "call rolled back");
                let mut events = std::mem::take(&mut self.state.events);
                events.rollback(mark);
                self.state = checkpoint;
                self.state.events = events;
            }
        }
        result
    }

    pub fn advance(&mut self, blocks: u64, secs: i64) {
        self.state.clock.advance(blocks, secs);
    }

    pub fn id(&self) -> NetworkId {
        self.id
    }

    pub fn reserve_asset(&self) -> AssetId {
        self.reserve_asset
    }

    pub fn clock(&self) -> Clock {
        self.state.clock
    }

    pub fn settings(&self) -> &NetworkSettings {
        &self.state.settings
    }

    pub fn params(&self) -> &ProtocolParams {
        &self.state.params
    }

    pub fn tokens(&self) -> &PoolTokenFactory {
        &self.state.tokens
    }

    pub fn events(&self) -> &EventLog {
        &self.state.events
    }

    pub fn funding_pool(&self) -> &FundingPool {
        &self.state.funding_pool
    }

    pub fn pool_collection(&self) -> &PoolCollection {
        &self.state.pool_collection
    }

    pub fn pending_withdrawals(&self) -> &PendingWithdrawals {
        &self.state.pending_withdrawals
    }

    pub fn wallet_balance(&self, account: AccountId, asset: AssetId) -> Amount {
        self.state.wallets.balance_of(account, asset)
    }

    pub fn master_vault_balance(&self, asset: AssetId) -> Amount {
        self.state.master_vault.balance_of(asset)
    }

    pub fn protection_vault_balance(&self, asset: AssetId) -> Amount {
        self.state.protection_vault.balance_of(asset)
    }

    pub fn network_fee_vault_balance(&self, asset: AssetId) -> Amount {
        self.state.network_fee_vault.balance_of(asset)
    }

    /// Pool-share token of `asset`: the reserve pool token for the reserve asset.
    pub fn pool_token_of(&self, asset: AssetId) -> Result<PoolTokenId, LedgerError> {
        if asset == self.reserve_asset {
            Ok(self.state.funding_pool.pool_token())
        } else {
            self.state.pool_collection.pool_token(asset)
        }
    }

    pub fn pool_token_balance(&self, asset: AssetId, holder: AccountId) -> Result<Amount, LedgerError> {
        self.state.tokens.balance_of(self.pool_token_of(asset)?, holder)
    }

    pub fn pool_token_to_underlying(&self, asset: AssetId, amount: Amount) -> Result<Amount, LedgerError> {
        let tokens = &self.state.tokens;
        if asset == self.reserve_asset {
            self.state.funding_pool.pool_token_to_underlying(tokens, amount)
        } else {
            self.state.pool_collection.pool_token_to_underlying(tokens, asset, amount)
        }
    }

    pub fn underlying_to_pool_token(&self, asset: AssetId, amount: Amount) -> Result<Amount, LedgerError> {
        let tokens = &self.state.tokens;
        if asset == self.reserve_asset {
            self.state.funding_pool.underlying_to_pool_token(tokens, amount)
        } else {
            self.state.pool_collection.underlying_to_pool_token(tokens, asset, amount)
        }
    }

    pub fn funding_limit(&self, pool: AssetId) -> Amount {
        self.state.settings.funding_limit(pool)
    }

    pub fn current_funding(&self, pool: AssetId) -> Amount {
        self.state.funding_pool.current_funding(pool)
    }

    pub fn available_funding(&self, pool: AssetId) -> Amount {
        self.state.funding_pool.available_funding(&self.state.settings, pool)
    }

    pub fn withdrawal_request(&self, id: WithdrawalRequestId) -> Option<&WithdrawalRequest> {
        self.state.pending_withdrawals.request(id)
    }

    pub fn withdrawal_requests(&self, provider: AccountId) -> Vec<WithdrawalRequestId> {
        self.state.pending_withdrawals.withdrawal_requests(provider)
    }

    pub fn withdrawal_status(&self, id: WithdrawalRequestId) -> Option<WithdrawalStatus> {
        self.state.pending_withdrawals.status(id, self.state.clock.timestamp)
    }
}
