// 5.2 funding_pool.rs: the reserve-asset side of the ledger.
// 5.2.1 lends reserve liquidity into pools (request/renounce) under per-pool funding limits.
// 5.2.2 reserve-asset providers deposit and withdraw here, against reserve pool-shares
//       plus a governance token minted 1:1 with the shares they hold.
// 5.2.3 reserve-denominated trading fees compound into the staked balance.
// 5.2.4 a pool reset writes off the pool's whole funding; only the protocol's own shares are burned.
//
// reserve pool-shares minted for lent funding are held by AccountId::FUNDING_POOL.

use crate::capability::{authorize, FundingManagerCapability, NetworkCapability, NetworkId};
use crate::config::NetworkSettings;
use crate::context::Context;
use crate::custody::Vault;
use crate::errors::LedgerError;
use crate::events::{EventPayload, FeesCollectedEvent, FundingEvent, TokensDepositedEvent, TokensWithdrawnEvent};
use crate::fraction::{checked_add, checked_sub, mul_div_ceil, mul_div_floor};
use crate::pool_collection::WithdrawalAmounts;
use crate::token::{PoolTokenFactory, ShareToken};
use crate::types::{AccountId, Amount, AssetId, PoolTokenId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FundingPool {
    network: NetworkId,
    reserve_asset: AssetId,
    pool_token: PoolTokenId,
    governance_token: ShareToken,
    staked_balance: Amount,
    current_funding: BTreeMap<AssetId, Amount>,
}

impl FundingPool {
    pub fn new(network: NetworkId, reserve_asset: AssetId, tokens: &mut PoolTokenFactory) -> Self {
        Self {
            network,
            reserve_asset,
            pool_token: tokens.create_token(reserve_asset),
            governance_token: ShareToken::new("gov"),
            staked_balance: 0,
            current_funding: BTreeMap::new(),
        }
    }

    pub fn reserve_asset(&self) -> AssetId {
        self.reserve_asset
    }

    pub fn pool_token(&self) -> PoolTokenId {
        self.pool_token
    }

    pub fn governance_token(&self) -> &ShareToken {
        &self.governance_token
    }

    pub fn staked_balance(&self) -> Amount {
        self.staked_balance
    }

    /// Reserve units currently lent into `pool`.
    pub fn current_funding(&self, pool: AssetId) -> Amount {
        self.current_funding.get(&pool).copied().unwrap_or(0)
    }

    /// Headroom under the funding limit. Zero when a lowered limit sits below current funding.
    pub fn available_funding(&self, settings: &NetworkSettings, pool: AssetId) -> Amount {
        settings.funding_limit(pool).saturating_sub(self.current_funding(pool))
    }

    pub fn pool_token_to_underlying(&self, tokens: &PoolTokenFactory, amount: Amount) -> Result<Amount, LedgerError> {
        let supply = tokens.total_supply(self.pool_token)?;
        if supply == 0 {
            return Ok(amount);
        }
        Ok(mul_div_floor(amount, self.staked_balance, supply)?)
    }

    pub fn underlying_to_pool_token(&self, tokens: &PoolTokenFactory, amount: Amount) -> Result<Amount, LedgerError> {
        shares_for(amount, tokens.total_supply(self.pool_token)?, self.staked_balance)
    }

    /** 5.2.1: lends `amount` reserve into `pool`. the reserve is minted into the master vault */
    pub fn request_funding(
        &mut self,
        cap: &FundingManagerCapability,
        ctx: &mut Context<'_>,
        pool: AssetId,
        amount: Amount,
    ) -> Result<(), LedgerError> {
        authorize(cap, self.network)?;
        if amount == 0 {
            return Err(LedgerError::ZeroValue);
        }
        if !ctx.settings.is_whitelisted(pool) {
            return Err(LedgerError::NotWhitelisted);
        }

        // strict: also rejects when a lowered limit already sits below current funding
        let new_funding = checked_add(self.current_funding(pool), amount)?;
        if new_funding > ctx.settings.funding_limit(pool) {
            return Err(LedgerError::FundingLimitExceeded);
        }

        let pool_token_amount = self.underlying_to_pool_token(ctx.tokens, amount)?;

        self.current_funding.insert(pool, new_funding);
        self.staked_balance = checked_add(self.staked_balance, amount)?;
        ctx.tokens
            .token_mut(self.pool_token)?
            .mint(AccountId::FUNDING_POOL, pool_token_amount)?;
        ctx.master_vault.deposit(self.reserve_asset, amount)?;

        debug!(%pool, amount, new_funding, "funding requested");
        ctx.emit(EventPayload::FundingRequested(FundingEvent {
            pool,
            amount,
            pool_token_amount,
        }));
        Ok(())
    }

    /// Returns `amount` reserve from `pool` and burns it from the master vault. Funding and
    /// staked balance shrink by the same amount, clamped to the pool's outstanding funding.
    /// The share value of outside providers is unchanged.
    pub fn renounce_funding(
        &mut self,
        cap: &FundingManagerCapability,
        ctx: &mut Context<'_>,
        pool: AssetId,
        amount: Amount,
    ) -> Result<(), LedgerError> {
        authorize(cap, self.network)?;
        if amount == 0 {
            return Err(LedgerError::ZeroValue);
        }
        let reduce_funding = self.current_funding(pool).min(amount);
        self.release(ctx, pool, amount, reduce_funding)
    }

    /// 5.2.4: a pool reset. burns the `amount` of reserve still in the pool's trading leg and
    /// writes off all of the pool's outstanding funding, whatever traders took out of it.
    pub fn clear_funding(
        &mut self,
        cap: &FundingManagerCapability,
        ctx: &mut Context<'_>,
        pool: AssetId,
        amount: Amount,
    ) -> Result<(), LedgerError> {
        authorize(cap, self.network)?;
        let reduce_funding = self.current_funding(pool);
        if amount == 0 && reduce_funding == 0 {
            return Ok(());
        }
        self.release(ctx, pool, amount, reduce_funding)
    }

    // burns `amount` reserve and the protocol shares backing `reduce_funding`
    fn release(
        &mut self,
        ctx: &mut Context<'_>,
        pool: AssetId,
        amount: Amount,
        reduce_funding: Amount,
    ) -> Result<(), LedgerError> {
        let current = self.current_funding(pool);
        let reduce_staked = self.staked_balance.min(reduce_funding);

        let supply = ctx.tokens.total_supply(self.pool_token)?;
        let protocol_shares = ctx.tokens.balance_of(self.pool_token, AccountId::FUNDING_POOL)?;
        let pool_token_amount = if self.staked_balance == 0 {
            0
        } else {
            mul_div_ceil(reduce_staked, supply, self.staked_balance)?.min(protocol_shares)
        };

        if amount > 0 {
            ctx.master_vault.take(self.reserve_asset, amount)?;
        }
        ctx.tokens
            .token_mut(self.pool_token)?
            .burn(AccountId::FUNDING_POOL, pool_token_amount)?;
        self.current_funding.insert(pool, current - reduce_funding);
        self.staked_balance -= reduce_staked;

        debug!(%pool, amount, released = reduce_funding, remaining = current - reduce_funding, "funding renounced");
        ctx.emit(EventPayload::FundingRenounced(FundingEvent {
            pool,
            amount,
            pool_token_amount,
        }));
        Ok(())
    }

    /** 5.2.3: reserve trading fees retained by `pool` */
    pub fn on_fees_collected(
        &mut self,
        cap: &FundingManagerCapability,
        ctx: &mut Context<'_>,
        pool: AssetId,
        amount: Amount,
    ) -> Result<(), LedgerError> {
        authorize(cap, self.network)?;
        if amount == 0 {
            return Ok(());
        }
        self.staked_balance = checked_add(self.staked_balance, amount)?;
        ctx.emit(EventPayload::FeesCollected(FeesCollectedEvent { pool, amount }));
        Ok(())
    }

    /// 5.2.2: reserve deposit. The deposited reserve is burned by the caller; shares and
    /// governance tokens are minted to `provider`. A migrating provider is only granted the
    /// governance tokens exceeding `original_governance_amount`.
    pub fn deposit_for(
        &mut self,
        cap: &NetworkCapability,
        ctx: &mut Context<'_>,
        provider: AccountId,
        amount: Amount,
        is_migrating: bool,
        original_governance_amount: Amount,
    ) -> Result<Amount, LedgerError> {
        authorize(cap, self.network)?;
        if amount == 0 {
            return Err(LedgerError::ZeroValue);
        }
        if provider.is_protocol() {
            return Err(LedgerError::InvalidAddress);
        }

        let pool_token_amount = self.underlying_to_pool_token(ctx.tokens, amount)?;
        if pool_token_amount == 0 {
            return Err(LedgerError::ZeroValue);
        }
        let governance_amount = if is_migrating {
            pool_token_amount.saturating_sub(original_governance_amount)
        } else {
            pool_token_amount
        };

        self.staked_balance = checked_add(self.staked_balance, amount)?;
        ctx.tokens.token_mut(self.pool_token)?.mint(provider, pool_token_amount)?;
        if governance_amount > 0 {
            self.governance_token.mint(provider, governance_amount)?;
        }

        ctx.emit(EventPayload::TokensDeposited(TokensDepositedEvent {
            pool: self.reserve_asset,
            provider,
            amount,
            pool_token_amount,
        }));
        Ok(pool_token_amount)
    }

    /// Redeems reserve pool-shares already released to `AccountId::NETWORK`. The provider's
    /// governance tokens are burned 1:1. The fee stays in the staked balance; the caller mints
    /// the net amount to the provider.
    pub fn withdraw(
        &mut self,
        cap: &NetworkCapability,
        ctx: &mut Context<'_>,
        provider: AccountId,
        pool_token_amount: Amount,
    ) -> Result<WithdrawalAmounts, LedgerError> {
        authorize(cap, self.network)?;
        if pool_token_amount == 0 {
            return Err(LedgerError::ZeroValue);
        }

        let underlying_amount = self.pool_token_to_underlying(ctx.tokens, pool_token_amount)?;
        let withdrawal_fee = ctx.settings.withdrawal_fee_ppm().apply(underlying_amount)?;
        let base_amount = checked_sub(underlying_amount, withdrawal_fee)?;

        if self.governance_token.balance_of(provider) < pool_token_amount {
            return Err(LedgerError::InsufficientBalance);
        }
        ctx.tokens
            .token_mut(self.pool_token)?
            .burn(AccountId::NETWORK, pool_token_amount)?;
        self.governance_token.burn(provider, pool_token_amount)?;
        self.staked_balance = checked_sub(self.staked_balance, base_amount)?;

        ctx.emit(EventPayload::TokensWithdrawn(TokensWithdrawnEvent {
            pool: self.reserve_asset,
            provider,
            amount: base_amount,
            pool_token_amount,
            withdrawal_fee,
            protection_amount: 0,
        }));

        Ok(WithdrawalAmounts {
            pool_token_amount,
            underlying_amount,
            withdrawal_fee,
            base_amount,
            from_master_vault: 0,
            from_protection_vault: 0,
        })
    }
}

/// Shares worth `amount` given the current supply and staked balance, rounded down.
/// The first deposit into an empty pool sets a 1:1 baseline.
pub(crate) fn shares_for(amount: Amount, supply: Amount, staked_balance: Amount) -> Result<Amount, LedgerError> {
    if supply == 0 || staked_balance == 0 {
        return Ok(amount);
    }
    Ok(mul_div_floor(amount, supply, staked_balance)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProtocolParams;
    use crate::custody::AssetVault;
    use crate::events::EventLog;
    use crate::types::{Clock, Ppm, Timestamp};

    const BNT: AssetId = AssetId(0);
    const LINK: AssetId = AssetId(1);

    struct Fixture {
        settings: NetworkSettings,
        params: ProtocolParams,
        tokens: PoolTokenFactory,
        vault: AssetVault,
        events: EventLog,
        pool: FundingPool,
        manager: FundingManagerCapability,
        network: NetworkCapability,
    }

    impl Fixture {
        fn new() -> Self {
            let id = NetworkId::next();
            let mut tokens = PoolTokenFactory::new();
            let pool = FundingPool::new(id, BNT, &mut tokens);
            let mut settings = NetworkSettings::default();
            settings.add_to_whitelist(LINK);
            settings.set_funding_limit(LINK, 10_000_000);
            Self {
                settings,
                params: ProtocolParams::default(),
                tokens,
                vault: AssetVault::new("master"),
                events: EventLog::default(),
                pool,
                manager: FundingManagerCapability::issue(id),
                network: NetworkCapability::issue(id),
            }
        }

        fn ctx(&mut self) -> (Context<'_>, &mut FundingPool) {
            (
                Context {
                    clock: Clock::genesis(Timestamp::from_secs(0)),
                    settings: &self.settings,
                    params: &self.params,
                    tokens: &mut self.tokens,
                    master_vault: &mut self.vault,
                    events: &mut self.events,
                },
                &mut self.pool,
            )
        }

        fn request(&mut self, amount: Amount) -> Result<(), LedgerError> {
            let manager = self.manager.clone();
            let (mut ctx, pool) = self.ctx();
            pool.request_funding(&manager, &mut ctx, LINK, amount)
        }

        fn renounce(&mut self, amount: Amount) -> Result<(), LedgerError> {
            let manager = self.manager.clone();
            let (mut ctx, pool) = self.ctx();
            pool.renounce_funding(&manager, &mut ctx, LINK, amount)
        }
    }

    #[test]
    fn funding_limit_sequence() {
        let mut f = Fixture::new();

        f.request(1).unwrap();
        f.request(10_000).unwrap();
        f.request(9_989_999).unwrap();
        assert_eq!(f.pool.current_funding(LINK), 9_990_000);

        assert_eq!(f.request(10_001), Err(LedgerError::FundingLimitExceeded));
        f.request(10_000).unwrap();
        assert_eq!(f.pool.current_funding(LINK), 10_000_000);
        assert_eq!(f.request(1), Err(LedgerError::FundingLimitExceeded));

        assert_eq!(f.pool.staked_balance(), 10_000_000);
        assert_eq!(f.vault.balance_of(BNT), 10_000_000);
        assert_eq!(
            f.tokens.balance_of(f.pool.pool_token(), AccountId::FUNDING_POOL).unwrap(),
            10_000_000
        );
    }

    #[test]
    fn request_for_unlisted_pool_rejected() {
        let mut f = Fixture::new();
        let manager = f.manager.clone();
        let (mut ctx, pool) = f.ctx();
        assert_eq!(
            pool.request_funding(&manager, &mut ctx, AssetId(9), 1),
            Err(LedgerError::NotWhitelisted)
        );
    }

    #[test]
    fn foreign_capability_rejected() {
        let mut f = Fixture::new();
        let foreign = FundingManagerCapability::issue(NetworkId::next());
        let (mut ctx, pool) = f.ctx();
        assert_eq!(
            pool.request_funding(&foreign, &mut ctx, LINK, 1),
            Err(LedgerError::AccessDenied)
        );
    }

    #[test]
    fn lowered_limit_blocks_requests_but_saturates_available() {
        let mut f = Fixture::new();
        f.request(5_000_000).unwrap();
        f.settings.set_funding_limit(LINK, 1_000_000);

        {
            let (ctx, pool) = f.ctx();
            assert_eq!(pool.available_funding(ctx.settings, LINK), 0);
        }
        assert_eq!(f.request(1), Err(LedgerError::FundingLimitExceeded));

        // renouncing is still allowed while over the limit
        f.renounce(4_500_000).unwrap();
        assert_eq!(f.pool.current_funding(LINK), 500_000);
        let (ctx, pool) = f.ctx();
        assert_eq!(pool.available_funding(ctx.settings, LINK), 500_000);
    }

    #[test]
    fn renounce_clamps_at_zero() {
        let mut f = Fixture::new();
        f.request(1_000).unwrap();

        f.renounce(600).unwrap();
        assert_eq!(f.pool.current_funding(LINK), 400);
        assert_eq!(f.pool.staked_balance(), 400);

        // more than outstanding: funding caps at zero
        f.vault.deposit(BNT, 100).unwrap();
        f.renounce(500).unwrap();
        assert_eq!(f.pool.current_funding(LINK), 0);
        assert_eq!(f.pool.staked_balance(), 0);
        assert_eq!(f.tokens.total_supply(f.pool.pool_token()).unwrap(), 0);
    }

    #[test]
    fn renounce_beyond_funding_keeps_provider_value() {
        let mut f = Fixture::new();
        let alice = AccountId(1);
        let network = f.network.clone();
        let shares = {
            let (mut ctx, pool) = f.ctx();
            pool.deposit_for(&network, &mut ctx, alice, 1_000, false, 0).unwrap()
        };
        f.request(2_000).unwrap();

        // traders paid 500 more reserve into the leg than was lent
        f.vault.deposit(BNT, 500).unwrap();
        f.renounce(2_500).unwrap();

        assert_eq!(f.pool.current_funding(LINK), 0);
        assert_eq!(f.pool.staked_balance(), 1_000);
        assert_eq!(f.tokens.total_supply(f.pool.pool_token()).unwrap(), 1_000);
        assert_eq!(f.pool.pool_token_to_underlying(&f.tokens, shares).unwrap(), 1_000);
        assert_eq!(f.vault.balance_of(BNT), 0);
    }

    #[test]
    fn clear_funding_writes_off_reserve_paid_out() {
        let mut f = Fixture::new();
        let alice = AccountId(1);
        let network = f.network.clone();
        let shares = {
            let (mut ctx, pool) = f.ctx();
            pool.deposit_for(&network, &mut ctx, alice, 1_000, false, 0).unwrap()
        };
        f.request(2_000).unwrap();

        // traders took 1_111 out of the leg, 889 remain
        f.vault.take(BNT, 1_111).unwrap();
        let manager = f.manager.clone();
        {
            let (mut ctx, pool) = f.ctx();
            pool.clear_funding(&manager, &mut ctx, LINK, 889).unwrap();
        }

        assert_eq!(f.pool.current_funding(LINK), 0);
        assert_eq!(f.pool.staked_balance(), 1_000);
        assert_eq!(f.pool.pool_token_to_underlying(&f.tokens, shares).unwrap(), 1_000);
        assert_eq!(f.vault.balance_of(BNT), 0);

        // nothing left to clear
        let events = f.events.len();
        let (mut ctx, pool) = f.ctx();
        pool.clear_funding(&manager, &mut ctx, LINK, 0).unwrap();
        assert_eq!(ctx.events.len(), events);
    }

    #[test]
    fn fees_raise_share_value_without_counting_as_funding() {
        let mut f = Fixture::new();
        f.request(1_000).unwrap();

        let manager = f.manager.clone();
        {
            let (mut ctx, pool) = f.ctx();
            pool.on_fees_collected(&manager, &mut ctx, LINK, 500).unwrap();
        }

        assert_eq!(f.pool.current_funding(LINK), 1_000);
        assert_eq!(f.pool.staked_balance(), 1_500);
        assert_eq!(f.pool.pool_token_to_underlying(&f.tokens, 100).unwrap(), 150);
    }

    #[test]
    fn reserve_deposit_and_withdraw() {
        let mut f = Fixture::new();
        f.settings.withdrawal_fee_ppm = Ppm::new(50_000).unwrap(); // 5%
        let alice = AccountId(1);
        let network = f.network.clone();

        let shares = {
            let (mut ctx, pool) = f.ctx();
            pool.deposit_for(&network, &mut ctx, alice, 1_000, false, 0).unwrap()
        };
        assert_eq!(shares, 1_000);
        assert_eq!(f.pool.governance_token().balance_of(alice), 1_000);

        // the queue releases shares to the network account before redemption
        let pool_token = f.pool.pool_token();
        f.tokens
            .token_mut(pool_token)
            .unwrap()
            .transfer(alice, AccountId::NETWORK, shares)
            .unwrap();

        let amounts = {
            let (mut ctx, pool) = f.ctx();
            pool.withdraw(&network, &mut ctx, alice, shares).unwrap()
        };
        assert_eq!(amounts.underlying_amount, 1_000);
        assert_eq!(amounts.withdrawal_fee, 50);
        assert_eq!(amounts.base_amount, 950);
        assert_eq!(f.pool.staked_balance(), 50);
        assert_eq!(f.pool.governance_token().balance_of(alice), 0);
    }

    #[test]
    fn migrating_deposit_grants_only_excess_governance() {
        let mut f = Fixture::new();
        let bob = AccountId(2);
        let network = f.network.clone();
        let (mut ctx, pool) = f.ctx();

        let shares = pool.deposit_for(&network, &mut ctx, bob, 1_000, true, 800).unwrap();
        assert_eq!(shares, 1_000);
        assert_eq!(pool.governance_token().balance_of(bob), 200);

        pool.deposit_for(&network, &mut ctx, bob, 100, true, 5_000).unwrap();
        assert_eq!(pool.governance_token().balance_of(bob), 200);
    }
}
