// 6.4 pool_collection/trading.rs: single-hop trades between the reserve asset and a
// pool's base asset. quotes are pure; trades apply the curve result to both legs, route
// the retained fee to the staked balance of the fee's asset, and blend the post-trade
// spot rate into the average (once per block).

use super::core::{PoolCollection, PoolLiquidity};
use super::results::TradeResult;
use crate::capability::{authorize, NetworkCapability};
use crate::config::NetworkSettings;
use crate::context::Context;
use crate::curve::{self, TradeAmounts};
use crate::errors::LedgerError;
use crate::events::{EventPayload, TokensTradedEvent};
use crate::fraction::{checked_add, checked_sub};
use crate::funding_pool::FundingPool;
use crate::types::{AccountId, Amount, AssetId, Ppm, TradingStatusReason};

/// Pool a pair trades against, and whether the reserve asset is the one paid in.
#[derive(Debug, Clone, Copy)]
struct Route {
    pool: AssetId,
    reserve_in: bool,
}

impl PoolCollection {
    pub fn trade_output_and_fee_by_source_amount(
        &self,
        settings: &NetworkSettings,
        source: AssetId,
        target: AssetId,
        source_amount: Amount,
    ) -> Result<TradeAmounts, LedgerError> {
        let route = self.route(source, target)?;
        let (source_balance, target_balance, fee) = self.trading_legs(route)?;
        curve::trade_by_source_amount(
            source_balance,
            target_balance,
            fee,
            settings.network_fee_ppm(),
            source_amount,
        )
    }

    pub fn trade_input_and_fee_by_target_amount(
        &self,
        settings: &NetworkSettings,
        source: AssetId,
        target: AssetId,
        target_amount: Amount,
    ) -> Result<TradeAmounts, LedgerError> {
        let route = self.route(source, target)?;
        let (source_balance, target_balance, fee) = self.trading_legs(route)?;
        curve::trade_by_target_amount(
            source_balance,
            target_balance,
            fee,
            settings.network_fee_ppm(),
            target_amount,
        )
    }

    /** 6.4.1: exact input. fails when the output is below `min_return` */
    #[allow(clippy::too_many_arguments)]
    pub fn trade_by_source_amount(
        &mut self,
        cap: &NetworkCapability,
        ctx: &mut Context<'_>,
        funding: &mut FundingPool,
        trader: AccountId,
        source: AssetId,
        target: AssetId,
        source_amount: Amount,
        min_return: Amount,
    ) -> Result<TradeResult, LedgerError> {
        authorize(cap, self.network)?;
        if min_return == 0 {
            return Err(LedgerError::ZeroValue);
        }
        let amounts = self.trade_output_and_fee_by_source_amount(ctx.settings, source, target, source_amount)?;
        if amounts.target_amount < min_return {
            return Err(LedgerError::InsufficientTargetAmount);
        }
        self.execute_trade(ctx, funding, trader, source, target, amounts)
    }

    /** 6.4.2: exact output. fails when the required input exceeds `max_source` */
    #[allow(clippy::too_many_arguments)]
    pub fn trade_by_target_amount(
        &mut self,
        cap: &NetworkCapability,
        ctx: &mut Context<'_>,
        funding: &mut FundingPool,
        trader: AccountId,
        source: AssetId,
        target: AssetId,
        target_amount: Amount,
        max_source: Amount,
    ) -> Result<TradeResult, LedgerError> {
        authorize(cap, self.network)?;
        if max_source == 0 {
            return Err(LedgerError::ZeroValue);
        }
        let amounts = self.trade_input_and_fee_by_target_amount(ctx.settings, source, target, target_amount)?;
        if amounts.source_amount > max_source {
            return Err(LedgerError::InsufficientSourceAmount);
        }
        self.execute_trade(ctx, funding, trader, source, target, amounts)
    }

    fn execute_trade(
        &mut self,
        ctx: &mut Context<'_>,
        funding: &mut FundingPool,
        trader: AccountId,
        source: AssetId,
        target: AssetId,
        amounts: TradeAmounts,
    ) -> Result<TradeResult, LedgerError> {
        let route = self.route(source, target)?;
        let pool = route.pool;
        let prev = self.pool(pool)?.liquidity;

        let leg_decrease = amounts.target_leg_decrease()?;
        let retained_fee = amounts.retained_fee()?;
        let mut next = prev;
        if route.reserve_in {
            next.reserve_trading_liquidity = checked_add(prev.reserve_trading_liquidity, amounts.source_amount)?;
            next.base_trading_liquidity = checked_sub(prev.base_trading_liquidity, leg_decrease)?;
            next.staked_balance = checked_add(prev.staked_balance, retained_fee)?;
        } else {
            next.base_trading_liquidity = checked_add(prev.base_trading_liquidity, amounts.source_amount)?;
            next.reserve_trading_liquidity = checked_sub(prev.reserve_trading_liquidity, leg_decrease)?;
            if next.base_trading_liquidity > next.staked_balance {
                return Err(LedgerError::InsufficientLiquidity);
            }
        }

        let block = ctx.clock.block;
        let weights = ctx.params.ema_weights;
        let data = self.pool_mut(pool)?;
        data.liquidity = next;
        data.average_rate.update(&next.spot_rate(), block, weights)?;

        // reserve fees compound into the funding pool, base fees into this pool
        if !route.reserve_in {
            funding.on_fees_collected(&self.funding_manager, ctx, pool, retained_fee)?;
        }

        ctx.emit(EventPayload::TokensTraded(TokensTradedEvent {
            pool,
            trader,
            source_asset: source,
            target_asset: target,
            source_amount: amounts.source_amount,
            target_amount: amounts.target_amount,
            trading_fee: amounts.trading_fee,
            network_fee: amounts.network_fee,
        }));
        self.emit_trading_liquidity_updated(ctx, pool, &prev, &next);
        if route.reserve_in && retained_fee > 0 {
            self.emit_total_liquidity_updated(ctx, pool)?;
        }

        if next.reserve_trading_liquidity < ctx.settings.min_liquidity_for_trading() {
            self.reset_trading_liquidity(ctx, funding, pool, TradingStatusReason::MinLiquidity)?;
        }

        Ok(TradeResult {
            pool,
            source_asset: source,
            target_asset: target,
            amounts,
            liquidity: self.pool(pool)?.liquidity,
        })
    }

    fn route(&self, source: AssetId, target: AssetId) -> Result<Route, LedgerError> {
        if source == target {
            return Err(LedgerError::InvalidPool);
        }
        if source == self.reserve_asset {
            Ok(Route { pool: target, reserve_in: true })
        } else if target == self.reserve_asset {
            Ok(Route { pool: source, reserve_in: false })
        } else {
            Err(LedgerError::InvalidPool)
        }
    }

    // (source leg, target leg, trading fee) of an enabled pool
    fn trading_legs(&self, route: Route) -> Result<(Amount, Amount, Ppm), LedgerError> {
        let data = self.pool(route.pool)?;
        if !data.trading_enabled {
            return Err(LedgerError::TradingDisabled);
        }
        let PoolLiquidity {
            reserve_trading_liquidity,
            base_trading_liquidity,
            ..
        } = data.liquidity;
        if route.reserve_in {
            Ok((reserve_trading_liquidity, base_trading_liquidity, data.trading_fee))
        } else {
            Ok((base_trading_liquidity, reserve_trading_liquidity, data.trading_fee))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::{AdminCapability, FundingManagerCapability, NetworkId};
    use crate::config::ProtocolParams;
    use crate::custody::{AssetVault, Vault};
    use crate::events::EventLog;
    use crate::token::PoolTokenFactory;
    use crate::types::{Clock, Timestamp};

    const BNT: AssetId = AssetId(0);
    const LINK: AssetId = AssetId(1);
    const ALICE: AccountId = AccountId(1);
    const TRADER: AccountId = AccountId(7);

    struct Fixture {
        settings: NetworkSettings,
        params: ProtocolParams,
        tokens: PoolTokenFactory,
        vault: AssetVault,
        events: EventLog,
        clock: Clock,
        funding: FundingPool,
        collection: PoolCollection,
        cap: NetworkCapability,
    }

    impl Fixture {
        // pool with 100_000 LINK staked, trading at 1 BNT : 2 LINK (2_000 / 4_000)
        fn new(trading_fee: u32, network_fee: u32) -> Self {
            let id = NetworkId::next();
            let admin = AdminCapability::issue(id);
            let mut tokens = PoolTokenFactory::new();
            let funding = FundingPool::new(id, BNT, &mut tokens);
            let mut settings = NetworkSettings::default();
            settings.network_fee_ppm = Ppm::new(network_fee).unwrap();
            settings.add_to_whitelist(LINK);
            settings.set_funding_limit(LINK, 1_000_000);

            let mut f = Self {
                settings,
                params: ProtocolParams::default(),
                tokens,
                vault: AssetVault::new("master"),
                events: EventLog::default(),
                clock: Clock::genesis(Timestamp::from_secs(0)),
                funding,
                collection: PoolCollection::new(id, BNT, FundingManagerCapability::issue(id), 1),
                cap: NetworkCapability::issue(id),
            };
            f.vault.deposit(LINK, 100_000).unwrap();
            f.with(|c, ctx, funding, cap| {
                c.create_pool(cap, ctx, LINK)?;
                c.set_deposit_limit(&admin, ctx, LINK, Amount::MAX)?;
                c.set_trading_fee(&admin, ctx, LINK, trading_fee)?;
                c.deposit_for(cap, ctx, funding, ALICE, LINK, 100_000)?;
                c.enable_trading(&admin, ctx, funding, LINK, 1, 2)
            })
            .unwrap();
            f
        }

        fn with<T>(
            &mut self,
            op: impl FnOnce(&mut PoolCollection, &mut Context<'_>, &mut FundingPool, &NetworkCapability) -> Result<T, LedgerError>,
        ) -> Result<T, LedgerError> {
            let mut ctx = Context {
                clock: self.clock,
                settings: &self.settings,
                params: &self.params,
                tokens: &mut self.tokens,
                master_vault: &mut self.vault,
                events: &mut self.events,
            };
            op(&mut self.collection, &mut ctx, &mut self.funding, &self.cap)
        }

        fn sell(&mut self, source: AssetId, target: AssetId, amount: Amount) -> Result<TradeResult, LedgerError> {
            self.with(|c, ctx, funding, cap| c.trade_by_source_amount(cap, ctx, funding, TRADER, source, target, amount, 1))
        }
    }

    #[test]
    fn reserve_in_trade_moves_both_legs() {
        let mut f = Fixture::new(0, 0);
        let result = f.sell(BNT, LINK, 500).unwrap();

        // 4_000 * 500 / 2_500 = 800
        assert_eq!(result.amounts.target_amount, 800);
        assert_eq!(result.liquidity.reserve_trading_liquidity, 2_500);
        assert_eq!(result.liquidity.base_trading_liquidity, 3_200);
        assert_eq!(result.liquidity.staked_balance, 100_000);
    }

    #[test]
    fn base_fee_compounds_into_staked_balance() {
        // 1% fee, network takes 25% of it
        let mut f = Fixture::new(10_000, 250_000);
        let result = f.sell(BNT, LINK, 500).unwrap();

        assert_eq!(result.amounts.trading_fee, 8);
        assert_eq!(result.amounts.network_fee, 2);
        assert_eq!(result.amounts.target_amount, 792);
        // leg loses payout plus network fee, staked keeps the remaining 6
        assert_eq!(result.liquidity.base_trading_liquidity, 4_000 - 794);
        assert_eq!(result.liquidity.staked_balance, 100_006);
    }

    #[test]
    fn reserve_fee_goes_to_funding_pool() {
        let mut f = Fixture::new(10_000, 0);
        let staked_before = f.funding.staked_balance();
        // 2_000 * 1_000 / 5_000 = 400, fee 4
        let result = f.sell(LINK, BNT, 1_000).unwrap();

        assert_eq!(result.amounts.target_amount, 396);
        assert_eq!(result.liquidity.reserve_trading_liquidity, 1_604);
        assert_eq!(f.funding.staked_balance(), staked_before + 4);
        assert_eq!(f.funding.current_funding(LINK), 2_000);
    }

    #[test]
    fn slippage_limits() {
        let mut f = Fixture::new(0, 0);
        assert_eq!(
            f.with(|c, ctx, funding, cap| c.trade_by_source_amount(cap, ctx, funding, TRADER, BNT, LINK, 500, 801)),
            Err(LedgerError::InsufficientTargetAmount)
        );

        let quote = f
            .collection
            .trade_input_and_fee_by_target_amount(&f.settings, BNT, LINK, 800)
            .unwrap();
        assert_eq!(quote.source_amount, 500);
        assert_eq!(
            f.with(|c, ctx, funding, cap| c.trade_by_target_amount(cap, ctx, funding, TRADER, BNT, LINK, 800, 499)),
            Err(LedgerError::InsufficientSourceAmount)
        );
        let result = f
            .with(|c, ctx, funding, cap| c.trade_by_target_amount(cap, ctx, funding, TRADER, BNT, LINK, 800, 500))
            .unwrap();
        assert_eq!(result.amounts.target_amount, 800);
    }

    #[test]
    fn invalid_pairs_rejected() {
        let mut f = Fixture::new(0, 0);
        assert_eq!(f.sell(LINK, LINK, 1).err(), Some(LedgerError::InvalidPool));
        assert_eq!(f.sell(LINK, AssetId(5), 1).err(), Some(LedgerError::InvalidPool));
        assert_eq!(f.sell(BNT, AssetId(5), 1).err(), Some(LedgerError::DoesNotExist));
    }

    #[test]
    fn ema_moves_once_per_block() {
        let mut f = Fixture::new(0, 0);
        let seeded = f.collection.average_rate(LINK).unwrap();

        // same block as enable_trading: average stays put
        f.sell(BNT, LINK, 100).unwrap();
        assert_eq!(f.collection.average_rate(LINK).unwrap(), seeded);

        f.clock.advance(1, 12);
        f.sell(BNT, LINK, 100).unwrap();
        let after_first = f.collection.average_rate(LINK).unwrap();
        assert_ne!(after_first, seeded);

        f.sell(BNT, LINK, 100).unwrap();
        assert_eq!(f.collection.average_rate(LINK).unwrap(), after_first);
    }

    #[test]
    fn draining_reserve_below_minimum_resets_pool() {
        let mut f = Fixture::new(0, 0);
        // 2_000 * 5_000 / 9_000 = 1_111 leaves 889 reserve, under the 1_000 minimum
        let result = f.sell(LINK, BNT, 5_000).unwrap();

        assert_eq!(result.amounts.target_amount, 1_111);
        assert!(!f.collection.trading_enabled(LINK));
        assert_eq!(result.liquidity.reserve_trading_liquidity, 0);
        assert_eq!(result.liquidity.base_trading_liquidity, 0);
        // the remaining leg is burned and the paid-out reserve written off
        assert_eq!(f.funding.current_funding(LINK), 0);
        assert_eq!(f.funding.staked_balance(), 0);
        assert_eq!(f.vault.balance_of(BNT), 1_111);
        assert_eq!(f.sell(BNT, LINK, 1).err(), Some(LedgerError::TradingDisabled));
    }
}
