// 6.0 pool_collection/core.rs: the collection struct, per-pool records, pool creation,
// admin setters and read-only queries.

use crate::average_rate::AverageRate;
use crate::capability::{authorize, AdminCapability, FundingManagerCapability, NetworkCapability, NetworkId};
use crate::context::Context;
use crate::errors::LedgerError;
use crate::events::{
    DepositLimitUpdatedEvent, DepositingEnabledEvent, EventPayload, PoolCreatedEvent, TotalLiquidityUpdatedEvent,
    TradingEnabledEvent, TradingFeeUpdatedEvent, TradingLiquidityUpdatedEvent,
};
use crate::fraction::{mul_div_floor, Fraction112};
use crate::funding_pool::shares_for;
use crate::token::PoolTokenFactory;
use crate::types::{Amount, AssetId, PoolTokenId, Ppm, TradingStatusReason};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::info;

/// Both trading legs and the staked balance backing the pool's shares.
/// `base_trading_liquidity <= staked_balance` after every successful call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolLiquidity {
    pub reserve_trading_liquidity: Amount,
    pub base_trading_liquidity: Amount,
    pub staked_balance: Amount,
}

impl PoolLiquidity {
    /// Reserve units per base unit, reduced to bounded precision.
    pub fn spot_rate(&self) -> Fraction112 {
        Fraction112::from_parts(self.reserve_trading_liquidity, self.base_trading_liquidity)
    }
}

/** 6.1: one pool per whitelisted non-reserve asset */
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pool {
    pub pool_token: PoolTokenId,
    pub trading_fee: Ppm,
    pub trading_enabled: bool,
    pub depositing_enabled: bool,
    pub average_rate: AverageRate,
    pub deposit_limit: Amount,
    pub liquidity: PoolLiquidity,
}

impl Pool {
    pub fn new(pool_token: PoolTokenId, trading_fee: Ppm) -> Self {
        Self {
            pool_token,
            trading_fee,
            trading_enabled: false,
            depositing_enabled: true,
            average_rate: AverageRate::default(),
            deposit_limit: 0,
            liquidity: PoolLiquidity::default(),
        }
    }
}

/** 6.2: all pools of one collection instance. upgrades move them to a successor */
#[derive(Debug, Clone)]
pub struct PoolCollection {
    pub(super) network: NetworkId,
    pub(super) version: u16,
    pub(super) reserve_asset: AssetId,
    pub(super) funding_manager: FundingManagerCapability,
    pub(super) pools: BTreeMap<AssetId, Pool>,
}

impl PoolCollection {
    pub fn new(
        network: NetworkId,
        reserve_asset: AssetId,
        funding_manager: FundingManagerCapability,
        version: u16,
    ) -> Self {
        Self {
            network,
            version,
            reserve_asset,
            funding_manager,
            pools: BTreeMap::new(),
        }
    }

    /// Rebuilds a collection around existing pool records.
    pub(crate) fn with_pools(
        network: NetworkId,
        reserve_asset: AssetId,
        funding_manager: FundingManagerCapability,
        version: u16,
        pools: BTreeMap<AssetId, Pool>,
    ) -> Self {
        Self {
            network,
            version,
            reserve_asset,
            funding_manager,
            pools,
        }
    }

    pub(crate) fn network(&self) -> NetworkId {
        self.network
    }

    pub fn version(&self) -> u16 {
        self.version
    }

    pub fn reserve_asset(&self) -> AssetId {
        self.reserve_asset
    }

    pub fn create_pool(
        &mut self,
        cap: &NetworkCapability,
        ctx: &mut Context<'_>,
        asset: AssetId,
    ) -> Result<PoolTokenId, LedgerError> {
        authorize(cap, self.network)?;
        if asset == self.reserve_asset {
            return Err(LedgerError::InvalidAddress);
        }
        if !ctx.settings.is_whitelisted(asset) {
            return Err(LedgerError::NotWhitelisted);
        }
        if self.pools.contains_key(&asset) {
            return Err(LedgerError::AlreadyExists);
        }

        let pool_token = ctx.tokens.create_token(asset);
        let trading_fee = ctx.settings.trading_fee_default_ppm();
        self.pools.insert(asset, Pool::new(pool_token, trading_fee));

        info!(pool = %asset, version = self.version, "pool created");
        ctx.emit(EventPayload::PoolCreated(PoolCreatedEvent {
            pool: asset,
            pool_token,
            collection_version: self.version,
        }));
        ctx.emit(EventPayload::TradingFeeUpdated(TradingFeeUpdatedEvent {
            pool: asset,
            prev_fee: Ppm::ZERO,
            new_fee: trading_fee,
        }));
        ctx.emit(EventPayload::TradingEnabled(TradingEnabledEvent {
            pool: asset,
            enabled: false,
            reason: TradingStatusReason::Default,
        }));
        ctx.emit(EventPayload::DepositingEnabled(DepositingEnabledEvent {
            pool: asset,
            enabled: true,
        }));
        Ok(pool_token)
    }

    // Admin setters

    pub fn set_trading_fee(
        &mut self,
        admin: &AdminCapability,
        ctx: &mut Context<'_>,
        pool: AssetId,
        fee_ppm: u32,
    ) -> Result<(), LedgerError> {
        authorize(admin, self.network)?;
        let new_fee = Ppm::new(fee_ppm).ok_or(LedgerError::InvalidFee)?;
        let data = self.pool_mut(pool)?;
        let prev_fee = data.trading_fee;
        if prev_fee == new_fee {
            return Ok(());
        }
        data.trading_fee = new_fee;

        ctx.emit(EventPayload::TradingFeeUpdated(TradingFeeUpdatedEvent {
            pool,
            prev_fee,
            new_fee,
        }));
        Ok(())
    }

    pub fn set_deposit_limit(
        &mut self,
        admin: &AdminCapability,
        ctx: &mut Context<'_>,
        pool: AssetId,
        new_limit: Amount,
    ) -> Result<(), LedgerError> {
        authorize(admin, self.network)?;
        let data = self.pool_mut(pool)?;
        let prev_limit = data.deposit_limit;
        if prev_limit == new_limit {
            return Ok(());
        }
        data.deposit_limit = new_limit;

        ctx.emit(EventPayload::DepositLimitUpdated(DepositLimitUpdatedEvent {
            pool,
            prev_limit,
            new_limit,
        }));
        Ok(())
    }

    pub fn enable_depositing(
        &mut self,
        admin: &AdminCapability,
        ctx: &mut Context<'_>,
        pool: AssetId,
        enabled: bool,
    ) -> Result<(), LedgerError> {
        authorize(admin, self.network)?;
        let data = self.pool_mut(pool)?;
        if data.depositing_enabled == enabled {
            return Ok(());
        }
        data.depositing_enabled = enabled;

        ctx.emit(EventPayload::DepositingEnabled(DepositingEnabledEvent { pool, enabled }));
        Ok(())
    }

    // Queries

    pub fn pool_data(&self, pool: AssetId) -> Option<&Pool> {
        self.pools.get(&pool)
    }

    pub fn pools(&self) -> impl Iterator<Item = (&AssetId, &Pool)> {
        self.pools.iter()
    }

    pub fn pool_count(&self) -> usize {
        self.pools.len()
    }

    pub fn is_pool_valid(&self, pool: AssetId) -> bool {
        self.pools.contains_key(&pool)
    }

    pub fn pool_liquidity(&self, pool: AssetId) -> Result<PoolLiquidity, LedgerError> {
        Ok(self.pool(pool)?.liquidity)
    }

    pub fn trading_fee(&self, pool: AssetId) -> Result<Ppm, LedgerError> {
        Ok(self.pool(pool)?.trading_fee)
    }

    pub fn trading_enabled(&self, pool: AssetId) -> bool {
        self.pools.get(&pool).map(|p| p.trading_enabled).unwrap_or(false)
    }

    pub fn pool_token(&self, pool: AssetId) -> Result<PoolTokenId, LedgerError> {
        Ok(self.pool(pool)?.pool_token)
    }

    pub fn spot_rate(&self, pool: AssetId) -> Result<Fraction112, LedgerError> {
        Ok(self.pool(pool)?.liquidity.spot_rate())
    }

    pub fn average_rate(&self, pool: AssetId) -> Result<AverageRate, LedgerError> {
        Ok(self.pool(pool)?.average_rate)
    }

    pub fn pool_token_to_underlying(
        &self,
        tokens: &PoolTokenFactory,
        pool: AssetId,
        pool_token_amount: Amount,
    ) -> Result<Amount, LedgerError> {
        let data = self.pool(pool)?;
        let supply = tokens.total_supply(data.pool_token)?;
        if supply == 0 {
            return Ok(pool_token_amount);
        }
        Ok(mul_div_floor(pool_token_amount, data.liquidity.staked_balance, supply)?)
    }

    pub fn underlying_to_pool_token(
        &self,
        tokens: &PoolTokenFactory,
        pool: AssetId,
        amount: Amount,
    ) -> Result<Amount, LedgerError> {
        let data = self.pool(pool)?;
        shares_for(amount, tokens.total_supply(data.pool_token)?, data.liquidity.staked_balance)
    }

    pub(super) fn pool(&self, pool: AssetId) -> Result<&Pool, LedgerError> {
        self.pools.get(&pool).ok_or(LedgerError::DoesNotExist)
    }

    pub(super) fn pool_mut(&mut self, pool: AssetId) -> Result<&mut Pool, LedgerError> {
        self.pools.get_mut(&pool).ok_or(LedgerError::DoesNotExist)
    }

    pub(super) fn emit_trading_liquidity_updated(
        &self,
        ctx: &mut Context<'_>,
        pool: AssetId,
        prev: &PoolLiquidity,
        new: &PoolLiquidity,
    ) {
        if prev.reserve_trading_liquidity != new.reserve_trading_liquidity {
            ctx.emit(EventPayload::TradingLiquidityUpdated(TradingLiquidityUpdatedEvent {
                pool,
                asset: self.reserve_asset,
                prev_liquidity: prev.reserve_trading_liquidity,
                new_liquidity: new.reserve_trading_liquidity,
            }));
        }
        if prev.base_trading_liquidity != new.base_trading_liquidity {
            ctx.emit(EventPayload::TradingLiquidityUpdated(TradingLiquidityUpdatedEvent {
                pool,
                asset: pool,
                prev_liquidity: prev.base_trading_liquidity,
                new_liquidity: new.base_trading_liquidity,
            }));
        }
    }

    pub(super) fn emit_total_liquidity_updated(&self, ctx: &mut Context<'_>, pool: AssetId) -> Result<(), LedgerError> {
        let data = self.pool(pool)?;
        let pool_token_supply = ctx.tokens.total_supply(data.pool_token)?;
        ctx.emit(EventPayload::TotalLiquidityUpdated(TotalLiquidityUpdatedEvent {
            pool,
            staked_balance: data.liquidity.staked_balance,
            pool_token_supply,
        }));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{NetworkSettings, ProtocolParams};
    use crate::custody::AssetVault;
    use crate::events::EventLog;
    use crate::types::{Clock, Timestamp};

    const BNT: AssetId = AssetId(0);
    const LINK: AssetId = AssetId(1);

    #[test]
    fn create_pool_defaults_and_errors() {
        let id = NetworkId::next();
        let cap = NetworkCapability::issue(id);
        let admin = AdminCapability::issue(id);
        let mut collection = PoolCollection::new(id, BNT, FundingManagerCapability::issue(id), 1);

        let mut settings = NetworkSettings::default();
        let params = ProtocolParams::default();
        let mut tokens = PoolTokenFactory::new();
        let mut vault = AssetVault::new("master");
        let mut events = EventLog::default();
        let mut ctx = Context {
            clock: Clock::genesis(Timestamp::from_secs(0)),
            settings: &settings,
            params: &params,
            tokens: &mut tokens,
            master_vault: &mut vault,
            events: &mut events,
        };

        assert_eq!(collection.create_pool(&cap, &mut ctx, LINK), Err(LedgerError::NotWhitelisted));
        assert_eq!(collection.create_pool(&cap, &mut ctx, BNT), Err(LedgerError::InvalidAddress));

        settings.add_to_whitelist(LINK);
        let mut ctx = Context {
            clock: Clock::genesis(Timestamp::from_secs(0)),
            settings: &settings,
            params: &params,
            tokens: &mut tokens,
            master_vault: &mut vault,
            events: &mut events,
        };
        collection.create_pool(&cap, &mut ctx, LINK).unwrap();
        assert_eq!(collection.create_pool(&cap, &mut ctx, LINK), Err(LedgerError::AlreadyExists));

        let pool = collection.pool_data(LINK).unwrap();
        assert!(!pool.trading_enabled);
        assert!(pool.depositing_enabled);
        assert_eq!(pool.deposit_limit, 0);
        assert_eq!(pool.trading_fee, settings.trading_fee_default_ppm());

        assert_eq!(
            collection.set_trading_fee(&admin, &mut ctx, LINK, 1_000_001),
            Err(LedgerError::InvalidFee)
        );
        collection.set_trading_fee(&admin, &mut ctx, LINK, 5_000).unwrap();
        assert_eq!(collection.trading_fee(LINK).unwrap().value(), 5_000);
        assert_eq!(
            collection.set_deposit_limit(&admin, &mut ctx, AssetId(9), 1),
            Err(LedgerError::DoesNotExist)
        );
    }

    #[test]
    fn spot_rate_is_reserve_per_base() {
        let liquidity = PoolLiquidity {
            reserve_trading_liquidity: 2_000,
            base_trading_liquidity: 4_000,
            staked_balance: 10_000,
        };
        let rate = liquidity.spot_rate();
        assert_eq!((rate.n, rate.d), (2_000, 4_000));
    }
}
