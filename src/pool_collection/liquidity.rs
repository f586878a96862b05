// 6.3 pool_collection/liquidity.rs: deposits, withdrawals and the trading-liquidity
// controller. trading liquidity follows the staked balance valued at the average rate,
// capped by the funding limit and available funding, and moves by at most the growth
// factor per call. dropping under the minimum resets the pool.

use super::core::PoolCollection;
use super::results::WithdrawalAmounts;
use crate::average_rate::{rate_state, AverageRate, RateState};
use crate::capability::{authorize, AdminCapability, NetworkCapability};
use crate::context::Context;
use crate::custody::Vault;
use crate::errors::LedgerError;
use crate::events::{EventPayload, TokensDepositedEvent, TokensWithdrawnEvent, TradingEnabledEvent};
use crate::fraction::{checked_add, checked_mul, checked_sub, mul_div_floor, Fraction112};
use crate::funding_pool::{shares_for, FundingPool};
use crate::types::{AccountId, Amount, AssetId, TradingStatusReason};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum LiquidityChange {
    Deposit,
    Withdrawal,
}

impl PoolCollection {
    /** 6.3.1: bootstraps trading liquidity at the given reserve/base rate */
    pub fn enable_trading(
        &mut self,
        admin: &AdminCapability,
        ctx: &mut Context<'_>,
        funding: &mut FundingPool,
        pool: AssetId,
        reserve_rate: Amount,
        base_rate: Amount,
    ) -> Result<(), LedgerError> {
        authorize(admin, self.network)?;
        let data = self.pool(pool)?;
        if data.trading_enabled {
            return Err(LedgerError::AlreadyEnabled);
        }
        if reserve_rate == 0 || base_rate == 0 {
            return Err(LedgerError::InvalidRate);
        }

        let prev = data.liquidity;
        let min_liquidity = ctx.settings.min_liquidity_for_trading();
        if prev.staked_balance == 0 || ctx.settings.funding_limit(pool) < min_liquidity {
            return Err(LedgerError::InsufficientLiquidity);
        }

        let rate = Fraction112::from_parts(reserve_rate, base_rate);
        if !rate.is_positive() {
            return Err(LedgerError::InvalidRate);
        }

        let buffered = checked_mul(
            min_liquidity,
            ctx.params.bootstrap_liquidity_buffer_factor as u128,
        )?;
        let mut reserve_liquidity = buffered.min(funding.available_funding(ctx.settings, pool));
        let mut base_liquidity = mul_div_floor(reserve_liquidity, rate.d, rate.n)?;
        if base_liquidity > prev.staked_balance {
            base_liquidity = prev.staked_balance;
            reserve_liquidity = mul_div_floor(base_liquidity, rate.n, rate.d)?;
        }
        if reserve_liquidity < min_liquidity || base_liquidity == 0 {
            return Err(LedgerError::InsufficientLiquidity);
        }

        funding.request_funding(&self.funding_manager, ctx, pool, reserve_liquidity)?;

        let block = ctx.clock.block;
        let data = self.pool_mut(pool)?;
        data.liquidity.reserve_trading_liquidity = reserve_liquidity;
        data.liquidity.base_trading_liquidity = base_liquidity;
        data.average_rate = AverageRate::seed(block, rate);
        data.trading_enabled = true;
        let new = data.liquidity;

        info!(%pool, reserve_liquidity, base_liquidity, "trading enabled");
        self.emit_trading_liquidity_updated(ctx, pool, &prev, &new);
        ctx.emit(EventPayload::TradingEnabled(TradingEnabledEvent {
            pool,
            enabled: true,
            reason: TradingStatusReason::Admin,
        }));
        Ok(())
    }

    pub fn disable_trading(
        &mut self,
        admin: &AdminCapability,
        ctx: &mut Context<'_>,
        funding: &mut FundingPool,
        pool: AssetId,
    ) -> Result<(), LedgerError> {
        authorize(admin, self.network)?;
        self.reset_trading_liquidity(ctx, funding, pool, TradingStatusReason::Admin)
    }

    /** 6.3.2: base-asset deposit. the caller moves the tokens into the master vault */
    pub fn deposit_for(
        &mut self,
        cap: &NetworkCapability,
        ctx: &mut Context<'_>,
        funding: &mut FundingPool,
        provider: AccountId,
        pool: AssetId,
        amount: Amount,
    ) -> Result<Amount, LedgerError> {
        authorize(cap, self.network)?;
        if amount == 0 {
            return Err(LedgerError::ZeroValue);
        }
        if provider.is_protocol() {
            return Err(LedgerError::InvalidAddress);
        }

        let data = self.pool(pool)?;
        if !data.depositing_enabled {
            return Err(LedgerError::DepositingDisabled);
        }
        let new_staked = checked_add(data.liquidity.staked_balance, amount)?;
        if new_staked > data.deposit_limit {
            return Err(LedgerError::DepositLimitExceeded);
        }

        let pool_token = data.pool_token;
        let supply = ctx.tokens.total_supply(pool_token)?;
        let pool_token_amount = shares_for(amount, supply, data.liquidity.staked_balance)?;
        if pool_token_amount == 0 {
            return Err(LedgerError::ZeroValue);
        }

        ctx.tokens.token_mut(pool_token)?.mint(provider, pool_token_amount)?;
        self.pool_mut(pool)?.liquidity.staked_balance = new_staked;

        ctx.emit(EventPayload::TokensDeposited(TokensDepositedEvent {
            pool,
            provider,
            amount,
            pool_token_amount,
        }));

        self.update_trading_liquidity(ctx, funding, pool, LiquidityChange::Deposit)?;
        self.emit_total_liquidity_updated(ctx, pool)?;
        Ok(pool_token_amount)
    }

    /// 6.3.3: redeems shares already released to `AccountId::NETWORK`. The withdrawal fee
    /// stays in the staked balance. Refused while the pool rate is unstable.
    pub fn withdraw(
        &mut self,
        cap: &NetworkCapability,
        ctx: &mut Context<'_>,
        funding: &mut FundingPool,
        provider: AccountId,
        pool: AssetId,
        pool_token_amount: Amount,
    ) -> Result<WithdrawalAmounts, LedgerError> {
        authorize(cap, self.network)?;
        if pool_token_amount == 0 {
            return Err(LedgerError::ZeroValue);
        }

        let data = self.pool(pool)?;
        if data.trading_enabled {
            let state = rate_state(
                &data.average_rate,
                &data.liquidity.spot_rate(),
                ctx.clock.block,
                ctx.params.ema_weights,
                ctx.params.rate_max_deviation_ppm,
            )?;
            if state == RateState::Unstable {
                return Err(LedgerError::RateUnstable);
            }
        }

        let pool_token = data.pool_token;
        let staked_balance = data.liquidity.staked_balance;
        let supply = ctx.tokens.total_supply(pool_token)?;
        if pool_token_amount > supply {
            return Err(LedgerError::InsufficientBalance);
        }

        let underlying_amount = mul_div_floor(pool_token_amount, staked_balance, supply)?;
        let withdrawal_fee = ctx.settings.withdrawal_fee_ppm().apply(underlying_amount)?;
        let base_amount = checked_sub(underlying_amount, withdrawal_fee)?;

        let from_master_vault = base_amount.min(ctx.master_vault.balance_of(pool));
        let from_protection_vault = base_amount - from_master_vault;

        ctx.tokens
            .token_mut(pool_token)?
            .burn(AccountId::NETWORK, pool_token_amount)?;
        self.pool_mut(pool)?.liquidity.staked_balance = checked_sub(staked_balance, base_amount)?;

        self.update_trading_liquidity(ctx, funding, pool, LiquidityChange::Withdrawal)?;
        self.enforce_base_liquidity_bound(ctx, funding, pool)?;

        ctx.emit(EventPayload::TokensWithdrawn(TokensWithdrawnEvent {
            pool,
            provider,
            amount: base_amount,
            pool_token_amount,
            withdrawal_fee,
            protection_amount: from_protection_vault,
        }));
        self.emit_total_liquidity_updated(ctx, pool)?;

        Ok(WithdrawalAmounts {
            pool_token_amount,
            underlying_amount,
            withdrawal_fee,
            base_amount,
            from_master_vault,
            from_protection_vault,
        })
    }

    /// 6.3.4: moves reserve trading liquidity toward its target, requesting or renouncing
    /// the difference. Untouched while trading is off or the rate is not stable.
    pub(super) fn update_trading_liquidity(
        &mut self,
        ctx: &mut Context<'_>,
        funding: &mut FundingPool,
        pool: AssetId,
        change: LiquidityChange,
    ) -> Result<(), LedgerError> {
        let data = self.pool(pool)?;
        if !data.trading_enabled {
            return Ok(());
        }

        let prev = data.liquidity;
        let spot = prev.spot_rate();
        let weights = ctx.params.ema_weights;
        let state = rate_state(
            &data.average_rate,
            &spot,
            ctx.clock.block,
            weights,
            ctx.params.rate_max_deviation_ppm,
        )?;
        if state != RateState::Stable {
            return Ok(());
        }
        let rate = data.average_rate.projected(&spot, ctx.clock.block, weights)?;

        let min_liquidity = ctx.settings.min_liquidity_for_trading();
        let growth = ctx.params.liquidity_growth_factor as u128;
        let current = prev.reserve_trading_liquidity;

        let staked_value = mul_div_floor(prev.staked_balance, rate.n, rate.d)?;
        let headroom = checked_add(current, funding.available_funding(ctx.settings, pool))?;
        let mut target = ctx.settings.funding_limit(pool).min(staked_value).min(headroom);

        if target > current {
            target = target.min(current.saturating_mul(growth));
        } else if change == LiquidityChange::Deposit {
            target = target.max(current / growth);
        }

        let mut base_target = mul_div_floor(target, rate.d, rate.n)?;
        if base_target > prev.staked_balance {
            base_target = prev.staked_balance;
            target = mul_div_floor(base_target, rate.n, rate.d)?;
        }

        if target < min_liquidity || base_target == 0 {
            return self.reset_trading_liquidity(ctx, funding, pool, TradingStatusReason::MinLiquidity);
        }

        if target > current {
            funding.request_funding(&self.funding_manager, ctx, pool, target - current)?;
        } else if target < current {
            funding.renounce_funding(&self.funding_manager, ctx, pool, current - target)?;
        }

        let data = self.pool_mut(pool)?;
        data.liquidity.reserve_trading_liquidity = target;
        data.liquidity.base_trading_liquidity = base_target;
        let new = data.liquidity;

        debug!(%pool, prev = current, new = target, ?change, "trading liquidity updated");
        self.emit_trading_liquidity_updated(ctx, pool, &prev, &new);
        Ok(())
    }

    // an unstable-rate update leaves the legs alone; a shrinking stake must still cover them
    fn enforce_base_liquidity_bound(
        &mut self,
        ctx: &mut Context<'_>,
        funding: &mut FundingPool,
        pool: AssetId,
    ) -> Result<(), LedgerError> {
        let liquidity = self.pool(pool)?.liquidity;
        if liquidity.base_trading_liquidity > liquidity.staked_balance {
            return self.reset_trading_liquidity(ctx, funding, pool, TradingStatusReason::MinLiquidity);
        }
        Ok(())
    }

    /// 6.3.5: zeroes both legs, burns the reserve leg and writes off all of the pool's
    /// funding, clears the average rate and switches trading off.
    pub(super) fn reset_trading_liquidity(
        &mut self,
        ctx: &mut Context<'_>,
        funding: &mut FundingPool,
        pool: AssetId,
        reason: TradingStatusReason,
    ) -> Result<(), LedgerError> {
        let (prev, was_enabled) = {
            let data = self.pool_mut(pool)?;
            let prev = data.liquidity;
            let was_enabled = data.trading_enabled;
            data.trading_enabled = false;
            data.average_rate.clear();
            data.liquidity.reserve_trading_liquidity = 0;
            data.liquidity.base_trading_liquidity = 0;
            (prev, was_enabled)
        };

        funding.clear_funding(&self.funding_manager, ctx, pool, prev.reserve_trading_liquidity)?;

        let new = self.pool(pool)?.liquidity;
        self.emit_trading_liquidity_updated(ctx, pool, &prev, &new);

        if was_enabled {
            match reason {
                TradingStatusReason::MinLiquidity => {
                    warn!(%pool, renounced = prev.reserve_trading_liquidity, "trading reset: minimum liquidity")
                }
                _ => info!(%pool, ?reason, "trading disabled"),
            }
            ctx.emit(EventPayload::TradingEnabled(TradingEnabledEvent {
                pool,
                enabled: false,
                reason,
            }));
        }
        Ok(())
    }
}
