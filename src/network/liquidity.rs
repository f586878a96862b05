// 13.3 network/liquidity.rs: provider flows. deposits go to the funding pool (reserve asset)
// or the pool collection (base assets); withdrawals run through the cooldown queue and are
// paid out from the master vault, topped up by the protection vault when it falls short.
// ledger state is settled first, assets move last.

use super::core::Network;
use crate::custody::Vault;
use crate::errors::LedgerError;
use crate::pool_collection::WithdrawalAmounts;
use crate::types::{AccountId, Amount, AssetId, PoolTokenId, WithdrawalRequestId};
use tracing::debug;

impl Network {
    /** 13.3.1: deposits `amount` of `pool`'s asset. returns the pool-shares minted */
    pub fn deposit(&mut self, provider: AccountId, pool: AssetId, amount: Amount) -> Result<Amount, LedgerError> {
        let reserve_asset = self.reserve_asset;
        self.transact("deposit", |cap, state| {
            let mut parts = state.parts();
            if pool == reserve_asset {
                let shares = parts
                    .funding_pool
                    .deposit_for(cap, &mut parts.ctx, provider, amount, false, 0)?;
                // deposited reserve leaves circulation
                parts.wallets.debit(provider, reserve_asset, amount)?;
                Ok(shares)
            } else {
                let shares = parts.pool_collection.deposit_for(
                    cap,
                    &mut parts.ctx,
                    parts.funding_pool,
                    provider,
                    pool,
                    amount,
                )?;
                parts.wallets.pay_into(provider, parts.ctx.master_vault, pool, amount)?;
                Ok(shares)
            }
        })
    }

    /// Reserve deposit carried over from a previous deployment. Governance tokens are only
    /// minted past `original_governance_amount`, which the provider already holds.
    pub fn migrate_reserve_liquidity(
        &mut self,
        provider: AccountId,
        amount: Amount,
        original_governance_amount: Amount,
    ) -> Result<Amount, LedgerError> {
        let reserve_asset = self.reserve_asset;
        self.transact("migrate_reserve_liquidity", |cap, state| {
            let mut parts = state.parts();
            let shares = parts.funding_pool.deposit_for(
                cap,
                &mut parts.ctx,
                provider,
                amount,
                true,
                original_governance_amount,
            )?;
            parts.wallets.debit(provider, reserve_asset, amount)?;
            Ok(shares)
        })
    }

    /** 13.3.2: locks `amount` shares of `pool_token` in the cooldown queue */
    pub fn initiate_withdrawal(
        &mut self,
        provider: AccountId,
        pool_token: PoolTokenId,
        amount: Amount,
    ) -> Result<WithdrawalRequestId, LedgerError> {
        let reserve_asset = self.reserve_asset;
        self.transact("initiate_withdrawal", |cap, state| {
            let mut parts = state.parts();
            let underlying = parts
                .ctx
                .tokens
                .get(pool_token)
                .map(|token| token.underlying)
                .ok_or(LedgerError::InvalidPool)?;

            let value = if underlying == reserve_asset {
                parts.funding_pool.pool_token_to_underlying(parts.ctx.tokens, amount)?
            } else {
                if parts.pool_collection.pool_token(underlying)? != pool_token {
                    return Err(LedgerError::InvalidPool);
                }
                parts
                    .pool_collection
                    .pool_token_to_underlying(parts.ctx.tokens, underlying, amount)?
            };

            parts
                .pending_withdrawals
                .initiate(cap, &mut parts.ctx, provider, pool_token, amount, value)
        })
    }

    /// Returns the locked shares. Returns the share amount.
    pub fn cancel_withdrawal(&mut self, provider: AccountId, id: WithdrawalRequestId) -> Result<Amount, LedgerError> {
        self.transact("cancel_withdrawal", |cap, state| {
            let mut parts = state.parts();
            parts.pending_withdrawals.cancel(cap, &mut parts.ctx, provider, id)
        })
    }

    /** 13.3.3: completes a ready request and pays the provider */
    pub fn withdraw(&mut self, provider: AccountId, id: WithdrawalRequestId) -> Result<WithdrawalAmounts, LedgerError> {
        let reserve_asset = self.reserve_asset;
        self.transact("withdraw", |cap, state| {
            let mut parts = state.parts();
            let completed = parts.pending_withdrawals.complete(cap, &mut parts.ctx, provider, id)?;
            let pool = completed.reserve_token;

            if pool == reserve_asset {
                let amounts =
                    parts
                        .funding_pool
                        .withdraw(cap, &mut parts.ctx, provider, completed.pool_token_amount)?;
                // reserve is minted on the way out
                parts.wallets.credit(provider, reserve_asset, amounts.base_amount)?;
                return Ok(amounts);
            }

            let amounts = parts.pool_collection.withdraw(
                cap,
                &mut parts.ctx,
                parts.funding_pool,
                provider,
                pool,
                completed.pool_token_amount,
            )?;
            if parts.protection_vault.balance_of(pool) < amounts.from_protection_vault {
                return Err(LedgerError::InsufficientLiquidity);
            }
            parts
                .ctx
                .master_vault
                .withdraw_funds(pool, amounts.from_master_vault, parts.wallets, provider)?;
            if amounts.from_protection_vault > 0 {
                debug!(%pool, amount = amounts.from_protection_vault, "withdrawal topped up from protection vault");
                parts
                    .protection_vault
                    .withdraw_funds(pool, amounts.from_protection_vault, parts.wallets, provider)?;
            }
            Ok(amounts)
        })
    }
}
