// 13.2 network/admin.rs: admin surface. network settings, pool creation and parameters,
// trading switches, cooldown length, collection upgrades, vault housekeeping.

use super::core::Network;
use crate::capability::{authorize, AdminCapability, FundingManagerCapability};
use crate::custody::{Vault, move_between};
use crate::errors::LedgerError;
use crate::events::{EventPayload, FundingLimitUpdatedEvent, Setting, SettingUpdatedEvent, TokenWhitelistedEvent};
use crate::migration;
use crate::types::{AccountId, Amount, AssetId, PoolTokenId, Ppm};
use tracing::info;

impl Network {
    // Network settings

    pub fn add_token_to_whitelist(&mut self, admin: &AdminCapability, asset: AssetId) -> Result<(), LedgerError> {
        authorize(admin, self.id)?;
        let reserve_asset = self.reserve_asset;
        self.transact("add_token_to_whitelist", |_, state| {
            if asset == reserve_asset {
                return Err(LedgerError::InvalidAddress);
            }
            if !state.settings.add_to_whitelist(asset) {
                return Err(LedgerError::AlreadyExists);
            }
            state.record(EventPayload::TokenWhitelisted(TokenWhitelistedEvent {
                asset,
                whitelisted: true,
            }));
            Ok(())
        })
    }

    /// Existing pools keep working; new funding is refused while the asset is delisted.
    pub fn remove_token_from_whitelist(&mut self, admin: &AdminCapability, asset: AssetId) -> Result<(), LedgerError> {
        authorize(admin, self.id)?;
        self.transact("remove_token_from_whitelist", |_, state| {
            if !state.settings.remove_from_whitelist(asset) {
                return Err(LedgerError::DoesNotExist);
            }
            state.record(EventPayload::TokenWhitelisted(TokenWhitelistedEvent {
                asset,
                whitelisted: false,
            }));
            Ok(())
        })
    }

    /// Lowering the limit below current funding is allowed; the pool shrinks toward it
    /// on its next liquidity update.
    pub fn set_funding_limit(
        &mut self,
        admin: &AdminCapability,
        pool: AssetId,
        limit: Amount,
    ) -> Result<(), LedgerError> {
        authorize(admin, self.id)?;
        self.transact("set_funding_limit", |_, state| {
            if !state.settings.is_whitelisted(pool) {
                return Err(LedgerError::NotWhitelisted);
            }
            let prev_limit = state.settings.set_funding_limit(pool, limit);
            if prev_limit != limit {
                state.record(EventPayload::FundingLimitUpdated(FundingLimitUpdatedEvent {
                    pool,
                    prev_limit,
                    new_limit: limit,
                }));
            }
            Ok(())
        })
    }

    pub fn set_min_liquidity_for_trading(&mut self, admin: &AdminCapability, amount: Amount) -> Result<(), LedgerError> {
        authorize(admin, self.id)?;
        self.transact("set_min_liquidity_for_trading", |_, state| {
            if amount == 0 {
                return Err(LedgerError::ZeroValue);
            }
            let prev = state.settings.min_liquidity_for_trading;
            state.settings.min_liquidity_for_trading = amount;
            if prev != amount {
                state.record(EventPayload::SettingUpdated(SettingUpdatedEvent {
                    setting: Setting::MinLiquidityForTrading,
                    prev_value: prev,
                    new_value: amount,
                }));
            }
            Ok(())
        })
    }

    pub fn set_withdrawal_fee(&mut self, admin: &AdminCapability, fee_ppm: u32) -> Result<(), LedgerError> {
        self.set_fee(admin, Setting::WithdrawalFeePpm, fee_ppm)
    }

    /// Fee newly created pools start with. Existing pools keep theirs.
    pub fn set_default_trading_fee(&mut self, admin: &AdminCapability, fee_ppm: u32) -> Result<(), LedgerError> {
        self.set_fee(admin, Setting::DefaultTradingFeePpm, fee_ppm)
    }

    pub fn set_network_fee(&mut self, admin: &AdminCapability, fee_ppm: u32) -> Result<(), LedgerError> {
        self.set_fee(admin, Setting::NetworkFeePpm, fee_ppm)
    }

    fn set_fee(&mut self, admin: &AdminCapability, setting: Setting, fee_ppm: u32) -> Result<(), LedgerError> {
        authorize(admin, self.id)?;
        self.transact("set_fee", |_, state| {
            let fee = Ppm::new(fee_ppm).ok_or(LedgerError::InvalidFee)?;
            let slot = match setting {
                Setting::WithdrawalFeePpm => &mut state.settings.withdrawal_fee_ppm,
                Setting::NetworkFeePpm => &mut state.settings.network_fee_ppm,
                Setting::DefaultTradingFeePpm => {
                    if fee == Ppm::MAX {
                        return Err(LedgerError::InvalidFee);
                    }
                    &mut state.settings.default_trading_fee_ppm
                }
                Setting::MinLiquidityForTrading => {
                    return Err(LedgerError::InvalidParam("not a fee setting".to_string()))
                }
            };
            let prev = std::mem::replace(slot, fee);
            if prev != fee {
                state.record(EventPayload::SettingUpdated(SettingUpdatedEvent {
                    setting,
                    prev_value: prev.value() as Amount,
                    new_value: fee.value() as Amount,
                }));
            }
            Ok(())
        })
    }

    // Pools

    pub fn create_pool(&mut self, admin: &AdminCapability, asset: AssetId) -> Result<PoolTokenId, LedgerError> {
        authorize(admin, self.id)?;
        self.transact("create_pool", |cap, state| {
            let mut parts = state.parts();
            parts.pool_collection.create_pool(cap, &mut parts.ctx, asset)
        })
    }

    pub fn set_trading_fee(&mut self, admin: &AdminCapability, pool: AssetId, fee_ppm: u32) -> Result<(), LedgerError> {
        self.transact("set_trading_fee", |_, state| {
            let mut parts = state.parts();
            parts.pool_collection.set_trading_fee(admin, &mut parts.ctx, pool, fee_ppm)
        })
    }

    pub fn set_deposit_limit(&mut self, admin: &AdminCapability, pool: AssetId, limit: Amount) -> Result<(), LedgerError> {
        self.transact("set_deposit_limit", |_, state| {
            let mut parts = state.parts();
            parts.pool_collection.set_deposit_limit(admin, &mut parts.ctx, pool, limit)
        })
    }

    pub fn enable_depositing(&mut self, admin: &AdminCapability, pool: AssetId, enabled: bool) -> Result<(), LedgerError> {
        self.transact("enable_depositing", |_, state| {
            let mut parts = state.parts();
            parts.pool_collection.enable_depositing(admin, &mut parts.ctx, pool, enabled)
        })
    }

    /// Bootstraps trading at `reserve_rate / base_rate` reserve units per base unit.
    pub fn enable_trading(
        &mut self,
        admin: &AdminCapability,
        pool: AssetId,
        reserve_rate: Amount,
        base_rate: Amount,
    ) -> Result<(), LedgerError> {
        self.transact("enable_trading", |_, state| {
            let mut parts = state.parts();
            parts
                .pool_collection
                .enable_trading(admin, &mut parts.ctx, parts.funding_pool, pool, reserve_rate, base_rate)
        })
    }

    pub fn disable_trading(&mut self, admin: &AdminCapability, pool: AssetId) -> Result<(), LedgerError> {
        self.transact("disable_trading", |_, state| {
            let mut parts = state.parts();
            parts
                .pool_collection
                .disable_trading(admin, &mut parts.ctx, parts.funding_pool, pool)
        })
    }

    pub fn set_lock_duration(&mut self, admin: &AdminCapability, secs: i64) -> Result<(), LedgerError> {
        self.transact("set_lock_duration", |_, state| {
            let mut parts = state.parts();
            parts.pending_withdrawals.set_lock_duration(admin, &mut parts.ctx, secs)
        })
    }

    /// Moves every pool into a successor collection. Returns the new version.
    pub fn upgrade_pool_collection(&mut self, admin: &AdminCapability) -> Result<u16, LedgerError> {
        let id = self.id;
        self.transact("upgrade_pool_collection", |_, state| {
            let mut parts = state.parts();
            let successor = migration::upgrade_pool_collection(
                admin,
                &mut parts.ctx,
                parts.pool_collection,
                FundingManagerCapability::issue(id),
            )?;
            let version = successor.version();
            *parts.pool_collection = successor;
            Ok(version)
        })
    }

    // Vaults and external balances

    /// Tops up the protection vault from `from`'s wallet.
    pub fn fund_protection_vault(
        &mut self,
        admin: &AdminCapability,
        from: AccountId,
        asset: AssetId,
        amount: Amount,
    ) -> Result<(), LedgerError> {
        authorize(admin, self.id)?;
        self.transact("fund_protection_vault", |_, state| {
            if amount == 0 {
                return Err(LedgerError::ZeroValue);
            }
            let parts = state.parts();
            parts.wallets.pay_into(from, parts.protection_vault, asset, amount)
        })
    }

    /// Sends the whole network-fee balance of `asset` to `recipient`. Returns the amount.
    pub fn withdraw_network_fees(
        &mut self,
        admin: &AdminCapability,
        asset: AssetId,
        recipient: AccountId,
    ) -> Result<Amount, LedgerError> {
        authorize(admin, self.id)?;
        self.transact("withdraw_network_fees", |_, state| {
            if recipient.is_protocol() {
                return Err(LedgerError::InvalidAddress);
            }
            let parts = state.parts();
            let amount = parts.network_fee_vault.balance_of(asset);
            parts.network_fee_vault.withdraw_funds(asset, amount, parts.wallets, recipient)?;
            info!(%asset, amount, %recipient, "network fees withdrawn");
            Ok(amount)
        })
    }

    /// Moves `amount` of `asset` from the master vault into the protection vault.
    pub fn reallocate_to_protection(
        &mut self,
        admin: &AdminCapability,
        asset: AssetId,
        amount: Amount,
    ) -> Result<(), LedgerError> {
        authorize(admin, self.id)?;
        self.transact("reallocate_to_protection", |_, state| {
            let parts = state.parts();
            move_between(parts.ctx.master_vault, parts.protection_vault, asset, amount)
        })
    }

    /// Credits `account` with tokens arriving from outside the ledger.
    pub fn fund_wallet(
        &mut self,
        admin: &AdminCapability,
        account: AccountId,
        asset: AssetId,
        amount: Amount,
    ) -> Result<(), LedgerError> {
        authorize(admin, self.id)?;
        self.transact("fund_wallet", |_, state| {
            if account.is_protocol() {
                return Err(LedgerError::InvalidAddress);
            }
            state.wallets.credit(account, asset, amount)
        })
    }
}
