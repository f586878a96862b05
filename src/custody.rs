// 9.2 custody.rs: asset vaults and wallets. plain balance maps, no real token transfers.
// the ledger never holds assets itself: the master vault holds pooled liquidity, the
// protection vault covers shortfalls on withdrawal, the network fee vault collects skims.

use crate::errors::LedgerError;
use crate::fraction::{checked_add, checked_sub};
use crate::types::{AccountId, Amount, AssetId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Asset-movement primitives a custody vault offers to the ledger.
pub trait Vault {
    fn name(&self) -> &str;

    fn balance_of(&self, asset: AssetId) -> Amount;

    fn deposit(&mut self, asset: AssetId, amount: Amount) -> Result<(), LedgerError>;

    /// Removes `amount` from the vault without crediting anyone (burns, vault-to-vault moves).
    fn take(&mut self, asset: AssetId, amount: Amount) -> Result<(), LedgerError>;

    fn withdraw_funds(
        &mut self,
        asset: AssetId,
        amount: Amount,
        to: &mut Wallets,
        recipient: AccountId,
    ) -> Result<(), LedgerError> {
        self.take(asset, amount)?;
        to.credit(recipient, asset, amount)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AssetVault {
    name: String,
    balances: HashMap<AssetId, Amount>,
}

impl AssetVault {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            balances: HashMap::new(),
        }
    }
}

impl Vault for AssetVault {
    fn name(&self) -> &str {
        &self.name
    }

    fn balance_of(&self, asset: AssetId) -> Amount {
        self.balances.get(&asset).copied().unwrap_or(0)
    }

    fn deposit(&mut self, asset: AssetId, amount: Amount) -> Result<(), LedgerError> {
        let balance = checked_add(self.balance_of(asset), amount)?;
        self.balances.insert(asset, balance);
        Ok(())
    }

    fn take(&mut self, asset: AssetId, amount: Amount) -> Result<(), LedgerError> {
        let balance = self.balance_of(asset);
        if amount > balance {
            return Err(LedgerError::InsufficientLiquidity);
        }
        self.balances.insert(asset, checked_sub(balance, amount)?);
        Ok(())
    }
}

/// Moves `amount` of `asset` between two vaults.
pub fn move_between(
    from: &mut impl Vault,
    to: &mut impl Vault,
    asset: AssetId,
    amount: Amount,
) -> Result<(), LedgerError> {
    if amount == 0 {
        return Ok(());
    }
    from.take(asset, amount)?;
    to.deposit(asset, amount)
}

/// External balances of every account, per asset.
#[derive(Debug, Clone, Default)]
pub struct Wallets {
    balances: HashMap<(AccountId, AssetId), Amount>,
}

impl Wallets {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn balance_of(&self, account: AccountId, asset: AssetId) -> Amount {
        self.balances.get(&(account, asset)).copied().unwrap_or(0)
    }

    pub fn credit(&mut self, account: AccountId, asset: AssetId, amount: Amount) -> Result<(), LedgerError> {
        let balance = checked_add(self.balance_of(account, asset), amount)?;
        self.balances.insert((account, asset), balance);
        Ok(())
    }

    pub fn debit(&mut self, account: AccountId, asset: AssetId, amount: Amount) -> Result<(), LedgerError> {
        let balance = self.balance_of(account, asset);
        if amount > balance {
            return Err(LedgerError::InsufficientBalance);
        }
        self.balances.insert((account, asset), balance - amount);
        Ok(())
    }

    /// Debits the wallet into a vault.
    pub fn pay_into(
        &mut self,
        account: AccountId,
        vault: &mut impl Vault,
        asset: AssetId,
        amount: Amount,
    ) -> Result<(), LedgerError> {
        self.debit(account, asset, amount)?;
        vault.deposit(asset, amount)
    }
}
