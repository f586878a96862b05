// 5.0 token.rs: fungible share tokens. pool-share tokens come from the factory, one per
// pool; the funding pool's governance token is a bare ShareToken it owns.
// balances always sum to total supply: mint, burn and transfer are the only mutators.

use crate::errors::LedgerError;
use crate::fraction::{checked_add, checked_sub};
use crate::types::{AccountId, Amount, AssetId, PoolTokenId};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ShareToken {
    symbol: String,
    total_supply: Amount,
    balances: HashMap<AccountId, Amount>,
}

impl ShareToken {
    pub fn new(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            total_supply: 0,
            balances: HashMap::new(),
        }
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn total_supply(&self) -> Amount {
        self.total_supply
    }

    pub fn balance_of(&self, holder: AccountId) -> Amount {
        self.balances.get(&holder).copied().unwrap_or(0)
    }

    pub fn holders(&self) -> impl Iterator<Item = (&AccountId, &Amount)> {
        self.balances.iter()
    }

    pub fn mint(&mut self, to: AccountId, amount: Amount) -> Result<(), LedgerError> {
        let supply = checked_add(self.total_supply, amount)?;
        let balance = checked_add(self.balance_of(to), amount)?;
        self.total_supply = supply;
        self.set_balance(to, balance);
        Ok(())
    }

    pub fn burn(&mut self, from: AccountId, amount: Amount) -> Result<(), LedgerError> {
        let balance = self.balance_of(from);
        if amount > balance {
            return Err(LedgerError::InsufficientBalance);
        }
        self.total_supply = checked_sub(self.total_supply, amount)?;
        self.set_balance(from, balance - amount);
        Ok(())
    }

    pub fn transfer(&mut self, from: AccountId, to: AccountId, amount: Amount) -> Result<(), LedgerError> {
        let from_balance = self.balance_of(from);
        if amount > from_balance {
            return Err(LedgerError::InsufficientBalance);
        }
        if from == to {
            return Ok(());
        }
        let to_balance = checked_add(self.balance_of(to), amount)?;
        self.set_balance(from, from_balance - amount);
        self.set_balance(to, to_balance);
        Ok(())
    }

    fn set_balance(&mut self, holder: AccountId, amount: Amount) {
        if amount == 0 {
            self.balances.remove(&holder);
        } else {
            self.balances.insert(holder, amount);
        }
    }
}

/// A pool-share token bound to the asset whose staked balance it claims.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolToken {
    pub id: PoolTokenId,
    pub underlying: AssetId,
    pub token: ShareToken,
}

// 5.1: issues pool-share tokens and owns their ledgers.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PoolTokenFactory {
    tokens: BTreeMap<PoolTokenId, PoolToken>,
    next_id: u32,
}

impl PoolTokenFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create_token(&mut self, underlying: AssetId) -> PoolTokenId {
        self.next_id += 1;
        let id = PoolTokenId(self.next_id);
        self.tokens.insert(
            id,
            PoolToken {
                id,
                underlying,
                token: ShareToken::new(format!("pool-{}", underlying.0)),
            },
        );
        id
    }

    pub fn get(&self, id: PoolTokenId) -> Option<&PoolToken> {
        self.tokens.get(&id)
    }

    pub fn token(&self, id: PoolTokenId) -> Result<&ShareToken, LedgerError> {
        self.tokens
            .get(&id)
            .map(|t| &t.token)
            .ok_or(LedgerError::InvalidPool)
    }

    pub fn token_mut(&mut self, id: PoolTokenId) -> Result<&mut ShareToken, LedgerError> {
        self.tokens
            .get_mut(&id)
            .map(|t| &mut t.token)
            .ok_or(LedgerError::InvalidPool)
    }

    pub fn total_supply(&self, id: PoolTokenId) -> Result<Amount, LedgerError> {
        Ok(self.token(id)?.total_supply())
    }

    pub fn balance_of(&self, id: PoolTokenId, holder: AccountId) -> Result<Amount, LedgerError> {
        Ok(self.token(id)?.balance_of(holder))
    }

    pub fn iter(&self) -> impl Iterator<Item = &PoolToken> {
        self.tokens.values()
    }
}
