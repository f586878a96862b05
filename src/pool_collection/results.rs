// 6.0.4: result types for pool collection operations.

use super::core::PoolLiquidity;
use crate::curve::TradeAmounts;
use crate::types::{Amount, AssetId};
use serde::{Deserialize, Serialize};

/// How a withdrawal settles. `base_amount` is what the provider receives; it is paid
/// from the master vault first and the protection vault covers any shortfall.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WithdrawalAmounts {
    pub pool_token_amount: Amount,
    pub underlying_amount: Amount,
    pub withdrawal_fee: Amount,
    pub base_amount: Amount,
    pub from_master_vault: Amount,
    pub from_protection_vault: Amount,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradeResult {
    pub pool: AssetId,
    pub source_asset: AssetId,
    pub target_asset: AssetId,
    pub amounts: TradeAmounts,
    // post-trade; zeroed when the trade reset the pool
    pub liquidity: PoolLiquidity,
}
