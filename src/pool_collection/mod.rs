// 6.0: pool collection. the trading engine for every non-reserve pool: per-pool fees and
// limits, deposits and withdrawals of base assets, the trading-liquidity controller, and
// constant-product trades against the reserve asset.
// reserve funding flows through the funding pool; asset transfers are left to the caller.

mod core;
mod liquidity;
mod results;
mod trading;

pub use self::core::{Pool, PoolCollection, PoolLiquidity};
pub use results::{TradeResult, WithdrawalAmounts};
