// 13.0: the orchestrator. routes calls between the funding pool, the pool collection and
// the withdrawal queue, moves assets between wallets and vaults, and makes every public
// call atomic.

mod admin;
mod core;
mod liquidity;
mod results;
mod trading;

pub use self::core::Network;
pub use results::{TradeOutcome, TradeQuote};
