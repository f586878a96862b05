// liquidity-ledger: pool liquidity and trading ledger.
// a central reserve asset is lent into base-asset pools under per-pool funding limits;
// trades run against each pool's trading liquidity, guarded by an EMA of the spot rate;
// providers exit through a cooldown queue.
// all computation is deterministic with no external I/O.
//
// file map (search X.0 for structs, X.1+ for logic):
//   0.1  errors.rs: LedgerError, one variant per failure
//   0.2  capability.rs: admin / funding-manager / network capabilities
//   1.x  types.rs: primitives: AssetId, AccountId, Ppm, Clock
//   2.x  fraction.rs: checked u128 math, 256-bit fractions, bounded 112-bit rates
//   3.x  average_rate.rs: EMA of the spot rate, stability test
//   4.x  curve.rs: constant-product trade math, fee split
//   5.0  token.rs: share tokens and the pool-token factory
//   5.2  funding_pool.rs: reserve funding, reserve deposits/withdrawals, fee compounding
//   6.x  pool_collection/: per-pool state, deposits, withdrawals, trading liquidity, trades
//   7.x  config.rs: network settings, protocol params, env presets
//   9.0  context.rs: borrowed collaborators for one atomic call
//   9.2  custody.rs: vaults and wallets
//   10.x pending_withdrawals.rs: withdrawal cooldown queue
//   11.x events.rs: state transition events for audit
//   12.x migration.rs: versioned pool-collection snapshots, upgrades
//   13.x network/: orchestrator: routing, two-hop trades, settlement, rollback

// ledger components
pub mod funding_pool;
pub mod pending_withdrawals;
pub mod pool_collection;

// math
pub mod average_rate;
pub mod curve;
pub mod fraction;

// shared state and plumbing
pub mod capability;
pub mod config;
pub mod context;
pub mod custody;
pub mod errors;
pub mod events;
pub mod migration;
pub mod token;
pub mod types;

// orchestration
pub mod network;

// re exports for convenience
pub use average_rate::{AverageRate, EmaWeights, RateState};
pub use capability::{AdminCapability, Capability, FundingManagerCapability, NetworkCapability, NetworkId};
pub use config::{ConfigError, Environment, LedgerConfig, NetworkSettings, ProtocolParams};
pub use curve::TradeAmounts;
pub use errors::LedgerError;
pub use events::*;
pub use fraction::{Fraction, Fraction112, MathError};
pub use funding_pool::FundingPool;
pub use migration::{PoolCollectionSnapshot, PoolCollectionV1, PoolCollectionV2, PoolDataV1};
pub use network::{Network, TradeOutcome, TradeQuote};
pub use pending_withdrawals::{PendingWithdrawals, WithdrawalRequest, WithdrawalStatus};
pub use pool_collection::{Pool, PoolCollection, PoolLiquidity, TradeResult, WithdrawalAmounts};
pub use token::{PoolToken, PoolTokenFactory, ShareToken};
pub use types::*;
