// 1.0: all the primitives live here. ids, amounts, ppm, blocks, timestamps.
// each id is a newtype so the compiler catches asset/account/pool-token mixups.

use crate::fraction::{mul_div_floor, MathError};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Token amounts in the smallest unit of their asset.
pub type Amount = u128;

/// Denominator for every parts-per-million value.
pub const PPM_RESOLUTION: u32 = 1_000_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AssetId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AccountId(pub u64);

impl AccountId {
    /// Holder of protocol-owned reserve pool shares.
    pub const FUNDING_POOL: AccountId = AccountId(u64::MAX);
    /// Custody account for shares locked in the withdrawal queue.
    pub const PENDING_WITHDRAWALS: AccountId = AccountId(u64::MAX - 1);
    /// Transit account for shares released by the queue and about to be redeemed.
    pub const NETWORK: AccountId = AccountId(u64::MAX - 2);

    pub fn is_protocol(&self) -> bool {
        self.0 >= u64::MAX - 2
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PoolTokenId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct WithdrawalRequestId(pub u64);

impl fmt::Display for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "asset#{}", self.0)
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "account#{}", self.0)
    }
}

// 1.1: parts-per-million. 10_000 ppm = 1%. must not exceed PPM_RESOLUTION.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Ppm(u32);

impl Ppm {
    pub const ZERO: Ppm = Ppm(0);
    pub const MAX: Ppm = Ppm(PPM_RESOLUTION);

    #[must_use]
    pub fn new(value: u32) -> Option<Self> {
        if value <= PPM_RESOLUTION {
            Some(Self(value))
        } else {
            None
        }
    }

    pub fn value(&self) -> u32 {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    // 5_000 ppm → 0.005
    pub fn as_fraction(&self) -> Decimal {
        Decimal::new(self.0 as i64, 6)
    }

    /// `amount * ppm / 1_000_000`, rounded down.
    pub fn apply(&self, amount: Amount) -> Result<Amount, MathError> {
        mul_div_floor(amount, self.0 as u128, PPM_RESOLUTION as u128)
    }

    pub fn complement(&self) -> Ppm {
        Ppm(PPM_RESOLUTION - self.0)
    }
}

impl fmt::Display for Ppm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}ppm", self.0)
    }
}

// 1.2: block height. the EMA is recomputed at most once per block.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BlockNumber(pub u64);

impl BlockNumber {
    pub fn next(&self) -> Self {
        Self(self.0.saturating_add(1))
    }
}

// 1.3: unix timestamp in seconds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Timestamp(pub i64);

impl Timestamp {
    pub fn now() -> Self {
        Self(Utc::now().timestamp())
    }

    pub fn from_secs(secs: i64) -> Self {
        Self(secs)
    }

    pub fn as_secs(&self) -> i64 {
        self.0
    }

    pub fn plus_secs(&self, secs: i64) -> Self {
        Self(self.0.saturating_add(secs))
    }

    /// Seconds from `self` until `later`; negative when `later` is in the past.
    pub fn elapsed_secs(&self, later: &Timestamp) -> i64 {
        later.0.saturating_sub(self.0)
    }

    pub fn to_datetime(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.0, 0)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_datetime() {
            Some(dt) => write!(f, "{}", dt.to_rfc3339()),
            None => write!(f, "{}s", self.0),
        }
    }
}

// 1.4: execution clock. every call runs against exactly one (block, timestamp) pair.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Clock {
    pub block: BlockNumber,
    pub timestamp: Timestamp,
}

impl Clock {
    pub fn genesis(timestamp: Timestamp) -> Self {
        Self {
            block: BlockNumber(1),
            timestamp,
        }
    }

    pub fn advance(&mut self, blocks: u64, secs: i64) {
        self.block = BlockNumber(self.block.0.saturating_add(blocks));
        self.timestamp = self.timestamp.plus_secs(secs);
    }
}

// 1.5: why trading was switched on or off.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TradingStatusReason {
    Default,
    Admin,
    MinLiquidity,
}
