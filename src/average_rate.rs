// 3.0 average_rate.rs: exponential moving average of a pool's spot rate.
// the EMA resists single-block manipulation: it moves at most once per block, and only
// a weighted step toward the spot rate. withdrawals are refused while spot and EMA disagree.

use crate::fraction::{is_in_range, weighted_average, Fraction112, MathError};
use crate::types::{BlockNumber, Ppm};
use serde::{Deserialize, Serialize};

/// Relative weights of the previous average and the current spot rate in one EMA step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmaWeights {
    pub average: u32,
    pub spot: u32,
}

impl Default for EmaWeights {
    fn default() -> Self {
        // new = (4 * average + 1 * spot) / 5
        Self { average: 4, spot: 1 }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AverageRate {
    pub block_number: BlockNumber,
    pub rate: Fraction112,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateState {
    Uninitialized,
    Unstable,
    Stable,
}

impl AverageRate {
    pub fn seed(block_number: BlockNumber, rate: Fraction112) -> Self {
        Self { block_number, rate }
    }

    pub fn is_initialized(&self) -> bool {
        self.rate.is_positive()
    }

    /// Average the rate would hold at `block` given `spot`. Within the block of the last
    /// update it is the stored rate.
    pub fn projected(
        &self,
        spot: &Fraction112,
        block: BlockNumber,
        weights: EmaWeights,
    ) -> Result<Fraction112, MathError> {
        if block == self.block_number {
            return Ok(self.rate);
        }
        let blended = weighted_average(&self.rate.widen(), &spot.widen(), weights.average, weights.spot)?;
        Ok(blended.reduce())
    }

    /// Blends `spot` into the average. Returns false when the block was already counted.
    pub fn update(
        &mut self,
        spot: &Fraction112,
        block: BlockNumber,
        weights: EmaWeights,
    ) -> Result<bool, MathError> {
        if block == self.block_number {
            return Ok(false);
        }
        self.rate = self.projected(spot, block, weights)?;
        self.block_number = block;
        Ok(true)
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

/// Compares `spot` against the average as of `block`.
pub fn rate_state(
    average: &AverageRate,
    spot: &Fraction112,
    block: BlockNumber,
    weights: EmaWeights,
    max_deviation: Ppm,
) -> Result<RateState, MathError> {
    if !average.is_initialized() || !spot.is_positive() {
        return Ok(RateState::Uninitialized);
    }

    let ema = average.projected(spot, block, weights)?;
    if !ema.is_positive() {
        return Ok(RateState::Uninitialized);
    }

    if is_in_range(&ema, spot, max_deviation)? {
        Ok(RateState::Stable)
    } else {
        Ok(RateState::Unstable)
    }
}
