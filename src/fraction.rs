// 2.0 fraction.rs: fixed-point fraction math. rates are stored as n/d pairs, never as
// floats or decimals, so every comparison is exact.
// 2.1 mul_div: x*y/z through a 256-bit intermediate. 2.2 reduce: 256-bit → 112-bit.
// 2.3 weighted_average and is_in_range for the EMA guard.
//
// rounding contract: every reduction and every mul_div_floor rounds toward zero.
// callers that need the pool-favouring direction use mul_div_ceil explicitly.

use crate::types::{Ppm, PPM_RESOLUTION};
use ethnum::U256;
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Largest value a bounded-precision component may hold.
pub const MAX_UINT112: u128 = (1u128 << 112) - 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum MathError {
    #[error("arithmetic overflow")]
    Overflow,

    #[error("arithmetic underflow")]
    Underflow,

    #[error("division by zero")]
    DivisionByZero,
}

pub fn checked_add(a: u128, b: u128) -> Result<u128, MathError> {
    a.checked_add(b).ok_or(MathError::Overflow)
}

pub fn checked_sub(a: u128, b: u128) -> Result<u128, MathError> {
    a.checked_sub(b).ok_or(MathError::Underflow)
}

pub fn checked_mul(a: u128, b: u128) -> Result<u128, MathError> {
    a.checked_mul(b).ok_or(MathError::Overflow)
}

fn narrow(value: U256) -> Result<u128, MathError> {
    let (high, low) = value.into_words();
    if high != 0 {
        return Err(MathError::Overflow);
    }
    Ok(low)
}

/// `x * y / z` rounded down.
pub fn mul_div_floor(x: u128, y: u128, z: u128) -> Result<u128, MathError> {
    if z == 0 {
        return Err(MathError::DivisionByZero);
    }
    let product = U256::from(x) * U256::from(y);
    narrow(product / U256::from(z))
}

/// `x * y / z` rounded up.
pub fn mul_div_ceil(x: u128, y: u128, z: u128) -> Result<u128, MathError> {
    if z == 0 {
        return Err(MathError::DivisionByZero);
    }
    let product = U256::from(x) * U256::from(y);
    let divisor = U256::from(z);
    let mut quotient = product / divisor;
    if product % divisor != U256::ZERO {
        quotient += U256::ONE;
    }
    narrow(quotient)
}

// 2.1: wide fraction. intermediate results of rate arithmetic live here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fraction {
    pub n: U256,
    pub d: U256,
}

impl Fraction {
    pub fn new(n: u128, d: u128) -> Self {
        Self {
            n: U256::from(n),
            d: U256::from(d),
        }
    }

    pub fn is_valid(&self) -> bool {
        self.d != U256::ZERO
    }

    pub fn is_positive(&self) -> bool {
        self.n != U256::ZERO && self.d != U256::ZERO
    }

    // 2.2: scale both parts down by ceil(max(n, d) / MAX_UINT112), rounding each down.
    // the ratio is preserved up to that truncation; a fraction already within bounds is untouched.
    pub fn reduce(&self) -> Fraction112 {
        let bound = U256::from(MAX_UINT112);
        let max = self.n.max(self.d);
        if max <= bound {
            return Fraction112 {
                n: self.n.as_u128(),
                d: self.d.as_u128(),
            };
        }

        let mut scale = max / bound;
        if max % bound != U256::ZERO {
            scale += U256::ONE;
        }

        Fraction112 {
            n: (self.n / scale).as_u128(),
            d: (self.d / scale).as_u128(),
        }
    }
}

// 2.3: bounded fraction. both parts fit in 112 bits, so products of three of them
// (two components and a ppm factor) always fit in 256 bits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fraction112 {
    pub n: u128,
    pub d: u128,
}

impl Fraction112 {
    pub const ZERO: Fraction112 = Fraction112 { n: 0, d: 0 };

    #[must_use]
    pub fn new(n: u128, d: u128) -> Option<Self> {
        if n > MAX_UINT112 || d > MAX_UINT112 {
            None
        } else {
            Some(Self { n, d })
        }
    }

    /// Builds a bounded fraction from arbitrary u128 parts, reducing if needed.
    pub fn from_parts(n: u128, d: u128) -> Self {
        Fraction::new(n, d).reduce()
    }

    pub fn is_valid(&self) -> bool {
        self.d != 0
    }

    pub fn is_positive(&self) -> bool {
        self.n != 0 && self.d != 0
    }

    pub fn widen(&self) -> Fraction {
        Fraction::new(self.n, self.d)
    }

    /// Human-readable value, for logs and reports only. `None` when undefined
    /// or when a component is too wide for `Decimal`.
    pub fn to_decimal(&self) -> Option<Decimal> {
        if self.d == 0 {
            return None;
        }
        let n = Decimal::from_u128(self.n)?;
        let d = Decimal::from_u128(self.d)?;
        n.checked_div(d)
    }
}

/// `(f1 * w1 + f2 * w2) / (w1 + w2)` as an unreduced wide fraction.
pub fn weighted_average(
    f1: &Fraction,
    f2: &Fraction,
    weight1: u32,
    weight2: u32,
) -> Result<Fraction, MathError> {
    let w1 = U256::from(weight1 as u128);
    let w2 = U256::from(weight2 as u128);

    let left = f1
        .n
        .checked_mul(f2.d)
        .and_then(|v| v.checked_mul(w1))
        .ok_or(MathError::Overflow)?;
    let right = f1
        .d
        .checked_mul(f2.n)
        .and_then(|v| v.checked_mul(w2))
        .ok_or(MathError::Overflow)?;
    let n = left.checked_add(right).ok_or(MathError::Overflow)?;
    let d = f1
        .d
        .checked_mul(f2.d)
        .and_then(|v| v.checked_mul(w1 + w2))
        .ok_or(MathError::Overflow)?;

    Ok(Fraction { n, d })
}

/// True when `offset` lies within `max_deviation` of `base`, on either side.
pub fn is_in_range(
    base: &Fraction112,
    offset: &Fraction112,
    max_deviation: Ppm,
) -> Result<bool, MathError> {
    let resolution = U256::from(PPM_RESOLUTION as u128);
    let deviation = U256::from(max_deviation.value() as u128);

    let cross = U256::from(base.n)
        .checked_mul(U256::from(offset.d))
        .ok_or(MathError::Overflow)?;
    let min = cross
        .checked_mul(resolution - deviation)
        .ok_or(MathError::Overflow)?;
    let mid = U256::from(base.d)
        .checked_mul(U256::from(offset.n))
        .and_then(|v| v.checked_mul(resolution))
        .ok_or(MathError::Overflow)?;
    let max = cross
        .checked_mul(resolution + deviation)
        .ok_or(MathError::Overflow)?;

    Ok(min <= mid && mid <= max)
}
