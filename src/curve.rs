// 4.0 curve.rs: constant-product bonding curve over the two trading-liquidity legs.
// out = target * in / (source + in). the trading fee comes off the output side and part
// of it (the network fee) is skimmed out of the pool.

use crate::errors::LedgerError;
use crate::fraction::{checked_add, checked_sub, mul_div_ceil, mul_div_floor};
use crate::types::{Amount, Ppm, PPM_RESOLUTION};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradeAmounts {
    /// Paid in by the trader.
    pub source_amount: Amount,
    /// Paid out to the trader, fee already deducted.
    pub target_amount: Amount,
    /// Whole trading fee, in target units.
    pub trading_fee: Amount,
    /// Part of the trading fee leaving the pool for the network fee vault.
    pub network_fee: Amount,
}

impl TradeAmounts {
    /// How much the target leg shrinks: the payout plus the skimmed network fee.
    /// The rest of the fee stays in the leg.
    pub fn target_leg_decrease(&self) -> Result<Amount, LedgerError> {
        Ok(checked_add(self.target_amount, self.network_fee)?)
    }

    /// Fee share that compounds into the pool's staked balance.
    pub fn retained_fee(&self) -> Result<Amount, LedgerError> {
        Ok(checked_sub(self.trading_fee, self.network_fee)?)
    }
}

pub fn trade_by_source_amount(
    source_balance: Amount,
    target_balance: Amount,
    trading_fee: Ppm,
    network_fee: Ppm,
    source_amount: Amount,
) -> Result<TradeAmounts, LedgerError> {
    if source_amount == 0 {
        return Err(LedgerError::ZeroValue);
    }
    if source_balance == 0 || target_balance == 0 {
        return Err(LedgerError::InsufficientLiquidity);
    }

    let gross = mul_div_floor(
        target_balance,
        source_amount,
        checked_add(source_balance, source_amount)?,
    )?;
    let fee = trading_fee.apply(gross)?;
    let amounts = TradeAmounts {
        source_amount,
        target_amount: checked_sub(gross, fee)?,
        trading_fee: fee,
        network_fee: network_fee.apply(fee)?,
    };

    if amounts.target_leg_decrease()? >= target_balance {
        return Err(LedgerError::InsufficientLiquidity);
    }
    Ok(amounts)
}

pub fn trade_by_target_amount(
    source_balance: Amount,
    target_balance: Amount,
    trading_fee: Ppm,
    network_fee: Ppm,
    target_amount: Amount,
) -> Result<TradeAmounts, LedgerError> {
    if target_amount == 0 {
        return Err(LedgerError::ZeroValue);
    }
    if source_balance == 0 || target_balance == 0 {
        return Err(LedgerError::InsufficientLiquidity);
    }
    if trading_fee == Ppm::MAX {
        return Err(LedgerError::InvalidFee);
    }

    // gross - floor(gross * fee) >= target_amount
    let gross = mul_div_ceil(
        target_amount,
        PPM_RESOLUTION as u128,
        trading_fee.complement().value() as u128,
    )?;
    if gross >= target_balance {
        return Err(LedgerError::InsufficientLiquidity);
    }

    let fee = checked_sub(gross, target_amount)?;
    let source_amount = mul_div_ceil(source_balance, gross, checked_sub(target_balance, gross)?)?;

    let amounts = TradeAmounts {
        source_amount,
        target_amount,
        trading_fee: fee,
        network_fee: network_fee.apply(fee)?,
    };
    if amounts.target_leg_decrease()? >= target_balance {
        return Err(LedgerError::InsufficientLiquidity);
    }
    Ok(amounts)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ppm(v: u32) -> Ppm {
        Ppm::new(v).unwrap()
    }

    #[test]
    fn feeless_source_trade() {
        // 1000 in against (4000, 8000): 8000 * 1000 / 5000 = 1600
        let t = trade_by_source_amount(4_000, 8_000, Ppm::ZERO, Ppm::ZERO, 1_000).unwrap();
        assert_eq!(t.target_amount, 1_600);
        assert_eq!(t.trading_fee, 0);
        assert_eq!(t.target_leg_decrease().unwrap(), 1_600);
    }

    #[test]
    fn fee_comes_off_output() {
        // gross 1600, 1% fee = 16, network takes 25% of it = 4
        let t = trade_by_source_amount(4_000, 8_000, ppm(10_000), ppm(250_000), 1_000).unwrap();
        assert_eq!(t.trading_fee, 16);
        assert_eq!(t.target_amount, 1_584);
        assert_eq!(t.network_fee, 4);
        assert_eq!(t.retained_fee().unwrap(), 12);
        assert_eq!(t.target_leg_decrease().unwrap(), 1_588);
    }

    #[test]
    fn empty_leg_rejected() {
        assert_eq!(
            trade_by_source_amount(0, 8_000, Ppm::ZERO, Ppm::ZERO, 1),
            Err(LedgerError::InsufficientLiquidity)
        );
        assert_eq!(
            trade_by_source_amount(4_000, 8_000, Ppm::ZERO, Ppm::ZERO, 0),
            Err(LedgerError::ZeroValue)
        );
    }

    #[test]
    fn target_trade_cannot_drain_leg() {
        assert_eq!(
            trade_by_target_amount(4_000, 8_000, Ppm::ZERO, Ppm::ZERO, 8_000),
            Err(LedgerError::InsufficientLiquidity)
        );
    }

    #[test]
    fn target_trade_matches_source_trade() {
        let fee = ppm(2_000);
        let by_target = trade_by_target_amount(50_000, 100_000, fee, Ppm::ZERO, 1_000).unwrap();
        let by_source =
            trade_by_source_amount(50_000, 100_000, fee, Ppm::ZERO, by_target.source_amount).unwrap();

        // paying the quoted input yields at least the requested output
        assert!(by_source.target_amount >= 1_000);
        // and one unit less does not overshoot by more than rounding
        let short = trade_by_source_amount(50_000, 100_000, fee, Ppm::ZERO, by_target.source_amount - 1)
            .unwrap();
        assert!(short.target_amount <= 1_000);
    }
}
