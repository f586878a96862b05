// 0.1 errors.rs: every caller-visible failure. any error aborts the whole call; the
// orchestrator restores the pre-call state, so no partial effects survive.

use crate::config::ConfigError;
use crate::fraction::MathError;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LedgerError {
    // access / authorization
    #[error("access denied")]
    AccessDenied,

    #[error("invalid address")]
    InvalidAddress,

    #[error("zero value")]
    ZeroValue,

    // existence
    #[error("does not exist")]
    DoesNotExist,

    #[error("already exists")]
    AlreadyExists,

    #[error("asset is not whitelisted")]
    NotWhitelisted,

    #[error("already enabled")]
    AlreadyEnabled,

    #[error("invalid pool")]
    InvalidPool,

    // economic limits
    #[error("funding limit exceeded")]
    FundingLimitExceeded,

    #[error("deposit limit exceeded")]
    DepositLimitExceeded,

    #[error("insufficient liquidity")]
    InsufficientLiquidity,

    #[error("insufficient target amount")]
    InsufficientTargetAmount,

    #[error("insufficient source amount")]
    InsufficientSourceAmount,

    #[error("insufficient balance")]
    InsufficientBalance,

    #[error("depositing is disabled")]
    DepositingDisabled,

    #[error("trading is disabled")]
    TradingDisabled,

    // stability
    #[error("pool rate is unstable")]
    RateUnstable,

    #[error("invalid rate")]
    InvalidRate,

    #[error("invalid fee")]
    InvalidFee,

    #[error("invalid parameter: {0}")]
    InvalidParam(String),

    // timing
    #[error("withdrawal is not ready")]
    WithdrawalNotReady,

    #[error("math error: {0}")]
    Math(#[from] MathError),

    #[error("invalid configuration: {0}")]
    InvalidConfig(#[from] ConfigError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn math_errors_convert() {
        fn overflow() -> Result<(), LedgerError> {
            Err(MathError::Overflow)?
        }
        assert_eq!(overflow(), Err(LedgerError::Math(MathError::Overflow)));
        assert_eq!(LedgerError::RateUnstable.to_string(), "pool rate is unstable");
    }
}
