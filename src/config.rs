// 7.0 config.rs: all settings in one place.
// 7.1 NetworkSettings: whitelist, funding limits, fees. changed at runtime by the admin.
// 7.2 ProtocolParams: growth/bootstrap factors, EMA guard, cooldown. fixed per deployment.
// 7.3 presets and validation.

use crate::average_rate::EmaWeights;
use crate::types::{Amount, AssetId, Ppm};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

const DAY_SECS: i64 = 24 * 60 * 60;

/** 7.1: settings the pools read on every call. fees are ppm. 10_000 ppm = 1% */
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkSettings {
    whitelist: BTreeSet<AssetId>,
    funding_limits: BTreeMap<AssetId, Amount>,
    // reserve trading liquidity below this disables trading
    pub min_liquidity_for_trading: Amount,
    pub withdrawal_fee_ppm: Ppm,
    // fee newly created pools start with
    pub default_trading_fee_ppm: Ppm,
    // share of every trading fee moved to the network fee vault
    pub network_fee_ppm: Ppm,
}

impl Default for NetworkSettings {
    fn default() -> Self {
        Self {
            whitelist: BTreeSet::new(),
            funding_limits: BTreeMap::new(),
            min_liquidity_for_trading: 1_000,
            withdrawal_fee_ppm: Ppm::new(2_500).unwrap_or(Ppm::ZERO), // 0.25%
            default_trading_fee_ppm: Ppm::new(2_000).unwrap_or(Ppm::ZERO), // 0.2%
            network_fee_ppm: Ppm::new(200_000).unwrap_or(Ppm::ZERO), // 20% of the fee
        }
    }
}

impl NetworkSettings {
    pub fn is_whitelisted(&self, asset: AssetId) -> bool {
        self.whitelist.contains(&asset)
    }

    /// Returns false when the asset was already listed.
    pub fn add_to_whitelist(&mut self, asset: AssetId) -> bool {
        self.whitelist.insert(asset)
    }

    pub fn remove_from_whitelist(&mut self, asset: AssetId) -> bool {
        self.whitelist.remove(&asset)
    }

    pub fn whitelist(&self) -> impl Iterator<Item = &AssetId> {
        self.whitelist.iter()
    }

    /// Reserve units that may be lent into `pool`. Unset limits are zero.
    pub fn funding_limit(&self, pool: AssetId) -> Amount {
        self.funding_limits.get(&pool).copied().unwrap_or(0)
    }

    /// Returns the previous limit.
    pub fn set_funding_limit(&mut self, pool: AssetId, limit: Amount) -> Amount {
        self.funding_limits.insert(pool, limit).unwrap_or(0)
    }

    pub fn min_liquidity_for_trading(&self) -> Amount {
        self.min_liquidity_for_trading
    }

    pub fn withdrawal_fee_ppm(&self) -> Ppm {
        self.withdrawal_fee_ppm
    }

    pub fn trading_fee_default_ppm(&self) -> Ppm {
        self.default_trading_fee_ppm
    }

    pub fn network_fee_ppm(&self) -> Ppm {
        self.network_fee_ppm
    }
}

/** 7.2: engine constants. changing these is a redeploy, not an admin call */
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProtocolParams {
    // reserve trading liquidity grows at most this many times per deposit
    pub liquidity_growth_factor: u32,
    // enable_trading bootstraps min_liquidity * this
    pub bootstrap_liquidity_buffer_factor: u32,
    // spot may drift this far from the EMA before withdrawals are refused
    pub rate_max_deviation_ppm: Ppm,
    pub ema_weights: EmaWeights,
    // withdrawal cooldown
    pub lock_duration_secs: i64,
    // events retained in memory
    pub max_events: usize,
}

impl Default for ProtocolParams {
    fn default() -> Self {
        Self {
            liquidity_growth_factor: 2,
            bootstrap_liquidity_buffer_factor: 2,
            rate_max_deviation_ppm: Ppm::new(10_000).unwrap_or(Ppm::ZERO), // 1%
            ema_weights: EmaWeights::default(),
            lock_duration_secs: 7 * DAY_SECS,
            max_events: 100_000,
        }
    }
}

// The complete ledger configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerConfig {
    // the central asset every pool is funded in
    pub reserve_asset: AssetId,
    pub settings: NetworkSettings,
    pub params: ProtocolParams,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            reserve_asset: AssetId(0),
            settings: NetworkSettings::default(),
            params: ProtocolParams::default(),
        }
    }
}

impl LedgerConfig {
    // short cooldown and a low trading threshold for testnets
    pub fn testnet() -> Self {
        let mut config = Self::default();
        config.params.lock_duration_secs = 60 * 60; // 1 hour
        config.settings.min_liquidity_for_trading = 100;
        config.settings.withdrawal_fee_ppm = Ppm::ZERO;
        config
    }

    // mainnet: tighter rate guard, full week cooldown
    pub fn mainnet() -> Self {
        let mut config = Self::default();
        config.params.rate_max_deviation_ppm = Ppm::new(5_000).unwrap_or(Ppm::ZERO); // 0.5%
        config.settings.min_liquidity_for_trading = 10_000;
        config
    }

    // no fees, no cooldown. keeps arithmetic in tests exact
    pub fn feeless() -> Self {
        let mut config = Self::default();
        config.settings.withdrawal_fee_ppm = Ppm::ZERO;
        config.settings.default_trading_fee_ppm = Ppm::ZERO;
        config.settings.network_fee_ppm = Ppm::ZERO;
        config.params.lock_duration_secs = 0;
        config
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.settings.min_liquidity_for_trading == 0 {
            return Err(ConfigError::InvalidSettings {
                reason: "Minimum liquidity for trading must be positive".to_string(),
            });
        }

        // a 100% trading fee would leave nothing to trade by target amount
        if self.settings.default_trading_fee_ppm == Ppm::MAX {
            return Err(ConfigError::InvalidSettings {
                reason: "Default trading fee must be below 100%".to_string(),
            });
        }

        if self.params.liquidity_growth_factor < 2 || self.params.bootstrap_liquidity_buffer_factor == 0 {
            return Err(ConfigError::InvalidParams {
                reason: "Growth factor must be at least 2 and buffer factor positive".to_string(),
            });
        }

        if self.params.ema_weights.average == 0 || self.params.ema_weights.spot == 0 {
            return Err(ConfigError::InvalidParams {
                reason: "EMA weights must be positive".to_string(),
            });
        }

        if self.params.lock_duration_secs < 0 {
            return Err(ConfigError::InvalidParams {
                reason: "Lock duration cannot be negative".to_string(),
            });
        }

        if self.params.max_events == 0 {
            return Err(ConfigError::InvalidParams {
                reason: "Event retention must be positive".to_string(),
            });
        }

        Ok(())
    }
}

// Configuration validation errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid settings: {reason}")]
    InvalidSettings { reason: String },

    #[error("invalid params: {reason}")]
    InvalidParams { reason: String },
}

// Environment presets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Environment {
    Development,
    Testnet,
    Mainnet,
}

impl Environment {
    pub fn config(&self) -> LedgerConfig {
        match self {
            Environment::Development => LedgerConfig::default(),
            Environment::Testnet => LedgerConfig::testnet(),
            Environment::Mainnet => LedgerConfig::mainnet(),
        }
    }
}
