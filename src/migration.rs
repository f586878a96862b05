// 12.0 migration.rs: versioned pool-collection state.
// a snapshot carries its layout version; restoring an old layout copies it field by field
// into the current one. upgrading moves every pool into a successor collection instance.

use crate::average_rate::AverageRate;
use crate::capability::{authorize, AdminCapability, Capability, FundingManagerCapability};
use crate::context::Context;
use crate::errors::LedgerError;
use crate::events::{EventPayload, PoolMigratedEvent};
use crate::pool_collection::{Pool, PoolCollection, PoolLiquidity};
use crate::types::{Amount, AssetId, PoolTokenId, Ppm};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::info;

/// Layout 1: predates deposit limits and the depositing switch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolDataV1 {
    pub pool_token: PoolTokenId,
    pub trading_fee: Ppm,
    pub trading_enabled: bool,
    pub average_rate: AverageRate,
    pub liquidity: PoolLiquidity,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolCollectionV1 {
    pub version: u16,
    pub reserve_asset: AssetId,
    pub pools: BTreeMap<AssetId, PoolDataV1>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolCollectionV2 {
    pub version: u16,
    pub reserve_asset: AssetId,
    pub pools: BTreeMap<AssetId, Pool>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PoolCollectionSnapshot {
    V1(PoolCollectionV1),
    V2(PoolCollectionV2),
}

impl PoolCollectionSnapshot {
    pub fn layout_version(&self) -> u8 {
        match self {
            PoolCollectionSnapshot::V1(_) => 1,
            PoolCollectionSnapshot::V2(_) => 2,
        }
    }

    /// Brings any layout up to the current one.
    pub fn into_latest(self) -> PoolCollectionV2 {
        match self {
            PoolCollectionSnapshot::V1(v1) => PoolCollectionV2 {
                version: v1.version,
                reserve_asset: v1.reserve_asset,
                pools: v1
                    .pools
                    .into_iter()
                    .map(|(asset, pool)| (asset, migrate_pool_v1(pool)))
                    .collect(),
            },
            PoolCollectionSnapshot::V2(v2) => v2,
        }
    }
}

fn migrate_pool_v1(pool: PoolDataV1) -> Pool {
    Pool {
        pool_token: pool.pool_token,
        trading_fee: pool.trading_fee,
        trading_enabled: pool.trading_enabled,
        depositing_enabled: true,
        average_rate: pool.average_rate,
        deposit_limit: Amount::MAX,
        liquidity: pool.liquidity,
    }
}

impl PoolCollection {
    pub fn snapshot(&self) -> PoolCollectionSnapshot {
        PoolCollectionSnapshot::V2(PoolCollectionV2 {
            version: self.version(),
            reserve_asset: self.reserve_asset(),
            pools: self.pools().map(|(asset, pool)| (*asset, pool.clone())).collect(),
        })
    }

    /// Rebuilds a collection from a snapshot of any layout.
    pub fn restore(funding_manager: FundingManagerCapability, snapshot: PoolCollectionSnapshot) -> Self {
        let state = snapshot.into_latest();
        PoolCollection::with_pools(
            funding_manager.network(),
            state.reserve_asset,
            funding_manager,
            state.version,
            state.pools,
        )
    }
}

/// Moves every pool of `current` into a successor collection one version up.
pub fn upgrade_pool_collection(
    admin: &AdminCapability,
    ctx: &mut Context<'_>,
    current: &PoolCollection,
    funding_manager: FundingManagerCapability,
) -> Result<PoolCollection, LedgerError> {
    authorize(admin, current.network())?;
    let from_version = current.version();
    let to_version = from_version
        .checked_add(1)
        .ok_or_else(|| LedgerError::InvalidParam("collection version exhausted".to_string()))?;

    let state = current.snapshot().into_latest();
    let pools: Vec<AssetId> = state.pools.keys().copied().collect();
    let successor = PoolCollection::with_pools(
        current.network(),
        state.reserve_asset,
        funding_manager,
        to_version,
        state.pools,
    );

    for pool in pools {
        ctx.emit(EventPayload::PoolMigrated(PoolMigratedEvent {
            pool,
            from_version,
            to_version,
        }));
    }
    info!(from_version, to_version, pools = successor.pool_count(), "pool collection upgraded");
    Ok(successor)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::NetworkId;
    use crate::fraction::Fraction112;
    use crate::types::BlockNumber;

    fn v1_snapshot() -> PoolCollectionSnapshot {
        let mut pools = BTreeMap::new();
        pools.insert(
            AssetId(1),
            PoolDataV1 {
                pool_token: PoolTokenId(2),
                trading_fee: Ppm::new(2_000).unwrap(),
                trading_enabled: true,
                average_rate: AverageRate::seed(BlockNumber(5), Fraction112 { n: 1, d: 2 }),
                liquidity: PoolLiquidity {
                    reserve_trading_liquidity: 2_000,
                    base_trading_liquidity: 4_000,
                    staked_balance: 10_000,
                },
            },
        );
        PoolCollectionSnapshot::V1(PoolCollectionV1 {
            version: 1,
            reserve_asset: AssetId(0),
            pools,
        })
    }

    #[test]
    fn v1_layout_migrates_with_unlimited_deposits() {
        let id = NetworkId::next();
        let collection = PoolCollection::restore(FundingManagerCapability::issue(id), v1_snapshot());

        let pool = collection.pool_data(AssetId(1)).unwrap();
        assert!(pool.depositing_enabled);
        assert_eq!(pool.deposit_limit, Amount::MAX);
        assert_eq!(pool.liquidity.staked_balance, 10_000);
        assert!(pool.trading_enabled);
        assert_eq!(collection.version(), 1);
    }

    #[test]
    fn snapshot_survives_json() {
        let snapshot = v1_snapshot();
        let json = serde_json::to_string(&snapshot).unwrap();
        let back: PoolCollectionSnapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(back.layout_version(), 1);
        assert_eq!(back, snapshot);

        let latest = PoolCollectionSnapshot::V2(back.into_latest());
        let json = serde_json::to_string(&latest).unwrap();
        let back: PoolCollectionSnapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(back.layout_version(), 2);
    }
}
