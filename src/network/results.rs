// 13.0.1: result types for network calls.

use crate::curve::TradeAmounts;
use crate::pool_collection::TradeResult;
use crate::types::{Amount, AssetId};
use serde::{Deserialize, Serialize};

/// A completed trade. Two hops when neither side is the reserve asset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradeOutcome {
    pub source_asset: AssetId,
    pub target_asset: AssetId,
    pub source_amount: Amount,
    pub target_amount: Amount,
    pub hops: Vec<TradeResult>,
}

impl TradeOutcome {
    pub fn network_fees(&self) -> impl Iterator<Item = (AssetId, Amount)> + '_ {
        self.hops.iter().map(|hop| (hop.target_asset, hop.amounts.network_fee))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradeQuote {
    pub source_amount: Amount,
    pub target_amount: Amount,
    pub hops: Vec<TradeAmounts>,
}
