// 13.4 network/trading.rs: trade routing and settlement.
// a pair containing the reserve asset trades against one pool. any other pair goes
// base -> reserve -> base through two pools; the caller's slippage limit applies to the
// trade as a whole. after the ledger is updated the trader pays into the master vault,
// is paid out of it, and every hop's network fee moves to the network fee vault.

use super::core::{Network, Parts};
use super::results::{TradeOutcome, TradeQuote};
use crate::curve::TradeAmounts;
use crate::custody::{move_between, Vault};
use crate::errors::LedgerError;
use crate::pool_collection::TradeResult;
use crate::types::{AccountId, Amount, AssetId};
use tracing::debug;

impl Network {
    /** 13.4.1: exact input. fails if the output is below `min_return` */
    pub fn trade_by_source_amount(
        &mut self,
        trader: AccountId,
        source: AssetId,
        target: AssetId,
        source_amount: Amount,
        min_return: Amount,
    ) -> Result<TradeOutcome, LedgerError> {
        let reserve = self.reserve_asset;
        self.transact("trade_by_source_amount", |cap, state| {
            if trader.is_protocol() {
                return Err(LedgerError::InvalidAddress);
            }
            let mut parts = state.parts();
            let hops = if source == reserve || target == reserve {
                vec![parts.pool_collection.trade_by_source_amount(
                    cap,
                    &mut parts.ctx,
                    parts.funding_pool,
                    trader,
                    source,
                    target,
                    source_amount,
                    min_return,
                )?]
            } else {
                if min_return == 0 {
                    return Err(LedgerError::ZeroValue);
                }
                let first = parts.pool_collection.trade_by_source_amount(
                    cap,
                    &mut parts.ctx,
                    parts.funding_pool,
                    trader,
                    source,
                    reserve,
                    source_amount,
                    1,
                )?;
                let second = parts.pool_collection.trade_by_source_amount(
                    cap,
                    &mut parts.ctx,
                    parts.funding_pool,
                    trader,
                    reserve,
                    target,
                    first.amounts.target_amount,
                    min_return,
                )?;
                vec![first, second]
            };
            settle(&mut parts, trader, hops)
        })
    }

    /** 13.4.2: exact output. fails if the required input exceeds `max_source` */
    pub fn trade_by_target_amount(
        &mut self,
        trader: AccountId,
        source: AssetId,
        target: AssetId,
        target_amount: Amount,
        max_source: Amount,
    ) -> Result<TradeOutcome, LedgerError> {
        let reserve = self.reserve_asset;
        self.transact("trade_by_target_amount", |cap, state| {
            if trader.is_protocol() {
                return Err(LedgerError::InvalidAddress);
            }
            let mut parts = state.parts();
            let hops = if source == reserve || target == reserve {
                vec![parts.pool_collection.trade_by_target_amount(
                    cap,
                    &mut parts.ctx,
                    parts.funding_pool,
                    trader,
                    source,
                    target,
                    target_amount,
                    max_source,
                )?]
            } else {
                // the reserve the second pool needs is what the first must produce
                let needed = parts
                    .pool_collection
                    .trade_input_and_fee_by_target_amount(parts.ctx.settings, reserve, target, target_amount)?;
                let first = parts.pool_collection.trade_by_target_amount(
                    cap,
                    &mut parts.ctx,
                    parts.funding_pool,
                    trader,
                    source,
                    reserve,
                    needed.source_amount,
                    max_source,
                )?;
                let second = parts.pool_collection.trade_by_target_amount(
                    cap,
                    &mut parts.ctx,
                    parts.funding_pool,
                    trader,
                    reserve,
                    target,
                    target_amount,
                    first.amounts.target_amount,
                )?;
                vec![first, second]
            };
            settle(&mut parts, trader, hops)
        })
    }

    /// Output and fees for selling `source_amount`, without trading.
    pub fn quote_by_source_amount(
        &self,
        source: AssetId,
        target: AssetId,
        source_amount: Amount,
    ) -> Result<TradeQuote, LedgerError> {
        let reserve = self.reserve_asset;
        let pools = &self.state.pool_collection;
        let settings = &self.state.settings;
        let hops = if source == reserve || target == reserve {
            vec![pools.trade_output_and_fee_by_source_amount(settings, source, target, source_amount)?]
        } else {
            let first = pools.trade_output_and_fee_by_source_amount(settings, source, reserve, source_amount)?;
            let second =
                pools.trade_output_and_fee_by_source_amount(settings, reserve, target, first.target_amount)?;
            vec![first, second]
        };
        Ok(quote(hops))
    }

    /// Input and fees for buying exactly `target_amount`, without trading.
    pub fn quote_by_target_amount(
        &self,
        source: AssetId,
        target: AssetId,
        target_amount: Amount,
    ) -> Result<TradeQuote, LedgerError> {
        let reserve = self.reserve_asset;
        let pools = &self.state.pool_collection;
        let settings = &self.state.settings;
        let hops = if source == reserve || target == reserve {
            vec![pools.trade_input_and_fee_by_target_amount(settings, source, target, target_amount)?]
        } else {
            let second = pools.trade_input_and_fee_by_target_amount(settings, reserve, target, target_amount)?;
            let first = pools.trade_input_and_fee_by_target_amount(settings, source, reserve, second.source_amount)?;
            vec![first, second]
        };
        Ok(quote(hops))
    }
}

fn quote(hops: Vec<TradeAmounts>) -> TradeQuote {
    TradeQuote {
        source_amount: hops.first().map(|hop| hop.source_amount).unwrap_or(0),
        target_amount: hops.last().map(|hop| hop.target_amount).unwrap_or(0),
        hops,
    }
}

// moves the assets of trades already applied to the ledger
fn settle(parts: &mut Parts<'_>, trader: AccountId, hops: Vec<TradeResult>) -> Result<TradeOutcome, LedgerError> {
    let (source_asset, source_amount) = match hops.first() {
        Some(hop) => (hop.source_asset, hop.amounts.source_amount),
        None => return Err(LedgerError::InvalidPool),
    };
    let (target_asset, target_amount) = match hops.last() {
        Some(hop) => (hop.target_asset, hop.amounts.target_amount),
        None => return Err(LedgerError::InvalidPool),
    };

    parts
        .wallets
        .pay_into(trader, parts.ctx.master_vault, source_asset, source_amount)?;
    parts
        .ctx
        .master_vault
        .withdraw_funds(target_asset, target_amount, parts.wallets, trader)?;
    for hop in &hops {
        move_between(
            parts.ctx.master_vault,
            parts.network_fee_vault,
            hop.target_asset,
            hop.amounts.network_fee,
        )?;
    }

    debug!(%trader, %source_asset, %target_asset, source_amount, target_amount, hops = hops.len(), "trade settled");
    Ok(TradeOutcome {
        source_asset,
        target_asset,
        source_amount,
        target_amount,
        hops,
    })
}

#[cfg(test)]
mod tests {
    use crate::capability::AdminCapability;
    use crate::config::LedgerConfig;
    use crate::errors::LedgerError;
    use crate::network::Network;
    use crate::types::{AccountId, AssetId, Timestamp};

    const BNT: AssetId = AssetId(0);
    const LINK: AssetId = AssetId(1);
    const USDC: AssetId = AssetId(2);
    const ALICE: AccountId = AccountId(10);
    const BOB: AccountId = AccountId(11);

    // two pools, each bootstrapped at 2000 BNT / 4000 base over 100000 staked
    fn two_pools(config: LedgerConfig) -> (Network, AdminCapability) {
        let (mut network, admin) = Network::new(config, Timestamp::from_secs(0)).unwrap();
        for asset in [LINK, USDC] {
            network.add_token_to_whitelist(&admin, asset).unwrap();
            network.set_funding_limit(&admin, asset, 1_000_000).unwrap();
            network.create_pool(&admin, asset).unwrap();
            network.set_deposit_limit(&admin, asset, u128::MAX).unwrap();
            network.fund_wallet(&admin, ALICE, asset, 100_000).unwrap();
            network.deposit(ALICE, asset, 100_000).unwrap();
            network.enable_trading(&admin, asset, 1, 2).unwrap();
            network.fund_wallet(&admin, BOB, asset, 10_000).unwrap();
        }
        network.fund_wallet(&admin, BOB, BNT, 10_000).unwrap();
        (network, admin)
    }

    #[test]
    fn single_hop_settles_vaults_and_wallets() {
        let (mut network, admin) = two_pools(LedgerConfig::default());
        network.set_trading_fee(&admin, LINK, 10_000).unwrap();

        let outcome = network.trade_by_source_amount(BOB, BNT, LINK, 500, 1).unwrap();
        // gross 800, fee 8 of which 1 is skimmed
        assert_eq!(outcome.target_amount, 792);
        assert_eq!(outcome.hops.len(), 1);
        assert_eq!(outcome.network_fees().collect::<Vec<_>>(), vec![(LINK, 1)]);

        assert_eq!(network.wallet_balance(BOB, BNT), 9_500);
        assert_eq!(network.wallet_balance(BOB, LINK), 10_792);
        assert_eq!(network.master_vault_balance(BNT), 4_500);
        assert_eq!(network.master_vault_balance(LINK), 100_000 - 792 - 1);
        assert_eq!(network.network_fee_vault_balance(LINK), 1);

        let liquidity = network.pool_collection().pool_liquidity(LINK).unwrap();
        assert_eq!(liquidity.reserve_trading_liquidity, 2_500);
        assert_eq!(liquidity.base_trading_liquidity, 4_000 - 793);
        assert_eq!(liquidity.staked_balance, 100_007);
    }

    #[test]
    fn two_hop_by_source_routes_through_reserve() {
        let (mut network, _admin) = two_pools(LedgerConfig::feeless());

        let quote = network.quote_by_source_amount(LINK, USDC, 1_000).unwrap();
        assert_eq!(quote.hops[0].target_amount, 400);
        assert_eq!(quote.target_amount, 666);

        let outcome = network.trade_by_source_amount(BOB, LINK, USDC, 1_000, 666).unwrap();
        assert_eq!(outcome.target_amount, 666);
        assert_eq!(outcome.hops.len(), 2);
        assert_eq!(network.wallet_balance(BOB, LINK), 9_000);
        assert_eq!(network.wallet_balance(BOB, USDC), 10_666);
        assert_eq!(network.wallet_balance(BOB, BNT), 10_000);
        // the intermediate reserve only moved between pools
        assert_eq!(network.master_vault_balance(BNT), 4_000);

        let link = network.pool_collection().pool_liquidity(LINK).unwrap();
        let usdc = network.pool_collection().pool_liquidity(USDC).unwrap();
        assert_eq!(link.reserve_trading_liquidity, 1_600);
        assert_eq!(usdc.reserve_trading_liquidity, 2_400);
    }

    #[test]
    fn two_hop_slippage_undoes_first_hop() {
        let (mut network, _admin) = two_pools(LedgerConfig::feeless());
        let before = network.pool_collection().pool_liquidity(LINK).unwrap();
        let events_before = network.events().len();

        assert_eq!(
            network.trade_by_source_amount(BOB, LINK, USDC, 1_000, 667),
            Err(LedgerError::InsufficientTargetAmount)
        );
        assert_eq!(network.pool_collection().pool_liquidity(LINK).unwrap(), before);
        assert_eq!(network.events().len(), events_before);
        assert_eq!(network.wallet_balance(BOB, LINK), 10_000);
    }

    #[test]
    fn two_hop_by_target_amount() {
        let (mut network, _admin) = two_pools(LedgerConfig::feeless());

        let quote = network.quote_by_target_amount(LINK, USDC, 666).unwrap();
        assert_eq!(quote.hops[1].source_amount, 400);
        assert_eq!(quote.source_amount, 1_000);

        assert_eq!(
            network.trade_by_target_amount(BOB, LINK, USDC, 666, 999),
            Err(LedgerError::InsufficientSourceAmount)
        );
        let outcome = network.trade_by_target_amount(BOB, LINK, USDC, 666, 1_000).unwrap();
        assert_eq!(outcome.source_amount, 1_000);
        assert_eq!(network.wallet_balance(BOB, USDC), 10_666);
    }

    #[test]
    fn trader_must_afford_the_source() {
        let (mut network, _admin) = two_pools(LedgerConfig::feeless());
        let carol = AccountId(12);
        assert_eq!(
            network.trade_by_source_amount(carol, BNT, LINK, 100, 1),
            Err(LedgerError::InsufficientBalance)
        );
        assert_eq!(
            network.trade_by_source_amount(AccountId::NETWORK, BNT, LINK, 100, 1),
            Err(LedgerError::InvalidAddress)
        );
    }
}
