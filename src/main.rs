//! Liquidity ledger simulation.
//!
//! Walks one network through its lifecycle: pool bootstrap, liquidity growth, trades,
//! the EMA withdrawal guard, cooldown withdrawals, funding limits and a two-hop trade.
//! Set `RUST_LOG=liquidity_ledger=debug` to see the ledger's own logs.

use liquidity_ledger::*;
use rust_decimal::Decimal;
use tracing_subscriber::EnvFilter;

const BNT: AssetId = AssetId(0);
const LINK: AssetId = AssetId(1);
const USDC: AssetId = AssetId(2);

const ALICE: AccountId = AccountId(100);
const BOB: AccountId = AccountId(101);
const CAROL: AccountId = AccountId(102);
const DAVE: AccountId = AccountId(103);

fn main() -> Result<(), LedgerError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    println!("Liquidity Ledger Simulation");
    println!("Reserve asset funded pools, EMA guard, withdrawal cooldown\n");

    let (mut network, admin) = Network::new(Environment::Development.config(), Timestamp::now())?;

    scenario_1_bootstrap(&mut network, &admin)?;
    scenario_2_trading(&mut network, &admin)?;
    scenario_3_rate_guard_and_cooldown(&mut network, &admin)?;
    scenario_4_reserve_providers(&mut network, &admin)?;
    scenario_5_funding_limit(&mut network, &admin)?;
    scenario_6_two_hop(&mut network, &admin)?;

    println!("\nEvents recorded: {}", network.events().len());
    println!("All simulations completed successfully.");
    Ok(())
}

fn print_pool(network: &Network, pool: AssetId) -> Result<(), LedgerError> {
    let liquidity = network.pool_collection().pool_liquidity(pool)?;
    let spot = liquidity.spot_rate().to_decimal().unwrap_or(Decimal::ZERO);
    println!(
        "  pool {}: reserve TL {}, base TL {}, staked {}, funding {}/{}, spot {:.4}",
        pool,
        liquidity.reserve_trading_liquidity,
        liquidity.base_trading_liquidity,
        liquidity.staked_balance,
        network.current_funding(pool),
        network.funding_limit(pool),
        spot,
    );
    Ok(())
}

/// Whitelisting, pool creation, first deposit and the trading bootstrap.
fn scenario_1_bootstrap(network: &mut Network, admin: &AdminCapability) -> Result<(), LedgerError> {
    println!("Scenario 1: Pool Bootstrap\n");

    network.add_token_to_whitelist(admin, LINK)?;
    network.set_funding_limit(admin, LINK, 10_000_000)?;
    let pool_token = network.create_pool(admin, LINK)?;
    network.set_deposit_limit(admin, LINK, Amount::MAX)?;
    println!("  LINK whitelisted, pool token {:?}, funding limit 10,000,000", pool_token);

    network.fund_wallet(admin, ALICE, LINK, 1_000_000)?;
    let shares = network.deposit(ALICE, LINK, 1_000_000)?;
    println!("  Alice deposits 1,000,000 LINK, receives {} shares", shares);

    network.enable_trading(admin, LINK, 1, 2)?;
    println!("  Trading enabled at 1 BNT = 2 LINK");
    print_pool(network, LINK)?;

    network.fund_wallet(admin, BOB, LINK, 500_000)?;
    network.deposit(BOB, LINK, 500_000)?;
    println!("  Bob deposits 500,000 LINK, trading liquidity grows by at most the growth factor");
    print_pool(network, LINK)?;
    println!();
    Ok(())
}

/// Trades in both directions, with the fee split.
fn scenario_2_trading(network: &mut Network, admin: &AdminCapability) -> Result<(), LedgerError> {
    println!("Scenario 2: Trading\n");

    network.fund_wallet(admin, CAROL, BNT, 100_000)?;
    let quote = network.quote_by_source_amount(BNT, LINK, 1_000)?;
    println!("  Quote: 1,000 BNT buys {} LINK", quote.target_amount);

    network.advance(1, 12);
    let bought = network.trade_by_source_amount(CAROL, BNT, LINK, 1_000, quote.target_amount)?;
    let fee = &bought.hops[0].amounts;
    println!(
        "  Carol buys {} LINK for 1,000 BNT (trading fee {}, network fee {})",
        bought.target_amount, fee.trading_fee, fee.network_fee
    );

    network.advance(1, 12);
    let sold = network.trade_by_source_amount(CAROL, LINK, BNT, bought.target_amount, 1)?;
    println!("  Carol sells them back for {} BNT", sold.target_amount);
    print_pool(network, LINK)?;

    match network.trade_by_source_amount(CAROL, BNT, LINK, 1_000, 1_000_000) {
        Ok(_) => println!("  Slippage check missed"),
        Err(err) => println!("  Asking 1,000,000 LINK for 1,000 BNT fails: {}", err),
    }
    println!();
    Ok(())
}

/// Tiny trades over `blocks` blocks pull the average rate back to spot.
fn settle_rate(network: &mut Network, blocks: u32) -> Result<(), LedgerError> {
    for _ in 0..blocks {
        network.advance(1, 12);
        network.trade_by_source_amount(CAROL, BNT, LINK, 1, 1)?;
    }
    Ok(())
}

/// A request waits out the cooldown; a rate moved in the current block blocks the payout.
fn scenario_3_rate_guard_and_cooldown(network: &mut Network, admin: &AdminCapability) -> Result<(), LedgerError> {
    println!("Scenario 3: Withdrawal Cooldown and Rate Guard\n");

    let pool_token = network.pool_token_of(LINK)?;
    let id = network.initiate_withdrawal(ALICE, pool_token, 100_000)?;
    println!("  Alice requests withdrawal #{} of 100,000 shares", id.0);

    match network.withdraw(ALICE, id) {
        Ok(_) => println!("  Withdrawal went through before the cooldown"),
        Err(err) => println!("  Immediate withdrawal refused: {}", err),
    }

    let lock = network.pending_withdrawals().lock_duration_secs();
    network.advance(1, lock);
    println!("  {} seconds later the request is {:?}", lock, network.withdrawal_status(id));

    network.fund_wallet(admin, BOB, LINK, 2_000)?;
    let sale = network.trade_by_source_amount(BOB, LINK, BNT, 2_000, 1)?;
    println!("  Bob dumps 2,000 LINK for {} BNT in the same block", sale.target_amount);
    match network.withdraw(ALICE, id) {
        Ok(_) => println!("  Withdrawal went through despite the rate move"),
        Err(err) => println!("  Withdrawal refused: {}", err),
    }

    settle_rate(network, 40)?;
    println!("  40 blocks of small trades later:");
    match network.withdraw(ALICE, id) {
        Ok(amounts) => println!(
            "  Alice receives {} LINK (fee {}, {} from protection vault)",
            amounts.base_amount, amounts.withdrawal_fee, amounts.from_protection_vault
        ),
        Err(err) => println!("  Withdrawal still refused: {}", err),
    }
    print_pool(network, LINK)?;
    println!();
    Ok(())
}

/// Reserve-asset providers deposit into the funding pool and earn reserve-side fees.
fn scenario_4_reserve_providers(network: &mut Network, admin: &AdminCapability) -> Result<(), LedgerError> {
    println!("Scenario 4: Reserve Providers and Trading Fees\n");

    network.fund_wallet(admin, DAVE, BNT, 50_000)?;
    let shares = network.deposit(DAVE, BNT, 50_000)?;
    println!(
        "  Dave deposits 50,000 BNT, receives {} shares and {} governance tokens",
        shares,
        network.funding_pool().governance_token().balance_of(DAVE)
    );

    for round in 0..5 {
        network.advance(1, 12);
        let bought = network.trade_by_source_amount(CAROL, BNT, LINK, 200, 1)?;
        network.advance(1, 12);
        let sold = network.trade_by_source_amount(CAROL, LINK, BNT, bought.target_amount, 1)?;
        println!(
            "  Round {}: 200 BNT -> {} LINK -> {} BNT",
            round + 1,
            bought.target_amount,
            sold.target_amount
        );
    }

    let value = network.pool_token_to_underlying(BNT, shares)?;
    println!("  Dave's shares are now worth {} BNT", value);
    println!(
        "  Network fee vault: {} BNT, {} LINK",
        network.network_fee_vault_balance(BNT),
        network.network_fee_vault_balance(LINK)
    );
    print_pool(network, LINK)?;
    println!();
    Ok(())
}

/// Lowering a funding limit shrinks the pool at its next liquidity update.
fn scenario_5_funding_limit(network: &mut Network, admin: &AdminCapability) -> Result<(), LedgerError> {
    println!("Scenario 5: Funding Limits\n");

    let current = network.current_funding(LINK);
    network.set_funding_limit(admin, LINK, current / 2)?;
    println!(
        "  Funding limit lowered to {}, available funding {}",
        network.funding_limit(LINK),
        network.available_funding(LINK)
    );

    settle_rate(network, 40)?;

    network.fund_wallet(admin, BOB, LINK, 1_000)?;
    network.deposit(BOB, LINK, 1_000)?;
    println!("  Bob deposits 1,000 LINK; the pool moves toward the new limit");
    print_pool(network, LINK)?;

    network.disable_trading(admin, LINK)?;
    println!("  Admin disables trading; remaining funding is renounced");
    print_pool(network, LINK)?;
    println!();
    Ok(())
}

/// LINK -> USDC routes through the reserve asset.
fn scenario_6_two_hop(network: &mut Network, admin: &AdminCapability) -> Result<(), LedgerError> {
    println!("Scenario 6: Two-Hop Trade\n");

    network.set_funding_limit(admin, LINK, 10_000_000)?;
    network.enable_trading(admin, LINK, 1, 2)?;

    network.add_token_to_whitelist(admin, USDC)?;
    network.set_funding_limit(admin, USDC, 10_000_000)?;
    network.create_pool(admin, USDC)?;
    network.set_deposit_limit(admin, USDC, Amount::MAX)?;
    network.fund_wallet(admin, ALICE, USDC, 1_000_000)?;
    network.deposit(ALICE, USDC, 1_000_000)?;
    network.enable_trading(admin, USDC, 1, 1)?;
    print_pool(network, LINK)?;
    print_pool(network, USDC)?;

    network.fund_wallet(admin, CAROL, LINK, 1_000)?;
    network.advance(1, 12);
    let quote = network.quote_by_source_amount(LINK, USDC, 500)?;
    let outcome = network.trade_by_source_amount(CAROL, LINK, USDC, 500, quote.target_amount)?;
    println!(
        "  Carol sells {} LINK for {} USDC via {} BNT",
        outcome.source_amount, outcome.target_amount, outcome.hops[0].amounts.target_amount
    );

    match network.trade_by_source_amount(CAROL, LINK, USDC, 500, 10_000) {
        Ok(_) => println!("  Slippage check missed"),
        Err(err) => println!("  Asking 10,000 USDC for 500 LINK fails: {}", err),
    }
    Ok(())
}
