//! End-to-end block scenarios

use std::cell::Cell;

use cdp_engine::helpers::ledger_ok;
use cdp_engine::liquidation::seize_collateral;
use cdp_engine::{
    begin_block, Account, BlockContext, CdpError, CollateralOutcome, Coin, Event, MemoryPriceFeed, PriceFeed,
    PriceQuote, Stage, DEBT_DENOM,
};
use cdp_integration_tests::*;

fn init_logging() {
    let _ = env_logger::builder()
        .is_test(true)
        .filter_level(log::LevelFilter::Debug)
        .try_init();
}

fn seized(chain: &TestChain, denom: &str, before: u128, per_position: u128) -> u128 {
    (before - chain.balance(&Account::Cdp, denom)) / per_position
}

#[test]
fn test_begin_block_liquidates_riskiest_window() {
    init_logging();
    let mut chain = TestChain::new();
    chain.create_cdps();

    let xrp_before = chain.balance(&Account::Cdp, "xrp");
    chain.set_price("xrp:usd", "0.2");
    let report = chain.begin_block().unwrap();
    assert_eq!(seized(&chain, "xrp", xrp_before, XRP_COLLATERAL), 10);
    assert_eq!(report.liquidations(), 10);

    // the ten largest xrp debts go first
    match &report.outcomes[0].1 {
        CollateralOutcome::Liquidated { summary, .. } => {
            let mut ids = summary.seized.clone();
            ids.sort();
            assert_eq!(ids, vec![8, 14, 26, 30, 34, 48, 52, 66, 70, 86]);
            assert_eq!(summary.debt, 12_036_020_394);
        }
        other => panic!("unexpected outcome {:?}", other),
    }

    let btc_before = chain.balance(&Account::Cdp, "btc");
    chain.set_price("btc:usd", "6000");
    chain.begin_block().unwrap();
    assert_eq!(seized(&chain, "btc", btc_before, BTC_COLLATERAL), 10);
    assert_eq!(seized(&chain, "xrp", xrp_before, XRP_COLLATERAL), 20);

    assert_eq!(chain.balance(&Account::Auction, DEBT_DENOM), 71_955_653_865);
    assert!(ledger_ok(&chain.ledger, &chain.bank));
}

#[test]
fn test_seize_single_cdp_with_fees() {
    init_logging();
    let mut chain = TestChain::new();
    let id = chain.open("addr0", Coin::new("xrp", 10_000_000_000), 1_000_000_000, "xrp-a");
    assert_eq!(chain.ledger.total_principal("xrp-a"), 1_000_000_000);
    assert_eq!(chain.balance(&Account::Cdp, DEBT_DENOM), 1_000_000_000);

    for _ in 0..100 {
        chain.time += 6;
        chain.begin_block().unwrap();
    }
    assert_eq!(chain.balance(&Account::Cdp, DEBT_DENOM), 1_000_000_891);
    assert_eq!(chain.ledger.total_principal("xrp-a"), 1_000_000_891);
    assert_eq!(chain.balance(&Account::Liquidator, "usdx"), 891);

    let (ledger, mut ctx) = chain.context();
    seize_collateral(ledger, &mut ctx, "xrp-a", id).unwrap();
    assert!(chain.ledger.position("xrp-a", id).is_none());
    assert!(ledger_ok(&chain.ledger, &chain.bank));
}

#[test]
fn test_begin_block_runs_only_on_configured_interval() {
    init_logging();
    let mut chain = TestChain::new();
    chain.create_cdps();
    let mut params = chain.ledger.params().clone();
    params.liquidation_block_interval = 2;
    chain.ledger.set_params(params).unwrap();

    let xrp_before = chain.balance(&Account::Cdp, "xrp");
    chain.set_price("xrp:usd", "0.2");

    let report = chain.begin_block().unwrap();
    assert!(!report.risk_cycle);
    assert_eq!(seized(&chain, "xrp", xrp_before, XRP_COLLATERAL), 0);
    assert!(report
        .outcomes
        .iter()
        .all(|(_, outcome)| *outcome == CollateralOutcome::Accrued));

    chain.height = 2;
    chain.begin_block().unwrap();
    assert!(seized(&chain, "xrp", xrp_before, XRP_COLLATERAL) > 0);
}

#[test]
fn test_off_cycle_blocks_accrue_interest() {
    let mut chain = TestChain::new();
    let id = chain.open("addr0", Coin::new("xrp", 10_000_000_000), 1_000_000_000, "xrp-a");
    let mut params = chain.ledger.params().clone();
    params.liquidation_block_interval = 1_000;
    chain.ledger.set_params(params).unwrap();

    chain.begin_block().unwrap();
    let start = chain.ledger.interest_factor("xrp-a");
    for _ in 0..10 {
        chain.height += 1;
        chain.time += 6;
        chain.begin_block().unwrap();
    }

    assert!(chain.ledger.interest_factor("xrp-a") > start);
    assert!(chain.ledger.accrued_debt("xrp-a", id).unwrap() > 1_000_000_000);
    // nothing realised: no synchronization off cycle
    let position = chain.ledger.position("xrp-a", id).unwrap();
    assert_eq!(position.total_debt().unwrap(), 1_000_000_000);
    assert_eq!(chain.balance(&Account::Liquidator, "usdx"), 0);
}

#[test]
fn test_missing_price_never_liquidates() {
    init_logging();
    let mut chain = TestChain::new();
    chain.create_cdps();
    chain.set_price("xrp:usd", "0.2");
    chain.oracle.clear_market("xrp:usd");

    let xrp_before = chain.balance(&Account::Cdp, "xrp");
    let report = chain.begin_block().unwrap();
    assert_eq!(report.outcomes[0].1, CollateralOutcome::PriceUnavailable);
    assert_eq!(seized(&chain, "xrp", xrp_before, XRP_COLLATERAL), 0);
    assert!(report.events.contains(&Event::MarketStatus {
        market_id: "xrp:usd".to_string(),
        up: false
    }));
}

#[test]
fn test_expired_price_never_liquidates() {
    let mut chain = TestChain::new();
    chain.create_cdps();
    chain.set_price("xrp:usd", "0.2");
    chain.time += 3 * 3_600;

    let report = chain.begin_block().unwrap();
    assert_eq!(report.liquidations(), 0);
    assert_eq!(report.outcomes[0].1, CollateralOutcome::PriceUnavailable);
}

/// Oracle that stops answering after a fixed number of price reads
struct FlakyFeed {
    inner: MemoryPriceFeed,
    reads_left: Cell<u32>,
}

impl PriceFeed for FlakyFeed {
    fn refresh_current_price(&mut self, market_id: &str, now: u64) -> bool {
        self.inner.refresh_current_price(market_id, now)
    }

    fn current_price(&self, market_id: &str, now: u64) -> Result<PriceQuote, CdpError> {
        let left = self.reads_left.get();
        if left == 0 {
            return Err(CdpError::NoValidPrice(market_id.to_string()));
        }
        self.reads_left.set(left - 1);
        self.inner.current_price(market_id, now)
    }
}

#[test]
fn test_price_lost_during_scan_is_tolerated() {
    let mut chain = TestChain::new();
    chain.create_cdps();
    chain.set_price("xrp:usd", "0.2");

    // the gate reads xrp:usd twice (spot and liquidation market)
    let mut oracle = FlakyFeed {
        inner: chain.oracle.clone(),
        reads_left: Cell::new(2),
    };
    let mut ctx = BlockContext {
        height: chain.height,
        time: chain.time,
        bank: &mut chain.bank,
        oracle: &mut oracle,
        auctions: &mut chain.auctions,
    };
    let report = begin_block(&mut chain.ledger, &mut ctx).unwrap();

    assert!(matches!(
        report.outcomes[0].1,
        CollateralOutcome::ScanAborted { .. }
    ));
    assert_eq!(report.outcomes[1].1, CollateralOutcome::PriceUnavailable);
    assert_eq!(report.liquidations(), 0);
    assert_eq!(chain.ledger.positions("xrp-a").count(), 50);
}

#[test]
fn test_backwards_block_time_halts() {
    let mut chain = TestChain::new();
    chain.create_cdps();
    chain.begin_block().unwrap();

    chain.height += 1;
    chain.time -= 1;
    let err = chain.begin_block().unwrap_err();
    assert_eq!(err.stage, Stage::AccumulateInterest);
    assert_eq!(err.height, 2);
    assert!(matches!(err.source, CdpError::NegativeElapsedTime { .. }));
}

#[test]
fn test_dust_positions_survive_crash() {
    let mut chain = TestChain::new();
    let dust = chain.open("dust", Coin::new("xrp", 100_000_000), 12_000_000, "xrp-a");
    let big = chain.open("big", Coin::new("xrp", 10_000_000_000), 1_100_000_000, "xrp-a");
    let mut params = chain.ledger.params().clone();
    params.collateral_params[0].debt_floor = 20_000_000;
    chain.ledger.set_params(params).unwrap();

    chain.set_price("xrp:usd", "0.01");
    let report = chain.begin_block().unwrap();
    assert_eq!(report.liquidations(), 1);
    assert!(chain.ledger.position("xrp-a", dust).is_some());
    assert!(chain.ledger.position("xrp-a", big).is_none());
}
