//! Shared fixtures for unit tests

use crate::auction::AuctionHouse;
use crate::bank::{Account, Bank, Coin, MemoryBank};
use crate::math::FixedU128;
use crate::oracle::{MemoryPriceFeed, PriceFeed};
use crate::params::{CollateralTypeConfig, Params};
use crate::state::{BlockContext, Ledger};

pub fn fx(s: &str) -> FixedU128 {
    s.parse().unwrap()
}

pub fn xrp_type() -> CollateralTypeConfig {
    CollateralTypeConfig {
        collateral_type: "xrp-a".to_string(),
        denom: "xrp".to_string(),
        spot_market_id: "xrp:usd".to_string(),
        liquidation_market_id: "xrp:usd".to_string(),
        liquidation_ratio: fx("2.0"),
        stability_fee: fx("1.000000001547125958"),
        liquidation_penalty: fx("0.05"),
        auction_size: 7_000_000_000,
        risk_scan_window: 10,
        debt_floor: 10_000_000,
        debt_limit: 500_000_000_000,
        conversion_factor: 6,
    }
}

pub fn btc_type() -> CollateralTypeConfig {
    CollateralTypeConfig {
        collateral_type: "btc-a".to_string(),
        denom: "btc".to_string(),
        spot_market_id: "btc:usd".to_string(),
        liquidation_market_id: "btc:usd".to_string(),
        liquidation_ratio: fx("1.5"),
        stability_fee: fx("1.000000000782997609"),
        liquidation_penalty: fx("0.025"),
        auction_size: 10_000_000,
        risk_scan_window: 10,
        debt_floor: 10_000_000,
        debt_limit: 500_000_000_000,
        conversion_factor: 8,
    }
}

pub fn params() -> Params {
    Params {
        collateral_params: vec![xrp_type(), btc_type()],
        ..Params::default()
    }
}

/// Ledger plus in-memory collaborators
pub struct Harness {
    pub ledger: Ledger,
    pub bank: MemoryBank,
    pub oracle: MemoryPriceFeed,
    pub auctions: AuctionHouse,
    pub height: u64,
    pub time: u64,
}

impl Harness {
    pub fn new() -> Self {
        let mut oracle = MemoryPriceFeed::new();
        oracle.post_price("xrp:usd", "oracle1", fx("0.25"), u64::MAX);
        oracle.post_price("btc:usd", "oracle1", fx("8000"), u64::MAX);
        oracle.refresh_current_price("xrp:usd", 0);
        oracle.refresh_current_price("btc:usd", 0);
        Self {
            ledger: Ledger::new(params()).unwrap(),
            bank: MemoryBank::new(),
            oracle,
            auctions: AuctionHouse::new(),
            height: 1,
            time: 1_000,
        }
    }

    pub fn fund(&mut self, owner: &str, coin: Coin) {
        self.bank.mint(&Account::User(owner.to_string()), &coin).unwrap();
    }

    pub fn set_price(&mut self, market: &str, price: &str) {
        self.oracle.post_price(market, "oracle1", fx(price), u64::MAX);
        self.oracle.refresh_current_price(market, 0);
    }

    /// Fund `owner` and open a position for them
    pub fn open(&mut self, owner: &str, collateral: Coin, debt: u128, collateral_type: &str) -> u64 {
        self.fund(owner, collateral.clone());
        let (ledger, mut ctx) = self.split();
        crate::positions::open_position(
            ledger,
            &mut ctx,
            owner,
            collateral,
            Coin::new("usdx", debt),
            collateral_type,
        )
        .unwrap()
    }

    pub fn split(&mut self) -> (&mut Ledger, BlockContext<'_>) {
        (
            &mut self.ledger,
            BlockContext {
                height: self.height,
                time: self.time,
                bank: &mut self.bank,
                oracle: &mut self.oracle,
                auctions: &mut self.auctions,
            },
        )
    }
}
