//! CDP Integration Tests
//!
//! Genesis fixtures shared by the end-to-end block scenarios: two collateral
//! types (xrp-a, btc-a), one oracle per market and a chain wrapper that
//! produces blocks through `begin_block`.


use go_rand::rand_int_between;

use cdp_engine::{
    begin_block, open_position, Account, AuctionHouse, AuctionParams, Bank, BlockContext, BlockError,
    BlockReport, CollateralTypeConfig, Coin, DebtParam, FixedU128, Ledger, MemoryBank, MemoryPriceFeed,
    Params, PriceFeed,
};

/// Debt drawn for genesis position `j` (id `j + 1`): btc-a for even `j`,
/// xrp-a for odd `j`, each from a Go `math/rand` source seeded with `j`
pub fn genesis_debt(j: usize) -> u128 {
    let (min, max) = if j % 2 == 0 {
        (2_700_000_000, 5_332_000_000)
    } else {
        (750_000_000, 1_249_000_000)
    };
    rand_int_between(j as i64, min, max) as u128
}

/// Collateral locked by every xrp-a position (10,000 xrp)
pub const XRP_COLLATERAL: u128 = 10_000_000_000;

/// Collateral locked by every btc-a position (1 btc)
pub const BTC_COLLATERAL: u128 = 100_000_000;

pub fn fx(s: &str) -> FixedU128 {
    s.parse().unwrap()
}

pub fn genesis_params() -> Params {
    Params {
        collateral_params: vec![
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
            },
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
            },
        ],
        debt_param: DebtParam::default(),
        auction: AuctionParams::default(),
        global_debt_limit: 2_000_000_000_000,
        liquidation_block_interval: 1,
    }
}

/// Ledger plus in-memory collaborators at a given block header
pub struct TestChain {
    pub ledger: Ledger,
    pub bank: MemoryBank,
    pub oracle: MemoryPriceFeed,
    pub auctions: AuctionHouse,
    pub height: u64,
    pub time: u64,
}

impl TestChain {
    /// Genesis with xrp at $0.25 and btc at $8000
    pub fn new() -> Self {
        let mut chain = Self {
            ledger: Ledger::new(genesis_params()).unwrap(),
            bank: MemoryBank::new(),
            oracle: MemoryPriceFeed::new(),
            auctions: AuctionHouse::new(),
            height: 1,
            time: 1_700_000_000,
        };
        chain.set_price("xrp:usd", "0.25");
        chain.set_price("btc:usd", "8000");
        chain
    }

    /// Post a price valid for three hours and make it current
    pub fn set_price(&mut self, market: &str, price: &str) {
        self.oracle
            .post_price(market, "oracle1", fx(price), self.time + 3 * 3_600);
        assert!(self.oracle.refresh_current_price(market, self.time));
        assert_eq!(self.oracle.current_price(market, self.time).unwrap().price, fx(price));
    }

    pub fn context(&mut self) -> (&mut Ledger, BlockContext<'_>) {
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

    /// Fund `owner` with the collateral and open a position
    pub fn open(&mut self, owner: &str, collateral: Coin, debt: u128, collateral_type: &str) -> u64 {
        self.bank
            .mint(&Account::User(owner.to_string()), &collateral)
            .unwrap();
        let (ledger, mut ctx) = self.context();
        open_position(
            ledger,
            &mut ctx,
            owner,
            collateral,
            Coin::new("usdx", debt),
            collateral_type,
        )
        .unwrap()
    }

    /// 100 positions alternating btc-a (even index) and xrp-a (odd index),
    /// debts from `genesis_debt`; position `j + 1` belongs to owner `addr{j}`
    pub fn create_cdps(&mut self) {
        for j in 0..100 {
            let owner = format!("addr{}", j);
            let debt = genesis_debt(j);
            let id = if j % 2 == 0 {
                self.open(&owner, Coin::new("btc", BTC_COLLATERAL), debt, "btc-a")
            } else {
                self.open(&owner, Coin::new("xrp", XRP_COLLATERAL), debt, "xrp-a")
            };
            assert_eq!(id, j as u64 + 1);
        }
    }

    pub fn begin_block(&mut self) -> Result<BlockReport, BlockError> {
        let (ledger, mut ctx) = self.context();
        begin_block(ledger, &mut ctx)
    }

    pub fn balance(&self, account: &Account, denom: &str) -> u128 {
        self.bank.balance(account, denom)
    }
}

impl Default for TestChain {
    fn default() -> Self {
        Self::new()
    }
}
