//! In-process chain: ledger plus reference collaborators driven block by block

use anyhow::{Context, Result};
use cdp_engine::{
    begin_block, open_position, Account, AuctionHouse, Bank, BlockContext, BlockError, BlockReport, Coin,
    Ledger, MemoryBank, MemoryPriceFeed, PriceFeed,
};

use crate::config::{Config, PriceSubmission};

pub struct Chain {
    pub ledger: Ledger,
    pub bank: MemoryBank,
    pub oracle: MemoryPriceFeed,
    pub auctions: AuctionHouse,
    pub height: u64,
    pub time: u64,
    pub liquidations: usize,
}

impl Chain {
    /// Build genesis state: balances, oracle prices, then positions
    pub fn genesis(config: &Config) -> Result<Self> {
        let mut chain = Self {
            ledger: Ledger::new(config.params.clone()).context("Invalid genesis params")?,
            bank: MemoryBank::new(),
            oracle: MemoryPriceFeed::new(),
            auctions: AuctionHouse::new(),
            height: 0,
            time: config.genesis_time,
            liquidations: 0,
        };

        for balance in &config.balances {
            chain
                .bank
                .mint(
                    &Account::User(balance.owner.clone()),
                    &Coin::new(&balance.denom, balance.amount),
                )
                .context(format!("Failed to fund {}", balance.owner))?;
        }

        for submission in &config.prices {
            chain.post_price(submission);
        }

        let stable = config.params.debt_param.denom.clone();
        for position in &config.positions {
            let denom = config
                .params
                .collateral_param(&position.collateral_type)?
                .denom
                .clone();
            let (ledger, mut ctx) = chain.context();
            let id = open_position(
                ledger,
                &mut ctx,
                &position.owner,
                Coin::new(denom, position.collateral),
                Coin::new(&stable, position.debt),
                &position.collateral_type,
            )
            .context(format!(
                "Failed to open genesis {} position for {}",
                position.collateral_type, position.owner
            ))?;
            log::debug!("Genesis position {} for {}", id, position.owner);
        }

        Ok(chain)
    }

    /// Post a submission at the current block time and refresh its market
    pub fn post_price(&mut self, submission: &PriceSubmission) {
        let expiry = self.time.saturating_add(submission.ttl_secs);
        self.oracle
            .post_price(&submission.market_id, &submission.oracle, submission.price, expiry);
        self.oracle.refresh_current_price(&submission.market_id, self.time);
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

    /// Advance to the next block and run the risk pipeline
    pub fn produce_block(&mut self, config: &Config) -> Result<BlockReport, BlockError> {
        self.height += 1;
        self.time = self.time.saturating_add(config.block_time_secs);

        let height = self.height;
        for scheduled in config.price_schedule.iter().filter(|p| p.height == height) {
            log::info!(
                "Posting {} = {} at height {}",
                scheduled.submission.market_id,
                scheduled.submission.price,
                self.height
            );
            self.post_price(&scheduled.submission);
        }

        let (ledger, mut ctx) = self.context();
        let report = begin_block(ledger, &mut ctx)?;
        self.liquidations += report.liquidations();
        Ok(report)
    }
}
