//! JSON summary of a run

use anyhow::{Context, Result};
use cdp_engine::{Account, Auction, Bank, BlockReport, FixedU128, DEBT_DENOM};
use serde::Serialize;

use crate::chain::Chain;

#[derive(Debug, Serialize)]
pub struct CollateralSummary {
    pub collateral_type: String,
    pub open_positions: usize,
    #[serde(with = "cdp_engine::amount")]
    pub total_principal: u128,
    pub interest_factor: FixedU128,
    pub previous_accrual_time: Option<u64>,
}

#[derive(Debug, Serialize)]
pub struct RunReport {
    pub height: u64,
    pub time: u64,
    pub liquidations: usize,
    /// Set when block production stopped on a fatal error
    pub halted: Option<String>,
    pub collateral: Vec<CollateralSummary>,
    #[serde(with = "cdp_engine::amount")]
    pub cdp_debt_balance: u128,
    #[serde(with = "cdp_engine::amount")]
    pub auction_debt_balance: u128,
    pub auctions: Vec<Auction>,
    pub last_block: Option<BlockReport>,
}

impl RunReport {
    pub fn new(chain: &Chain, last_block: Option<BlockReport>, halted: Option<String>) -> Self {
        let collateral = chain
            .ledger
            .params()
            .collateral_params
            .iter()
            .map(|cp| {
                let ty = cp.collateral_type.as_str();
                CollateralSummary {
                    collateral_type: ty.to_string(),
                    open_positions: chain.ledger.positions(ty).count(),
                    total_principal: chain.ledger.total_principal(ty),
                    interest_factor: chain.ledger.interest_factor(ty),
                    previous_accrual_time: chain.ledger.previous_accrual_time(ty),
                }
            })
            .collect();

        Self {
            height: chain.height,
            time: chain.time,
            liquidations: chain.liquidations,
            halted,
            collateral,
            cdp_debt_balance: chain.bank.balance(&Account::Cdp, DEBT_DENOM),
            auction_debt_balance: chain.bank.balance(&Account::Auction, DEBT_DENOM),
            auctions: chain.auctions.auctions().to_vec(),
            last_block,
        }
    }

    pub fn write(&self, path: &str) -> Result<()> {
        let json = serde_json::to_string_pretty(self).context("Failed to serialize report")?;
        std::fs::write(path, json).context(format!("Failed to write report to {}", path))?;
        log::info!("Wrote run report to {}", path);
        Ok(())
    }
}
