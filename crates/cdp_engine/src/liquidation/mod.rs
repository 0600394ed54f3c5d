//! Liquidation of under-collateralized positions

pub mod scanner;
pub mod settlement;

pub use scanner::{scan_undercollateralized, LiquidationCandidate};
pub use settlement::seize_collateral;

use serde::{Deserialize, Serialize};

use crate::error::CdpError;
use crate::math::{add_u128, FixedU128};
use crate::state::{BlockContext, Ledger};

/// What one liquidation pass did for a collateral type
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiquidationSummary {
    /// Seized position ids, riskiest first
    pub seized: Vec<u64>,
    #[serde(with = "crate::amount")]
    pub collateral: u128,
    #[serde(with = "crate::amount")]
    pub debt: u128,
}

/// Seize every position the scanner selects at the current price of
/// `market_id`.
///
/// Fails with `CdpError::NoValidPrice` before touching anything when the
/// market has no valid price.
pub fn liquidate_positions(
    ledger: &mut Ledger,
    ctx: &mut BlockContext<'_>,
    market_id: &str,
    collateral_type: &str,
    min_ratio: FixedU128,
    window: usize,
) -> Result<LiquidationSummary, CdpError> {
    let quote = ctx.oracle.current_price(market_id, ctx.time)?;
    let candidates = scan_undercollateralized(ledger, collateral_type, quote.price, min_ratio, window)?;

    let mut summary = LiquidationSummary::default();
    for candidate in candidates {
        let seized = seize_collateral(ledger, ctx, collateral_type, candidate.id)?;
        summary.collateral = add_u128(summary.collateral, seized.collateral.amount, "seized collateral")?;
        summary.debt = add_u128(summary.debt, seized.total_debt()?, "seized debt")?;
        summary.seized.push(candidate.id);
    }
    Ok(summary)
}
