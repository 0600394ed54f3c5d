//! Per-block risk pipeline
//!
//! For every collateral type in configuration order: price health gate,
//! interest accrual, and on risk cycles synchronization of the riskiest
//! positions followed by liquidation. Pending auction requests are handed to
//! the scheduler once at the end of the block.

use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::auction::Auction;
use crate::error::{BlockError, Stage};
use crate::index::CollateralRatio;
use crate::interest::{accumulate_interest, synchronize_risky_positions};
use crate::liquidation::{liquidate_positions, LiquidationSummary};
use crate::price_gate::update_pricefeed_status;
use crate::state::{BlockContext, Event, Ledger};

/// Result of processing one collateral type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CollateralOutcome {
    /// Spot or liquidation market had no valid price; nothing was done
    PriceUnavailable,
    /// Interest accrued; not a risk cycle
    Accrued,
    /// Risk cycle completed
    Liquidated {
        synchronized: usize,
        summary: LiquidationSummary,
    },
    /// Liquidation price vanished between the gate and the scan
    ScanAborted { synchronized: usize },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockReport {
    pub height: u64,
    pub time: u64,
    pub risk_cycle: bool,
    /// One entry per collateral type, in configuration order
    pub outcomes: Vec<(String, CollateralOutcome)>,
    pub auctions: Vec<Auction>,
    pub events: Vec<Event>,
}

impl BlockReport {
    /// Number of positions seized in this block
    pub fn liquidations(&self) -> usize {
        self.outcomes
            .iter()
            .map(|(_, outcome)| match outcome {
                CollateralOutcome::Liquidated { summary, .. } => summary.seized.len(),
                _ => 0,
            })
            .sum()
    }
}

/// Run the risk pipeline for one block.
///
/// Returns `BlockError` for any fault other than a missing liquidation
/// price; the caller must stop producing blocks when that happens.
pub fn begin_block(ledger: &mut Ledger, ctx: &mut BlockContext<'_>) -> Result<BlockReport, BlockError> {
    let height = ctx.height;
    let params = ledger.params().clone();
    params
        .validate()
        .map_err(|e| BlockError::new(height, Stage::Params, None, e))?;

    let risk_cycle = height % params.liquidation_block_interval == 0;
    let mut outcomes = Vec::with_capacity(params.collateral_params.len());

    for cp in &params.collateral_params {
        let ty = cp.collateral_type.as_str();
        let fatal = |stage, e| BlockError::new(height, stage, Some(ty), e);

        if !update_pricefeed_status(ledger, ctx, &cp.spot_market_id)
            || !update_pricefeed_status(ledger, ctx, &cp.liquidation_market_id)
        {
            debug!("{}: no valid price, skipping at height {}", ty, height);
            outcomes.push((ty.to_string(), CollateralOutcome::PriceUnavailable));
            continue;
        }

        accumulate_interest(ledger, ty, ctx.time).map_err(|e| fatal(Stage::AccumulateInterest, e))?;

        if !risk_cycle {
            debug!("{}: height {} is not a risk cycle", ty, height);
            outcomes.push((ty.to_string(), CollateralOutcome::Accrued));
            continue;
        }

        let synchronized =
            synchronize_risky_positions(ledger, ctx, ty, cp.risk_scan_window, CollateralRatio::INFINITE)
                .map_err(|e| fatal(Stage::SynchronizeInterest, e))?;

        let outcome = match liquidate_positions(
            ledger,
            ctx,
            &cp.liquidation_market_id,
            ty,
            cp.liquidation_ratio,
            cp.risk_scan_window,
        ) {
            Ok(summary) => {
                if !summary.seized.is_empty() {
                    info!(
                        "{}: liquidated {} cdps at height {}",
                        ty,
                        summary.seized.len(),
                        height
                    );
                }
                CollateralOutcome::Liquidated { synchronized, summary }
            }
            Err(e) if e.is_tolerated() => {
                debug!("{}: {}", ty, e);
                CollateralOutcome::ScanAborted { synchronized }
            }
            Err(e) => return Err(fatal(Stage::Liquidate, e)),
        };
        outcomes.push((ty.to_string(), outcome));
    }

    let pending = ledger.take_pending_auctions();
    let auctions = ctx
        .auctions
        .start_auctions_from_pending(pending, &mut *ctx.bank, &params)
        .map_err(|e| BlockError::new(height, Stage::StartAuctions, None, e))?;

    Ok(BlockReport {
        height,
        time: ctx.time,
        risk_cycle,
        outcomes,
        auctions,
        events: ledger.take_events(),
    })
}
