//! Per-block risk engine for collateralized debt positions
//! Deterministic, integer-only, no panics on the block path

pub mod amount;
pub mod auction;
pub mod bank;
pub mod begin_block;
pub mod error;
pub mod helpers;
pub mod index;
pub mod interest;
pub mod liquidation;
pub mod math;
pub mod oracle;
pub mod params;
pub mod positions;
pub mod price_gate;
pub mod state;

#[cfg(test)]
mod testing;

// Re-export commonly used types
pub use auction::{Auction, AuctionHouse, AuctionRequest, AuctionScheduler};
pub use bank::{Account, Bank, Coin, MemoryBank};
pub use begin_block::{begin_block, BlockReport, CollateralOutcome};
pub use error::{BlockError, CdpError, Stage};
pub use index::{CollateralRatio, RatioIndex};
pub use liquidation::{liquidate_positions, LiquidationCandidate, LiquidationSummary};
pub use math::FixedU128;
pub use oracle::{MemoryPriceFeed, PriceFeed, PriceQuote};
pub use params::{AuctionParams, CollateralTypeConfig, DebtParam, Params, DEBT_DENOM};
pub use positions::{open_position, repay};
pub use state::{BlockContext, CollateralState, Event, Ledger, Position};
