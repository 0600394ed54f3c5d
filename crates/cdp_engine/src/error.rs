//! Error types for the CDP engine
//!
//! Two fault classes flow through the pipeline:
//! - tolerated external conditions (`CdpError::NoValidPrice`), absorbed by
//!   `begin_block` for the affected collateral type only
//! - everything else, which `begin_block` wraps in a `BlockError` and returns
//!   to the harness as a halting condition

use std::fmt;

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CdpError {
    #[error("no valid price for market {0}")]
    NoValidPrice(String),

    #[error("arithmetic overflow in {0}")]
    Overflow(&'static str),

    #[error("block time moved backwards: previous accrual at {previous}, block time {now}")]
    NegativeElapsedTime { previous: u64, now: u64 },

    #[error("invalid params: {0}")]
    InvalidParams(String),

    #[error("invalid interest factor for {0}")]
    InvalidInterestFactor(String),

    #[error("unknown collateral type {0}")]
    UnknownCollateralType(String),

    #[error("cdp {id} of type {collateral_type} not found")]
    CdpNotFound { collateral_type: String, id: u64 },

    #[error("owner {owner} has no cdp of type {collateral_type}")]
    OwnerHasNoCdp { owner: String, collateral_type: String },

    #[error("owner {owner} already has a cdp of type {collateral_type}")]
    CdpAlreadyExists { owner: String, collateral_type: String },

    #[error("insufficient funds in {account}: have {available}{denom}, need {required}{denom}")]
    InsufficientFunds {
        account: String,
        denom: String,
        available: u128,
        required: u128,
    },

    #[error("debt {debt} is below the debt floor {floor}")]
    BelowDebtFloor { debt: u128, floor: u128 },

    #[error("debt limit exceeded: {requested} requested, {limit} allowed")]
    ExceedsDebtLimit { requested: u128, limit: u128 },

    #[error("collateral ratio below liquidation ratio {0}")]
    InvalidCollateralRatio(String),

    #[error("collateral denom {found} does not match {expected}")]
    InvalidCollateral { expected: String, found: String },

    #[error("payment of {payment} exceeds outstanding debt {debt}")]
    PaymentExceedsDebt { payment: u128, debt: u128 },
}

impl CdpError {
    /// Price unavailability is an expected external condition; it skips work
    /// for one collateral type but never halts the block.
    pub fn is_tolerated(&self) -> bool {
        matches!(self, CdpError::NoValidPrice(_))
    }
}

/// Pipeline stage that raised a fatal error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Params,
    AccumulateInterest,
    SynchronizeInterest,
    Liquidate,
    StartAuctions,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Params => "params",
            Stage::AccumulateInterest => "accumulate_interest",
            Stage::SynchronizeInterest => "synchronize_interest",
            Stage::Liquidate => "liquidate",
            Stage::StartAuctions => "start_auctions",
        };
        f.write_str(name)
    }
}

/// Fatal fault raised during block processing. The harness must stop
/// producing blocks when it sees one.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("fatal error in {stage} at height {height}{}: {source}", fmt_type(.collateral_type))]
pub struct BlockError {
    pub height: u64,
    pub stage: Stage,
    pub collateral_type: Option<String>,
    #[source]
    pub source: CdpError,
}

fn fmt_type(collateral_type: &Option<String>) -> String {
    match collateral_type {
        Some(t) => format!(" for {}", t),
        None => String::new(),
    }
}

impl BlockError {
    pub fn new(height: u64, stage: Stage, collateral_type: Option<&str>, source: CdpError) -> Self {
        Self {
            height,
            stage,
            collateral_type: collateral_type.map(str::to_string),
            source,
        }
    }
}
