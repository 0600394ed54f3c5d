//! Governance parameters read by the block pipeline

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::error::CdpError;
use crate::math::FixedU128;

/// Denom of the internal debt coin that mirrors outstanding cdp debt
pub const DEBT_DENOM: &str = "debt";

/// Configuration for one collateral type. Read-only during a block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollateralTypeConfig {
    /// Identifier, e.g. "xrp-a"
    pub collateral_type: String,

    /// Collateral coin denom, e.g. "xrp"
    pub denom: String,

    /// Market used for valuation when opening positions
    pub spot_market_id: String,

    /// Market used for the liquidation check
    pub liquidation_market_id: String,

    /// Minimum collateral value / debt value a position must keep
    pub liquidation_ratio: FixedU128,

    /// Per-second compounding factor (1.0 = no interest)
    pub stability_fee: FixedU128,

    /// Extra debt charged on liquidation as a fraction of seized debt
    pub liquidation_penalty: FixedU128,

    /// Collateral per collateral auction lot
    #[serde(with = "crate::amount")]
    pub auction_size: u128,

    /// Number of riskiest positions synchronized and scanned per risk cycle
    pub risk_scan_window: usize,

    /// Positions with less debt than this are never liquidated
    #[serde(with = "crate::amount")]
    pub debt_floor: u128,

    /// Maximum principal outstanding for this type
    #[serde(with = "crate::amount")]
    pub debt_limit: u128,

    /// Decimal places of the collateral denom
    pub conversion_factor: u32,
}

/// Stable asset minted against collateral
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DebtParam {
    pub denom: String,
    pub reference_asset: String,
    pub conversion_factor: u32,
}

/// Thresholds and lot sizes for surplus and debt auctions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuctionParams {
    #[serde(with = "crate::amount")]
    pub surplus_auction_threshold: u128,
    #[serde(with = "crate::amount")]
    pub surplus_auction_lot: u128,
    #[serde(with = "crate::amount")]
    pub debt_auction_threshold: u128,
    #[serde(with = "crate::amount")]
    pub debt_auction_lot: u128,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Params {
    /// Collateral types in processing order
    pub collateral_params: Vec<CollateralTypeConfig>,
    pub debt_param: DebtParam,
    pub auction: AuctionParams,
    #[serde(with = "crate::amount")]
    pub global_debt_limit: u128,

    /// Synchronization and liquidation run when height % interval == 0
    pub liquidation_block_interval: u64,
}

impl Default for DebtParam {
    fn default() -> Self {
        Self {
            denom: "usdx".to_string(),
            reference_asset: "usd".to_string(),
            conversion_factor: 6,
        }
    }
}

impl Default for AuctionParams {
    fn default() -> Self {
        Self {
            surplus_auction_threshold: 500_000_000_000,
            surplus_auction_lot: 10_000_000_000,
            debt_auction_threshold: 100_000_000_000,
            debt_auction_lot: 10_000_000_000,
        }
    }
}

impl Default for Params {
    fn default() -> Self {
        Self {
            collateral_params: Vec::new(),
            debt_param: DebtParam::default(),
            auction: AuctionParams::default(),
            global_debt_limit: 2_000_000_000_000,
            liquidation_block_interval: 1,
        }
    }
}

impl CollateralTypeConfig {
    pub fn validate(&self) -> Result<(), CdpError> {
        let invalid = |msg: &str| {
            Err(CdpError::InvalidParams(format!(
                "collateral type {:?}: {}",
                self.collateral_type, msg
            )))
        };

        if self.collateral_type.is_empty() {
            return invalid("empty collateral type");
        }
        if self.denom.is_empty() {
            return invalid("empty denom");
        }
        if self.spot_market_id.is_empty() || self.liquidation_market_id.is_empty() {
            return invalid("empty market id");
        }
        if self.liquidation_ratio.is_zero() {
            return invalid("liquidation ratio must be positive");
        }
        if self.stability_fee < FixedU128::ONE {
            return invalid("stability fee must be at least 1.0");
        }
        if self.auction_size == 0 {
            return invalid("auction size must be positive");
        }
        if self.conversion_factor > 18 {
            return invalid("conversion factor above 18");
        }
        Ok(())
    }
}

impl Params {
    /// Reject configurations the pipeline cannot process deterministically
    pub fn validate(&self) -> Result<(), CdpError> {
        if self.liquidation_block_interval == 0 {
            return Err(CdpError::InvalidParams(
                "liquidation block interval must be at least 1".to_string(),
            ));
        }
        if self.debt_param.denom.is_empty() || self.debt_param.denom == DEBT_DENOM {
            return Err(CdpError::InvalidParams(format!(
                "invalid debt denom {:?}",
                self.debt_param.denom
            )));
        }
        if self.debt_param.conversion_factor > 18 {
            return Err(CdpError::InvalidParams(
                "debt conversion factor above 18".to_string(),
            ));
        }

        let mut types = BTreeSet::new();
        for cp in &self.collateral_params {
            cp.validate()?;
            if !types.insert(cp.collateral_type.as_str()) {
                return Err(CdpError::InvalidParams(format!(
                    "duplicate collateral type {}",
                    cp.collateral_type
                )));
            }
            if cp.debt_limit > self.global_debt_limit {
                return Err(CdpError::InvalidParams(format!(
                    "debt limit of {} exceeds the global debt limit",
                    cp.collateral_type
                )));
            }
        }
        Ok(())
    }

    pub fn collateral_param(&self, collateral_type: &str) -> Result<&CollateralTypeConfig, CdpError> {
        self.collateral_params
            .iter()
            .find(|cp| cp.collateral_type == collateral_type)
            .ok_or_else(|| CdpError::UnknownCollateralType(collateral_type.to_string()))
    }
}
