//! Ledger state owned by the block-processing harness

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::auction::{AuctionRequest, AuctionScheduler};
use crate::bank::{Bank, Coin};
use crate::error::CdpError;
use crate::index::{CollateralRatio, RatioIndex};
use crate::math::{add_u128, mul_div_round, mul_u128, pow10, FixedU128};
use crate::oracle::PriceFeed;
use crate::params::{CollateralTypeConfig, Params};

/// A collateralized debt position
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub id: u64,
    pub owner: String,
    pub collateral_type: String,
    pub collateral: Coin,
    pub principal: Coin,
    /// Interest realised so far, same denom as `principal`
    pub accumulated_fees: Coin,
    /// Accrual time of the type's interest factor last applied to this position
    pub fees_updated: u64,
    /// Snapshot of the type's cumulative interest factor at last realisation
    pub interest_factor: FixedU128,
}

impl Position {
    /// Principal plus realised interest
    pub fn total_debt(&self) -> Result<u128, CdpError> {
        add_u128(self.principal.amount, self.accumulated_fees.amount, "position debt")
    }
}

/// Per collateral type bookkeeping
#[derive(Clone, Debug)]
pub struct CollateralState {
    pub positions: BTreeMap<u64, Position>,
    pub index: RatioIndex,
    /// None until the first accrual for this type
    pub previous_accrual_time: Option<u64>,
    /// Product of every per-period compounding factor applied so far
    pub interest_factor: FixedU128,
    /// Sum of realised debt of open positions
    pub total_principal: u128,
}

impl Default for CollateralState {
    fn default() -> Self {
        Self {
            positions: BTreeMap::new(),
            index: RatioIndex::new(),
            previous_accrual_time: None,
            interest_factor: FixedU128::ONE,
            total_principal: 0,
        }
    }
}

/// Observable side effects of block processing
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Event {
    MarketStatus {
        market_id: String,
        up: bool,
    },
    Liquidation {
        collateral_type: String,
        id: u64,
        owner: String,
        collateral: Coin,
        #[serde(with = "crate::amount")]
        debt: u128,
    },
}

/// Collaborators and block header handed to every pipeline stage
pub struct BlockContext<'a> {
    pub height: u64,
    /// Block time in unix seconds
    pub time: u64,
    pub bank: &'a mut dyn Bank,
    pub oracle: &'a mut dyn PriceFeed,
    pub auctions: &'a mut dyn AuctionScheduler,
}

/// CDP module state: params, positions per collateral type, pending auction
/// inputs and the last observed status of each market.
#[derive(Clone, Debug)]
pub struct Ledger {
    params: Params,
    collaterals: BTreeMap<String, CollateralState>,
    pending_auctions: Vec<AuctionRequest>,
    market_status: BTreeMap<String, bool>,
    events: Vec<Event>,
    next_position_id: u64,
}

impl Ledger {
    pub fn new(params: Params) -> Result<Self, CdpError> {
        params.validate()?;
        Ok(Self {
            params,
            collaterals: BTreeMap::new(),
            pending_auctions: Vec::new(),
            market_status: BTreeMap::new(),
            events: Vec::new(),
            next_position_id: 1,
        })
    }

    pub fn params(&self) -> &Params {
        &self.params
    }

    /// Replace governance params; takes effect from the next block
    pub fn set_params(&mut self, params: Params) -> Result<(), CdpError> {
        params.validate()?;
        self.params = params;
        Ok(())
    }

    pub fn collateral_state(&self, collateral_type: &str) -> Option<&CollateralState> {
        self.collaterals.get(collateral_type)
    }

    pub(crate) fn collateral_state_mut(&mut self, collateral_type: &str) -> &mut CollateralState {
        self.collaterals.entry(collateral_type.to_string()).or_default()
    }

    pub fn position(&self, collateral_type: &str, id: u64) -> Option<&Position> {
        self.collaterals.get(collateral_type)?.positions.get(&id)
    }

    pub fn position_by_owner(&self, collateral_type: &str, owner: &str) -> Option<&Position> {
        self.collaterals
            .get(collateral_type)?
            .positions
            .values()
            .find(|p| p.owner == owner)
    }

    /// Open positions of a type in id order
    pub fn positions(&self, collateral_type: &str) -> impl Iterator<Item = &Position> + '_ {
        self.collaterals
            .get(collateral_type)
            .into_iter()
            .flat_map(|state| state.positions.values())
    }

    pub fn total_principal(&self, collateral_type: &str) -> u128 {
        self.collaterals
            .get(collateral_type)
            .map(|s| s.total_principal)
            .unwrap_or(0)
    }

    pub fn previous_accrual_time(&self, collateral_type: &str) -> Option<u64> {
        self.collaterals.get(collateral_type)?.previous_accrual_time
    }

    pub fn interest_factor(&self, collateral_type: &str) -> FixedU128 {
        self.collaterals
            .get(collateral_type)
            .map(|s| s.interest_factor)
            .unwrap_or(FixedU128::ONE)
    }

    /// Debt of a position including interest not yet realised
    pub fn accrued_debt(&self, collateral_type: &str, id: u64) -> Result<u128, CdpError> {
        let state = self
            .collaterals
            .get(collateral_type)
            .ok_or_else(|| CdpError::UnknownCollateralType(collateral_type.to_string()))?;
        let position = state.positions.get(&id).ok_or_else(|| CdpError::CdpNotFound {
            collateral_type: collateral_type.to_string(),
            id,
        })?;
        accrued_debt(position, state.interest_factor)
    }

    pub fn market_status(&self, market_id: &str) -> Option<bool> {
        self.market_status.get(market_id).copied()
    }

    pub(crate) fn set_market_status(&mut self, market_id: &str, up: bool) -> Option<bool> {
        self.market_status.insert(market_id.to_string(), up)
    }

    pub fn pending_auctions(&self) -> &[AuctionRequest] {
        &self.pending_auctions
    }

    pub(crate) fn push_auction_request(&mut self, request: AuctionRequest) {
        self.pending_auctions.push(request);
    }

    pub(crate) fn take_pending_auctions(&mut self) -> Vec<AuctionRequest> {
        std::mem::take(&mut self.pending_auctions)
    }

    pub(crate) fn emit(&mut self, event: Event) {
        self.events.push(event);
    }

    pub fn take_events(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.events)
    }

    pub(crate) fn next_position_id(&mut self) -> u64 {
        let id = self.next_position_id;
        self.next_position_id = self.next_position_id.saturating_add(1);
        id
    }
}

/// `debt * type_factor / position_factor`, rounded half up
pub fn accrued_debt(position: &Position, type_factor: FixedU128) -> Result<u128, CdpError> {
    let debt = position.total_debt()?;
    if position.interest_factor.is_zero() {
        return Err(CdpError::InvalidInterestFactor(position.collateral_type.clone()));
    }
    if type_factor == position.interest_factor {
        return Ok(debt);
    }
    mul_div_round(
        debt,
        type_factor.into_inner(),
        position.interest_factor.into_inner(),
    )
    .ok_or(CdpError::Overflow("accrued debt"))
}

/// Price-free collateral-to-debt ratio of a position, normalized by the
/// decimal places of the collateral and debt denoms.
pub fn collateral_ratio(
    collateral: u128,
    debt: u128,
    cp: &CollateralTypeConfig,
    params: &Params,
) -> Result<CollateralRatio, CdpError> {
    let debt_scale = pow10(params.debt_param.conversion_factor).ok_or(CdpError::Overflow("debt scale"))?;
    let collateral_scale = pow10(cp.conversion_factor).ok_or(CdpError::Overflow("collateral scale"))?;
    let num = mul_u128(collateral, debt_scale, "collateral ratio")?;
    let den = mul_u128(debt, collateral_scale, "collateral ratio")?;
    Ok(CollateralRatio::new(num, den))
}
