//! Auction handoff
//!
//! Seizure queues `AuctionRequest::Collateral` entries on the ledger. Once per
//! block the pending list is handed to an `AuctionScheduler`, which owns them
//! from then on. `AuctionHouse` is the in-process scheduler: it lots
//! collateral, nets surplus against debt and opens surplus/debt auctions when
//! their thresholds are crossed.

use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::bank::{Account, Bank, Coin};
use crate::error::CdpError;
use crate::math::{add_u128, mul_div_floor, sub_u128};
use crate::params::{Params, DEBT_DENOM};

/// Input to the auction collaborator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuctionRequest {
    /// Sell seized collateral for stable coins to cover `debt`
    Collateral {
        collateral_type: String,
        /// Owner of the seized position, receives leftover collateral
        return_address: String,
        lot: Coin,
        #[serde(with = "crate::amount")]
        debt: u128,
        /// Extra stable coins bidders must cover on top of `debt`
        #[serde(with = "crate::amount")]
        penalty: u128,
    },
    /// Sell excess stable coins
    Surplus { lot: Coin },
    /// Raise stable coins to cover bad debt
    Debt { debt: Coin },
}

/// An auction the scheduler has started
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Auction {
    pub id: u64,
    pub request: AuctionRequest,
}

pub trait AuctionScheduler {
    /// Start auctions for every pending request. Called once per block after
    /// all collateral types have been processed; any error halts the block.
    fn start_auctions_from_pending(
        &mut self,
        pending: Vec<AuctionRequest>,
        bank: &mut dyn Bank,
        params: &Params,
    ) -> Result<Vec<Auction>, CdpError>;
}

/// In-process auction scheduler
#[derive(Debug, Clone)]
pub struct AuctionHouse {
    next_id: u64,
    started: Vec<Auction>,
}

impl Default for AuctionHouse {
    fn default() -> Self {
        Self {
            next_id: 1,
            started: Vec::new(),
        }
    }
}

impl AuctionHouse {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every auction started so far, oldest first
    pub fn auctions(&self) -> &[Auction] {
        &self.started
    }

    fn start(&mut self, request: AuctionRequest, out: &mut Vec<Auction>) {
        let auction = Auction {
            id: self.next_id,
            request,
        };
        self.next_id += 1;
        out.push(auction.clone());
        self.started.push(auction);
    }

    /// Split a seized deposit into lots of at most `auction_size`. Debt and
    /// penalty are shared pro rata; the last lot takes the rounding remainder.
    fn lot_collateral(
        &mut self,
        bank: &mut dyn Bank,
        request: AuctionRequest,
        params: &Params,
        out: &mut Vec<Auction>,
    ) -> Result<(), CdpError> {
        let (collateral_type, return_address, lot, debt, penalty) = match request {
            AuctionRequest::Collateral {
                collateral_type,
                return_address,
                lot,
                debt,
                penalty,
            } => (collateral_type, return_address, lot, debt, penalty),
            other => {
                self.start(other, out);
                return Ok(());
            }
        };

        let auction_size = params.collateral_param(&collateral_type)?.auction_size;
        let total = lot.amount;
        let mut remaining_coll = total;
        let mut remaining_debt = debt;
        let mut remaining_penalty = penalty;

        while remaining_coll > 0 {
            let (lot_coll, lot_debt, lot_penalty) = if remaining_coll <= auction_size {
                (remaining_coll, remaining_debt, remaining_penalty)
            } else {
                let share = |x: u128| {
                    mul_div_floor(x, auction_size, total).ok_or(CdpError::Overflow("auction lot"))
                };
                (auction_size, share(debt)?, share(penalty)?)
            };

            bank.transfer(&Account::Liquidator, &Account::Auction, &Coin::new(&lot.denom, lot_coll))?;
            bank.transfer(&Account::Liquidator, &Account::Auction, &Coin::new(DEBT_DENOM, lot_debt))?;

            self.start(
                AuctionRequest::Collateral {
                    collateral_type: collateral_type.clone(),
                    return_address: return_address.clone(),
                    lot: Coin::new(&lot.denom, lot_coll),
                    debt: lot_debt,
                    penalty: lot_penalty,
                },
                out,
            );

            remaining_coll = sub_u128(remaining_coll, lot_coll, "auction lot")?;
            remaining_debt = sub_u128(remaining_debt, lot_debt, "auction lot")?;
            remaining_penalty = sub_u128(remaining_penalty, lot_penalty, "auction lot")?;
        }
        Ok(())
    }

    /// Burn matching surplus and debt held by the liquidator, then open
    /// debt or surplus auctions for whatever crosses its threshold.
    fn run_surplus_and_debt_auctions(
        &mut self,
        bank: &mut dyn Bank,
        params: &Params,
        out: &mut Vec<Auction>,
    ) -> Result<(), CdpError> {
        let stable = params.debt_param.denom.as_str();
        let surplus = bank.balance(&Account::Liquidator, stable);
        let debt = bank.balance(&Account::Liquidator, DEBT_DENOM);

        let netted = surplus.min(debt);
        if netted > 0 {
            bank.burn(&Account::Liquidator, &Coin::new(stable, netted))?;
            bank.burn(&Account::Liquidator, &Coin::new(DEBT_DENOM, netted))?;
            debug!("netted {} surplus against debt", netted);
        }

        let auction = &params.auction;
        let remaining_debt = sub_u128(debt, netted, "netting")?;
        if remaining_debt >= auction.debt_auction_threshold && auction.debt_auction_lot > 0 {
            let lot = Coin::new(DEBT_DENOM, auction.debt_auction_lot.min(remaining_debt));
            bank.transfer(&Account::Liquidator, &Account::Auction, &lot)?;
            info!("starting debt auction for {}", lot);
            self.start(AuctionRequest::Debt { debt: lot }, out);
        }

        let remaining_surplus = sub_u128(surplus, netted, "netting")?;
        if remaining_surplus >= auction.surplus_auction_threshold && auction.surplus_auction_lot > 0 {
            let lot = Coin::new(stable, auction.surplus_auction_lot.min(remaining_surplus));
            bank.transfer(&Account::Liquidator, &Account::Auction, &lot)?;
            info!("starting surplus auction for {}", lot);
            self.start(AuctionRequest::Surplus { lot }, out);
        }
        Ok(())
    }
}

impl AuctionScheduler for AuctionHouse {
    fn start_auctions_from_pending(
        &mut self,
        pending: Vec<AuctionRequest>,
        bank: &mut dyn Bank,
        params: &Params,
    ) -> Result<Vec<Auction>, CdpError> {
        let mut out = Vec::new();
        for request in pending {
            self.lot_collateral(bank, request, params, &mut out)?;
        }
        self.run_surplus_and_debt_auctions(bank, params, &mut out)?;
        Ok(out)
    }
}

/// Sum of debt carried by a set of collateral auctions
pub fn total_auction_debt(auctions: &[Auction]) -> Result<u128, CdpError> {
    auctions.iter().try_fold(0u128, |acc, a| match &a.request {
        AuctionRequest::Collateral { debt, .. } => add_u128(acc, *debt, "auction debt"),
        _ => Ok(acc),
    })
}
