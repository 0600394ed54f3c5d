//! Seizure of a position's collateral and debt

use log::info;

use crate::auction::AuctionRequest;
use crate::bank::{Account, Coin};
use crate::error::CdpError;
use crate::interest::synchronize_interest;
use crate::math::sub_u128;
use crate::params::DEBT_DENOM;
use crate::state::{BlockContext, Event, Ledger, Position};

/// Close a position by force.
///
/// Interest is realised first. The debt coins backing the position (capped at
/// what the cdp account holds) and all of its collateral move to the
/// liquidator, a collateral auction request is queued and the position is
/// deleted. Returns the removed position.
pub fn seize_collateral(
    ledger: &mut Ledger,
    ctx: &mut BlockContext<'_>,
    collateral_type: &str,
    id: u64,
) -> Result<Position, CdpError> {
    synchronize_interest(ledger, &mut *ctx.bank, collateral_type, id)?;

    let cp = ledger.params().collateral_param(collateral_type)?;
    let penalty_rate = cp.liquidation_penalty;
    let position = ledger
        .position(collateral_type, id)
        .cloned()
        .ok_or_else(|| CdpError::CdpNotFound {
            collateral_type: collateral_type.to_string(),
            id,
        })?;

    let total_debt = position.total_debt()?;
    let debt = total_debt.min(ctx.bank.balance(&Account::Cdp, DEBT_DENOM));
    let penalty = penalty_rate
        .checked_mul_int(debt)
        .ok_or(CdpError::Overflow("liquidation penalty"))?;

    ctx.bank.transfer(&Account::Cdp, &Account::Liquidator, &Coin::new(DEBT_DENOM, debt))?;
    ctx.bank.transfer(&Account::Cdp, &Account::Liquidator, &position.collateral)?;

    let state = ledger.collateral_state_mut(collateral_type);
    state.total_principal = sub_u128(state.total_principal, total_debt, "total principal")?;
    state.index.remove(id);
    state.positions.remove(&id);

    info!(
        "liquidated {} cdp {} of {} at height {}: seized {} for {} debt",
        collateral_type, id, position.owner, ctx.height, position.collateral, debt
    );
    ledger.push_auction_request(AuctionRequest::Collateral {
        collateral_type: collateral_type.to_string(),
        return_address: position.owner.clone(),
        lot: position.collateral.clone(),
        debt,
        penalty,
    });
    ledger.emit(Event::Liquidation {
        collateral_type: collateral_type.to_string(),
        id,
        owner: position.owner.clone(),
        collateral: position.collateral.clone(),
        debt,
    });
    Ok(position)
}
