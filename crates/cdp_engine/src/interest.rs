//! Interest accrual and realisation
//!
//! Accrual is lazy. `accumulate_interest` only advances the cumulative
//! interest factor of a collateral type, which is O(1) regardless of how many
//! positions are open. A position's debt is brought up to date when it is
//! synchronized: its realised debt is scaled by `type_factor / snapshot`,
//! rounded half up once, and the growth is minted as debt coins to the cdp
//! account and as surplus stable coins to the liquidator.

use log::debug;

use crate::bank::{Account, Bank, Coin};
use crate::error::CdpError;
use crate::index::CollateralRatio;
use crate::math::{add_u128, sub_u128, FixedU128};
use crate::params::DEBT_DENOM;
use crate::state::{accrued_debt, collateral_ratio, BlockContext, Ledger};

/// Compounding factor `rate ^ elapsed` for a per-second rate
pub fn calculate_interest_factor(rate: FixedU128, elapsed: u64) -> Result<FixedU128, CdpError> {
    rate.checked_pow(elapsed)
        .ok_or(CdpError::Overflow("interest factor"))
}

/// Advance the interest index of `collateral_type` to `now`.
///
/// The first call for a type only starts its clock. Time moving backwards is
/// an error; zero elapsed time changes nothing. When the interest owed by the
/// whole type rounds to zero the clock is left where it is so that the
/// elapsed time keeps counting.
pub fn accumulate_interest(ledger: &mut Ledger, collateral_type: &str, now: u64) -> Result<(), CdpError> {
    let rate = ledger.params().collateral_param(collateral_type)?.stability_fee;
    let state = ledger.collateral_state_mut(collateral_type);

    let Some(previous) = state.previous_accrual_time else {
        state.previous_accrual_time = Some(now);
        return Ok(());
    };
    if now < previous {
        return Err(CdpError::NegativeElapsedTime { previous, now });
    }
    let elapsed = now - previous;
    if elapsed == 0 {
        return Ok(());
    }
    if state.total_principal == 0 || rate == FixedU128::ONE {
        state.previous_accrual_time = Some(now);
        return Ok(());
    }

    let factor = calculate_interest_factor(rate, elapsed)?;
    let owed = factor
        .checked_mul_int(state.total_principal)
        .ok_or(CdpError::Overflow("accumulated interest"))?;
    if owed == state.total_principal {
        debug!("{}: interest rounds to zero after {}s", collateral_type, elapsed);
        return Ok(());
    }

    state.interest_factor = state
        .interest_factor
        .checked_mul(factor)
        .ok_or(CdpError::Overflow("interest factor"))?;
    state.previous_accrual_time = Some(now);
    Ok(())
}

/// Realise the interest a position has accrued since its last
/// synchronization and reposition it in the ratio index.
///
/// Returns the realised growth. Growth that rounds to zero leaves the
/// position untouched so the fraction keeps accruing against the old
/// snapshot. Calling it twice at the same time is a no-op the second time.
pub fn synchronize_interest(
    ledger: &mut Ledger,
    bank: &mut dyn Bank,
    collateral_type: &str,
    id: u64,
) -> Result<u128, CdpError> {
    let (growth, new_fees, ratio, type_factor, accrual_time) = {
        let state = ledger
            .collateral_state(collateral_type)
            .ok_or_else(|| CdpError::UnknownCollateralType(collateral_type.to_string()))?;
        let position = state.positions.get(&id).ok_or_else(|| CdpError::CdpNotFound {
            collateral_type: collateral_type.to_string(),
            id,
        })?;
        if position.interest_factor == state.interest_factor {
            return Ok(0);
        }

        let debt = position.total_debt()?;
        let accrued = accrued_debt(position, state.interest_factor)?;
        let growth = sub_u128(accrued, debt, "interest growth")?;
        if growth == 0 {
            return Ok(0);
        }

        let cp = ledger.params().collateral_param(collateral_type)?;
        let ratio = collateral_ratio(position.collateral.amount, accrued, cp, ledger.params())?;
        let new_fees = add_u128(position.accumulated_fees.amount, growth, "accumulated fees")?;
        (
            growth,
            new_fees,
            ratio,
            state.interest_factor,
            state.previous_accrual_time.unwrap_or(position.fees_updated),
        )
    };

    let stable = ledger.params().debt_param.denom.clone();
    bank.mint(&Account::Cdp, &Coin::new(DEBT_DENOM, growth))?;
    bank.mint(&Account::Liquidator, &Coin::new(stable, growth))?;

    let state = ledger.collateral_state_mut(collateral_type);
    state.total_principal = add_u128(state.total_principal, growth, "total principal")?;
    state.index.upsert(id, ratio);
    if let Some(position) = state.positions.get_mut(&id) {
        position.accumulated_fees.amount = new_fees;
        position.interest_factor = type_factor;
        position.fees_updated = accrual_time;
    }
    Ok(growth)
}

/// Synchronize the `window` positions of a type with the lowest collateral
/// ratio not above `max_ratio`. Returns how many positions were visited.
pub fn synchronize_risky_positions(
    ledger: &mut Ledger,
    ctx: &mut BlockContext<'_>,
    collateral_type: &str,
    window: usize,
    max_ratio: CollateralRatio,
) -> Result<usize, CdpError> {
    let ids = match ledger.collateral_state(collateral_type) {
        Some(state) => state.index.lowest(window, max_ratio),
        None => return Ok(0),
    };
    for id in &ids {
        synchronize_interest(ledger, &mut *ctx.bank, collateral_type, *id)?;
    }
    Ok(ids.len())
}
