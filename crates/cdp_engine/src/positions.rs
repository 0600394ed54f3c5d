//! Position lifecycle: open against collateral, repay, close

use log::{info, warn};

use crate::bank::{Account, Bank, Coin};
use crate::error::CdpError;
use crate::interest::synchronize_interest;
use crate::math::{add_u128, sub_u128};
use crate::params::DEBT_DENOM;
use crate::state::{collateral_ratio, BlockContext, Ledger, Position};

/// Lock `collateral` and draw `principal` stable coins against it.
///
/// Returns the new position id.
pub fn open_position(
    ledger: &mut Ledger,
    ctx: &mut BlockContext<'_>,
    owner: &str,
    collateral: Coin,
    principal: Coin,
    collateral_type: &str,
) -> Result<u64, CdpError> {
    try_open(ledger, ctx, owner, collateral, principal, collateral_type).map_err(|e| {
        warn!("open {} for {} rejected: {}", collateral_type, owner, e);
        e
    })
}

fn try_open(
    ledger: &mut Ledger,
    ctx: &mut BlockContext<'_>,
    owner: &str,
    collateral: Coin,
    principal: Coin,
    collateral_type: &str,
) -> Result<u64, CdpError> {
    let params = ledger.params();
    let cp = params.collateral_param(collateral_type)?;
    if collateral.denom != cp.denom {
        return Err(CdpError::InvalidCollateral {
            expected: cp.denom.clone(),
            found: collateral.denom,
        });
    }
    if principal.denom != params.debt_param.denom {
        return Err(CdpError::InvalidCollateral {
            expected: params.debt_param.denom.clone(),
            found: principal.denom,
        });
    }
    if ledger.position_by_owner(collateral_type, owner).is_some() {
        return Err(CdpError::CdpAlreadyExists {
            owner: owner.to_string(),
            collateral_type: collateral_type.to_string(),
        });
    }
    if principal.amount < cp.debt_floor {
        return Err(CdpError::BelowDebtFloor {
            debt: principal.amount,
            floor: cp.debt_floor,
        });
    }

    let type_total = add_u128(ledger.total_principal(collateral_type), principal.amount, "debt limit")?;
    if type_total > cp.debt_limit {
        return Err(CdpError::ExceedsDebtLimit {
            requested: type_total,
            limit: cp.debt_limit,
        });
    }
    let global_total = params
        .collateral_params
        .iter()
        .try_fold(principal.amount, |acc, other| {
            add_u128(acc, ledger.total_principal(&other.collateral_type), "debt limit")
        })?;
    if global_total > params.global_debt_limit {
        return Err(CdpError::ExceedsDebtLimit {
            requested: global_total,
            limit: params.global_debt_limit,
        });
    }

    let quote = ctx.oracle.current_price(&cp.spot_market_id, ctx.time)?;
    let ratio = collateral_ratio(collateral.amount, principal.amount, cp, params)?;
    if ratio.priced_below(quote.price, cp.liquidation_ratio) {
        return Err(CdpError::InvalidCollateralRatio(cp.liquidation_ratio.to_string()));
    }

    let user = Account::User(owner.to_string());
    ctx.bank.transfer(&user, &Account::Cdp, &collateral)?;
    ctx.bank.mint(&user, &principal)?;
    ctx.bank.mint(&Account::Cdp, &Coin::new(DEBT_DENOM, principal.amount))?;

    let id = ledger.next_position_id();
    let state = ledger.collateral_state_mut(collateral_type);
    let position = Position {
        id,
        owner: owner.to_string(),
        collateral_type: collateral_type.to_string(),
        accumulated_fees: Coin::new(&principal.denom, 0),
        fees_updated: state.previous_accrual_time.unwrap_or(ctx.time),
        interest_factor: state.interest_factor,
        collateral,
        principal,
    };
    state.total_principal = add_u128(state.total_principal, position.principal.amount, "total principal")?;
    state.index.upsert(id, ratio);
    info!(
        "opened {} cdp {} for {}: {} against {}",
        collateral_type, id, owner, position.principal, position.collateral
    );
    state.positions.insert(id, position);
    Ok(id)
}

/// Pay down the owner's debt of `collateral_type`, fees first. Paying off
/// everything closes the position and returns its collateral.
pub fn repay(
    ledger: &mut Ledger,
    ctx: &mut BlockContext<'_>,
    owner: &str,
    collateral_type: &str,
    payment: Coin,
) -> Result<(), CdpError> {
    try_repay(ledger, ctx, owner, collateral_type, payment).map_err(|e| {
        warn!("repay {} for {} rejected: {}", collateral_type, owner, e);
        e
    })
}

fn try_repay(
    ledger: &mut Ledger,
    ctx: &mut BlockContext<'_>,
    owner: &str,
    collateral_type: &str,
    payment: Coin,
) -> Result<(), CdpError> {
    let id = ledger
        .position_by_owner(collateral_type, owner)
        .map(|p| p.id)
        .ok_or_else(|| CdpError::OwnerHasNoCdp {
            owner: owner.to_string(),
            collateral_type: collateral_type.to_string(),
        })?;
    if payment.denom != ledger.params().debt_param.denom {
        return Err(CdpError::InvalidCollateral {
            expected: ledger.params().debt_param.denom.clone(),
            found: payment.denom,
        });
    }

    synchronize_interest(ledger, &mut *ctx.bank, collateral_type, id)?;

    let cp = ledger.params().collateral_param(collateral_type)?;
    let position = ledger.position(collateral_type, id).ok_or_else(|| CdpError::CdpNotFound {
        collateral_type: collateral_type.to_string(),
        id,
    })?;
    let debt = position.total_debt()?;
    if payment.amount > debt {
        return Err(CdpError::PaymentExceedsDebt {
            payment: payment.amount,
            debt,
        });
    }
    let remaining = debt - payment.amount;
    if remaining > 0 && remaining < cp.debt_floor {
        return Err(CdpError::BelowDebtFloor {
            debt: remaining,
            floor: cp.debt_floor,
        });
    }

    let fee_payment = payment.amount.min(position.accumulated_fees.amount);
    let principal_payment = payment.amount - fee_payment;
    let new_fees = sub_u128(position.accumulated_fees.amount, fee_payment, "repay fees")?;
    let new_principal = sub_u128(position.principal.amount, principal_payment, "repay principal")?;
    let ratio = collateral_ratio(position.collateral.amount, remaining, cp, ledger.params())?;
    let collateral = position.collateral.clone();

    // every bank movement is checked before the first one happens
    let user = Account::User(owner.to_string());
    let backing = Coin::new(DEBT_DENOM, payment.amount);
    ensure_balance(&*ctx.bank, &user, &payment)?;
    ensure_balance(&*ctx.bank, &Account::Cdp, &backing)?;
    if remaining == 0 {
        ensure_balance(&*ctx.bank, &Account::Cdp, &collateral)?;
    }
    ctx.bank.burn(&Account::Cdp, &backing)?;
    ctx.bank.burn(&user, &payment)?;

    let state = ledger.collateral_state_mut(collateral_type);
    state.total_principal = sub_u128(state.total_principal, payment.amount, "total principal")?;

    if remaining == 0 {
        ctx.bank.transfer(&Account::Cdp, &user, &collateral)?;
        state.positions.remove(&id);
        state.index.remove(id);
        info!("closed {} cdp {} for {}", collateral_type, id, owner);
        return Ok(());
    }

    state.index.upsert(id, ratio);
    if let Some(position) = state.positions.get_mut(&id) {
        position.accumulated_fees.amount = new_fees;
        position.principal.amount = new_principal;
    }
    Ok(())
}

fn ensure_balance(bank: &dyn Bank, account: &Account, coin: &Coin) -> Result<(), CdpError> {
    let available = bank.balance(account, &coin.denom);
    if available < coin.amount {
        return Err(CdpError::InsufficientFunds {
            account: account.to_string(),
            denom: coin.denom.clone(),
            available,
            required: coin.amount,
        });
    }
    Ok(())
}
