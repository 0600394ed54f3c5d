//! Invariant checking helpers

use crate::bank::{Account, Bank};
use crate::params::DEBT_DENOM;
use crate::state::Ledger;

/// Sum of realised debt over every open position of a type
pub fn sum_position_debt(ledger: &Ledger, collateral_type: &str) -> u128 {
    ledger
        .positions(collateral_type)
        .fold(0u128, |acc, p| {
            acc.saturating_add(p.principal.amount)
                .saturating_add(p.accumulated_fees.amount)
        })
}

/// Aggregate principal of each type equals the realised debt of its positions
pub fn principal_matches_positions(ledger: &Ledger) -> bool {
    ledger.params().collateral_params.iter().all(|cp| {
        ledger.total_principal(&cp.collateral_type) == sum_position_debt(ledger, &cp.collateral_type)
    })
}

/// Debt coins held by the cdp account back exactly the realised debt of all
/// open positions
pub fn debt_backed(ledger: &Ledger, bank: &dyn Bank) -> bool {
    let total = ledger
        .params()
        .collateral_params
        .iter()
        .fold(0u128, |acc, cp| acc.saturating_add(ledger.total_principal(&cp.collateral_type)));
    bank.balance(&Account::Cdp, DEBT_DENOM) == total
}

/// Collateral held by the cdp account covers every open position
pub fn collateral_backed(ledger: &Ledger, bank: &dyn Bank) -> bool {
    ledger.params().collateral_params.iter().all(|cp| {
        let locked = ledger
            .positions(&cp.collateral_type)
            .fold(0u128, |acc, p| acc.saturating_add(p.collateral.amount));
        bank.balance(&Account::Cdp, &cp.denom) >= locked
    })
}

/// Every open position is in the ratio index exactly once
pub fn index_consistent(ledger: &Ledger) -> bool {
    ledger.params().collateral_params.iter().all(|cp| {
        let Some(state) = ledger.collateral_state(&cp.collateral_type) else {
            return true;
        };
        state.index.len() == state.positions.len()
            && state.positions.keys().all(|id| state.index.get(*id).is_some())
    })
}

/// All ledger invariants at once
pub fn ledger_ok(ledger: &Ledger, bank: &dyn Bank) -> bool {
    principal_matches_positions(ledger)
        && debt_backed(ledger, bank)
        && collateral_backed(ledger, bank)
        && index_consistent(ledger)
}
