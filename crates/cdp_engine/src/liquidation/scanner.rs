//! Selection of under-collateralized positions

use log::debug;
use serde::{Deserialize, Serialize};

use crate::error::CdpError;
use crate::math::{pow10, FixedU128};
use crate::state::{accrued_debt, collateral_ratio, Ledger};

/// Position selected for seizure, valued at the liquidation price
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiquidationCandidate {
    pub id: u64,
    /// Collateral value / debt value
    pub ratio: FixedU128,
    /// Collateral value in the reference asset
    pub collateral_value: FixedU128,
    /// Debt value in the reference asset
    pub debt_value: FixedU128,
}

/// Walk the ratio index from the riskiest position and collect up to
/// `window` positions whose live ratio at `price` is below `min_ratio`.
///
/// The walk ends at the first position at or above `min_ratio`. Positions
/// with debt under the debt floor are passed over and do not count towards
/// the window.
///
/// Order comes from the stored index keys, which are only as fresh as each
/// position's last synchronization. A position whose stale key sits behind a
/// healthy one is not reached until `synchronize_risky_positions` updates it.
pub fn scan_undercollateralized(
    ledger: &Ledger,
    collateral_type: &str,
    price: FixedU128,
    min_ratio: FixedU128,
    window: usize,
) -> Result<Vec<LiquidationCandidate>, CdpError> {
    let params = ledger.params();
    let cp = params.collateral_param(collateral_type)?;
    let Some(state) = ledger.collateral_state(collateral_type) else {
        return Ok(Vec::new());
    };

    let collateral_scale = pow10(cp.conversion_factor).ok_or(CdpError::Overflow("collateral scale"))?;
    let debt_scale = pow10(params.debt_param.conversion_factor).ok_or(CdpError::Overflow("debt scale"))?;

    let mut candidates = Vec::new();
    for (_, id) in state.index.iter() {
        if candidates.len() >= window {
            break;
        }
        let position = state.positions.get(&id).ok_or_else(|| CdpError::CdpNotFound {
            collateral_type: collateral_type.to_string(),
            id,
        })?;

        let debt = accrued_debt(position, state.interest_factor)?;
        let live = collateral_ratio(position.collateral.amount, debt, cp, params)?;
        if !live.priced_below(price, min_ratio) {
            break;
        }
        if debt < cp.debt_floor {
            debug!("{} cdp {} below debt floor, not liquidating", collateral_type, id);
            continue;
        }

        let collateral_value = FixedU128::from_rational(position.collateral.amount, collateral_scale)
            .and_then(|v| v.checked_mul(price))
            .ok_or(CdpError::Overflow("collateral value"))?;
        let debt_value =
            FixedU128::from_rational(debt, debt_scale).ok_or(CdpError::Overflow("debt value"))?;
        candidates.push(LiquidationCandidate {
            id,
            ratio: live.priced(price),
            collateral_value,
            debt_value,
        });
    }
    Ok(candidates)
}
