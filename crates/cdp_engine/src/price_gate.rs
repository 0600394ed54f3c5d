//! Market health check run before any price-dependent work

use log::info;

use crate::state::{BlockContext, Event, Ledger};

/// Refresh a market's current price and report whether a valid one exists.
///
/// The last observed status of every market is kept on the ledger; the first
/// observation and every change emit `Event::MarketStatus`.
pub fn update_pricefeed_status(ledger: &mut Ledger, ctx: &mut BlockContext<'_>, market_id: &str) -> bool {
    let refreshed = ctx.oracle.refresh_current_price(market_id, ctx.time);
    let up = refreshed && ctx.oracle.current_price(market_id, ctx.time).is_ok();

    let previous = ledger.set_market_status(market_id, up);
    if previous != Some(up) {
        info!(
            "market {} is {} at height {}",
            market_id,
            if up { "up" } else { "down" },
            ctx.height
        );
        ledger.emit(Event::MarketStatus {
            market_id: market_id.to_string(),
            up,
        });
    }
    up
}
