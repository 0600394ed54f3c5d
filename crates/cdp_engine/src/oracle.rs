//! Price oracle collaborator
//!
//! The engine only asks the oracle to refresh a market and then reads the
//! validated price. `MemoryPriceFeed` is a minimal feed that takes the median
//! of unexpired submissions.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::CdpError;
use crate::math::FixedU128;

/// Validated price snapshot for a market
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceQuote {
    pub market_id: String,
    pub price: FixedU128,
    /// Unix time after which the quote is stale
    pub expiry: u64,
}

impl PriceQuote {
    pub fn is_valid_at(&self, now: u64) -> bool {
        !self.price.is_zero() && now < self.expiry
    }
}

pub trait PriceFeed {
    /// Recompute the current price of `market_id` from recent submissions.
    /// Returns whether a current price exists afterwards.
    fn refresh_current_price(&mut self, market_id: &str, now: u64) -> bool;

    /// Current validated price, or `CdpError::NoValidPrice`
    fn current_price(&self, market_id: &str, now: u64) -> Result<PriceQuote, CdpError>;
}

/// Raw price posted by one oracle
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawPrice {
    pub oracle: String,
    pub price: FixedU128,
    pub expiry: u64,
}

#[derive(Debug, Clone, Default)]
struct Market {
    raw: BTreeMap<String, RawPrice>,
    current: Option<PriceQuote>,
}

#[derive(Debug, Clone, Default)]
pub struct MemoryPriceFeed {
    markets: BTreeMap<String, Market>,
}

impl MemoryPriceFeed {
    pub fn new() -> Self {
        Self::default()
    }

    /// Post (or replace) an oracle's price for a market
    pub fn post_price(&mut self, market_id: &str, oracle: &str, price: FixedU128, expiry: u64) {
        let market = self.markets.entry(market_id.to_string()).or_default();
        market.raw.insert(
            oracle.to_string(),
            RawPrice {
                oracle: oracle.to_string(),
                price,
                expiry,
            },
        );
    }

    /// Drop every submission for a market, leaving it without a price
    pub fn clear_market(&mut self, market_id: &str) {
        if let Some(market) = self.markets.get_mut(market_id) {
            market.raw.clear();
            market.current = None;
        }
    }
}

/// Median of sorted prices; mean of the two middle values for even counts
fn median(sorted: &[(FixedU128, u64)]) -> Option<(FixedU128, u64)> {
    let n = sorted.len();
    if n == 0 {
        return None;
    }
    if n % 2 == 1 {
        return Some(sorted[n / 2]);
    }
    let (a, ea) = sorted[n / 2 - 1];
    let (b, eb) = sorted[n / 2];
    let sum = a.into_inner().checked_add(b.into_inner())?;
    Some((FixedU128::from_inner(sum / 2), ea.min(eb)))
}

impl PriceFeed for MemoryPriceFeed {
    fn refresh_current_price(&mut self, market_id: &str, now: u64) -> bool {
        let Some(market) = self.markets.get_mut(market_id) else {
            return false;
        };

        let mut live: Vec<(FixedU128, u64)> = market
            .raw
            .values()
            .filter(|raw| raw.expiry > now && !raw.price.is_zero())
            .map(|raw| (raw.price, raw.expiry))
            .collect();
        live.sort();

        market.current = median(&live).map(|(price, expiry)| PriceQuote {
            market_id: market_id.to_string(),
            price,
            expiry,
        });
        market.current.is_some()
    }

    fn current_price(&self, market_id: &str, now: u64) -> Result<PriceQuote, CdpError> {
        self.markets
            .get(market_id)
            .and_then(|m| m.current.as_ref())
            .filter(|quote| quote.is_valid_at(now))
            .cloned()
            .ok_or_else(|| CdpError::NoValidPrice(market_id.to_string()))
    }
}
