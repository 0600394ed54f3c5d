//! Ordered index of positions by collateral-to-debt ratio (lowest first)

use std::cmp::Ordering;
use std::collections::{BTreeSet, HashMap};

use crate::math::{cmp_products, FixedU128};

/// Exact collateral-to-debt ratio, `collateral / debt` in normalized units.
///
/// Stored as an unreduced fraction so ordering never depends on rounding.
/// A zero denominator (no debt) is treated as infinitely safe.
#[derive(Debug, Clone, Copy)]
pub struct CollateralRatio {
    num: u128,
    den: u128,
}

impl CollateralRatio {
    pub const INFINITE: Self = Self { num: 1, den: 0 };

    pub fn new(num: u128, den: u128) -> Self {
        if den == 0 {
            Self::INFINITE
        } else {
            Self { num, den }
        }
    }

    pub fn is_infinite(&self) -> bool {
        self.den == 0
    }

    /// True when `self * price < min_ratio`
    pub fn priced_below(&self, price: FixedU128, min_ratio: FixedU128) -> bool {
        if self.is_infinite() {
            return false;
        }
        cmp_products(self.num, price.into_inner(), min_ratio.into_inner(), self.den) == Ordering::Less
    }

    /// `self * price` as a fixed-point number, saturating for infinite ratios
    pub fn priced(&self, price: FixedU128) -> FixedU128 {
        if self.is_infinite() {
            return FixedU128::from_inner(u128::MAX);
        }
        crate::math::mul_div_round(self.num, price.into_inner(), self.den)
            .map(FixedU128::from_inner)
            .unwrap_or(FixedU128::from_inner(u128::MAX))
    }
}

impl PartialEq for CollateralRatio {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for CollateralRatio {}

impl PartialOrd for CollateralRatio {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for CollateralRatio {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self.is_infinite(), other.is_infinite()) {
            (true, true) => Ordering::Equal,
            (true, false) => Ordering::Greater,
            (false, true) => Ordering::Less,
            (false, false) => cmp_products(self.num, other.den, other.num, self.den),
        }
    }
}

/// Ratio-ordered position index (min-first, ties by ascending id)
#[derive(Debug, Clone, Default)]
pub struct RatioIndex {
    /// Ordered entries
    entries: BTreeSet<(CollateralRatio, u64)>,
    /// Map for O(1) key lookups on update/remove
    keys: HashMap<u64, CollateralRatio>,
}

impl RatioIndex {
    /// Create new empty index
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or move a position
    pub fn upsert(&mut self, id: u64, ratio: CollateralRatio) {
        if let Some(old) = self.keys.insert(id, ratio) {
            self.entries.remove(&(old, id));
        }
        self.entries.insert((ratio, id));
    }

    /// Remove position from index
    pub fn remove(&mut self, id: u64) -> Option<CollateralRatio> {
        let ratio = self.keys.remove(&id)?;
        self.entries.remove(&(ratio, id));
        Some(ratio)
    }

    pub fn get(&self, id: u64) -> Option<CollateralRatio> {
        self.keys.get(&id).copied()
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Iterate from the riskiest position upwards
    pub fn iter(&self) -> impl Iterator<Item = (CollateralRatio, u64)> + '_ {
        self.entries.iter().copied()
    }

    /// Up to `count` ids with the lowest ratios that are `<= max_ratio`
    pub fn lowest(&self, count: usize, max_ratio: CollateralRatio) -> Vec<u64> {
        self.entries
            .iter()
            .take_while(|(ratio, _)| *ratio <= max_ratio)
            .take(count)
            .map(|(_, id)| *id)
            .collect()
    }
}
