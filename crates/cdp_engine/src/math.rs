//! Checked fixed-point arithmetic - no floats, no panics, no silent wraparound
//!
//! Every amount in the ledger is a `u128` in base units. Rates, ratios and
//! prices are `FixedU128`: an unsigned decimal with 18 fractional digits.
//! Intermediate products are computed in 256 bits so that `a * b / c` never
//! overflows before the division.

use std::fmt;
use std::str::FromStr;

use primitive_types::U256;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::CdpError;

/// Number of fractional decimal digits carried by `FixedU128`
pub const DECIMALS: u32 = 18;

/// 10^18, the representation of 1.0
pub const SCALE: u128 = 1_000_000_000_000_000_000;

/// Add u128, failing on overflow
pub fn add_u128(a: u128, b: u128, what: &'static str) -> Result<u128, CdpError> {
    a.checked_add(b).ok_or(CdpError::Overflow(what))
}

/// Subtract u128, failing on underflow
pub fn sub_u128(a: u128, b: u128, what: &'static str) -> Result<u128, CdpError> {
    a.checked_sub(b).ok_or(CdpError::Overflow(what))
}

/// Multiply u128, failing on overflow
pub fn mul_u128(a: u128, b: u128, what: &'static str) -> Result<u128, CdpError> {
    a.checked_mul(b).ok_or(CdpError::Overflow(what))
}

/// 10^exp as u128
pub fn pow10(exp: u32) -> Option<u128> {
    10u128.checked_pow(exp)
}

fn narrow(x: U256) -> Option<u128> {
    if x > U256::from(u128::MAX) {
        None
    } else {
        Some(x.as_u128())
    }
}

/// floor(a * b / c)
pub fn mul_div_floor(a: u128, b: u128, c: u128) -> Option<u128> {
    if c == 0 {
        return None;
    }
    narrow(U256::from(a) * U256::from(b) / U256::from(c))
}

/// a * b / c rounded half up
pub fn mul_div_round(a: u128, b: u128, c: u128) -> Option<u128> {
    if c == 0 {
        return None;
    }
    let c_wide = U256::from(c);
    narrow((U256::from(a) * U256::from(b) + c_wide / 2) / c_wide)
}

/// Compare a * b against c * d without overflow
pub fn cmp_products(a: u128, b: u128, c: u128, d: u128) -> std::cmp::Ordering {
    (U256::from(a) * U256::from(b)).cmp(&(U256::from(c) * U256::from(d)))
}

/// Unsigned 18-decimal fixed-point number.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct FixedU128(u128);

impl FixedU128 {
    pub const ZERO: Self = Self(0);
    pub const ONE: Self = Self(SCALE);

    pub const fn from_inner(inner: u128) -> Self {
        Self(inner)
    }

    pub const fn into_inner(self) -> u128 {
        self.0
    }

    /// n / d rounded half up
    pub fn from_rational(n: u128, d: u128) -> Option<Self> {
        mul_div_round(n, SCALE, d).map(Self)
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// self * other, rounded half up
    pub fn checked_mul(self, other: Self) -> Option<Self> {
        mul_div_round(self.0, other.0, SCALE).map(Self)
    }

    /// self * n, rounded half up to an integer
    pub fn checked_mul_int(self, n: u128) -> Option<u128> {
        mul_div_round(self.0, n, SCALE)
    }

    /// self^n by repeated squaring.
    ///
    /// Every intermediate product is rounded half up to 18 decimals, so the
    /// result depends only on `self` and `n` and is identical on every
    /// replica.
    pub fn checked_pow(self, n: u64) -> Option<Self> {
        if self.0 == 0 {
            return Some(if n == 0 { Self::ONE } else { Self::ZERO });
        }

        let mut x = self;
        let mut z = if n % 2 == 1 { self } else { Self::ONE };
        let mut n = n / 2;

        while n > 0 {
            x = x.checked_mul(x)?;
            if n % 2 == 1 {
                z = z.checked_mul(x)?;
            }
            n /= 2;
        }

        Some(z)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseFixedError {
    #[error("empty decimal string")]
    Empty,
    #[error("invalid decimal string {0:?}")]
    Invalid(String),
    #[error("more than 18 fractional digits in {0:?}")]
    TooPrecise(String),
    #[error("decimal {0:?} out of range")]
    OutOfRange(String),
}

impl FromStr for FixedU128 {
    type Err = ParseFixedError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(ParseFixedError::Empty);
        }

        let (int_part, frac_part) = match s.split_once('.') {
            Some((i, f)) => (i, f),
            None => (s, ""),
        };
        if int_part.is_empty()
            || !int_part.bytes().all(|b| b.is_ascii_digit())
            || !frac_part.bytes().all(|b| b.is_ascii_digit())
        {
            return Err(ParseFixedError::Invalid(s.to_string()));
        }
        if frac_part.len() > DECIMALS as usize {
            return Err(ParseFixedError::TooPrecise(s.to_string()));
        }

        let out_of_range = || ParseFixedError::OutOfRange(s.to_string());
        let int_value: u128 = int_part.parse().map_err(|_| out_of_range())?;
        let frac_value: u128 = if frac_part.is_empty() {
            0
        } else {
            let digits: u128 = frac_part.parse().map_err(|_| out_of_range())?;
            let pad = pow10(DECIMALS - frac_part.len() as u32).ok_or_else(out_of_range)?;
            digits * pad
        };

        int_value
            .checked_mul(SCALE)
            .and_then(|v| v.checked_add(frac_value))
            .map(Self)
            .ok_or_else(out_of_range)
    }
}

impl fmt::Display for FixedU128 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let int_part = self.0 / SCALE;
        let frac_part = self.0 % SCALE;
        if frac_part == 0 {
            return write!(f, "{}", int_part);
        }
        let frac = format!("{:018}", frac_part);
        write!(f, "{}.{}", int_part, frac.trim_end_matches('0'))
    }
}

impl TryFrom<String> for FixedU128 {
    type Error = ParseFixedError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<FixedU128> for String {
    fn from(value: FixedU128) -> Self {
        value.to_string()
    }
}
