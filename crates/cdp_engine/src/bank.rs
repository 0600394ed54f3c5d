//! Token ledger collaborator: balances, transfers, mint and burn

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::CdpError;

/// Account holding balances
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Account {
    /// Holds locked collateral and the debt coins of open positions
    Cdp,
    /// Holds seized collateral, debt and surplus awaiting auction
    Liquidator,
    /// Escrow of running auctions
    Auction,
    User(String),
}

impl fmt::Display for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Account::Cdp => f.write_str("cdp"),
            Account::Liquidator => f.write_str("liquidator"),
            Account::Auction => f.write_str("auction"),
            Account::User(addr) => f.write_str(addr),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Coin {
    pub denom: String,
    #[serde(with = "crate::amount")]
    pub amount: u128,
}

impl Coin {
    pub fn new(denom: impl Into<String>, amount: u128) -> Self {
        Self {
            denom: denom.into(),
            amount,
        }
    }

    pub fn is_zero(&self) -> bool {
        self.amount == 0
    }
}

impl fmt::Display for Coin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.amount, self.denom)
    }
}

/// Balance primitives consumed by the engine. Every call is atomic: on
/// error no balance has changed.
pub trait Bank {
    fn balance(&self, account: &Account, denom: &str) -> u128;

    fn transfer(&mut self, from: &Account, to: &Account, coin: &Coin) -> Result<(), CdpError>;

    fn mint(&mut self, to: &Account, coin: &Coin) -> Result<(), CdpError>;

    fn burn(&mut self, from: &Account, coin: &Coin) -> Result<(), CdpError>;
}

/// In-memory bank
#[derive(Debug, Clone, Default)]
pub struct MemoryBank {
    balances: BTreeMap<(Account, String), u128>,
    supply: BTreeMap<String, u128>,
}

impl MemoryBank {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total minted amount of `denom`
    pub fn supply(&self, denom: &str) -> u128 {
        self.supply.get(denom).copied().unwrap_or(0)
    }

    fn debit(&mut self, account: &Account, coin: &Coin) -> Result<(), CdpError> {
        let available = self.balance(account, &coin.denom);
        let remaining = available
            .checked_sub(coin.amount)
            .ok_or_else(|| CdpError::InsufficientFunds {
                account: account.to_string(),
                denom: coin.denom.clone(),
                available,
                required: coin.amount,
            })?;

        let key = (account.clone(), coin.denom.clone());
        if remaining == 0 {
            self.balances.remove(&key);
        } else {
            self.balances.insert(key, remaining);
        }
        Ok(())
    }

    fn credit(&mut self, account: &Account, coin: &Coin) -> Result<(), CdpError> {
        let entry = self
            .balances
            .entry((account.clone(), coin.denom.clone()))
            .or_insert(0);
        *entry = entry
            .checked_add(coin.amount)
            .ok_or(CdpError::Overflow("bank balance"))?;
        Ok(())
    }
}

impl Bank for MemoryBank {
    fn balance(&self, account: &Account, denom: &str) -> u128 {
        self.balances
            .get(&(account.clone(), denom.to_string()))
            .copied()
            .unwrap_or(0)
    }

    fn transfer(&mut self, from: &Account, to: &Account, coin: &Coin) -> Result<(), CdpError> {
        if coin.is_zero() || from == to {
            return Ok(());
        }
        // Check the credit side first so a failed transfer leaves no trace
        self.balance(to, &coin.denom)
            .checked_add(coin.amount)
            .ok_or(CdpError::Overflow("bank balance"))?;
        self.debit(from, coin)?;
        self.credit(to, coin)
    }

    fn mint(&mut self, to: &Account, coin: &Coin) -> Result<(), CdpError> {
        if coin.is_zero() {
            return Ok(());
        }
        let new_supply = self
            .supply(&coin.denom)
            .checked_add(coin.amount)
            .ok_or(CdpError::Overflow("token supply"))?;
        self.credit(to, coin)?;
        self.supply.insert(coin.denom.clone(), new_supply);
        Ok(())
    }

    fn burn(&mut self, from: &Account, coin: &Coin) -> Result<(), CdpError> {
        if coin.is_zero() {
            return Ok(());
        }
        self.debit(from, coin)?;
        let supply = self.supply(&coin.denom).saturating_sub(coin.amount);
        self.supply.insert(coin.denom.clone(), supply);
        Ok(())
    }
}
