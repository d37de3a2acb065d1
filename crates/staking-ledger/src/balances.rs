//! External balance ledger
//!
//! Token and ether balances live outside the staking ledger. Both the
//! staking ledger and the lockup move funds only through [`BalanceLedger`].

use crate::{Error, Result};
use dashmap::DashMap;
use ethdkg_core::Address;
use primitive_types::U256;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// The two assets positions earn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Asset {
    /// The staked ERC-20 token
    Token,
    Eth,
}

/// Balance oracle and transfer capability
pub trait BalanceLedger: Send + Sync {
    fn balance_of(&self, asset: Asset, account: &Address) -> U256;

    /// Move `amount` from `from` to `to`, failing without effect when `from`
    /// holds less
    fn transfer(&self, asset: Asset, from: &Address, to: &Address, amount: U256) -> Result<()>;
}

/// In-memory balances for testing and simulation
#[derive(Clone, Default)]
pub struct MemoryBalances {
    balances: Arc<DashMap<(Asset, Address), U256>>,
}

impl MemoryBalances {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create funds out of thin air
    pub fn credit(&self, asset: Asset, account: Address, amount: U256) {
        let mut entry = self.balances.entry((asset, account)).or_default();
        *entry = entry.saturating_add(amount);
    }
}

impl BalanceLedger for MemoryBalances {
    fn balance_of(&self, asset: Asset, account: &Address) -> U256 {
        self.balances
            .get(&(asset, *account))
            .map(|balance| *balance)
            .unwrap_or_default()
    }

    fn transfer(&self, asset: Asset, from: &Address, to: &Address, amount: U256) -> Result<()> {
        if amount.is_zero() || from == to {
            return Ok(());
        }

        let available = self.balance_of(asset, from);
        let remaining = available
            .checked_sub(amount)
            .ok_or(Error::InsufficientBalance {
                account: *from,
                asset,
                needed: amount,
                available,
            })?;
        self.balances.insert((asset, *from), remaining);
        self.credit(asset, *to, amount);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transfer() {
        let balances = MemoryBalances::new();
        let alice = Address::from_low_u64_be(1);
        let bob = Address::from_low_u64_be(2);
        balances.credit(Asset::Token, alice, U256::from(100u64));

        balances
            .transfer(Asset::Token, &alice, &bob, U256::from(60u64))
            .unwrap();
        assert_eq!(balances.balance_of(Asset::Token, &alice), U256::from(40u64));
        assert_eq!(balances.balance_of(Asset::Token, &bob), U256::from(60u64));
        assert_eq!(balances.balance_of(Asset::Eth, &bob), U256::zero());

        let err = balances
            .transfer(Asset::Token, &alice, &bob, U256::from(41u64))
            .unwrap_err();
        assert_eq!(
            err,
            Error::InsufficientBalance {
                account: alice,
                asset: Asset::Token,
                needed: U256::from(41u64),
                available: U256::from(40u64),
            }
        );
        assert_eq!(balances.balance_of(Asset::Token, &alice), U256::from(40u64));
    }
}
