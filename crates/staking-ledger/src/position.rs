//! Positions and reward accumulators
//!
//! Rewards are distributed with a per-asset accumulator: every deposit
//! raises the accumulator by `amount * SCALE / total_shares`, and a position
//! is owed `(accumulator - checkpoint) * shares / SCALE`. Whatever does not
//! divide evenly stays in the slush and is folded in on the next update.

use crate::{Error, Result};
use ethdkg_core::Height;
use primitive_types::U256;
use serde::{Deserialize, Serialize};

/// Fixed-point scale of the accumulators, 10^18
pub fn scale() -> U256 {
    U256::exp10(18)
}

/// Per-asset reward accumulator
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Accumulator {
    pub accumulator: U256,
    /// Undistributed remainder, scaled by [`scale`]
    pub slush: U256,
}

impl Accumulator {
    /// Add `amount` to be shared among `shares`
    pub fn deposit(&mut self, shares: U256, amount: U256) -> Result<()> {
        let scaled = amount.checked_mul(scale()).ok_or(Error::Overflow)?;
        self.slush = self.slush.checked_add(scaled).ok_or(Error::Overflow)?;
        self.skim(shares)
    }

    /// Move the evenly divisible part of the slush into the accumulator.
    /// Nothing moves while there are no shares.
    pub fn skim(&mut self, shares: U256) -> Result<()> {
        if shares.is_zero() {
            return Ok(());
        }
        let delta = self.slush / shares;
        self.slush -= delta * shares;
        self.accumulator = self.accumulator.checked_add(delta).ok_or(Error::Overflow)?;
        Ok(())
    }

    /// Pay out what a position holding `position_shares` with checkpoint
    /// `checkpoint` is owed, then move the checkpoint up
    pub fn collect(
        &mut self,
        total_shares: U256,
        position_shares: U256,
        checkpoint: &mut U256,
    ) -> Result<U256> {
        self.skim(total_shares)?;
        let owed = self
            .accumulator
            .checked_sub(*checkpoint)
            .ok_or(Error::Overflow)?
            .checked_mul(position_shares)
            .ok_or(Error::Overflow)?;
        let payout = owed / scale();
        self.slush = self
            .slush
            .checked_add(owed - payout * scale())
            .ok_or(Error::Overflow)?;
        *checkpoint = self.accumulator;
        Ok(payout)
    }
}

/// A staked position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub shares: U256,
    /// First height the position may be burned at
    pub free_after: Height,
    /// First height profits may be collected at
    pub withdraw_free_after: Height,
    pub acc_eth: U256,
    pub acc_token: U256,
}

/// Amounts paid out by a burn or collection
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payout {
    pub eth: U256,
    pub token: U256,
}

impl Payout {
    pub fn new(eth: impl Into<U256>, token: impl Into<U256>) -> Self {
        Self {
            eth: eth.into(),
            token: token.into(),
        }
    }

    pub fn is_zero(&self) -> bool {
        self.eth.is_zero() && self.token.is_zero()
    }

    pub fn saturating_add(self, other: Payout) -> Payout {
        Payout {
            eth: self.eth.saturating_add(other.eth),
            token: self.token.saturating_add(other.token),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deposit_splits_by_shares() {
        let mut acc = Accumulator::default();
        let total = U256::from(4000u64);
        acc.deposit(total, U256::from(400u64)).unwrap();
        assert_eq!(acc.accumulator, U256::exp10(17));
        assert!(acc.slush.is_zero());

        let mut small = U256::zero();
        let mut large = U256::zero();
        assert_eq!(
            acc.collect(total, U256::from(1000u64), &mut small).unwrap(),
            U256::from(100u64)
        );
        assert_eq!(
            acc.collect(total, U256::from(3000u64), &mut large).unwrap(),
            U256::from(300u64)
        );
        // a second collection pays nothing
        assert!(acc.collect(total, U256::from(1000u64), &mut small).unwrap().is_zero());
    }

    #[test]
    fn test_remainders_stay_in_slush() {
        let mut acc = Accumulator::default();
        let total = U256::from(3u64);
        acc.deposit(total, U256::from(1u64)).unwrap();

        let mut checkpoints = [U256::zero(); 3];
        let paid: U256 = checkpoints
            .iter_mut()
            .map(|checkpoint| acc.collect(total, U256::one(), checkpoint).unwrap())
            .fold(U256::zero(), |sum, p| sum + p);

        // a third of a unit each rounds down to nothing, and nothing is lost
        assert!(paid.is_zero());
        let owed = checkpoints
            .iter()
            .fold(U256::zero(), |sum, checkpoint| sum + (acc.accumulator - *checkpoint));
        assert_eq!(owed + acc.slush, scale());
    }

    #[test]
    fn test_no_shares_keeps_slush() {
        let mut acc = Accumulator::default();
        acc.deposit(U256::zero(), U256::from(5u64)).unwrap();
        assert!(acc.accumulator.is_zero());
        assert_eq!(acc.slush, U256::from(5u64) * scale());

        acc.skim(U256::from(5u64)).unwrap();
        assert_eq!(acc.accumulator, scale());
    }
}
