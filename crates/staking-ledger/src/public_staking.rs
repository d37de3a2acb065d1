//! Staking position ledger
//!
//! Positions are non-fungible: each mint creates a new token id owning
//! `amount` shares. Fee deposits in either asset are shared among all live
//! positions through the accumulators in [`crate::position`].

use crate::balances::{Asset, BalanceLedger};
use crate::position::{Accumulator, Payout, Position};
use crate::{Error, Result, MAX_MINT_LOCK};
use ethdkg_core::{Address, Call};
use primitive_types::U256;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info, instrument};

/// Largest amount a single position may hold, `2^224 - 1`
pub fn max_mint_amount() -> U256 {
    U256::from(2u64).pow(U256::from(224u64)) - U256::one()
}

/// Position lifecycle events, in the order they happened
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event")]
pub enum PositionEvent {
    Minted {
        token_id: u64,
        to: Address,
        shares: U256,
        free_after: u64,
    },
    Burned {
        token_id: u64,
        owner: Address,
        to: Address,
        payout: Payout,
    },
    Transferred {
        token_id: u64,
        from: Address,
        to: Address,
    },
    Collected {
        token_id: u64,
        to: Address,
        payout: Payout,
    },
}

/// Notice handed to the receiver of a [`PublicStaking::safe_transfer_from`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Received {
    pub operator: Address,
    pub from: Address,
    pub token_id: u64,
    pub data: Vec<u8>,
}

/// Receiving side of [`PublicStaking::safe_transfer_from`]
pub trait Erc721Receiver<B> {
    /// Accept or refuse a position that was just transferred in. Refusing
    /// undoes the transfer.
    fn on_erc721_received(&mut self, call: Call, staking: &PublicStaking<B>, notice: &Received) -> Result<()>;
}

/// Plain accounts accept every position
impl<B> Erc721Receiver<B> for () {
    fn on_erc721_received(&mut self, _: Call, _: &PublicStaking<B>, _: &Received) -> Result<()> {
        Ok(())
    }
}

/// Aggregate reserve figures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReserveReport {
    /// Sum of shares of all live positions
    pub shares: U256,
    pub reserve_token: U256,
    pub reserve_eth: U256,
    /// Balance held beyond what the ledger accounts for
    pub excess_token: U256,
    pub excess_eth: U256,
}

/// The staking position ledger
pub struct PublicStaking<B> {
    address: Address,
    balances: B,
    positions: BTreeMap<u64, Position>,
    owners: BTreeMap<u64, Address>,
    approvals: BTreeMap<u64, Address>,
    last_token_id: u64,
    shares: U256,
    reserve_token: U256,
    reserve_eth: U256,
    token: Accumulator,
    eth: Accumulator,
    events: Vec<PositionEvent>,
}

impl<B: BalanceLedger> PublicStaking<B> {
    /// Create a ledger holding its funds at `address` in `balances`
    pub fn new(address: Address, balances: B) -> Self {
        Self {
            address,
            balances,
            positions: BTreeMap::new(),
            owners: BTreeMap::new(),
            approvals: BTreeMap::new(),
            last_token_id: 0,
            shares: U256::zero(),
            reserve_token: U256::zero(),
            reserve_eth: U256::zero(),
            token: Accumulator::default(),
            eth: Accumulator::default(),
            events: Vec::new(),
        }
    }

    /// Account the ledger's funds are held at
    pub fn address(&self) -> Address {
        self.address
    }

    pub fn balances(&self) -> &B {
        &self.balances
    }

    pub fn total_shares(&self) -> U256 {
        self.shares
    }

    pub fn position(&self, token_id: u64) -> Result<&Position> {
        self.positions
            .get(&token_id)
            .ok_or(Error::InvalidTokenId(token_id))
    }

    pub fn accumulators(&self) -> (Accumulator, Accumulator) {
        (self.eth, self.token)
    }

    /// Events not yet drained
    pub fn events(&self) -> &[PositionEvent] {
        &self.events
    }

    pub fn drain_events(&mut self) -> Vec<PositionEvent> {
        std::mem::take(&mut self.events)
    }

    /// Stake `amount` for the caller with the shortest lock
    pub fn mint(&mut self, call: Call, amount: U256) -> Result<u64> {
        self.mint_to(call, call.caller, amount, 1)
    }

    /// Stake `amount` of the caller's tokens into a new position owned by
    /// `to`, burnable `lock_duration` blocks from now
    #[instrument(skip_all, fields(caller = ?call.caller, height = call.height, ?to, %amount, lock_duration))]
    pub fn mint_to(&mut self, call: Call, to: Address, amount: U256, lock_duration: u64) -> Result<u64> {
        if amount.is_zero() {
            return Err(Error::MintAmountZero);
        }
        if amount > max_mint_amount() {
            return Err(Error::MintAmountExceedsMaximumSupply(amount));
        }
        if lock_duration > MAX_MINT_LOCK {
            return Err(Error::LockDurationGreaterThanMintLock(lock_duration));
        }
        let shares = self.shares.checked_add(amount).ok_or(Error::Overflow)?;
        let reserve_token = self.reserve_token.checked_add(amount).ok_or(Error::Overflow)?;

        // fold pending slush in before the new shares join
        let mut eth = self.eth;
        let mut token = self.token;
        eth.skim(self.shares)?;
        token.skim(self.shares)?;

        self.balances
            .transfer(Asset::Token, &call.caller, &self.address, amount)?;

        self.eth = eth;
        self.token = token;
        self.shares = shares;
        self.reserve_token = reserve_token;
        self.last_token_id += 1;
        let token_id = self.last_token_id;
        let free_after = call.height.saturating_add(lock_duration);
        self.positions.insert(
            token_id,
            Position {
                shares: amount,
                free_after,
                withdraw_free_after: call.height.saturating_add(1),
                acc_eth: eth.accumulator,
                acc_token: token.accumulator,
            },
        );
        self.owners.insert(token_id, to);
        self.events.push(PositionEvent::Minted {
            token_id,
            to,
            shares: amount,
            free_after,
        });

        info!(token_id, free_after, "Position minted");
        Ok(token_id)
    }

    /// Burn the caller's position and pay everything to the caller
    pub fn burn(&mut self, call: Call, token_id: u64) -> Result<Payout> {
        self.burn_to(call, call.caller, token_id)
    }

    /// Burn the caller's position and pay principal plus profits to `to`.
    ///
    /// The returned token amount includes the principal.
    #[instrument(skip_all, fields(caller = ?call.caller, height = call.height, ?to, token_id))]
    pub fn burn_to(&mut self, call: Call, to: Address, token_id: u64) -> Result<Payout> {
        let owner = self.owner_of(token_id)?;
        if owner != call.caller {
            return Err(Error::CallerNotTokenOwner(call.caller));
        }
        let mut position = *self.position(token_id)?;
        if call.height < position.free_after {
            return Err(Error::FreeAfterTimeNotReached {
                free_after: position.free_after,
                height: call.height,
            });
        }

        let mut eth = self.eth;
        let mut token = self.token;
        let profit = Payout {
            eth: eth.collect(self.shares, position.shares, &mut position.acc_eth)?,
            token: token.collect(self.shares, position.shares, &mut position.acc_token)?,
        };
        let payout = Payout {
            eth: profit.eth,
            token: profit.token.checked_add(position.shares).ok_or(Error::Overflow)?,
        };
        let reserve_eth = self.reserve_eth.checked_sub(payout.eth).ok_or(Error::Overflow)?;
        let reserve_token = self.reserve_token.checked_sub(payout.token).ok_or(Error::Overflow)?;
        self.pay(&to, payout)?;

        self.eth = eth;
        self.token = token;
        self.reserve_eth = reserve_eth;
        self.reserve_token = reserve_token;
        self.shares -= position.shares;
        self.positions.remove(&token_id);
        self.owners.remove(&token_id);
        self.approvals.remove(&token_id);
        self.events.push(PositionEvent::Burned {
            token_id,
            owner,
            to,
            payout,
        });

        info!(eth = %payout.eth, token = %payout.token, "Position burned");
        Ok(payout)
    }

    /// Share `amount` of the depositor's tokens among all positions
    #[instrument(skip_all, fields(caller = ?call.caller, %amount))]
    pub fn deposit_token(&mut self, call: Call, amount: U256) -> Result<()> {
        self.deposit(call, Asset::Token, amount)
    }

    /// Share `amount` of the depositor's ether among all positions
    #[instrument(skip_all, fields(caller = ?call.caller, %amount))]
    pub fn deposit_eth(&mut self, call: Call, amount: U256) -> Result<()> {
        self.deposit(call, Asset::Eth, amount)
    }

    fn deposit(&mut self, call: Call, asset: Asset, amount: U256) -> Result<()> {
        let mut accumulator = match asset {
            Asset::Eth => self.eth,
            Asset::Token => self.token,
        };
        accumulator.deposit(self.shares, amount)?;
        let reserve = match asset {
            Asset::Eth => self.reserve_eth,
            Asset::Token => self.reserve_token,
        }
        .checked_add(amount)
        .ok_or(Error::Overflow)?;

        self.balances
            .transfer(asset, &call.caller, &self.address, amount)?;

        match asset {
            Asset::Eth => {
                self.eth = accumulator;
                self.reserve_eth = reserve;
            }
            Asset::Token => {
                self.token = accumulator;
                self.reserve_token = reserve;
            }
        }
        debug!(?asset, accumulator = %accumulator.accumulator, "Deposit shared");
        Ok(())
    }

    /// Profits owed to a position right now, without collecting them
    pub fn estimate_collection(&self, token_id: u64) -> Result<Payout> {
        let mut position = *self.position(token_id)?;
        let (mut eth, mut token) = (self.eth, self.token);
        Ok(Payout {
            eth: eth.collect(self.shares, position.shares, &mut position.acc_eth)?,
            token: token.collect(self.shares, position.shares, &mut position.acc_token)?,
        })
    }

    pub fn collect_eth(&mut self, call: Call, token_id: u64) -> Result<U256> {
        Ok(self.collect_to(call, call.caller, token_id, true, false)?.eth)
    }

    pub fn collect_eth_to(&mut self, call: Call, to: Address, token_id: u64) -> Result<U256> {
        Ok(self.collect_to(call, to, token_id, true, false)?.eth)
    }

    pub fn collect_token(&mut self, call: Call, token_id: u64) -> Result<U256> {
        Ok(self.collect_to(call, call.caller, token_id, false, true)?.token)
    }

    pub fn collect_token_to(&mut self, call: Call, to: Address, token_id: u64) -> Result<U256> {
        Ok(self.collect_to(call, to, token_id, false, true)?.token)
    }

    pub fn collect_all_profits(&mut self, call: Call, token_id: u64) -> Result<Payout> {
        self.collect_to(call, call.caller, token_id, true, true)
    }

    pub fn collect_all_profits_to(&mut self, call: Call, to: Address, token_id: u64) -> Result<Payout> {
        self.collect_to(call, to, token_id, true, true)
    }

    #[instrument(skip_all, fields(caller = ?call.caller, height = call.height, ?to, token_id))]
    fn collect_to(
        &mut self,
        call: Call,
        to: Address,
        token_id: u64,
        collect_eth: bool,
        collect_token: bool,
    ) -> Result<Payout> {
        if self.owner_of(token_id)? != call.caller {
            return Err(Error::CallerNotTokenOwner(call.caller));
        }
        let mut position = *self.position(token_id)?;
        if call.height < position.withdraw_free_after {
            return Err(Error::LockedWithdrawal {
                withdraw_free_after: position.withdraw_free_after,
                height: call.height,
            });
        }

        let (mut eth, mut token) = (self.eth, self.token);
        let mut payout = Payout::default();
        if collect_eth {
            payout.eth = eth.collect(self.shares, position.shares, &mut position.acc_eth)?;
        }
        if collect_token {
            payout.token = token.collect(self.shares, position.shares, &mut position.acc_token)?;
        }
        let reserve_eth = self.reserve_eth.checked_sub(payout.eth).ok_or(Error::Overflow)?;
        let reserve_token = self.reserve_token.checked_sub(payout.token).ok_or(Error::Overflow)?;
        self.pay(&to, payout)?;

        self.eth = eth;
        self.token = token;
        self.reserve_eth = reserve_eth;
        self.reserve_token = reserve_token;
        self.positions.insert(token_id, position);
        self.events.push(PositionEvent::Collected {
            token_id,
            to,
            payout,
        });

        debug!(eth = %payout.eth, token = %payout.token, "Profits collected");
        Ok(payout)
    }

    fn pay(&self, to: &Address, payout: Payout) -> Result<()> {
        self.balances
            .transfer(Asset::Eth, &self.address, to, payout.eth)?;
        self.balances
            .transfer(Asset::Token, &self.address, to, payout.token)
    }

    pub fn owner_of(&self, token_id: u64) -> Result<Address> {
        self.owners
            .get(&token_id)
            .copied()
            .ok_or(Error::InvalidTokenId(token_id))
    }

    /// Number of live positions owned by `owner`
    pub fn balance_of(&self, owner: &Address) -> usize {
        self.owners.values().filter(|o| *o == owner).count()
    }

    /// Live token ids owned by `owner`, ascending
    pub fn tokens_of(&self, owner: &Address) -> Vec<u64> {
        self.owners
            .iter()
            .filter(|(_, o)| *o == owner)
            .map(|(id, _)| *id)
            .collect()
    }

    /// Let `approved` transfer the caller's position
    pub fn approve(&mut self, call: Call, approved: Address, token_id: u64) -> Result<()> {
        if self.owner_of(token_id)? != call.caller {
            return Err(Error::CallerNotTokenOwner(call.caller));
        }
        self.approvals.insert(token_id, approved);
        Ok(())
    }

    pub fn get_approved(&self, token_id: u64) -> Result<Option<Address>> {
        self.owner_of(token_id)?;
        Ok(self.approvals.get(&token_id).copied())
    }

    /// Move a position; the caller must own it or be approved for it
    #[instrument(skip_all, fields(caller = ?call.caller, ?from, ?to, token_id))]
    pub fn transfer_from(&mut self, call: Call, from: Address, to: Address, token_id: u64) -> Result<()> {
        let owner = self.owner_of(token_id)?;
        let approved = self.approvals.get(&token_id) == Some(&call.caller);
        if call.caller != owner && !approved {
            return Err(Error::CallerNotTokenOwnerOrApproved(call.caller));
        }
        if owner != from {
            return Err(Error::TransferFromIncorrectOwner { token_id, from });
        }

        self.approvals.remove(&token_id);
        self.owners.insert(token_id, to);
        self.events
            .push(PositionEvent::Transferred { token_id, from, to });
        debug!("Position transferred");
        Ok(())
    }

    /// Transfer and hand the notice to `receiver`. If the receiver refuses,
    /// ownership and approval are restored and its error is returned.
    pub fn safe_transfer_from<R: Erc721Receiver<B> + ?Sized>(
        &mut self,
        call: Call,
        from: Address,
        to: Address,
        token_id: u64,
        data: &[u8],
        receiver: &mut R,
    ) -> Result<Received> {
        let approval = self.approvals.get(&token_id).copied();
        let logged = self.events.len();
        self.transfer_from(call, from, to, token_id)?;

        let notice = Received {
            operator: call.caller,
            from,
            token_id,
            data: data.to_vec(),
        };
        if let Err(err) = receiver.on_erc721_received(Call::new(self.address, call.height), self, &notice) {
            self.owners.insert(token_id, from);
            if let Some(approved) = approval {
                self.approvals.insert(token_id, approved);
            }
            self.events.truncate(logged);
            debug!(?err, "Transfer refused by receiver");
            return Err(err);
        }
        Ok(notice)
    }

    /// Shares, reserves and whatever the ledger holds beyond its reserves
    pub fn reserve_report(&self) -> ReserveReport {
        let token_balance = self.balances.balance_of(Asset::Token, &self.address);
        let eth_balance = self.balances.balance_of(Asset::Eth, &self.address);
        ReserveReport {
            shares: self.shares,
            reserve_token: self.reserve_token,
            reserve_eth: self.reserve_eth,
            excess_token: token_balance.saturating_sub(self.reserve_token),
            excess_eth: eth_balance.saturating_sub(self.reserve_eth),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::balances::MemoryBalances;

    const STAKING: u64 = 0xfee;

    fn addr(n: u64) -> Address {
        Address::from_low_u64_be(n)
    }

    fn amount(n: u64) -> U256 {
        U256::from(n)
    }

    fn setup() -> (PublicStaking<MemoryBalances>, MemoryBalances) {
        let balances = MemoryBalances::new();
        for n in 1..=3 {
            balances.credit(Asset::Token, addr(n), amount(1_000_000));
            balances.credit(Asset::Eth, addr(n), amount(1_000_000));
        }
        (PublicStaking::new(addr(STAKING), balances.clone()), balances)
    }

    /// Live shares plus undistributed fees equal what the ledger holds
    fn assert_reserves(staking: &PublicStaking<MemoryBalances>) {
        let report = staking.reserve_report();
        let live: U256 = staking
            .positions
            .values()
            .fold(U256::zero(), |sum, p| sum + p.shares);
        assert_eq!(report.shares, live);
        assert!(report.excess_token.is_zero());
        assert!(report.excess_eth.is_zero());
        assert!(report.reserve_token >= live);
    }

    #[test]
    fn test_mint_burn_round_trip() {
        let (mut staking, balances) = setup();
        let owner = addr(1);

        for i in 0..10u64 {
            let height = 100 + i * 10;
            let token_id = staking.mint(Call::new(owner, height), amount(1000)).unwrap();
            let position = *staking.position(token_id).unwrap();
            assert_eq!(position.shares, amount(1000));
            assert_eq!(position.free_after, height + 1);
            assert_eq!(position.withdraw_free_after, height + 1);
            assert_eq!(balances.balance_of(Asset::Token, &addr(STAKING)), amount(1000));
            assert_reserves(&staking);

            let payout = staking.burn(Call::new(owner, height + 3), token_id).unwrap();
            assert_eq!(payout, Payout::new(0u64, 1000u64));
            assert!(balances.balance_of(Asset::Token, &addr(STAKING)).is_zero());
            assert_eq!(staking.reserve_report().reserve_token, U256::zero());
        }
        assert_eq!(balances.balance_of(Asset::Token, &owner), amount(1_000_000));
        assert_eq!(staking.balance_of(&owner), 0);
    }

    #[test]
    fn test_mint_validation() {
        let (mut staking, _) = setup();
        let call = Call::new(addr(1), 10);

        assert_eq!(staking.mint(call, U256::zero()).unwrap_err(), Error::MintAmountZero);
        let too_much = max_mint_amount() + U256::one();
        assert_eq!(
            staking.mint(call, too_much).unwrap_err(),
            Error::MintAmountExceedsMaximumSupply(too_much)
        );
        assert_eq!(
            staking
                .mint_to(call, addr(1), amount(10), MAX_MINT_LOCK + 1)
                .unwrap_err(),
            Error::LockDurationGreaterThanMintLock(MAX_MINT_LOCK + 1)
        );

        // not enough tokens to pull
        let err = staking.mint(call, amount(2_000_000)).unwrap_err();
        assert!(matches!(err, Error::InsufficientBalance { .. }));
        assert_eq!(err.category(), crate::ErrorCategory::Collaborator);
        assert!(staking.total_shares().is_zero());
    }

    #[test]
    fn test_burn_maturity_is_inclusive() {
        let (mut staking, _) = setup();
        let owner = addr(1);
        let token_id = staking
            .mint_to(Call::new(owner, 100), owner, amount(500), 10)
            .unwrap();
        assert_eq!(staking.position(token_id).unwrap().free_after, 110);

        assert_eq!(
            staking.burn(Call::new(owner, 109), token_id).unwrap_err(),
            Error::FreeAfterTimeNotReached {
                free_after: 110,
                height: 109
            }
        );
        assert_eq!(
            staking.burn(Call::new(owner, 110), token_id).unwrap(),
            Payout::new(0u64, 500u64)
        );
    }

    #[test]
    fn test_burn_rejections() {
        let (mut staking, _) = setup();
        let owner = addr(1);
        let token_id = staking.mint(Call::new(owner, 100), amount(1000)).unwrap();

        assert_eq!(
            staking.burn(Call::new(addr(2), 103), token_id).unwrap_err(),
            Error::CallerNotTokenOwner(addr(2))
        );
        staking.burn(Call::new(owner, 103), token_id).unwrap();
        assert_eq!(
            staking.burn(Call::new(owner, 105), token_id).unwrap_err(),
            Error::InvalidTokenId(token_id)
        );
        let events = staking.drain_events();
        assert!(matches!(events.last(), Some(PositionEvent::Burned { .. })));

        let json = serde_json::to_value(&events).unwrap();
        assert_eq!(json[0]["event"], "Minted");
        assert_eq!(json[1]["event"], "Burned");
        let err = serde_json::to_value(Error::InvalidTokenId(token_id)).unwrap();
        assert_eq!(err["error"], "InvalidTokenId");
    }

    #[test]
    fn test_fee_deposits_are_shared() {
        let (mut staking, balances) = setup();
        let small = staking.mint(Call::new(addr(1), 100), amount(1000)).unwrap();
        let large = staking.mint(Call::new(addr(2), 100), amount(3000)).unwrap();

        staking.deposit_token(Call::new(addr(3), 101), amount(400)).unwrap();
        staking.deposit_eth(Call::new(addr(3), 101), amount(40)).unwrap();
        assert_reserves(&staking);
        assert_eq!(staking.estimate_collection(small).unwrap(), Payout::new(10u64, 100u64));

        let collected = staking.collect_all_profits(Call::new(addr(1), 102), small).unwrap();
        assert_eq!(collected, Payout::new(10u64, 100u64));
        assert!(staking.estimate_collection(small).unwrap().is_zero());
        assert_reserves(&staking);

        let payout = staking.burn(Call::new(addr(2), 102), large).unwrap();
        assert_eq!(payout, Payout::new(30u64, 3300u64));
        assert_eq!(balances.balance_of(Asset::Eth, &addr(2)), amount(1_000_030));
        assert_reserves(&staking);
    }

    #[test]
    fn test_collect_requires_withdraw_maturity() {
        let (mut staking, _) = setup();
        let token_id = staking.mint(Call::new(addr(1), 100), amount(1000)).unwrap();
        staking.deposit_eth(Call::new(addr(2), 100), amount(10)).unwrap();

        assert_eq!(
            staking.collect_eth(Call::new(addr(1), 100), token_id).unwrap_err(),
            Error::LockedWithdrawal {
                withdraw_free_after: 101,
                height: 100
            }
        );
        assert_eq!(
            staking.collect_eth_to(Call::new(addr(1), 101), addr(3), token_id).unwrap(),
            amount(10)
        );
        assert_eq!(
            staking.collect_token(Call::new(addr(2), 101), token_id).unwrap_err(),
            Error::CallerNotTokenOwner(addr(2))
        );
    }

    #[test]
    fn test_transfers_and_approvals() {
        let (mut staking, _) = setup();
        let owner = addr(1);
        let token_id = staking.mint(Call::new(owner, 100), amount(1000)).unwrap();

        assert_eq!(
            staking
                .transfer_from(Call::new(addr(2), 101), owner, addr(2), token_id)
                .unwrap_err(),
            Error::CallerNotTokenOwnerOrApproved(addr(2))
        );

        staking.approve(Call::new(owner, 101), addr(2), token_id).unwrap();
        assert_eq!(staking.get_approved(token_id).unwrap(), Some(addr(2)));
        let notice = staking
            .safe_transfer_from(Call::new(addr(2), 101), owner, addr(3), token_id, b"hi", &mut ())
            .unwrap();
        assert_eq!(notice.operator, addr(2));
        assert_eq!(notice.from, owner);
        assert_eq!(staking.owner_of(token_id).unwrap(), addr(3));
        assert_eq!(staking.get_approved(token_id).unwrap(), None);
        assert_eq!(staking.tokens_of(&addr(3)), vec![token_id]);

        // the new owner burns it
        assert_eq!(
            staking.burn(Call::new(owner, 105), token_id).unwrap_err(),
            Error::CallerNotTokenOwner(owner)
        );
        staking.burn(Call::new(addr(3), 105), token_id).unwrap();
    }

    #[test]
    fn test_unaccounted_funds_show_as_excess() {
        let (mut staking, balances) = setup();
        staking.mint(Call::new(addr(1), 100), amount(1000)).unwrap();
        balances.credit(Asset::Token, addr(STAKING), amount(7));

        let report = staking.reserve_report();
        assert_eq!(report.reserve_token, amount(1000));
        assert_eq!(report.excess_token, amount(7));
    }
}
