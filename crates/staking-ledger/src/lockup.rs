//! Time-boxed lockup of staking positions
//!
//! Users hand their staking positions to the lockup before it starts and get
//! them back, together with a share of the reward pool, after it ends:
//!
//! ```text
//!   created        start = created + enrollment      end = start + lock_duration
//!      |---- PreLock ----|---------- InLock ----------|---- PostLock ...
//! ```
//!
//! Profits collected before PostLock are split: the user receives 80% right
//! away and 20% is reserved in the reward pool. Once PostLock begins,
//! `aggregate_profits` collects every locked position one last time, burns
//! the bonus position into the reward pool and makes payouts safe.

use crate::balances::{Asset, BalanceLedger};
use crate::position::Payout;
use crate::public_staking::{Erc721Receiver, PublicStaking, Received};
use crate::{Error, Result};
use ethdkg_core::{Address, Call, Height};
use primitive_types::U256;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info, instrument};

/// Share of pre-aggregation profits kept for the reward pool, in basis points
pub const RESERVED_PROFIT_BPS: u64 = 2000;

/// Basis point denominator
pub const BPS: u64 = 10_000;

/// Lockup parameters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockupConfig {
    /// Blocks between creation and the start of the lock
    pub enrollment_period: u64,
    pub lock_duration: u64,
    /// Tokens the reward pool stakes as the bonus position
    pub total_bonus_amount: U256,
}

impl LockupConfig {
    pub fn new(enrollment_period: u64, lock_duration: u64, total_bonus_amount: U256) -> Result<Self> {
        let config = Self {
            enrollment_period,
            lock_duration,
            total_bonus_amount,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.lock_duration == 0 {
            return Err(Error::InvalidConfig("Lock duration must be positive".into()));
        }
        self.enrollment_period
            .checked_add(self.lock_duration)
            .ok_or_else(|| Error::InvalidConfig("Lockup period overflows height".into()))?;
        Ok(())
    }
}

/// Lockup state, a pure function of height
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum LockupState {
    PreLock,
    InLock,
    PostLock,
}

/// Account holding reserved profits and the bonus position
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewardPool {
    pub address: Address,
    /// Share of user profits kept back so far
    pub reserved: Payout,
    pub bonus_token: Option<u64>,
    /// Everything the bonus position paid out when it was burned
    pub bonus: Payout,
}

impl RewardPool {
    fn new(address: Address) -> Self {
        Self {
            address,
            reserved: Payout::default(),
            bonus_token: None,
            bonus: Payout::default(),
        }
    }

    /// Everything the pool distributes at unlock
    pub fn total(&self) -> Payout {
        self.reserved.saturating_add(self.bonus)
    }
}

/// Split collected profits into the user's part and the reserved part
pub fn split_profits(profit: Payout) -> (Payout, Payout) {
    let reserve = |amount: U256| amount.saturating_mul(U256::from(RESERVED_PROFIT_BPS)) / U256::from(BPS);
    let reserved = Payout {
        eth: reserve(profit.eth),
        token: reserve(profit.token),
    };
    let user = Payout {
        eth: profit.eth - reserved.eth,
        token: profit.token - reserved.token,
    };
    (user, reserved)
}

/// The lockup aggregator
#[derive(Debug, Clone, Serialize)]
pub struct Lockup {
    address: Address,
    config: LockupConfig,
    start: Height,
    end: Height,
    reward_pool: RewardPool,
    /// Owner to locked token id
    positions: BTreeMap<Address, u64>,
    /// Locked token id to owner
    claimed: BTreeMap<u64, Address>,
    /// Post-lock profits held for each owner until unlock
    credits: BTreeMap<Address, Payout>,
    shares_locked: U256,
    payout_safe: bool,
    /// Reward totals and locked shares when profits were aggregated
    snapshot: Option<(Payout, U256)>,
}

impl Lockup {
    /// Create a lockup at `height`; the lock starts after the enrollment
    /// period
    pub fn new(address: Address, reward_pool: Address, config: LockupConfig, height: Height) -> Result<Self> {
        config.validate()?;
        let start = height
            .checked_add(config.enrollment_period)
            .ok_or_else(|| Error::InvalidConfig("Lockup start overflows height".into()))?;
        let end = start
            .checked_add(config.lock_duration)
            .ok_or_else(|| Error::InvalidConfig("Lockup end overflows height".into()))?;

        info!(?address, start, end, "Lockup created");
        Ok(Self {
            address,
            config,
            start,
            end,
            reward_pool: RewardPool::new(reward_pool),
            positions: BTreeMap::new(),
            claimed: BTreeMap::new(),
            credits: BTreeMap::new(),
            shares_locked: U256::zero(),
            payout_safe: false,
            snapshot: None,
        })
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn config(&self) -> &LockupConfig {
        &self.config
    }

    pub fn start(&self) -> Height {
        self.start
    }

    pub fn end(&self) -> Height {
        self.end
    }

    pub fn state(&self, height: Height) -> LockupState {
        if height < self.start {
            LockupState::PreLock
        } else if height < self.end {
            LockupState::InLock
        } else {
            LockupState::PostLock
        }
    }

    /// Whether profits have been aggregated
    pub fn payout_safe(&self) -> bool {
        self.payout_safe
    }

    pub fn reward_pool(&self) -> &RewardPool {
        &self.reward_pool
    }

    pub fn shares_locked(&self) -> U256 {
        self.shares_locked
    }

    /// Token id locked for `owner`
    pub fn token_of(&self, owner: &Address) -> Option<u64> {
        self.positions.get(owner).copied()
    }

    pub fn owner_of(&self, token_id: u64) -> Option<Address> {
        self.claimed.get(&token_id).copied()
    }

    /// Profits credited to `owner` by aggregation
    pub fn credits_of(&self, owner: &Address) -> Payout {
        self.credits.get(owner).copied().unwrap_or_default()
    }

    fn only_pre_lock(&self, height: Height) -> Result<()> {
        if self.state(height) != LockupState::PreLock {
            return Err(Error::PreLockStateRequired);
        }
        Ok(())
    }

    fn exclude_post_lock(&self, height: Height) -> Result<()> {
        if self.state(height) == LockupState::PostLock {
            return Err(Error::PostLockStateNotAllowed);
        }
        Ok(())
    }

    fn only_post_lock(&self, height: Height) -> Result<()> {
        if self.state(height) != LockupState::PostLock {
            return Err(Error::PostLockStateRequired);
        }
        Ok(())
    }

    fn position_of(&self, owner: Address) -> Result<u64> {
        self.token_of(&owner).ok_or(Error::UserHasNoPosition(owner))
    }

    /// Accept a position sent with `safe_transfer_from`
    #[instrument(skip_all, fields(caller = ?call.caller, height = call.height, token_id = notice.token_id))]
    pub fn on_erc721_received<B: BalanceLedger>(
        &mut self,
        call: Call,
        staking: &PublicStaking<B>,
        notice: &Received,
    ) -> Result<()> {
        self.only_pre_lock(call.height)?;
        if call.caller != staking.address() {
            return Err(Error::OnlyStakingNFTAllowed);
        }
        self.lock_from_transfer(call, staking, notice.token_id, notice.from)
    }

    /// Claim a position already transferred to the lockup on behalf of
    /// `owner`
    #[instrument(skip_all, fields(caller = ?call.caller, height = call.height, token_id, ?owner))]
    pub fn lock_from_transfer<B: BalanceLedger>(
        &mut self,
        call: Call,
        staking: &PublicStaking<B>,
        token_id: u64,
        owner: Address,
    ) -> Result<()> {
        self.only_pre_lock(call.height)?;
        if staking.owner_of(token_id)? != self.address {
            return Err(Error::ContractDoesNotOwnTokenID(token_id));
        }
        if self.claimed.contains_key(&token_id) {
            return Err(Error::TokenIdAlreadyClaimed(token_id));
        }
        if self.positions.contains_key(&owner) {
            return Err(Error::UserAlreadyHasAPosition(owner));
        }
        let shares = staking.position(token_id)?.shares;
        let shares_locked = self.shares_locked.checked_add(shares).ok_or(Error::Overflow)?;

        self.positions.insert(owner, token_id);
        self.claimed.insert(token_id, owner);
        self.shares_locked = shares_locked;
        info!(%shares, "Position locked");
        Ok(())
    }

    /// Pull a position the caller approved the lockup for and lock it
    #[instrument(skip_all, fields(caller = ?call.caller, height = call.height, token_id))]
    pub fn lock_from_approval<B: BalanceLedger>(
        &mut self,
        call: Call,
        staking: &mut PublicStaking<B>,
        token_id: u64,
    ) -> Result<()> {
        self.only_pre_lock(call.height)?;
        if self.positions.contains_key(&call.caller) {
            return Err(Error::UserAlreadyHasAPosition(call.caller));
        }
        staking.safe_transfer_from(
            Call::new(self.address, call.height),
            call.caller,
            self.address,
            token_id,
            &[],
            self,
        )?;
        Ok(())
    }

    /// Stake the reward pool's bonus tokens into the bonus position
    #[instrument(skip_all, fields(height = call.height))]
    pub fn create_bonus_position<B: BalanceLedger>(
        &mut self,
        call: Call,
        staking: &mut PublicStaking<B>,
    ) -> Result<u64> {
        self.only_pre_lock(call.height)?;
        if self.reward_pool.bonus_token.is_some() {
            return Err(Error::BonusTokenAlreadyCreated);
        }
        let pool = self.reward_pool.address;
        let needed = self.config.total_bonus_amount;
        let available = staking.balances().balance_of(Asset::Token, &pool);
        if available < needed {
            return Err(Error::NotEnoughALCAToStake { needed, available });
        }

        let token_id = staking.mint_to(Call::new(pool, call.height), pool, needed, 1)?;
        self.reward_pool.bonus_token = Some(token_id);
        info!(token_id, %needed, "Bonus position created");
        Ok(token_id)
    }

    /// Collect the caller's profits before the lock ends; the reserved part
    /// goes to the reward pool
    #[instrument(skip_all, fields(caller = ?call.caller, height = call.height))]
    pub fn collect_all_profits<B: BalanceLedger>(
        &mut self,
        call: Call,
        staking: &mut PublicStaking<B>,
    ) -> Result<Payout> {
        self.exclude_post_lock(call.height)?;
        let token_id = self.position_of(call.caller)?;
        let profit = staking.collect_all_profits_to(
            Call::new(self.address, call.height),
            self.address,
            token_id,
        )?;
        self.distribute_profits(staking, call.caller, profit)
    }

    /// Pay the user's part of `profit` and reserve the rest
    fn distribute_profits<B: BalanceLedger>(
        &mut self,
        staking: &PublicStaking<B>,
        user: Address,
        profit: Payout,
    ) -> Result<Payout> {
        let (share, reserved) = split_profits(profit);
        self.pay(staking, &user, share)?;
        self.reserve(staking, reserved)?;
        debug!(?user, eth = %share.eth, token = %share.token, "Profits distributed");
        Ok(share)
    }

    fn reserve<B: BalanceLedger>(&mut self, staking: &PublicStaking<B>, reserved: Payout) -> Result<()> {
        let pool = self.reward_pool.address;
        self.pay(staking, &pool, reserved)?;
        self.reward_pool.reserved = self.reward_pool.reserved.saturating_add(reserved);
        Ok(())
    }

    fn pay<B: BalanceLedger>(&self, staking: &PublicStaking<B>, to: &Address, payout: Payout) -> Result<()> {
        let balances = staking.balances();
        balances.transfer(Asset::Eth, &self.address, to, payout.eth)?;
        balances.transfer(Asset::Token, &self.address, to, payout.token)
    }

    /// Leave the lockup before it ends, withdrawing `exit_value` of the
    /// caller's shares. The rest stays locked in a fresh position.
    #[instrument(skip_all, fields(caller = ?call.caller, height = call.height, %exit_value, stake_exit))]
    pub fn unlock_early<B: BalanceLedger>(
        &mut self,
        call: Call,
        staking: &mut PublicStaking<B>,
        exit_value: U256,
        stake_exit: bool,
    ) -> Result<Payout> {
        self.exclude_post_lock(call.height)?;
        let token_id = self.position_of(call.caller)?;
        let shares = staking.position(token_id)?.shares;
        if exit_value > shares {
            return Err(Error::InsufficientBalanceForEarlyExit { exit_value, shares });
        }

        // every transfer below is funded by the burn payout
        let as_lockup = Call::new(self.address, call.height);
        let burned = staking.burn_to(as_lockup, self.address, token_id)?;
        let profit = Payout {
            eth: burned.eth,
            token: burned.token - shares,
        };
        let mut paid = self.distribute_profits(staking, call.caller, profit)?;

        self.claimed.remove(&token_id);
        let remaining = shares - exit_value;
        if remaining.is_zero() {
            self.positions.remove(&call.caller);
        } else {
            let relocked = staking.mint_to(as_lockup, self.address, remaining, 1)?;
            self.positions.insert(call.caller, relocked);
            self.claimed.insert(relocked, call.caller);
        }
        self.shares_locked -= exit_value;

        if stake_exit && !exit_value.is_zero() {
            staking.mint_to(as_lockup, call.caller, exit_value, 1)?;
        } else {
            self.pay(staking, &call.caller, Payout::new(0u64, exit_value))?;
            paid.token = paid.token.saturating_add(exit_value);
        }

        info!(%remaining, "Unlocked early");
        Ok(paid)
    }

    /// Collect every locked position one last time, burn the bonus position
    /// and freeze the reward totals. Runs once.
    #[instrument(skip_all, fields(height = call.height))]
    pub fn aggregate_profits<B: BalanceLedger>(
        &mut self,
        call: Call,
        staking: &mut PublicStaking<B>,
    ) -> Result<()> {
        self.only_post_lock(call.height)?;
        if self.payout_safe {
            return Err(Error::PayoutSafe);
        }

        let as_lockup = Call::new(self.address, call.height);
        let locked: Vec<(Address, u64)> = self.positions.iter().map(|(o, t)| (*o, *t)).collect();
        for (owner, token_id) in locked {
            let profit = staking.collect_all_profits_to(as_lockup, self.address, token_id)?;
            let (share, reserved) = split_profits(profit);
            self.reserve(staking, reserved)?;
            let credit = self.credits.entry(owner).or_default();
            *credit = credit.saturating_add(share);
        }

        if let Some(bonus_token) = self.reward_pool.bonus_token {
            let pool = self.reward_pool.address;
            let bonus = staking.burn_to(Call::new(pool, call.height), pool, bonus_token)?;
            self.reward_pool.bonus = self.reward_pool.bonus.saturating_add(bonus);
        }

        let total = self.reward_pool.total();
        self.snapshot = Some((total, self.shares_locked));
        self.payout_safe = true;
        info!(
            reward_eth = %total.eth,
            reward_token = %total.token,
            shares_locked = %self.shares_locked,
            "Profits aggregated"
        );
        Ok(())
    }

    /// Return the caller's principal with their credited profits and reward
    /// share to `receiver`. With `stake_exit` the principal comes back as a
    /// new staking position instead of tokens.
    #[instrument(skip_all, fields(caller = ?call.caller, height = call.height, ?receiver, stake_exit))]
    pub fn unlock<B: BalanceLedger>(
        &mut self,
        call: Call,
        staking: &mut PublicStaking<B>,
        receiver: Address,
        stake_exit: bool,
    ) -> Result<Payout> {
        self.only_post_lock(call.height)?;
        if !self.payout_safe {
            return Err(Error::PayoutUnsafe);
        }
        let token_id = self.position_of(call.caller)?;
        let shares = staking.position(token_id)?.shares;
        let (reward_total, reward_shares) = self.snapshot.unwrap_or_default();
        let reward = Payout {
            eth: proportion(reward_total.eth, shares, reward_shares)?,
            token: proportion(reward_total.token, shares, reward_shares)?,
        };

        // nothing below may fail once the position is burned; the burn
        // itself covers the principal and late profits
        let credits = self.credits_of(&call.caller);
        ensure_funds(staking, &self.reward_pool.address, reward)?;
        ensure_funds(staking, &self.address, credits)?;

        let as_lockup = Call::new(self.address, call.height);
        let burned = staking.burn_to(as_lockup, self.address, token_id)?;
        // anything deposited after aggregation goes straight to the user
        let late = Payout {
            eth: burned.eth,
            token: burned.token - shares,
        };
        let mut paid = credits.saturating_add(late);
        self.pay(staking, &receiver, paid)?;

        let pool = self.reward_pool.address;
        let balances = staking.balances();
        balances.transfer(Asset::Eth, &pool, &receiver, reward.eth)?;
        balances.transfer(Asset::Token, &pool, &receiver, reward.token)?;
        paid = paid.saturating_add(reward);

        if stake_exit {
            staking.mint_to(as_lockup, receiver, shares, 1)?;
        } else {
            self.pay(staking, &receiver, Payout::new(0u64, shares))?;
            paid.token = paid.token.saturating_add(shares);
        }

        self.positions.remove(&call.caller);
        self.claimed.remove(&token_id);
        self.credits.remove(&call.caller);
        info!(eth = %paid.eth, token = %paid.token, "Unlocked");
        Ok(paid)
    }

    /// Accept bare ether; only the staking ledger and the reward pool may
    /// send it
    pub fn receive_eth<B: BalanceLedger>(
        &self,
        call: Call,
        staking: &PublicStaking<B>,
        amount: U256,
    ) -> Result<()> {
        if call.caller != staking.address() && call.caller != self.reward_pool.address {
            return Err(Error::AddressNotAllowedToSendEther(call.caller));
        }
        staking
            .balances()
            .transfer(Asset::Eth, &call.caller, &self.address, amount)
    }
}

impl<B: BalanceLedger> Erc721Receiver<B> for Lockup {
    fn on_erc721_received(&mut self, call: Call, staking: &PublicStaking<B>, notice: &Received) -> Result<()> {
        Lockup::on_erc721_received(self, call, staking, notice)
    }
}

/// Fail unless `account` holds at least `needed` of both assets
fn ensure_funds<B: BalanceLedger>(staking: &PublicStaking<B>, account: &Address, needed: Payout) -> Result<()> {
    let balances = staking.balances();
    for (asset, needed) in [(Asset::Eth, needed.eth), (Asset::Token, needed.token)] {
        let available = balances.balance_of(asset, account);
        if available < needed {
            return Err(Error::InsufficientBalance {
                account: *account,
                asset,
                needed,
                available,
            });
        }
    }
    Ok(())
}

/// `total * part / whole`, zero when nothing is locked
fn proportion(total: U256, part: U256, whole: U256) -> Result<U256> {
    if whole.is_zero() {
        return Ok(U256::zero());
    }
    Ok(total.checked_mul(part).ok_or(Error::Overflow)? / whole)
}
