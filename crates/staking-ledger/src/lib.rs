//! # Staking Ledger
//!
//! Non-fungible staking positions that share fee deposits pro rata, and a
//! time-boxed lockup that aggregates locked positions and distributes a
//! reward pool when the lock ends.
//!
//! Funds never live inside these types: every token and ether movement goes
//! through a [`BalanceLedger`].
//!
//! ## Example
//!
//! ```rust,ignore
//! use staking_ledger::{MemoryBalances, PublicStaking};
//!
//! let balances = MemoryBalances::new();
//! let mut staking = PublicStaking::new(staking_address, balances.clone());
//! let token_id = staking.mint(Call::new(owner, height), amount)?;
//! ```

pub mod balances;
pub mod error;
pub mod lockup;
pub mod position;
pub mod public_staking;

pub use balances::{Asset, BalanceLedger, MemoryBalances};
pub use error::{Error, ErrorCategory, Result};
pub use lockup::{split_profits, Lockup, LockupConfig, LockupState, RewardPool, BPS, RESERVED_PROFIT_BPS};
pub use position::{scale, Accumulator, Payout, Position};
pub use public_staking::{max_mint_amount, Erc721Receiver, PositionEvent, PublicStaking, Received, ReserveReport};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Longest lock a position can be minted with, about six months of blocks
pub const MAX_MINT_LOCK: u64 = 1_051_200;
