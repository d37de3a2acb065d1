//! Error types for staking and lockup operations

use crate::balances::Asset;
use ethdkg_core::{Address, Height};
use primitive_types::U256;
use serde::Serialize;
use thiserror::Error;

/// Result type alias for staking operations
pub type Result<T> = std::result::Result<T, Error>;

/// Coarse classification of an [`Error`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ErrorCategory {
    /// A maturity height has not been reached yet
    PhaseViolation,
    InputValidity,
    Authorization,
    StateConflict,
    /// The lockup is in the wrong state or payout state for the call
    LockupState,
    Configuration,
    /// The external balance ledger refused a transfer
    Collaborator,
}

/// Errors that can occur on the staking ledger or the lockup
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "error", content = "args")]
pub enum Error {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Mint amount is zero")]
    MintAmountZero,

    #[error("Mint amount {0} exceeds maximum supply")]
    MintAmountExceedsMaximumSupply(U256),

    #[error("Lock duration {0} greater than mint lock")]
    LockDurationGreaterThanMintLock(u64),

    /// No live position with this id, including one already burned
    #[error("Invalid token id: {0}")]
    InvalidTokenId(u64),

    #[error("Caller not token owner: {0:?}")]
    CallerNotTokenOwner(Address),

    #[error("Caller not token owner or approved: {0:?}")]
    CallerNotTokenOwnerOrApproved(Address),

    #[error("Transfer of token {token_id} from incorrect owner {from:?}")]
    TransferFromIncorrectOwner { token_id: u64, from: Address },

    #[error("Free-after height {free_after} not reached at {height}")]
    FreeAfterTimeNotReached { free_after: Height, height: Height },

    #[error("Withdrawal locked until {withdraw_free_after}, height {height}")]
    LockedWithdrawal {
        withdraw_free_after: Height,
        height: Height,
    },

    #[error("Arithmetic overflow")]
    Overflow,

    #[error("Insufficient {asset:?} balance for {account:?}: needed {needed}, available {available}")]
    InsufficientBalance {
        account: Address,
        asset: Asset,
        needed: U256,
        available: U256,
    },

    #[error("Pre-lock state required")]
    PreLockStateRequired,

    #[error("Post-lock state not allowed")]
    PostLockStateNotAllowed,

    #[error("Post-lock state required")]
    PostLockStateRequired,

    /// Profits were already aggregated
    #[error("Payout safe")]
    PayoutSafe,

    /// Profits have not been aggregated yet
    #[error("Payout unsafe")]
    PayoutUnsafe,

    #[error("Only the staking NFT may transfer positions in")]
    OnlyStakingNFTAllowed,

    #[error("Lockup does not own token id {0}")]
    ContractDoesNotOwnTokenID(u64),

    #[error("User already has a position: {0:?}")]
    UserAlreadyHasAPosition(Address),

    #[error("Token id already claimed: {0}")]
    TokenIdAlreadyClaimed(u64),

    #[error("Bonus token already created")]
    BonusTokenAlreadyCreated,

    #[error("Not enough ALCA to stake: needed {needed}, available {available}")]
    NotEnoughALCAToStake { needed: U256, available: U256 },

    #[error("Insufficient balance for early exit: exit value {exit_value}, shares {shares}")]
    InsufficientBalanceForEarlyExit { exit_value: U256, shares: U256 },

    #[error("User has no position: {0:?}")]
    UserHasNoPosition(Address),

    #[error("Address not allowed to send ether: {0:?}")]
    AddressNotAllowedToSendEther(Address),
}

impl Error {
    /// Classify this error
    pub fn category(&self) -> ErrorCategory {
        use Error::*;
        match self {
            FreeAfterTimeNotReached { .. } | LockedWithdrawal { .. } => ErrorCategory::PhaseViolation,
            MintAmountZero
            | MintAmountExceedsMaximumSupply(_)
            | LockDurationGreaterThanMintLock(_)
            | InvalidTokenId(_)
            | Overflow
            | InsufficientBalanceForEarlyExit { .. } => ErrorCategory::InputValidity,
            CallerNotTokenOwner(_)
            | CallerNotTokenOwnerOrApproved(_)
            | TransferFromIncorrectOwner { .. }
            | OnlyStakingNFTAllowed
            | AddressNotAllowedToSendEther(_) => ErrorCategory::Authorization,
            ContractDoesNotOwnTokenID(_)
            | UserAlreadyHasAPosition(_)
            | TokenIdAlreadyClaimed(_)
            | BonusTokenAlreadyCreated
            | UserHasNoPosition(_) => ErrorCategory::StateConflict,
            PreLockStateRequired
            | PostLockStateNotAllowed
            | PostLockStateRequired
            | PayoutSafe
            | PayoutUnsafe => ErrorCategory::LockupState,
            InvalidConfig(_) => ErrorCategory::Configuration,
            InsufficientBalance { .. } | NotEnoughALCAToStake { .. } => ErrorCategory::Collaborator,
        }
    }
}
