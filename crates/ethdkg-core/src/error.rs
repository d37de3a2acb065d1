//! Error types for ETHDKG operations

use crate::phase::{Phase, PhaseWindow};
use crate::types::{Address, Height};
use serde::Serialize;
use thiserror::Error;

/// Result type alias for ETHDKG operations
pub type Result<T> = std::result::Result<T, Error>;

/// Coarse classification of an [`Error`], used by callers deciding whether a
/// call can be retried later, with different input, or not at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ErrorCategory {
    /// Called outside the required window; retry at the right height.
    PhaseViolation,
    /// Zero/identity values or rejected proofs; resubmit corrected input.
    InputValidity,
    /// Caller is not allowed; only external registration can fix it.
    Authorization,
    /// Resubmission, double accusation and similar caller logic errors.
    StateConflict,
    /// Engine or round set up incorrectly.
    Configuration,
}

/// Errors that can occur while driving an ETHDKG round
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "error", content = "args")]
pub enum Error {
    /// Invalid engine configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The validator set changed since the round was initialized
    #[error("Round invalidated: validator set nonce {actual} differs from round nonce {expected}")]
    RoundInvalidated { expected: u64, actual: u64 },

    /// Not enough validators to open a round
    #[error("Minimum validators not met: required {required}, got {actual}")]
    MinimumValidatorsNotMet { required: usize, actual: usize },

    /// Operation invoked outside every window it accepts
    #[error("Incorrect phase {current:?} at height {height}, expected one of {expected:?}")]
    IncorrectPhase {
        current: Phase,
        height: Height,
        expected: Vec<PhaseWindow>,
    },

    /// Caller is not a current, non-accused validator of the round
    #[error("Only validators allowed: {0:?}")]
    OnlyValidatorsAllowed(Address),

    #[error("Public key is zero")]
    PublicKeyZero,

    #[error("Public key not on curve")]
    PublicKeyNotOnCurve,

    #[error("Participant already registered in round: {0:?}")]
    ParticipantParticipatingInRound(Address),

    #[error("Participant already distributed shares in round: {0:?}")]
    ParticipantDistributedSharesInRound(Address),

    #[error("Invalid encrypted shares amount: got {got}, expected {expected}")]
    InvalidEncryptedSharesAmount { got: usize, expected: usize },

    #[error("Invalid commitments amount: got {got}, expected {expected}")]
    InvalidCommitmentsAmount { got: usize, expected: usize },

    #[error("Commitment is zero")]
    CommitmentZero,

    #[error("Commitment not on curve")]
    CommitmentNotOnCurve,

    /// Key share G1 point or its correctness proof is zero or rejected
    #[error("Invalid key share G1")]
    InvalidKeyshareG1,

    /// Key share G2 point is zero or fails the pairing check
    #[error("Invalid key share G2")]
    InvalidKeyshareG2,

    #[error("Participant already submitted key shares in round: {0:?}")]
    ParticipantSubmittedKeysharesInRound(Address),

    #[error("Master public key is zero")]
    MasterPublicKeyZero,

    #[error("Master public key pairing check failed")]
    MasterPublicKeyPairingCheckFailure,

    #[error("GPKj is zero")]
    GPKJZero,

    #[error("Participant already submitted GPKj in round: {0:?}")]
    ParticipantSubmittedGPKJInRound(Address),

    /// Completion refused by the configured bad-participant ceiling
    #[error("Too many bad participants: allowed {allowed}, got {actual}")]
    TooManyBadParticipants { allowed: u32, actual: u32 },

    /// Accused is not a validator, already marked bad, or repeated in the batch
    #[error("Accused not validator: {0:?}")]
    AccusedNotValidator(Address),

    #[error("Accused not participating in round: {0:?}")]
    AccusedNotParticipatingInRound(Address),

    #[error("Accused registered in round: {0:?}")]
    AccusedParticipatingInRound(Address),

    #[error("Accused distributed shares in round: {0:?}")]
    AccusedDistributedSharesInRound(Address),

    #[error("Accused did not distribute shares in round: {0:?}")]
    AccusedDidNotDistributeSharesInRound(Address),

    #[error("Accused submitted key shares in round: {0:?}")]
    AccusedSubmittedSharesInRound(Address),

    /// The accused did submit a GPKj, so the missing-GPKj accusation is void
    #[error("Accused participated in GPKj submission: {0:?}")]
    AccusedDidNotParticipateInGPKJSubmission(Address),

    #[error("Accused did not submit GPKj in round: {0:?}")]
    AccusedDidNotSubmitGPKJInRound(Address),

    #[error("Shares and commitments mismatch: expected {expected}, got {actual}")]
    SharesAndCommitmentsMismatch { expected: String, actual: String },

    #[error("Invalid shared secret proof")]
    InvalidSharedSecretProof,

    #[error("Distributed share is valid: {0:?}")]
    DistributedShareIsValid(Address),

    #[error("GPKj is valid: {0:?}")]
    GPKJIsValid(Address),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl Error {
    /// Classify this error
    pub fn category(&self) -> ErrorCategory {
        use Error::*;
        match self {
            IncorrectPhase { .. } => ErrorCategory::PhaseViolation,
            PublicKeyZero
            | PublicKeyNotOnCurve
            | InvalidEncryptedSharesAmount { .. }
            | InvalidCommitmentsAmount { .. }
            | CommitmentZero
            | CommitmentNotOnCurve
            | InvalidKeyshareG1
            | InvalidKeyshareG2
            | MasterPublicKeyZero
            | MasterPublicKeyPairingCheckFailure
            | GPKJZero
            | SharesAndCommitmentsMismatch { .. }
            | InvalidSharedSecretProof
            | Serialization(_) => ErrorCategory::InputValidity,
            OnlyValidatorsAllowed(_) => ErrorCategory::Authorization,
            ParticipantParticipatingInRound(_)
            | ParticipantDistributedSharesInRound(_)
            | ParticipantSubmittedKeysharesInRound(_)
            | ParticipantSubmittedGPKJInRound(_)
            | TooManyBadParticipants { .. }
            | AccusedNotValidator(_)
            | AccusedNotParticipatingInRound(_)
            | AccusedParticipatingInRound(_)
            | AccusedDistributedSharesInRound(_)
            | AccusedDidNotDistributeSharesInRound(_)
            | AccusedSubmittedSharesInRound(_)
            | AccusedDidNotParticipateInGPKJSubmission(_)
            | AccusedDidNotSubmitGPKJInRound(_)
            | DistributedShareIsValid(_)
            | GPKJIsValid(_) => ErrorCategory::StateConflict,
            InvalidConfig(_) | RoundInvalidated { .. } | MinimumValidatorsNotMet { .. } => {
                ErrorCategory::Configuration
            }
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}
