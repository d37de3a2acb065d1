//! Validator pool coordination
//!
//! The pool is the authority on who may take part in a round. The DKG core
//! only reads membership from it and reports slashes and completions back.

use crate::phase::Phase;
use crate::types::{Address, G2Point};
use serde::{Deserialize, Serialize};

/// Severity of a slash
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SlashKind {
    /// Failing to submit in time
    Minor,
    /// Submitting provably bad data
    Major,
}

/// A confirmed accusation, reported to the pool for penalty handling
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Slash {
    pub round: u64,
    pub accused: Address,
    pub accuser: Address,
    pub phase: Phase,
    pub kind: SlashKind,
}

/// Summary handed to the pool once a round reaches completion
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundOutcome {
    pub round: u64,
    pub nonce: u64,
    pub master_public_key: G2Point,
    /// Participants whose GPKj forms the group key, in registration order
    pub members: Vec<Address>,
    pub bad_participants: u32,
}

/// Validator set oracle and slashing sink
pub trait ValidatorPool: Send + Sync {
    /// Whether `address` is currently a validator
    fn is_validator(&self, address: &Address) -> bool;

    /// All current validators
    fn validator_addresses(&self) -> Vec<Address>;

    /// Number of current validators
    fn validator_count(&self) -> usize {
        self.validator_addresses().len()
    }

    /// Version of the validator set; changes whenever membership changes
    fn nonce(&self) -> u64;

    /// Apply the penalty for a confirmed accusation
    fn slash(&self, slash: &Slash);

    /// The round produced a group key
    fn round_completed(&self, outcome: &RoundOutcome);
}

/// In-memory pool for testing
pub mod memory;

pub use memory::MemoryValidatorPool;
