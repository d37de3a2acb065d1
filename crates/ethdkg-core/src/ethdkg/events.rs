//! Round events

use crate::phase::Phase;
use crate::pool::SlashKind;
use crate::types::{Address, G1Point, G2Point, Height, KeyShare};
use primitive_types::{H256, U256};
use serde::{Deserialize, Serialize};

/// Observable state changes of a round, in the order they happened
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event")]
pub enum Event {
    RegistrationOpened {
        start: Height,
        round: u64,
        nonce: u64,
        phase_length: u64,
        confirmation_length: u64,
    },
    AddressRegistered {
        account: Address,
        index: usize,
        nonce: u64,
        public_key: G1Point,
    },
    RegistrationComplete {
        height: Height,
    },
    SharesDistributed {
        account: Address,
        index: usize,
        nonce: u64,
        shares_hash: H256,
        encrypted_shares: Vec<U256>,
        commitments: Vec<G1Point>,
    },
    ShareDistributionComplete {
        height: Height,
    },
    KeyShareSubmitted {
        account: Address,
        index: usize,
        nonce: u64,
        key_share: KeyShare,
    },
    KeyShareSubmissionComplete {
        height: Height,
    },
    MPKSet {
        height: Height,
        nonce: u64,
        master_public_key: G2Point,
    },
    ValidatorMemberAdded {
        account: Address,
        index: usize,
        nonce: u64,
        gpkj: G2Point,
    },
    GPKJSubmissionComplete {
        height: Height,
    },
    ParticipantAccused {
        accuser: Address,
        accused: Address,
        phase: Phase,
        kind: SlashKind,
    },
    ValidatorSetCompleted {
        round: u64,
        nonce: u64,
        height: Height,
        validator_count: usize,
        master_public_key: G2Point,
    },
}
