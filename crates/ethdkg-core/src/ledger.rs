//! Per-round share and proof ledger
//!
//! Records what every registered participant submitted in the current round
//! and which validators have been found bad. The ledger enforces nothing
//! about timing; the round entry points gate every write.

use crate::types::{Address, G1Point, G2Point, KeyShare};
use primitive_types::{H256, U256};
use serde::{Deserialize, Serialize};
use sha3::{Digest, Keccak256};
use std::collections::{BTreeMap, BTreeSet};

/// A validator that registered in the current round
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    pub address: Address,
    /// 1-based registration order
    pub index: usize,
    pub public_key: G1Point,
    /// keccak-256 of the encrypted shares followed by the commitments
    pub distributed_shares_hash: Option<H256>,
    pub commitments_first_coefficient: Option<G1Point>,
    pub key_share: Option<KeyShare>,
    pub gpkj: Option<G2Point>,
}

impl Participant {
    fn new(address: Address, index: usize, public_key: G1Point) -> Self {
        Self {
            address,
            index,
            public_key,
            distributed_shares_hash: None,
            commitments_first_coefficient: None,
            key_share: None,
            gpkj: None,
        }
    }

    pub fn has_distributed_shares(&self) -> bool {
        self.distributed_shares_hash.is_some()
    }

    pub fn has_key_share(&self) -> bool {
        self.key_share.is_some()
    }

    pub fn has_gpkj(&self) -> bool {
        self.gpkj.is_some()
    }
}

/// Submissions and bad-participant status of one round
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ShareLedger {
    participants: BTreeMap<Address, Participant>,
    bad: BTreeSet<Address>,
    master_public_key: Option<G2Point>,
}

impl ShareLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a participant with the next registration index
    pub(crate) fn register(&mut self, address: Address, public_key: G1Point) -> &Participant {
        let index = self.participants.len() + 1;
        self.participants
            .entry(address)
            .or_insert_with(|| Participant::new(address, index, public_key))
    }

    pub fn participant(&self, address: &Address) -> Option<&Participant> {
        self.participants.get(address)
    }

    pub(crate) fn participant_mut(&mut self, address: &Address) -> Option<&mut Participant> {
        self.participants.get_mut(address)
    }

    pub fn is_registered(&self, address: &Address) -> bool {
        self.participants.contains_key(address)
    }

    /// Registered participants in registration order
    pub fn participants(&self) -> Vec<&Participant> {
        let mut participants: Vec<&Participant> = self.participants.values().collect();
        participants.sort_by_key(|p| p.index);
        participants
    }

    pub fn registered_count(&self) -> usize {
        self.participants.len()
    }

    pub fn is_bad(&self, address: &Address) -> bool {
        self.bad.contains(address)
    }

    /// Mark `address` bad; returns false if it already was
    pub(crate) fn mark_bad(&mut self, address: Address) -> bool {
        self.bad.insert(address)
    }

    /// Number of validators found bad this round
    pub fn bad_participants(&self) -> u32 {
        self.bad.len() as u32
    }

    pub fn bad_addresses(&self) -> impl Iterator<Item = &Address> {
        self.bad.iter()
    }

    /// Registered participants that have not been found bad
    pub fn eligible(&self) -> impl Iterator<Item = &Participant> {
        self.participants
            .values()
            .filter(|p| !self.bad.contains(&p.address))
    }

    /// Whether every eligible participant satisfies `submitted`
    pub fn all_eligible(&self, submitted: impl Fn(&Participant) -> bool) -> bool {
        let mut any = false;
        for participant in self.eligible() {
            if !submitted(participant) {
                return false;
            }
            any = true;
        }
        any
    }

    pub fn master_public_key(&self) -> Option<&G2Point> {
        self.master_public_key.as_ref()
    }

    pub(crate) fn set_master_public_key(&mut self, mpk: G2Point) {
        self.master_public_key = Some(mpk);
    }

    /// Key-share G1 points of eligible participants, in registration order
    pub fn key_share_g1s(&self) -> Vec<G1Point> {
        let mut eligible: Vec<&Participant> = self.eligible().collect();
        eligible.sort_by_key(|p| p.index);
        eligible
            .into_iter()
            .filter_map(|p| p.key_share.map(|share| share.g1))
            .collect()
    }

    /// Eligible participants that submitted a GPKj, in registration order
    pub fn gpkj_members(&self) -> Vec<Address> {
        let mut members: Vec<&Participant> = self.eligible().filter(|p| p.has_gpkj()).collect();
        members.sort_by_key(|p| p.index);
        members.into_iter().map(|p| p.address).collect()
    }
}

/// keccak-256 over the big-endian words of the encrypted shares followed by
/// the `(x, y)` words of every commitment
pub fn shares_hash(encrypted_shares: &[U256], commitments: &[G1Point]) -> H256 {
    let mut hasher = Keccak256::new();
    let mut word = [0u8; 32];
    for share in encrypted_shares {
        share.to_big_endian(&mut word);
        hasher.update(word);
    }
    for commitment in commitments {
        hasher.update(commitment.to_bytes());
    }
    H256::from_slice(&hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(n: u64) -> Address {
        Address::from_low_u64_be(n)
    }

    #[test]
    fn test_registration_order() {
        let mut ledger = ShareLedger::new();
        ledger.register(addr(9), G1Point::new(1u64, 1u64));
        ledger.register(addr(3), G1Point::new(2u64, 2u64));

        let order: Vec<(Address, usize)> = ledger
            .participants()
            .iter()
            .map(|p| (p.address, p.index))
            .collect();
        assert_eq!(order, vec![(addr(9), 1), (addr(3), 2)]);

        // registering again keeps the original entry
        ledger.register(addr(9), G1Point::new(5u64, 5u64));
        assert_eq!(ledger.registered_count(), 2);
        assert_eq!(ledger.participant(&addr(9)).unwrap().public_key.x, U256::one());
    }

    #[test]
    fn test_eligibility_excludes_bad() {
        let mut ledger = ShareLedger::new();
        ledger.register(addr(1), G1Point::new(1u64, 1u64));
        ledger.register(addr(2), G1Point::new(1u64, 2u64));
        assert!(!ledger.all_eligible(|p| p.has_gpkj()));

        ledger.participant_mut(&addr(1)).unwrap().gpkj = Some(G2Point::new([U256::one(); 4]));
        assert!(ledger.mark_bad(addr(2)));
        assert!(!ledger.mark_bad(addr(2)));

        assert!(ledger.all_eligible(|p| p.has_gpkj()));
        assert_eq!(ledger.gpkj_members(), vec![addr(1)]);
        assert_eq!(ledger.bad_participants(), 1);
    }

    #[test]
    fn test_all_eligible_requires_someone() {
        let ledger = ShareLedger::new();
        assert!(!ledger.all_eligible(|_| true));
    }

    #[test]
    fn test_shares_hash() {
        let empty = shares_hash(&[], &[]);
        // keccak256 of the empty string
        assert_eq!(
            hex::encode(empty.as_bytes()),
            "c5d2460186f7233c927e7db2dcc703c0e500b653ca82273b7bfad8045d85a470"
        );

        let shares = [U256::from(7u64)];
        let commitments = [G1Point::new(1u64, 2u64)];
        let hash = shares_hash(&shares, &commitments);
        assert_ne!(hash, empty);
        assert_eq!(hash, shares_hash(&shares, &commitments));
        assert_ne!(hash, shares_hash(&[U256::from(8u64)], &commitments));
    }
}
